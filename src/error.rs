//! Crate-wide error type.
//!
//! I/O failures and
//! sanity violations from the disk layer collapse into `Disk`/`DiskSanity`;
//! layout mismatches, state violations, and resource exhaustion each get
//! their own variant so callers can match on the precise failure.

use thiserror::Error;

/// Errors produced by the disk emulator and filesystem engine.
#[derive(Debug, Error)]
pub enum Error {
    /// The backing file I/O failed (open, truncate, read, or write).
    #[error("disk I/O error: {0}")]
    Disk(#[from] std::io::Error),

    /// A sanity check failed before touching the backing file (out-of-range
    /// block index, wrong buffer length).
    #[error("disk sanity check failed: {0}")]
    DiskSanity(&'static str),

    /// Block 0 does not parse as a valid superblock for this disk.
    #[error("invalid superblock: bad magic number")]
    InvalidSuperblock,

    /// Superblock's recorded block count doesn't match the disk.
    #[error("block count mismatch: superblock says {superblock}, disk has {disk}")]
    BlockCountMismatch {
        /// Block count recorded in the superblock.
        superblock: u32,
        /// Block count the disk was actually opened with.
        disk: u32,
    },

    /// Superblock's inode_blocks/inodes fields are inconsistent with blocks.
    #[error("inode layout mismatch")]
    InodeLayoutMismatch,

    /// `format` was called while a disk is already mounted on this `FileSystem`.
    #[error("cannot format: a disk is already mounted")]
    AlreadyMounted,

    /// An operation that requires a mounted disk was called without one.
    #[error("no disk is mounted")]
    NotMounted,

    /// Inode number is out of range or not currently valid.
    #[error("invalid inode {0}")]
    InvalidInode(u32),

    /// Read offset is at or beyond the file's logical size.
    #[error("offset beyond end of file")]
    OffsetBeyondEof,

    /// Requested offset would place the file beyond the maximum addressable size.
    #[error("file too large: offset exceeds direct + indirect capacity")]
    FileTooLarge,

    /// The inode table has no free slot for `create`.
    #[error("no free inodes")]
    NoFreeInodes,

    /// The free-block bitmap has no free block for `write`/`assign_block`.
    #[error("no free blocks")]
    NoFreeBlocks,

    /// An indirect block is full and cannot accept another pointer.
    #[error("no free pointer slot in indirect block")]
    NoFreePointerSlot,
}

/// Crate-wide result alias.
pub type Result<T> = std::result::Result<T, Error>;
