//! SimpleFS Core - an educational, inode-based filesystem implemented over
//! a fixed-size block device.
//!
//! This crate is split into the same layers the on-disk format implies: a
//! synchronous disk emulator (`block_device`), the on-disk layout and its
//! byte-level codecs (`layout`), a free-block bitmap derived from that
//! layout (`bitmap`), and the filesystem engine that ties them together
//! (`filesystem`).

#![warn(missing_docs)]
#![warn(rust_2018_idioms)]

pub mod bitmap;
pub mod block_device;
pub mod config;
pub mod error;
pub mod filesystem;
pub mod layout;

pub use bitmap::FreeBlockBitmap;
pub use block_device::{Disk, BLOCK_SIZE};
pub use error::{Error, Result};
pub use filesystem::FileSystem;
pub use layout::{Inode, Superblock, MAX_FILE_SIZE};
