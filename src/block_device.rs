//! The disk emulator: a backing file presented as an array of fixed-size
//! blocks.
//!
//! Every operation here is synchronous and blocking — this filesystem is
//! single-threaded and non-reentrant by design, so there is no async
//! runtime to hand I/O off to.

use std::fs::{File, OpenOptions};
use std::io::{Read, Seek, SeekFrom, Write};
use std::path::Path;

use crate::error::{Error, Result};

/// Size of one block in bytes.
pub const BLOCK_SIZE: usize = 4096;

/// A fixed-size-block view over a backing file.
#[derive(Debug)]
pub struct Disk {
    file: File,
    blocks: u32,
    reads: u64,
    writes: u64,
}

impl Disk {
    /// Open (creating if necessary) the backing file at `path` and resize
    /// it to hold exactly `blocks` blocks, growing or shrinking as needed.
    pub fn open(path: impl AsRef<Path>, blocks: u32) -> Result<Self> {
        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .truncate(false)
            .open(path)?;

        let wanted_len = blocks as u64 * BLOCK_SIZE as u64;
        if file.metadata()?.len() != wanted_len {
            file.set_len(wanted_len)?;
        }

        log::info!("disk opened: {blocks} blocks ({wanted_len} bytes)");

        Ok(Self {
            file,
            blocks,
            reads: 0,
            writes: 0,
        })
    }

    /// Number of blocks this disk was opened with.
    pub fn blocks(&self) -> u32 {
        self.blocks
    }

    /// Total blocks read since this `Disk` was opened.
    pub fn reads(&self) -> u64 {
        self.reads
    }

    /// Total blocks written since this `Disk` was opened.
    pub fn writes(&self) -> u64 {
        self.writes
    }

    /// Read block `block` into `buf`, which must be exactly `BLOCK_SIZE`
    /// bytes. Returns `BLOCK_SIZE` on success.
    pub fn read(&mut self, block: u32, buf: &mut [u8]) -> Result<usize> {
        if block >= self.blocks {
            return Err(Error::DiskSanity("block index out of range"));
        }
        if buf.len() != BLOCK_SIZE {
            return Err(Error::DiskSanity("buffer is not BLOCK_SIZE bytes"));
        }

        self.file
            .seek(SeekFrom::Start(block as u64 * BLOCK_SIZE as u64))?;
        self.file.read_exact(buf)?;
        self.reads += 1;
        Ok(BLOCK_SIZE)
    }

    /// Write `buf` (exactly `BLOCK_SIZE` bytes) to block `block`. Returns
    /// `BLOCK_SIZE` on success.
    pub fn write(&mut self, block: u32, buf: &[u8]) -> Result<usize> {
        if block >= self.blocks {
            return Err(Error::DiskSanity("block index out of range"));
        }
        if buf.len() != BLOCK_SIZE {
            return Err(Error::DiskSanity("buffer is not BLOCK_SIZE bytes"));
        }

        self.file
            .seek(SeekFrom::Start(block as u64 * BLOCK_SIZE as u64))?;
        self.file.write_all(buf)?;
        self.writes += 1;
        Ok(BLOCK_SIZE)
    }

    /// Close the disk, printing the total read/write counts to stdout.
    pub fn close(self) {
        println!("{} disk block reads", self.reads);
        println!("{} disk block writes", self.writes);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn open_creates_file_of_exact_size() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("disk.img");
        let disk = Disk::open(&path, 16).unwrap();
        assert_eq!(disk.blocks(), 16);
        assert_eq!(
            std::fs::metadata(&path).unwrap().len(),
            16 * BLOCK_SIZE as u64
        );
    }

    #[test]
    fn reopen_truncates_to_new_block_count() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("disk.img");
        Disk::open(&path, 32).unwrap();
        let disk = Disk::open(&path, 8).unwrap();
        assert_eq!(disk.blocks(), 8);
        assert_eq!(
            std::fs::metadata(&path).unwrap().len(),
            8 * BLOCK_SIZE as u64
        );
    }

    #[test]
    fn read_write_roundtrip_and_counters() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("disk.img");
        let mut disk = Disk::open(&path, 4).unwrap();

        let mut data = [0u8; BLOCK_SIZE];
        data[0] = 0xAB;
        data[BLOCK_SIZE - 1] = 0xCD;
        assert_eq!(disk.write(2, &data).unwrap(), BLOCK_SIZE);

        let mut out = [0u8; BLOCK_SIZE];
        assert_eq!(disk.read(2, &mut out).unwrap(), BLOCK_SIZE);
        assert_eq!(out, data);

        assert_eq!(disk.reads(), 1);
        assert_eq!(disk.writes(), 1);
    }

    #[test]
    fn out_of_range_block_is_a_sanity_failure() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("disk.img");
        let mut disk = Disk::open(&path, 4).unwrap();
        let mut buf = [0u8; BLOCK_SIZE];
        assert!(matches!(
            disk.read(4, &mut buf),
            Err(Error::DiskSanity(_))
        ));
        assert_eq!(disk.reads(), 0);
    }

    #[test]
    fn wrong_buffer_size_is_a_sanity_failure() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("disk.img");
        let mut disk = Disk::open(&path, 4).unwrap();
        let mut short = vec![0u8; BLOCK_SIZE - 1];
        assert!(matches!(
            disk.write(0, &short),
            Err(Error::DiskSanity(_))
        ));
        assert!(matches!(
            disk.read(0, &mut short),
            Err(Error::DiskSanity(_))
        ));
    }
}
