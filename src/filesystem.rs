//! The filesystem engine: mount-time validation, the derived free-block
//! bitmap, and the format/create/remove/stat/read/write/debug operations.

use crate::bitmap::FreeBlockBitmap;
use crate::block_device::{Disk, BLOCK_SIZE};
use crate::error::{Error, Result};
use crate::layout::{
    inode_location, read_pointer_block, write_pointer_block, Inode, Superblock, INODES_PER_BLOCK,
    POINTERS_PER_BLOCK, POINTERS_PER_INODE,
};

/// An in-memory filesystem handle. Starts unmounted; `mount` associates it
/// with exactly one `Disk` for the lifetime of the mount.
#[derive(Debug)]
pub struct FileSystem {
    disk: Option<Disk>,
    meta_data: Superblock,
    free_blocks: Option<FreeBlockBitmap>,
}

impl Default for FileSystem {
    fn default() -> Self {
        Self::new()
    }
}

impl FileSystem {
    /// A fresh, unmounted filesystem handle.
    pub fn new() -> Self {
        Self {
            disk: None,
            meta_data: Superblock {
                magic_number: 0,
                blocks: 0,
                inode_blocks: 0,
                inodes: 0,
            },
            free_blocks: None,
        }
    }

    /// Whether this handle currently owns a mounted disk.
    pub fn is_mounted(&self) -> bool {
        self.disk.is_some()
    }

    /// A copy of the currently-mounted superblock. Meaningless if unmounted.
    pub fn superblock(&self) -> Superblock {
        self.meta_data
    }

    fn disk_mut(&mut self) -> Result<&mut Disk> {
        self.disk.as_mut().ok_or(Error::NotMounted)
    }

    /// Write a fresh, empty SimpleFS volume to `disk`.
    ///
    /// Refuses if this `FileSystem` already has a disk mounted — formatting
    /// a disk while this handle has exclusive use of another would violate
    /// the one-disk-per-handle ownership model.
    pub fn format(&mut self, disk: &mut Disk) -> Result<()> {
        if self.disk.is_some() {
            return Err(Error::AlreadyMounted);
        }

        let superblock = Superblock::new(disk.blocks());
        let mut block = [0u8; BLOCK_SIZE];
        superblock.write_to(&mut block)?;
        disk.write(0, &block)?;

        let zero = [0u8; BLOCK_SIZE];
        for i in 1..disk.blocks() {
            disk.write(i, &zero)?;
        }

        log::info!(
            "formatted disk: {} blocks, {} inode blocks, {} inodes",
            superblock.blocks,
            superblock.inode_blocks,
            superblock.inodes
        );
        Ok(())
    }

    /// Validate `disk`'s superblock and take exclusive ownership of it.
    ///
    /// On any failure the caller gets `disk` back alongside the error,
    /// matching `format`'s caller-keeps-ownership contract: a failed mount
    /// must not destroy the caller's disk handle.
    pub fn mount(&mut self, mut disk: Disk) -> std::result::Result<(), (Disk, Error)> {
        if self.disk.is_some() {
            return Err((disk, Error::AlreadyMounted));
        }

        let mut block = [0u8; BLOCK_SIZE];
        if let Err(e) = disk.read(0, &mut block) {
            return Err((disk, e));
        }
        let superblock = match Superblock::read_from(&block) {
            Ok(superblock) => superblock,
            Err(e) => return Err((disk, e)),
        };
        if let Err(e) = superblock.validate(disk.blocks()) {
            return Err((disk, e));
        }

        let previous_meta_data = self.meta_data;
        self.meta_data = superblock;
        let bitmap = match self.init_bit_map(&mut disk) {
            Ok(bitmap) => bitmap,
            Err(e) => {
                self.meta_data = previous_meta_data;
                return Err((disk, e));
            }
        };

        #[cfg(feature = "debug_log")]
        log::debug!(
            "mounted disk: {} blocks, {} free",
            self.meta_data.blocks,
            bitmap.len() - (0..bitmap.len()).filter(|&i| bitmap.is_used(i)).count() as u32
        );

        self.disk = Some(disk);
        self.free_blocks = Some(bitmap);
        Ok(())
    }

    /// Release the in-memory bitmap and hand the disk back to the caller.
    /// No flush is needed: every state-changing operation writes through to
    /// disk as it happens.
    pub fn unmount(&mut self) -> Option<Disk> {
        self.free_blocks = None;
        self.disk.take()
    }

    /// Allocate the first free inode.
    pub fn create(&mut self) -> Result<u32> {
        let inode_blocks = self.meta_data.inode_blocks;
        for block in 1..=inode_blocks {
            let mut raw = [0u8; BLOCK_SIZE];
            self.disk_mut()?.read(block, &mut raw)?;

            for slot in 0..INODES_PER_BLOCK {
                let bytes = &raw[slot * crate::layout::INODE_SIZE..(slot + 1) * crate::layout::INODE_SIZE];
                let inode = Inode::read_from(bytes)?;
                if !inode.is_valid() {
                    let fresh = Inode {
                        valid: 1,
                        size: 0,
                        direct: [0; POINTERS_PER_INODE],
                        indirect: 0,
                    };
                    let out = &mut raw
                        [slot * crate::layout::INODE_SIZE..(slot + 1) * crate::layout::INODE_SIZE];
                    fresh.write_to(out)?;
                    self.disk_mut()?.write(block, &raw)?;

                    let inode_number = (block - 1) * INODES_PER_BLOCK as u32 + slot as u32;
                    let bitmap = self.init_bit_map_from_mounted()?;
                    self.free_blocks = Some(bitmap);

                    log::info!("created inode {inode_number}");
                    return Ok(inode_number);
                }
            }
        }
        Err(Error::NoFreeInodes)
    }

    /// Mark an inode as free, freeing every block it referenced.
    pub fn remove(&mut self, inode_number: u32) -> Result<()> {
        let (block, slot, mut raw) = self.read_inode_block(inode_number)?;
        let mut inode = Inode::read_from(
            &raw[slot * crate::layout::INODE_SIZE..(slot + 1) * crate::layout::INODE_SIZE],
        )?;
        if !inode.is_valid() {
            return Err(Error::InvalidInode(inode_number));
        }

        let bitmap = self.free_blocks.as_mut().ok_or(Error::NotMounted)?;
        for &pointer in inode.direct.iter() {
            if pointer != 0 {
                bitmap.mark_free(pointer);
            }
        }
        if inode.indirect != 0 {
            bitmap.mark_free(inode.indirect);
            let mut indirect_block = [0u8; BLOCK_SIZE];
            self.disk_mut()?.read(inode.indirect, &mut indirect_block)?;
            let pointers = read_pointer_block(&indirect_block)?;
            let bitmap = self.free_blocks.as_mut().ok_or(Error::NotMounted)?;
            for &pointer in pointers.iter() {
                if pointer == 0 {
                    break;
                }
                bitmap.mark_free(pointer);
            }
        }

        inode.valid = 0;
        let out =
            &mut raw[slot * crate::layout::INODE_SIZE..(slot + 1) * crate::layout::INODE_SIZE];
        inode.write_to(out)?;
        self.disk_mut()?.write(block, &raw)?;

        log::info!("removed inode {inode_number}");
        Ok(())
    }

    /// The logical size of a valid inode.
    pub fn stat(&mut self, inode_number: u32) -> Result<u32> {
        let inode = self.read_inode(inode_number)?;
        if !inode.is_valid() {
            return Err(Error::InvalidInode(inode_number));
        }
        Ok(inode.size)
    }

    /// Copy up to one data block's worth of bytes starting at `offset` into
    /// `buf`, returning the number of bytes actually copied.
    pub fn read(&mut self, inode_number: u32, buf: &mut [u8], offset: u32) -> Result<usize> {
        let inode = self.read_inode(inode_number)?;
        if !inode.is_valid() {
            return Err(Error::InvalidInode(inode_number));
        }
        if offset >= inode.size {
            return Err(Error::OffsetBeyondEof);
        }

        let pt_idx = (offset / BLOCK_SIZE as u32) as usize;
        let block_idx = self.file_block(&inode, pt_idx)?;

        let mut data = [0u8; BLOCK_SIZE];
        if block_idx != 0 {
            self.disk_mut()?.read(block_idx, &mut data)?;
        }

        let available = (inode.size - offset) as usize;
        let to_copy = available.min(BLOCK_SIZE).min(buf.len());
        buf[..to_copy].copy_from_slice(&data[..to_copy]);
        Ok(to_copy)
    }

    /// Allocate a fresh data block, write `buf` (zero-padded) into it, and
    /// link it into the inode at the logical block selected by `offset`.
    /// Each call addresses exactly one data block.
    pub fn write(&mut self, inode_number: u32, buf: &[u8], offset: u32) -> Result<usize> {
        let (block, slot, mut raw) = self.read_inode_block(inode_number)?;
        let mut inode = Inode::read_from(
            &raw[slot * crate::layout::INODE_SIZE..(slot + 1) * crate::layout::INODE_SIZE],
        )?;
        if !inode.is_valid() {
            return Err(Error::InvalidInode(inode_number));
        }

        let pt_idx = (offset / BLOCK_SIZE as u32) as usize;
        if pt_idx >= POINTERS_PER_INODE + POINTERS_PER_BLOCK {
            return Err(Error::FileTooLarge);
        }

        let new_block = self.assign_block()?;

        let mut payload = [0u8; BLOCK_SIZE];
        let n = buf.len().min(BLOCK_SIZE);
        payload[..n].copy_from_slice(&buf[..n]);
        if let Err(e) = self.disk_mut()?.write(new_block, &payload) {
            self.unassign_block(new_block);
            return Err(e);
        }

        if pt_idx < POINTERS_PER_INODE {
            inode.direct[pt_idx] = new_block;
        } else if let Err(e) = self.link_indirect(&mut inode, new_block) {
            self.unassign_block(new_block);
            return Err(e);
        }

        inode.size += buf.len() as u32;
        let out =
            &mut raw[slot * crate::layout::INODE_SIZE..(slot + 1) * crate::layout::INODE_SIZE];
        inode.write_to(out)?;
        self.disk_mut()?.write(block, &raw)?;

        Ok(buf.len())
    }

    /// Read-only inspection of a (possibly unmounted) disk image: prints the
    /// superblock and every valid inode's size, direct blocks, and indirect
    /// pointers to stdout.
    pub fn debug(disk: &mut Disk) -> Result<()> {
        let mut raw = [0u8; BLOCK_SIZE];
        disk.read(0, &mut raw)?;
        let superblock = Superblock::read_from(&raw)?;
        if superblock.magic_number != crate::layout::MAGIC_NUMBER {
            return Err(Error::InvalidSuperblock);
        }

        println!("SuperBlock:");
        println!("    magic number is valid");
        println!("    {} blocks", superblock.blocks);
        println!("    {} inode blocks", superblock.inode_blocks);
        println!("    {} inodes", superblock.inodes);

        for block in 1..=superblock.inode_blocks {
            disk.read(block, &mut raw)?;
            for slot in 0..INODES_PER_BLOCK {
                let bytes =
                    &raw[slot * crate::layout::INODE_SIZE..(slot + 1) * crate::layout::INODE_SIZE];
                let inode = Inode::read_from(bytes)?;
                if !inode.is_valid() {
                    continue;
                }

                let inode_number = (block - 1) * INODES_PER_BLOCK as u32 + slot as u32;
                println!("Inode {inode_number}:");
                println!("    size: {} bytes", inode.size);

                let direct: Vec<u32> = inode.direct.iter().copied().filter(|&p| p != 0).collect();
                if !direct.is_empty() {
                    let list = direct
                        .iter()
                        .map(u32::to_string)
                        .collect::<Vec<_>>()
                        .join(" ");
                    println!("    direct blocks: {list}");
                }

                if inode.indirect != 0 {
                    println!("    indirect block: {}", inode.indirect);
                    let mut indirect_raw = [0u8; BLOCK_SIZE];
                    disk.read(inode.indirect, &mut indirect_raw)?;
                    let pointers = read_pointer_block(&indirect_raw)?;
                    let mut used = Vec::new();
                    for &pointer in pointers.iter() {
                        if pointer == 0 {
                            break;
                        }
                        used.push(pointer);
                    }
                    if !used.is_empty() {
                        let list = used
                            .iter()
                            .map(u32::to_string)
                            .collect::<Vec<_>>()
                            .join(" ");
                        println!("    indirect blocks: {list}");
                    }
                }
            }
        }

        Ok(())
    }

    // -- internal helpers -------------------------------------------------

    /// Read an inode-table block and return it alongside the block number
    /// and the requested inode's slot, so callers can mutate and write the
    /// block straight back.
    fn read_inode_block(&mut self, inode_number: u32) -> Result<(u32, usize, [u8; BLOCK_SIZE])> {
        if inode_number >= self.meta_data.inodes {
            return Err(Error::InvalidInode(inode_number));
        }
        let (block, slot) = inode_location(inode_number);
        let mut raw = [0u8; BLOCK_SIZE];
        self.disk_mut()?.read(block, &mut raw)?;
        Ok((block, slot, raw))
    }

    fn read_inode(&mut self, inode_number: u32) -> Result<Inode> {
        let (_, slot, raw) = self.read_inode_block(inode_number)?;
        Inode::read_from(&raw[slot * crate::layout::INODE_SIZE..(slot + 1) * crate::layout::INODE_SIZE])
    }

    /// Resolve the logical block index `pt_idx` of `inode` to a disk block
    /// number (0 if unallocated), following the indirect block when needed.
    fn file_block(&mut self, inode: &Inode, pt_idx: usize) -> Result<u32> {
        if pt_idx < POINTERS_PER_INODE {
            return Ok(inode.direct[pt_idx]);
        }
        if inode.indirect == 0 {
            return Ok(0);
        }
        let mut indirect_raw = [0u8; BLOCK_SIZE];
        self.disk_mut()?.read(inode.indirect, &mut indirect_raw)?;
        let pointers = read_pointer_block(&indirect_raw)?;
        Ok(pointers[pt_idx - POINTERS_PER_INODE])
    }

    /// Install `new_block` into the first zero-valued slot of `inode`'s
    /// indirect block, allocating that block first if necessary.
    fn link_indirect(&mut self, inode: &mut Inode, new_block: u32) -> Result<()> {
        if inode.indirect == 0 {
            inode.indirect = self.assign_block()?;
        }

        let mut indirect_raw = [0u8; BLOCK_SIZE];
        self.disk_mut()?.read(inode.indirect, &mut indirect_raw)?;
        let mut pointers = read_pointer_block(&indirect_raw)?;

        let slot = pointers.iter().position(|&p| p == 0);
        match slot {
            Some(slot) => {
                pointers[slot] = new_block;
                let block = write_pointer_block(&pointers)?;
                self.disk_mut()?.write(inode.indirect, &block)?;
                Ok(())
            }
            None => Err(Error::NoFreePointerSlot),
        }
    }

    /// Find and claim the first free block, zero-filling it on disk so a
    /// freshly-allocated indirect block starts as all-zero pointers.
    fn assign_block(&mut self) -> Result<u32> {
        let candidate = self
            .free_blocks
            .as_ref()
            .ok_or(Error::NotMounted)?
            .first_free()
            .ok_or(Error::NoFreeBlocks)?;

        let zero = [0u8; BLOCK_SIZE];
        self.disk_mut()?.write(candidate, &zero)?;
        self.free_blocks.as_mut().unwrap().mark_used(candidate);
        Ok(candidate)
    }

    fn unassign_block(&mut self, i: u32) {
        if let Some(bitmap) = self.free_blocks.as_mut() {
            bitmap.mark_free(i);
        }
    }

    /// Walk the inode table and build a fresh free-block bitmap.
    fn init_bit_map(&mut self, disk: &mut Disk) -> Result<FreeBlockBitmap> {
        let mut bitmap = FreeBlockBitmap::new(self.meta_data.blocks);
        bitmap.mark_used(0);
        for block in 1..=self.meta_data.inode_blocks {
            bitmap.mark_used(block);
        }

        for block in 1..=self.meta_data.inode_blocks {
            let mut raw = [0u8; BLOCK_SIZE];
            disk.read(block, &mut raw)?;
            for slot in 0..INODES_PER_BLOCK {
                let bytes =
                    &raw[slot * crate::layout::INODE_SIZE..(slot + 1) * crate::layout::INODE_SIZE];
                let inode = Inode::read_from(bytes)?;
                if !inode.is_valid() {
                    continue;
                }
                for &pointer in inode.direct.iter() {
                    if pointer != 0 {
                        bitmap.mark_used(pointer);
                    }
                }
                if inode.indirect != 0 {
                    bitmap.mark_used(inode.indirect);
                    let mut indirect_raw = [0u8; BLOCK_SIZE];
                    disk.read(inode.indirect, &mut indirect_raw)?;
                    let pointers = read_pointer_block(&indirect_raw)?;
                    for &pointer in pointers.iter() {
                        if pointer != 0 {
                            bitmap.mark_used(pointer);
                        }
                    }
                }
            }
        }

        Ok(bitmap)
    }

    /// Rebuild the bitmap using the currently-mounted disk (used by `create`,
    /// which rebuilds the bitmap after allocating an inode).
    fn init_bit_map_from_mounted(&mut self) -> Result<FreeBlockBitmap> {
        let mut disk = self.disk.take().ok_or(Error::NotMounted)?;
        let result = self.init_bit_map(&mut disk);
        self.disk = Some(disk);
        result
    }
}
