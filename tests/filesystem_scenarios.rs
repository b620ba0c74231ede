use simplefs::{Disk, Error, FileSystem};
use tempfile::tempdir;

fn disk_at(dir: &tempfile::TempDir, name: &str) -> std::path::PathBuf {
    dir.path().join(name)
}

#[test]
fn format_then_mount_a_small_disk() {
    let dir = tempdir().unwrap();
    let path = disk_at(&dir, "disk.img");

    let mut disk = Disk::open(&path, 100).unwrap();
    let mut fs = FileSystem::new();
    fs.format(&mut disk).unwrap();
    disk.close();

    let disk = Disk::open(&path, 100).unwrap();
    let mut fs = FileSystem::new();
    fs.mount(disk).unwrap();
    assert!(fs.is_mounted());
    assert_eq!(fs.superblock().blocks, 100);
    assert_eq!(fs.superblock().inode_blocks, 10);
}

#[test]
fn create_inodes_and_stat_them() {
    let dir = tempdir().unwrap();
    let path = disk_at(&dir, "disk.img");
    let mut disk = Disk::open(&path, 100).unwrap();
    let mut fs = FileSystem::new();
    fs.format(&mut disk).unwrap();
    fs.mount(disk).unwrap();

    let a = fs.create().unwrap();
    let b = fs.create().unwrap();
    assert_ne!(a, b);
    assert_eq!(fs.stat(a).unwrap(), 0);
    assert_eq!(fs.stat(b).unwrap(), 0);
}

#[test]
fn write_then_read_back_matches() {
    let dir = tempdir().unwrap();
    let path = disk_at(&dir, "disk.img");
    let mut disk = Disk::open(&path, 100).unwrap();
    let mut fs = FileSystem::new();
    fs.format(&mut disk).unwrap();
    fs.mount(disk).unwrap();

    let inode = fs.create().unwrap();
    let written = fs.write(inode, b"hello, simplefs", 0).unwrap();
    assert_eq!(written, 15);
    assert_eq!(fs.stat(inode).unwrap(), 15);

    let mut out = [0u8; 15];
    let read = fs.read(inode, &mut out, 0).unwrap();
    assert_eq!(read, 15);
    assert_eq!(&out, b"hello, simplefs");
}

#[test]
fn filling_direct_pointers_spills_into_indirect_block() {
    let dir = tempdir().unwrap();
    let path = disk_at(&dir, "disk.img");
    let mut disk = Disk::open(&path, 2000).unwrap();
    let mut fs = FileSystem::new();
    fs.format(&mut disk).unwrap();
    fs.mount(disk).unwrap();

    let inode = fs.create().unwrap();
    let block = vec![0x11u8; simplefs::BLOCK_SIZE];

    // Five direct blocks.
    for i in 0..5u32 {
        fs.write(inode, &block, i * simplefs::BLOCK_SIZE as u32)
            .unwrap();
    }
    // Sixth write must go through the indirect block.
    fs.write(inode, &block, 5 * simplefs::BLOCK_SIZE as u32)
        .unwrap();

    assert_eq!(fs.stat(inode).unwrap(), 6 * simplefs::BLOCK_SIZE as u32);

    let mut out = vec![0u8; simplefs::BLOCK_SIZE];
    let read = fs
        .read(inode, &mut out, 5 * simplefs::BLOCK_SIZE as u32)
        .unwrap();
    assert_eq!(read, simplefs::BLOCK_SIZE);
    assert_eq!(out, block);
}

#[test]
fn remove_then_recreate_reuses_inode_number() {
    let dir = tempdir().unwrap();
    let path = disk_at(&dir, "disk.img");
    let mut disk = Disk::open(&path, 100).unwrap();
    let mut fs = FileSystem::new();
    fs.format(&mut disk).unwrap();
    fs.mount(disk).unwrap();

    let inode = fs.create().unwrap();
    fs.write(inode, b"transient", 0).unwrap();
    fs.remove(inode).unwrap();
    assert!(matches!(fs.stat(inode), Err(Error::InvalidInode(_))));

    let reused = fs.create().unwrap();
    assert_eq!(reused, inode);
    assert_eq!(fs.stat(reused).unwrap(), 0);
}

#[test]
fn mounting_an_unformatted_disk_fails_on_bad_magic() {
    let dir = tempdir().unwrap();
    let path = disk_at(&dir, "disk.img");
    let disk = Disk::open(&path, 100).unwrap();

    let mut fs = FileSystem::new();
    let (disk, err) = fs.mount(disk).unwrap_err();
    assert!(matches!(err, Error::InvalidSuperblock));
    assert!(!fs.is_mounted());

    // The caller keeps ownership of the disk after a failed mount.
    disk.close();
}

#[test]
fn mounting_with_wrong_block_count_fails() {
    let dir = tempdir().unwrap();
    let path = disk_at(&dir, "disk.img");
    let mut disk = Disk::open(&path, 100).unwrap();
    let mut fs = FileSystem::new();
    fs.format(&mut disk).unwrap();
    disk.close();

    let disk = Disk::open(&path, 50).unwrap();
    let mut fs = FileSystem::new();
    let (disk, err) = fs.mount(disk).unwrap_err();
    assert!(matches!(err, Error::BlockCountMismatch { .. }));
    disk.close();
}

#[test]
fn debug_reports_invalid_superblock_on_unformatted_disk() {
    let dir = tempdir().unwrap();
    let path = disk_at(&dir, "disk.img");
    let mut disk = Disk::open(&path, 10).unwrap();
    assert!(matches!(
        FileSystem::debug(&mut disk),
        Err(Error::InvalidSuperblock)
    ));
}
