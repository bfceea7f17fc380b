//! Directory store (spec §4.4): dirent search and insertion over a
//! directory inode's direct data blocks.

use log::{trace, warn};

use crate::alloc::alloc_block;
use crate::device::BlockDevice;
use crate::dirent::{Dirent, DIRENT_SIZE};
use crate::error::{Error, RufsResult};
use crate::inode::{write_inode, Inode};
use crate::layout::{Superblock, BLOCK_SIZE, DIRECT_PTRS, DIRENTS_PER_BLOCK};

fn read_block(device: &mut dyn BlockDevice, blk: u32) -> RufsResult<[u8; BLOCK_SIZE]> {
    let mut buf = [0u8; BLOCK_SIZE];
    device.read_block(blk, &mut buf)?;
    Ok(buf)
}

fn dirent_at(buf: &[u8; BLOCK_SIZE], slot: u32) -> RufsResult<Dirent> {
    let start = slot as usize * DIRENT_SIZE;
    Dirent::from_bytes(&buf[start..start + DIRENT_SIZE])
}

fn write_dirent_at(buf: &mut [u8; BLOCK_SIZE], slot: u32, dirent: &Dirent) {
    let start = slot as usize * DIRENT_SIZE;
    buf[start..start + DIRENT_SIZE].copy_from_slice(&dirent.to_bytes());
}

/// Find a dirent named `name` in directory inode `dir_ino`'s data blocks.
pub fn dir_find(
    device: &mut dyn BlockDevice,
    dir_ino: &Inode,
    name: &str,
) -> RufsResult<Option<Dirent>> {
    for j in 0..dir_ino.size {
        let ptr = dir_ino.direct_ptr[j as usize];
        if ptr == 0 {
            continue;
        }
        let buf = read_block(device, ptr)?;
        for slot in 0..DIRENTS_PER_BLOCK {
            let entry = dirent_at(&buf, slot)?;
            if entry.valid && entry.name_matches(name) {
                return Ok(Some(entry));
            }
        }
    }
    Ok(None)
}

/// Add an entry named `name` binding to `f_ino` in `dir_inode`. On success,
/// if growing the directory allocated a new block, `dir_inode.size` and
/// `direct_ptr` are updated in place and the inode is rewritten to disk.
pub fn dir_add(
    device: &mut dyn BlockDevice,
    sb: &Superblock,
    dir_inode: &mut Inode,
    f_ino: u32,
    name: &str,
) -> RufsResult<()> {
    // Duplicate check: scan every slot regardless of `valid` (spec §9,
    // open question 2 — the source only checked invalid slots, which is
    // inverted and would let duplicate names through).
    for j in 0..dir_inode.size {
        let ptr = dir_inode.direct_ptr[j as usize];
        if ptr == 0 {
            continue;
        }
        let buf = read_block(device, ptr)?;
        for slot in 0..DIRENTS_PER_BLOCK {
            let entry = dirent_at(&buf, slot)?;
            if entry.valid && entry.name_matches(name) {
                return Err(Error::Exists);
            }
        }
    }

    let new_dirent = Dirent::new(f_ino, name)?;

    // Placement into an existing block: earliest block, earliest slot wins.
    for j in 0..dir_inode.size {
        let ptr = dir_inode.direct_ptr[j as usize];
        if ptr == 0 {
            continue;
        }
        let mut buf = read_block(device, ptr)?;
        for slot in 0..DIRENTS_PER_BLOCK {
            let entry = dirent_at(&buf, slot)?;
            if !entry.valid {
                write_dirent_at(&mut buf, slot, &new_dirent);
                device.write_block(ptr, &buf)?;
                trace!("dir_add: placed '{}' in existing block {}", name, ptr);
                return Ok(());
            }
        }
    }

    // Grow the directory.
    if dir_inode.size as usize == DIRECT_PTRS {
        warn!("dir_add: directory full at {} blocks", DIRECT_PTRS);
        return Err(Error::NoSpace);
    }

    let new_block = alloc_block(device, sb)?;
    let mut buf = [0u8; BLOCK_SIZE];
    write_dirent_at(&mut buf, 0, &new_dirent);
    device.write_block(new_block, &buf)?;

    dir_inode.direct_ptr[dir_inode.size as usize] = new_block;
    dir_inode.size += 1;
    write_inode(device, sb, dir_inode.ino, dir_inode)?;
    trace!(
        "dir_add: grew directory {} to block {} (size {})",
        dir_inode.ino,
        new_block,
        dir_inode.size
    );

    Ok(())
}

/// Reserved for future deletion support; always succeeds without
/// modifying the directory.
pub fn dir_remove(
    _device: &mut dyn BlockDevice,
    _sb: &Superblock,
    _dir_inode: &mut Inode,
    _name: &str,
) -> RufsResult<()> {
    Ok(())
}

/// List the names of every valid dirent across a directory inode's active
/// direct blocks, in on-disk order.
pub fn dir_list(device: &mut dyn BlockDevice, dir_ino: &Inode) -> RufsResult<Vec<Dirent>> {
    let mut out = Vec::new();
    for j in 0..dir_ino.size {
        let ptr = dir_ino.direct_ptr[j as usize];
        if ptr == 0 {
            continue;
        }
        let buf = read_block(device, ptr)?;
        for slot in 0..DIRENTS_PER_BLOCK {
            let entry = dirent_at(&buf, slot)?;
            if entry.valid {
                out.push(entry);
            }
        }
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::device::FileBlockDevice;
    use crate::inode::FileType;
    use crate::mkfs::format;
    use tempfile::tempdir;

    fn fresh_fs() -> (FileBlockDevice, Superblock, tempfile::TempDir) {
        let dir = tempdir().unwrap();
        let path = dir.path().join("disk.img");
        let (dev, sb) = format(&path).unwrap();
        (dev, sb, dir)
    }

    #[test]
    fn add_then_find() {
        let (mut dev, sb, _dir) = fresh_fs();
        let mut root = crate::inode::read_inode(&mut dev, &sb, 0).unwrap();
        dir_add(&mut dev, &sb, &mut root, 7, "alpha").unwrap();

        let found = dir_find(&mut dev, &root, "alpha").unwrap().unwrap();
        assert_eq!(found.ino, 7);
        assert!(dir_find(&mut dev, &root, "beta").unwrap().is_none());
    }

    #[test]
    fn duplicate_name_rejected() {
        let (mut dev, sb, _dir) = fresh_fs();
        let mut root = crate::inode::read_inode(&mut dev, &sb, 0).unwrap();
        dir_add(&mut dev, &sb, &mut root, 7, "alpha").unwrap();
        let err = dir_add(&mut dev, &sb, &mut root, 8, "alpha").unwrap_err();
        assert!(matches!(err, Error::Exists));
    }

    #[test]
    fn growth_allocates_second_block() {
        let (mut dev, sb, _dir) = fresh_fs();
        let mut root = crate::inode::read_inode(&mut dev, &sb, 0).unwrap();
        for i in 0..DIRENTS_PER_BLOCK + 1 {
            let name = format!("f{i}");
            dir_add(&mut dev, &sb, &mut root, i + 1, &name).unwrap();
        }
        assert_eq!(root.size, 2);
        let mut bitmap = [0u8; BLOCK_SIZE];
        dev.read_block(sb.d_bitmap_blk, &mut bitmap).unwrap();
        assert!(crate::bitmap::get(&bitmap, root.direct_ptr[1] as usize));

        let all = dir_list(&mut dev, &root).unwrap();
        assert_eq!(all.len() as u32, DIRENTS_PER_BLOCK + 1);
    }

    #[test]
    fn directory_full_rejects_overflow() {
        let (mut dev, sb, _dir) = fresh_fs();
        let mut root = Inode::new(0, FileType::Directory);
        root.size = DIRECT_PTRS as u32;
        for j in 0..DIRECT_PTRS {
            let blk = alloc_block(&mut dev, &sb).unwrap();
            root.direct_ptr[j] = blk;
            let mut buf = [0u8; BLOCK_SIZE];
            for slot in 0..DIRENTS_PER_BLOCK {
                write_dirent_at(&mut buf, slot, &Dirent::new(1, &format!("x{j}-{slot}")).unwrap());
            }
            dev.write_block(blk, &buf).unwrap();
        }
        let err = dir_add(&mut dev, &sb, &mut root, 99, "overflow").unwrap_err();
        assert!(matches!(err, Error::NoSpace));
    }
}
