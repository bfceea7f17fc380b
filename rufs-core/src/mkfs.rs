//! Filesystem formatter (spec §4.6): constructs initial on-disk state and
//! the root inode.

use std::path::Path;

use log::info;

use crate::bitmap;
use crate::device::{BlockDevice, FileBlockDevice};
use crate::error::RufsResult;
use crate::inode::{write_inode, FileType, Inode};
use crate::layout::{Superblock, BLOCK_SIZE, MAX_DNUM};

/// Format a fresh image at `path`: create the device, write the
/// superblock, zero the inode bitmap, reserve metadata bits in the data
/// bitmap, and construct the root inode. Returns the opened device and
/// its superblock, ready for mounting.
pub fn format(path: &Path) -> RufsResult<(FileBlockDevice, Superblock)> {
    let sb = Superblock::new();
    // The image spans every addressable data-block slot up front (spec
    // §4.6 step 1: "preallocates zeroed blocks").
    let mut device = FileBlockDevice::create(path, MAX_DNUM)?;
    format_device(&mut device, &sb)?;
    info!("mkfs: formatted {:?} (d_start_blk={})", path, sb.d_start_blk);
    Ok((device, sb))
}

/// Apply the mkfs steps to an already-created device. Split out from
/// [`format`] so callers that already own a `BlockDevice` (tests, or a
/// host that manages image creation itself) can format in place.
pub fn format_device(device: &mut dyn BlockDevice, sb: &Superblock) -> RufsResult<()> {
    device.write_block(0, &sb.to_bytes())?;

    let mut inode_bitmap = [0u8; BLOCK_SIZE];
    device.write_block(sb.i_bitmap_blk, &inode_bitmap)?;

    let mut data_bitmap = [0u8; BLOCK_SIZE];
    for b in 0..sb.d_start_blk {
        bitmap::set(&mut data_bitmap, b as usize);
    }
    device.write_block(sb.d_bitmap_blk, &data_bitmap)?;

    let root = Inode::new(0, FileType::Directory);
    write_inode(device, sb, 0, &root)?;

    bitmap::set(&mut inode_bitmap, 0);
    device.write_block(sb.i_bitmap_blk, &inode_bitmap)?;

    Ok(())
}
