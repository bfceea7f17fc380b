//! Inode-number and data-block-number allocators (spec §4.2): a bitmap
//! scan with immediate persistence. A crash after the bitmap write but
//! before the caller finishes leaves an allocated-but-unused slot — a
//! leak, never a double-allocation.

use log::{debug, warn};

use crate::bitmap;
use crate::device::BlockDevice;
use crate::error::{Error, RufsResult};
use crate::layout::{Superblock, BLOCK_SIZE, MAX_DNUM, MAX_INUM};

/// Scan `[0, limit)` in `buf` for the first clear bit, set it, and return
/// its index, or `None` if the bitmap is full.
fn first_free(buf: &mut [u8; BLOCK_SIZE], limit: u32) -> Option<u32> {
    for i in 0..limit {
        if !bitmap::get(buf, i as usize) {
            bitmap::set(buf, i as usize);
            return Some(i);
        }
    }
    None
}

/// Allocate an inode number. Persists the updated inode bitmap before
/// returning.
pub fn alloc_inode(device: &mut dyn BlockDevice, sb: &Superblock) -> RufsResult<u32> {
    let mut buf = [0u8; BLOCK_SIZE];
    device.read_block(sb.i_bitmap_blk, &mut buf)?;
    match first_free(&mut buf, MAX_INUM) {
        Some(ino) => {
            device.write_block(sb.i_bitmap_blk, &buf)?;
            debug!("alloc_inode: allocated inode {}", ino);
            Ok(ino)
        }
        None => {
            warn!("alloc_inode: inode table exhausted");
            Err(Error::NoSpace)
        }
    }
}

/// Allocate a data-block number. Metadata bits `[0, d_start_blk)` are
/// pre-set at mkfs, so the allocator never returns a metadata block.
pub fn alloc_block(device: &mut dyn BlockDevice, sb: &Superblock) -> RufsResult<u32> {
    let mut buf = [0u8; BLOCK_SIZE];
    device.read_block(sb.d_bitmap_blk, &mut buf)?;
    match first_free(&mut buf, MAX_DNUM) {
        Some(blk) => {
            device.write_block(sb.d_bitmap_blk, &buf)?;
            debug!("alloc_block: allocated block {}", blk);
            Ok(blk)
        }
        None => {
            warn!("alloc_block: data block pool exhausted");
            Err(Error::NoSpace)
        }
    }
}
