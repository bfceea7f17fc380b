//! File read/write over an inode's direct blocks (spec §4.8, §4.9),
//! allocating new blocks on demand.

use std::cmp::min;

use log::trace;

use crate::alloc::alloc_block;
use crate::device::BlockDevice;
use crate::error::{Error, RufsResult};
use crate::inode::{write_inode, Inode};
use crate::layout::{Superblock, BLOCK_SIZE, DIRECT_PTRS};

struct Chunk {
    block_idx: usize,
    in_block_off: usize,
    len: usize,
}

fn chunks(offset: u64, len: usize) -> impl Iterator<Item = Chunk> {
    let mut done = 0usize;
    std::iter::from_fn(move || {
        if done >= len {
            return None;
        }
        let pos = offset as usize + done;
        let block_idx = pos / BLOCK_SIZE;
        let in_block_off = pos % BLOCK_SIZE;
        let chunk_len = min(BLOCK_SIZE - in_block_off, len - done);
        done += chunk_len;
        Some(Chunk {
            block_idx,
            in_block_off,
            len: chunk_len,
        })
    })
}

/// Read up to `size` bytes at `offset` from `inode`'s direct blocks.
pub fn read(
    device: &mut dyn BlockDevice,
    inode: &Inode,
    buf: &mut [u8],
    offset: u64,
    size: usize,
) -> RufsResult<usize> {
    let length = inode.byte_len();
    if offset >= length {
        return Ok(0);
    }
    let size = min(size, (length - offset) as usize);

    let mut done = 0usize;
    for chunk in chunks(offset, size) {
        if chunk.block_idx >= DIRECT_PTRS {
            return Err(Error::TooBig);
        }
        let ptr = inode.direct_ptr[chunk.block_idx];
        let mut block = [0u8; BLOCK_SIZE];
        if ptr != 0 {
            device.read_block(ptr, &mut block)?;
        }
        buf[done..done + chunk.len]
            .copy_from_slice(&block[chunk.in_block_off..chunk.in_block_off + chunk.len]);
        done += chunk.len;
    }
    Ok(done)
}

/// Write `data` at `offset` into `inode`'s direct blocks, allocating new
/// blocks as needed and persisting the updated inode once at the end.
pub fn write(
    device: &mut dyn BlockDevice,
    sb: &Superblock,
    inode: &mut Inode,
    data: &[u8],
    offset: u64,
) -> RufsResult<usize> {
    let mut done = 0usize;
    for chunk in chunks(offset, data.len()) {
        if chunk.block_idx >= DIRECT_PTRS {
            return Err(Error::TooBig);
        }

        // Fill any gap between the inode's current size and this chunk's
        // block so invariant 3 (`direct_ptr[j] != 0` for `j < size`) keeps
        // holding even when the write starts past the current end of file
        // (e.g. a write at offset `2 * BLOCK_SIZE` on an empty file must
        // not leave `direct_ptr[0]`/`direct_ptr[1]` as zero once
        // `inode.size` is bumped past them).
        while (inode.size as usize) < chunk.block_idx {
            let j = inode.size as usize;
            let gap_block = alloc_block(device, sb)?;
            device.write_block(gap_block, &[0u8; BLOCK_SIZE])?;
            inode.direct_ptr[j] = gap_block;
            inode.size += 1;
        }

        let existing_ptr = inode.direct_ptr[chunk.block_idx];

        let (block_num, mut block) = if existing_ptr == 0 {
            // Never-allocated slot: allocate fresh, starting from zeros.
            // Whether this chunk happens to cover the whole block or only
            // part of it makes no difference here (spec §9, open question
            // 3: allocate only if `direct_ptr[block_idx] == 0`).
            let new_block = alloc_block(device, sb)?;
            inode.direct_ptr[chunk.block_idx] = new_block;
            (new_block, [0u8; BLOCK_SIZE])
        } else {
            // Re-used slot (spec §9, open question 3): read-modify-write
            // the existing block instead of leaking it behind a fresh
            // allocation.
            let mut buf = [0u8; BLOCK_SIZE];
            device.read_block(existing_ptr, &mut buf)?;
            (existing_ptr, buf)
        };

        block[chunk.in_block_off..chunk.in_block_off + chunk.len]
            .copy_from_slice(&data[done..done + chunk.len]);
        device.write_block(block_num, &block)?;

        inode.size = inode.size.max(chunk.block_idx as u32 + 1);
        done += chunk.len;
    }

    write_inode(device, sb, inode.ino, inode)?;
    trace!(
        "write: inode {} now spans {} block(s)",
        inode.ino,
        inode.size
    );
    Ok(done)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::device::FileBlockDevice;
    use crate::inode::{read_inode, FileType};
    use crate::mkfs::format;
    use crate::alloc::alloc_inode;
    use tempfile::tempdir;

    fn fresh_fs() -> (FileBlockDevice, Superblock, tempfile::TempDir) {
        let dir = tempdir().unwrap();
        let path = dir.path().join("disk.img");
        let (dev, sb) = format(&path).unwrap();
        (dev, sb, dir)
    }

    #[test]
    fn write_then_read_roundtrip() {
        let (mut dev, sb, _dir) = fresh_fs();
        let ino = alloc_inode(&mut dev, &sb).unwrap();
        let mut inode = Inode::new(ino, FileType::Regular);

        let n = write(&mut dev, &sb, &mut inode, b"hello", 0).unwrap();
        assert_eq!(n, 5);

        let mut buf = [0u8; 5];
        let read_back = read(&mut dev, &inode, &mut buf, 0, 5).unwrap();
        assert_eq!(read_back, 5);
        assert_eq!(&buf, b"hello");
    }

    #[test]
    fn read_clamps_past_eof() {
        let (mut dev, sb, _dir) = fresh_fs();
        let ino = alloc_inode(&mut dev, &sb).unwrap();
        let mut inode = Inode::new(ino, FileType::Regular);
        write(&mut dev, &sb, &mut inode, b"abc", 0).unwrap();

        let mut buf = [0u8; 16];
        let n = read(&mut dev, &inode, &mut buf, 0, 16).unwrap();
        // Byte length is block-granular, so a full block is readable even
        // past the bytes actually written; only genuinely past-EOF offsets
        // clamp to zero.
        assert_eq!(n, BLOCK_SIZE);
        assert_eq!(&buf[..3], b"abc");

        let n2 = read(&mut dev, &inode, &mut buf, inode.byte_len(), 16).unwrap();
        assert_eq!(n2, 0);
    }

    #[test]
    fn second_aligned_write_does_not_leak_block() {
        let (mut dev, sb, _dir) = fresh_fs();
        let ino = alloc_inode(&mut dev, &sb).unwrap();
        let mut inode = Inode::new(ino, FileType::Regular);

        let block_a = vec![b'A'; BLOCK_SIZE];
        write(&mut dev, &sb, &mut inode, &block_a, 0).unwrap();
        let first_ptr = inode.direct_ptr[0];

        let block_b = vec![b'B'; BLOCK_SIZE];
        write(&mut dev, &sb, &mut inode, &block_b, 0).unwrap();
        let second_ptr = inode.direct_ptr[0];

        assert_eq!(first_ptr, second_ptr);
        let reloaded = read_inode(&mut dev, &sb, ino).unwrap();
        assert_eq!(reloaded.direct_ptr[0], first_ptr);

        let mut buf = vec![0u8; BLOCK_SIZE];
        read(&mut dev, &inode, &mut buf, 0, BLOCK_SIZE).unwrap();
        assert_eq!(buf, block_b);
    }

    #[test]
    fn write_past_end_of_empty_file_fills_gap_blocks() {
        let (mut dev, sb, _dir) = fresh_fs();
        let ino = alloc_inode(&mut dev, &sb).unwrap();
        let mut inode = Inode::new(ino, FileType::Regular);

        let offset = 2 * BLOCK_SIZE as u64;
        write(&mut dev, &sb, &mut inode, b"gap", offset).unwrap();

        // size bumps straight to block_idx + 1, so every slot below it
        // must be a real, zero-filled block per invariant 3.
        assert_eq!(inode.size, 3);
        assert_ne!(inode.direct_ptr[0], 0);
        assert_ne!(inode.direct_ptr[1], 0);
        assert_ne!(inode.direct_ptr[2], 0);

        let mut gap_block = [0u8; BLOCK_SIZE];
        read(&mut dev, &inode, &mut gap_block, 0, BLOCK_SIZE).unwrap();
        assert_eq!(gap_block, [0u8; BLOCK_SIZE]);
        let mut second_gap_block = [0u8; BLOCK_SIZE];
        read(&mut dev, &inode, &mut second_gap_block, BLOCK_SIZE as u64, BLOCK_SIZE).unwrap();
        assert_eq!(second_gap_block, [0u8; BLOCK_SIZE]);

        let mut buf = [0u8; 3];
        read(&mut dev, &inode, &mut buf, offset, 3).unwrap();
        assert_eq!(&buf, b"gap");

        let reloaded = read_inode(&mut dev, &sb, ino).unwrap();
        assert_eq!(reloaded.direct_ptr, inode.direct_ptr);
        assert_eq!(reloaded.size, 3);
    }

    #[test]
    fn write_beyond_direct_pointers_fails() {
        let (mut dev, sb, _dir) = fresh_fs();
        let ino = alloc_inode(&mut dev, &sb).unwrap();
        let mut inode = Inode::new(ino, FileType::Regular);
        let offset = (DIRECT_PTRS as u64) * BLOCK_SIZE as u64;
        let err = write(&mut dev, &sb, &mut inode, b"x", offset).unwrap_err();
        assert!(matches!(err, Error::TooBig));
    }
}
