//! Disk geometry and the superblock persisted at block 0.
//!
//! Layout (bit-exact, see spec §6):
//!
//! ```text
//! block 0              : superblock (with trailing zero padding)
//! block 1              : inode bitmap  (BLOCK_SIZE bytes)
//! block 2              : data-block bitmap (BLOCK_SIZE bytes)
//! blocks [3, d_start)  : inode table (MAX_INUM slots, packed)
//! blocks [d_start, …)  : data area (directory blocks and file blocks)
//! ```

use crate::dirent::DIRENT_SIZE;
use crate::error::{Error, RufsResult};
use crate::inode::INODE_SIZE;

/// Fixed byte size of every disk block.
pub const BLOCK_SIZE: usize = 4096;

/// Total inode slots in the image.
pub const MAX_INUM: u32 = 1024;

/// Total data-block slots in the image.
pub const MAX_DNUM: u32 = 16384;

/// Direct-pointer fan-out per inode.
pub const DIRECT_PTRS: usize = 16;

/// Indirect-pointer fan-out per inode. Reserved; unused in the core.
pub const INDIRECT_PTRS: usize = 8;

/// Fixed signature written to `Superblock::magic_num`.
pub const MAGIC_NUM: u32 = 0x5246_5331; // "RFS1"

pub const INODES_PER_BLOCK: u32 = (BLOCK_SIZE / INODE_SIZE) as u32;
pub const DIRENTS_PER_BLOCK: u32 = (BLOCK_SIZE / DIRENT_SIZE) as u32;

const SUPERBLOCK_FIELDS: usize = 7;
const SUPERBLOCK_WIRE_SIZE: usize = SUPERBLOCK_FIELDS * 4;

/// In-memory superblock. Read once at mount and treated as read-only
/// thereafter (spec §4.7, §5).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Superblock {
    pub magic_num: u32,
    pub max_inum: u32,
    pub max_dnum: u32,
    pub i_bitmap_blk: u32,
    pub d_bitmap_blk: u32,
    pub i_start_blk: u32,
    pub d_start_blk: u32,
}

impl Superblock {
    /// Build the superblock for a fresh image per spec §3.
    pub fn new() -> Self {
        let i_bitmap_blk = 1;
        let d_bitmap_blk = 2;
        let i_start_blk = d_bitmap_blk + 1;
        let inode_table_bytes = MAX_INUM as u64 * INODE_SIZE as u64;
        let inode_table_blocks =
            inode_table_bytes.div_ceil(BLOCK_SIZE as u64) as u32;
        let d_start_blk = i_start_blk + inode_table_blocks;

        Superblock {
            magic_num: MAGIC_NUM,
            max_inum: MAX_INUM,
            max_dnum: MAX_DNUM,
            i_bitmap_blk,
            d_bitmap_blk,
            i_start_blk,
            d_start_blk,
        }
    }

    /// Block number holding the on-disk slot for inode `ino`.
    pub fn inode_block(&self, ino: u32) -> u32 {
        self.i_start_blk + ino / INODES_PER_BLOCK
    }

    /// Offset of inode `ino` within its block, in slots.
    pub fn inode_offset(&self, ino: u32) -> u32 {
        ino % INODES_PER_BLOCK
    }

    pub fn to_bytes(&self) -> [u8; BLOCK_SIZE] {
        let mut buf = [0u8; BLOCK_SIZE];
        let fields = [
            self.magic_num,
            self.max_inum,
            self.max_dnum,
            self.i_bitmap_blk,
            self.d_bitmap_blk,
            self.i_start_blk,
            self.d_start_blk,
        ];
        for (i, field) in fields.iter().enumerate() {
            buf[i * 4..i * 4 + 4].copy_from_slice(&field.to_le_bytes());
        }
        buf
    }

    pub fn from_bytes(buf: &[u8]) -> RufsResult<Self> {
        if buf.len() < SUPERBLOCK_WIRE_SIZE {
            return Err(Error::Invalid);
        }
        let read_u32 = |i: usize| {
            let mut b = [0u8; 4];
            b.copy_from_slice(&buf[i * 4..i * 4 + 4]);
            u32::from_le_bytes(b)
        };
        let sb = Superblock {
            magic_num: read_u32(0),
            max_inum: read_u32(1),
            max_dnum: read_u32(2),
            i_bitmap_blk: read_u32(3),
            d_bitmap_blk: read_u32(4),
            i_start_blk: read_u32(5),
            d_start_blk: read_u32(6),
        };
        if sb.magic_num != MAGIC_NUM {
            return Err(Error::Invalid);
        }
        Ok(sb)
    }
}

impl Default for Superblock {
    fn default() -> Self {
        Self::new()
    }
}
