//! On-disk layout, allocation, and name-resolution engine for a tiny
//! user-space file system.
//!
//! This crate is the core a host kernel bridge (FUSE or similar) drives:
//! superblock/bitmap/inode/data-block geometry, the inode and directory
//! encoding, the bitmap-backed allocators, block-level inode read/write,
//! directory lookup/insertion, and recursive path resolution. The VFS
//! adapter that dispatches incoming operations to [`fs::Filesystem`], and
//! the block device's physical backing beyond [`device::FileBlockDevice`],
//! are external collaborators this crate does not implement.

pub mod alloc;
pub mod bitmap;
pub mod device;
pub mod dir;
pub mod dirent;
pub mod error;
pub mod file;
pub mod fs;
pub mod inode;
pub mod layout;
pub mod mkfs;
pub mod namei;

pub use error::{Error, RufsResult};
pub use fs::{FileAttr, Filesystem};
pub use layout::Superblock;
