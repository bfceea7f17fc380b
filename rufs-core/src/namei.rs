//! Path resolver (spec §4.5): component-by-component descent from a
//! starting inode. Never mutates; returns an inode reflecting current
//! on-disk state.

use crate::device::BlockDevice;
use crate::dir::dir_find;
use crate::error::{Error, RufsResult};
use crate::inode::{read_inode, Inode};
use crate::layout::Superblock;

/// Resolve `path` to an inode, starting the descent at `start_ino`.
pub fn resolve(
    device: &mut dyn BlockDevice,
    sb: &Superblock,
    path: &str,
    start_ino: u32,
) -> RufsResult<Inode> {
    if path.is_empty() || path == "/" {
        return read_inode(device, sb, start_ino);
    }

    let rest = path.strip_prefix('/').unwrap_or(path);
    let (component, remainder) = match rest.find('/') {
        Some(idx) => (&rest[..idx], &rest[idx + 1..]),
        None => (rest, ""),
    };

    let start = read_inode(device, sb, start_ino)?;
    if start.valid && !start.is_dir() {
        // Terminal: file components are not descended into.
        return Ok(start);
    }

    let found = match dir_find(device, &start, component)? {
        Some(d) => d,
        None => return Err(Error::NotFound),
    };

    if remainder.is_empty() {
        read_inode(device, sb, found.ino)
    } else {
        resolve(device, sb, remainder, found.ino)
    }
}
