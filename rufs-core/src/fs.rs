//! `Filesystem`: the facade an external VFS adapter drives. Each method
//! here is the semantic contract of spec §6's VFS operation table —
//! resolve a path, then invoke a directory-store or file-I/O primitive,
//! then write back inode state. The actual FUSE/kernel-bridge dispatch
//! that calls into these methods stays external to this crate.

use std::path::Path;
use std::time::SystemTime;

use log::debug;

use crate::alloc::alloc_inode;
use crate::device::{BlockDevice, FileBlockDevice};
use crate::dir::{dir_add, dir_list};
use crate::error::{Error, RufsResult};
use crate::file;
use crate::inode::{write_inode, FileType, Inode};
use crate::layout::Superblock;
use crate::mkfs;
use crate::namei::resolve;

const ROOT_INO: u32 = 0;

/// Unix-style mode/size/ownership view of an inode (spec §6's `getattr`
/// row). `uid`/`gid` are not persisted (spec §1 non-goals); callers fill
/// them from the invoking process, as the VFS operation contract states.
#[derive(Debug, Clone, Copy)]
pub struct FileAttr {
    pub ino: u32,
    pub size: u64,
    pub mode: u32,
    pub nlink: u32,
    pub uid: u32,
    pub gid: u32,
    pub mtime: SystemTime,
}

fn attr_for(inode: &Inode, uid: u32, gid: u32) -> FileAttr {
    let type_bits = match inode.file_type {
        FileType::Directory => libc::S_IFDIR,
        FileType::Regular => libc::S_IFREG,
    };
    FileAttr {
        ino: inode.ino,
        size: inode.byte_len(),
        mode: type_bits as u32 | 0o755,
        nlink: inode.link as u32,
        uid,
        gid,
        mtime: SystemTime::now(),
    }
}

/// Split an absolute path into its parent directory path and final
/// component name. The root itself has no parent and is rejected.
fn split_path(path: &str) -> RufsResult<(String, String)> {
    let trimmed = path.trim_end_matches('/');
    if trimmed.is_empty() || !path.starts_with('/') {
        return Err(Error::Invalid);
    }
    match trimmed.rfind('/') {
        Some(0) => Ok(("/".to_string(), trimmed[1..].to_string())),
        Some(idx) => Ok((trimmed[..idx].to_string(), trimmed[idx + 1..].to_string())),
        None => Err(Error::Invalid),
    }
}

/// Owns the block device and the in-memory superblock populated at
/// mount. No further in-memory caching: every allocator and I/O
/// operation re-reads its bitmap/inode block from disk (spec §4.7).
pub struct Filesystem<D: BlockDevice> {
    device: D,
    sb: Superblock,
    uid: u32,
    gid: u32,
}

impl Filesystem<FileBlockDevice> {
    /// Mount the image at `path`: open it if present, or run `mkfs` if
    /// absent (spec §4.7).
    pub fn mount(path: &Path) -> RufsResult<Self> {
        if path.exists() {
            let mut device = FileBlockDevice::open(path)?;
            let mut block0 = [0u8; crate::layout::BLOCK_SIZE];
            device.read_block(0, &mut block0)?;
            let sb = Superblock::from_bytes(&block0)?;
            debug!("mounted existing image {:?}", path);
            Ok(Filesystem::from_parts(device, sb))
        } else {
            let (device, sb) = mkfs::format(path)?;
            debug!("formatted new image {:?}", path);
            Ok(Filesystem::from_parts(device, sb))
        }
    }
}

impl<D: BlockDevice> Filesystem<D> {
    pub fn from_parts(device: D, sb: Superblock) -> Self {
        Filesystem {
            device,
            sb,
            uid: 0,
            gid: 0,
        }
    }

    /// Override the uid/gid reported by `getattr`. A real VFS adapter
    /// fills these from the invoking process; tests and the `mkfs`
    /// binary default to 0.
    pub fn with_owner(mut self, uid: u32, gid: u32) -> Self {
        self.uid = uid;
        self.gid = gid;
        self
    }

    fn resolve(&mut self, path: &str) -> RufsResult<Inode> {
        resolve(&mut self.device, &self.sb, path, ROOT_INO)
    }

    pub fn getattr(&mut self, path: &str) -> RufsResult<FileAttr> {
        let inode = self.resolve(path)?;
        Ok(attr_for(&inode, self.uid, self.gid))
    }

    pub fn opendir(&mut self, path: &str) -> RufsResult<()> {
        let inode = self.resolve(path)?;
        if !inode.is_dir() {
            return Err(Error::Invalid);
        }
        Ok(())
    }

    /// Names of every valid dirent in `path`'s active direct blocks.
    pub fn readdir(&mut self, path: &str) -> RufsResult<Vec<String>> {
        let inode = self.resolve(path)?;
        if !inode.is_dir() {
            return Err(Error::Invalid);
        }
        let entries = dir_list(&mut self.device, &inode)?;
        Ok(entries.iter().map(|d| d.name().to_string()).collect())
    }

    fn make_entry(&mut self, path: &str, file_type: FileType) -> RufsResult<FileAttr> {
        let (parent_path, name) = split_path(path)?;
        let mut parent = self.resolve(&parent_path)?;
        if !parent.is_dir() {
            return Err(Error::Invalid);
        }

        let ino = alloc_inode(&mut self.device, &self.sb)?;
        // dir_add rewrites the parent inode itself if growth allocates a
        // new block; a create/mkdir that fails after this must still
        // leave the newly-allocated inode number as a leak, never a
        // double-allocation (spec §7).
        dir_add(&mut self.device, &self.sb, &mut parent, ino, &name)?;

        let new_inode = Inode::new(ino, file_type);
        write_inode(&mut self.device, &self.sb, ino, &new_inode)?;
        Ok(attr_for(&new_inode, self.uid, self.gid))
    }

    pub fn mkdir(&mut self, path: &str) -> RufsResult<FileAttr> {
        self.make_entry(path, FileType::Directory)
    }

    pub fn create(&mut self, path: &str) -> RufsResult<FileAttr> {
        self.make_entry(path, FileType::Regular)
    }

    pub fn open(&mut self, path: &str) -> RufsResult<()> {
        self.resolve(path)?;
        Ok(())
    }

    pub fn read(&mut self, path: &str, buf: &mut [u8], offset: u64) -> RufsResult<usize> {
        let inode = self.resolve(path)?;
        let size = buf.len();
        file::read(&mut self.device, &inode, buf, offset, size)
    }

    pub fn write(&mut self, path: &str, data: &[u8], offset: u64) -> RufsResult<usize> {
        let mut inode = self.resolve(path)?;
        file::write(&mut self.device, &self.sb, &mut inode, data, offset)
    }

    // Out of scope per spec §1: accept and return success without
    // mutating on-disk state.
    pub fn rmdir(&mut self, _path: &str) -> RufsResult<()> {
        Ok(())
    }

    pub fn unlink(&mut self, _path: &str) -> RufsResult<()> {
        Ok(())
    }

    pub fn truncate(&mut self, _path: &str, _size: u64) -> RufsResult<()> {
        Ok(())
    }

    pub fn flush(&mut self, _path: &str) -> RufsResult<()> {
        Ok(())
    }

    pub fn utimens(&mut self, _path: &str) -> RufsResult<()> {
        Ok(())
    }

    pub fn release(&mut self, _path: &str) -> RufsResult<()> {
        Ok(())
    }

    pub fn releasedir(&mut self, _path: &str) -> RufsResult<()> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn fresh_fs() -> (Filesystem<FileBlockDevice>, tempfile::TempDir) {
        let dir = tempdir().unwrap();
        let path = dir.path().join("disk.img");
        (Filesystem::mount(&path).unwrap(), dir)
    }

    #[test]
    fn fresh_mkfs_root_attrs() {
        let (mut fs, _dir) = fresh_fs();
        let attr = fs.getattr("/").unwrap();
        assert_eq!(attr.ino, 0);
        assert_eq!(attr.nlink, 2);
        assert_eq!(attr.size, 0);
    }

    #[test]
    fn mkdir_then_readdir() {
        let (mut fs, _dir) = fresh_fs();
        fs.mkdir("/a").unwrap();
        fs.mkdir("/b").unwrap();
        let mut names = fs.readdir("/").unwrap();
        names.sort();
        assert_eq!(names, vec!["a".to_string(), "b".to_string()]);
    }

    #[test]
    fn nested_create_resolves_as_regular_file() {
        let (mut fs, _dir) = fresh_fs();
        fs.mkdir("/a").unwrap();
        fs.mkdir("/a/b").unwrap();
        fs.create("/a/b/c").unwrap();

        let attr = fs.getattr("/a/b/c").unwrap();
        assert_eq!(attr.mode & libc::S_IFMT as u32, libc::S_IFREG as u32);
    }

    #[test]
    fn duplicate_create_fails() {
        let (mut fs, _dir) = fresh_fs();
        fs.create("/x").unwrap();
        let err = fs.create("/x").unwrap_err();
        assert!(matches!(err, Error::Exists));
    }

    #[test]
    fn write_read_roundtrip() {
        let (mut fs, _dir) = fresh_fs();
        fs.create("/f").unwrap();
        let n = fs.write("/f", b"hello", 0).unwrap();
        assert_eq!(n, 5);

        let mut buf = [0u8; 5];
        let read = fs.read("/f", &mut buf, 0).unwrap();
        assert_eq!(read, 5);
        assert_eq!(&buf, b"hello");
    }

    #[test]
    fn directory_growth_past_one_block_is_visible() {
        let (mut fs, _dir) = fresh_fs();
        let n = crate::layout::DIRENTS_PER_BLOCK + 1;
        for i in 0..n {
            fs.create(&format!("/f{i}")).unwrap();
        }
        let names = fs.readdir("/").unwrap();
        assert_eq!(names.len() as u32, n);
        let root = fs.getattr("/").unwrap();
        assert_eq!(root.ino, 0);
    }
}
