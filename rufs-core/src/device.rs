//! Block device contract (spec §6): fixed-size block reads/writes against
//! a disk image. The interface is the in-scope part; `FileBlockDevice` is
//! the one concrete implementation this repository ships, backed by a
//! seekable `File`, matching spec.md's own description of the layer.

use std::fs::{File, OpenOptions};
use std::io::{Read, Seek, SeekFrom, Write};
use std::path::Path;

use log::trace;

use crate::error::RufsResult;
use crate::layout::BLOCK_SIZE;

/// `read_block`/`write_block` over fixed-size blocks.
pub trait BlockDevice {
    /// Read exactly `BLOCK_SIZE` bytes from block `index` into `buf`.
    fn read_block(&mut self, index: u32, buf: &mut [u8; BLOCK_SIZE]) -> RufsResult<()>;

    /// Write exactly `BLOCK_SIZE` bytes from `buf` to block `index`.
    fn write_block(&mut self, index: u32, buf: &[u8; BLOCK_SIZE]) -> RufsResult<()>;
}

/// A disk image as a plain file, addressed in fixed-size blocks.
pub struct FileBlockDevice {
    file: File,
}

impl FileBlockDevice {
    /// `dev_init`: create and zero-fill an image of `num_blocks` blocks.
    pub fn create(path: &Path, num_blocks: u32) -> RufsResult<Self> {
        let mut file = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .truncate(true)
            .open(path)?;
        let zero = [0u8; BLOCK_SIZE];
        for _ in 0..num_blocks {
            file.write_all(&zero)?;
        }
        file.flush()?;
        trace!("created disk image {:?} with {} blocks", path, num_blocks);
        Ok(FileBlockDevice { file })
    }

    /// `dev_open`: open an existing image.
    pub fn open(path: &Path) -> RufsResult<Self> {
        let file = OpenOptions::new().read(true).write(true).open(path)?;
        Ok(FileBlockDevice { file })
    }

    fn seek_to(&mut self, index: u32) -> RufsResult<()> {
        self.file
            .seek(SeekFrom::Start(index as u64 * BLOCK_SIZE as u64))?;
        Ok(())
    }
}

impl BlockDevice for FileBlockDevice {
    fn read_block(&mut self, index: u32, buf: &mut [u8; BLOCK_SIZE]) -> RufsResult<()> {
        self.seek_to(index)?;
        self.file.read_exact(buf)?;
        Ok(())
    }

    fn write_block(&mut self, index: u32, buf: &[u8; BLOCK_SIZE]) -> RufsResult<()> {
        self.seek_to(index)?;
        self.file.write_all(buf)?;
        Ok(())
    }
}

// `dev_close` is just `Drop`ing the `FileBlockDevice`; no explicit close
// step is needed with a `std::fs::File`.
