//! Error taxonomy for the core engine, mapped to POSIX-style codes at the
//! VFS boundary (see spec §7).

use thiserror::Error;

/// Result type threaded through every core operation.
pub type RufsResult<T> = Result<T, Error>;

#[derive(Debug, Error)]
pub enum Error {
    /// A path component does not resolve to any inode.
    #[error("no such file or directory")]
    NotFound,

    /// `dir_add` found an existing dirent with the same name.
    #[error("file already exists")]
    Exists,

    /// Inode table, data-block pool, or a directory's 16 direct slots are
    /// exhausted.
    #[error("no space left on device")]
    NoSpace,

    /// A read or write addresses a block beyond the 16 direct pointers.
    #[error("file too large for direct-pointer addressing")]
    TooBig,

    /// The path, or a structure read back from disk, is malformed.
    #[error("invalid argument")]
    Invalid,

    /// Block device failure. Unrecoverable; always propagated.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}
