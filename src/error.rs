//! Crate-wide error taxonomy.
//!
//! Per-sector and per-slot failures during a scan are logged and skipped
//! rather than surfaced here (see the `log` call sites in `walker` and
//! `device`); the errors below are for operations that are fatal to the
//! single call that produced them — opening a device, decoding a boot
//! sector, or addressing an invalid cluster.

use std::path::PathBuf;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("failed to open block device {path}: {source}")]
    OpenFailed {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("path is not a recognized block device path: {0:?}")]
    PathUnsupported(PathBuf),

    #[error("device returned zero bytes for a read that required {requested} bytes")]
    EmptyRead { requested: usize },

    #[error("I/O error: {0}")]
    IOError(#[from] std::io::Error),

    #[error("boot sector does not describe a FAT32 volume")]
    NotFAT32,

    #[error("boot sector does not describe an NTFS volume")]
    NotNTFS,

    #[error("invalid cluster number {0} (filesystem-aware reads start at cluster 2)")]
    InvalidCluster(u32),
}

pub type Result<T> = std::result::Result<T, Error>;
