//! FAT32 deleted-file recovery engine.
//!
//! Opens a raw block device or image file, reconstructs FAT32 geometry from
//! the boot sector, walks the directory tree for deleted entries, and
//! recovers file bytes through FAT-chain reconstruction, signature-based
//! type detection, and conservative contiguity heuristics.

pub mod device;
pub mod dirent;
pub mod error;
pub mod geometry;
pub mod probe;
pub mod recovery;
pub mod scanner;
pub mod signature;
pub mod walker;

pub use device::{BlockDevicePath, BlockSource};
pub use error::{Error, Result};
pub use geometry::Geometry;
pub use scanner::{scan_deleted, CatalogRecord, ScanOptions};

/// Directory-entry attribute bits (FAT32 on-disk layout).
pub const ATTR_READ_ONLY: u8 = 0x01;
pub const ATTR_HIDDEN: u8 = 0x02;
pub const ATTR_SYSTEM: u8 = 0x04;
pub const ATTR_VOLUME_ID: u8 = 0x08;
pub const ATTR_DIRECTORY: u8 = 0x10;
pub const ATTR_ARCHIVE: u8 = 0x20;
pub const ATTR_LONG_NAME: u8 = ATTR_READ_ONLY | ATTR_HIDDEN | ATTR_SYSTEM | ATTR_VOLUME_ID;

pub const DIRENT_SIZE: usize = 32;
pub const LONG_NAME_LEN: u32 = 13;

/// First byte of a short-entry name when the slot holds a deleted entry.
pub const DIR_ENTRY_UNUSED: u8 = 0xE5;
/// First byte of a short-entry name when the slot (and every slot after it
/// in the cluster) has never been used.
pub const DIR_ENTRY_LAST_AND_UNUSED: u8 = 0x00;
/// Mask on a long-entry ordinal marking it as the first (highest-offset)
/// fragment of its long name.
pub const LAST_LONG_ENTRY: u8 = 0x40;

/// FAT entry mask: FAT32 entries are 28 significant bits, top nibble
/// reserved.
pub const FAT32_ENTRY_MASK: u32 = 0x0FFFFFFF;
/// Lowest cluster number in the end-of-chain sentinel range.
pub const END_OF_CHAIN_MIN: u32 = 0x0FFFFFF8;
/// Marks a cluster as allocated but bad.
pub const BAD_CLUSTER: u32 = 0x0FFFFFF7;
/// Marks a cluster as free.
pub const FREE_CLUSTER: u32 = 0x00000000;

/// Bound on FAT-chain length traversal, guarding against corrupted FATs
/// that never terminate (paired with the `HashSet` cycle guard in
/// `geometry::Geometry::chain`).
pub const MAX_CHAIN_STEPS: usize = 1_000_000;

/// Capacity of the per-`BlockSource` sector cache.
pub const BLOCK_CACHE_LIMIT: usize = 64;

/// Default bound on the scanner's speculative `/unknown_N` sweep when the
/// root directory yields no deleted entries.
pub const DEFAULT_SPECULATIVE_LIMIT: usize = 100;
