//! Block device interface
//!
//! Uniform sector/cluster reads over three transport kinds: a logical
//! volume (`C:`), a raw physical drive (`\\.\PhysicalDrive0` on Windows),
//! or a plain image file. Each [`BlockSource`] owns exactly one open
//! handle; concurrent readers must each open their own (see
//! `BlockDevicePath` invariant in the data model).

use std::fs::File;
use std::io::{Read, Seek, SeekFrom};
use std::path::{Path, PathBuf};
use std::str::FromStr;

use lru::LruCache;
use spin::RwLock;

use crate::error::{Error, Result};
use crate::BLOCK_CACHE_LIMIT;

/// Default sector size assumed until a boot sector says otherwise.
pub const DEFAULT_SECTOR_SIZE: usize = 512;
/// Default cluster size for the raw, filesystem-unaware viewer read.
/// A hex-viewer convenience for browsing a device before its boot sector
/// has been parsed, not a value derived from FAT32 geometry.
pub const DEFAULT_CLUSTER_SIZE: usize = 4096;

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum BlockDevicePath {
    /// A two-character drive identifier, e.g. `C:`.
    LogicalVolume(char),
    /// An integer physical-drive index, e.g. `0` for `PhysicalDrive0`.
    PhysicalDrive(u32),
    /// A path to an image file ending in `.vhd`, `.img`, or `.bin`.
    ImageFile(PathBuf),
}

impl BlockDevicePath {
    /// The path an OS would use to open this device natively.
    pub fn native_path(&self) -> PathBuf {
        match self {
            BlockDevicePath::LogicalVolume(letter) => {
                if cfg!(windows) {
                    PathBuf::from(format!(r"\\.\{letter}:"))
                } else {
                    PathBuf::from(format!("{letter}:"))
                }
            }
            BlockDevicePath::PhysicalDrive(index) => {
                if cfg!(windows) {
                    PathBuf::from(format!(r"\\.\PhysicalDrive{index}"))
                } else {
                    PathBuf::from(format!("/dev/disk{index}"))
                }
            }
            BlockDevicePath::ImageFile(path) => path.clone(),
        }
    }

    /// The plain file-handle fallback path for a logical volume (no
    /// `\\.\` device prefix). Only meaningful for `LogicalVolume`.
    fn plain_fallback_path(&self) -> Option<PathBuf> {
        match self {
            BlockDevicePath::LogicalVolume(letter) => Some(PathBuf::from(format!("{letter}:\\"))),
            _ => None,
        }
    }
}

impl FromStr for BlockDevicePath {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        let lower = s.to_ascii_lowercase();
        if s.len() == 2 && s.as_bytes()[1] == b':' && s.as_bytes()[0].is_ascii_alphabetic() {
            return Ok(BlockDevicePath::LogicalVolume(
                s.chars().next().unwrap().to_ascii_uppercase(),
            ));
        }
        if let Ok(index) = s.parse::<u32>() {
            return Ok(BlockDevicePath::PhysicalDrive(index));
        }
        if lower.ends_with(".vhd") || lower.ends_with(".img") || lower.ends_with(".bin") {
            return Ok(BlockDevicePath::ImageFile(PathBuf::from(s)));
        }
        Err(Error::PathUnsupported(PathBuf::from(s)))
    }
}

/// Bounded cache of recently read sectors, owned by a single
/// [`BlockSource`]. An owned field rather than a process-wide singleton,
/// since distinct handles (e.g. one per concurrent recovery) must not
/// share cached sectors.
struct SectorCache {
    entries: spin::Mutex<LruCache<(u64, usize), Vec<u8>>>,
}

impl SectorCache {
    fn new(capacity: usize) -> Self {
        Self {
            entries: spin::Mutex::new(LruCache::new(
                std::num::NonZeroUsize::new(capacity.max(1)).unwrap(),
            )),
        }
    }

    fn get(&self, sector_no: u64, sector_size: usize) -> Option<Vec<u8>> {
        self.entries
            .lock()
            .get(&(sector_no, sector_size))
            .cloned()
    }

    fn put(&self, sector_no: u64, sector_size: usize, data: Vec<u8>) {
        self.entries.lock().put((sector_no, sector_size), data);
    }
}

/// An open handle to a block device, addressable by sector or raw byte
/// range. Filesystem-aware cluster reads live on `Geometry`
/// (`read_cluster_fs`), not here — `read_cluster` in this module is the
/// device-addressed, FAT-unaware convenience the hex viewer uses.
pub struct BlockSource {
    path: BlockDevicePath,
    handle: RwLock<File>,
    cache: SectorCache,
}

impl BlockSource {
    /// Open a handle for `path`. For `LogicalVolume` an implementation
    /// may attempt a raw-device read first and, on failure, fall back to
    /// a standard file-handle read of the same path; either success
    /// returns immediately, both failures propagate the underlying
    /// error.
    pub fn open(path: &BlockDevicePath) -> Result<Self> {
        let native = path.native_path();
        let opened = File::open(&native);

        let handle = match (opened, path.plain_fallback_path()) {
            (Ok(file), _) => file,
            (Err(primary_err), Some(fallback)) => {
                log::warn!(
                    "raw-device open of {} failed ({primary_err}), retrying as {}",
                    native.display(),
                    fallback.display()
                );
                File::open(&fallback).map_err(|source| Error::OpenFailed {
                    path: fallback.display().to_string(),
                    source,
                })?
            }
            (Err(source), None) => {
                return Err(Error::OpenFailed {
                    path: native.display().to_string(),
                    source,
                })
            }
        };

        Ok(Self {
            path: path.clone(),
            handle: RwLock::new(handle),
            cache: SectorCache::new(BLOCK_CACHE_LIMIT),
        })
    }

    pub fn path(&self) -> &BlockDevicePath {
        &self.path
    }

    /// Seeks to `sector_no * sector_size`, reads exactly `sector_size`
    /// bytes. Cached by `(sector_no, sector_size)`.
    pub fn read_sector(&self, sector_no: u64, sector_size: usize) -> Result<Vec<u8>> {
        if let Some(cached) = self.cache.get(sector_no, sector_size) {
            return Ok(cached);
        }
        let offset = sector_no
            .checked_mul(sector_size as u64)
            .expect("sector address overflow");
        let data = self.read_at(offset, sector_size)?;
        self.cache.put(sector_no, sector_size, data.clone());
        Ok(data)
    }

    /// Single positioned read of `count * sector_size` bytes. Populates
    /// the per-sector cache with each constituent sector afterward.
    pub fn read_sectors(&self, start: u64, count: u64, sector_size: usize) -> Result<Vec<u8>> {
        let offset = start
            .checked_mul(sector_size as u64)
            .expect("sector address overflow");
        let len = count as usize * sector_size;
        let data = self.read_at(offset, len)?;
        for i in 0..count {
            let chunk_start = i as usize * sector_size;
            let chunk = data[chunk_start..chunk_start + sector_size].to_vec();
            self.cache.put(start + i, sector_size, chunk);
        }
        Ok(data)
    }

    /// Positioned read of `cluster_size` bytes at byte offset
    /// `cluster_no * cluster_size`. Device-addressed, not
    /// filesystem-addressed — does not consult FAT32 geometry.
    pub fn read_cluster(&self, cluster_no: u64, cluster_size: usize) -> Result<Vec<u8>> {
        let offset = cluster_no
            .checked_mul(cluster_size as u64)
            .expect("cluster address overflow");
        self.read_at(offset, cluster_size)
    }

    fn read_at(&self, offset: u64, len: usize) -> Result<Vec<u8>> {
        let mut file = self.handle.write();
        file.seek(SeekFrom::Start(offset))?;
        let mut buf = vec![0u8; len];
        read_full(&mut file, &mut buf, len)?;
        Ok(buf)
    }
}

fn read_full(file: &mut File, buf: &mut [u8], requested: usize) -> Result<()> {
    let mut total = 0usize;
    while total < buf.len() {
        let n = file.read(&mut buf[total..])?;
        if n == 0 {
            if total == 0 {
                return Err(Error::EmptyRead { requested });
            }
            return Err(Error::IOError(std::io::Error::new(
                std::io::ErrorKind::UnexpectedEof,
                "short read from block device",
            )));
        }
        total += n;
    }
    Ok(())
}

/// True if `path` has one of the image-file extensions this crate
/// recognizes. Used by the CLI to distinguish an image-file argument
/// from a bare physical-drive index before it is fully parsed.
pub fn looks_like_image_file(path: &Path) -> bool {
    matches!(
        path.extension().and_then(|e| e.to_str()).map(|e| e.to_ascii_lowercase()).as_deref(),
        Some("vhd") | Some("img") | Some("bin")
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn parses_logical_volume() {
        assert_eq!(
            BlockDevicePath::from_str("C:").unwrap(),
            BlockDevicePath::LogicalVolume('C')
        );
    }

    #[test]
    fn parses_physical_drive() {
        assert_eq!(
            BlockDevicePath::from_str("0").unwrap(),
            BlockDevicePath::PhysicalDrive(0)
        );
    }

    #[test]
    fn parses_image_file() {
        assert_eq!(
            BlockDevicePath::from_str("disk.img").unwrap(),
            BlockDevicePath::ImageFile(PathBuf::from("disk.img"))
        );
    }

    #[test]
    fn rejects_unsupported_path() {
        assert!(BlockDevicePath::from_str("not-a-path").is_err());
    }

    #[test]
    fn reads_sectors_from_image_file() {
        let mut tmp = tempfile::NamedTempFile::new().unwrap();
        let mut data = vec![0u8; 512 * 4];
        data[512] = 0xAB;
        tmp.write_all(&data).unwrap();
        let path = BlockDevicePath::ImageFile(tmp.path().to_path_buf());
        let source = BlockSource::open(&path).unwrap();
        let sector = source.read_sector(1, 512).unwrap();
        assert_eq!(sector[0], 0xAB);
        let range = source.read_sectors(0, 4, 512).unwrap();
        assert_eq!(range.len(), 512 * 4);
    }

    #[test]
    fn empty_read_is_reported() {
        let tmp = tempfile::NamedTempFile::new().unwrap();
        let path = BlockDevicePath::ImageFile(tmp.path().to_path_buf());
        let source = BlockSource::open(&path).unwrap();
        let err = source.read_sector(0, 512).unwrap_err();
        assert!(matches!(err, Error::EmptyRead { .. }));
    }
}
