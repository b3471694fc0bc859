//! Synthetic FAT32 image builder used by the `tests/scenarios.rs` end-to-end
//! fixtures. Not a production module: lives under `tests/` precisely so it
//! never ships in the library or binary crate.

use std::io::{Seek, SeekFrom, Write};

use fat32recover::BlockDevicePath;
use tempfile::NamedTempFile;

pub const BYTES_PER_SECTOR: u16 = 512;
pub const SECTORS_PER_CLUSTER: u8 = 8;
pub const CLUSTER_SIZE: usize = BYTES_PER_SECTOR as usize * SECTORS_PER_CLUSTER as usize;
pub const RESERVED_SECTORS: u16 = 32;
pub const FAT_COUNT: u8 = 2;
pub const SECTORS_PER_FAT: u32 = 32;
pub const ROOT_CLUSTER: u32 = 2;
pub const FAT_BEGIN_LBA: u32 = RESERVED_SECTORS as u32;
pub const CLUSTER_BEGIN_LBA: u32 = FAT_BEGIN_LBA + FAT_COUNT as u32 * SECTORS_PER_FAT;
const CLUSTER_COUNT: u32 = 4096;
const TOTAL_SECTORS: u32 = CLUSTER_BEGIN_LBA + CLUSTER_COUNT * SECTORS_PER_CLUSTER as u32;

/// `cluster_begin_lba` implied by `Geometry::permissive_fallback` — used by
/// the S6 fixture, whose boot sector is deliberately unparseable so the
/// scanner falls back to that hardcoded geometry rather than anything this
/// builder writes to disk.
pub const FALLBACK_CLUSTER_BEGIN_LBA: u32 = 32 + 2 * 8192;

/// A growable, sparsely-written FAT32 image backed by a real temp file
/// (so reads past anything we write come back zeroed, for free, matching
/// an untouched region of a real disk image).
pub struct ImageBuilder {
    tmp: NamedTempFile,
}

impl ImageBuilder {
    /// A valid FAT32 boot sector used by most fixtures in this suite:
    /// 512-byte sectors, 8 sectors/cluster, two 32-sector FATs, 32
    /// reserved sectors, root directory at cluster 2.
    pub fn new() -> Self {
        let tmp = NamedTempFile::new().expect("create temp image file");
        let mut builder = Self { tmp };
        builder.write_boot_sector();
        builder.set_total_len(TOTAL_SECTORS as u64 * BYTES_PER_SECTOR as u64);
        builder
    }

    fn write_boot_sector(&mut self) {
        let mut boot = [0u8; 512];
        boot[11..13].copy_from_slice(&BYTES_PER_SECTOR.to_le_bytes());
        boot[13] = SECTORS_PER_CLUSTER;
        boot[14..16].copy_from_slice(&RESERVED_SECTORS.to_le_bytes());
        boot[16] = FAT_COUNT;
        boot[32..36].copy_from_slice(&TOTAL_SECTORS.to_le_bytes());
        boot[36..40].copy_from_slice(&SECTORS_PER_FAT.to_le_bytes());
        boot[44..48].copy_from_slice(&ROOT_CLUSTER.to_le_bytes());
        boot[82..90].copy_from_slice(b"FAT32   ");
        self.write_at(0, &boot);
    }

    /// Zeroes both the primary and backup boot sector, so
    /// `Geometry::parse_boot_sector` fails on this image and the scanner
    /// must fall back to `Geometry::permissive_fallback` (S6).
    pub fn corrupt_boot_sectors(&mut self) {
        self.write_at(0, &[0u8; 512]);
        self.write_at(6 * BYTES_PER_SECTOR as u64, &[0u8; 512]);
    }

    pub fn write_at(&mut self, offset: u64, bytes: &[u8]) {
        self.tmp.seek(SeekFrom::Start(offset)).expect("seek");
        self.tmp.write_all(bytes).expect("write");
    }

    pub fn set_total_len(&mut self, len: u64) {
        self.tmp.as_file().set_len(len).expect("set_len");
    }

    /// Sets a raw FAT entry (both the value written and the masking it
    /// will read back with are the caller's concern; this writes exactly
    /// the 4 bytes `fat_entry` will later read).
    pub fn set_fat_entry(&mut self, cluster: u32, value: u32) {
        let offset = FAT_BEGIN_LBA as u64 * BYTES_PER_SECTOR as u64 + cluster as u64 * 4;
        self.write_at(offset, &value.to_le_bytes());
    }

    fn cluster_offset(cluster: u32) -> u64 {
        (CLUSTER_BEGIN_LBA as u64 + (cluster as u64 - 2) * SECTORS_PER_CLUSTER as u64)
            * BYTES_PER_SECTOR as u64
    }

    /// Writes `bytes` at the data-region location of `cluster` under the
    /// geometry declared by this image's (valid) boot sector.
    pub fn write_cluster(&mut self, cluster: u32, bytes: &[u8]) {
        let offset = Self::cluster_offset(cluster);
        self.write_at(offset, bytes);
    }

    /// Writes `bytes` at the data-region location of `cluster` under the
    /// hardcoded fallback geometry, for images whose boot sector is
    /// deliberately corrupt (S6).
    pub fn write_cluster_fallback(&mut self, cluster: u32, bytes: &[u8]) {
        let offset = (FALLBACK_CLUSTER_BEGIN_LBA as u64
            + (cluster as u64 - 2) * SECTORS_PER_CLUSTER as u64)
            * BYTES_PER_SECTOR as u64;
        self.write_at(offset, bytes);
    }

    pub fn write_dir_slots(&mut self, cluster: u32, slots: &[[u8; 32]]) {
        let mut buf = Vec::with_capacity(slots.len() * 32);
        for slot in slots {
            buf.extend_from_slice(slot);
        }
        self.write_cluster(cluster, &buf);
    }

    pub fn device_path(&self) -> BlockDevicePath {
        BlockDevicePath::ImageFile(self.tmp.path().to_path_buf())
    }
}

/// Builds a 32-byte short directory entry slot.
pub fn short_entry(name: &str, ext: &str, attr: u8, deleted: bool, cluster: u32, size: u32) -> [u8; 32] {
    let mut raw = [0u8; 32];

    let mut name_field = [b' '; 8];
    let nb = name.as_bytes();
    let n = nb.len().min(8);
    name_field[..n].copy_from_slice(&nb[..n]);
    raw[0..8].copy_from_slice(&name_field);

    let mut ext_field = [b' '; 3];
    let eb = ext.as_bytes();
    let e = eb.len().min(3);
    ext_field[..e].copy_from_slice(&eb[..e]);
    raw[8..11].copy_from_slice(&ext_field);

    raw[11] = attr;
    raw[20..22].copy_from_slice(&((cluster >> 16) as u16).to_le_bytes());
    raw[26..28].copy_from_slice(&((cluster & 0xFFFF) as u16).to_le_bytes());
    raw[28..32].copy_from_slice(&size.to_le_bytes());

    if deleted {
        raw[0] = 0xE5;
    }
    raw
}

fn lfn_fragment(order: u8, last: bool, units: &[u16; 13]) -> [u8; 32] {
    let mut raw = [0u8; 32];
    raw[0] = if last { order | 0x40 } else { order };
    raw[11] = 0x0F;
    let bytes: Vec<u8> = units.iter().flat_map(|u| u.to_le_bytes()).collect();
    raw[1..11].copy_from_slice(&bytes[0..10]);
    raw[14..26].copy_from_slice(&bytes[10..22]);
    raw[28..32].copy_from_slice(&bytes[22..26]);
    raw
}

/// Splits `name` into ordinal-ascending LFN fragments (13 UTF-16 units
/// each, 0x0000-terminated and 0xFFFF-padded, matching how a FAT32
/// driver lays out a long name across directory slots).
pub fn lfn_fragments_for_name(name: &str) -> Vec<[u8; 32]> {
    let units: Vec<u16> = name.encode_utf16().collect();
    let chunks: Vec<&[u16]> = units.chunks(13).collect();
    let total = chunks.len();

    chunks
        .into_iter()
        .enumerate()
        .map(|(i, chunk)| {
            let mut padded = [0xFFFFu16; 13];
            padded[..chunk.len()].copy_from_slice(chunk);
            if chunk.len() < 13 {
                padded[chunk.len()] = 0x0000;
            }
            lfn_fragment((i + 1) as u8, i + 1 == total, &padded)
        })
        .collect()
}

/// A synthetic JPEG byte stream of exactly `len` bytes: a real SOI/APP0
/// header, a trailing EOI marker, and filler bytes that never equal
/// `0xFF` (so the JPEG validity check's "FF followed by a bad marker"
/// rule never trips on our own filler) and are never all-zero (so the
/// "predominantly zero-filled" rule doesn't trip either).
pub fn synthetic_jpeg(len: usize) -> Vec<u8> {
    assert!(len >= 6, "need room for header and trailer");
    let mut data = vec![0xFFu8, 0xD8, 0xFF, 0xE0];
    while data.len() < len - 2 {
        let v = ((data.len() % 200) + 1) as u8;
        data.push(v);
    }
    data.truncate(len - 2);
    data.push(0xFF);
    data.push(0xD9);
    data
}
