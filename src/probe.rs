//! Read-only boot-sector probe used by the hex-viewer's "jump to root
//! directory" action: NTFS / FAT32 / FAT16 identification and $MFT /
//! root-directory location, independent of the full `Geometry` parse used
//! by scanning and recovery.

use crate::device::{BlockDevicePath, BlockSource};
use crate::error::{Error, Result};

const NTFS_OEM_OFFSET: usize = 3;
const NTFS_OEM: &[u8; 8] = b"NTFS    ";
const FAT16_TYPE_OFFSET: usize = 54;
const FAT16_TYPE: &[u8; 8] = b"FAT16   ";
const FAT32_TYPE_OFFSET: usize = 82;
const FAT32_TYPE: &[u8; 8] = b"FAT32   ";

/// Locates NTFS's `$MFT` by reading the boot sector's cluster size and
/// MFT start cluster. Fails with `Error::NotNTFS` if the OEM name field
/// does not read `"NTFS    "`.
pub fn find_mft_sector(path: &BlockDevicePath) -> Result<u64> {
    let source = BlockSource::open(path)?;
    let boot = source.read_sector(0, 512)?;

    if &boot[NTFS_OEM_OFFSET..NTFS_OEM_OFFSET + 8] != NTFS_OEM {
        return Err(Error::NotNTFS);
    }

    let sectors_per_cluster = boot[13] as u64;
    let mft_cluster = u64::from_le_bytes(boot[48..56].try_into().unwrap());
    Ok(mft_cluster * sectors_per_cluster)
}

/// Identifies the filesystem on `path` and describes where its root
/// directory (or, for NTFS, `$MFT`) lives.
pub fn find_root_directory(path: &BlockDevicePath) -> Result<String> {
    let source = BlockSource::open(path)?;
    let boot = source.read_sector(0, 512)?;

    if &boot[NTFS_OEM_OFFSET..NTFS_OEM_OFFSET + 8] == NTFS_OEM {
        let sector = find_mft_sector(path)?;
        return Ok(format!("NTFS root \u{2192} $MFT sector {sector}"));
    }

    // The FAT32 signature at offset 82..90 is authoritative; the OEM-name
    // field at 3..11 ("MSDOS5.0") is ambiguous across FAT variants and
    // only consulted (via the root-cluster/reserved-sectors heuristic
    // below) if the signature is absent.
    let fs_type_32 = &boot[FAT32_TYPE_OFFSET..FAT32_TYPE_OFFSET + 8];
    let looks_fat32 = fs_type_32 == FAT32_TYPE || {
        let root_cluster = u32::from_le_bytes(boot[44..48].try_into().unwrap());
        let reserved_sectors = u16::from_le_bytes(boot[14..16].try_into().unwrap());
        root_cluster >= 2 && reserved_sectors >= 32
    };

    if looks_fat32 {
        let reserved_sectors = u16::from_le_bytes(boot[14..16].try_into().unwrap()) as u32;
        let fat_count = boot[16] as u32;
        let sectors_per_fat = u32::from_le_bytes(boot[36..40].try_into().unwrap());
        let root_cluster = u32::from_le_bytes(boot[44..48].try_into().unwrap());
        let sectors_per_cluster = boot[13] as u32;

        let root_sector = reserved_sectors
            + fat_count * sectors_per_fat
            + (root_cluster - 2) * sectors_per_cluster;
        return Ok(format!("FAT32 root directory \u{2192} sector {root_sector}"));
    }

    let fs_type_16 = &boot[FAT16_TYPE_OFFSET..FAT16_TYPE_OFFSET + 8];
    if fs_type_16 == FAT16_TYPE {
        let reserved_sectors = u16::from_le_bytes(boot[14..16].try_into().unwrap()) as u32;
        let fat_count = boot[16] as u32;
        let sectors_per_fat = u16::from_le_bytes(boot[22..24].try_into().unwrap()) as u32;
        let root_sector = reserved_sectors + fat_count * sectors_per_fat;
        return Ok(format!("FAT16 root directory \u{2192} sector {root_sector}"));
    }

    Err(Error::NotFAT32)
}
