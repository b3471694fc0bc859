//! Per-file reassembly: FAT-chain-guided reconstruction, format-aware
//! validation, and EOF truncation.
//!
//! The primary strategy is conservative contiguity: starting at a deleted
//! entry's first cluster, keep appending cluster `current + 1` as long as
//! it is still free in the FAT, still looks like a valid continuation of
//! the detected format, and the file isn't already complete. Any cluster
//! that fails one of those checks ends the chain — fragmented files are
//! left partial rather than guessed at.

use std::collections::HashSet;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use crate::device::{BlockDevicePath, BlockSource};
use crate::error::Result;
use crate::geometry::Geometry;
use crate::scanner::CatalogRecord;
use crate::signature;

/// Result of a recovery attempt. `From<&RecoveryReport> for bool` gives
/// the plain success boolean the original tool's `recover` returns,
/// while the ratio lets callers report partial recovery.
#[derive(Debug, Clone)]
pub struct RecoveryReport {
    pub bytes_written: u64,
    pub bytes_needed: u64,
    pub ratio: f64,
    pub output_path: PathBuf,
    pub detected_type: Option<String>,
}

impl From<&RecoveryReport> for bool {
    fn from(report: &RecoveryReport) -> bool {
        report.ratio >= 0.99
    }
}

/// Recovers `record`'s bytes into `output_path`, reopening its own
/// `BlockSource` and re-deriving `Geometry` rather than reusing any state
/// from the scan that produced `record`.
///
/// Preconditions: `record.deleted` and `record.first_cluster >= 2`; violating
/// either yields a zero-byte report rather than a panic, since a caller may
/// hand back a stale record from a prior scan.
pub fn recover(
    path: &BlockDevicePath,
    record: &CatalogRecord,
    output_path: &Path,
) -> Result<RecoveryReport> {
    let need = record.size as u64;

    if !record.deleted || record.first_cluster < 2 || need == 0 {
        return Ok(RecoveryReport {
            bytes_written: 0,
            bytes_needed: need,
            ratio: 0.0,
            output_path: output_path.to_path_buf(),
            detected_type: None,
        });
    }

    let source = BlockSource::open(path)?;
    let geometry = Geometry::parse_boot_sector(&source).unwrap_or_else(|_| {
        log::warn!("recover: boot sector did not parse, using fallback geometry");
        Geometry::permissive_fallback()
    });

    let bpc = geometry.cluster_size() as u64;
    let first_cluster_bytes = geometry.read_cluster_fs(&source, record.first_cluster)?;
    let detected_type = signature::detect(&first_cluster_bytes).map(str::to_string);

    let mut final_output_path = output_path.to_path_buf();
    if let Some(ext) = &detected_type {
        if final_output_path.extension().is_none() {
            final_output_path.set_extension(ext);
        }
    }

    if let Some(parent) = final_output_path.parent() {
        fs::create_dir_all(parent)?;
    }
    let mut out = fs::File::create(&final_output_path)?;

    if need <= bpc {
        out.write_all(&first_cluster_bytes[..need as usize])?;
        return Ok(RecoveryReport {
            bytes_written: need,
            bytes_needed: need,
            ratio: 1.0,
            output_path: final_output_path,
            detected_type,
        });
    }

    out.write_all(&first_cluster_bytes)?;
    let mut written = bpc;
    let mut current = record.first_cluster;
    let required = need.div_ceil(bpc);
    let mut count = 1u64;

    while written < need && count < required {
        let next = current + 1;
        if next >= geometry.cluster_count + 2 {
            log::warn!("recover: reached end of volume at cluster {next}, stopping");
            break;
        }

        let fat_value = match geometry.fat_entry(&source, next) {
            Ok(value) => value,
            Err(err) => {
                log::warn!("recover: failed to read FAT entry for cluster {next} ({err}), stopping");
                break;
            }
        };
        if fat_value != 0 {
            log::warn!("recover: cluster {next} already allocated (FAT={fat_value:#x}), stopping");
            break;
        }

        let cluster_bytes = match geometry.read_cluster_fs(&source, next) {
            Ok(bytes) => bytes,
            Err(err) => {
                log::warn!("recover: failed to read cluster {next} ({err}), stopping");
                break;
            }
        };

        if matches!(detected_type.as_deref(), Some("jpg") | Some("jpeg"))
            && !is_valid_jpeg_cluster(&cluster_bytes)
        {
            log::warn!("recover: cluster {next} failed JPEG validity check, stopping (fragmentation)");
            break;
        }

        let take = (need - written).min(bpc) as usize;
        out.write_all(&cluster_bytes[..take])?;
        written += take as u64;
        current = next;
        count += 1;

        if let Some(ext) = &detected_type {
            if signature::contains_trailer(ext, &cluster_bytes) {
                log::info!("recover: trailer signature found in cluster {next}, stopping (EOF)");
                break;
            }
        }
    }
    drop(out);

    if let Some(ext) = &detected_type {
        truncate_at_eof(&final_output_path, ext)?;
        written = fs::metadata(&final_output_path)?.len();
    }

    let ratio = written as f64 / need as f64;
    Ok(RecoveryReport {
        bytes_written: written,
        bytes_needed: need,
        ratio,
        output_path: final_output_path,
        detected_type,
    })
}

/// Rejects a candidate cluster as a JPEG continuation if it is
/// predominantly zero-filled, or contains an `FF` byte followed by
/// anything other than a stuffed escape (`00`) or a restart marker
/// (`D0..D7`) — a strong signal the stream has fragmented.
fn is_valid_jpeg_cluster(cluster: &[u8]) -> bool {
    if cluster.is_empty() {
        return false;
    }
    let zero_count = cluster.iter().filter(|&&b| b == 0).count();
    if zero_count as f64 / cluster.len() as f64 > 0.90 {
        return false;
    }

    let mut i = 0;
    while i + 1 < cluster.len() {
        if cluster[i] == 0xFF {
            let next = cluster[i + 1];
            if next != 0x00 && !(0xD0..=0xD7).contains(&next) {
                return false;
            }
        }
        i += 1;
    }
    true
}

/// Truncates `path` at the last occurrence of any trailer pattern
/// registered for `ext`, cutting just past that trailer. No-op (and thus
/// idempotent) if no trailer occurs, or if `path` is already truncated to
/// exactly end at the trailer.
pub fn truncate_at_eof(path: &Path, ext: &str) -> Result<()> {
    let Some(patterns) = signature::trailers_for(ext) else {
        return Ok(());
    };

    let data = fs::read(path)?;
    let mut cut_at: Option<usize> = None;
    let trailer_len = signature::trailer_len(ext);

    for pattern in patterns {
        let needle: &[u8] = match pattern {
            signature::Pattern::Literal(bytes) => bytes,
            signature::Pattern::WildcardRiff { suffix, .. } => suffix,
        };
        if let Some(pos) = signature::find_last(&data, needle) {
            let end = pos + trailer_len.max(needle.len());
            cut_at = Some(cut_at.map_or(end, |existing: usize| existing.max(end)));
        }
    }

    if let Some(end) = cut_at {
        if end < data.len() {
            let file = fs::OpenOptions::new().write(true).open(path)?;
            file.set_len(end as u64)?;
        }
    }

    Ok(())
}

/// Secondary, not-invoked-by-default fallback for fragmented files: scans
/// nearby free clusters (±20 of `current` first, then the full free-space
/// range) for one that looks like a plausible continuation — a trailer
/// match, a format-specific anchor, or simple contiguity.
///
/// Exported for callers that want to opt into fragmentation recovery
/// explicitly; `recover`'s primary contiguity loop never calls this.
pub fn content_guided_next_cluster(
    source: &BlockSource,
    geometry: &Geometry,
    current: u32,
    file_type: &str,
    processed: &HashSet<u32>,
) -> Result<Option<u32>> {
    let near = search_range(source, geometry, current, file_type, processed, 1, 21)?;
    if near.is_some() {
        return Ok(near);
    }
    search_range(source, geometry, current, file_type, processed, 21, geometry.cluster_count + 2)
}

fn search_range(
    source: &BlockSource,
    geometry: &Geometry,
    current: u32,
    file_type: &str,
    processed: &HashSet<u32>,
    offset_start: u32,
    offset_end: u32,
) -> Result<Option<u32>> {
    for delta in offset_start..offset_end {
        let candidate = current + delta;
        if candidate < 2 || candidate >= geometry.cluster_count + 2 || processed.contains(&candidate) {
            continue;
        }
        if geometry.fat_entry(source, candidate)? != 0 {
            continue;
        }
        let bytes = geometry.read_cluster_fs(source, candidate)?;
        if signature::contains_trailer(file_type, &bytes) || looks_like_anchor(file_type, &bytes) {
            return Ok(Some(candidate));
        }
    }
    Ok(None)
}

/// Format-specific anchors: JPEG restart markers, or PNG chunk tags.
fn looks_like_anchor(file_type: &str, bytes: &[u8]) -> bool {
    match file_type {
        "jpg" | "jpeg" => bytes.windows(2).any(|w| w[0] == 0xFF && (0xD0..=0xD7).contains(&w[1])),
        "png" => [&b"IDAT"[..], b"IEND", b"PLTE", b"tRNS", b"gAMA", b"pHYs"]
            .iter()
            .any(|tag| signature::find(bytes, tag).is_some()),
        _ => false,
    }
}
