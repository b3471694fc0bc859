//! Top-level scan orchestration: open a device, derive geometry, walk the
//! directory tree, and classify deleted entries.

use chrono::{NaiveDate, NaiveDateTime};
use serde::Serialize;

use crate::device::{BlockDevicePath, BlockSource};
use crate::geometry::Geometry;
use crate::signature;
use crate::walker::walk_directory;
use crate::DEFAULT_SPECULATIVE_LIMIT;

/// Bounds the speculative `/unknown_N` directory-head sweep the scanner
/// falls back to when the root directory yields nothing.
#[derive(Debug, Clone, Copy)]
pub struct ScanOptions {
    pub speculative_limit: usize,
}

impl Default for ScanOptions {
    fn default() -> Self {
        Self {
            speculative_limit: DEFAULT_SPECULATIVE_LIMIT,
        }
    }
}

/// One discovered directory entry, deleted or not, emitted by a scan.
#[derive(Debug, Clone, Serialize)]
pub struct CatalogRecord {
    pub long_name: String,
    pub short_name: String,
    pub parent_path: String,
    pub absolute_path: String,
    pub is_directory: bool,
    pub is_system: bool,
    pub is_hidden: bool,
    pub deleted: bool,
    pub first_cluster: u32,
    pub size: u32,
    pub create_timestamp: Option<NaiveDateTime>,
    pub modify_time: Option<NaiveDateTime>,
    pub access_date: Option<NaiveDate>,
    pub detected_type: Option<String>,
}

/// Scans `path` for deleted directory entries. Never returns an error:
/// an unopenable device or unparseable boot sector degrades to an empty
/// catalog or a permissive fallback geometry respectively (§4.5), per the
/// "scan always returns a list" propagation policy.
pub fn scan_deleted(path: &BlockDevicePath, options: ScanOptions) -> Vec<CatalogRecord> {
    let source = match BlockSource::open(path) {
        Ok(source) => source,
        Err(err) => {
            log::warn!("scan_deleted: failed to open {path:?}: {err}");
            return Vec::new();
        }
    };

    let geometry = match Geometry::parse_boot_sector(&source) {
        Ok(geometry) => geometry,
        Err(err) => {
            log::warn!("scan_deleted: boot sector did not parse ({err}), using fallback geometry");
            Geometry::permissive_fallback()
        }
    };

    let mut walked = walk_directory(&source, &geometry, geometry.root_cluster, "");

    if walked.is_empty() {
        log::info!("root directory yielded nothing, sweeping speculative directory heads");
        let limit = options.speculative_limit.min(geometry.cluster_count as usize);
        for cluster in 2..2 + limit as u32 {
            let synthetic_root = format!("/unknown_{cluster}");
            let found = walk_directory(&source, &geometry, cluster, &synthetic_root);
            if !found.is_empty() {
                log::info!("found {} entries under speculative head cluster {cluster}", found.len());
                walked.extend(found);
            }
        }
    }

    let mut records: Vec<CatalogRecord> = walked
        .into_iter()
        .filter(|w| w.entry.is_deleted)
        .map(|w| {
            let parent_path = w
                .absolute_path
                .rsplit_once('/')
                .map(|(parent, _)| parent.to_string())
                .unwrap_or_default();

            let detected_type = if w.entry.start_cluster >= 2 {
                geometry
                    .read_cluster_fs(&source, w.entry.start_cluster)
                    .ok()
                    .and_then(|bytes| signature::detect(&bytes))
                    .map(str::to_string)
            } else {
                None
            };

            CatalogRecord {
                long_name: w.absolute_path.rsplit('/').next().unwrap_or("").to_string(),
                short_name: w.entry.short_name.clone(),
                parent_path,
                absolute_path: w.absolute_path,
                is_directory: w.entry.is_directory,
                is_system: w.entry.is_system,
                is_hidden: w.entry.is_hidden,
                deleted: w.entry.is_deleted,
                first_cluster: w.entry.start_cluster,
                size: w.entry.file_size,
                create_timestamp: Geometry::fat_time_to_datetime(
                    w.entry.create_date,
                    w.entry.create_time,
                ),
                modify_time: Geometry::fat_time_to_datetime(
                    w.entry.write_date,
                    w.entry.write_time,
                ),
                access_date: Geometry::fat_date_to_date(w.entry.access_date),
                detected_type,
            }
        })
        .collect();

    records.sort_by(|a, b| a.absolute_path.cmp(&b.absolute_path));
    records
}
