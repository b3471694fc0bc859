//! Directory-cluster iteration: walks a directory's cluster chain,
//! reassembles LFN fragments, and emits one [`CatalogRecord`]-shaping
//! tuple per short entry.
//!
//! Implemented iteratively with an explicit work list rather than
//! recursion (directory trees on real volumes can be deep and a stack
//! frame per directory level is not a bound worth relying on), with a
//! `HashSet` of visited directory-start clusters guarding against a
//! corrupted volume whose subdirectory points back at an ancestor.

use std::collections::HashSet;

use crate::device::BlockSource;
use crate::dirent::{assemble_lfn_name, decode_slot, DirSlot, LfnFragment, ShortEntry};
use crate::geometry::Geometry;
use crate::{DIRENT_SIZE, END_OF_CHAIN_MIN};

/// One short entry discovered while walking, with its resolved name
/// (long if an LFN run preceded it, otherwise the repaired short name)
/// and its absolute path.
pub struct WalkedEntry {
    pub absolute_path: String,
    pub entry: ShortEntry,
}

/// Walks the directory rooted at `root_cluster`, returning every short
/// entry found (including `.`/`..` filtered out, deleted or not). Per-slot
/// and per-cluster I/O errors are logged and skipped; the walk always
/// returns whatever it already collected rather than aborting.
pub fn walk_directory(
    source: &BlockSource,
    geometry: &Geometry,
    root_cluster: u32,
    root_path: &str,
) -> Vec<WalkedEntry> {
    let mut results = Vec::new();
    let mut visited_dirs: HashSet<u32> = HashSet::new();
    let mut work: Vec<(u32, String)> = vec![(root_cluster, root_path.to_string())];

    while let Some((dir_cluster, path)) = work.pop() {
        if !visited_dirs.insert(dir_cluster) {
            log::warn!("directory cluster {dir_cluster} already visited, skipping (cycle guard)");
            continue;
        }

        let chain = match geometry.chain(source, dir_cluster) {
            Ok(chain) => chain,
            Err(err) => {
                log::warn!("failed to read FAT chain for directory cluster {dir_cluster}: {err}");
                continue;
            }
        };

        let mut lfn_fragments: Vec<LfnFragment> = Vec::new();
        let mut lfn_run_deleted = false;

        for cluster in chain {
            let data = match geometry.read_cluster_fs(source, cluster) {
                Ok(data) => data,
                Err(err) => {
                    log::warn!("failed to read directory cluster {cluster}: {err}");
                    continue;
                }
            };

            for raw in data.chunks(DIRENT_SIZE) {
                if raw.len() < DIRENT_SIZE {
                    break;
                }
                match decode_slot(raw) {
                    Some(DirSlot::Empty) => {
                        // Remaining slots in this cluster have never been
                        // used; keep scanning subsequent clusters anyway,
                        // since a deleted entry can leave gaps.
                    }
                    Some(DirSlot::Lfn(fragment)) => {
                        if fragment.is_deleted {
                            lfn_run_deleted = true;
                        }
                        lfn_fragments.push(fragment);
                    }
                    Some(DirSlot::Short(mut short)) => {
                        let mut name = short.short_name.clone();
                        if !lfn_fragments.is_empty() {
                            let long_name = assemble_lfn_name(&mut lfn_fragments);
                            if !long_name.is_empty() {
                                name = long_name;
                            }
                            if lfn_run_deleted {
                                short.is_deleted = true;
                            }
                            lfn_fragments.clear();
                            lfn_run_deleted = false;
                        }

                        if name == "." || name == ".." {
                            continue;
                        }

                        let absolute_path = if path.is_empty() || path == "/" {
                            format!("/{name}")
                        } else {
                            format!("{path}/{name}")
                        };

                        if short.is_directory
                            && !short.is_deleted
                            && short.start_cluster >= 2
                            && short.start_cluster < END_OF_CHAIN_MIN
                        {
                            work.push((short.start_cluster, absolute_path.clone()));
                        }

                        results.push(WalkedEntry {
                            absolute_path,
                            entry: short,
                        });
                    }
                    None => {}
                }
            }
        }
    }

    results
}
