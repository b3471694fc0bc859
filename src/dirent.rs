//! Directory-entry decoding: the 32-byte short (8.3) and long-file-name
//! (LFN) on-disk slot layouts, and deletion-marker handling.
//!
//! A directory region is a flat array of 32-byte slots; a slot is either
//! unused, an LFN fragment, or a short (8.3) entry, and a long name is
//! reassembled from the run of LFN fragments immediately preceding the
//! short entry they describe. Modeled here as a tagged enum rather than
//! re-deriving the kind from raw attribute bytes at every call site.

use crate::{ATTR_DIRECTORY, ATTR_HIDDEN, ATTR_SYSTEM, DIR_ENTRY_LAST_AND_UNUSED, DIR_ENTRY_UNUSED, DIRENT_SIZE, LAST_LONG_ENTRY};

const LFN_ATTR: u8 = 0x0F;

/// One decoded 32-byte directory slot.
#[derive(Debug, Clone)]
pub enum DirSlot {
    /// Slot has never been used; the cluster's remaining slots (in on-disk
    /// order) have never been used either.
    Empty,
    Lfn(LfnFragment),
    Short(ShortEntry),
}

#[derive(Debug, Clone)]
pub struct LfnFragment {
    pub order: u8,
    pub is_last: bool,
    pub is_deleted: bool,
    pub name_units: [u16; 13],
}

#[derive(Debug, Clone)]
pub struct ShortEntry {
    pub short_name: String,
    pub is_deleted: bool,
    pub is_directory: bool,
    pub is_system: bool,
    pub is_hidden: bool,
    pub file_size: u32,
    pub start_cluster: u32,
    pub create_time: u16,
    pub create_date: u16,
    pub write_time: u16,
    pub write_date: u16,
    pub access_date: u16,
}

/// Decodes one 32-byte slot. Returns `None` if `raw` is not exactly 32
/// bytes (a caller error — callers should chunk cluster data by
/// `DIRENT_SIZE` before calling this).
pub fn decode_slot(raw: &[u8]) -> Option<DirSlot> {
    if raw.len() != DIRENT_SIZE {
        return None;
    }

    let first_byte = raw[0];
    if first_byte == DIR_ENTRY_LAST_AND_UNUSED {
        return Some(DirSlot::Empty);
    }

    let attr = raw[11];
    if attr == LFN_ATTR {
        return Some(DirSlot::Lfn(decode_lfn_fragment(raw, first_byte)));
    }

    Some(DirSlot::Short(decode_short_entry(raw, first_byte, attr)))
}

fn decode_lfn_fragment(raw: &[u8], first_byte: u8) -> LfnFragment {
    let is_deleted = first_byte == DIR_ENTRY_UNUSED;
    let order = first_byte & 0x3F;
    let is_last = (first_byte & LAST_LONG_ENTRY) != 0;

    let mut bytes = Vec::with_capacity(26);
    bytes.extend_from_slice(&raw[1..11]);
    bytes.extend_from_slice(&raw[14..26]);
    bytes.extend_from_slice(&raw[28..32]);

    let mut name_units = [0u16; 13];
    for (i, chunk) in bytes.chunks_exact(2).enumerate() {
        name_units[i] = u16::from_le_bytes([chunk[0], chunk[1]]);
    }

    LfnFragment {
        order,
        is_last,
        is_deleted,
        name_units,
    }
}

fn decode_short_entry(raw: &[u8], first_byte: u8, attr: u8) -> ShortEntry {
    let is_deleted = first_byte == DIR_ENTRY_UNUSED;

    let mut name = String::from_utf8_lossy(&raw[0..8]).trim().to_string();
    let ext = String::from_utf8_lossy(&raw[8..11]).trim().to_string();

    if is_deleted && !name.is_empty() {
        // The delete marker overwrites the name's first byte; the
        // original tool repairs it with a placeholder underscore.
        name.replace_range(0..1, "_");
    }

    let short_name = if ext.is_empty() {
        name
    } else {
        format!("{name}.{ext}")
    };

    let create_time = read_u16(raw, 14);
    let create_date = read_u16(raw, 16);
    let access_date = read_u16(raw, 18);
    let cluster_high = read_u16(raw, 20);
    let write_time = read_u16(raw, 22);
    let write_date = read_u16(raw, 24);
    let cluster_low = read_u16(raw, 26);
    let file_size = read_u32(raw, 28);

    let start_cluster = ((cluster_high as u32) << 16) | cluster_low as u32;

    ShortEntry {
        short_name,
        is_deleted,
        is_directory: attr & ATTR_DIRECTORY != 0,
        is_system: attr & ATTR_SYSTEM != 0,
        is_hidden: attr & ATTR_HIDDEN != 0,
        file_size,
        start_cluster,
        create_time,
        create_date,
        write_time,
        write_date,
        access_date,
    }
}

/// Joins an ordinal-sorted run of LFN fragments into the name they encode,
/// dropping the padding/terminator units `0xFFFF` and `0x0000`.
pub fn assemble_lfn_name(fragments: &mut [LfnFragment]) -> String {
    fragments.sort_by_key(|f| f.order);
    let mut name = String::new();
    for fragment in fragments.iter() {
        for &unit in fragment.name_units.iter() {
            if unit != 0xFFFF && unit != 0x0000 {
                if let Some(c) = char::from_u32(unit as u32) {
                    name.push(c);
                }
            }
        }
    }
    name
}

fn read_u16(buf: &[u8], offset: usize) -> u16 {
    u16::from_le_bytes([buf[offset], buf[offset + 1]])
}

fn read_u32(buf: &[u8], offset: usize) -> u32 {
    u32::from_le_bytes([
        buf[offset],
        buf[offset + 1],
        buf[offset + 2],
        buf[offset + 3],
    ])
}

#[cfg(test)]
mod tests {
    use super::*;

    fn lfn_fragment(order: u8, last: bool, text: &str) -> [u8; 32] {
        let mut raw = [0u8; 32];
        raw[0] = if last { order | LAST_LONG_ENTRY } else { order };
        raw[11] = LFN_ATTR;
        let units: Vec<u16> = text.encode_utf16().collect();
        let mut padded = units.clone();
        padded.resize(13, 0xFFFF);
        let bytes: Vec<u8> = padded.iter().flat_map(|u| u.to_le_bytes()).collect();
        raw[1..11].copy_from_slice(&bytes[0..10]);
        raw[14..26].copy_from_slice(&bytes[10..22]);
        raw[28..32].copy_from_slice(&bytes[22..26]);
        raw
    }

    #[test]
    fn decodes_empty_slot() {
        let raw = [0u8; 32];
        assert!(matches!(decode_slot(&raw), Some(DirSlot::Empty)));
    }

    #[test]
    fn decodes_deleted_short_entry_with_repaired_name() {
        let mut raw = [0u8; 32];
        raw[0] = DIR_ENTRY_UNUSED;
        raw[1..8].copy_from_slice(b"OO     ");
        raw[8..11].copy_from_slice(b"TXT");
        match decode_slot(&raw).unwrap() {
            DirSlot::Short(entry) => {
                assert!(entry.is_deleted);
                assert!(entry.short_name.starts_with('_'));
                assert!(entry.short_name.ends_with(".TXT"));
            }
            _ => panic!("expected short entry"),
        }
    }

    #[test]
    fn lfn_ordering_is_order_invariant() {
        let frag_a = lfn_fragment(1, false, "Hello");
        let frag_b = lfn_fragment(2, true, " World");

        let mut in_order = vec![
            match decode_slot(&frag_a).unwrap() {
                DirSlot::Lfn(f) => f,
                _ => unreachable!(),
            },
            match decode_slot(&frag_b).unwrap() {
                DirSlot::Lfn(f) => f,
                _ => unreachable!(),
            },
        ];
        let mut reversed = in_order.clone();
        reversed.reverse();

        assert_eq!(assemble_lfn_name(&mut in_order), assemble_lfn_name(&mut reversed));
    }
}
