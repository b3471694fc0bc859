//! File-type signature catalog: header and trailer magic-byte tables,
//! held as plain data rather than code, and the `detect` classifier.
//! Covers the common formats seen in deleted-file recovery: JPEG, PNG,
//! WebP, GIF, BMP, HEIC, PDF, DOC/DOCX, RAR, and 7z.

/// A single byte pattern. `WildcardRiff` models the one 4-byte wildcard
/// region this catalog needs (`RIFF <4 any> WEBP`): `prefix` must start the
/// buffer, `suffix` must appear anywhere in the first 50 bytes.
#[derive(Debug, Clone, Copy)]
pub enum Pattern {
    Literal(&'static [u8]),
    WildcardRiff {
        prefix: &'static [u8],
        suffix: &'static [u8],
    },
}

pub const HEADERS: &[(&str, &[Pattern])] = &[
    (
        "jpg",
        &[
            Pattern::Literal(&[0xFF, 0xD8, 0xFF]),
            Pattern::Literal(&[0xFF, 0xD8, 0xFF, 0xE0]),
            Pattern::Literal(&[0xFF, 0xD8, 0xFF, 0xE1]),
        ],
    ),
    (
        "png",
        &[Pattern::Literal(&[
            0x89, 0x50, 0x4E, 0x47, 0x0D, 0x0A, 0x1A, 0x0A,
        ])],
    ),
    (
        "webp",
        &[Pattern::WildcardRiff {
            prefix: b"RIFF",
            suffix: b"WEBP",
        }],
    ),
    (
        "gif",
        &[Pattern::Literal(b"GIF87a"), Pattern::Literal(b"GIF89a")],
    ),
    ("bmp", &[Pattern::Literal(b"BM")]),
    (
        "heic",
        &[Pattern::Literal(&[
            0x00, 0x00, 0x00, 0x18, 0x66, 0x74, 0x79, 0x70, 0x68, 0x65, 0x69, 0x63,
        ])],
    ),
    ("pdf", &[Pattern::Literal(b"%PDF")]),
    (
        "doc",
        &[Pattern::Literal(&[
            0xD0, 0xCF, 0x11, 0xE0, 0xA1, 0xB1, 0x1A, 0xE1,
        ])],
    ),
    ("docx", &[Pattern::Literal(&[0x50, 0x4B, 0x03, 0x04])]),
    ("rar", &[Pattern::Literal(b"Rar!\x1A\x07")]),
    (
        "7z",
        &[Pattern::Literal(&[0x37, 0x7A, 0xBC, 0xAF, 0x27, 0x1C])],
    ),
];

pub const TRAILERS: &[(&str, &[Pattern])] = &[
    ("jpg", &[Pattern::Literal(&[0xFF, 0xD9])]),
    (
        "png",
        &[Pattern::Literal(&[
            0x49, 0x45, 0x4E, 0x44, 0xAE, 0x42, 0x60, 0x82,
        ])],
    ),
    ("gif", &[Pattern::Literal(&[0x3B])]),
    ("pdf", &[Pattern::Literal(b"%%EOF")]),
    ("docx", &[Pattern::Literal(&[0x50, 0x4B, 0x05, 0x06])]),
    (
        "rar",
        &[Pattern::Literal(&[
            0xC4, 0x3D, 0x7B, 0x00, 0x40, 0x07, 0x00,
        ])],
    ),
];

const DETECT_WINDOW: usize = 50;

/// Classifies `bytes` against [`HEADERS`] in table order; the first match
/// wins. Only the first [`DETECT_WINDOW`] bytes are consulted.
pub fn detect(bytes: &[u8]) -> Option<&'static str> {
    let window = &bytes[..bytes.len().min(DETECT_WINDOW)];
    for (ext, patterns) in HEADERS {
        for pattern in *patterns {
            if matches_header(pattern, window) {
                return Some(ext);
            }
        }
    }
    None
}

fn matches_header(pattern: &Pattern, window: &[u8]) -> bool {
    match pattern {
        Pattern::Literal(bytes) => window.starts_with(bytes),
        Pattern::WildcardRiff { prefix, suffix } => {
            window.starts_with(prefix) && find(window, suffix).is_some()
        }
    }
}

/// Returns trailer patterns registered for `ext`, if any.
pub fn trailers_for(ext: &str) -> Option<&'static [Pattern]> {
    TRAILERS
        .iter()
        .find(|(name, _)| *name == ext)
        .map(|(_, patterns)| *patterns)
}

/// Finds the first occurrence of `needle` in `haystack`, if any.
pub fn find(haystack: &[u8], needle: &[u8]) -> Option<usize> {
    if needle.is_empty() || haystack.len() < needle.len() {
        return None;
    }
    haystack
        .windows(needle.len())
        .position(|window| window == needle)
}

/// Finds the last occurrence of `needle` in `haystack`, if any. Used by
/// EOF truncation, which cuts at the *last* trailer occurrence so an
/// embedded thumbnail's inner trailer (e.g. an EXIF preview inside a JPEG)
/// does not truncate the outer stream early.
pub fn find_last(haystack: &[u8], needle: &[u8]) -> Option<usize> {
    if needle.is_empty() || haystack.len() < needle.len() {
        return None;
    }
    haystack
        .windows(needle.len())
        .rposition(|window| window == needle)
}

/// Byte length of the first trailer pattern registered for `ext`, or `0`
/// if `ext` has no literal trailer pattern registered (wildcard trailers
/// do not currently exist in this catalog).
pub fn trailer_len(ext: &str) -> usize {
    trailers_for(ext)
        .and_then(|patterns| patterns.first())
        .map(|pattern| match pattern {
            Pattern::Literal(bytes) => bytes.len(),
            Pattern::WildcardRiff { prefix, suffix } => prefix.len() + 4 + suffix.len(),
        })
        .unwrap_or(0)
}

/// True if any trailer pattern for `ext` occurs anywhere in `bytes`.
pub fn contains_trailer(ext: &str, bytes: &[u8]) -> bool {
    let Some(patterns) = trailers_for(ext) else {
        return false;
    };
    patterns.iter().any(|pattern| match pattern {
        Pattern::Literal(needle) => find(bytes, needle).is_some(),
        Pattern::WildcardRiff { suffix, .. } => find(bytes, suffix).is_some(),
    })
}
