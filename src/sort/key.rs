//! Key definitions and field extraction (spec.md section 4.A).
//!
//! `SortKey` addresses either a byte range (no delimiter configured) or a
//! delimited column (delimiter configured); extraction is allocation-free on
//! the byte-identity path and only allocates when EBCDIC remap or trimming
//! requires a transformed copy.

use std::borrow::Cow;

use memchr::memchr_iter;

use super::ebcdic::remap_to_ascii;

/// Byte transform applied to extracted key bytes before comparison.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Collation {
    #[default]
    ByteIdentity,
    Ebcdic,
}

/// One component of the lexicographic order.
#[derive(Debug, Clone)]
pub struct SortKey {
    /// 0-based start: byte offset (no delimiter) or column index (delimiter).
    pub start: usize,
    /// 0 => to end of field/record.
    pub length: usize,
    pub numeric: bool,
    pub ascending: bool,
    pub collation: Collation,
}

impl SortKey {
    pub fn new(start: usize, length: usize, numeric: bool, ascending: bool) -> Self {
        SortKey {
            start,
            length,
            numeric,
            ascending,
            collation: Collation::ByteIdentity,
        }
    }
}

/// Split `record` on `delimiter` and return the byte range of column `n`.
fn find_nth_column(record: &[u8], n: usize, delimiter: &[u8]) -> Option<(usize, usize)> {
    if delimiter.len() == 1 {
        let sep = delimiter[0];
        let mut col = 0usize;
        let mut start = 0usize;
        for pos in memchr_iter(sep, record) {
            if col == n {
                return Some((start, pos));
            }
            col += 1;
            start = pos + 1;
        }
        if col == n {
            return Some((start, record.len()));
        }
        return None;
    }

    // Multi-byte delimiter: simple window scan.
    let mut col = 0usize;
    let mut start = 0usize;
    let mut i = 0usize;
    while i + delimiter.len() <= record.len() {
        if &record[i..i + delimiter.len()] == delimiter {
            if col == n {
                return Some((start, i));
            }
            col += 1;
            i += delimiter.len();
            start = i;
        } else {
            i += 1;
        }
    }
    if col == n {
        return Some((start, record.len()));
    }
    None
}

/// Extract the key bytes for `key` from `record`, per spec.md 4.A.
///
/// `record` must already have its trailing terminator stripped (the reader
/// guarantees this). `trim` strips ASCII whitespace from both ends of the
/// extracted slice. The EBCDIC remap, when configured, allocates; the
/// byte-identity path never does.
pub fn extract_key<'a>(
    record: &'a [u8],
    key: &SortKey,
    delimiter: &[u8],
    trim: bool,
) -> Cow<'a, [u8]> {
    let raw: &[u8] = if !delimiter.is_empty() {
        match find_nth_column(record, key.start, delimiter) {
            None => b"",
            Some((s, e)) => {
                let col = &record[s..e];
                if key.length > 0 && key.length < col.len() {
                    &col[..key.length]
                } else {
                    col
                }
            }
        }
    } else if key.start >= record.len() {
        b""
    } else if key.length == 0 {
        &record[key.start..]
    } else {
        &record[key.start..(key.start + key.length).min(record.len())]
    };

    let raw: &[u8] = if trim { trim_ascii_whitespace(raw) } else { raw };

    match key.collation {
        Collation::ByteIdentity => Cow::Borrowed(raw),
        Collation::Ebcdic => Cow::Owned(remap_to_ascii(raw)),
    }
}

fn trim_ascii_whitespace(s: &[u8]) -> &[u8] {
    let is_ws = |b: &u8| b.is_ascii_whitespace();
    let start = s.iter().position(|b| !is_ws(b)).unwrap_or(s.len());
    let end = s
        .iter()
        .rposition(|b| !is_ws(b))
        .map(|i| i + 1)
        .unwrap_or(start);
    &s[start..end]
}
