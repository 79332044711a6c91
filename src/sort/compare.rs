//! Multi-key comparator.
//!
//! Iterates keys in order; for numeric keys, an empty extracted field is
//! resolved per `EmptyNumericPolicy`, and an unparseable (but non-empty)
//! token parses leniently as zero rather than failing the whole sort.
//! Byte-wise keys compare the (possibly EBCDIC-remapped) extracted slices
//! directly.

use std::cmp::Ordering;

use super::error::SortError;
use super::key::{extract_key, SortKey};

/// Empty-numeric-field policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum EmptyNumericPolicy {
    #[default]
    Zero,
    Error,
}

/// Parse a byte slice as a signed decimal with optional fractional part.
/// Unparseable tokens parse as 0.0 -- legacy behaviour preserved per
/// spec.md section 9's "Numeric parsing fallback" design note. Rust's
/// `f64::from_str` also accepts "nan"/"inf"/"infinity" as valid floats;
/// those aren't numbers the legacy format ever emits, and a `NaN` breaks
/// the comparator's strict weak order (`partial_cmp` -> `None`), so
/// non-finite parses are folded into the same 0.0 fallback as a parse
/// failure.
pub fn parse_numeric_lenient(s: &[u8]) -> f64 {
    let s = trim_blanks(s);
    if s.is_empty() {
        return 0.0;
    }
    match std::str::from_utf8(s) {
        Ok(text) => text
            .trim()
            .parse::<f64>()
            .ok()
            .filter(|v| v.is_finite())
            .unwrap_or(0.0),
        Err(_) => 0.0,
    }
}

fn trim_blanks(s: &[u8]) -> &[u8] {
    let mut start = 0;
    while start < s.len() && (s[start] == b' ' || s[start] == b'\t') {
        start += 1;
    }
    &s[start..]
}

/// Compare two records under the configured keys. See spec.md section 4.A.
///
/// Returns `Ok(Equal)` when every key agrees -- this is "equal under the
/// sort" (spec.md section 3); the implementation never falls through to a
/// whole-record comparison, so dedup on this equality class is correct.
pub fn compare(
    a: &[u8],
    b: &[u8],
    keys: &[SortKey],
    delimiter: &[u8],
    trim: bool,
    empty_numeric: EmptyNumericPolicy,
) -> Result<Ordering, SortError> {
    for key in keys {
        let fa = extract_key(a, key, delimiter, trim);
        let fb = extract_key(b, key, delimiter, trim);

        let ord = if key.numeric {
            let (va, vb) = resolve_numeric_pair(&fa, &fb, key, empty_numeric)?;
            va.partial_cmp(&vb).unwrap_or(Ordering::Equal)
        } else {
            fa.as_ref().cmp(fb.as_ref())
        };

        let ord = if key.ascending { ord } else { ord.reverse() };
        if ord != Ordering::Equal {
            return Ok(ord);
        }
    }
    Ok(Ordering::Equal)
}

fn resolve_numeric_pair(
    fa: &[u8],
    fb: &[u8],
    key: &SortKey,
    policy: EmptyNumericPolicy,
) -> Result<(f64, f64), SortError> {
    let va = resolve_numeric_field(fa, key, policy)?;
    let vb = resolve_numeric_field(fb, key, policy)?;
    Ok((va, vb))
}

fn resolve_numeric_field(
    f: &[u8],
    key: &SortKey,
    policy: EmptyNumericPolicy,
) -> Result<f64, SortError> {
    if f.is_empty() {
        return match policy {
            EmptyNumericPolicy::Zero => Ok(0.0),
            EmptyNumericPolicy::Error => Err(SortError::EmptyNumeric {
                start: key.start,
                length: key.length,
            }),
        };
    }
    Ok(parse_numeric_lenient(f))
}
