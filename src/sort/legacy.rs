//! Legacy `KEY=VALUE` parameter-block parser for the `xssort` binary.
//!
//! Mirrors `ParseXSSortParams` (`internal/config/config.go`): the whole
//! argv is joined into one string and split on commas, except commas
//! nested inside parentheses, which belong to a `S<n>=(...)` sort-key
//! block rather than separating top-level parameters.

use std::path::PathBuf;

use super::compare::EmptyNumericPolicy;
use super::config::{Config, Newline, RecordType};
use super::error::SortError;
use super::key::{Collation, SortKey};
use super::planner::memory_budget_bytes;

/// Split `s` on `sep`, treating any `sep` inside a `(...)` span as part of
/// the current token rather than a separator.
fn split_respecting_parens(s: &str, sep: char) -> Vec<String> {
    let mut tokens = Vec::new();
    let mut current = String::new();
    let mut depth = 0i32;
    for c in s.chars() {
        match c {
            '(' => {
                depth += 1;
                current.push(c);
            }
            ')' => {
                depth -= 1;
                current.push(c);
            }
            c if c == sep && depth == 0 => {
                tokens.push(std::mem::take(&mut current));
            }
            c => current.push(c),
        }
    }
    if !current.trim().is_empty() {
        tokens.push(current);
    }
    tokens
}

fn split_top_level(s: &str, sep: char) -> Vec<String> {
    s.split(sep).map(|t| t.to_string()).collect()
}

#[derive(Default)]
struct PendingKey {
    start: Option<usize>,
    length: Option<usize>,
    numeric: bool,
    ascending: bool,
    collation: Collation,
}

impl PendingKey {
    fn new() -> Self {
        PendingKey {
            start: None,
            length: None,
            numeric: false,
            ascending: true,
            collation: Collation::ByteIdentity,
        }
    }

    fn into_sort_key(self) -> SortKey {
        let mut key = SortKey::new(
            self.start.unwrap_or(0),
            self.length.unwrap_or(0),
            self.numeric,
            self.ascending,
        );
        key.collation = self.collation;
        key
    }
}

fn parse_sort_key_block(index: usize, body: &str) -> Result<(usize, SortKey), SortError> {
    let mut pending = PendingKey::new();
    for sub in split_top_level(body, ',') {
        let sub = sub.trim();
        if sub.is_empty() {
            continue;
        }
        let (k, v) = sub
            .split_once('=')
            .ok_or_else(|| SortError::Usage(format!("malformed sort-key sub-argument: {sub}")))?;
        let v = v.trim();
        match k.trim().to_ascii_lowercase().as_str() {
            "e" => {
                pending.start = Some(v.parse().map_err(|_| {
                    SortError::Usage(format!("invalid e= value in S{index}: {v}"))
                })?);
            }
            "l" => {
                pending.length = Some(v.parse().map_err(|_| {
                    SortError::Usage(format!("invalid l= value in S{index}: {v}"))
                })?);
            }
            "p" => {
                let (a, b) = v.split_once('-').ok_or_else(|| {
                    SortError::Usage(format!("invalid p= range in S{index}: {v}"))
                })?;
                let a: usize = a
                    .trim()
                    .parse()
                    .map_err(|_| SortError::Usage(format!("invalid p= range in S{index}: {v}")))?;
                let b: usize = b
                    .trim()
                    .parse()
                    .map_err(|_| SortError::Usage(format!("invalid p= range in S{index}: {v}")))?;
                // `p=<start>-<end>` is inclusive and not re-based: the Go
                // original (`ParseXSSortParams`) sets `start = s` literally,
                // with no 1-based-to-0-based shift (spec.md section 4.G).
                pending.start = Some(a);
                pending.length = Some(b.saturating_sub(a) + 1);
            }
            "g" => {
                if v.eq_ignore_ascii_case("n") || v.eq_ignore_ascii_case("numeric") {
                    pending.numeric = true;
                } else if v.eq_ignore_ascii_case("ebcdic") {
                    pending.collation = Collation::Ebcdic;
                }
            }
            "v" => {
                pending.ascending = !v.eq_ignore_ascii_case("desc");
            }
            other => {
                return Err(SortError::Usage(format!(
                    "unknown sort-key sub-argument '{other}' in S{index}"
                )))
            }
        }
    }
    Ok((index, pending.into_sort_key()))
}

/// Scan the raw argv for a single top-level `PREFIX=value` token (e.g.
/// `O=`), respecting the same paren-nesting rule as the full parser. Used
/// by `extract_testfile_count`'s caller to find `O=` without running the
/// full `I=`/sort-key validation that a pure test-file generation request
/// doesn't need.
pub fn extract_token(args: &[String], prefix: &str) -> Option<String> {
    let joined = args.join(" ");
    for token in split_respecting_parens(&joined, ',') {
        let token = token.trim();
        if let Some(value) = token.strip_prefix(prefix) {
            return Some(value.trim().to_string());
        }
    }
    None
}

/// Scan the raw argv for a `TF=<n>` token without requiring the rest of the
/// parameter block (`I=`, sort keys, ...) to be present. Mirrors the Go
/// original's `Config.TestFile` field, which short-circuits straight to
/// `testdata.GenerateTestFile` in `cmd/genfile/main.go` rather than running
/// the sort pipeline.
pub fn extract_testfile_count(args: &[String]) -> Option<u64> {
    let joined = args.join(" ");
    for token in split_respecting_parens(&joined, ',') {
        let token = token.trim();
        if let Some(value) = token.strip_prefix("TF=").or_else(|| token.strip_prefix("tf=")) {
            return value.trim().parse().ok();
        }
    }
    None
}

/// Parse the legacy `I=...,O=...,S1=(...),...` parameter block, as passed
/// to `xssort` via its raw argv.
pub fn parse_legacy_params(args: &[String]) -> Result<Config, SortError> {
    let joined = args.join(" ");
    let tokens = split_respecting_parens(&joined, ',');

    let mut input: Option<PathBuf> = None;
    let mut output: Option<PathBuf> = None;
    let mut record_length: usize = 0;
    let mut record_type = RecordType::Variable;
    let mut truncate_spaces = false;
    let mut remove_duplicates = false;
    let mut empty_numeric = EmptyNumericPolicy::default();
    let mut temp_dir: Option<PathBuf> = None;
    let mut memory: Option<u64> = None;
    let mut newline = Newline::default();
    let mut keyed: Vec<(usize, SortKey)> = Vec::new();

    for raw in tokens {
        let token = raw.trim();
        if token.is_empty() {
            continue;
        }
        let (key, value) = token
            .split_once('=')
            .ok_or_else(|| SortError::Usage(format!("malformed parameter: {token}")))?;
        let key = key.trim().to_ascii_uppercase();
        let value = value.trim();

        if let Some(rest) = key.strip_prefix('S') {
            if let Ok(index) = rest.parse::<usize>() {
                let body = value
                    .strip_prefix('(')
                    .and_then(|v| v.strip_suffix(')'))
                    .ok_or_else(|| {
                        SortError::Usage(format!("sort key S{index} must be parenthesized"))
                    })?;
                keyed.push(parse_sort_key_block(index, body)?);
                continue;
            }
        }

        match key.as_str() {
            "I" => input = Some(PathBuf::from(value)),
            "O" => output = Some(PathBuf::from(value)),
            "RL" => {
                record_length = value
                    .parse()
                    .map_err(|_| SortError::Usage(format!("invalid RL value: {value}")))?;
            }
            "RT" => {
                record_type = match value.to_ascii_uppercase().as_str() {
                    "F" => RecordType::Fixed,
                    "V" => RecordType::Variable,
                    other => {
                        return Err(SortError::Usage(format!("invalid RT value: {other}")))
                    }
                };
            }
            "TS" => truncate_spaces = parse_yes_no(value)?,
            "RD" => remove_duplicates = parse_yes_no(value)?,
            "EN" => {
                empty_numeric = match value.to_ascii_uppercase().as_str() {
                    "ZERO" => EmptyNumericPolicy::Zero,
                    "ERROR" => EmptyNumericPolicy::Error,
                    other => {
                        return Err(SortError::Usage(format!("invalid EN value: {other}")))
                    }
                };
            }
            "TMP" => temp_dir = Some(PathBuf::from(value)),
            "MEM" => memory = Some(parse_memory_string(value)?),
            // Consumed separately by `extract_testfile_count` before the
            // sort-oriented fields below are required; ignored here so a
            // `TF=` token doesn't also need `I=`/sort keys to parse.
            "TF" => {}
            "NL" => {
                newline = match value.to_ascii_uppercase().as_str() {
                    "LF" => Newline::Lf,
                    "CRLF" => Newline::Crlf,
                    "NATIVE" => Newline::Native,
                    other => {
                        return Err(SortError::Usage(format!("invalid NL value: {other}")))
                    }
                };
            }
            other => {
                return Err(SortError::Usage(format!("unknown parameter: {other}")));
            }
        }
    }

    let input = input.ok_or_else(|| SortError::Usage("missing required parameter I=".into()))?;
    let output = output.ok_or_else(|| SortError::Usage("missing required parameter O=".into()))?;
    if record_type == RecordType::Fixed && record_length == 0 {
        return Err(SortError::Usage(
            "RT=F requires a non-zero RL= record length".into(),
        ));
    }
    if keyed.is_empty() {
        return Err(SortError::Usage(
            "at least one sort key (S1=, S2=, ...) is required".into(),
        ));
    }

    keyed.sort_by_key(|(i, _)| *i);
    let keys: Vec<SortKey> = keyed.into_iter().map(|(_, k)| k).collect();

    let mut config = Config::new(input, output);
    config.temp_dir = temp_dir;
    config.record_type = record_type;
    config.record_length = record_length;
    config.keys = keys;
    config.truncate_spaces = truncate_spaces;
    config.remove_duplicates = remove_duplicates;
    config.empty_numeric = empty_numeric;
    config.memory_budget = memory;
    config.newline = newline;

    // Force-touch the memory planner's budget resolution once here so a
    // malformed MEM= string surfaces immediately rather than mid-pipeline.
    if let Some(bytes) = config.memory_budget {
        let _ = memory_budget_bytes(Some(bytes));
    }

    Ok(config)
}

/// Parse a `K`/`M`/`G`-suffixed memory size, case-insensitively. Grounded
/// on `ParseMemoryString` (`internal/utils/memory.go`).
fn parse_memory_string(value: &str) -> Result<u64, SortError> {
    let value = value.trim();
    if value.is_empty() {
        return Err(SortError::Usage("empty MEM= value".into()));
    }
    let upper = value.to_ascii_uppercase();
    let (digits, multiplier) = if let Some(d) = upper.strip_suffix('G') {
        (d, 1024u64 * 1024 * 1024)
    } else if let Some(d) = upper.strip_suffix('M') {
        (d, 1024u64 * 1024)
    } else if let Some(d) = upper.strip_suffix('K') {
        (d, 1024u64)
    } else {
        (upper.as_str(), 1u64)
    };
    let n: u64 = digits
        .trim()
        .parse()
        .map_err(|_| SortError::Usage(format!("invalid MEM= value: {value}")))?;
    Ok(n * multiplier)
}

fn parse_yes_no(value: &str) -> Result<bool, SortError> {
    match value.to_ascii_uppercase().as_str() {
        "Y" | "YES" | "TRUE" => Ok(true),
        "N" | "NO" | "FALSE" => Ok(false),
        other => Err(SortError::Usage(format!("expected Y/N, got: {other}"))),
    }
}
