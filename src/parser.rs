//! Line tokenizer for the survey CSV export.
//!
//! Two modes are available. [`ParseMode::Permissive`] mirrors the loose
//! tokenizer the dashboard has always used (quoted runs or comma-free runs,
//! empty fields skipped). [`ParseMode::Strict`] is a full RFC4180 reader
//! backed by the `csv` crate. Both trim every field.

use csv::{ReaderBuilder, StringRecord, Trim};
use serde::{Deserialize, Serialize};
use std::str::FromStr;
use tracing::debug;

/// Selects how a raw line is split into fields.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ParseMode {
    /// RFC4180 with `""` escapes; empty fields are preserved.
    #[default]
    Strict,
    /// Best-effort tokenizer; never fails, may drop empty fields.
    Permissive,
}

impl FromStr for ParseMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "strict" => Ok(ParseMode::Strict),
            "permissive" => Ok(ParseMode::Permissive),
            other => Err(format!("unknown parse mode '{other}' (expected strict or permissive)")),
        }
    }
}

/// Splits one line of text into trimmed field values.
///
/// Never fails: malformed input yields a best-effort token list which may
/// not line up with the header.
pub fn parse_line(line: &str, mode: ParseMode) -> Vec<String> {
    match mode {
        ParseMode::Strict => parse_strict(line),
        ParseMode::Permissive => parse_permissive(line),
    }
}

fn parse_strict(line: &str) -> Vec<String> {
    let mut reader = ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .trim(Trim::All)
        .from_reader(line.as_bytes());

    let mut record = StringRecord::new();
    match reader.read_record(&mut record) {
        Ok(true) => record.iter().map(str::to_string).collect(),
        Ok(false) => Vec::new(),
        Err(e) => {
            debug!(error = %e, "Strict CSV read failed, falling back to permissive tokens");
            parse_permissive(line)
        }
    }
}

/// Tokens are a double-quoted run or a run of characters that are neither
/// commas nor quotes; each must be followed by optional whitespace and then
/// a comma or the end of the line. Anything else is skipped.
fn parse_permissive(line: &str) -> Vec<String> {
    let chars: Vec<char> = line.chars().collect();
    let mut fields = Vec::new();
    let mut start = 0;

    while start < chars.len() {
        match token_end(&chars, start) {
            Some(end) => {
                let token: String = chars[start..end].iter().collect();
                fields.push(clean_token(&token));
                start = end;
            }
            None => start += 1,
        }
    }

    fields
}

fn token_end(chars: &[char], start: usize) -> Option<usize> {
    match chars[start] {
        ',' => None,
        '"' => {
            // shortest quoted run whose closing quote sits before a delimiter
            for (offset, c) in chars[start + 1..].iter().enumerate() {
                let pos = start + 1 + offset;
                if *c == '\n' || *c == '\r' {
                    return None;
                }
                if *c == '"' && at_delimiter(chars, pos + 1) {
                    return Some(pos + 1);
                }
            }
            None
        }
        _ => {
            let mut end = start;
            while end < chars.len() && chars[end] != ',' && chars[end] != '"' {
                end += 1;
            }
            // give back characters until the lookahead holds
            (start + 1..=end).rev().find(|&e| at_delimiter(chars, e))
        }
    }
}

fn at_delimiter(chars: &[char], pos: usize) -> bool {
    let rest = chars[pos..].iter().find(|c| !c.is_whitespace());
    matches!(rest, None | Some(','))
}

fn clean_token(token: &str) -> String {
    let token = token.strip_prefix('"').unwrap_or(token);
    let token = token.strip_suffix('"').unwrap_or(token);
    token.trim().to_string()
}
