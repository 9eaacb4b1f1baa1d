// src/reformat/mod.rs

use crate::table::{strip_quotes, Header, DELIMITER};
use thiserror::Error;
use tracing::{debug, trace};

/// Separator between values on rebuilt data lines. The header line keeps a
/// bare comma.
pub const VALUE_SEPARATOR: &str = ", ";

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ReformatError {
    #[error("file does not contain enough headers ({found}); must contain the headers {required:?}")]
    InsufficientHeaders { required: Vec<String>, found: usize },

    #[error("missing header `{header}` (available: {available:?})")]
    MissingHeader {
        header: String,
        available: Vec<String>,
    },

    #[error("line {line}: no value in column {column} for `{header}`")]
    ShortRow {
        line: usize,
        column: usize,
        header: String,
    },
}

/// Rebuild `source` so it holds exactly `required` columns, in that order.
///
/// Source headers are trimmed and matched case-insensitively; the first match
/// wins. Every required header must be found or nothing is produced. Quote
/// characters are removed from values. With `include_headers` the output
/// starts with the required headers joined by `,`; data lines are joined by
/// `, `. There is no trailing newline.
pub fn reformat(
    source: &str,
    required: &[&str],
    include_headers: bool,
) -> Result<String, ReformatError> {
    let mut lines = source
        .lines()
        .enumerate()
        .filter(|(_, l)| !l.trim().is_empty());

    let headers: Vec<&str> = lines
        .next()
        .map(|(_, l)| l.split(DELIMITER).map(str::trim).collect())
        .unwrap_or_default();

    if headers.len() < required.len() {
        return Err(ReformatError::InsufficientHeaders {
            required: required.iter().map(|s| s.to_string()).collect(),
            found: headers.len(),
        });
    }

    let mut columns = Vec::with_capacity(required.len());
    for &want in required {
        let wanted = Header::new(want);
        match headers.iter().position(|h| wanted.matches(h)) {
            Some(col) => {
                trace!(header = want, col, "located column");
                columns.push(col);
            }
            None => {
                return Err(ReformatError::MissingHeader {
                    header: want.to_string(),
                    available: headers.iter().map(|h| h.to_string()).collect(),
                })
            }
        }
    }

    let mut out = String::new();
    if include_headers {
        out.push_str(&required.join(&DELIMITER.to_string()));
    }

    let mut rows = 0usize;
    for (idx, line) in lines {
        if include_headers || rows > 0 {
            out.push('\n');
        }
        let tokens: Vec<&str> = line.split(DELIMITER).collect();
        let mut values = Vec::with_capacity(columns.len());
        for (&col, &header) in columns.iter().zip(required) {
            let raw = tokens.get(col).ok_or_else(|| ReformatError::ShortRow {
                line: idx + 1,
                column: col,
                header: header.to_string(),
            })?;
            values.push(strip_quotes(raw));
        }
        out.push_str(&values.join(VALUE_SEPARATOR));
        rows += 1;
    }

    debug!(rows, columns = columns.len(), "reformatted input");
    Ok(out)
}
