// src/table/mod.rs

pub mod error;
pub mod header;
pub mod row;

pub use error::{TableError, TableResult};
pub use header::Header;
pub use row::{Row, RowRef};

use std::fmt;

pub const DELIMITER: char = ',';

/// Remove every single and double quote character.
pub fn strip_quotes(raw: &str) -> String {
    raw.chars().filter(|c| *c != '"' && *c != '\'').collect()
}

/// Ordered headers plus ordered rows.
///
/// Header order is the column order on output, row order is append order.
/// Every row holds exactly one value per header.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Table {
    headers: Vec<Header>,
    rows: Vec<Row>,
}

impl Table {
    /// An empty table with the given headers.
    pub fn new<I, S>(headers: I) -> TableResult<Self>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut table = Table::default();
        for name in headers {
            table.add_header(Header::new(name))?;
        }
        Ok(table)
    }

    /// Parse comma-separated text: the first non-blank line holds the
    /// headers, every following line is one row.
    ///
    /// Blank lines are skipped, except under a single header where a blank
    /// line is a row holding one empty value (that is how [`Table::to_text`]
    /// writes it). Tokens are trimmed and quote characters are dropped from
    /// values. There is no escaping, so values cannot contain commas.
    pub fn parse(text: &str) -> TableResult<Self> {
        let mut lines = text.lines().enumerate();

        let Some((_, header_line)) = lines.find(|(_, line)| !line.trim().is_empty()) else {
            return Ok(Table::default());
        };
        let mut table = Table::new(header_line.split(DELIMITER).map(str::trim))?;
        let keep_blank = table.width() == 1;

        for (idx, line) in lines {
            if line.trim().is_empty() && !keep_blank {
                continue;
            }
            let values: Vec<String> = line
                .split(DELIMITER)
                .map(|v| strip_quotes(v).trim().to_string())
                .collect();
            table.push_values(idx + 1, values)?;
        }
        Ok(table)
    }

    /// Inverse of [`Table::parse`]: header line, then one line per row.
    pub fn to_text(&self) -> String {
        let mut out = String::new();
        let sep = DELIMITER.to_string();
        let header_line: Vec<&str> = self.headers.iter().map(Header::as_str).collect();
        out.push_str(&header_line.join(&sep));
        out.push('\n');
        for row in &self.rows {
            out.push_str(&row.values().join(&sep));
            out.push('\n');
        }
        out
    }

    pub fn headers(&self) -> &[Header] {
        &self.headers
    }

    pub fn header_names(&self) -> Vec<String> {
        self.headers.iter().map(|h| h.as_str().to_string()).collect()
    }

    pub fn width(&self) -> usize {
        self.headers.len()
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Column index of `header`, ignoring case.
    pub fn position(&self, header: &str) -> Option<usize> {
        self.headers.iter().position(|h| h.matches(header))
    }

    pub fn has_header(&self, header: &str) -> bool {
        self.position(header).is_some()
    }

    pub fn row(&self, index: usize) -> Option<RowRef<'_>> {
        self.rows.get(index).map(|r| RowRef::new(self, r))
    }

    pub fn rows(&self) -> impl Iterator<Item = RowRef<'_>> {
        self.rows.iter().map(move |r| RowRef::new(self, r))
    }

    /// Append one row; it must be exactly as wide as the header list.
    pub fn push_row<I, S>(&mut self, values: I) -> TableResult<()>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let values = values.into_iter().map(Into::into).collect();
        self.push_values(self.rows.len() + 1, values)
    }

    /// A new table holding exactly `headers`, in that order, looked up by name.
    pub fn project(&self, headers: &[&str]) -> TableResult<Table> {
        let positions = headers
            .iter()
            .map(|h| self.position(h).ok_or_else(|| self.unknown_header(h)))
            .collect::<TableResult<Vec<_>>>()?;

        let mut out = Table::new(headers.iter().copied())?;
        out.rows = self
            .rows
            .iter()
            .map(|r| Row::new(positions.iter().map(|&i| r.values()[i].clone()).collect()))
            .collect();
        Ok(out)
    }

    /// Rows of `self` followed by rows of `other`. Both tables must have the
    /// same header set; column order may differ and follows `self`.
    pub fn concat(&self, other: &Table) -> TableResult<Table> {
        let mut out = self.clone();
        out.append(other)?;
        Ok(out)
    }

    /// In-place form of [`Table::concat`].
    pub fn append(&mut self, other: &Table) -> TableResult<()> {
        if !self.same_header_set(other) {
            return Err(TableError::HeaderMismatch {
                left: self.header_names(),
                right: other.header_names(),
            });
        }
        let positions: Vec<usize> = self
            .headers
            .iter()
            .filter_map(|h| other.headers.iter().position(|o| o == h))
            .collect();
        for row in &other.rows {
            let values = positions.iter().map(|&i| row.values()[i].clone()).collect();
            self.rows.push(Row::new(values));
        }
        Ok(())
    }

    /// True if both tables name the same columns, in any order.
    pub fn same_header_set(&self, other: &Table) -> bool {
        self.headers.len() == other.headers.len()
            && self.headers.iter().all(|h| other.headers.contains(h))
    }

    /// Insert a column at `index` (clamped to the width) holding `value` in
    /// every row.
    pub fn insert_column(&mut self, index: usize, header: &str, value: &str) -> TableResult<()> {
        let header = Header::new(header);
        if self.headers.contains(&header) {
            return Err(TableError::DuplicateHeader(header.to_string()));
        }
        let index = index.min(self.headers.len());
        self.headers.insert(index, header);
        for row in &mut self.rows {
            row.insert(index, value.to_string());
        }
        Ok(())
    }

    fn add_header(&mut self, header: Header) -> TableResult<()> {
        if self.headers.contains(&header) {
            return Err(TableError::DuplicateHeader(header.to_string()));
        }
        self.headers.push(header);
        Ok(())
    }

    fn push_values(&mut self, row: usize, values: Vec<String>) -> TableResult<()> {
        if values.len() != self.headers.len() {
            return Err(TableError::RowWidth {
                row,
                expected: self.headers.len(),
                found: values.len(),
            });
        }
        self.rows.push(Row::new(values));
        Ok(())
    }

    pub(crate) fn unknown_header(&self, header: &str) -> TableError {
        TableError::UnknownHeader {
            header: header.to_string(),
            available: self.header_names(),
        }
    }
}

impl fmt::Display for Table {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_text())
    }
}
