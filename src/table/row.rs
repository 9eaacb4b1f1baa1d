// src/table/row.rs

use super::{Header, Table, TableResult};

/// One record. Values are positional and line up with the owning table's
/// headers; named lookups go through [`RowRef`], which borrows the table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Row {
    values: Vec<String>,
}

impl Row {
    pub(crate) fn new(values: Vec<String>) -> Self {
        Self { values }
    }

    pub fn values(&self) -> &[String] {
        &self.values
    }

    pub(crate) fn insert(&mut self, index: usize, value: String) {
        self.values.insert(index, value);
    }
}

/// A row together with the table it belongs to.
#[derive(Debug, Clone, Copy)]
pub struct RowRef<'a> {
    table: &'a Table,
    row: &'a Row,
}

impl<'a> RowRef<'a> {
    pub(crate) fn new(table: &'a Table, row: &'a Row) -> Self {
        Self { table, row }
    }

    /// Value under `header`, matched case-insensitively.
    pub fn get(&self, header: &str) -> TableResult<&'a str> {
        let idx = self
            .table
            .position(header)
            .ok_or_else(|| self.table.unknown_header(header))?;
        Ok(&self.row.values[idx])
    }

    pub fn values(&self) -> &'a [String] {
        &self.row.values
    }

    pub fn table(&self) -> &'a Table {
        self.table
    }

    pub fn iter(&self) -> impl Iterator<Item = (&'a Header, &'a str)> {
        self.table
            .headers()
            .iter()
            .zip(self.row.values.iter().map(String::as_str))
    }
}
