// src/extract/mod.rs

use crate::driver::Element;
use crate::table::{Table, TableResult};
use once_cell::sync::Lazy;
use regex::Regex;
use scraper::{ElementRef, Html, Selector};
use tracing::trace;

static WHITESPACE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s+").expect("whitespace regex"));

/// Cell text captured from a rendered table, row by row.
pub type Grid = Vec<Vec<String>>;

/// Read the rows of the first (outermost) `<table>` in `html` into a grid.
/// Only the table's own rows count, including those inside
/// `thead`/`tbody`/`tfoot`; rows of nested tables do not. A row's cells are
/// its own `<th>`/`<td>` children; rows without cells are dropped. Cell text
/// has its whitespace collapsed.
pub fn grid_from_html(html: &str) -> Grid {
    let doc = Html::parse_fragment(html);
    let tables = Selector::parse("table").expect("table selector");
    let Some(table) = doc.select(&tables).next() else {
        return Vec::new();
    };

    own_rows(table)
        .map(|tr| {
            tr.children()
                .filter_map(ElementRef::wrap)
                .filter(|c| matches!(c.value().name(), "td" | "th"))
                .map(cell_text)
                .collect::<Vec<_>>()
        })
        .filter(|cells| !cells.is_empty())
        .collect()
}

fn own_rows<'a>(table: ElementRef<'a>) -> impl Iterator<Item = ElementRef<'a>> + 'a {
    table
        .children()
        .filter_map(ElementRef::wrap)
        .flat_map(|child| match child.value().name() {
            "tr" => vec![child],
            "thead" | "tbody" | "tfoot" => child
                .children()
                .filter_map(ElementRef::wrap)
                .filter(|e| e.value().name() == "tr")
                .collect(),
            _ => Vec::new(),
        })
}

fn cell_text(cell: ElementRef<'_>) -> String {
    let raw: String = cell.text().collect();
    WHITESPACE.replace_all(&raw, " ").trim().to_string()
}

/// Turn a grid into a table. The first grid row names the columns unless
/// `headers` is given, in which case every grid row is data.
pub fn extract(grid: &[Vec<String>], headers: Option<&[&str]>) -> TableResult<Table> {
    let mut rows = grid.iter();
    let mut table = match headers {
        Some(names) => Table::new(names.iter().copied())?,
        None => match rows.next() {
            Some(first) => Table::new(first.iter().cloned())?,
            None => return Ok(Table::default()),
        },
    };
    for row in rows {
        table.push_row(row.iter().cloned())?;
    }
    trace!(rows = table.len(), cols = table.width(), "extracted table");
    Ok(table)
}

pub fn extract_html(html: &str, headers: Option<&[&str]>) -> TableResult<Table> {
    extract(&grid_from_html(html), headers)
}

/// Extract from an element located on the current page, normally a `<table>`.
pub fn extract_element(element: &Element, headers: Option<&[&str]>) -> TableResult<Table> {
    extract_html(&element.html, headers)
}
