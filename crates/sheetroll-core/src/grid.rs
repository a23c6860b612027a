//! Row-major cell grids as returned by a values read.

use std::collections::BTreeMap;

use serde::Serialize;
use serde_json::Value as JsonValue;

use crate::columns::column_index;

/// Where a fetched grid came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum GridSource {
    /// Read from the spreadsheet.
    Remote,
    /// Substituted from the built-in sample data after a failed read.
    Sample,
}

/// An ordered sequence of rows of cell strings. Row 0 is the header row.
///
/// Data rows shorter than the header are padded with empty strings on
/// construction, so every data row is at least as wide as the header.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct SheetGrid {
    rows: Vec<Vec<String>>,
}

impl SheetGrid {
    pub fn new(mut rows: Vec<Vec<String>>) -> Self {
        let width = rows.first().map_or(0, Vec::len);
        for row in rows.iter_mut().skip(1) {
            if row.len() < width {
                row.resize(width, String::new());
            }
        }
        Self { rows }
    }

    /// Builds a grid from the raw JSON cells of a values response.
    pub fn from_values(values: Vec<Vec<JsonValue>>) -> Self {
        Self::new(
            values
                .into_iter()
                .map(|row| row.into_iter().map(cell_to_string).collect())
                .collect(),
        )
    }

    /// Builds a grid from anything string-like, mostly useful for fixtures.
    pub fn from_rows<R, C>(rows: impl IntoIterator<Item = R>) -> Self
    where
        R: IntoIterator<Item = C>,
        C: Into<String>,
    {
        Self::new(
            rows.into_iter()
                .map(|row| row.into_iter().map(Into::into).collect())
                .collect(),
        )
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Number of rows including the header.
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn rows(&self) -> &[Vec<String>] {
        &self.rows
    }

    /// The header row, or an empty slice for an empty grid.
    pub fn header(&self) -> &[String] {
        self.rows.first().map(Vec::as_slice).unwrap_or(&[])
    }

    /// Every row after the header.
    pub fn data_rows(&self) -> &[Vec<String>] {
        self.rows.get(1..).unwrap_or(&[])
    }

    /// Cell text, empty when the row or column is out of range.
    pub fn cell(&self, row: usize, column: usize) -> &str {
        self.rows
            .get(row)
            .and_then(|r| r.get(column))
            .map_or("", String::as_str)
    }

    /// Column named by its header text (case-insensitive) or, failing that,
    /// by its A1 letter.
    pub fn find_column(&self, name: &str) -> Option<usize> {
        let wanted = name.trim();
        self.header()
            .iter()
            .position(|h| h.trim().eq_ignore_ascii_case(wanted))
            .or_else(|| column_index(&wanted.to_ascii_uppercase()))
    }

    /// Distinct non-empty values of a data column, sorted.
    pub fn unique_column_values(&self, column: usize) -> Vec<String> {
        let mut values: Vec<String> = self
            .data_rows()
            .iter()
            .filter_map(|row| row.get(column))
            .filter(|value| !value.is_empty())
            .cloned()
            .collect();
        values.sort();
        values.dedup();
        values
    }

    /// Data rows passing every column filter.
    pub fn filter_rows(&self, filters: &ColumnFilters) -> Vec<&[String]> {
        self.data_rows()
            .iter()
            .filter(|row| filters.matches(row))
            .map(Vec::as_slice)
            .collect()
    }
}

/// Per-column value filters for tabular views.
///
/// A row passes when, for every column with a non-empty selection, its cell is
/// one of the selected values.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ColumnFilters {
    selected: BTreeMap<usize, Vec<String>>,
}

impl ColumnFilters {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn select(&mut self, column: usize, value: impl Into<String>) {
        let values = self.selected.entry(column).or_default();
        let value = value.into();
        if !values.contains(&value) {
            values.push(value);
        }
    }

    pub fn is_empty(&self) -> bool {
        self.selected.is_empty()
    }

    pub fn matches(&self, row: &[String]) -> bool {
        self.selected.iter().all(|(column, values)| {
            values.is_empty() || row.get(*column).is_some_and(|cell| values.contains(cell))
        })
    }
}

fn cell_to_string(cell: JsonValue) -> String {
    match cell {
        JsonValue::String(s) => s,
        JsonValue::Null => String::new(),
        JsonValue::Bool(true) => "TRUE".to_string(),
        JsonValue::Bool(false) => "FALSE".to_string(),
        JsonValue::Number(n) => {
            if let Some(i) = n.as_i64() {
                i.to_string()
            } else if let Some(u) = n.as_u64() {
                u.to_string()
            } else {
                match n.as_f64() {
                    Some(f) if f.fract() == 0.0 && f.abs() < 1e15 => format!("{f:.0}"),
                    _ => n.to_string(),
                }
            }
        }
        other => other.to_string(),
    }
}
