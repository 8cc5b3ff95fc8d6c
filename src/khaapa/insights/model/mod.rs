use std::fmt;

use serde::{Deserialize, Serialize};

/// Identifier assigned to a folder by the spreadsheet source.
pub type FolderId = String;

/// Represents a single scalar cell value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "value")]
pub enum CellValue {
    /// Plain text literal.
    Text(String),
    /// Floating point number literal.
    Number(f64),
    /// Missing cell, either absent in the source or padded during normalization.
    Null,
}

impl CellValue {
    /// Returns `true` for padded or absent cells.
    pub fn is_null(&self) -> bool {
        matches!(self, CellValue::Null)
    }

    /// Coerces the cell into a number. Text is trimmed and parsed; anything
    /// that does not parse yields `None`.
    pub fn as_number(&self) -> Option<f64> {
        match self {
            CellValue::Number(value) if value.is_finite() => Some(*value),
            CellValue::Text(value) => value
                .trim()
                .parse::<f64>()
                .ok()
                .filter(|parsed| parsed.is_finite()),
            _ => None,
        }
    }

    /// Converts a JSON cell from an API payload into a scalar.
    pub fn from_json(value: &serde_json::Value) -> Self {
        match value {
            serde_json::Value::Null => CellValue::Null,
            serde_json::Value::String(text) => CellValue::Text(text.clone()),
            serde_json::Value::Number(number) => number
                .as_f64()
                .map(CellValue::Number)
                .unwrap_or_else(|| CellValue::Text(number.to_string())),
            serde_json::Value::Bool(flag) => CellValue::Text(flag.to_string()),
            other => CellValue::Text(other.to_string()),
        }
    }
}

impl fmt::Display for CellValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CellValue::Text(value) => f.write_str(value),
            CellValue::Number(value) => write!(f, "{value}"),
            CellValue::Null => Ok(()),
        }
    }
}

/// A row exactly as the source returned it. Lengths vary freely between rows.
pub type RawRow = Vec<CellValue>;

/// Reference to a spreadsheet file discovered inside a folder.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileRef {
    /// Source-side identifier (a Drive file id, or a path for local sources).
    pub id: String,
    /// Human-readable file name.
    pub name: String,
}

impl FileRef {
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
        }
    }

    /// Name used to tag tables read from this file. Never empty.
    pub fn display_name(&self) -> &str {
        if !self.name.trim().is_empty() {
            &self.name
        } else if !self.id.trim().is_empty() {
            &self.id
        } else {
            "(untitled)"
        }
    }
}

/// A normalized table read from one spreadsheet file.
///
/// Every row holds exactly `columns.len()` cells, positionally aligned with
/// `columns`. Duplicate header names are kept; lookups by name resolve to the
/// first matching position.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Table {
    /// Name of the originating file.
    pub source_name: String,
    /// Header names in sheet order.
    pub columns: Vec<String>,
    /// Records in sheet order.
    pub rows: Vec<Vec<CellValue>>,
}

impl Table {
    /// Position of the first column whose header equals `name` exactly.
    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|column| column == name)
    }

    /// Iterates over the cells of the named column, if it exists.
    pub fn column_values<'a>(&'a self, name: &str) -> Option<impl Iterator<Item = &'a CellValue>> {
        let index = self.column_index(name)?;
        Some(self.rows.iter().filter_map(move |row| row.get(index)))
    }

    pub fn row_count(&self) -> usize {
        self.rows.len()
    }
}

/// Ordered set of tables produced by one load pass, in listing order.
pub type TableCollection = Vec<Table>;

/// A file the loader could not read, with the reason reported by the source.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SkippedFile {
    pub name: String,
    pub reason: String,
}

/// Outcome of one load pass: the tables that were read and the files that were skipped.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LoadReport {
    pub tables: TableCollection,
    pub skipped: Vec<SkippedFile>,
    /// `false` when the configured folder does not exist at the source.
    pub folder_found: bool,
}

impl LoadReport {
    /// Report for a folder that could not be found.
    pub fn folder_missing() -> Self {
        Self::default()
    }

    /// Warning lines for every skipped file, suitable for appending to tool output.
    pub fn warnings(&self) -> Vec<String> {
        self.skipped
            .iter()
            .map(|skipped| format!("⚠ Skipped {}: {}", skipped.name, skipped.reason))
            .collect()
    }
}
