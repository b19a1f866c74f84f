//! Tabular source loading
//!
//! Reads spreadsheets (first sheet), CSV, JSON (array of objects) and JSON
//! Lines files into a [`SourceTable`]: a header row plus string cells.
//! Empty cells are `None`.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use calamine::{Data, Reader, open_workbook_auto};
use serde_json::Value;
use sha2::{Digest, Sha256};

use super::error::{SourceError, SourceResult};

/// Recognized source formats
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SourceFormat {
    Spreadsheet,
    Csv,
    Json,
    JsonLines,
}

impl SourceFormat {
    /// File extensions accepted as review sources
    pub const EXTENSIONS: [&'static str; 7] =
        ["xlsx", "xlsm", "xls", "csv", "json", "jsonl", "ndjson"];

    /// Detect the format from a path's extension
    pub fn from_path(path: &Path) -> SourceResult<Self> {
        let extension = path
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| e.to_ascii_lowercase())
            .unwrap_or_default();

        match extension.as_str() {
            "xlsx" | "xlsm" | "xls" => Ok(SourceFormat::Spreadsheet),
            "csv" => Ok(SourceFormat::Csv),
            "json" => Ok(SourceFormat::Json),
            "jsonl" | "ndjson" => Ok(SourceFormat::JsonLines),
            _ => Err(SourceError::UnsupportedFormat {
                path: path.to_path_buf(),
                extension,
            }),
        }
    }
}

/// A loaded source file
#[derive(Debug, Clone, PartialEq)]
pub struct SourceTable {
    /// Path the table was loaded from
    pub path: PathBuf,
    /// Column names in file order
    pub headers: Vec<String>,
    /// Rows aligned with `headers`
    pub rows: Vec<Vec<Option<String>>>,
    /// SHA-256 of the raw file bytes, hex encoded
    pub digest: String,
}

impl SourceTable {
    /// Build a table from in-memory rows
    pub fn from_rows(
        path: impl Into<PathBuf>,
        headers: Vec<String>,
        rows: Vec<Vec<Option<String>>>,
    ) -> Self {
        Self {
            path: path.into(),
            headers,
            rows,
            digest: String::new(),
        }
    }

    /// Position of a column, matched after trimming
    pub fn column_index(&self, name: &str) -> Option<usize> {
        let name = name.trim();
        self.headers.iter().position(|h| h.trim() == name)
    }

    /// Number of data rows
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    /// Whether the table has no data rows
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

/// Load a tabular source file
pub fn load_table(path: &Path) -> SourceResult<SourceTable> {
    if !path.exists() {
        return Err(SourceError::FileNotFound(path.to_path_buf()));
    }
    let format = SourceFormat::from_path(path)?;
    let bytes = std::fs::read(path)?;
    let digest = format!("{:x}", Sha256::digest(&bytes));

    let (headers, rows) = match format {
        SourceFormat::Spreadsheet => parse_spreadsheet(path)?,
        SourceFormat::Csv => parse_csv(&bytes)?,
        SourceFormat::Json => parse_json_array(&bytes)?,
        SourceFormat::JsonLines => parse_json_lines(&bytes)?,
    };

    tracing::debug!(
        path = %path.display(),
        columns = headers.len(),
        rows = rows.len(),
        "Loaded source table"
    );

    Ok(SourceTable {
        path: path.to_path_buf(),
        headers,
        rows,
        digest,
    })
}

/// List candidate source files in a directory, sorted by name
pub fn list_sources(dir: &Path) -> SourceResult<Vec<PathBuf>> {
    let mut files = Vec::new();
    for entry in std::fs::read_dir(dir)? {
        let path = entry?.path();
        if path.is_file() && SourceFormat::from_path(&path).is_ok() {
            files.push(path);
        }
    }
    files.sort();
    Ok(files)
}

type Parsed = (Vec<String>, Vec<Vec<Option<String>>>);

/// First worksheet; its first row is the header row
fn parse_spreadsheet(path: &Path) -> SourceResult<Parsed> {
    let mut workbook =
        open_workbook_auto(path).map_err(|e| SourceError::Spreadsheet(e.to_string()))?;
    let range = workbook
        .worksheet_range_at(0)
        .ok_or_else(|| SourceError::Spreadsheet("workbook has no worksheets".to_string()))?
        .map_err(|e| SourceError::Spreadsheet(e.to_string()))?;

    let mut sheet_rows = range.rows();
    let Some(header_row) = sheet_rows.next() else {
        return Ok((Vec::new(), Vec::new()));
    };
    let headers: Vec<String> = header_row
        .iter()
        .map(|c| cell_from_data(c).unwrap_or_default())
        .collect();

    let rows = sheet_rows
        .map(|row| {
            (0..headers.len())
                .map(|i| row.get(i).and_then(cell_from_data))
                .collect()
        })
        .collect();
    Ok((headers, rows))
}

fn cell_from_data(cell: &Data) -> Option<String> {
    match cell {
        Data::Empty => None,
        Data::String(s) => non_empty(s),
        // Whole numbers come back as floats; keep "3" rather than "3.0"
        Data::Float(f) if f.fract() == 0.0 && f.abs() < 1e15 => Some(format!("{}", *f as i64)),
        other => non_empty(&other.to_string()),
    }
}

fn parse_csv(bytes: &[u8]) -> SourceResult<Parsed> {
    let mut reader = csv::ReaderBuilder::new()
        .flexible(true)
        .from_reader(bytes);

    let headers: Vec<String> = reader
        .headers()?
        .iter()
        .map(|h| h.trim_start_matches('\u{feff}').to_string())
        .collect();

    let mut rows = Vec::new();
    for record in reader.records() {
        let record = record?;
        let row = (0..headers.len())
            .map(|i| record.get(i).and_then(non_empty))
            .collect();
        rows.push(row);
    }
    Ok((headers, rows))
}

fn parse_json_array(bytes: &[u8]) -> SourceResult<Parsed> {
    let value: Value =
        serde_json::from_slice(bytes).map_err(|e| SourceError::Json(e.to_string()))?;
    match value {
        Value::Array(items) => objects_to_rows(items),
        _ => Err(SourceError::Json(
            "expected a top-level array of objects".to_string(),
        )),
    }
}

fn parse_json_lines(bytes: &[u8]) -> SourceResult<Parsed> {
    let text = std::str::from_utf8(bytes).map_err(|e| SourceError::Json(e.to_string()))?;
    let mut items = Vec::new();
    for (line_no, line) in text.lines().enumerate() {
        if line.trim().is_empty() {
            continue;
        }
        let value: Value = serde_json::from_str(line)
            .map_err(|e| SourceError::Json(format!("line {}: {}", line_no + 1, e)))?;
        items.push(value);
    }
    objects_to_rows(items)
}

/// Headers are the union of object keys in order of first appearance
fn objects_to_rows(items: Vec<Value>) -> SourceResult<Parsed> {
    let mut headers: Vec<String> = Vec::new();
    let mut index: HashMap<String, usize> = HashMap::new();
    let mut objects = Vec::with_capacity(items.len());

    for (i, item) in items.into_iter().enumerate() {
        let Value::Object(map) = item else {
            return Err(SourceError::Json(format!("record {} is not an object", i + 1)));
        };
        for key in map.keys() {
            if !index.contains_key(key) {
                index.insert(key.clone(), headers.len());
                headers.push(key.clone());
            }
        }
        objects.push(map);
    }

    let rows = objects
        .into_iter()
        .map(|mut map| {
            headers
                .iter()
                .map(|h| map.remove(h).and_then(cell_from_value))
                .collect()
        })
        .collect();

    Ok((headers, rows))
}

fn cell_from_value(value: Value) -> Option<String> {
    match value {
        Value::Null => None,
        Value::String(s) => non_empty(&s),
        other => Some(other.to_string()),
    }
}

fn non_empty(s: &str) -> Option<String> {
    if s.is_empty() {
        None
    } else {
        Some(s.to_string())
    }
}
