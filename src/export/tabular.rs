//! Table writers and the write degrade chain

use std::fs::{self, File};
use std::io::Write;
use std::path::{Path, PathBuf};

use rust_xlsxwriter::{Format, Workbook};
use tracing::{info, warn};

use super::ExportError;

/// UTF-8 byte order mark, so spreadsheet tools detect the encoding
const BOM: &[u8] = b"\xEF\xBB\xBF";

/// Worksheet name used for every exported workbook
pub const SHEET_NAME: &str = "Sheet1";

/// A named table of string cells
#[derive(Debug, Clone, PartialEq)]
pub struct Table {
    /// File stem, without extension
    pub name: String,
    pub headers: Vec<&'static str>,
    pub rows: Vec<Vec<String>>,
}

impl Table {
    pub fn new(name: impl Into<String>, headers: Vec<&'static str>) -> Self {
        Self {
            name: name.into(),
            headers,
            rows: Vec::new(),
        }
    }

    /// Append a row; missing cells are padded with empty strings
    pub fn push(&mut self, mut row: Vec<String>) {
        row.resize(self.headers.len(), String::new());
        self.rows.push(row);
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

/// Which step of the degrade chain produced the file
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WriteTarget {
    Primary,
    Backup,
    Emergency,
}

impl std::fmt::Display for WriteTarget {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Primary => write!(f, "primary"),
            Self::Backup => write!(f, "backup"),
            Self::Emergency => write!(f, "emergency"),
        }
    }
}

/// Outcome of writing one table
#[derive(Debug, Clone, PartialEq)]
pub struct TableOutcome {
    pub name: String,
    pub rows: usize,
    /// Written file and the chain step that produced it; `None` if every step failed
    pub written: Option<(PathBuf, WriteTarget)>,
    /// Errors of the failed steps, in order
    pub errors: Vec<String>,
}

impl TableOutcome {
    pub fn path(&self) -> Option<&Path> {
        self.written.as_ref().map(|(p, _)| p.as_path())
    }

    pub fn is_written(&self) -> bool {
        self.written.is_some()
    }
}

/// Write a table as CSV
pub fn write_csv(table: &Table, path: &Path) -> Result<(), ExportError> {
    let mut file = File::create(path)?;
    file.write_all(BOM)?;
    let mut writer = csv::Writer::from_writer(file);
    writer.write_record(&table.headers)?;
    for row in &table.rows {
        writer.write_record(row)?;
    }
    writer.flush()?;
    Ok(())
}

/// Write a table as a single-sheet workbook with a bold header row
///
/// Empty cells are left blank.
pub fn write_xlsx(table: &Table, path: &Path) -> Result<(), ExportError> {
    let mut workbook = Workbook::new();
    let header = Format::new().set_bold();
    let sheet = workbook.add_worksheet();
    sheet.set_name(SHEET_NAME)?;

    for (col, name) in table.headers.iter().enumerate() {
        sheet.write_string_with_format(0, col as u16, *name, &header)?;
    }
    for (row, cells) in table.rows.iter().enumerate() {
        for (col, value) in cells.iter().enumerate() {
            if !value.is_empty() {
                sheet.write_string(row as u32 + 1, col as u16, value)?;
            }
        }
    }

    workbook.save(path)?;
    Ok(())
}

/// Write `table` into `dir`, falling back from `<name>.xlsx` to
/// `<name>_backup.xlsx` to `<name>_emergency.csv`
///
/// Never fails; the outcome records what was written and what went wrong.
pub fn write_with_fallback(table: &Table, dir: &Path) -> TableOutcome {
    let mut outcome = TableOutcome {
        name: table.name.clone(),
        rows: table.len(),
        written: None,
        errors: Vec::new(),
    };

    if let Err(e) = fs::create_dir_all(dir) {
        warn!(dir = %dir.display(), error = %e, "Could not create export directory");
        outcome.errors.push(format!("{}: {e}", dir.display()));
    }

    let chain: [(PathBuf, WriteTarget); 3] = [
        (dir.join(format!("{}.xlsx", table.name)), WriteTarget::Primary),
        (dir.join(format!("{}_backup.xlsx", table.name)), WriteTarget::Backup),
        (dir.join(format!("{}_emergency.csv", table.name)), WriteTarget::Emergency),
    ];

    for (path, target) in chain {
        let result = match target {
            WriteTarget::Emergency => write_csv(table, &path),
            _ => write_xlsx(table, &path),
        };
        match result {
            Ok(()) => {
                if target == WriteTarget::Primary {
                    info!(table = %table.name, rows = table.len(), path = %path.display(), "Table exported");
                } else {
                    warn!(table = %table.name, path = %path.display(), %target, "Table exported to fallback location");
                }
                outcome.written = Some((path, target));
                return outcome;
            }
            Err(e) => {
                warn!(table = %table.name, path = %path.display(), error = %e, "Table export failed");
                outcome.errors.push(format!("{}: {e}", path.display()));
            }
        }
    }

    outcome
}

#[cfg(test)]
mod tests {
    use super::*;
    use calamine::{Reader, open_workbook_auto};
    use tempfile::TempDir;

    fn table() -> Table {
        let mut t = Table::new("games", vec!["entity", "summary"]);
        t.push(vec!["A".to_string(), "fine, \"quoted\"".to_string()]);
        t.push(vec!["B".to_string()]);
        t
    }

    fn read_sheet(path: &Path) -> Vec<Vec<String>> {
        let mut workbook = open_workbook_auto(path).unwrap();
        let range = workbook.worksheet_range(SHEET_NAME).unwrap();
        range
            .rows()
            .map(|row| row.iter().map(|c| c.to_string()).collect())
            .collect()
    }

    #[test]
    fn test_push_pads_short_rows() {
        assert_eq!(table().rows[1], vec!["B".to_string(), String::new()]);
    }

    #[test]
    fn test_primary_xlsx() {
        let dir = TempDir::new().unwrap();
        let outcome = write_with_fallback(&table(), dir.path());

        let (path, target) = outcome.written.clone().unwrap();
        assert_eq!(target, WriteTarget::Primary);
        assert_eq!(path, dir.path().join("games.xlsx"));
        assert!(outcome.errors.is_empty());

        let rows = read_sheet(&path);
        assert_eq!(rows[0], vec!["entity", "summary"]);
        assert_eq!(rows[1], vec!["A", "fine, \"quoted\""]);
        assert_eq!(rows[2], vec!["B", ""]);
    }

    #[test]
    fn test_falls_back_to_backup() {
        let dir = TempDir::new().unwrap();
        // A directory where the primary file should go makes the create fail
        fs::create_dir(dir.path().join("games.xlsx")).unwrap();

        let outcome = write_with_fallback(&table(), dir.path());
        assert_eq!(outcome.written.as_ref().unwrap().1, WriteTarget::Backup);
        assert_eq!(outcome.errors.len(), 1);
        assert_eq!(read_sheet(&dir.path().join("games_backup.xlsx")).len(), 3);
    }

    #[test]
    fn test_falls_back_to_emergency_csv() {
        let dir = TempDir::new().unwrap();
        fs::create_dir(dir.path().join("games.xlsx")).unwrap();
        fs::create_dir(dir.path().join("games_backup.xlsx")).unwrap();

        let outcome = write_with_fallback(&table(), dir.path());
        let (path, target) = outcome.written.unwrap();
        assert_eq!(target, WriteTarget::Emergency);
        assert_eq!(path, dir.path().join("games_emergency.csv"));

        let bytes = fs::read(&path).unwrap();
        assert!(bytes.starts_with(BOM));
        let mut reader = csv::Reader::from_reader(&bytes[BOM.len()..]);
        let rows: Vec<csv::StringRecord> = reader.records().map(|r| r.unwrap()).collect();
        assert_eq!(&rows[0][1], "fine, \"quoted\"");
        assert_eq!(&rows[1][1], "");
    }

    #[test]
    fn test_all_steps_fail_without_error() {
        let dir = TempDir::new().unwrap();
        let blocker = dir.path().join("not_a_dir");
        fs::write(&blocker, b"x").unwrap();

        let outcome = write_with_fallback(&table(), &blocker);
        assert!(!outcome.is_written());
        assert_eq!(outcome.errors.len(), 4);
    }
}
