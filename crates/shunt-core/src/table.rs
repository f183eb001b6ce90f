use crate::error::{Result, ShuntError};
use crate::io::atomic_write;
use crate::status::{Permission, RowStatus, TaskStatus};
use std::path::Path;

// ---------------------------------------------------------------------------
// Column constants
// ---------------------------------------------------------------------------

pub const PROJECT_COL: &str = "project";
pub const ROW_STATUS_COL: &str = "row_overall_status";
pub const PERMISSION_COL: &str = "next_row_permission";
pub const NOTES_COL: &str = "notes";

/// Name of the optional timestamp companion for a task column.
pub fn completed_at_column(task: &str) -> String {
    format!("{task}_completed_at")
}

// ---------------------------------------------------------------------------
// Table
// ---------------------------------------------------------------------------

/// The project table: a header of named columns plus ordered data rows.
/// Row order is semantically significant — it defines which row comes
/// "next after the last DONE". The table file is the sole source of truth;
/// every mutation is a full read-modify-write of the whole table.
#[derive(Debug, Clone, PartialEq)]
pub struct Table {
    pub columns: Vec<String>,
    pub rows: Vec<Vec<String>>,
}

impl Table {
    // -----------------------------------------------------------------------
    // Persistence
    // -----------------------------------------------------------------------

    /// Load the table, padding short rows with empty strings per missing
    /// column. Malformed input degrades to best-effort column alignment —
    /// it never errors.
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Err(ShuntError::TableNotFound(path.display().to_string()));
        }
        let data = std::fs::read_to_string(path)?;
        let mut records = parse_records(&data);
        if records.is_empty() {
            return Ok(Table {
                columns: Vec::new(),
                rows: Vec::new(),
            });
        }
        let columns = records.remove(0);
        let width = columns.len();
        for row in &mut records {
            row.resize(width, String::new());
        }
        Ok(Table {
            columns,
            rows: records,
        })
    }

    /// Serialize and overwrite the whole table file.
    pub fn save(&self, path: &Path) -> Result<()> {
        let mut out = String::new();
        write_record(&mut out, &self.columns);
        for row in &self.rows {
            write_record(&mut out, row);
        }
        atomic_write(path, out.as_bytes())
    }

    // -----------------------------------------------------------------------
    // Cell access
    // -----------------------------------------------------------------------

    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c == name)
    }

    pub fn require_column(&self, name: &str) -> Result<usize> {
        self.column_index(name)
            .ok_or_else(|| ShuntError::MissingColumn(name.to_string()))
    }

    /// Cell value by column name; empty string if the column is absent.
    pub fn get(&self, row: usize, column: &str) -> &str {
        self.column_index(column)
            .and_then(|c| self.rows.get(row).map(|r| r[c].as_str()))
            .unwrap_or("")
    }

    pub fn set(&mut self, row: usize, column: &str, value: &str) -> Result<()> {
        let c = self.require_column(column)?;
        self.rows[row][c] = value.to_string();
        Ok(())
    }

    /// Write a value into a column only if the column exists. Returns true
    /// if a write happened.
    pub fn set_if_present(&mut self, row: usize, column: &str, value: &str) -> bool {
        match self.column_index(column) {
            Some(c) => {
                self.rows[row][c] = value.to_string();
                true
            }
            None => false,
        }
    }

    pub fn find_project(&self, project: &str) -> Option<usize> {
        let c = self.column_index(PROJECT_COL)?;
        self.rows.iter().position(|r| r[c] == project)
    }

    // -----------------------------------------------------------------------
    // Typed accessors
    // -----------------------------------------------------------------------

    pub fn row_status(&self, row: usize) -> RowStatus {
        RowStatus::parse(self.get(row, ROW_STATUS_COL))
    }

    pub fn permission(&self, row: usize) -> Permission {
        Permission::parse(self.get(row, PERMISSION_COL))
    }

    pub fn task_status(&self, row: usize, task: &str) -> TaskStatus {
        TaskStatus::parse(self.get(row, task))
    }
}

// ---------------------------------------------------------------------------
// Record parsing / serialization (RFC4180-style quoting)
// ---------------------------------------------------------------------------

/// Parse delimiter-separated records. Fields containing the delimiter, the
/// quote character, or a newline are expected to be quoted; embedded quotes
/// are doubled. An unterminated quote consumes to end of input rather than
/// failing — best-effort alignment over corruption detection.
fn parse_records(input: &str) -> Vec<Vec<String>> {
    let mut records = Vec::new();
    let mut record: Vec<String> = Vec::new();
    let mut field = String::new();
    let mut in_quotes = false;
    let mut chars = input.chars().peekable();

    while let Some(c) = chars.next() {
        if in_quotes {
            if c == '"' {
                if chars.peek() == Some(&'"') {
                    chars.next();
                    field.push('"');
                } else {
                    in_quotes = false;
                }
            } else {
                field.push(c);
            }
            continue;
        }
        match c {
            '"' => in_quotes = true,
            ',' => record.push(std::mem::take(&mut field)),
            '\r' => {
                if chars.peek() == Some(&'\n') {
                    chars.next();
                }
                record.push(std::mem::take(&mut field));
                records.push(std::mem::take(&mut record));
            }
            '\n' => {
                record.push(std::mem::take(&mut field));
                records.push(std::mem::take(&mut record));
            }
            _ => field.push(c),
        }
    }
    if !field.is_empty() || !record.is_empty() {
        record.push(field);
        records.push(record);
    }

    // A blank line parses as a single empty field; drop those rather than
    // producing phantom one-column rows.
    records.retain(|r| !(r.len() == 1 && r[0].is_empty()));
    records
}

fn write_record(out: &mut String, fields: &[String]) {
    for (i, field) in fields.iter().enumerate() {
        if i > 0 {
            out.push(',');
        }
        write_field(out, field);
    }
    out.push('\n');
}

fn write_field(out: &mut String, field: &str) {
    let needs_quoting = field.contains([',', '"', '\n', '\r']);
    if !needs_quoting {
        out.push_str(field);
        return;
    }
    out.push('"');
    for c in field.chars() {
        if c == '"' {
            out.push('"');
        }
        out.push(c);
    }
    out.push('"');
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
