//! Attendance report: course header plus one row per attendee, exported as `.xlsx`.

use crate::ledger::AttendanceEntry;
use chrono::{NaiveDate, NaiveDateTime};
use rust_xlsxwriter::{Format, Workbook, XlsxError};
use std::path::{Path, PathBuf};
use thiserror::Error;

pub const COLUMNS: [&str; 3] = ["Student Name", "Student ID", "Time of Attendance"];
pub const EXPORT_EXTENSION: &str = "xlsx";

const SHEET_NAME: &str = "Attendance";
const COLUMN_WIDTH: f64 = 28.0;

#[derive(Error, Debug)]
pub enum ReportError {
    #[error("no students captured yet — nothing to export")]
    NothingToExport,
    #[error("spreadsheet: {0}")]
    Xlsx(#[from] XlsxError),
    #[error("io: {0}")]
    Io(#[from] std::io::Error),
}

/// Course the session is taking attendance for. Both fields are non-blank.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Course {
    name: String,
    code: String,
}

impl Course {
    /// `None` if either field is blank.
    pub fn new(name: &str, code: &str) -> Option<Self> {
        let (name, code) = (name.trim(), code.trim());
        if name.is_empty() || code.is_empty() {
            return None;
        }
        Some(Self { name: name.to_string(), code: code.to_string() })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn code(&self) -> &str {
        &self.code
    }
}

/// Table ready for export. The first row carries course metadata.
#[derive(Debug, Clone, PartialEq)]
pub struct AttendanceReport {
    rows: Vec<[String; 3]>,
}

impl AttendanceReport {
    pub fn build(entries: &[AttendanceEntry], course: &Course, date: NaiveDate) -> Result<Self, ReportError> {
        if entries.is_empty() {
            return Err(ReportError::NothingToExport);
        }

        let mut rows = Vec::with_capacity(entries.len() + 1);
        rows.push([
            format!("Course: {}", course.name),
            format!("Code: {}", course.code),
            date.format("%Y-%m-%d").to_string(),
        ]);
        rows.extend(entries.iter().map(|e| {
            [
                e.display_name.clone(),
                e.student_id.clone(),
                e.capture_time.format("%H:%M:%S").to_string(),
            ]
        }));

        Ok(Self { rows })
    }

    /// Data rows below the column header, metadata row first.
    pub fn rows(&self) -> &[[String; 3]] {
        &self.rows
    }

    pub fn student_count(&self) -> usize {
        self.rows.len() - 1
    }

    fn workbook(&self) -> Result<Workbook, XlsxError> {
        let mut workbook = Workbook::new();
        let bold = Format::new().set_bold();
        let sheet = workbook.add_worksheet();
        sheet.set_name(SHEET_NAME)?;

        for (col, title) in COLUMNS.iter().enumerate() {
            let col = col as u16;
            sheet.set_column_width(col, COLUMN_WIDTH)?;
            sheet.write_string_with_format(0, col, *title, &bold)?;
        }
        for (row, cells) in self.rows.iter().enumerate() {
            for (col, cell) in cells.iter().enumerate() {
                sheet.write_string(row as u32 + 1, col as u16, cell.as_str())?;
            }
        }
        Ok(workbook)
    }

    pub fn to_xlsx_bytes(&self) -> Result<Vec<u8>, ReportError> {
        Ok(self.workbook()?.save_to_buffer()?)
    }

    /// Save into `dir` as `attendance_<YYYYMMDD>_<HHMMSS>.xlsx`.
    ///
    /// An existing file is never overwritten; a second export within the
    /// same second gets a `_2`, `_3`, ... suffix.
    pub fn write_xlsx(&self, dir: &Path, now: NaiveDateTime) -> Result<PathBuf, ReportError> {
        std::fs::create_dir_all(dir)?;
        let path = unused_path(dir, &export_file_name(now));
        self.workbook()?.save(&path)?;
        tracing::info!(path = %path.display(), students = self.student_count(), "attendance exported");
        Ok(path)
    }
}

pub fn export_file_name(now: NaiveDateTime) -> String {
    format!("attendance_{}.{EXPORT_EXTENSION}", now.format("%Y%m%d_%H%M%S"))
}

fn unused_path(dir: &Path, file_name: &str) -> PathBuf {
    let first = dir.join(file_name);
    if !first.exists() {
        return first;
    }
    let stem = file_name.trim_end_matches(&format!(".{EXPORT_EXTENSION}"));
    (2..)
        .map(|n| dir.join(format!("{stem}_{n}.{EXPORT_EXTENSION}")))
        .find(|p| !p.exists())
        .unwrap_or(first)
}
