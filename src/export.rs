//! Excel export functionality.

use chrono::{Local, NaiveDate};
use rust_xlsxwriter::{Color, Format, FormatBorder, Workbook, Worksheet, XlsxError};
use std::path::{Path, PathBuf};
use tracing::info;

use crate::error::Result;
use crate::models::{ClassRecord, ClassSession, Faculty};
use crate::store::AppStore;

/// Sheet names of the two workbooks.
pub const CLASS_SHEET: &str = "Classes";
pub const SESSION_SHEET: &str = "Sessions";

/// Column headers of the "Classes" sheet.
pub const CLASS_HEADERS: [&str; 12] = [
    "Class ID",
    "Class Name",
    "Subject",
    "Day",
    "Batch",
    "Period",
    "Teacher Email",
    "Faculty",
    "Schedule",
    "Room",
    "Semester",
    "Student Count",
];

/// Column headers of the "Sessions" sheet.
pub const SESSION_HEADERS: [&str; 7] = [
    "Session ID",
    "Class ID",
    "Class Name",
    "Date",
    "Start Time",
    "End Time",
    "Attendees",
];

/// Faculty name written when a class has no matching faculty entry.
pub const UNASSIGNED: &str = "Unassigned";

/// One row of the "Classes" sheet.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClassExportRow {
    /// Text cells in `CLASS_HEADERS` order, excluding the count.
    pub cells: [String; 11],
    pub student_count: usize,
}

/// Project the roster into export rows, joined with faculty names.
pub fn class_rows(classes: &[ClassRecord], faculty: &[Faculty]) -> Vec<ClassExportRow> {
    classes
        .iter()
        .map(|cls| {
            let faculty_name = faculty
                .iter()
                .find(|f| f.id == cls.faculty_id)
                .map(|f| f.name.clone())
                .unwrap_or_else(|| UNASSIGNED.to_string());
            ClassExportRow {
                cells: [
                    cls.id.clone(),
                    cls.name.clone(),
                    cls.subject.clone(),
                    cls.day.clone(),
                    cls.batch.clone(),
                    cls.period.clone(),
                    cls.teacher_email.clone(),
                    faculty_name,
                    cls.schedule.clone(),
                    cls.room.clone(),
                    cls.semester.clone(),
                ],
                student_count: cls.student_count(),
            }
        })
        .collect()
}

fn header_format() -> Format {
    Format::new()
        .set_bold()
        .set_background_color(Color::RGB(0x4472C4))
        .set_font_color(Color::White)
        .set_border(FormatBorder::Thin)
}

fn write_headers(worksheet: &mut Worksheet, headers: &[&str]) -> std::result::Result<(), XlsxError> {
    let format = header_format();
    for (col, header) in headers.iter().enumerate() {
        worksheet.write_string_with_format(0, col as u16, *header, &format)?;
    }
    Ok(())
}

/// Finish a sheet: autofilter over the data and a frozen header row.
fn finish_sheet(worksheet: &mut Worksheet, rows: usize, last_col: u16) -> std::result::Result<(), XlsxError> {
    if rows > 0 {
        worksheet.autofilter(0, 0, rows as u32, last_col)?;
    }
    worksheet.set_freeze_panes(1, 0)?;
    Ok(())
}

/// Export the class roster to an Excel file.
pub fn export_classes_to_excel(
    classes: &[ClassRecord],
    faculty: &[Faculty],
    path: &Path,
) -> std::result::Result<(), XlsxError> {
    let mut workbook = Workbook::new();
    let worksheet = workbook.add_worksheet();

    worksheet.set_name(CLASS_SHEET)?;
    write_headers(worksheet, &CLASS_HEADERS)?;

    // Column widths
    let widths = [18, 25, 20, 12, 8, 8, 28, 25, 20, 10, 10, 14];
    for (col, width) in widths.into_iter().enumerate() {
        worksheet.set_column_width(col as u16, width)?;
    }

    let rows = class_rows(classes, faculty);
    for (idx, record) in rows.iter().enumerate() {
        let row = (idx + 1) as u32;
        for (col, cell) in record.cells.iter().enumerate() {
            worksheet.write_string(row, col as u16, cell)?;
        }
        worksheet.write_number(row, 11, record.student_count as f64)?;
    }

    finish_sheet(worksheet, rows.len(), 11)?;

    workbook.save(path)?;
    Ok(())
}

/// Export archived sessions to an Excel file.
/// Times are written in local time.
pub fn export_sessions_to_excel(
    sessions: &[ClassSession],
    classes: &[ClassRecord],
    path: &Path,
) -> std::result::Result<(), XlsxError> {
    let mut workbook = Workbook::new();
    let worksheet = workbook.add_worksheet();

    worksheet.set_name(SESSION_SHEET)?;
    write_headers(worksheet, &SESSION_HEADERS)?;

    worksheet.set_column_width(0, 22)?; // Session ID
    worksheet.set_column_width(1, 18)?; // Class ID
    worksheet.set_column_width(2, 25)?; // Class Name
    worksheet.set_column_width(3, 12)?; // Date
    worksheet.set_column_width(4, 10)?; // Start Time
    worksheet.set_column_width(5, 10)?; // End Time
    worksheet.set_column_width(6, 10)?; // Attendees

    for (idx, session) in sessions.iter().enumerate() {
        let row = (idx + 1) as u32;
        let class_name = classes
            .iter()
            .find(|c| c.id == session.class_id)
            .map(|c| c.name.as_str())
            .unwrap_or("");

        worksheet.write_string(row, 0, &session.id)?;
        worksheet.write_string(row, 1, &session.class_id)?;
        worksheet.write_string(row, 2, class_name)?;
        worksheet.write_string(row, 3, session.date.to_string())?;
        worksheet.write_string(
            row,
            4,
            session.start_time.with_timezone(&Local).format("%H:%M:%S").to_string(),
        )?;
        let end = session
            .end_time
            .map(|t| t.with_timezone(&Local).format("%H:%M:%S").to_string())
            .unwrap_or_default();
        worksheet.write_string(row, 5, end)?;
        worksheet.write_number(row, 6, session.attendees.len() as f64)?;
    }

    finish_sheet(worksheet, sessions.len(), 6)?;

    workbook.save(path)?;
    Ok(())
}

/// Generate default filename for export, e.g. `classes_2025-03-10.xlsx`.
pub fn generate_export_filename(prefix: &str, date: NaiveDate) -> String {
    format!("{prefix}_{date}.xlsx", date = date.format("%Y-%m-%d"))
}

/// Write the roster to `<dir>/classes_<today>.xlsx` and return the path.
pub fn export_classes(store: &AppStore, dir: &Path) -> Result<PathBuf> {
    let path = dir.join(generate_export_filename("classes", Local::now().date_naive()));
    export_classes_to_excel(&store.classes, &store.faculty, &path)?;
    info!("Exported {} classes to {path:?}", store.classes.len());
    Ok(path)
}

/// Write archived sessions to `<dir>/sessions_<today>.xlsx` and return the path.
pub fn export_sessions(store: &AppStore, dir: &Path) -> Result<PathBuf> {
    let path = dir.join(generate_export_filename("sessions", Local::now().date_naive()));
    export_sessions_to_excel(&store.session_history, &store.classes, &path)?;
    info!("Exported {} sessions to {path:?}", store.session_history.len());
    Ok(path)
}
