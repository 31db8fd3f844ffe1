//! CSV import of class records.

use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::io::Read;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

use crate::error::{AppError, Result};
use crate::models::{ClassForm, ClassRecord, User};
use crate::store::AppStore;

/// Result of an import operation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImportSummary {
    /// Data rows read (header excluded).
    pub rows_read: usize,
    pub imported: usize,
    /// Rows dropped for lacking a name.
    pub skipped: usize,
}

impl ImportSummary {
    /// Get summary message.
    pub fn summary(&self) -> String {
        format!(
            "Read: {}, Imported: {}, Skipped: {}",
            self.rows_read, self.imported, self.skipped
        )
    }
}

/// Lower-case a header cell and drop every space.
fn normalize_header(header: &str) -> String {
    header
        .trim_start_matches('\u{feff}')
        .to_lowercase()
        .chars()
        .filter(|c| *c != ' ')
        .collect()
}

/// Parse class rows from CSV text.
///
/// The first non-empty line holds the headers, matched case- and
/// space-insensitively. Unknown headers are ignored, missing cells become
/// empty strings, and rows without a name are dropped. Returns the parsed
/// classes and the number of data rows read.
pub fn parse_classes_csv<R: Read>(reader: R, now: DateTime<Utc>) -> Result<(Vec<ClassRecord>, usize)> {
    let mut rdr = csv::ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .from_reader(reader);

    let mut records = rdr.records();
    let headers: Vec<String> = match records.next() {
        Some(row) => row?.iter().map(normalize_header).collect(),
        None => return Ok((Vec::new(), 0)),
    };

    let millis = now.timestamp_millis();
    let mut classes = Vec::new();
    let mut rows_read = 0;

    for (index, row) in records.enumerate() {
        let row = row?;
        rows_read += 1;

        // Later duplicate headers overwrite earlier ones.
        let cells: HashMap<&str, &str> = headers
            .iter()
            .enumerate()
            .map(|(col, header)| (header.as_str(), row.get(col).unwrap_or("").trim()))
            .collect();
        let field = |keys: &[&str]| -> String {
            keys.iter()
                .filter_map(|k| cells.get(k).copied())
                .find(|v| !v.is_empty())
                .unwrap_or("")
                .to_string()
        };

        let form = ClassForm {
            name: field(&["name"]),
            subject: field(&["subject"]),
            day: field(&["day"]),
            batch: field(&["batch"]),
            period: field(&["period"]),
            teacher_email: field(&["teacheremail", "teacher_email"]),
            faculty_id: field(&["facultyid", "faculty"]),
            schedule: field(&["schedule"]),
            room: field(&["room"]),
            semester: field(&["semester"]),
        };
        if form.name.is_empty() {
            continue;
        }
        classes.push(ClassRecord::from_form(format!("CSV{millis}{index}"), form));
    }

    Ok((classes, rows_read))
}

/// Parse a CSV file on the blocking pool.
pub async fn read_classes_file(path: &Path) -> Result<(Vec<ClassRecord>, usize)> {
    let path: PathBuf = path.to_path_buf();
    tokio::task::spawn_blocking(move || {
        let file = std::fs::File::open(&path)?;
        parse_classes_csv(file, Utc::now())
    })
    .await?
}

/// Append parsed classes to the roster, renaming any id already in use.
pub fn append_classes(store: &mut AppStore, classes: Vec<ClassRecord>) {
    for mut class in classes {
        let base = class.id.clone();
        let mut suffix = 1;
        while store.find_class(&class.id).is_some() {
            class.id = format!("{base}-{suffix}");
            suffix += 1;
        }
        store.classes.push(class);
    }
}

/// Import classes from a CSV file and append them to the roster in one step.
pub async fn import_file(store: &mut AppStore, actor: &User, path: &Path) -> Result<ImportSummary> {
    if !actor.is_staff() {
        warn!("{} {} tried to import classes", actor.role, actor.id);
        return Err(AppError::denied("only admin or faculty can import classes"));
    }

    info!("Importing classes from {path:?}");
    let (classes, rows_read) = read_classes_file(path).await?;

    let summary = ImportSummary {
        rows_read,
        imported: classes.len(),
        skipped: rows_read - classes.len(),
    };
    append_classes(store, classes);

    info!("CSV import complete: {}", summary.summary());
    Ok(summary)
}
