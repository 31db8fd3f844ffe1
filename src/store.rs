//! Application data store.
//!
//! Owns every collection the services read and mutate: the class roster,
//! the faculty directory, active sessions keyed by class, archived sessions,
//! and the dark-mode flag. Persisted as a single JSON document.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;
use tracing::{debug, info};

use crate::error::Result;
use crate::models::{ClassRecord, ClassSession, Faculty};

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct AppStore {
    pub classes: Vec<ClassRecord>,
    pub faculty: Vec<Faculty>,
    /// At most one active session per class.
    pub active_sessions: BTreeMap<String, ClassSession>,
    /// Ended sessions, oldest first.
    pub session_history: Vec<ClassSession>,
    pub dark_mode: bool,
}

impl AppStore {
    /// Load the store from `path`, starting empty when the file does not exist.
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            debug!("State file {path:?} missing, starting with an empty store");
            return Ok(Self::default());
        }
        let content = std::fs::read_to_string(path)?;
        let store: AppStore = serde_json::from_str(&content)?;
        info!(
            "Loaded state: {} classes, {} active sessions, {} archived sessions",
            store.classes.len(),
            store.active_sessions.len(),
            store.session_history.len()
        );
        Ok(store)
    }

    /// Write the whole store to `path`, replacing any previous contents.
    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }
        let tmp = path.with_extension("json.tmp");
        std::fs::write(&tmp, serde_json::to_string_pretty(self)?)?;
        std::fs::rename(&tmp, path)?;
        Ok(())
    }

    pub fn find_class(&self, id: &str) -> Option<&ClassRecord> {
        self.classes.iter().find(|c| c.id == id)
    }

    pub fn find_class_mut(&mut self, id: &str) -> Option<&mut ClassRecord> {
        self.classes.iter_mut().find(|c| c.id == id)
    }

    pub fn faculty_name(&self, id: &str) -> Option<&str> {
        self.faculty.iter().find(|f| f.id == id).map(|f| f.name.as_str())
    }

    /// Add or replace a faculty directory entry by id.
    pub fn upsert_faculty(&mut self, entry: Faculty) {
        match self.faculty.iter_mut().find(|f| f.id == entry.id) {
            Some(existing) => *existing = entry,
            None => self.faculty.push(entry),
        }
    }

    pub fn active_session(&self, class_id: &str) -> Option<&ClassSession> {
        self.active_sessions.get(class_id)
    }

    /// Flip the dark-mode flag and return the new value.
    pub fn toggle_dark_mode(&mut self) -> bool {
        self.dark_mode = !self.dark_mode;
        self.dark_mode
    }

    /// Generate `<prefix><ms>` that no class uses yet.
    pub fn next_class_id(&self, prefix: &str, now: DateTime<Utc>) -> String {
        let mut millis = now.timestamp_millis();
        loop {
            let id = format!("{prefix}{millis}");
            if self.find_class(&id).is_none() {
                return id;
            }
            millis += 1;
        }
    }

    /// Generate `session_<ms>` that no active or archived session uses yet.
    pub fn next_session_id(&self, now: DateTime<Utc>) -> String {
        let mut millis = now.timestamp_millis();
        loop {
            let id = format!("session_{millis}");
            let taken = self.active_sessions.values().any(|s| s.id == id)
                || self.session_history.iter().any(|s| s.id == id);
            if !taken {
                return id;
            }
            millis += 1;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::ClassForm;
    use chrono::TimeZone;

    fn class(id: &str) -> ClassRecord {
        ClassRecord::from_form(
            id,
            ClassForm {
                name: format!("Class {id}"),
                ..Default::default()
            },
        )
    }

    #[test]
    fn test_load_missing_file_is_empty() {
        let dir = tempfile::tempdir().unwrap();
        let store = AppStore::load(&dir.path().join("state.json")).unwrap();
        assert_eq!(store, AppStore::default());
    }

    #[test]
    fn test_save_and_reload() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("data").join("state.json");

        let mut store = AppStore::default();
        store.classes.push(class("CLS1"));
        store.upsert_faculty(Faculty {
            id: "F1".to_string(),
            name: "Dr. Rao".to_string(),
            email: String::new(),
        });
        store.dark_mode = true;
        store.save(&path).unwrap();

        let loaded = AppStore::load(&path).unwrap();
        assert_eq!(loaded, store);
    }

    #[test]
    fn test_next_class_id_skips_taken() {
        let now = Utc.timestamp_millis_opt(1_700_000_000_000).unwrap();
        let mut store = AppStore::default();
        store.classes.push(class("CLS1700000000000"));

        assert_eq!(store.next_class_id("CLS", now), "CLS1700000000001");
        assert_eq!(store.next_class_id("CSV", now), "CSV1700000000000");
    }

    #[test]
    fn test_upsert_faculty_replaces() {
        let mut store = AppStore::default();
        for name in ["Old", "New"] {
            store.upsert_faculty(Faculty {
                id: "F1".to_string(),
                name: name.to_string(),
                email: String::new(),
            });
        }
        assert_eq!(store.faculty.len(), 1);
        assert_eq!(store.faculty_name("F1"), Some("New"));
    }

    #[test]
    fn test_toggle_dark_mode() {
        let mut store = AppStore::default();
        assert!(store.toggle_dark_mode());
        assert!(!store.toggle_dark_mode());
    }
}
