//! Class roster entries and the add/edit form.

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// A class in the roster.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClassRecord {
    pub id: String,
    pub name: String,
    pub subject: String,
    #[serde(default)]
    pub day: String,
    #[serde(default)]
    pub batch: String,
    #[serde(default)]
    pub period: String,
    #[serde(default)]
    pub teacher_email: String,
    pub faculty_id: String,
    pub schedule: String,
    pub room: String,
    pub semester: String,
    #[serde(default)]
    pub student_ids: BTreeSet<String>,
}

/// Editable class fields, shared by the add and edit flows.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClassForm {
    pub name: String,
    pub subject: String,
    pub day: String,
    pub batch: String,
    pub period: String,
    pub teacher_email: String,
    pub faculty_id: String,
    pub schedule: String,
    pub room: String,
    pub semester: String,
}

impl ClassForm {
    /// Reset the form to default values.
    pub fn reset(&mut self) {
        *self = Self::default();
    }

    /// Create a form pre-filled for editing an existing class.
    pub fn edit(class: &ClassRecord) -> Self {
        Self {
            name: class.name.clone(),
            subject: class.subject.clone(),
            day: class.day.clone(),
            batch: class.batch.clone(),
            period: class.period.clone(),
            teacher_email: class.teacher_email.clone(),
            faculty_id: class.faculty_id.clone(),
            schedule: class.schedule.clone(),
            room: class.room.clone(),
            semester: class.semester.clone(),
        }
    }
}

impl ClassRecord {
    /// Build a new class with no enrolled students.
    pub fn from_form(id: impl Into<String>, form: ClassForm) -> Self {
        Self {
            id: id.into(),
            name: form.name,
            subject: form.subject,
            day: form.day,
            batch: form.batch,
            period: form.period,
            teacher_email: form.teacher_email,
            faculty_id: form.faculty_id,
            schedule: form.schedule,
            room: form.room,
            semester: form.semester,
            student_ids: BTreeSet::new(),
        }
    }

    /// Overwrite every form field, keeping id and enrollment.
    pub fn apply(&mut self, form: ClassForm) {
        self.name = form.name;
        self.subject = form.subject;
        self.day = form.day;
        self.batch = form.batch;
        self.period = form.period;
        self.teacher_email = form.teacher_email;
        self.faculty_id = form.faculty_id;
        self.schedule = form.schedule;
        self.room = form.room;
        self.semester = form.semester;
    }

    pub fn student_count(&self) -> usize {
        self.student_ids.len()
    }
}
