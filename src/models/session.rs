//! Class sessions, attendees, and the QR payload.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{AppError, Result};

/// How a student checked in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CheckInMethod {
    Qr,
    Face,
}

impl CheckInMethod {
    pub fn name(&self) -> &'static str {
        match self {
            CheckInMethod::Qr => "qr",
            CheckInMethod::Face => "face",
        }
    }
}

/// One student's check-in to a session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Attendee {
    pub student_id: String,
    pub method: CheckInMethod,
    pub checked_in_at: DateTime<Utc>,
}

/// A single meeting of a class.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClassSession {
    pub id: String,
    pub class_id: String,
    pub faculty_id: String,
    pub date: NaiveDate,
    pub start_time: DateTime<Utc>,
    pub end_time: Option<DateTime<Utc>>,
    pub qr_code: String,
    pub is_active: bool,
    #[serde(default)]
    pub attendees: Vec<Attendee>,
}

impl ClassSession {
    pub fn has_attendee(&self, student_id: &str) -> bool {
        self.attendees.iter().any(|a| a.student_id == student_id)
    }
}

/// Contents of the QR code shown for an active session.
///
/// Serialized as `{"sessionId":..,"classId":..,"timestamp":<ms epoch>}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QrPayload {
    pub session_id: String,
    pub class_id: String,
    pub timestamp: i64,
}

impl QrPayload {
    pub fn new(session_id: impl Into<String>, class_id: impl Into<String>, issued_at: DateTime<Utc>) -> Self {
        Self {
            session_id: session_id.into(),
            class_id: class_id.into(),
            timestamp: issued_at.timestamp_millis(),
        }
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string(self)?)
    }

    /// Parse a scanned QR string.
    pub fn parse(data: &str) -> Result<Self> {
        serde_json::from_str(data.trim()).map_err(|e| AppError::invalid_qr(format!("malformed payload: {e}")))
    }
}
