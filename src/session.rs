//! Attendance session controller.
//!
//! Starts and ends class sessions, issues the QR payload for each session,
//! and records student check-ins made by QR scan or face recognition.

use chrono::{DateTime, Utc};
use tracing::{info, warn};

use crate::config::SessionConfig;
use crate::error::{AppError, Result};
use crate::models::{Attendee, CheckInMethod, ClassSession, QrPayload, User};
use crate::store::AppStore;

/// Result of a check-in attempt that passed validation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CheckInOutcome {
    /// Student appended to the session's attendee list.
    Recorded(Attendee),
    /// Student was already on the list; nothing changed.
    AlreadyPresent,
}

/// Session service bound to the session settings.
pub struct SessionService {
    config: SessionConfig,
}

impl SessionService {
    pub fn new(config: SessionConfig) -> Self {
        Self { config }
    }

    /// Start a session for `class_id` now.
    pub fn start_class(&self, store: &mut AppStore, actor: &User, class_id: &str) -> Result<ClassSession> {
        self.start_class_at(store, actor, class_id, Utc::now())
    }

    /// Start a session for `class_id` at `now`.
    ///
    /// A session already running for the same class is ended and archived;
    /// sessions of other classes are untouched.
    pub fn start_class_at(
        &self,
        store: &mut AppStore,
        actor: &User,
        class_id: &str,
        now: DateTime<Utc>,
    ) -> Result<ClassSession> {
        if !actor.is_staff() {
            warn!("{} {} tried to start class {class_id}", actor.role, actor.id);
            return Err(AppError::denied("only admin or faculty can start a class"));
        }
        if store.find_class(class_id).is_none() {
            return Err(AppError::not_found(format!("class {class_id}")));
        }

        if let Some(previous) = archive_active(store, class_id, now) {
            info!("Replacing running session {} of class {class_id}", previous.id);
        }

        let id = store.next_session_id(now);
        let qr_code = QrPayload::new(&id, class_id, now).to_json()?;
        let session = ClassSession {
            id,
            class_id: class_id.to_string(),
            faculty_id: actor.id.clone(),
            date: now.date_naive(),
            start_time: now,
            end_time: None,
            qr_code,
            is_active: true,
            attendees: Vec::new(),
        };

        info!("Session {} started for class {class_id} by {}", session.id, actor.id);
        store.active_sessions.insert(class_id.to_string(), session.clone());
        Ok(session)
    }

    /// End the running session of `class_id`, if any.
    ///
    /// Returns the archived session, or `None` when nothing was running.
    pub fn end_class(&self, store: &mut AppStore, actor: &User, class_id: &str) -> Result<Option<ClassSession>> {
        if !actor.is_staff() {
            warn!("{} {} tried to end class {class_id}", actor.role, actor.id);
            return Err(AppError::denied("only admin or faculty can end a class"));
        }
        let ended = archive_active(store, class_id, Utc::now());
        match &ended {
            Some(session) => info!(
                "Session {} ended with {} attendees",
                session.id,
                session.attendees.len()
            ),
            None => info!("No active session for class {class_id}"),
        }
        Ok(ended)
    }

    /// Record a check-in from a scanned QR string.
    pub fn check_in_qr(&self, store: &mut AppStore, actor: &User, qr_data: &str) -> Result<CheckInOutcome> {
        self.check_in_qr_at(store, actor, qr_data, Utc::now())
    }

    /// Record a check-in from a scanned QR string at `now`.
    ///
    /// The payload must be exactly the one issued for the class's running
    /// session, and the session must have started no longer than the
    /// configured TTL ago.
    pub fn check_in_qr_at(
        &self,
        store: &mut AppStore,
        actor: &User,
        qr_data: &str,
        now: DateTime<Utc>,
    ) -> Result<CheckInOutcome> {
        require_student(actor)?;
        let payload = QrPayload::parse(qr_data)?;

        let session = store
            .active_session(&payload.class_id)
            .ok_or_else(|| AppError::invalid_qr(format!("no active session for class {}", payload.class_id)))?;
        if session.id != payload.session_id {
            return Err(AppError::invalid_qr(format!("session {} is no longer active", payload.session_id)));
        }
        // Only the payload issued at session start is accepted.
        if QrPayload::parse(&session.qr_code)? != payload {
            warn!("Altered QR for session {} scanned by {}", payload.session_id, actor.id);
            return Err(AppError::invalid_qr(format!("payload does not match session {}", session.id)));
        }

        let age_secs = (now - session.start_time).num_seconds();
        if age_secs > self.config.qr_ttl_secs as i64 {
            warn!("Expired QR for session {} scanned by {}", payload.session_id, actor.id);
            return Err(AppError::QrExpired {
                age_secs,
                ttl_secs: self.config.qr_ttl_secs,
            });
        }

        self.record(store, actor, &payload.class_id, CheckInMethod::Qr, now)
    }

    /// Record a check-in after a successful face match for `actor`.
    pub fn check_in_face(&self, store: &mut AppStore, actor: &User, class_id: &str) -> Result<CheckInOutcome> {
        self.check_in_face_at(store, actor, class_id, Utc::now())
    }

    pub fn check_in_face_at(
        &self,
        store: &mut AppStore,
        actor: &User,
        class_id: &str,
        now: DateTime<Utc>,
    ) -> Result<CheckInOutcome> {
        require_student(actor)?;
        if store.active_session(class_id).is_none() {
            return Err(AppError::not_found(format!("active session for class {class_id}")));
        }
        self.record(store, actor, class_id, CheckInMethod::Face, now)
    }

    fn record(
        &self,
        store: &mut AppStore,
        actor: &User,
        class_id: &str,
        method: CheckInMethod,
        now: DateTime<Utc>,
    ) -> Result<CheckInOutcome> {
        if self.config.require_enrollment {
            let enrolled = store
                .find_class(class_id)
                .is_some_and(|c| c.student_ids.contains(&actor.id));
            if !enrolled {
                return Err(AppError::denied(format!("student {} is not enrolled in {class_id}", actor.id)));
            }
        }

        let session = store
            .active_sessions
            .get_mut(class_id)
            .ok_or_else(|| AppError::not_found(format!("active session for class {class_id}")))?;
        if session.has_attendee(&actor.id) {
            return Ok(CheckInOutcome::AlreadyPresent);
        }

        let attendee = Attendee {
            student_id: actor.id.clone(),
            method,
            checked_in_at: now,
        };
        session.attendees.push(attendee.clone());
        info!(
            "Student {} checked in to {} via {}",
            actor.id,
            session.id,
            method.name()
        );
        Ok(CheckInOutcome::Recorded(attendee))
    }
}

fn require_student(actor: &User) -> Result<()> {
    if actor.is_student() {
        Ok(())
    } else {
        Err(AppError::denied("check-in is available to students only"))
    }
}

/// Stamp and move the running session of `class_id` into history.
pub(crate) fn archive_active(store: &mut AppStore, class_id: &str, now: DateTime<Utc>) -> Option<ClassSession> {
    let mut session = store.active_sessions.remove(class_id)?;
    session.end_time = Some(now);
    session.is_active = false;
    store.session_history.push(session.clone());
    Some(session)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{ClassForm, ClassRecord, Role};
    use chrono::{TimeDelta, TimeZone};

    fn t0() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 3, 10, 9, 0, 0).unwrap()
    }

    fn store_with(ids: &[&str]) -> AppStore {
        let mut store = AppStore::default();
        for id in ids {
            let mut class = ClassRecord::from_form(
                *id,
                ClassForm {
                    name: format!("Class {id}"),
                    ..Default::default()
                },
            );
            class.student_ids.insert("S1".to_string());
            store.classes.push(class);
        }
        store
    }

    fn service() -> SessionService {
        SessionService::new(SessionConfig::default())
    }

    fn faculty() -> User {
        User::new("F1", Role::Faculty)
    }

    fn student(id: &str) -> User {
        User::new(id, Role::Student)
    }

    #[test]
    fn test_start_builds_session_and_qr() {
        let mut store = store_with(&["A"]);
        let session = service().start_class_at(&mut store, &faculty(), "A", t0()).unwrap();

        assert_eq!(session.id, format!("session_{}", t0().timestamp_millis()));
        assert_eq!(session.faculty_id, "F1");
        assert_eq!(session.date, t0().date_naive());
        assert!(session.is_active);
        assert!(session.attendees.is_empty());

        let payload = QrPayload::parse(&session.qr_code).unwrap();
        assert_eq!(payload, QrPayload::new(&session.id, "A", t0()));
        assert_eq!(store.active_session("A"), Some(&session));
    }

    #[test]
    fn test_sessions_for_different_classes_coexist() {
        let mut store = store_with(&["A", "B"]);
        let svc = service();
        let b = svc.start_class_at(&mut store, &faculty(), "B", t0()).unwrap();
        let a = svc.start_class_at(&mut store, &faculty(), "A", t0()).unwrap();

        assert_ne!(a.id, b.id);
        assert_eq!(store.active_sessions.len(), 2);
        assert_eq!(store.active_session("B"), Some(&b));
    }

    #[test]
    fn test_restart_same_class_keeps_latest_only() {
        let mut store = store_with(&["A"]);
        let svc = service();
        let first = svc.start_class_at(&mut store, &faculty(), "A", t0()).unwrap();
        let second = svc
            .start_class_at(&mut store, &faculty(), "A", t0() + TimeDelta::minutes(5))
            .unwrap();

        assert_eq!(store.active_session("A"), Some(&second));
        assert_eq!(store.session_history.len(), 1);
        assert_eq!(store.session_history[0].id, first.id);
        assert!(!store.session_history[0].is_active);
    }

    #[test]
    fn test_end_without_session_is_noop() {
        let mut store = store_with(&["A"]);
        let ended = service().end_class(&mut store, &faculty(), "A").unwrap();

        assert!(ended.is_none());
        assert!(store.active_sessions.is_empty());
        assert!(store.session_history.is_empty());
    }

    #[test]
    fn test_end_archives_session() {
        let mut store = store_with(&["A", "B"]);
        let svc = service();
        svc.start_class_at(&mut store, &faculty(), "A", t0()).unwrap();
        svc.start_class_at(&mut store, &faculty(), "B", t0()).unwrap();

        let ended = svc.end_class(&mut store, &faculty(), "A").unwrap().unwrap();
        assert!(!ended.is_active);
        assert!(ended.end_time.is_some());
        assert_eq!(store.session_history, vec![ended]);
        assert!(store.active_session("A").is_none());
        assert!(store.active_session("B").is_some());
    }

    #[test]
    fn test_students_cannot_run_sessions() {
        let mut store = store_with(&["A"]);
        let svc = service();
        assert!(matches!(
            svc.start_class_at(&mut store, &student("S1"), "A", t0()),
            Err(AppError::PermissionDenied(_))
        ));
        assert!(matches!(
            svc.end_class(&mut store, &student("S1"), "A"),
            Err(AppError::PermissionDenied(_))
        ));
    }

    #[test]
    fn test_start_unknown_class() {
        let mut store = store_with(&[]);
        let err = service().start_class_at(&mut store, &faculty(), "X", t0()).unwrap_err();
        assert!(matches!(err, AppError::NotFound(_)));
    }

    #[test]
    fn test_qr_check_in_records_once() {
        let mut store = store_with(&["A"]);
        let svc = service();
        let session = svc.start_class_at(&mut store, &faculty(), "A", t0()).unwrap();
        let later = t0() + TimeDelta::seconds(30);

        let outcome = svc.check_in_qr_at(&mut store, &student("S1"), &session.qr_code, later).unwrap();
        assert_eq!(
            outcome,
            CheckInOutcome::Recorded(Attendee {
                student_id: "S1".to_string(),
                method: CheckInMethod::Qr,
                checked_in_at: later,
            })
        );

        let again = svc.check_in_qr_at(&mut store, &student("S1"), &session.qr_code, later).unwrap();
        assert_eq!(again, CheckInOutcome::AlreadyPresent);
        assert_eq!(store.active_session("A").unwrap().attendees.len(), 1);
    }

    #[test]
    fn test_qr_check_in_expired() {
        let mut store = store_with(&["A"]);
        let svc = SessionService::new(SessionConfig {
            qr_ttl_secs: 60,
            require_enrollment: false,
        });
        let session = svc.start_class_at(&mut store, &faculty(), "A", t0()).unwrap();

        let err = svc
            .check_in_qr_at(&mut store, &student("S1"), &session.qr_code, t0() + TimeDelta::seconds(61))
            .unwrap_err();
        assert!(matches!(err, AppError::QrExpired { age_secs: 61, ttl_secs: 60 }));
    }

    #[test]
    fn test_restamped_qr_after_window_rejected() {
        let mut store = store_with(&["A"]);
        let svc = SessionService::new(SessionConfig {
            qr_ttl_secs: 60,
            require_enrollment: false,
        });
        let session = svc.start_class_at(&mut store, &faculty(), "A", t0()).unwrap();
        let later = t0() + TimeDelta::hours(3);
        let restamped = QrPayload::new(&session.id, "A", later).to_json().unwrap();

        let err = svc.check_in_qr_at(&mut store, &student("S1"), &restamped, later).unwrap_err();
        assert!(matches!(err, AppError::InvalidQr(_)));
        assert!(store.active_session("A").unwrap().attendees.is_empty());
    }

    #[test]
    fn test_future_timestamp_rejected() {
        let mut store = store_with(&["A"]);
        let svc = service();
        let session = svc.start_class_at(&mut store, &faculty(), "A", t0()).unwrap();
        let future = QrPayload::new(&session.id, "A", t0() + TimeDelta::days(1)).to_json().unwrap();

        let err = svc
            .check_in_qr_at(&mut store, &student("S1"), &future, t0() + TimeDelta::seconds(10))
            .unwrap_err();
        assert!(matches!(err, AppError::InvalidQr(_)));
    }

    #[test]
    fn test_extreme_timestamp_rejected() {
        let mut store = store_with(&["A"]);
        let svc = service();
        let session = svc.start_class_at(&mut store, &faculty(), "A", t0()).unwrap();

        for timestamp in [i64::MIN, i64::MAX] {
            let forged = format!(r#"{{"sessionId":"{}","classId":"A","timestamp":{timestamp}}}"#, session.id);
            let err = svc.check_in_qr_at(&mut store, &student("S1"), &forged, t0()).unwrap_err();
            assert!(matches!(err, AppError::InvalidQr(_)));
        }
    }

    #[test]
    fn test_qr_of_ended_session_rejected() {
        let mut store = store_with(&["A"]);
        let svc = service();
        let old = svc.start_class_at(&mut store, &faculty(), "A", t0()).unwrap();
        svc.start_class_at(&mut store, &faculty(), "A", t0() + TimeDelta::seconds(1))
            .unwrap();

        let err = svc
            .check_in_qr_at(&mut store, &student("S1"), &old.qr_code, t0() + TimeDelta::seconds(2))
            .unwrap_err();
        assert!(matches!(err, AppError::InvalidQr(_)));
    }

    #[test]
    fn test_enrollment_required() {
        let mut store = store_with(&["A"]);
        let svc = SessionService::new(SessionConfig {
            qr_ttl_secs: 300,
            require_enrollment: true,
        });
        svc.start_class_at(&mut store, &faculty(), "A", t0()).unwrap();

        assert!(matches!(
            svc.check_in_face_at(&mut store, &student("S2"), "A", t0()),
            Err(AppError::PermissionDenied(_))
        ));
        assert!(matches!(
            svc.check_in_face_at(&mut store, &student("S1"), "A", t0()),
            Ok(CheckInOutcome::Recorded(_))
        ));
    }

    #[test]
    fn test_face_check_in_needs_active_session() {
        let mut store = store_with(&["A"]);
        let err = service().check_in_face_at(&mut store, &student("S1"), "A", t0()).unwrap_err();
        assert!(matches!(err, AppError::NotFound(_)));
    }
}
