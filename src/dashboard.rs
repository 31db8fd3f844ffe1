//! Dashboard display values.

use crate::models::User;
use crate::roster;
use crate::store::AppStore;

/// Headline figures for the dashboard.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DashboardStats {
    pub classes: usize,
    pub active_sessions: usize,
    pub enrolled_students: usize,
    pub archived_sessions: usize,
    pub check_ins: usize,
    /// Check-ins over enrolled seats across archived sessions, in percent.
    pub attendance_rate: f64,
}

impl DashboardStats {
    /// Compute stats over the classes visible to `actor`.
    pub fn compute(store: &AppStore, actor: &User) -> Self {
        let classes = roster::list_for(store, actor);
        let visible = |class_id: &str| classes.iter().any(|c| c.id == class_id);

        let enrolled_students: usize = classes.iter().map(|c| c.student_count()).sum();
        let active_sessions = store.active_sessions.keys().filter(|id| visible(id.as_str())).count();

        let archived: Vec<_> = store
            .session_history
            .iter()
            .filter(|s| visible(s.class_id.as_str()))
            .collect();
        let check_ins: usize = archived.iter().map(|s| s.attendees.len()).sum();
        let seats: usize = archived
            .iter()
            .filter_map(|s| store.find_class(&s.class_id))
            .map(|c| c.student_count())
            .sum();
        let attendance_rate = if seats == 0 {
            0.0
        } else {
            check_ins as f64 * 100.0 / seats as f64
        };

        Self {
            classes: classes.len(),
            active_sessions,
            enrolled_students,
            archived_sessions: archived.len(),
            check_ins,
            attendance_rate,
        }
    }

    /// Get summary message.
    pub fn summary(&self) -> String {
        format!(
            "Classes: {}, Live sessions: {}, Students: {}, Past sessions: {}, Check-ins: {}, Rate: {:.1}%",
            self.classes,
            self.active_sessions,
            self.enrolled_students,
            self.archived_sessions,
            self.check_ins,
            self.attendance_rate
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::SessionConfig;
    use crate::models::{ClassForm, ClassRecord, Role};
    use crate::session::SessionService;

    #[test]
    fn test_empty_store() {
        let stats = DashboardStats::compute(&AppStore::default(), &User::new("A1", Role::Admin));
        assert_eq!(stats, DashboardStats::default());
    }

    #[test]
    fn test_rate_over_archived_sessions() {
        let mut store = AppStore::default();
        let mut class = ClassRecord::from_form(
            "C1",
            ClassForm {
                name: "Math".to_string(),
                faculty_id: "F1".to_string(),
                ..Default::default()
            },
        );
        class.student_ids = ["S1", "S2", "S3", "S4"].iter().map(|s| s.to_string()).collect();
        store.classes.push(class);

        let faculty = User::new("F1", Role::Faculty);
        let svc = SessionService::new(SessionConfig::default());
        svc.start_class(&mut store, &faculty, "C1").unwrap();
        svc.check_in_face(&mut store, &User::new("S1", Role::Student), "C1").unwrap();
        svc.end_class(&mut store, &faculty, "C1").unwrap();
        svc.start_class(&mut store, &faculty, "C1").unwrap();

        let stats = DashboardStats::compute(&store, &faculty);
        assert_eq!(stats.classes, 1);
        assert_eq!(stats.active_sessions, 1);
        assert_eq!(stats.enrolled_students, 4);
        assert_eq!(stats.archived_sessions, 1);
        assert_eq!(stats.check_ins, 1);
        assert!((stats.attendance_rate - 25.0).abs() < f64::EPSILON);

        let other = DashboardStats::compute(&store, &User::new("F2", Role::Faculty));
        assert_eq!(other, DashboardStats::default());
    }
}
