//! Data models for users, classes, and attendance sessions.

pub mod class;
pub mod session;
pub mod user;

pub use class::{ClassForm, ClassRecord};
pub use session::{Attendee, CheckInMethod, ClassSession, QrPayload};
pub use user::{Faculty, Role, User};
