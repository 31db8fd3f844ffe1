//! Acting users and the faculty directory.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Role of the acting user.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Student,
    Faculty,
    Admin,
}

impl Role {
    /// Get the lowercase name used in config and on the command line.
    pub fn name(&self) -> &'static str {
        match self {
            Role::Student => "student",
            Role::Faculty => "faculty",
            Role::Admin => "admin",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Role {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "student" => Ok(Role::Student),
            "faculty" => Ok(Role::Faculty),
            "admin" => Ok(Role::Admin),
            other => Err(format!("unknown role '{other}' (expected student, faculty or admin)")),
        }
    }
}

/// The user performing an operation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub id: String,
    pub role: Role,
}

impl User {
    pub fn new(id: impl Into<String>, role: Role) -> Self {
        Self { id: id.into(), role }
    }

    pub fn is_admin(&self) -> bool {
        self.role == Role::Admin
    }

    pub fn is_faculty(&self) -> bool {
        self.role == Role::Faculty
    }

    pub fn is_student(&self) -> bool {
        self.role == Role::Student
    }

    /// Admin and faculty may create classes and run sessions.
    pub fn is_staff(&self) -> bool {
        matches!(self.role, Role::Admin | Role::Faculty)
    }
}

/// Faculty directory entry, used to resolve names on export.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Faculty {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub email: String,
}
