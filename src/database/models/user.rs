// Database models - User
use serde::{Deserialize, Serialize};

/// Role of a platform user; gates who may create feedback vs. only reply
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum UserRole {
    Counselor,
    Supervisor,
}

impl UserRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            UserRole::Counselor => "counselor",
            UserRole::Supervisor => "supervisor",
        }
    }

    pub fn from_str(s: &str) -> Self {
        match s.to_lowercase().as_str() {
            "supervisor" => UserRole::Supervisor,
            _ => UserRole::Counselor,
        }
    }
}

/// A platform user (counselor or supervisor)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    pub id: String,
    pub full_name: String,
    pub email: String,
    pub role: UserRole,
    pub created_at: String,
}

impl User {
    pub fn new(full_name: &str, email: &str, role: UserRole) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            full_name: full_name.to_string(),
            email: email.to_string(),
            role,
            created_at: chrono::Utc::now().to_rfc3339(),
        }
    }
}

/// The identity every annotation/lifecycle call runs as.
///
/// Passed explicitly instead of being read from ambient auth state so the
/// gating logic stays testable with plain values.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Actor {
    pub id: String,
    pub role: UserRole,
}

impl Actor {
    pub fn new(id: &str, role: UserRole) -> Self {
        Self {
            id: id.to_string(),
            role,
        }
    }
}

impl From<&User> for Actor {
    fn from(user: &User) -> Self {
        Actor {
            id: user.id.clone(),
            role: user.role,
        }
    }
}
