// Database models - Session
use serde::{Deserialize, Serialize};

use crate::error::ReviewError;

/// Session processing status. Forward-only:
/// pending -> transcribing -> ready -> reviewed
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum SessionStatus {
    Pending,
    Transcribing,
    Ready,
    Reviewed,
}

impl SessionStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            SessionStatus::Pending => "pending",
            SessionStatus::Transcribing => "transcribing",
            SessionStatus::Ready => "ready",
            SessionStatus::Reviewed => "reviewed",
        }
    }

    pub fn from_str(s: &str) -> Self {
        match s.to_lowercase().as_str() {
            "transcribing" => SessionStatus::Transcribing,
            "ready" => SessionStatus::Ready,
            "reviewed" => SessionStatus::Reviewed,
            _ => SessionStatus::Pending,
        }
    }

    fn rank(&self) -> u8 {
        match self {
            SessionStatus::Pending => 0,
            SessionStatus::Transcribing => 1,
            SessionStatus::Ready => 2,
            SessionStatus::Reviewed => 3,
        }
    }

    /// Whether `next` is the immediate successor of `self`.
    pub fn can_transition_to(&self, next: SessionStatus) -> bool {
        next.rank() == self.rank() + 1
    }

    /// Validate a transition, rejecting skips and regressions.
    pub fn transition(&self, next: SessionStatus) -> Result<SessionStatus, ReviewError> {
        if self.can_transition_to(next) {
            Ok(next)
        } else {
            Err(ReviewError::InvalidTransition {
                from: self.as_str().to_string(),
                to: next.as_str().to_string(),
            })
        }
    }
}

/// An uploaded counseling session
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Session {
    pub id: String,
    pub title: String,
    pub description: Option<String>,
    /// When the counseling session itself took place (RFC 3339)
    pub session_date: String,
    pub duration_seconds: Option<f64>,
    pub status: SessionStatus,
    pub counselor_id: String,
    pub supervisor_id: Option<String>,
    /// Storage path of the uploaded recording, set after upload completes
    pub recording_url: Option<String>,
    pub created_at: String,
    pub updated_at: String,
}

impl Session {
    pub fn new(title: &str, session_date: &str, counselor_id: &str) -> Self {
        let now = chrono::Utc::now().to_rfc3339();
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            title: title.to_string(),
            description: None,
            session_date: session_date.to_string(),
            duration_seconds: None,
            status: SessionStatus::Pending,
            counselor_id: counselor_id.to_string(),
            supervisor_id: None,
            recording_url: None,
            created_at: now.clone(),
            updated_at: now,
        }
    }

    pub fn with_description(mut self, description: &str) -> Self {
        self.description = Some(description.to_string());
        self
    }
}
