// Database models - Comment
use serde::{Deserialize, Serialize};

/// Content stored for a voice comment in place of user prose.
pub const AUDIO_PLACEHOLDER: &str = "[voice feedback]";

/// A feedback comment attached to a session.
///
/// Anchoring is carried by the optional fields: a segment reference, a
/// timestamp range, both, or neither (session-level). A comment with
/// `parent_id` set is a reply and renders under its parent regardless of its
/// own anchor fields. When `has_audio` is true, `audio_url` must be present
/// and `content` holds [`AUDIO_PLACEHOLDER`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Comment {
    pub id: String,
    pub session_id: String,
    #[serde(default)]
    pub segment_id: Option<String>,
    pub user_id: String,
    #[serde(default)]
    pub parent_id: Option<String>,
    pub content: String,
    #[serde(default)]
    pub start_time: Option<f64>,
    #[serde(default)]
    pub end_time: Option<f64>,
    #[serde(default)]
    pub has_audio: bool,
    #[serde(default)]
    pub audio_url: Option<String>,
    pub created_at: String,
    pub updated_at: String,
}

/// Kind of anchor a top-level comment displays under.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AnchorKind {
    Segment,
    TimeRange,
    Session,
}

impl Comment {
    pub fn anchor_kind(&self) -> AnchorKind {
        if self.segment_id.is_some() {
            AnchorKind::Segment
        } else if self.start_time.is_some() {
            AnchorKind::TimeRange
        } else {
            AnchorKind::Session
        }
    }

    pub fn is_reply(&self) -> bool {
        self.parent_id.is_some()
    }
}

/// Fields the caller supplies when creating a comment; the store assigns
/// id and timestamps and enforces the audio invariant.
#[derive(Debug, Clone, Default)]
pub struct NewComment {
    pub session_id: String,
    pub content: String,
    pub segment_id: Option<String>,
    pub start_time: Option<f64>,
    pub end_time: Option<f64>,
    pub parent_id: Option<String>,
    /// Storage path of an uploaded voice note
    pub audio_url: Option<String>,
}

impl NewComment {
    pub fn session_level(session_id: &str, content: &str) -> Self {
        Self {
            session_id: session_id.to_string(),
            content: content.to_string(),
            ..Default::default()
        }
    }

    pub fn on_segment(session_id: &str, segment_id: &str, content: &str) -> Self {
        Self {
            segment_id: Some(segment_id.to_string()),
            ..Self::session_level(session_id, content)
        }
    }

    pub fn at_range(session_id: &str, start_time: f64, end_time: f64, content: &str) -> Self {
        Self {
            start_time: Some(start_time),
            end_time: Some(end_time),
            ..Self::session_level(session_id, content)
        }
    }

    pub fn reply_to(session_id: &str, parent_id: &str, content: &str) -> Self {
        Self {
            parent_id: Some(parent_id.to_string()),
            ..Self::session_level(session_id, content)
        }
    }

    pub fn with_audio(mut self, audio_url: &str) -> Self {
        self.audio_url = Some(audio_url.to_string());
        self
    }
}

/// An edit to an existing comment. Anchor fields are immutable once set, so
/// only the content or the voice attachment can change.
#[derive(Debug, Clone)]
pub enum CommentEdit {
    Content(String),
    /// Replaces the previous recording; the old object is superseded.
    AudioUrl(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    fn base_comment() -> Comment {
        Comment {
            id: "c1".into(),
            session_id: "s1".into(),
            segment_id: None,
            user_id: "u1".into(),
            parent_id: None,
            content: "note".into(),
            start_time: None,
            end_time: None,
            has_audio: false,
            audio_url: None,
            created_at: "2025-01-01T00:00:00Z".into(),
            updated_at: "2025-01-01T00:00:00Z".into(),
        }
    }

    #[test]
    fn test_anchor_kind_precedence() {
        let mut comment = base_comment();
        assert_eq!(comment.anchor_kind(), AnchorKind::Session);

        comment.start_time = Some(3.0);
        assert_eq!(comment.anchor_kind(), AnchorKind::TimeRange);

        // Segment wins when both are present
        comment.segment_id = Some("seg".into());
        assert_eq!(comment.anchor_kind(), AnchorKind::Segment);
    }
}
