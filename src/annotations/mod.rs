// Annotations module for counsel-review
//
// Domain rules for feedback comments: who may create what, ownership-gated
// editing, one level of threading, and the anchor-kind grouping the session
// view renders from. Row persistence lives in database::comments_repo.

use std::collections::HashMap;
use std::sync::Arc;

use log::info;
use serde::Serialize;

use crate::database::models::{
    Actor, AnchorKind, Comment, CommentEdit, NewComment, UserRole, AUDIO_PLACEHOLDER,
};
use crate::database::DatabaseManager;
use crate::error::{ReviewError, ReviewResult};

/// A top-level comment with its replies, ordered by creation time.
#[derive(Debug, Clone, Serialize)]
pub struct CommentThread {
    pub comment: Comment,
    pub replies: Vec<Comment>,
}

/// Comments of one session grouped by anchor kind, ready for rendering.
#[derive(Debug, Clone, Default, Serialize)]
pub struct SessionAnnotations {
    /// Segment-anchored threads keyed by segment id, creation order within
    pub segment_threads: HashMap<String, Vec<CommentThread>>,
    /// Timestamp-anchored threads sorted by range start
    pub range_threads: Vec<CommentThread>,
    /// Session-level threads sorted by creation time
    pub session_threads: Vec<CommentThread>,
}

impl SessionAnnotations {
    pub fn is_empty(&self) -> bool {
        self.segment_threads.is_empty()
            && self.range_threads.is_empty()
            && self.session_threads.is_empty()
    }

    /// Total comment count including replies
    pub fn total(&self) -> usize {
        self.segment_threads
            .values()
            .flatten()
            .chain(self.range_threads.iter())
            .chain(self.session_threads.iter())
            .map(|t| 1 + t.replies.len())
            .sum()
    }
}

#[derive(Debug)]
pub struct AnnotationStore {
    db: Arc<DatabaseManager>,
}

impl AnnotationStore {
    pub fn new(db: Arc<DatabaseManager>) -> Self {
        Self { db }
    }

    /// Create a comment.
    ///
    /// Top-level comments are a supervisor capability; counselors may only
    /// reply. A voice attachment forces the placeholder body so listing
    /// never shows stale prose next to the recording.
    pub fn add(&self, author: &Actor, new: NewComment) -> ReviewResult<Comment> {
        if new.content.trim().is_empty() && new.audio_url.is_none() {
            return Err(ReviewError::Validation(
                "Comment content is required".to_string(),
            ));
        }

        if self.db.get_session(&new.session_id)?.is_none() {
            return Err(ReviewError::Validation(format!(
                "Unknown session: {}",
                new.session_id
            )));
        }

        match &new.parent_id {
            None => {
                if author.role != UserRole::Supervisor {
                    return Err(ReviewError::Forbidden(
                        "Only supervisors can create feedback; counselors may reply".to_string(),
                    ));
                }
            }
            Some(parent_id) => {
                let parent = self.db.get_comment(parent_id)?.ok_or_else(|| {
                    ReviewError::Validation(format!("Parent comment not found: {}", parent_id))
                })?;

                if parent.session_id != new.session_id {
                    return Err(ReviewError::Validation(
                        "Parent comment belongs to a different session".to_string(),
                    ));
                }

                // One level of nesting only
                if parent.is_reply() {
                    return Err(ReviewError::Validation(
                        "Replies to replies are not supported".to_string(),
                    ));
                }
            }
        }

        let has_audio = new.audio_url.is_some();
        let content = if has_audio {
            AUDIO_PLACEHOLDER.to_string()
        } else {
            new.content.trim().to_string()
        };

        let now = chrono::Utc::now().to_rfc3339();
        let comment = Comment {
            id: uuid::Uuid::new_v4().to_string(),
            session_id: new.session_id,
            segment_id: new.segment_id,
            user_id: author.id.clone(),
            parent_id: new.parent_id,
            content,
            start_time: new.start_time,
            end_time: new.end_time,
            has_audio,
            audio_url: new.audio_url,
            created_at: now.clone(),
            updated_at: now,
        };

        self.db.insert_comment(&comment)?;
        info!(
            "Comment {} added to session {} ({:?} anchor)",
            comment.id,
            comment.session_id,
            comment.anchor_kind()
        );

        Ok(comment)
    }

    /// Edit a comment's body or replace its voice note. Only the author may
    /// edit; anchors are immutable once set.
    pub fn edit(&self, comment_id: &str, author: &Actor, edit: CommentEdit) -> ReviewResult<Comment> {
        let comment = self.require_owned(comment_id, author, "edit")?;

        match edit {
            CommentEdit::Content(content) => {
                if content.trim().is_empty() {
                    return Err(ReviewError::Validation(
                        "Comment content is required".to_string(),
                    ));
                }
                // A typed body supersedes any voice note
                self.db.update_comment_content(&comment.id, content.trim())?;
            }
            CommentEdit::AudioUrl(audio_url) => {
                // The old recording is superseded, not merged
                self.db
                    .update_comment_audio(&comment.id, AUDIO_PLACEHOLDER, &audio_url)?;
            }
        }

        self.db
            .get_comment(comment_id)?
            .ok_or_else(|| ReviewError::NotFound(format!("comment {}", comment_id)))
    }

    /// Delete a comment. Only the author may delete; replies go with their
    /// parent (cascade).
    pub fn delete(&self, comment_id: &str, author: &Actor) -> ReviewResult<()> {
        let comment = self.require_owned(comment_id, author, "delete")?;
        self.db.delete_comment(&comment.id)?;
        info!("Comment {} deleted from session {}", comment.id, comment.session_id);
        Ok(())
    }

    /// All comments of a session grouped by anchor kind, each top-level
    /// comment carrying its replies in creation order.
    pub fn list_for_session(&self, session_id: &str) -> ReviewResult<SessionAnnotations> {
        // Repo returns creation order; grouping preserves it
        let comments = self.db.get_comments_for_session(session_id)?;

        let mut replies_by_parent: HashMap<String, Vec<Comment>> = HashMap::new();
        let mut top_level = Vec::new();
        for comment in comments {
            match comment.parent_id.clone() {
                Some(parent_id) => replies_by_parent.entry(parent_id).or_default().push(comment),
                None => top_level.push(comment),
            }
        }

        let mut annotations = SessionAnnotations::default();
        for comment in top_level {
            let replies = replies_by_parent.remove(&comment.id).unwrap_or_default();
            let kind = comment.anchor_kind();
            let thread = CommentThread { comment, replies };
            match kind {
                AnchorKind::Segment => annotations
                    .segment_threads
                    .entry(thread.comment.segment_id.clone().unwrap())
                    .or_default()
                    .push(thread),
                AnchorKind::TimeRange => annotations.range_threads.push(thread),
                AnchorKind::Session => annotations.session_threads.push(thread),
            }
        }

        annotations.range_threads.sort_by(|a, b| {
            let a_start = a.comment.start_time.unwrap_or(0.0);
            let b_start = b.comment.start_time.unwrap_or(0.0);
            a_start.total_cmp(&b_start)
        });

        Ok(annotations)
    }

    fn require_owned(&self, comment_id: &str, author: &Actor, action: &str) -> ReviewResult<Comment> {
        let comment = self
            .db
            .get_comment(comment_id)?
            .ok_or_else(|| ReviewError::NotFound(format!("comment {}", comment_id)))?;

        if comment.user_id != author.id {
            return Err(ReviewError::Forbidden(format!(
                "You can only {} your own comments",
                action
            )));
        }

        Ok(comment)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::database::models::{Session, User};
    use tempfile::tempdir;

    struct Fixture {
        _dir: tempfile::TempDir,
        store: AnnotationStore,
        db: Arc<DatabaseManager>,
        session_id: String,
        supervisor: Actor,
        counselor: Actor,
    }

    fn fixture() -> Fixture {
        let _ = env_logger::builder().is_test(true).try_init();
        let dir = tempdir().unwrap();
        let db = Arc::new(DatabaseManager::new(dir.path().join("test.db")).unwrap());

        let counselor_user = User::new("Counselor", "c@example.com", UserRole::Counselor);
        let supervisor_user = User::new("Supervisor", "s@example.com", UserRole::Supervisor);
        db.create_user(&counselor_user).unwrap();
        db.create_user(&supervisor_user).unwrap();

        let session = Session::new("Session", "2025-03-10T09:00:00Z", &counselor_user.id);
        db.create_session(&session).unwrap();

        Fixture {
            _dir: dir,
            store: AnnotationStore::new(db.clone()),
            db,
            session_id: session.id,
            supervisor: Actor::from(&supervisor_user),
            counselor: Actor::from(&counselor_user),
        }
    }

    #[test]
    fn test_add_then_list_round_trips_anchor_fields() {
        let f = fixture();

        let added = f
            .store
            .add(
                &f.supervisor,
                NewComment::at_range(&f.session_id, 36.0, 42.5, "Watch the pacing here"),
            )
            .unwrap();

        let listed = f.store.list_for_session(&f.session_id).unwrap();
        assert_eq!(listed.range_threads.len(), 1);
        let stored = &listed.range_threads[0].comment;
        assert_eq!(stored.id, added.id);
        assert_eq!(stored.content, "Watch the pacing here");
        assert_eq!(stored.start_time, Some(36.0));
        assert_eq!(stored.end_time, Some(42.5));
        assert_eq!(stored.segment_id, None);
    }

    #[test]
    fn test_counselor_cannot_create_top_level() {
        let f = fixture();

        let err = f
            .store
            .add(
                &f.counselor,
                NewComment::session_level(&f.session_id, "my own note"),
            )
            .unwrap_err();
        assert!(matches!(err, ReviewError::Forbidden(_)));
    }

    #[test]
    fn test_counselor_can_reply() {
        let f = fixture();

        let parent = f
            .store
            .add(&f.supervisor, NewComment::session_level(&f.session_id, "Overall strong"))
            .unwrap();

        let reply = f
            .store
            .add(
                &f.counselor,
                NewComment::reply_to(&f.session_id, &parent.id, "Thank you!"),
            )
            .unwrap();
        assert_eq!(reply.parent_id.as_deref(), Some(parent.id.as_str()));
    }

    #[test]
    fn test_empty_content_without_audio_is_rejected() {
        let f = fixture();

        let err = f
            .store
            .add(&f.supervisor, NewComment::session_level(&f.session_id, "   "))
            .unwrap_err();
        assert!(matches!(err, ReviewError::Validation(_)));
    }

    #[test]
    fn test_unknown_session_is_rejected() {
        let f = fixture();

        let err = f
            .store
            .add(&f.supervisor, NewComment::session_level("missing", "note"))
            .unwrap_err();
        assert!(matches!(err, ReviewError::Validation(_)));
    }

    #[test]
    fn test_audio_comment_gets_placeholder_and_flag() {
        let f = fixture();

        let comment = f
            .store
            .add(
                &f.supervisor,
                NewComment::session_level(&f.session_id, "").with_audio("sup/sess/feedback_1.wav"),
            )
            .unwrap();

        assert!(comment.has_audio);
        assert_eq!(comment.audio_url.as_deref(), Some("sup/sess/feedback_1.wav"));
        assert_eq!(comment.content, AUDIO_PLACEHOLDER);
    }

    #[test]
    fn test_reply_nests_under_parent_not_top_level() {
        let f = fixture();

        let parent = f
            .store
            .add(&f.supervisor, NewComment::session_level(&f.session_id, "first"))
            .unwrap();
        let reply_a = f
            .store
            .add(
                &f.counselor,
                NewComment::reply_to(&f.session_id, &parent.id, "earlier reply"),
            )
            .unwrap();
        let reply_b = f
            .store
            .add(
                &f.supervisor,
                NewComment::reply_to(&f.session_id, &parent.id, "later reply"),
            )
            .unwrap();

        let listed = f.store.list_for_session(&f.session_id).unwrap();
        assert_eq!(listed.session_threads.len(), 1);
        let thread = &listed.session_threads[0];
        assert_eq!(thread.replies.len(), 2);
        assert_eq!(thread.replies[0].id, reply_a.id);
        assert_eq!(thread.replies[1].id, reply_b.id);
        assert_eq!(listed.total(), 3);
    }

    #[test]
    fn test_reply_with_anchor_fields_still_nests() {
        let f = fixture();

        let parent = f
            .store
            .add(&f.supervisor, NewComment::session_level(&f.session_id, "parent"))
            .unwrap();

        let mut reply = NewComment::reply_to(&f.session_id, &parent.id, "anchored reply");
        reply.start_time = Some(12.0);
        reply.end_time = Some(14.0);
        f.store.add(&f.counselor, reply).unwrap();

        let listed = f.store.list_for_session(&f.session_id).unwrap();
        assert!(listed.range_threads.is_empty());
        assert_eq!(listed.session_threads[0].replies.len(), 1);
    }

    #[test]
    fn test_no_second_level_nesting() {
        let f = fixture();

        let parent = f
            .store
            .add(&f.supervisor, NewComment::session_level(&f.session_id, "parent"))
            .unwrap();
        let reply = f
            .store
            .add(
                &f.counselor,
                NewComment::reply_to(&f.session_id, &parent.id, "reply"),
            )
            .unwrap();

        let err = f
            .store
            .add(
                &f.supervisor,
                NewComment::reply_to(&f.session_id, &reply.id, "reply to reply"),
            )
            .unwrap_err();
        assert!(matches!(err, ReviewError::Validation(_)));
    }

    #[test]
    fn test_non_author_edit_fails_and_leaves_comment_unchanged() {
        let f = fixture();

        let comment = f
            .store
            .add(&f.supervisor, NewComment::session_level(&f.session_id, "original"))
            .unwrap();

        let err = f
            .store
            .edit(
                &comment.id,
                &f.counselor,
                CommentEdit::Content("hijacked".to_string()),
            )
            .unwrap_err();
        assert!(matches!(err, ReviewError::Forbidden(_)));

        let listed = f.store.list_for_session(&f.session_id).unwrap();
        assert_eq!(listed.session_threads[0].comment.content, "original");
    }

    #[test]
    fn test_non_author_delete_fails_and_leaves_comment() {
        let f = fixture();

        let comment = f
            .store
            .add(&f.supervisor, NewComment::session_level(&f.session_id, "keep me"))
            .unwrap();

        let err = f.store.delete(&comment.id, &f.counselor).unwrap_err();
        assert!(matches!(err, ReviewError::Forbidden(_)));

        let listed = f.store.list_for_session(&f.session_id).unwrap();
        assert_eq!(listed.session_threads.len(), 1);
    }

    #[test]
    fn test_author_edit_and_delete() {
        let f = fixture();

        let comment = f
            .store
            .add(&f.supervisor, NewComment::session_level(&f.session_id, "draft"))
            .unwrap();

        let edited = f
            .store
            .edit(
                &comment.id,
                &f.supervisor,
                CommentEdit::Content("final".to_string()),
            )
            .unwrap();
        assert_eq!(edited.content, "final");

        f.store.delete(&comment.id, &f.supervisor).unwrap();
        assert!(f.store.list_for_session(&f.session_id).unwrap().is_empty());
    }

    #[test]
    fn test_edit_missing_comment_is_not_found() {
        let f = fixture();

        let err = f
            .store
            .edit(
                "missing",
                &f.supervisor,
                CommentEdit::Content("x".to_string()),
            )
            .unwrap_err();
        assert!(matches!(err, ReviewError::NotFound(_)));
    }

    #[test]
    fn test_replacing_audio_supersedes_old_reference() {
        let f = fixture();

        let comment = f
            .store
            .add(
                &f.supervisor,
                NewComment::session_level(&f.session_id, "").with_audio("a/feedback_1.wav"),
            )
            .unwrap();

        let edited = f
            .store
            .edit(
                &comment.id,
                &f.supervisor,
                CommentEdit::AudioUrl("a/feedback_2.wav".to_string()),
            )
            .unwrap();
        assert!(edited.has_audio);
        assert_eq!(edited.audio_url.as_deref(), Some("a/feedback_2.wav"));
        assert_eq!(edited.content, AUDIO_PLACEHOLDER);
    }

    #[test]
    fn test_text_edit_supersedes_voice_note() {
        let f = fixture();

        let comment = f
            .store
            .add(
                &f.supervisor,
                NewComment::session_level(&f.session_id, "").with_audio("a/feedback_1.wav"),
            )
            .unwrap();

        let edited = f
            .store
            .edit(
                &comment.id,
                &f.supervisor,
                CommentEdit::Content("written instead".to_string()),
            )
            .unwrap();
        assert!(!edited.has_audio);
        assert_eq!(edited.audio_url, None);
        assert_eq!(edited.content, "written instead");
    }

    #[test]
    fn test_grouping_by_anchor_kind() {
        let f = fixture();

        // Need a real segment for the segment anchor
        let transcript = crate::database::models::Transcript::new(&f.session_id, "");
        let segment = crate::database::models::TranscriptSegment {
            id: "seg_1".to_string(),
            transcript_id: transcript.id.clone(),
            segment_index: 0,
            start_time: 0.0,
            end_time: 10.0,
            text: "Hello".to_string(),
            speaker: None,
        };
        f.db
            .create_transcript_with_segments(&transcript, std::slice::from_ref(&segment))
            .unwrap();

        f.store
            .add(&f.supervisor, NewComment::session_level(&f.session_id, "session-wide"))
            .unwrap();
        f.store
            .add(
                &f.supervisor,
                NewComment::on_segment(&f.session_id, "seg_1", "about this segment"),
            )
            .unwrap();
        f.store
            .add(
                &f.supervisor,
                NewComment::at_range(&f.session_id, 50.0, 55.0, "late range"),
            )
            .unwrap();
        f.store
            .add(
                &f.supervisor,
                NewComment::at_range(&f.session_id, 10.0, 12.0, "early range"),
            )
            .unwrap();

        let listed = f.store.list_for_session(&f.session_id).unwrap();
        assert_eq!(listed.session_threads.len(), 1);
        assert_eq!(listed.segment_threads.get("seg_1").unwrap().len(), 1);
        assert_eq!(listed.range_threads.len(), 2);
        // Range threads sorted by start time, not creation order
        assert_eq!(listed.range_threads[0].comment.content, "early range");
        assert_eq!(listed.range_threads[1].comment.content, "late range");
    }
}
