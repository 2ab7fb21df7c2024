// Session annotation view for counsel-review
//
// The orchestration layer: loads an access-checked session, keeps the
// transcript cursor in step with playback, turns text selections into
// anchored comments (degrading gracefully when the estimate fails), routes
// feedback actions, and runs the upload/mark-reviewed flows. At this
// boundary errors are data: every flow can be folded into an ActionOutcome
// instead of crossing the page boundary as an exception.

use std::sync::Arc;

use log::{info, warn};
use serde::Serialize;

use crate::annotations::{AnnotationStore, SessionAnnotations};
use crate::database::models::{
    Actor, Comment, CommentEdit, NewComment, Session, SessionStatus, TranscriptSegment, User,
    UserRole,
};
use crate::database::DatabaseManager;
use crate::error::{ReviewError, ReviewResult};
use crate::feedback::AudioFeedbackLifecycle;
use crate::storage::{session_recording_path, ObjectStore, SESSION_RECORDINGS_BUCKET};
use crate::timeline::{locate, mapper, PlaybackController};
use crate::transcription::{self, TranscriptionEngine};

/// Flow result at the orchestration boundary: a flag plus a user-facing
/// message, never an exception.
#[derive(Debug, Clone, Serialize)]
pub struct ActionOutcome {
    pub success: bool,
    pub message: String,
}

impl ActionOutcome {
    pub fn ok(message: &str) -> Self {
        Self {
            success: true,
            message: message.to_string(),
        }
    }

    pub fn error(error: &ReviewError) -> Self {
        Self {
            success: false,
            message: error.to_string(),
        }
    }

    pub fn from_result<T>(result: &ReviewResult<T>, success_message: &str) -> Self {
        match result {
            Ok(_) => Self::ok(success_message),
            Err(e) => Self::error(e),
        }
    }

    /// JSON payload for frontend consumption
    pub fn to_json(&self) -> serde_json::Value {
        serde_json::json!({
            "success": self.success,
            "message": self.message,
        })
    }
}

/// Everything the session page renders
#[derive(Debug, Clone, Serialize)]
pub struct SessionView {
    pub session: Session,
    pub counselor: Option<User>,
    pub supervisor: Option<User>,
    pub segments: Vec<TranscriptSegment>,
    pub annotations: SessionAnnotations,
    pub active_segment_id: Option<String>,
}

/// Fields for a new session upload
#[derive(Debug, Clone)]
pub struct SessionUpload {
    pub title: String,
    pub description: Option<String>,
    pub session_date: String,
    pub file_name: String,
    pub bytes: Vec<u8>,
    pub content_type: String,
}

#[derive(Debug)]
pub struct SessionAnnotationView {
    db: Arc<DatabaseManager>,
    annotations: AnnotationStore,
    playback: PlaybackController,
    session_id: String,
    segments: Vec<TranscriptSegment>,
    active_segment_id: Option<String>,
}

impl SessionAnnotationView {
    /// Open a session for the given viewer. Counselors may only open their
    /// own sessions; supervisors see all of them.
    pub fn open(db: Arc<DatabaseManager>, session_id: &str, viewer: &Actor) -> ReviewResult<Self> {
        let session = db
            .get_session(session_id)?
            .ok_or_else(|| ReviewError::NotFound(format!("session {}", session_id)))?;

        if viewer.role == UserRole::Counselor && session.counselor_id != viewer.id {
            return Err(ReviewError::Forbidden(
                "This session belongs to another counselor".to_string(),
            ));
        }

        let segments = load_segments(&db, session_id)?;
        let playback = PlaybackController::new(session.duration_seconds);

        Ok(Self {
            annotations: AnnotationStore::new(db.clone()),
            db,
            playback,
            session_id: session_id.to_string(),
            segments,
            active_segment_id: None,
        })
    }

    /// Re-pull segments after the transcription job finishes
    pub fn reload_transcript(&mut self) -> ReviewResult<()> {
        self.segments = load_segments(&self.db, &self.session_id)?;
        Ok(())
    }

    pub fn playback(&mut self) -> &mut PlaybackController {
        &mut self.playback
    }

    pub fn active_segment_id(&self) -> Option<&str> {
        self.active_segment_id.as_deref()
    }

    /// Adopt a transport position and re-resolve the highlighted segment.
    /// During gaps past the last segment the previous highlight is kept.
    pub fn sync_position(&mut self, media_time: f64) {
        self.playback.sync_to(media_time);
        self.update_active_segment();
    }

    /// Advance caller-driven playback and re-resolve the highlight
    pub fn tick(&mut self, elapsed: std::time::Duration) {
        self.playback.tick(elapsed);
        self.update_active_segment();
    }

    fn update_active_segment(&mut self) {
        if let Some(segment) = locate(&self.segments, self.playback.position()) {
            self.active_segment_id = Some(segment.id.clone());
        }
    }

    /// Assemble the full render state
    pub fn view(&self) -> ReviewResult<SessionView> {
        let session = self
            .db
            .get_session(&self.session_id)?
            .ok_or_else(|| ReviewError::NotFound(format!("session {}", self.session_id)))?;

        let counselor = self.db.get_user(&session.counselor_id)?;
        let supervisor = match &session.supervisor_id {
            Some(id) => self.db.get_user(id)?,
            None => None,
        };
        let annotations = self.annotations.list_for_session(&self.session_id)?;

        Ok(SessionView {
            session,
            counselor,
            supervisor,
            segments: self.segments.clone(),
            annotations,
            active_segment_id: self.active_segment_id.clone(),
        })
    }

    /// Comment on selected transcript text. The selection is mapped to a
    /// time range; when the estimate fails the comment falls back to a
    /// segment-only anchor rather than dropping the feedback.
    pub fn comment_on_selection(
        &self,
        viewer: &Actor,
        segment_id: &str,
        selection: &str,
        content: &str,
    ) -> ReviewResult<Comment> {
        let segment = self
            .segments
            .iter()
            .find(|s| s.id == segment_id)
            .ok_or_else(|| ReviewError::NotFound(format!("segment {}", segment_id)))?;

        let mut new_comment = NewComment::on_segment(&self.session_id, segment_id, content);
        match mapper::estimate_range(segment, selection) {
            Ok(range) => {
                new_comment.start_time = Some(range.start);
                new_comment.end_time = Some(range.end);
            }
            Err(e) if e.allows_coarser_anchor() => {
                warn!(
                    "Selection anchor failed on segment {} ({}), keeping segment anchor",
                    segment_id, e
                );
            }
            Err(e) => return Err(e),
        }

        self.annotations.add(viewer, new_comment)
    }

    /// Comment anchored at the current playback position
    pub fn comment_at_current_time(&self, viewer: &Actor, content: &str) -> ReviewResult<Comment> {
        let position = self.playback.position();
        self.annotations.add(
            viewer,
            NewComment::at_range(&self.session_id, position, position, content),
        )
    }

    /// Session-level comment
    pub fn comment_on_session(&self, viewer: &Actor, content: &str) -> ReviewResult<Comment> {
        self.annotations
            .add(viewer, NewComment::session_level(&self.session_id, content))
    }

    /// Reply to an existing comment
    pub fn reply(&self, viewer: &Actor, parent_id: &str, content: &str) -> ReviewResult<Comment> {
        self.annotations
            .add(viewer, NewComment::reply_to(&self.session_id, parent_id, content))
    }

    pub fn edit_comment(
        &self,
        viewer: &Actor,
        comment_id: &str,
        edit: CommentEdit,
    ) -> ReviewResult<Comment> {
        self.annotations.edit(comment_id, viewer, edit)
    }

    pub fn delete_comment(&self, viewer: &Actor, comment_id: &str) -> ReviewResult<()> {
        self.annotations.delete(comment_id, viewer)
    }

    /// Submit a comment carrying the lifecycle's captured voice note.
    ///
    /// On upload failure the typed text (when present) is submitted as a
    /// text-only comment instead; the user's words are never dropped.
    pub async fn submit_voice_feedback(
        &self,
        viewer: &Actor,
        lifecycle: &mut AudioFeedbackLifecycle,
        mut base: NewComment,
    ) -> ReviewResult<Comment> {
        match lifecycle.upload(&viewer.id, &self.session_id).await {
            Ok(path) => {
                base.audio_url = Some(path);
                let comment = self.annotations.add(viewer, base)?;
                lifecycle.attach_to(&comment.id)?;
                Ok(comment)
            }
            Err(e) if e.allows_text_fallback() && !base.content.trim().is_empty() => {
                warn!("Voice feedback unavailable ({}), submitting text only", e);
                self.annotations.add(viewer, base)
            }
            Err(e) => Err(e),
        }
    }

    /// Supervisor action: mark a ready session reviewed. Repeating the
    /// action is a no-op; any other starting status is rejected.
    pub fn mark_reviewed(&self, viewer: &Actor) -> ReviewResult<Session> {
        if viewer.role != UserRole::Supervisor {
            return Err(ReviewError::Forbidden(
                "Only supervisors can mark a session as reviewed".to_string(),
            ));
        }

        self.db
            .transition_session_status(&self.session_id, SessionStatus::Reviewed)
    }
}

fn load_segments(db: &DatabaseManager, session_id: &str) -> ReviewResult<Vec<TranscriptSegment>> {
    match db.get_transcript_for_session(session_id)? {
        Some(transcript) => Ok(db.get_transcript_segments(&transcript.id)?),
        None => Ok(Vec::new()),
    }
}

/// Create a session from an upload and kick off transcription.
///
/// Mirrors the upload flow: insert the pending session, store the recording,
/// remember its path, then hand the file to the transcription job.
pub async fn upload_session(
    db: Arc<DatabaseManager>,
    store: Arc<dyn ObjectStore>,
    engine: Arc<dyn TranscriptionEngine>,
    viewer: &Actor,
    upload: SessionUpload,
) -> ReviewResult<Session> {
    if upload.title.trim().is_empty()
        || upload.session_date.trim().is_empty()
        || upload.bytes.is_empty()
    {
        return Err(ReviewError::Validation(
            "Title, session date, and recording file are required".to_string(),
        ));
    }

    let mut session = Session::new(upload.title.trim(), &upload.session_date, &viewer.id);
    if let Some(description) = &upload.description {
        session = session.with_description(description);
    }
    db.create_session(&session)?;

    let file_path = session_recording_path(&viewer.id, &session.id, &upload.file_name);
    store
        .upload(
            SESSION_RECORDINGS_BUCKET,
            &file_path,
            upload.bytes,
            &upload.content_type,
        )
        .await?;

    db.set_session_recording_url(&session.id, &file_path)?;
    info!("Session {} uploaded, starting transcription", session.id);

    transcription::spawn(db.clone(), store, engine, session.id.clone(), file_path.clone());

    session.recording_url = Some(file_path);
    Ok(session)
}
