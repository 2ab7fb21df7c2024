// Transcription module for counsel-review
//
// Speech-to-text itself is an external collaborator behind the
// TranscriptionEngine trait; this module owns the job around it: walk the
// session status forward, run the engine against the recording's public URL,
// and persist the transcript with its segments in one transaction.

use std::sync::Arc;

use async_trait::async_trait;
use log::{error, info};
use tokio::task::JoinHandle;

use crate::database::models::{SegmentDraft, SessionStatus, Transcript};
use crate::database::DatabaseManager;
use crate::error::ReviewResult;
use crate::storage::{ObjectStore, SESSION_RECORDINGS_BUCKET};

/// What an engine produces for one recording
#[derive(Debug, Clone)]
pub struct TranscriptionOutput {
    pub segments: Vec<SegmentDraft>,
}

#[async_trait]
pub trait TranscriptionEngine: Send + Sync {
    async fn transcribe(&self, audio_url: &str) -> ReviewResult<TranscriptionOutput>;
}

/// Engine returning a canned segment list.
///
/// Stands in for a hosted speech-to-text provider in demos and tests until
/// a real provider is configured.
pub struct StaticTranscriptionEngine {
    segments: Vec<SegmentDraft>,
}

impl StaticTranscriptionEngine {
    pub fn new(segments: Vec<SegmentDraft>) -> Self {
        Self { segments }
    }

    /// The canned counseling exchange used throughout the test suite
    pub fn counseling_demo() -> Self {
        let lines: [(f64, f64, &str, &str); 7] = [
            (0.0, 10.5, "Counselor", "Hello, how are you feeling today?"),
            (
                11.2,
                20.8,
                "Client",
                "I've been feeling anxious lately, especially at work.",
            ),
            (
                21.5,
                35.2,
                "Counselor",
                "I see. Can you tell me more about what happens at work that triggers your anxiety?",
            ),
            (
                36.0,
                55.3,
                "Client",
                "Well, whenever I have to present in meetings, I feel my heart racing and I start \
                 to worry that I'll make a mistake or that people will judge me negatively.",
            ),
            (
                56.1,
                75.4,
                "Counselor",
                "That sounds challenging. It's common to feel anxious about public speaking. Have \
                 you noticed any physical symptoms besides the racing heart?",
            ),
            (
                76.2,
                95.7,
                "Client",
                "Yes, sometimes I get sweaty palms and feel a tightness in my chest. There are \
                 times when I worry it might be a panic attack coming on.",
            ),
            (
                96.5,
                120.0,
                "Counselor",
                "Thank you for sharing that. Let's talk about some techniques that might help you \
                 manage these feelings when they come up. Have you tried any relaxation techniques \
                 before?",
            ),
        ];

        let segments = lines
            .iter()
            .enumerate()
            .map(|(index, (start, end, speaker, text))| SegmentDraft {
                segment_index: index as i64,
                start_time: *start,
                end_time: *end,
                text: text.to_string(),
                speaker: Some(speaker.to_string()),
            })
            .collect();

        Self::new(segments)
    }
}

#[async_trait]
impl TranscriptionEngine for StaticTranscriptionEngine {
    async fn transcribe(&self, audio_url: &str) -> ReviewResult<TranscriptionOutput> {
        info!("Static transcription for {}", audio_url);
        Ok(TranscriptionOutput {
            segments: self.segments.clone(),
        })
    }
}

/// Join segments into the transcript's full text, one "Speaker: text" line
/// per segment
pub fn assemble_full_text(segments: &[SegmentDraft]) -> String {
    segments
        .iter()
        .map(|s| match &s.speaker {
            Some(speaker) => format!("{}: {}", speaker, s.text),
            None => s.text.clone(),
        })
        .collect::<Vec<_>>()
        .join("\n")
}

/// Run the transcription job for one session.
///
/// On failure the session is left in `transcribing` and the error is
/// propagated; the job can be re-run once the cause clears.
pub async fn run(
    db: &DatabaseManager,
    store: &dyn ObjectStore,
    engine: &dyn TranscriptionEngine,
    session_id: &str,
    file_path: &str,
) -> ReviewResult<String> {
    db.transition_session_status(session_id, SessionStatus::Transcribing)?;

    let audio_url = store.public_url(SESSION_RECORDINGS_BUCKET, file_path);
    let output = engine.transcribe(&audio_url).await?;

    let full_text = assemble_full_text(&output.segments);
    let transcript = Transcript::new(session_id, &full_text);
    let segments: Vec<_> = output
        .segments
        .into_iter()
        .map(|draft| draft.into_segment(&transcript.id))
        .collect();

    db.create_transcript_with_segments(&transcript, &segments)?;
    db.transition_session_status(session_id, SessionStatus::Ready)?;

    info!(
        "Transcription complete for session {}: {} segments",
        session_id,
        segments.len()
    );

    Ok(transcript.id)
}

/// Fire-and-forget variant; the caller keeps only the handle.
pub fn spawn(
    db: Arc<DatabaseManager>,
    store: Arc<dyn ObjectStore>,
    engine: Arc<dyn TranscriptionEngine>,
    session_id: String,
    file_path: String,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        if let Err(e) = run(&db, store.as_ref(), engine.as_ref(), &session_id, &file_path).await {
            error!("Transcription job for session {} failed: {}", session_id, e);
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::database::models::{Session, User, UserRole};
    use crate::error::ReviewError;
    use crate::storage::FsObjectStore;
    use tempfile::tempdir;

    fn fixture() -> (tempfile::TempDir, Arc<DatabaseManager>, String) {
        let dir = tempdir().unwrap();
        let db = Arc::new(DatabaseManager::new(dir.path().join("test.db")).unwrap());

        let counselor = User::new("Counselor", "c@example.com", UserRole::Counselor);
        db.create_user(&counselor).unwrap();

        let session = Session::new("Session", "2025-03-10T09:00:00Z", &counselor.id);
        db.create_session(&session).unwrap();
        (dir, db, session.id)
    }

    struct BrokenEngine;

    #[async_trait]
    impl TranscriptionEngine for BrokenEngine {
        async fn transcribe(&self, _audio_url: &str) -> ReviewResult<TranscriptionOutput> {
            Err(ReviewError::UploadError("provider offline".to_string()))
        }
    }

    #[tokio::test]
    async fn test_job_walks_status_and_persists_transcript() {
        let (dir, db, session_id) = fixture();
        let store = FsObjectStore::new(dir.path());
        let engine = StaticTranscriptionEngine::counseling_demo();

        let transcript_id = run(&db, &store, &engine, &session_id, "u/s/rec.wav")
            .await
            .unwrap();

        let session = db.get_session(&session_id).unwrap().unwrap();
        assert_eq!(session.status, SessionStatus::Ready);

        let transcript = db.get_transcript_for_session(&session_id).unwrap().unwrap();
        assert_eq!(transcript.id, transcript_id);
        assert!(transcript
            .full_text
            .starts_with("Counselor: Hello, how are you feeling today?"));

        let segments = db.get_transcript_segments(&transcript_id).unwrap();
        assert_eq!(segments.len(), 7);
        assert!(segments.windows(2).all(|w| {
            w[0].segment_index < w[1].segment_index && w[0].end_time <= w[1].start_time
        }));
    }

    #[tokio::test]
    async fn test_failed_engine_leaves_session_transcribing() {
        let (dir, db, session_id) = fixture();
        let store = FsObjectStore::new(dir.path());

        let err = run(&db, &store, &BrokenEngine, &session_id, "u/s/rec.wav")
            .await
            .unwrap_err();
        assert!(matches!(err, ReviewError::UploadError(_)));

        let session = db.get_session(&session_id).unwrap().unwrap();
        assert_eq!(session.status, SessionStatus::Transcribing);
        assert!(db.get_transcript_for_session(&session_id).unwrap().is_none());
    }

    #[tokio::test]
    async fn test_job_refuses_non_pending_session() {
        let (dir, db, session_id) = fixture();
        let store = FsObjectStore::new(dir.path());
        let engine = StaticTranscriptionEngine::counseling_demo();

        run(&db, &store, &engine, &session_id, "u/s/rec.wav")
            .await
            .unwrap();

        // Session is now ready; a second run must not regress it
        let err = run(&db, &store, &engine, &session_id, "u/s/rec.wav")
            .await
            .unwrap_err();
        assert!(matches!(err, ReviewError::InvalidTransition { .. }));
    }

    #[test]
    fn test_full_text_assembly() {
        let segments = vec![
            SegmentDraft {
                segment_index: 0,
                start_time: 0.0,
                end_time: 1.0,
                text: "Hello".to_string(),
                speaker: Some("Counselor".to_string()),
            },
            SegmentDraft {
                segment_index: 1,
                start_time: 1.0,
                end_time: 2.0,
                text: "Hi".to_string(),
                speaker: None,
            },
        ];

        assert_eq!(assemble_full_text(&segments), "Counselor: Hello\nHi");
    }
}
