// Feedback module for counsel-review
//
// Lifecycle of a voice note attached to a comment:
//
//   Idle -> Recording -> Captured -> Uploading -> Attached
//
// with Recording -> Idle on cancel and Captured -> Recording on re-record.
// The microphone is a shared resource: one capture per process, enforced by
// an atomic guard. Upload failures return the lifecycle to Captured so the
// caller can retry or fall back to a text-only comment.

pub mod capture;

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use log::{info, warn};

use crate::error::{ReviewError, ReviewResult};
use crate::storage::{feedback_recording_path, ObjectStore, FEEDBACK_RECORDINGS_BUCKET};

pub use capture::{ActiveCapture, AudioBlob, CpalMicrophone, RecordingDevice};

// One microphone capture per client process
static CAPTURE_ACTIVE: AtomicBool = AtomicBool::new(false);

/// Check whether any lifecycle currently holds the microphone
pub fn capture_active() -> bool {
    CAPTURE_ACTIVE.load(Ordering::SeqCst)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FeedbackState {
    Idle,
    Recording,
    Captured,
    Uploading,
    Attached,
}

pub struct AudioFeedbackLifecycle {
    device: Arc<dyn RecordingDevice>,
    store: Arc<dyn ObjectStore>,
    state: FeedbackState,
    active: Option<Box<dyn ActiveCapture>>,
    blob: Option<AudioBlob>,
    uploaded_path: Option<String>,
    attached_comment: Option<String>,
}

impl AudioFeedbackLifecycle {
    pub fn new(device: Arc<dyn RecordingDevice>, store: Arc<dyn ObjectStore>) -> Self {
        Self {
            device,
            store,
            state: FeedbackState::Idle,
            active: None,
            blob: None,
            uploaded_path: None,
            attached_comment: None,
        }
    }

    pub fn state(&self) -> FeedbackState {
        self.state
    }

    pub fn blob(&self) -> Option<&AudioBlob> {
        self.blob.as_ref()
    }

    pub fn uploaded_path(&self) -> Option<&str> {
        self.uploaded_path.as_deref()
    }

    pub fn attached_comment(&self) -> Option<&str> {
        self.attached_comment.as_deref()
    }

    /// The submit button stays disabled while audio mode is selected and no
    /// finished capture exists.
    pub fn ready_to_submit(&self) -> bool {
        matches!(self.state, FeedbackState::Captured) && self.blob.is_some()
    }

    /// Begin capturing. Valid from Idle, or from Captured as a re-record
    /// (which discards the previous blob). Fails with `DeviceUnavailable`
    /// when another capture already holds the microphone or the device
    /// cannot be acquired.
    pub fn start_capture(&mut self) -> ReviewResult<()> {
        match self.state {
            FeedbackState::Idle | FeedbackState::Captured => {}
            _ => {
                return Err(ReviewError::DeviceUnavailable(format!(
                    "cannot start capture from {:?}",
                    self.state
                )))
            }
        }

        if CAPTURE_ACTIVE
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .is_err()
        {
            return Err(ReviewError::DeviceUnavailable(
                "another capture is already in progress".to_string(),
            ));
        }

        match self.device.start() {
            Ok(active) => {
                if self.blob.take().is_some() {
                    info!("Re-recording, previous capture discarded");
                }
                self.uploaded_path = None;
                self.active = Some(active);
                self.state = FeedbackState::Recording;
                Ok(())
            }
            Err(e) => {
                CAPTURE_ACTIVE.store(false, Ordering::SeqCst);
                Err(e)
            }
        }
    }

    /// Finish the capture and keep the blob for upload.
    pub fn stop_capture(&mut self) -> ReviewResult<&AudioBlob> {
        if self.state != FeedbackState::Recording {
            return Err(ReviewError::Validation(format!(
                "no capture in progress (state {:?})",
                self.state
            )));
        }

        let active = self.active.take().expect("recording state without capture");
        let result = active.stop();
        CAPTURE_ACTIVE.store(false, Ordering::SeqCst);

        match result {
            Ok(blob) => {
                self.blob = Some(blob);
                self.state = FeedbackState::Captured;
                Ok(self.blob.as_ref().unwrap())
            }
            Err(e) => {
                self.state = FeedbackState::Idle;
                Err(e)
            }
        }
    }

    /// Abort the capture and discard everything recorded so far.
    pub fn cancel(&mut self) -> ReviewResult<()> {
        if self.state != FeedbackState::Recording {
            return Err(ReviewError::Validation(format!(
                "no capture in progress (state {:?})",
                self.state
            )));
        }

        let active = self.active.take().expect("recording state without capture");
        active.cancel();
        CAPTURE_ACTIVE.store(false, Ordering::SeqCst);
        self.state = FeedbackState::Idle;
        Ok(())
    }

    /// WAV-encode the captured blob and upload it to the feedback bucket,
    /// returning the storage path to hang on the comment.
    ///
    /// While the upload is pending the lifecycle sits in `Uploading`, which
    /// doubles as the duplicate-submit lock. On failure the state returns to
    /// `Captured`; the error is one the caller may answer with a text-only
    /// fallback.
    pub async fn upload(&mut self, user_id: &str, session_id: &str) -> ReviewResult<String> {
        if self.state == FeedbackState::Uploading {
            return Err(ReviewError::Validation(
                "an upload is already in progress".to_string(),
            ));
        }
        if self.state != FeedbackState::Captured {
            return Err(ReviewError::Validation(format!(
                "nothing captured to upload (state {:?})",
                self.state
            )));
        }

        let blob = self.blob.as_ref().expect("captured state without blob");
        let bytes = blob.to_wav_bytes()?;
        let path = feedback_recording_path(user_id, session_id);

        self.state = FeedbackState::Uploading;
        match self
            .store
            .upload(FEEDBACK_RECORDINGS_BUCKET, &path, bytes, "audio/wav")
            .await
        {
            Ok(()) => {
                self.uploaded_path = Some(path.clone());
                Ok(path)
            }
            Err(e) => {
                warn!("Voice feedback upload failed: {}", e);
                self.state = FeedbackState::Captured;
                Err(e)
            }
        }
    }

    /// Bind the uploaded recording to its comment, completing the lifecycle.
    pub fn attach_to(&mut self, comment_id: &str) -> ReviewResult<()> {
        if self.state != FeedbackState::Uploading || self.uploaded_path.is_none() {
            return Err(ReviewError::Validation(format!(
                "no uploaded recording to attach (state {:?})",
                self.state
            )));
        }

        self.attached_comment = Some(comment_id.to_string());
        self.state = FeedbackState::Attached;
        info!(
            "Voice feedback {} attached to comment {}",
            self.uploaded_path.as_deref().unwrap_or("?"),
            comment_id
        );
        Ok(())
    }
}
