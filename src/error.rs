// Domain error taxonomy for counsel-review
//
// Persistence internals keep using anyhow (wrapped transparently here);
// everything user-recoverable gets its own variant so callers can branch
// on the failure kind.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ReviewError {
    #[error("Validation failed: {0}")]
    Validation(String),

    #[error("Forbidden: {0}")]
    Forbidden(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Selected text not found in segment")]
    AnchorNotFound,

    #[error("Segment has no usable time span")]
    DegenerateSegment,

    #[error("Microphone unavailable: {0}")]
    DeviceUnavailable(String),

    #[error("Upload failed: {0}")]
    UploadError(String),

    #[error("Invalid session status transition: {from} -> {to}")]
    InvalidTransition { from: String, to: String },

    #[error(transparent)]
    Storage(#[from] anyhow::Error),
}

impl ReviewError {
    /// True when the failure concerns only the audio path and the caller
    /// should fall back to a text-only submission instead of aborting.
    pub fn allows_text_fallback(&self) -> bool {
        matches!(
            self,
            ReviewError::UploadError(_) | ReviewError::DeviceUnavailable(_)
        )
    }

    /// True when the failure concerns only the anchor estimate and the
    /// caller should retry with a coarser anchor.
    pub fn allows_coarser_anchor(&self) -> bool {
        matches!(
            self,
            ReviewError::AnchorNotFound | ReviewError::DegenerateSegment
        )
    }
}

pub type ReviewResult<T> = std::result::Result<T, ReviewError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_audio_failures_allow_text_fallback() {
        assert!(ReviewError::UploadError("timeout".into()).allows_text_fallback());
        assert!(ReviewError::DeviceUnavailable("no mic".into()).allows_text_fallback());
        assert!(!ReviewError::Forbidden("not yours".into()).allows_text_fallback());
    }

    #[test]
    fn test_anchor_failures_allow_coarser_anchor() {
        assert!(ReviewError::AnchorNotFound.allows_coarser_anchor());
        assert!(ReviewError::DegenerateSegment.allows_coarser_anchor());
        assert!(!ReviewError::Validation("empty".into()).allows_coarser_anchor());
    }
}
