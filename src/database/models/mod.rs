// Database models - Re-exports all domain-specific models
//
// This module is split into focused files by domain:
// - user.rs: Users and the acting identity
// - session.rs: Counseling sessions and their status machine
// - transcript.rs: Transcripts and time-aligned segments
// - comment.rs: Feedback comments and their anchors

mod comment;
mod session;
mod transcript;
mod user;

pub use comment::{AnchorKind, Comment, CommentEdit, NewComment, AUDIO_PLACEHOLDER};
pub use session::{Session, SessionStatus};
pub use transcript::{SegmentDraft, Transcript, TranscriptSegment};
pub use user::{Actor, User, UserRole};
