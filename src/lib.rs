// counsel-review - counseling session review core
//
// A counselor uploads a session recording; an external transcription
// collaborator turns it into time-aligned segments; a supervisor attaches
// text or voice feedback anchored to the session, a segment, or a timestamp
// range, with one level of threaded replies. This crate is the backend core
// around that flow:
//
// - Transcript timeline (selection-to-time mapping, cursor location,
//   playback transport)
// - Annotation model (role/ownership gating, threading, anchor grouping)
// - Voice feedback lifecycle (capture, upload, attach)
// - SQLite persistence and the async transcription job
//
// Speech-to-text itself, blob storage, and authentication are collaborators
// behind traits; nothing here renders UI.

// Core modules
pub mod annotations;
pub mod database;
pub mod error;
pub mod feedback;
pub mod state;
pub mod storage;
pub mod timeline;
pub mod transcription;
pub mod view;

pub use annotations::{AnnotationStore, CommentThread, SessionAnnotations};
pub use database::DatabaseManager;
pub use error::{ReviewError, ReviewResult};
pub use feedback::{AudioFeedbackLifecycle, FeedbackState};
pub use state::AppState;
pub use timeline::{PlaybackController, PlaybackEvent};
pub use view::{ActionOutcome, SessionAnnotationView, SessionView};
