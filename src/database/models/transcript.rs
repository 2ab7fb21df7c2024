// Database models - Transcript
use serde::{Deserialize, Serialize};

/// A session transcript (1:1 with a session, immutable once created)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Transcript {
    pub id: String,
    pub session_id: String,
    /// All segments joined as "Speaker: text" lines
    pub full_text: String,
    pub created_at: String,
}

impl Transcript {
    pub fn new(session_id: &str, full_text: &str) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            session_id: session_id.to_string(),
            full_text: full_text.to_string(),
            created_at: chrono::Utc::now().to_rfc3339(),
        }
    }
}

/// A time-bounded slice of a transcript with speaker-attributed text.
///
/// Segments are non-overlapping, sorted by `segment_index` (equivalently by
/// `start_time`), and immutable once the transcription job has inserted them.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TranscriptSegment {
    pub id: String,
    pub transcript_id: String,
    pub segment_index: i64,
    pub start_time: f64,
    pub end_time: f64,
    pub text: String,
    #[serde(default)]
    pub speaker: Option<String>,
}

impl TranscriptSegment {
    pub fn duration(&self) -> f64 {
        self.end_time - self.start_time
    }

    /// Whether `time` falls inside this segment (boundaries inclusive).
    pub fn contains(&self, time: f64) -> bool {
        self.start_time <= time && time <= self.end_time
    }
}

/// Segment payload produced by a transcription engine, before it is bound
/// to a transcript row.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SegmentDraft {
    pub segment_index: i64,
    pub start_time: f64,
    pub end_time: f64,
    pub text: String,
    pub speaker: Option<String>,
}

impl SegmentDraft {
    pub fn into_segment(self, transcript_id: &str) -> TranscriptSegment {
        TranscriptSegment {
            id: uuid::Uuid::new_v4().to_string(),
            transcript_id: transcript_id.to_string(),
            segment_index: self.segment_index,
            start_time: self.start_time,
            end_time: self.end_time,
            text: self.text,
            speaker: self.speaker,
        }
    }
}
