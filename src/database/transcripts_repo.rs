// Transcripts repository for counsel-review
// Handles transcript and segment persistence

use anyhow::{Context, Result};
use rusqlite::{params, Connection};

use super::models::{Transcript, TranscriptSegment};
use super::DatabaseManager;

impl DatabaseManager {
    /// Insert a transcript together with its segments in one transaction.
    /// The transcription job calls this exactly once per session.
    pub fn create_transcript_with_segments(
        &self,
        transcript: &Transcript,
        segments: &[TranscriptSegment],
    ) -> Result<String> {
        self.with_connection(|conn| create_transcript_with_segments_impl(conn, transcript, segments))
    }

    /// Get the transcript for a session
    pub fn get_transcript_for_session(&self, session_id: &str) -> Result<Option<Transcript>> {
        self.with_connection(|conn| get_transcript_for_session_impl(conn, session_id))
    }

    /// Get all segments of a transcript, ordered by segment_index
    pub fn get_transcript_segments(&self, transcript_id: &str) -> Result<Vec<TranscriptSegment>> {
        self.with_connection(|conn| get_transcript_segments_impl(conn, transcript_id))
    }

    /// Get a single segment by ID
    pub fn get_segment(&self, segment_id: &str) -> Result<Option<TranscriptSegment>> {
        self.with_connection(|conn| get_segment_impl(conn, segment_id))
    }
}

fn create_transcript_with_segments_impl(
    conn: &Connection,
    transcript: &Transcript,
    segments: &[TranscriptSegment],
) -> Result<String> {
    let tx = conn
        .unchecked_transaction()
        .context("Failed to start transcript transaction")?;

    tx.execute(
        r#"
        INSERT INTO transcripts (id, session_id, full_text, created_at)
        VALUES (?1, ?2, ?3, ?4)
        "#,
        params![
            transcript.id,
            transcript.session_id,
            transcript.full_text,
            transcript.created_at,
        ],
    )
    .context("Failed to insert transcript")?;

    for segment in segments {
        tx.execute(
            r#"
            INSERT INTO transcript_segments (
                id, transcript_id, segment_index, start_time, end_time, text, speaker
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
            "#,
            params![
                segment.id,
                segment.transcript_id,
                segment.segment_index,
                segment.start_time,
                segment.end_time,
                segment.text,
                segment.speaker,
            ],
        )
        .context("Failed to insert transcript segment")?;
    }

    tx.commit().context("Failed to commit transcript")?;
    Ok(transcript.id.clone())
}

fn get_transcript_for_session_impl(
    conn: &Connection,
    session_id: &str,
) -> Result<Option<Transcript>> {
    let mut stmt = conn
        .prepare(
            "SELECT id, session_id, full_text, created_at FROM transcripts WHERE session_id = ?",
        )
        .context("Failed to prepare get_transcript_for_session query")?;

    let result = stmt.query_row(params![session_id], |row| {
        Ok(Transcript {
            id: row.get(0)?,
            session_id: row.get(1)?,
            full_text: row.get(2)?,
            created_at: row.get(3)?,
        })
    });

    match result {
        Ok(transcript) => Ok(Some(transcript)),
        Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
        Err(e) => Err(e).context("Failed to get transcript"),
    }
}

fn read_segment_row(row: &rusqlite::Row) -> rusqlite::Result<TranscriptSegment> {
    Ok(TranscriptSegment {
        id: row.get(0)?,
        transcript_id: row.get(1)?,
        segment_index: row.get(2)?,
        start_time: row.get(3)?,
        end_time: row.get(4)?,
        text: row.get(5)?,
        speaker: row.get(6)?,
    })
}

fn get_transcript_segments_impl(
    conn: &Connection,
    transcript_id: &str,
) -> Result<Vec<TranscriptSegment>> {
    let mut stmt = conn
        .prepare(
            r#"
            SELECT id, transcript_id, segment_index, start_time, end_time, text, speaker
            FROM transcript_segments
            WHERE transcript_id = ?
            ORDER BY segment_index ASC
            "#,
        )
        .context("Failed to prepare get_transcript_segments query")?;

    let segments = stmt
        .query_map(params![transcript_id], read_segment_row)
        .context("Failed to query transcript segments")?;

    segments
        .collect::<std::result::Result<Vec<_>, _>>()
        .context("Failed to collect transcript segments")
}

fn get_segment_impl(conn: &Connection, segment_id: &str) -> Result<Option<TranscriptSegment>> {
    let mut stmt = conn
        .prepare(
            r#"
            SELECT id, transcript_id, segment_index, start_time, end_time, text, speaker
            FROM transcript_segments
            WHERE id = ?
            "#,
        )
        .context("Failed to prepare get_segment query")?;

    let result = stmt.query_row(params![segment_id], read_segment_row);

    match result {
        Ok(segment) => Ok(Some(segment)),
        Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
        Err(e) => Err(e).context("Failed to get segment"),
    }
}
