// Database migrations for counsel-review
// Creates and updates the database schema

use anyhow::{Context, Result};
use rusqlite::Connection;

/// Current schema version
const SCHEMA_VERSION: i32 = 2;

/// Run all necessary migrations to bring the database up to date
pub fn run_migrations(conn: &Connection) -> Result<()> {
    let current_version = get_schema_version(conn)?;

    if current_version < 1 {
        migrate_v1(conn)?;
    }

    if current_version < 2 {
        migrate_v2(conn)?;
    }

    Ok(())
}

/// Get the current schema version from the database
fn get_schema_version(conn: &Connection) -> Result<i32> {
    // Check if schema_version table exists
    let table_exists: bool = conn
        .query_row(
            "SELECT COUNT(*) > 0 FROM sqlite_master WHERE type='table' AND name='schema_version'",
            [],
            |row| row.get(0),
        )
        .unwrap_or(false);

    if !table_exists {
        return Ok(0);
    }

    let version: i32 = conn
        .query_row("SELECT MAX(version) FROM schema_version", [], |row| {
            row.get(0)
        })
        .unwrap_or(0);

    Ok(version)
}

/// Initial schema creation (version 1)
fn migrate_v1(conn: &Connection) -> Result<()> {
    log::info!("Running database migration v1");

    conn.execute_batch(
        r#"
        -- Schema version tracking
        CREATE TABLE IF NOT EXISTS schema_version (
            version INTEGER PRIMARY KEY,
            applied_at TEXT NOT NULL DEFAULT (datetime('now'))
        );

        -- Users table: counselors and supervisors
        CREATE TABLE IF NOT EXISTS users (
            id TEXT PRIMARY KEY NOT NULL,
            full_name TEXT NOT NULL,
            email TEXT NOT NULL UNIQUE,
            role TEXT NOT NULL DEFAULT 'counselor',
            created_at TEXT NOT NULL DEFAULT (datetime('now'))
        );

        -- Sessions table: one row per uploaded counseling session
        CREATE TABLE IF NOT EXISTS sessions (
            id TEXT PRIMARY KEY NOT NULL,
            title TEXT NOT NULL,
            description TEXT,
            session_date TEXT NOT NULL,
            duration_seconds REAL,
            status TEXT NOT NULL DEFAULT 'pending',
            counselor_id TEXT NOT NULL,
            supervisor_id TEXT,
            recording_url TEXT,
            created_at TEXT NOT NULL DEFAULT (datetime('now')),
            updated_at TEXT NOT NULL DEFAULT (datetime('now')),
            FOREIGN KEY (counselor_id) REFERENCES users(id),
            FOREIGN KEY (supervisor_id) REFERENCES users(id)
        );

        CREATE INDEX IF NOT EXISTS idx_sessions_counselor_id
        ON sessions(counselor_id);

        -- Transcripts table: 1:1 with sessions, created by the transcription job
        CREATE TABLE IF NOT EXISTS transcripts (
            id TEXT PRIMARY KEY NOT NULL,
            session_id TEXT NOT NULL UNIQUE,
            full_text TEXT NOT NULL,
            created_at TEXT NOT NULL DEFAULT (datetime('now')),
            FOREIGN KEY (session_id) REFERENCES sessions(id) ON DELETE CASCADE
        );

        -- Transcript segments table: ordered, time-aligned transcript slices
        CREATE TABLE IF NOT EXISTS transcript_segments (
            id TEXT PRIMARY KEY NOT NULL,
            transcript_id TEXT NOT NULL,
            segment_index INTEGER NOT NULL,
            start_time REAL NOT NULL,
            end_time REAL NOT NULL,
            text TEXT NOT NULL,
            speaker TEXT,
            created_at TEXT NOT NULL DEFAULT (datetime('now')),
            FOREIGN KEY (transcript_id) REFERENCES transcripts(id) ON DELETE CASCADE
        );

        CREATE INDEX IF NOT EXISTS idx_transcript_segments_transcript_id
        ON transcript_segments(transcript_id);

        CREATE INDEX IF NOT EXISTS idx_transcript_segments_order
        ON transcript_segments(transcript_id, segment_index);

        INSERT INTO schema_version (version) VALUES (1);
        "#,
    )
    .context("Failed to run migration v1")?;

    Ok(())
}

/// Comments and threading (version 2)
fn migrate_v2(conn: &Connection) -> Result<()> {
    log::info!("Running database migration v2");

    conn.execute_batch(
        r#"
        -- Comments table: feedback anchored to sessions, segments, or time ranges.
        -- Deleting a parent comment cascades to its replies.
        CREATE TABLE IF NOT EXISTS comments (
            id TEXT PRIMARY KEY NOT NULL,
            session_id TEXT NOT NULL,
            segment_id TEXT,
            user_id TEXT NOT NULL,
            parent_id TEXT,
            content TEXT NOT NULL,
            start_time REAL,
            end_time REAL,
            has_audio INTEGER NOT NULL DEFAULT 0,
            audio_url TEXT,
            created_at TEXT NOT NULL DEFAULT (datetime('now')),
            updated_at TEXT NOT NULL DEFAULT (datetime('now')),
            FOREIGN KEY (session_id) REFERENCES sessions(id) ON DELETE CASCADE,
            FOREIGN KEY (segment_id) REFERENCES transcript_segments(id),
            FOREIGN KEY (user_id) REFERENCES users(id),
            FOREIGN KEY (parent_id) REFERENCES comments(id) ON DELETE CASCADE
        );

        CREATE INDEX IF NOT EXISTS idx_comments_session_id
        ON comments(session_id);

        CREATE INDEX IF NOT EXISTS idx_comments_parent_id
        ON comments(parent_id);

        INSERT INTO schema_version (version) VALUES (2);
        "#,
    )
    .context("Failed to run migration v2")?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_migrations_are_idempotent() {
        let conn = Connection::open_in_memory().unwrap();
        run_migrations(&conn).unwrap();
        run_migrations(&conn).unwrap();

        let version = get_schema_version(&conn).unwrap();
        assert_eq!(version, SCHEMA_VERSION);
    }
}
