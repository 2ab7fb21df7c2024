// Sessions repository for counsel-review
// Handles CRUD operations for counseling sessions

use anyhow::{Context, Result};
use rusqlite::{params, Connection};

use super::models::{Session, SessionStatus};
use super::DatabaseManager;
use crate::error::{ReviewError, ReviewResult};

impl DatabaseManager {
    /// Create a new session
    pub fn create_session(&self, session: &Session) -> Result<String> {
        self.with_connection(|conn| create_session_impl(conn, session))
    }

    /// Get a session by ID
    pub fn get_session(&self, id: &str) -> Result<Option<Session>> {
        self.with_connection(|conn| get_session_impl(conn, id))
    }

    /// Get all sessions owned by a counselor (most recent first)
    pub fn get_sessions_for_counselor(&self, counselor_id: &str) -> Result<Vec<Session>> {
        self.with_connection(|conn| get_sessions_for_counselor_impl(conn, counselor_id))
    }

    /// Get all sessions (most recent first); the supervisor dashboard view
    pub fn get_all_sessions(&self) -> Result<Vec<Session>> {
        self.with_connection(|conn| get_all_sessions_impl(conn))
    }

    /// Record the storage path of the uploaded recording
    pub fn set_session_recording_url(&self, id: &str, recording_url: &str) -> Result<()> {
        self.with_connection(|conn| set_session_recording_url_impl(conn, id, recording_url))
    }

    /// Record the recording duration once known
    pub fn set_session_duration(&self, id: &str, duration_seconds: f64) -> Result<()> {
        self.with_connection(|conn| set_session_duration_impl(conn, id, duration_seconds))
    }

    /// Assign a supervisor to a session
    pub fn assign_supervisor(&self, id: &str, supervisor_id: &str) -> Result<()> {
        self.with_connection(|conn| assign_supervisor_impl(conn, id, supervisor_id))
    }

    /// Advance the session status, enforcing the forward-only machine.
    ///
    /// Re-applying the current status is a no-op (so "mark reviewed" twice
    /// does nothing); anything other than the immediate successor is
    /// rejected with `InvalidTransition`.
    pub fn transition_session_status(
        &self,
        id: &str,
        next: SessionStatus,
    ) -> ReviewResult<Session> {
        let session = self
            .get_session(id)?
            .ok_or_else(|| ReviewError::NotFound(format!("session {}", id)))?;

        if session.status == next {
            log::debug!("Session {} already {}, ignoring", id, next.as_str());
            return Ok(session);
        }

        session.status.transition(next)?;

        self.with_connection(|conn| update_session_status_impl(conn, id, next))?;

        log::info!(
            "Session {} status: {} -> {}",
            id,
            session.status.as_str(),
            next.as_str()
        );

        Ok(Session {
            status: next,
            ..session
        })
    }
}

fn create_session_impl(conn: &Connection, session: &Session) -> Result<String> {
    conn.execute(
        r#"
        INSERT INTO sessions (
            id, title, description, session_date, duration_seconds, status,
            counselor_id, supervisor_id, recording_url, created_at, updated_at
        ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)
        "#,
        params![
            session.id,
            session.title,
            session.description,
            session.session_date,
            session.duration_seconds,
            session.status.as_str(),
            session.counselor_id,
            session.supervisor_id,
            session.recording_url,
            session.created_at,
            session.updated_at,
        ],
    )
    .context("Failed to create session")?;

    Ok(session.id.clone())
}

fn read_session_row(row: &rusqlite::Row) -> rusqlite::Result<Session> {
    Ok(Session {
        id: row.get(0)?,
        title: row.get(1)?,
        description: row.get(2)?,
        session_date: row.get(3)?,
        duration_seconds: row.get(4)?,
        status: SessionStatus::from_str(&row.get::<_, String>(5)?),
        counselor_id: row.get(6)?,
        supervisor_id: row.get(7)?,
        recording_url: row.get(8)?,
        created_at: row.get(9)?,
        updated_at: row.get(10)?,
    })
}

const SESSION_COLUMNS: &str = "id, title, description, session_date, duration_seconds, status, \
                               counselor_id, supervisor_id, recording_url, created_at, updated_at";

fn get_session_impl(conn: &Connection, id: &str) -> Result<Option<Session>> {
    let mut stmt = conn
        .prepare(&format!("SELECT {} FROM sessions WHERE id = ?", SESSION_COLUMNS))
        .context("Failed to prepare get_session query")?;

    let result = stmt.query_row(params![id], read_session_row);

    match result {
        Ok(session) => Ok(Some(session)),
        Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
        Err(e) => Err(e).context("Failed to get session"),
    }
}

fn get_sessions_for_counselor_impl(conn: &Connection, counselor_id: &str) -> Result<Vec<Session>> {
    let mut stmt = conn
        .prepare(&format!(
            "SELECT {} FROM sessions WHERE counselor_id = ? ORDER BY created_at DESC",
            SESSION_COLUMNS
        ))
        .context("Failed to prepare get_sessions_for_counselor query")?;

    let sessions = stmt
        .query_map(params![counselor_id], read_session_row)
        .context("Failed to query counselor sessions")?;

    sessions
        .collect::<std::result::Result<Vec<_>, _>>()
        .context("Failed to collect counselor sessions")
}

fn get_all_sessions_impl(conn: &Connection) -> Result<Vec<Session>> {
    let mut stmt = conn
        .prepare(&format!(
            "SELECT {} FROM sessions ORDER BY created_at DESC",
            SESSION_COLUMNS
        ))
        .context("Failed to prepare get_all_sessions query")?;

    let sessions = stmt
        .query_map([], read_session_row)
        .context("Failed to query sessions")?;

    sessions
        .collect::<std::result::Result<Vec<_>, _>>()
        .context("Failed to collect sessions")
}

fn set_session_recording_url_impl(conn: &Connection, id: &str, recording_url: &str) -> Result<()> {
    conn.execute(
        "UPDATE sessions SET recording_url = ?, updated_at = datetime('now') WHERE id = ?",
        params![recording_url, id],
    )
    .context("Failed to set session recording url")?;

    Ok(())
}

fn set_session_duration_impl(conn: &Connection, id: &str, duration_seconds: f64) -> Result<()> {
    conn.execute(
        "UPDATE sessions SET duration_seconds = ?, updated_at = datetime('now') WHERE id = ?",
        params![duration_seconds, id],
    )
    .context("Failed to set session duration")?;

    Ok(())
}

fn assign_supervisor_impl(conn: &Connection, id: &str, supervisor_id: &str) -> Result<()> {
    conn.execute(
        "UPDATE sessions SET supervisor_id = ?, updated_at = datetime('now') WHERE id = ?",
        params![supervisor_id, id],
    )
    .context("Failed to assign supervisor")?;

    Ok(())
}

fn update_session_status_impl(conn: &Connection, id: &str, status: SessionStatus) -> Result<()> {
    conn.execute(
        "UPDATE sessions SET status = ?, updated_at = datetime('now') WHERE id = ?",
        params![status.as_str(), id],
    )
    .context("Failed to update session status")?;

    Ok(())
}
