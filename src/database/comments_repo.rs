// Comments repository for counsel-review
// Handles row-level CRUD for feedback comments; the domain rules
// (ownership, role gating, threading) live in the annotations module.

use anyhow::{Context, Result};
use rusqlite::{params, Connection};

use super::models::Comment;
use super::DatabaseManager;

impl DatabaseManager {
    /// Insert a comment row
    pub fn insert_comment(&self, comment: &Comment) -> Result<String> {
        self.with_connection(|conn| insert_comment_impl(conn, comment))
    }

    /// Get a comment by ID
    pub fn get_comment(&self, id: &str) -> Result<Option<Comment>> {
        self.with_connection(|conn| get_comment_impl(conn, id))
    }

    /// Get all comments for a session ordered by creation time
    pub fn get_comments_for_session(&self, session_id: &str) -> Result<Vec<Comment>> {
        self.with_connection(|conn| get_comments_for_session_impl(conn, session_id))
    }

    /// Update content and bump updated_at; anchors never change and any
    /// voice attachment is superseded by the typed body
    pub fn update_comment_content(&self, id: &str, content: &str) -> Result<()> {
        self.with_connection(|conn| update_comment_content_impl(conn, id, content))
    }

    /// Replace the voice attachment and bump updated_at
    pub fn update_comment_audio(&self, id: &str, content: &str, audio_url: &str) -> Result<()> {
        self.with_connection(|conn| update_comment_audio_impl(conn, id, content, audio_url))
    }

    /// Delete a comment row; replies cascade at the schema level
    pub fn delete_comment(&self, id: &str) -> Result<()> {
        self.with_connection(|conn| delete_comment_impl(conn, id))
    }
}

fn insert_comment_impl(conn: &Connection, comment: &Comment) -> Result<String> {
    conn.execute(
        r#"
        INSERT INTO comments (
            id, session_id, segment_id, user_id, parent_id, content,
            start_time, end_time, has_audio, audio_url, created_at, updated_at
        ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12)
        "#,
        params![
            comment.id,
            comment.session_id,
            comment.segment_id,
            comment.user_id,
            comment.parent_id,
            comment.content,
            comment.start_time,
            comment.end_time,
            comment.has_audio as i32,
            comment.audio_url,
            comment.created_at,
            comment.updated_at,
        ],
    )
    .context("Failed to insert comment")?;

    Ok(comment.id.clone())
}

fn read_comment_row(row: &rusqlite::Row) -> rusqlite::Result<Comment> {
    Ok(Comment {
        id: row.get(0)?,
        session_id: row.get(1)?,
        segment_id: row.get(2)?,
        user_id: row.get(3)?,
        parent_id: row.get(4)?,
        content: row.get(5)?,
        start_time: row.get(6)?,
        end_time: row.get(7)?,
        has_audio: row.get::<_, i32>(8)? != 0,
        audio_url: row.get(9)?,
        created_at: row.get(10)?,
        updated_at: row.get(11)?,
    })
}

const COMMENT_COLUMNS: &str = "id, session_id, segment_id, user_id, parent_id, content, \
                               start_time, end_time, has_audio, audio_url, created_at, updated_at";

fn get_comment_impl(conn: &Connection, id: &str) -> Result<Option<Comment>> {
    let mut stmt = conn
        .prepare(&format!("SELECT {} FROM comments WHERE id = ?", COMMENT_COLUMNS))
        .context("Failed to prepare get_comment query")?;

    let result = stmt.query_row(params![id], read_comment_row);

    match result {
        Ok(comment) => Ok(Some(comment)),
        Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
        Err(e) => Err(e).context("Failed to get comment"),
    }
}

fn get_comments_for_session_impl(conn: &Connection, session_id: &str) -> Result<Vec<Comment>> {
    let mut stmt = conn
        .prepare(&format!(
            "SELECT {} FROM comments WHERE session_id = ? ORDER BY created_at ASC",
            COMMENT_COLUMNS
        ))
        .context("Failed to prepare get_comments_for_session query")?;

    let comments = stmt
        .query_map(params![session_id], read_comment_row)
        .context("Failed to query session comments")?;

    comments
        .collect::<std::result::Result<Vec<_>, _>>()
        .context("Failed to collect session comments")
}

fn update_comment_content_impl(conn: &Connection, id: &str, content: &str) -> Result<()> {
    conn.execute(
        r#"
        UPDATE comments
        SET content = ?, has_audio = 0, audio_url = NULL, updated_at = datetime('now')
        WHERE id = ?
        "#,
        params![content, id],
    )
    .context("Failed to update comment content")?;

    Ok(())
}

fn update_comment_audio_impl(
    conn: &Connection,
    id: &str,
    content: &str,
    audio_url: &str,
) -> Result<()> {
    conn.execute(
        r#"
        UPDATE comments
        SET content = ?, has_audio = 1, audio_url = ?, updated_at = datetime('now')
        WHERE id = ?
        "#,
        params![content, audio_url, id],
    )
    .context("Failed to update comment audio")?;

    Ok(())
}

fn delete_comment_impl(conn: &Connection, id: &str) -> Result<()> {
    conn.execute("DELETE FROM comments WHERE id = ?", params![id])
        .context("Failed to delete comment")?;
    Ok(())
}
