//! SQLite persistence for inspection sessions and messages
//!
//! Each operation opens a short-lived connection and is its own atomic
//! unit; there is no pooling and no transaction spanning operations. The
//! database lives in the platform data directory unless overridden.

use crate::error::{InspectraError, Result};
use crate::gateway::UsageMetrics;
use crate::personas::Persona;
use anyhow::Context;
use chrono::{DateTime, Utc};
use directories::ProjectDirs;
use rusqlite::{params, Connection, OptionalExtension};
use std::path::PathBuf;

pub mod types;
pub use types::{MessageRecord, SessionRecord};

/// Title sentinel for sessions that have not been named yet
pub const DEFAULT_TITLE: &str = "New Inspection";

/// Number of characters of the first user message used for auto-renaming
const TITLE_PREFIX_CHARS: usize = 30;

/// Environment variable overriding the database path
pub const ENV_DB_PATH: &str = "INSPECTRA_DB";

/// Storage backend for sessions and messages
pub struct SqliteStore {
    db_path: PathBuf,
}

impl SqliteStore {
    /// Create a new storage instance
    ///
    /// Initializes the database file in the user's data directory, unless
    /// `INSPECTRA_DB` points somewhere else.
    pub fn new() -> Result<Self> {
        if let Ok(override_path) = std::env::var(ENV_DB_PATH) {
            return Self::new_with_path(override_path);
        }

        let proj_dirs = ProjectDirs::from("io", "inspectra", "inspectra")
            .ok_or_else(|| InspectraError::Storage("Could not determine data directory".into()))?;

        let data_dir = proj_dirs.data_dir();
        std::fs::create_dir_all(data_dir)
            .context("Failed to create data directory")
            .map_err(|e| InspectraError::Storage(e.to_string()))?;

        Self::new_with_path(data_dir.join("inspectra.db"))
    }

    /// Create a new storage instance at the specified database path
    ///
    /// Primarily useful for tests where the default application data
    /// directory is not desirable (for example, a temporary directory).
    ///
    /// # Examples
    ///
    /// ```
    /// use inspectra::storage::SqliteStore;
    ///
    /// let store = SqliteStore::new_with_path("/tmp/test_inspectra.db").unwrap();
    /// ```
    pub fn new_with_path<P: Into<PathBuf>>(db_path: P) -> Result<Self> {
        let db_path = db_path.into();

        // Ensure parent directory exists so opening the DB file succeeds.
        if let Some(parent) = db_path.parent() {
            std::fs::create_dir_all(parent)
                .context("Failed to create parent directory for database")
                .map_err(|e| InspectraError::Storage(e.to_string()))?;
        }

        let store = Self { db_path };
        store.init()?;
        Ok(store)
    }

    /// Open a short-lived connection for one operation
    fn open(&self) -> Result<Connection> {
        Connection::open(&self.db_path)
            .context("Failed to open database")
            .map_err(|e| InspectraError::Storage(e.to_string()).into())
    }

    /// Initialize the database schema
    ///
    /// Idempotent; safe to call on every process start.
    fn init(&self) -> Result<()> {
        let conn = self.open()?;

        conn.execute(
            "CREATE TABLE IF NOT EXISTS sessions (
                id TEXT PRIMARY KEY,
                title TEXT NOT NULL,
                image_path TEXT,
                mode TEXT NOT NULL DEFAULT 'General Analysis',
                created_at TEXT NOT NULL
            )",
            [],
        )
        .context("Failed to create sessions table")
        .map_err(|e| InspectraError::Storage(e.to_string()))?;

        conn.execute(
            "CREATE TABLE IF NOT EXISTS messages (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                session_id TEXT NOT NULL,
                role TEXT NOT NULL,
                content TEXT NOT NULL,
                usage_data TEXT,
                timestamp TEXT NOT NULL
            )",
            [],
        )
        .context("Failed to create messages table")
        .map_err(|e| InspectraError::Storage(e.to_string()))?;

        Ok(())
    }

    /// Create a session if `id` does not already exist
    ///
    /// Duplicate calls are a no-op, not an error, so re-creation on a
    /// repeated startup path is safe.
    pub fn create_session(&self, id: &str, title: &str, mode: Persona) -> Result<()> {
        let conn = self.open()?;
        let now = Utc::now().to_rfc3339();

        conn.execute(
            "INSERT OR IGNORE INTO sessions (id, title, mode, created_at)
             VALUES (?1, ?2, ?3, ?4)",
            params![id, title, mode.name(), now],
        )
        .context("Failed to insert session")
        .map_err(|e| InspectraError::Storage(e.to_string()))?;

        Ok(())
    }

    /// Update the session's analysis persona
    ///
    /// Nonexistent sessions are a silent no-op.
    pub fn set_session_mode(&self, id: &str, mode: Persona) -> Result<()> {
        self.update_field(id, "mode", mode.name(), "mode TEXT DEFAULT 'General Analysis'")
    }

    /// Link an uploaded image asset to the session
    ///
    /// Nonexistent sessions are a silent no-op.
    pub fn set_session_image(&self, id: &str, path: &str) -> Result<()> {
        self.update_field(id, "image_path", path, "image_path TEXT")
    }

    /// Manually rename a session
    ///
    /// Nonexistent sessions are a silent no-op.
    pub fn rename_session(&self, id: &str, title: &str) -> Result<()> {
        self.update_field(id, "title", title, "title TEXT")
    }

    /// Single-field session update with schema-evolution tolerance
    ///
    /// A database created by an older version may lack the column. In that
    /// case the column is added and the update retried once; a second
    /// failure is logged as a warning and swallowed.
    fn update_field(&self, id: &str, column: &str, value: &str, column_decl: &str) -> Result<()> {
        let conn = self.open()?;
        let sql = format!("UPDATE sessions SET {} = ?1 WHERE id = ?2", column);

        match conn.execute(&sql, params![value, id]) {
            Ok(_) => Ok(()),
            Err(e) if is_missing_column(&e) => {
                tracing::debug!("Column {} missing, migrating sessions table", column);
                let alter = format!("ALTER TABLE sessions ADD COLUMN {}", column_decl);
                if let Err(alter_err) = conn.execute(&alter, []) {
                    tracing::warn!("Failed to add {} column: {}", column, alter_err);
                    return Ok(());
                }
                if let Err(retry_err) = conn.execute(&sql, params![value, id]) {
                    tracing::warn!(
                        "Update of {} still failing after migration: {}",
                        column,
                        retry_err
                    );
                }
                Ok(())
            }
            Err(e) => Err(InspectraError::Storage(e.to_string()).into()),
        }
    }

    /// Point lookup of a session by id
    pub fn get_session(&self, id: &str) -> Result<Option<SessionRecord>> {
        let conn = self.open()?;

        conn.query_row(
            "SELECT id, title, image_path, mode, created_at FROM sessions WHERE id = ?1",
            params![id],
            session_from_row,
        )
        .optional()
        .context("Failed to query session")
        .map_err(|e| InspectraError::Storage(e.to_string()).into())
    }

    /// List sessions that have been used, newest first
    ///
    /// A session counts as used when it has at least one message, or an
    /// image, or a non-default title. Sessions created but never touched
    /// (a refresh artifact) stay hidden.
    pub fn list_sessions(&self) -> Result<Vec<SessionRecord>> {
        let conn = self.open()?;

        let mut stmt = conn
            .prepare(
                "SELECT DISTINCT s.id, s.title, s.image_path, s.mode, s.created_at
                 FROM sessions s
                 LEFT JOIN messages m ON s.id = m.session_id
                 WHERE m.id IS NOT NULL
                    OR s.image_path IS NOT NULL
                    OR s.title != ?1
                 ORDER BY s.created_at DESC",
            )
            .context("Failed to prepare statement")
            .map_err(|e| InspectraError::Storage(e.to_string()))?;

        let rows = stmt
            .query_map(params![DEFAULT_TITLE], session_from_row)
            .context("Failed to query sessions")
            .map_err(|e| InspectraError::Storage(e.to_string()))?;

        let mut sessions = Vec::new();
        for row in rows {
            sessions.push(row.map_err(|e| InspectraError::Storage(e.to_string()))?);
        }
        Ok(sessions)
    }

    /// Append one message to a session
    ///
    /// When a user message lands on a session still carrying the default
    /// title, the session is renamed to a truncated prefix of the content
    /// in the same transaction as the insert.
    pub fn append_message(
        &self,
        session_id: &str,
        role: &str,
        content: &str,
        usage: Option<&UsageMetrics>,
    ) -> Result<()> {
        let mut conn = self.open()?;

        let usage_json = usage
            .map(serde_json::to_string)
            .transpose()
            .context("Failed to serialize usage metrics")
            .map_err(|e| InspectraError::Storage(e.to_string()))?;
        let now = Utc::now().to_rfc3339();

        let tx = conn
            .transaction()
            .context("Failed to start transaction")
            .map_err(|e| InspectraError::Storage(e.to_string()))?;

        tx.execute(
            "INSERT INTO messages (session_id, role, content, usage_data, timestamp)
             VALUES (?1, ?2, ?3, ?4, ?5)",
            params![session_id, role, content, usage_json, now],
        )
        .context("Failed to insert message")
        .map_err(|e| InspectraError::Storage(e.to_string()))?;

        if role == "user" {
            tx.execute(
                "UPDATE sessions SET title = ?1 WHERE id = ?2 AND title = ?3",
                params![truncate_title(content), session_id, DEFAULT_TITLE],
            )
            .context("Failed to auto-rename session")
            .map_err(|e| InspectraError::Storage(e.to_string()))?;
        }

        tx.commit()
            .context("Failed to commit transaction")
            .map_err(|e| InspectraError::Storage(e.to_string()))?;

        Ok(())
    }

    /// Full chat history for a session, ascending by message id
    pub fn get_history(&self, session_id: &str) -> Result<Vec<MessageRecord>> {
        let conn = self.open()?;

        let mut stmt = conn
            .prepare(
                "SELECT id, session_id, role, content, usage_data, timestamp
                 FROM messages WHERE session_id = ?1 ORDER BY id ASC",
            )
            .context("Failed to prepare statement")
            .map_err(|e| InspectraError::Storage(e.to_string()))?;

        let rows = stmt
            .query_map(params![session_id], |row| {
                Ok((
                    row.get::<_, i64>(0)?,
                    row.get::<_, String>(1)?,
                    row.get::<_, String>(2)?,
                    row.get::<_, String>(3)?,
                    row.get::<_, Option<String>>(4)?,
                    row.get::<_, String>(5)?,
                ))
            })
            .context("Failed to query messages")
            .map_err(|e| InspectraError::Storage(e.to_string()))?;

        let mut messages = Vec::new();
        for row in rows {
            let (id, session_id, role, content, usage_json, timestamp) =
                row.map_err(|e| InspectraError::Storage(e.to_string()))?;

            let usage = match usage_json {
                Some(json) => Some(
                    serde_json::from_str::<UsageMetrics>(&json)
                        .context("Failed to deserialize usage metrics")
                        .map_err(|e| InspectraError::Storage(e.to_string()))?,
                ),
                None => None,
            };

            messages.push(MessageRecord {
                id,
                session_id,
                role,
                content,
                usage,
                timestamp: parse_timestamp(&timestamp),
            });
        }

        Ok(messages)
    }

    /// Delete a session, its messages, and its image asset
    ///
    /// The asset unlink is best-effort: a failure is logged, never raised.
    pub fn delete_session(&self, id: &str) -> Result<()> {
        let conn = self.open()?;

        let image_path: Option<String> = conn
            .query_row(
                "SELECT image_path FROM sessions WHERE id = ?1",
                params![id],
                |row| row.get(0),
            )
            .optional()
            .context("Failed to query session image")
            .map_err(|e| InspectraError::Storage(e.to_string()))?
            .flatten();

        if let Some(path) = image_path {
            if std::path::Path::new(&path).exists() {
                if let Err(e) = std::fs::remove_file(&path) {
                    tracing::warn!("Failed to delete image asset {}: {}", path, e);
                }
            }
        }

        conn.execute("DELETE FROM messages WHERE session_id = ?1", params![id])
            .context("Failed to delete messages")
            .map_err(|e| InspectraError::Storage(e.to_string()))?;

        conn.execute("DELETE FROM sessions WHERE id = ?1", params![id])
            .context("Failed to delete session")
            .map_err(|e| InspectraError::Storage(e.to_string()))?;

        Ok(())
    }
}

/// Map one sessions row to a record
///
/// Unknown persona names fall back to the default persona; unparseable
/// timestamps fall back to now rather than failing the read.
fn session_from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<SessionRecord> {
    let mode: String = row.get(3)?;
    let created_at: String = row.get(4)?;
    Ok(SessionRecord {
        id: row.get(0)?,
        title: row.get(1)?,
        image_path: row.get(2)?,
        mode: Persona::from_name(&mode).unwrap_or_default(),
        created_at: parse_timestamp(&created_at),
    })
}

fn parse_timestamp(s: &str) -> DateTime<Utc> {
    DateTime::parse_from_rfc3339(s)
        .map(|dt| dt.with_timezone(&Utc))
        .unwrap_or_else(|_| Utc::now())
}

/// Whether a SQLite error indicates a missing column (old schema)
fn is_missing_column(e: &rusqlite::Error) -> bool {
    e.to_string().contains("no such column")
}

/// Truncate message content to the auto-rename title prefix
fn truncate_title(content: &str) -> String {
    if content.chars().count() > TITLE_PREFIX_CHARS {
        let prefix: String = content.chars().take(TITLE_PREFIX_CHARS).collect();
        format!("{}...", prefix)
    } else {
        content.to_string()
    }
}
