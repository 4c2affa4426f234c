//! ircbot-storage: SQLite-based persistence for channel rosters and message logs.
//!
//! The roster records which users are currently in which channel. It is
//! rebuilt from scratch on every connection: [`RosterStore::clear`] runs at
//! startup and NAMES/JOIN/PART/QUIT/NICK traffic keeps it current.

use std::path::Path;
use std::sync::{Mutex, MutexGuard};

use rusqlite::{Connection, OptionalExtension};

#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),
    #[error("Storage connection lock poisoned")]
    Poisoned,
}

pub type Result<T> = std::result::Result<T, StorageError>;

/// Channel membership bookkeeping driven by classified protocol events.
pub trait RosterStore: Send + Sync {
    /// Record that `username` is in `channel`. Duplicates are ignored.
    fn add_membership(&self, username: &str, channel: &str) -> Result<()>;

    /// Forget `username` in `channel`, or in every channel when `channel` is `None`.
    fn remove_membership(&self, username: &str, channel: Option<&str>) -> Result<()>;

    /// Carry every membership of `old` over to `new`.
    fn rename_user(&self, old: &str, new: &str) -> Result<()>;

    /// Drop all memberships.
    fn clear(&self) -> Result<()>;

    fn is_member(&self, username: &str, channel: &str) -> Result<bool>;
}

/// A channel message stored by the message log.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct LoggedMessage {
    pub username: String,
    pub channel: String,
    pub message: String,
    /// Unix seconds.
    pub timestamp: i64,
}

const SCHEMA: &str = "CREATE TABLE IF NOT EXISTS users_online (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        username TEXT NOT NULL,
        channel TEXT NOT NULL
    );

    CREATE UNIQUE INDEX IF NOT EXISTS users_online_membership
        ON users_online (username, channel);

    CREATE TABLE IF NOT EXISTS messages (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        username TEXT NOT NULL,
        channel TEXT NOT NULL,
        message TEXT NOT NULL,
        timestamp INTEGER NOT NULL
    );";

/// SQLite-backed roster store and message log.
pub struct BotStorage {
    conn: Mutex<Connection>,
}

impl BotStorage {
    /// Open (or create) the SQLite database at the given path.
    pub fn open(path: &Path) -> Result<Self> {
        let conn = Connection::open(path)?;

        // Enable WAL mode for better concurrent read performance
        conn.execute_batch("PRAGMA journal_mode=WAL;")?;
        conn.execute_batch(SCHEMA)?;

        tracing::info!("Storage opened: {}", path.display());

        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    /// Open an in-memory database (for testing).
    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        conn.execute_batch(SCHEMA)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    fn conn(&self) -> Result<MutexGuard<'_, Connection>> {
        self.conn.lock().map_err(|_| StorageError::Poisoned)
    }

    // ─── Roster ─────────────────────────────────────────────

    /// Users currently recorded in `channel`, sorted by name.
    pub fn channel_members(&self, channel: &str) -> Result<Vec<String>> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare(
            "SELECT username FROM users_online WHERE channel = ?1 ORDER BY username",
        )?;
        let rows = stmt
            .query_map(rusqlite::params![channel], |row| row.get(0))?
            .collect::<std::result::Result<Vec<String>, _>>()?;
        Ok(rows)
    }

    // ─── Message Log ────────────────────────────────────────

    /// Append a channel message to the log.
    pub fn log_message(&self, entry: &LoggedMessage) -> Result<()> {
        let conn = self.conn()?;
        conn.execute(
            "INSERT INTO messages (username, channel, message, timestamp)
             VALUES (?1, ?2, ?3, ?4)",
            rusqlite::params![entry.username, entry.channel, entry.message, entry.timestamp],
        )?;
        Ok(())
    }

    /// Most recent messages in `channel`, newest first.
    pub fn recent_messages(&self, channel: &str, limit: usize) -> Result<Vec<LoggedMessage>> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare(
            "SELECT username, channel, message, timestamp FROM messages
             WHERE channel = ?1 ORDER BY id DESC LIMIT ?2",
        )?;
        let rows = stmt
            .query_map(rusqlite::params![channel, limit as i64], |row| {
                Ok(LoggedMessage {
                    username: row.get(0)?,
                    channel: row.get(1)?,
                    message: row.get(2)?,
                    timestamp: row.get(3)?,
                })
            })?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(rows)
    }
}

impl RosterStore for BotStorage {
    fn add_membership(&self, username: &str, channel: &str) -> Result<()> {
        let conn = self.conn()?;
        conn.execute(
            "INSERT OR IGNORE INTO users_online (username, channel) VALUES (?1, ?2)",
            rusqlite::params![username, channel],
        )?;
        Ok(())
    }

    fn remove_membership(&self, username: &str, channel: Option<&str>) -> Result<()> {
        let conn = self.conn()?;
        match channel {
            Some(channel) => conn.execute(
                "DELETE FROM users_online WHERE username = ?1 AND channel = ?2",
                rusqlite::params![username, channel],
            )?,
            None => conn.execute(
                "DELETE FROM users_online WHERE username = ?1",
                rusqlite::params![username],
            )?,
        };
        Ok(())
    }

    fn rename_user(&self, old: &str, new: &str) -> Result<()> {
        let conn = self.conn()?;
        conn.execute(
            "UPDATE OR REPLACE users_online SET username = ?1 WHERE username = ?2",
            rusqlite::params![new, old],
        )?;
        Ok(())
    }

    fn clear(&self) -> Result<()> {
        let conn = self.conn()?;
        conn.execute("DELETE FROM users_online", [])?;
        Ok(())
    }

    fn is_member(&self, username: &str, channel: &str) -> Result<bool> {
        let conn = self.conn()?;
        let found = conn
            .query_row(
                "SELECT 1 FROM users_online WHERE username = ?1 AND channel = ?2 LIMIT 1",
                rusqlite::params![username, channel],
                |row| row.get::<_, i64>(0),
            )
            .optional()?;
        Ok(found.is_some())
    }
}
