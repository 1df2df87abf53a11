//! Persistence of posted comments and created follow relations.

use crate::error::StorageError;
use crate::platform::{Comment, FollowedUser};
use parking_lot::Mutex;
use rusqlite::{params, Connection};
use std::path::Path;
use tracing::debug;

/// Comment history of the session account
pub trait CommentsRepository: Send + Sync {
    fn add(&self, comment: &Comment) -> Result<(), StorageError>;

    /// Number of stored comments by `owner_id` on `media_id`
    fn count_by_owner_and_media(&self, owner_id: &str, media_id: &str)
        -> Result<u64, StorageError>;
}

pub trait FollowsRepository: Send + Sync {
    fn add(&self, followed: &FollowedUser) -> Result<(), StorageError>;
}

/// SQLite-backed store implementing both repositories
pub struct SqliteStore {
    conn: Mutex<Connection>,
}

impl SqliteStore {
    pub fn open(path: impl AsRef<Path>) -> Result<Self, StorageError> {
        debug!("Opening database at {}", path.as_ref().display());
        let conn = Connection::open(path)?;
        Self::with_connection(conn)
    }

    pub fn open_in_memory() -> Result<Self, StorageError> {
        Self::with_connection(Connection::open_in_memory()?)
    }

    fn with_connection(conn: Connection) -> Result<Self, StorageError> {
        init_schema(&conn)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    pub fn follows_count(&self) -> Result<u64, StorageError> {
        let conn = self.conn.lock();
        let count: i64 = conn.query_row("SELECT COUNT(*) FROM followed_users", [], |row| {
            row.get(0)
        })?;
        to_count(count)
    }

    pub fn comments_count(&self) -> Result<u64, StorageError> {
        let conn = self.conn.lock();
        let count: i64 = conn.query_row("SELECT COUNT(*) FROM comments", [], |row| row.get(0))?;
        to_count(count)
    }
}

fn init_schema(conn: &Connection) -> rusqlite::Result<()> {
    conn.execute_batch(
        "CREATE TABLE IF NOT EXISTS comments (
            id TEXT NOT NULL,
            owner_id TEXT NOT NULL,
            media_id TEXT NOT NULL,
            text TEXT NOT NULL,
            created_at TEXT NOT NULL,
            PRIMARY KEY (owner_id, id)
        );
        CREATE INDEX IF NOT EXISTS idx_comments_owner_media ON comments(owner_id, media_id);

        CREATE TABLE IF NOT EXISTS followed_users (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            followed_account_id TEXT NOT NULL,
            follower_account_id TEXT NOT NULL,
            created_at TEXT DEFAULT (datetime('now'))
        );",
    )
}

fn to_count(count: i64) -> Result<u64, StorageError> {
    u64::try_from(count).map_err(|_| StorageError::InvalidValue(format!("negative count {count}")))
}

impl CommentsRepository for SqliteStore {
    fn add(&self, comment: &Comment) -> Result<(), StorageError> {
        let conn = self.conn.lock();
        conn.execute(
            "INSERT OR REPLACE INTO comments (id, owner_id, media_id, text, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5)",
            params![
                comment.id,
                comment.owner_id,
                comment.media_id,
                comment.text,
                comment.created_at.to_rfc3339(),
            ],
        )?;
        debug!(
            "Stored comment {} by {} on media {}",
            comment.id, comment.owner_id, comment.media_id
        );
        Ok(())
    }

    fn count_by_owner_and_media(
        &self,
        owner_id: &str,
        media_id: &str,
    ) -> Result<u64, StorageError> {
        let conn = self.conn.lock();
        let count: i64 = conn.query_row(
            "SELECT COUNT(*) FROM comments WHERE owner_id = ?1 AND media_id = ?2",
            params![owner_id, media_id],
            |row| row.get(0),
        )?;
        to_count(count)
    }
}

impl FollowsRepository for SqliteStore {
    fn add(&self, followed: &FollowedUser) -> Result<(), StorageError> {
        let conn = self.conn.lock();
        conn.execute(
            "INSERT INTO followed_users (followed_account_id, follower_account_id)
             VALUES (?1, ?2)",
            params![followed.followed_account_id, followed.follower_account_id],
        )?;
        Ok(())
    }
}
