//! Append-only event storage on SQLite.
//!
//! Every record becomes one row in the `events` table. The row id and the
//! `received_at` column are internal: they fix insertion order and never
//! appear in a returned [`EventRecord`].

use std::{str::FromStr, time::Duration};

use chrono::Utc;
use sqlx::{
    FromRow, SqlitePool,
    sqlite::{SqliteConnectOptions, SqlitePoolOptions},
};
use tracing::{debug, info};

use crate::{
    error::StoreError,
    event::{EventAction, EventRecord},
};

const CREATE_EVENTS: &str = "CREATE TABLE IF NOT EXISTS events (
    id          INTEGER PRIMARY KEY AUTOINCREMENT,
    request_id  TEXT NOT NULL,
    author      TEXT NOT NULL,
    action      TEXT NOT NULL,
    from_branch TEXT,
    to_branch   TEXT NOT NULL,
    timestamp   TEXT NOT NULL,
    received_at TEXT NOT NULL
)";

/// Handle to the event collection. Cheap to clone; clones share the pool.
#[derive(Clone, Debug)]
pub struct EventStore {
    pool: SqlitePool,
}

#[derive(FromRow)]
struct EventRow {
    request_id: String,
    author: String,
    action: String,
    from_branch: Option<String>,
    to_branch: String,
    timestamp: String,
}

impl TryFrom<EventRow> for EventRecord {
    type Error = StoreError;

    fn try_from(row: EventRow) -> Result<Self, Self::Error> {
        let action = match (row.action.as_str(), row.from_branch) {
            ("PUSH", _) => EventAction::Push {
                to_branch: row.to_branch,
            },
            ("PULL_REQUEST", Some(from_branch)) => EventAction::PullRequest {
                from_branch,
                to_branch: row.to_branch,
            },
            ("MERGE", Some(from_branch)) => EventAction::Merge {
                from_branch,
                to_branch: row.to_branch,
            },
            (other, from_branch) => {
                return Err(StoreError::InvalidState(format!(
                    "action {other:?} with from_branch {from_branch:?}"
                )));
            }
        };

        Ok(EventRecord {
            request_id: row.request_id,
            author: row.author,
            action,
            timestamp: row.timestamp,
        })
    }
}

impl EventStore {
    /// Opens the database at `url` and creates the `events` table if needed.
    ///
    /// In-memory databases are held on a single connection that is never
    /// recycled, since each SQLite connection gets its own memory database.
    pub async fn connect(url: &str) -> Result<Self, StoreError> {
        let options = SqliteConnectOptions::from_str(url)?.create_if_missing(true);
        let in_memory = url.contains(":memory:") || url.contains("mode=memory");

        let pool_options = if in_memory {
            SqlitePoolOptions::new()
                .max_connections(1)
                .min_connections(1)
                .idle_timeout(None::<Duration>)
                .max_lifetime(None::<Duration>)
        } else {
            SqlitePoolOptions::new()
        };

        let pool = pool_options.connect_with(options).await?;
        sqlx::query(CREATE_EVENTS).execute(&pool).await?;

        info!("Event store ready at {}", url);
        Ok(Self { pool })
    }

    /// Inserts one record. No deduplication: the same delivery sent twice is
    /// stored twice.
    pub async fn append(&self, record: &EventRecord) -> Result<(), StoreError> {
        sqlx::query(
            "INSERT INTO events (request_id, author, action, from_branch, to_branch, timestamp, received_at)
             VALUES (?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(&record.request_id)
        .bind(&record.author)
        .bind(record.action.name())
        .bind(record.action.from_branch())
        .bind(record.action.to_branch())
        .bind(&record.timestamp)
        .bind(Utc::now().to_rfc3339())
        .execute(&self.pool)
        .await?;

        debug!("Stored event: {:?}", record);
        Ok(())
    }

    /// All records in insertion order.
    pub async fn list_all(&self) -> Result<Vec<EventRecord>, StoreError> {
        let rows: Vec<EventRow> = sqlx::query_as(
            "SELECT request_id, author, action, from_branch, to_branch, timestamp
             FROM events ORDER BY id",
        )
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(EventRecord::try_from).collect()
    }

    pub async fn count(&self) -> Result<i64, StoreError> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM events")
            .fetch_one(&self.pool)
            .await?;
        Ok(count)
    }

    /// Waits for in-flight queries and closes every connection.
    pub async fn close(&self) {
        self.pool.close().await;
    }
}
