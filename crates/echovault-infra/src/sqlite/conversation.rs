//! SQLite conversation repository implementation.
//!
//! Implements `ConversationRepository` from `echovault-core` using sqlx with
//! split read/write pools. Timestamps are stored as RFC-3339 TEXT columns.

use chrono::{DateTime, Utc};
use sqlx::Row;

use echovault_core::repository::conversation::ConversationRepository;
use echovault_types::conversation::{ConversationRecord, NewConversation};
use echovault_types::error::RepositoryError;

use super::pool::DatabasePool;

/// SQLite-backed implementation of `ConversationRepository`.
pub struct SqliteConversationRepository {
    pool: DatabasePool,
}

impl SqliteConversationRepository {
    /// Create a new repository backed by the given database pool.
    pub fn new(pool: DatabasePool) -> Self {
        Self { pool }
    }
}

// ---------------------------------------------------------------------------
// Internal row type
// ---------------------------------------------------------------------------

struct ConversationRow {
    id: i64,
    transcript: Option<String>,
    summary: Option<String>,
    recording_url: Option<String>,
    started_at: Option<String>,
    ended_at: Option<String>,
}

impl ConversationRow {
    fn from_row(row: &sqlx::sqlite::SqliteRow) -> Result<Self, sqlx::Error> {
        Ok(Self {
            id: row.try_get("id")?,
            transcript: row.try_get("transcript")?,
            summary: row.try_get("summary")?,
            recording_url: row.try_get("recording_url")?,
            started_at: row.try_get("started_at")?,
            ended_at: row.try_get("ended_at")?,
        })
    }

    fn into_record(self) -> Result<ConversationRecord, RepositoryError> {
        Ok(ConversationRecord {
            id: self.id,
            transcript: self.transcript,
            summary: self.summary,
            recording_url: self.recording_url,
            started_at: self.started_at.as_deref().map(parse_datetime).transpose()?,
            ended_at: self.ended_at.as_deref().map(parse_datetime).transpose()?,
        })
    }
}

fn parse_datetime(s: &str) -> Result<DateTime<Utc>, RepositoryError> {
    DateTime::parse_from_rfc3339(s)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| RepositoryError::Query(format!("invalid datetime: {e}")))
}

fn format_datetime(dt: &DateTime<Utc>) -> String {
    dt.to_rfc3339()
}

// ---------------------------------------------------------------------------
// ConversationRepository impl
// ---------------------------------------------------------------------------

impl ConversationRepository for SqliteConversationRepository {
    async fn insert(&self, conversation: &NewConversation) -> Result<i64, RepositoryError> {
        let result = sqlx::query(
            r#"INSERT INTO conversations
               (transcript, summary, recording_url, started_at, ended_at)
               VALUES (?, ?, ?, ?, ?)"#,
        )
        .bind(&conversation.transcript)
        .bind(&conversation.summary)
        .bind(&conversation.recording_url)
        .bind(conversation.started_at.as_ref().map(format_datetime))
        .bind(conversation.ended_at.as_ref().map(format_datetime))
        .execute(&self.pool.writer)
        .await
        .map_err(|e| RepositoryError::Query(e.to_string()))?;

        Ok(result.last_insert_rowid())
    }

    async fn get(&self, id: i64) -> Result<Option<ConversationRecord>, RepositoryError> {
        let row = sqlx::query("SELECT * FROM conversations WHERE id = ?")
            .bind(id)
            .fetch_optional(&self.pool.reader)
            .await
            .map_err(|e| RepositoryError::Query(e.to_string()))?;

        row.map(|row| {
            ConversationRow::from_row(&row)
                .map_err(|e| RepositoryError::Query(e.to_string()))?
                .into_record()
        })
        .transpose()
    }

    async fn list_recent(&self, limit: u32) -> Result<Vec<ConversationRecord>, RepositoryError> {
        let rows = sqlx::query("SELECT * FROM conversations ORDER BY id DESC LIMIT ?")
            .bind(limit as i64)
            .fetch_all(&self.pool.reader)
            .await
            .map_err(|e| RepositoryError::Query(e.to_string()))?;

        let mut records = Vec::with_capacity(rows.len());
        for row in &rows {
            let r = ConversationRow::from_row(row)
                .map_err(|e| RepositoryError::Query(e.to_string()))?;
            records.push(r.into_record()?);
        }
        Ok(records)
    }

    async fn count(&self) -> Result<u64, RepositoryError> {
        let row: (i64,) = sqlx::query_as("SELECT COUNT(*) FROM conversations")
            .fetch_one(&self.pool.reader)
            .await
            .map_err(|e| RepositoryError::Query(e.to_string()))?;

        Ok(row.0 as u64)
    }
}
