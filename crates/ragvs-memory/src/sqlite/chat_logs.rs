use chrono::{DateTime, SecondsFormat, Utc};

use super::SqliteStore;
use crate::error::MemoryError;
use crate::types::{ChatLog, Route, ScoredMatch};

type ChatLogRow = (String, String, String, Option<String>, String);

impl SqliteStore {
    /// Append one chat log and return its row id.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization or the insert fails.
    pub async fn append_chat_log(&self, log: &ChatLog) -> Result<i64, MemoryError> {
        let retrieved = serde_json::to_string(&log.retrieved_documents)?;
        let row: (i64,) = sqlx::query_as(
            "INSERT INTO chat_logs (question, answer, retrieved_documents, route, created_at) \
             VALUES (?, ?, ?, ?, ?) RETURNING id",
        )
        .bind(&log.question)
        .bind(&log.answer)
        .bind(retrieved)
        .bind(log.route.map(Route::as_str))
        .bind(log.created_at.to_rfc3339_opts(SecondsFormat::Micros, true))
        .fetch_one(&self.pool)
        .await?;
        Ok(row.0)
    }

    /// Most recent chat logs, newest first.
    ///
    /// # Errors
    ///
    /// Returns an error if the query fails or a stored row cannot be decoded.
    pub async fn recent_chat_logs(&self, limit: usize) -> Result<Vec<ChatLog>, MemoryError> {
        let limit = i64::try_from(limit)?;
        let rows: Vec<ChatLogRow> = sqlx::query_as(
            "SELECT question, answer, retrieved_documents, route, created_at \
             FROM chat_logs ORDER BY created_at DESC, id DESC LIMIT ?",
        )
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(row_to_chat_log).collect()
    }

    /// # Errors
    ///
    /// Returns an error if the query fails.
    pub async fn count_chat_logs(&self) -> Result<i64, MemoryError> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM chat_logs")
            .fetch_one(&self.pool)
            .await?;
        Ok(count)
    }
}

fn row_to_chat_log(
    (question, answer, retrieved, route, created_at): ChatLogRow,
) -> Result<ChatLog, MemoryError> {
    let retrieved_documents: Vec<ScoredMatch> = serde_json::from_str(&retrieved)?;
    let route = route
        .map(|r| r.parse::<Route>().map_err(MemoryError::Other))
        .transpose()?;
    let created_at = DateTime::parse_from_rfc3339(&created_at)
        .map_err(|e| MemoryError::Other(format!("invalid created_at {created_at}: {e}")))?
        .with_timezone(&Utc);
    Ok(ChatLog {
        question,
        answer,
        retrieved_documents,
        route,
        created_at,
    })
}
