//! Candidate records and conversation history.
//!
//! [`CandidateStore`] is the persistence capability the agent talks to.
//! [`SqliteCandidateStore`] keeps candidates, transcripts, and rolling
//! summaries in the shared SQLite database.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use sqlx::SqlitePool;
use tracing::{debug, info};

use crate::logging::masked_phone;
use crate::scheduling::phone::normalize_phone;

/// Errors raised by candidate persistence.
#[derive(Debug, thiserror::Error)]
pub enum CandidateError {
    /// Database error from sqlx.
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
    /// Transcript could not be encoded or decoded.
    #[error("transcript encoding error: {0}")]
    Encoding(#[from] serde_json::Error),
}

/// One line of a saved transcript.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TranscriptEntry {
    /// `user` or `assistant`.
    pub role: String,
    /// Message text.
    pub content: String,
}

/// A stored candidate.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CandidateRecord {
    /// Canonical phone.
    pub phone: String,
    /// Full name, when known.
    pub name: Option<String>,
    /// Position the candidate is interested in.
    pub job_interest: Option<String>,
    /// Rolling conversation summary.
    pub conversation_summary: Option<String>,
    /// Creation timestamp (UTC, SQLite `datetime`).
    pub created_at: String,
}

/// A saved conversation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SavedConversation {
    /// Transcript lines in order.
    pub transcript: Vec<TranscriptEntry>,
    /// Number of lines.
    pub message_count: i64,
    /// When the conversation was saved.
    pub created_at: String,
}

/// Aggregate counts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct CandidateStats {
    /// Registered candidates.
    pub candidates: i64,
    /// Saved conversations.
    pub transcripts: i64,
}

/// Persistence capability for candidate data.
#[async_trait]
pub trait CandidateStore: Send + Sync {
    /// Whether a record exists for the phone.
    async fn user_exists(&self, phone: &str) -> Result<bool, CandidateError>;

    /// Create a record. Returns `false` when one already existed.
    async fn create_user(
        &self,
        phone: &str,
        name: Option<&str>,
        job_interest: Option<&str>,
    ) -> Result<bool, CandidateError>;

    /// The stored rolling summary, if any.
    async fn conversation_summary(&self, phone: &str) -> Result<Option<String>, CandidateError>;

    /// Append a transcript.
    async fn save_transcript(
        &self,
        phone: &str,
        transcript: &[TranscriptEntry],
    ) -> Result<(), CandidateError>;

    /// Replace the rolling summary.
    async fn update_summary(&self, phone: &str, summary: &str) -> Result<(), CandidateError>;
}

/// SQLite-backed [`CandidateStore`].
#[derive(Debug, Clone)]
pub struct SqliteCandidateStore {
    db: SqlitePool,
}

impl SqliteCandidateStore {
    /// Create a store over a migrated pool.
    pub fn new(db: SqlitePool) -> Self {
        Self { db }
    }

    /// Fetch a full candidate record.
    ///
    /// # Errors
    ///
    /// Returns an error if the query fails.
    pub async fn get_candidate(&self, phone: &str) -> Result<Option<CandidateRecord>, CandidateError> {
        let row: Option<(String, Option<String>, Option<String>, Option<String>, String)> =
            sqlx::query_as(
                "SELECT phone, name, job_interest, conversation_summary, created_at \
                 FROM candidates WHERE phone = ?1",
            )
            .bind(normalize_phone(phone))
            .fetch_optional(&self.db)
            .await?;

        Ok(row.map(
            |(phone, name, job_interest, conversation_summary, created_at)| CandidateRecord {
                phone,
                name,
                job_interest,
                conversation_summary,
                created_at,
            },
        ))
    }

    /// Most recent saved conversations, newest first.
    ///
    /// # Errors
    ///
    /// Returns an error if the query fails or a transcript cannot be decoded.
    pub async fn conversation_history(
        &self,
        phone: &str,
        limit: u32,
    ) -> Result<Vec<SavedConversation>, CandidateError> {
        let rows: Vec<(String, i64, String)> = sqlx::query_as(
            "SELECT transcript, message_count, created_at \
             FROM transcripts WHERE phone = ?1 \
             ORDER BY id DESC LIMIT ?2",
        )
        .bind(normalize_phone(phone))
        .bind(i64::from(limit))
        .fetch_all(&self.db)
        .await?;

        rows.into_iter()
            .map(|(json, message_count, created_at)| {
                Ok(SavedConversation {
                    transcript: serde_json::from_str(&json)?,
                    message_count,
                    created_at,
                })
            })
            .collect()
    }

    /// Set the position a candidate is interested in.
    ///
    /// Returns `false` when no record exists.
    ///
    /// # Errors
    ///
    /// Returns an error if the update fails.
    pub async fn update_job_interest(
        &self,
        phone: &str,
        job_interest: &str,
    ) -> Result<bool, CandidateError> {
        let updated = sqlx::query(
            "UPDATE candidates SET job_interest = ?2, updated_at = datetime('now') \
             WHERE phone = ?1",
        )
        .bind(normalize_phone(phone))
        .bind(job_interest)
        .execute(&self.db)
        .await?
        .rows_affected();
        Ok(updated > 0)
    }

    /// Candidate and transcript counts.
    ///
    /// # Errors
    ///
    /// Returns an error if a count query fails.
    pub async fn stats(&self) -> Result<CandidateStats, CandidateError> {
        let candidates: i64 = sqlx::query_scalar("SELECT count(*) FROM candidates")
            .fetch_one(&self.db)
            .await?;
        let transcripts: i64 = sqlx::query_scalar("SELECT count(*) FROM transcripts")
            .fetch_one(&self.db)
            .await?;
        Ok(CandidateStats {
            candidates,
            transcripts,
        })
    }
}

#[async_trait]
impl CandidateStore for SqliteCandidateStore {
    async fn user_exists(&self, phone: &str) -> Result<bool, CandidateError> {
        let found: Option<i64> = sqlx::query_scalar("SELECT 1 FROM candidates WHERE phone = ?1")
            .bind(normalize_phone(phone))
            .fetch_optional(&self.db)
            .await?;
        Ok(found.is_some())
    }

    async fn create_user(
        &self,
        phone: &str,
        name: Option<&str>,
        job_interest: Option<&str>,
    ) -> Result<bool, CandidateError> {
        let phone = normalize_phone(phone);
        let inserted = sqlx::query(
            "INSERT OR IGNORE INTO candidates (phone, name, job_interest) VALUES (?1, ?2, ?3)",
        )
        .bind(&phone)
        .bind(name)
        .bind(job_interest)
        .execute(&self.db)
        .await?
        .rows_affected();

        if inserted > 0 {
            info!(candidate = %masked_phone(&phone), "candidate created");
        } else {
            debug!(candidate = %masked_phone(&phone), "candidate already exists");
        }
        Ok(inserted > 0)
    }

    async fn conversation_summary(&self, phone: &str) -> Result<Option<String>, CandidateError> {
        let summary: Option<Option<String>> =
            sqlx::query_scalar("SELECT conversation_summary FROM candidates WHERE phone = ?1")
                .bind(normalize_phone(phone))
                .fetch_optional(&self.db)
                .await?;
        Ok(summary.flatten().filter(|s| !s.trim().is_empty()))
    }

    async fn save_transcript(
        &self,
        phone: &str,
        transcript: &[TranscriptEntry],
    ) -> Result<(), CandidateError> {
        let phone = normalize_phone(phone);
        let json = serde_json::to_string(transcript)?;
        let count = i64::try_from(transcript.len()).unwrap_or(i64::MAX);
        sqlx::query("INSERT INTO transcripts (phone, transcript, message_count) VALUES (?1, ?2, ?3)")
            .bind(&phone)
            .bind(json)
            .bind(count)
            .execute(&self.db)
            .await?;
        debug!(candidate = %masked_phone(&phone), messages = count, "transcript saved");
        Ok(())
    }

    async fn update_summary(&self, phone: &str, summary: &str) -> Result<(), CandidateError> {
        let phone = normalize_phone(phone);
        sqlx::query(
            "INSERT INTO candidates (phone, conversation_summary) VALUES (?1, ?2) \
             ON CONFLICT(phone) DO UPDATE SET \
                 conversation_summary = excluded.conversation_summary, \
                 updated_at = datetime('now')",
        )
        .bind(&phone)
        .bind(summary)
        .execute(&self.db)
        .await?;
        Ok(())
    }
}
