//! Position knowledge base.
//!
//! Documents are paragraph chunks of job descriptions stored in SQLite and
//! looked up through FTS5. The [`responder::InfoResponder`] answers candidate
//! questions from them.

pub mod fallback;
pub mod responder;

use async_trait::async_trait;
use serde::Serialize;
use sqlx::SqlitePool;
use tracing::info;

/// Errors raised by the knowledge base.
#[derive(Debug, thiserror::Error)]
pub enum KnowledgeError {
    /// Database error from sqlx.
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
    /// Source file could not be read.
    #[error("failed to read {path}: {source}")]
    Io {
        /// File path.
        path: String,
        /// Underlying error.
        source: std::io::Error,
    },
}

/// A retrieved knowledge chunk.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Document {
    /// Chunk text.
    pub content: String,
    /// Position the chunk describes, if tagged.
    pub position: Option<String>,
    /// Where the chunk came from.
    pub source: String,
}

/// Relevant-document lookup capability.
#[async_trait]
pub trait DocumentRetriever: Send + Sync {
    /// Up to `k` documents relevant to `query`, optionally for one position.
    async fn search(
        &self,
        query: &str,
        k: usize,
        position: Option<&str>,
    ) -> Result<Vec<Document>, KnowledgeError>;
}

/// SQLite FTS5-backed document store.
#[derive(Debug, Clone)]
pub struct SqliteDocumentStore {
    db: SqlitePool,
}

impl SqliteDocumentStore {
    /// Create a store over a migrated pool.
    pub fn new(db: SqlitePool) -> Self {
        Self { db }
    }

    /// Insert one chunk.
    ///
    /// # Errors
    ///
    /// Returns an error if the insert fails.
    pub async fn add(
        &self,
        content: &str,
        position: Option<&str>,
        source: &str,
    ) -> Result<i64, KnowledgeError> {
        let id: i64 = sqlx::query_scalar(
            "INSERT INTO documents (position, source, content) VALUES (?1, ?2, ?3) RETURNING id",
        )
        .bind(position)
        .bind(source)
        .bind(content)
        .fetch_one(&self.db)
        .await?;
        Ok(id)
    }

    /// Split a text file into paragraphs and store each as a chunk.
    ///
    /// Returns the number of chunks stored.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or an insert fails.
    pub async fn ingest_file(
        &self,
        path: &std::path::Path,
        position: Option<&str>,
    ) -> Result<usize, KnowledgeError> {
        let text = tokio::fs::read_to_string(path)
            .await
            .map_err(|source| KnowledgeError::Io {
                path: path.display().to_string(),
                source,
            })?;
        let source = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| path.display().to_string());

        let chunks = split_paragraphs(&text);
        for chunk in &chunks {
            self.add(chunk, position, &source).await?;
        }
        info!(source = %source, chunks = chunks.len(), "knowledge ingested");
        Ok(chunks.len())
    }

    /// Distinct positions that have documents.
    ///
    /// # Errors
    ///
    /// Returns an error if the query fails.
    pub async fn positions(&self) -> Result<Vec<String>, KnowledgeError> {
        let rows: Vec<String> = sqlx::query_scalar(
            "SELECT DISTINCT position FROM documents WHERE position IS NOT NULL ORDER BY position",
        )
        .fetch_all(&self.db)
        .await?;
        Ok(rows)
    }
}

#[async_trait]
impl DocumentRetriever for SqliteDocumentStore {
    async fn search(
        &self,
        query: &str,
        k: usize,
        position: Option<&str>,
    ) -> Result<Vec<Document>, KnowledgeError> {
        let match_expr = fts5_any_terms(query);
        if match_expr.is_empty() || k == 0 {
            return Ok(Vec::new());
        }
        let limit = i64::try_from(k).unwrap_or(i64::MAX);

        let rows: Vec<(String, Option<String>, String)> = sqlx::query_as(
            "SELECT d.content, d.position, d.source \
             FROM documents_fts f \
             JOIN documents d ON f.rowid = d.id \
             WHERE documents_fts MATCH ?1 \
               AND (?2 IS NULL OR d.position = ?2 COLLATE NOCASE) \
             ORDER BY f.rank \
             LIMIT ?3",
        )
        .bind(&match_expr)
        .bind(position)
        .bind(limit)
        .fetch_all(&self.db)
        .await?;

        Ok(rows
            .into_iter()
            .map(|(content, position, source)| Document {
                content,
                position,
                source,
            })
            .collect())
    }
}

/// Paragraph chunks: blank-line separated, whitespace collapsed.
pub fn split_paragraphs(text: &str) -> Vec<String> {
    text.split("\n\n")
        .map(|p| p.split_whitespace().collect::<Vec<_>>().join(" "))
        .filter(|p| !p.is_empty())
        .collect()
}

/// Build an FTS5 query matching any meaningful term of a question.
///
/// Terms are quoted so operator characters cannot break the syntax.
fn fts5_any_terms(query: &str) -> String {
    const STOPWORDS: &[&str] = &[
        "a", "an", "the", "is", "are", "what", "who", "how", "do", "does", "you", "your", "i",
        "me", "my", "for", "of", "to", "in", "and", "or", "about", "tell", "can", "there",
    ];
    query
        .split(|c: char| !c.is_alphanumeric())
        .map(str::to_lowercase)
        .filter(|t| t.len() > 1 && !STOPWORDS.contains(&t.as_str()))
        .map(|t| format!("\"{t}\""))
        .collect::<Vec<_>>()
        .join(" OR ")
}
