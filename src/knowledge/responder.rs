//! Answers position questions from retrieved documents.

use std::sync::Arc;

use tracing::{debug, warn};

use crate::agent::prompts::INFO_SYSTEM;
use crate::providers::{complete_text, LlmProvider};

use super::fallback::{fallback_answer, JobProfile};
use super::DocumentRetriever;

const INFO_MAX_TOKENS: u32 = 150;
const INFO_TEMPERATURE: f32 = 0.7;

/// Question-answering collaborator for `continue` turns.
#[derive(Clone)]
pub struct InfoResponder {
    provider: Option<Arc<dyn LlmProvider>>,
    retriever: Arc<dyn DocumentRetriever>,
    profile: JobProfile,
    positions: Vec<String>,
    top_k: usize,
}

impl InfoResponder {
    /// Create a responder. Without a provider every answer is a keyword fallback.
    pub fn new(
        provider: Option<Arc<dyn LlmProvider>>,
        retriever: Arc<dyn DocumentRetriever>,
        positions: Vec<String>,
        top_k: usize,
    ) -> Self {
        Self {
            provider,
            retriever,
            profile: JobProfile::default(),
            positions,
            top_k,
        }
    }

    /// Open positions.
    pub fn positions(&self) -> &[String] {
        &self.positions
    }

    /// Answer a candidate question.
    ///
    /// `context` is the recent conversation; `position` narrows retrieval.
    pub async fn answer(&self, message: &str, context: &str, position: Option<&str>) -> String {
        let Some(provider) = &self.provider else {
            return fallback_answer(message, &self.profile, &self.positions);
        };

        let documents = match self.retriever.search(message, self.top_k, position).await {
            Ok(docs) => docs,
            Err(e) => {
                warn!(error = %e, "document lookup failed, answering without documents");
                Vec::new()
            }
        };
        debug!(documents = documents.len(), "info documents retrieved");

        let knowledge = if documents.is_empty() {
            format!(
                "Open positions: {}.\nNo detailed job documents matched this question.",
                self.positions.join(", ")
            )
        } else {
            documents
                .iter()
                .map(|d| match &d.position {
                    Some(p) => format!("[{p}] {}", d.content),
                    None => d.content.clone(),
                })
                .collect::<Vec<_>>()
                .join("\n\n")
        };

        let user = format!(
            "Job information:\n{knowledge}\n\nConversation so far:\n{context}\n\nCandidate question: {message}"
        );

        match complete_text(
            provider.as_ref(),
            INFO_SYSTEM,
            &user,
            INFO_MAX_TOKENS,
            INFO_TEMPERATURE,
        )
        .await
        {
            Ok(answer) => answer,
            Err(e) => {
                warn!(error = %e, "info model failed, using keyword answer");
                fallback_answer(message, &self.profile, &self.positions)
            }
        }
    }
}
