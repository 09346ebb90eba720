//! Conversation wrap-up: goodbye text, summary, persistence.

use std::sync::Arc;

use tracing::{info, warn};

use crate::candidates::CandidateStore;
use crate::logging::masked_phone;
use crate::providers::{complete_text, LlmProvider};

use super::state::{ConversationState, Speaker};
use super::prompts;

/// Goodbye used when no model is reachable.
pub const FALLBACK_EXIT_MESSAGE: &str =
    "Thank you for your time! If you have any questions later, feel free to reach out. Good luck!";

const EXIT_MAX_TOKENS: u32 = 100;
const EXIT_TEMPERATURE: f32 = 0.7;
const SUMMARY_MAX_TOKENS: u32 = 300;
const SUMMARY_TEMPERATURE: f32 = 0.3;

const SUMMARY_TOPICS: &[(&str, &[&str])] = &[
    ("job requirements", &["requirement", "skill", "experience", "qualification"]),
    ("compensation", &["salary", "pay", "compensation", "benefit"]),
    ("scheduling", &["interview", "schedule", "book", "slot"]),
    ("company information", &["company", "culture", "team", "office"]),
];

/// Result of wrapping up.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExitOutcome {
    /// Goodbye for the candidate.
    pub message: String,
    /// Summary of the conversation.
    pub summary: String,
    /// Transcript and summary were stored.
    pub persisted: bool,
}

/// Produces the goodbye and stores the conversation.
#[derive(Clone)]
pub struct ExitHandler {
    provider: Option<Arc<dyn LlmProvider>>,
    candidates: Arc<dyn CandidateStore>,
}

impl ExitHandler {
    /// Create a handler.
    pub fn new(provider: Option<Arc<dyn LlmProvider>>, candidates: Arc<dyn CandidateStore>) -> Self {
        Self {
            provider,
            candidates,
        }
    }

    /// Write the goodbye and summary and persist them when the phone is known.
    ///
    /// Never fails: model errors fall back to fixed text and storage errors
    /// are logged.
    pub async fn finish(&self, state: &ConversationState, context: &str) -> ExitOutcome {
        let message = self.exit_message(state, context).await;
        let summary = self.summary(state).await;

        let persisted = match state.phone() {
            Some(phone) => self.persist(phone, state, &summary).await,
            None => false,
        };

        ExitOutcome {
            message,
            summary,
            persisted,
        }
    }

    async fn exit_message(&self, state: &ConversationState, context: &str) -> String {
        let Some(provider) = &self.provider else {
            return FALLBACK_EXIT_MESSAGE.to_owned();
        };
        let interview = match &state.scheduled_interview {
            Some((position, key)) => format!("Scheduled interview: {position} on {key}"),
            None => "Scheduled interview: none".to_owned(),
        };
        let user = format!("{interview}\n\nConversation:\n{context}");
        match complete_text(
            provider.as_ref(),
            prompts::EXIT_SYSTEM,
            &user,
            EXIT_MAX_TOKENS,
            EXIT_TEMPERATURE,
        )
        .await
        {
            Ok(text) => text,
            Err(e) => {
                warn!(error = %e, "exit message failed, using fixed text");
                FALLBACK_EXIT_MESSAGE.to_owned()
            }
        }
    }

    async fn summary(&self, state: &ConversationState) -> String {
        let Some(provider) = &self.provider else {
            return fallback_summary(state);
        };
        let transcript = state
            .transcript
            .iter()
            .map(|t| format!("{}: {}", t.speaker.as_str(), t.text))
            .collect::<Vec<_>>()
            .join("\n");
        let previous = state.previous_summary.as_deref().unwrap_or("none");
        let user = format!("Previous summary: {previous}\n\nConversation:\n{transcript}");
        match complete_text(
            provider.as_ref(),
            prompts::SUMMARY_SYSTEM,
            &user,
            SUMMARY_MAX_TOKENS,
            SUMMARY_TEMPERATURE,
        )
        .await
        {
            Ok(text) => text,
            Err(e) => {
                warn!(error = %e, "summary failed, using counts");
                fallback_summary(state)
            }
        }
    }

    async fn persist(&self, phone: &str, state: &ConversationState, summary: &str) -> bool {
        let masked = masked_phone(phone);
        let entries = state.transcript_entries();
        if let Err(e) = self.candidates.save_transcript(phone, &entries).await {
            warn!(candidate = %masked, error = %e, "failed to save transcript");
            return false;
        }
        if let Err(e) = self.candidates.update_summary(phone, summary).await {
            warn!(candidate = %masked, error = %e, "failed to save summary");
            return false;
        }
        info!(candidate = %masked, messages = entries.len(), "conversation saved");
        true
    }
}

/// Summary built from message counts and keyword topics.
pub fn fallback_summary(state: &ConversationState) -> String {
    let total = state.transcript.len();
    let from_user: Vec<String> = state
        .transcript
        .iter()
        .filter(|t| t.speaker == Speaker::User)
        .map(|t| t.text.to_lowercase())
        .collect();
    let assistant = total.saturating_sub(from_user.len());

    let mut lines = vec![format!(
        "Conversation with {total} messages ({} from the candidate, {assistant} from the assistant).",
        from_user.len()
    )];
    if let Some(previous) = &state.previous_summary {
        lines.push(format!("Previous context: {previous}"));
    }

    let topics: Vec<&str> = SUMMARY_TOPICS
        .iter()
        .filter(|(_, words)| {
            from_user
                .iter()
                .any(|text| words.iter().any(|w| text.contains(w)))
        })
        .map(|(topic, _)| *topic)
        .collect();
    if topics.is_empty() {
        lines.push("Topics discussed: general inquiry.".to_owned());
    } else {
        lines.push(format!("Topics discussed: {}.", topics.join(", ")));
    }

    lines.join("\n")
}
