//! Name and phone collection across turns.

use std::sync::{Arc, LazyLock};

use regex::Regex;
use tracing::{debug, info, warn};

use crate::candidates::CandidateStore;
use crate::logging::masked_phone;
use crate::providers::{complete_text, LlmProvider};
use crate::scheduling::phone::{extract_phone, is_valid_phone, normalize_phone};
use crate::scheduling::SchedulingCoordinator;

use super::prompts;
use super::state::ConversationState;

const EXTRACT_MAX_TOKENS: u32 = 20;
const EXTRACT_TEMPERATURE: f32 = 0.0;
const REPLY_MAX_TOKENS: u32 = 150;
const REPLY_TEMPERATURE: f32 = 0.7;

static NAME_PATTERN: LazyLock<Option<Regex>> = LazyLock::new(|| {
    Regex::new(r"(?i:my name is|i am|i'm|this is)\s+(\p{Lu}[\p{L}'-]+(?:\s+\p{Lu}[\p{L}'-]+)?)").ok()
});

/// Name introduced with "my name is", "I am", "I'm" or "this is".
///
/// Only capitalised words count, so "I am interested" yields nothing.
pub fn extract_name(message: &str) -> Option<String> {
    let caps = NAME_PATTERN.as_ref()?.captures(message)?;
    Some(caps.get(1)?.as_str().to_owned())
}

/// Result of one registration turn.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RegistrationOutcome {
    /// Reply for the candidate.
    pub message: String,
    /// This turn completed registration.
    pub newly_registered: bool,
}

/// Collects the candidate's name and phone.
#[derive(Clone)]
pub struct RegistrationFlow {
    provider: Option<Arc<dyn LlmProvider>>,
    candidates: Arc<dyn CandidateStore>,
    scheduling: SchedulingCoordinator,
}

impl RegistrationFlow {
    /// Without a provider extraction is regex-only and replies are fixed text.
    pub fn new(
        provider: Option<Arc<dyn LlmProvider>>,
        candidates: Arc<dyn CandidateStore>,
        scheduling: SchedulingCoordinator,
    ) -> Self {
        Self {
            provider,
            candidates,
            scheduling,
        }
    }

    /// Run one registration turn against `state`.
    pub async fn handle(
        &self,
        state: &mut ConversationState,
        message: &str,
        context: &str,
    ) -> RegistrationOutcome {
        let name = match state.name() {
            Some(_) => None,
            None => self.extract_name(message).await,
        };
        let phone = match state.phone() {
            Some(_) => None,
            None => self.extract_phone(message).await,
        };

        let newly_registered = state.set_identity(name, phone);
        if newly_registered {
            self.on_registered(state).await;
        }

        let message = self.reply(state, context).await;
        RegistrationOutcome {
            message,
            newly_registered,
        }
    }

    async fn extract_name(&self, message: &str) -> Option<String> {
        let Some(provider) = &self.provider else {
            return extract_name(message);
        };
        match complete_text(
            provider.as_ref(),
            prompts::EXTRACT_NAME_SYSTEM,
            message,
            EXTRACT_MAX_TOKENS,
            EXTRACT_TEMPERATURE,
        )
        .await
        {
            Ok(answer) => {
                let name = answer.trim_matches(|c: char| c == '"' || c == '.' || c.is_whitespace());
                if name.is_empty() || name.eq_ignore_ascii_case("none") {
                    None
                } else {
                    Some(name.to_owned())
                }
            }
            Err(e) => {
                warn!(error = %e, "name extraction failed, using pattern");
                extract_name(message)
            }
        }
    }

    async fn extract_phone(&self, message: &str) -> Option<String> {
        let Some(provider) = &self.provider else {
            return extract_phone(message);
        };
        match complete_text(
            provider.as_ref(),
            prompts::EXTRACT_PHONE_SYSTEM,
            message,
            EXTRACT_MAX_TOKENS,
            EXTRACT_TEMPERATURE,
        )
        .await
        {
            Ok(answer) if is_valid_phone(&answer) => Some(normalize_phone(&answer)),
            Ok(answer) => {
                debug!(answer_len = answer.len(), "model found no usable phone, using patterns");
                extract_phone(message)
            }
            Err(e) => {
                warn!(error = %e, "phone extraction failed, using patterns");
                extract_phone(message)
            }
        }
    }

    /// First completion: ensure a record, load history, find bookings.
    async fn on_registered(&self, state: &mut ConversationState) {
        let Some(phone) = state.phone().map(str::to_owned) else {
            return;
        };
        let masked = masked_phone(&phone);

        match self.candidates.user_exists(&phone).await {
            Ok(true) => state.user_exists = true,
            Ok(false) => {
                if let Err(e) = self.candidates.create_user(&phone, state.name(), None).await {
                    warn!(candidate = %masked, error = %e, "failed to create candidate record");
                }
            }
            Err(e) => warn!(candidate = %masked, error = %e, "candidate lookup failed"),
        }

        match self.candidates.conversation_summary(&phone).await {
            Ok(summary) => state.previous_summary = summary,
            Err(e) => warn!(candidate = %masked, error = %e, "summary lookup failed"),
        }

        match self.scheduling.get_schedule(&phone).await {
            Ok(interview) => {
                state.scheduled_interview = interview.map(|i| {
                    let key = i.key();
                    (i.position, key)
                });
            }
            Err(e) => warn!(candidate = %masked, error = %e, "schedule lookup failed"),
        }

        info!(
            candidate = %masked,
            returning = state.user_exists,
            has_interview = state.scheduled_interview.is_some(),
            "candidate registered"
        );
    }

    async fn reply(&self, state: &ConversationState, context: &str) -> String {
        let fallback = fallback_reply(state);
        let Some(provider) = &self.provider else {
            return fallback;
        };
        let instruction = format!(
            "Conversation so far:\n{context}\n\nWrite a reply with the same meaning as this draft:\n{fallback}"
        );
        match complete_text(
            provider.as_ref(),
            prompts::REGISTRATION_SYSTEM,
            &instruction,
            REPLY_MAX_TOKENS,
            REPLY_TEMPERATURE,
        )
        .await
        {
            Ok(text) => text,
            Err(e) => {
                warn!(error = %e, "registration reply failed, using fixed text");
                fallback
            }
        }
    }
}

/// Fixed reply for the current registration state.
pub fn fallback_reply(state: &ConversationState) -> String {
    match (state.name(), state.phone()) {
        (Some(name), Some(phone)) => match &state.scheduled_interview {
            Some((position, key)) => format!(
                "Welcome back, {name}! Your interview for {position} is scheduled for {} at {}. How can I help you today?",
                key.date_str(),
                key.time_str()
            ),
            None if state.user_exists => {
                format!("Welcome back, {name}! How can I help you today?")
            }
            None => format!(
                "Thank you for providing your details, {name}. We will contact you at {phone}."
            ),
        },
        (Some(name), None) => format!(
            "Thank you for providing your name, {name}. Please share your phone number."
        ),
        (None, Some(phone)) => format!(
            "Thank you for providing your phone number, {phone}. Please share your name."
        ),
        (None, None) => {
            "Hi! Could you please tell me your full name and phone number to proceed?".to_owned()
        }
    }
}
