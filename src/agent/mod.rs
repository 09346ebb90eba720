//! Conversation orchestration.
//!
//! A [`ConversationOrchestrator`] owns one candidate conversation. Each call
//! to [`ConversationOrchestrator::process_message`] asks the
//! [`intent::IntentRouter`] for an action and routes the turn to
//! registration, question answering, scheduling or wrap-up. Every turn
//! produces a [`TurnResponse`]; collaborator failures degrade to fixed text.
//!
//! [`sessions::ConversationRegistry`] keeps one orchestrator per conversation
//! id so independent conversations can run concurrently.

pub mod context;
pub mod exit;
pub mod intent;
pub mod prompts;
pub mod registration;
pub mod sessions;
pub mod state;

use std::sync::Arc;

use serde::Serialize;
use tracing::{debug, info, warn};

use crate::candidates::CandidateStore;
use crate::config::Config;
use crate::knowledge::responder::InfoResponder;
use crate::knowledge::DocumentRetriever;
use crate::providers::router::{roles, ModelRouter};
use crate::providers::{complete_text, LlmProvider};
use crate::scheduling::slot::Interview;
use crate::scheduling::{SchedulingCoordinator, SchedulingIntent, SchedulingOutcome, StoreError};

use self::context::build_context;
use self::exit::ExitHandler;
use self::intent::{Action, IntentRouter, ScheduleDecision, SchedulingContext};
use self::registration::RegistrationFlow;
use self::state::{ConversationState, Speaker};

/// Reply when the intent strategy returns an unknown action.
pub const UNRECOGNIZED_ACTION_MESSAGE: &str =
    "I apologize, but I encountered an error. Could you please try again?";

const POST_SCHEDULING_MAX_TOKENS: u32 = 120;
const POST_SCHEDULING_TEMPERATURE: f32 = 0.7;

// ---------------------------------------------------------------------------
// Response envelope
// ---------------------------------------------------------------------------

/// Snapshot of the conversation reported with every reply.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TurnMetadata {
    /// Candidate name.
    pub name: Option<String>,
    /// Canonical phone.
    pub phone_number: Option<String>,
    /// Name and phone both known.
    pub user_registered: bool,
    /// `welcome`, `job_interest` or `complete`.
    pub registration_step: String,
    /// A candidate record existed before this conversation.
    pub user_exists: bool,
    /// `YYYY-MM-DD HH:MM`, or `N/A`.
    pub scheduled_interview: String,
    /// Open positions.
    pub available_positions: Vec<String>,
    /// Lines in the transcript.
    pub conversation_length: usize,
    /// Action reported for this turn.
    pub action: String,
    /// A booking was confirmed in this conversation.
    pub scheduling_completed: bool,
    /// Scheduling outcome label, on scheduling turns.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub scheduling_outcome: Option<String>,
}

/// Reply for one turn.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TurnResponse {
    /// Visible action.
    pub action: Action,
    /// Text for the candidate.
    pub message: String,
    /// Conversation snapshot after the turn.
    pub metadata: TurnMetadata,
}

// ---------------------------------------------------------------------------
// Orchestrator
// ---------------------------------------------------------------------------

/// Shared collaborators used to build orchestrators.
#[derive(Clone)]
pub struct AgentServices {
    /// Model providers. `None` runs every step on fallbacks.
    pub models: Option<ModelRouter>,
    /// Scheduling front end.
    pub scheduling: SchedulingCoordinator,
    /// Candidate persistence.
    pub candidates: Arc<dyn CandidateStore>,
    /// Job document lookup.
    pub documents: Arc<dyn DocumentRetriever>,
}

/// One candidate conversation.
pub struct ConversationOrchestrator {
    state: ConversationState,
    router: IntentRouter,
    registration: RegistrationFlow,
    scheduling: SchedulingCoordinator,
    info: InfoResponder,
    exit: ExitHandler,
    post_scheduling: Option<Arc<dyn LlmProvider>>,
    positions: Vec<String>,
    context_messages: usize,
    max_turns: usize,
}

struct TurnResult {
    action: Action,
    message: String,
    outcome: Option<&'static str>,
}

impl TurnResult {
    fn new(action: Action, message: String) -> Self {
        Self {
            action,
            message,
            outcome: None,
        }
    }
}

impl ConversationOrchestrator {
    /// Build a conversation from config and shared services.
    pub fn new(config: &Config, services: AgentServices) -> Self {
        let models = services.models.as_ref();
        let provider = |role: &str| models.map(|m| m.resolve(role));

        let router = IntentRouter::from_config(config.agent.intent_strategy, models);
        let registration = RegistrationFlow::new(
            provider(roles::REGISTRATION),
            Arc::clone(&services.candidates),
            services.scheduling.clone(),
        );
        let positions = config.scheduling.positions.clone();
        let info = InfoResponder::new(
            provider(roles::INFO),
            services.documents,
            positions.clone(),
            config.knowledge.top_k,
        );
        let exit = ExitHandler::new(provider(roles::EXIT), services.candidates);

        Self {
            state: ConversationState::default(),
            router,
            registration,
            scheduling: services.scheduling,
            info,
            exit,
            post_scheduling: provider(roles::SCHEDULING),
            positions,
            context_messages: config.agent.context_messages,
            max_turns: config.agent.max_transcript_turns,
        }
    }

    /// Replace the intent router.
    #[must_use]
    pub fn with_intent_router(mut self, router: IntentRouter) -> Self {
        self.router = router;
        self
    }

    /// Current conversation state.
    pub fn state(&self) -> &ConversationState {
        &self.state
    }

    /// Handle one candidate message.
    pub async fn process_message(&mut self, text: &str) -> TurnResponse {
        let text = text.trim();
        let context = build_context(&self.state, self.context_messages);
        self.state.record(Speaker::User, text, self.max_turns);

        let registered = self.state.is_registered();
        let action = match self.router.decide(text, &context, registered).await {
            Ok(action) => action,
            Err(e) => {
                warn!(error = %e, strategy = self.router.strategy_name(), "unrecognized action");
                return self.respond(TurnResult::new(
                    Action::Continue,
                    UNRECOGNIZED_ACTION_MESSAGE.to_owned(),
                ));
            }
        };
        debug!(action = %action, registered, "action decided");

        let result = match action {
            Action::End => return self.finish().await,
            _ if !registered => {
                let outcome = self.registration.handle(&mut self.state, text, &context).await;
                TurnResult::new(Action::Continue, outcome.message)
            }
            Action::Continue => {
                let message = self.info.answer(text, &context, self.interview_position()).await;
                TurnResult::new(Action::Continue, message)
            }
            Action::Schedule => self.schedule(text, &context).await,
        };
        self.respond(result)
    }

    /// Forget the conversation.
    pub fn reset_conversation(&mut self) {
        info!("conversation reset");
        self.state.reset();
    }

    /// Look up a booking directly.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] when the slot store cannot be read.
    pub async fn get_schedule(&self, phone: &str) -> Result<Option<Interview>, StoreError> {
        self.scheduling.get_schedule(phone).await
    }

    fn interview_position(&self) -> Option<&str> {
        self.state
            .scheduled_interview
            .as_ref()
            .map(|(position, _)| position.as_str())
    }

    async fn schedule(&mut self, text: &str, context: &str) -> TurnResult {
        let decision = {
            let ctx = SchedulingContext {
                context,
                offered_slots: &self.state.offered_slots,
                positions: &self.positions,
                default_position: self.scheduling.default_position(),
                today: self.scheduling.store().today(),
            };
            self.router.scheduling_intent(text, &ctx).await
        };

        let intent = match decision {
            ScheduleDecision::Intent(intent) => intent,
            ScheduleDecision::Reply(message) => return TurnResult::new(Action::Schedule, message),
            ScheduleDecision::Handoff => {
                debug!("scheduling handed back to info answers");
                let message = self.info.answer(text, context, self.interview_position()).await;
                return TurnResult::new(Action::Continue, message);
            }
        };

        if let SchedulingIntent::Search { excluded, .. } = &intent {
            if excluded.is_empty() {
                self.state.offered_slots.clear();
            }
        }

        let outcome = self
            .scheduling
            .handle(self.state.name(), self.state.phone(), intent)
            .await;
        let message = outcome.message();

        let mut result = match &outcome {
            SchedulingOutcome::ScheduleConfirmed(interview) => {
                self.state.scheduled_interview =
                    Some((interview.position.clone(), interview.key()));
                self.state.scheduling_completed = true;
                self.state.offered_slots.clear();
                let message = self.post_scheduling_message(interview).await;
                TurnResult::new(Action::Continue, message)
            }
            SchedulingOutcome::SlotsOffered { slots, .. } => {
                for slot in slots {
                    let key = slot.key().to_string();
                    if !self.state.offered_slots.contains(&key) {
                        self.state.offered_slots.push(key);
                    }
                }
                TurnResult::new(Action::Schedule, message)
            }
            SchedulingOutcome::ScheduleStatus(interview) => {
                self.state.scheduled_interview =
                    interview.as_ref().map(|i| (i.position.clone(), i.key()));
                TurnResult::new(Action::Schedule, message)
            }
            SchedulingOutcome::ScheduleCancelled { .. } => {
                self.state.scheduled_interview = None;
                TurnResult::new(Action::Schedule, message)
            }
            SchedulingOutcome::NotRegistered => TurnResult::new(Action::Continue, message),
            SchedulingOutcome::Error { .. } => TurnResult::new(Action::Schedule, message),
        };
        result.outcome = Some(outcome.label());
        result
    }

    async fn post_scheduling_message(&self, interview: &Interview) -> String {
        let fallback = post_scheduling_fallback(interview);
        let Some(provider) = &self.post_scheduling else {
            return fallback;
        };
        let details = format!(
            "Position: {}\nDate: {}\nTime: {}",
            interview.position,
            interview.date.format("%A, %B %d, %Y"),
            interview.time.format("%H:%M")
        );
        match complete_text(
            provider.as_ref(),
            prompts::POST_SCHEDULING_SYSTEM,
            &details,
            POST_SCHEDULING_MAX_TOKENS,
            POST_SCHEDULING_TEMPERATURE,
        )
        .await
        {
            Ok(text) => text,
            Err(e) => {
                warn!(error = %e, "post-scheduling message failed, using fixed text");
                fallback
            }
        }
    }

    async fn finish(&mut self) -> TurnResponse {
        let context = build_context(&self.state, self.state.transcript.len());
        let outcome = self.exit.finish(&self.state, &context).await;
        info!(persisted = outcome.persisted, "conversation ended");

        self.state.reset();
        self.respond(TurnResult::new(Action::End, outcome.message))
    }

    fn respond(&mut self, result: TurnResult) -> TurnResponse {
        if result.action != Action::End {
            self.state
                .record(Speaker::Assistant, result.message.clone(), self.max_turns);
        }
        TurnResponse {
            action: result.action,
            metadata: self.metadata(result.action, result.outcome),
            message: result.message,
        }
    }

    fn metadata(&self, action: Action, outcome: Option<&'static str>) -> TurnMetadata {
        let state = &self.state;
        TurnMetadata {
            name: state.name().map(str::to_owned),
            phone_number: state.phone().map(str::to_owned),
            user_registered: state.is_registered(),
            registration_step: state.stage().as_str().to_owned(),
            user_exists: state.user_exists,
            scheduled_interview: state
                .scheduled_interview
                .as_ref()
                .map_or_else(|| "N/A".to_owned(), |(_, key)| key.to_string()),
            available_positions: self.positions.clone(),
            conversation_length: state.transcript.len(),
            action: action.as_str().to_owned(),
            scheduling_completed: state.scheduling_completed,
            scheduling_outcome: outcome.map(str::to_owned),
        }
    }
}

/// Confirmation follow-up used when no model is reachable.
pub fn post_scheduling_fallback(interview: &Interview) -> String {
    format!(
        "Perfect! Your interview for {} has been scheduled for {} at {}. You'll receive a confirmation email with all the details. Is there anything else you'd like to know?",
        interview.position,
        interview.date.format("%A, %B %d"),
        interview.time.format("%H:%M")
    )
}
