//! Per-turn action classification.
//!
//! An [`IntentRouter`] wraps one [`IntentStrategy`]. [`KeywordStrategy`] is a
//! deterministic substring matcher; [`ModelStrategy`] asks the model and falls
//! back to the keyword matcher when the call fails. Whatever the strategy,
//! unregistered candidates can only `continue` or `end`.

use std::fmt;
use std::sync::{Arc, LazyLock};

use async_trait::async_trait;
use chrono::NaiveDate;
use regex::Regex;
use serde::Serialize;
use serde_json::Value;
use tracing::{debug, warn};

use crate::config::IntentStrategyKind;
use crate::providers::router::{roles, ModelRouter};
use crate::providers::{complete_text, CompletionRequest, LlmProvider};
use crate::scheduling::slot::{parse_time, SlotRequest, TIME_FORMAT};
use crate::scheduling::SchedulingIntent;

use super::prompts;

// ---------------------------------------------------------------------------
// Actions
// ---------------------------------------------------------------------------

/// Top-level decision for one turn.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Action {
    /// Keep talking: registration or questions.
    Continue,
    /// Work on the interview booking.
    Schedule,
    /// Wrap up the conversation.
    End,
}

impl Action {
    /// Wire token.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Continue => "continue",
            Self::Schedule => "schedule",
            Self::End => "end",
        }
    }

    /// Exact-match parse of a wire token.
    pub fn parse(token: &str) -> Option<Self> {
        match token {
            "continue" => Some(Self::Continue),
            "schedule" => Some(Self::Schedule),
            "end" => Some(Self::End),
            _ => None,
        }
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A strategy produced a token outside `continue | schedule | end`.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unrecognized action: {0:?}")]
pub struct UnrecognizedAction(pub String);

// ---------------------------------------------------------------------------
// Keyword tables
// ---------------------------------------------------------------------------

/// Scheduling and reschedule phrases.
pub const SCHEDULE_KEYWORDS: &[&str] = &[
    "schedule",
    "interview",
    "meeting",
    "book",
    "reschedule",
    "change time",
    "different time",
    "move interview",
    "change interview",
];

/// Disinterest phrases; these end the conversation.
pub const DISINTEREST_KEYWORDS: &[&str] = &[
    "cancel",
    "cancel interview",
    "cancel meeting",
    "not interested",
    "already have a job",
    "found another position",
    "not looking",
];

/// Goodbye phrases.
pub const GOODBYE_KEYWORDS: &[&str] = &[
    "bye",
    "end",
    "stop",
    "goodbye",
    "thank you",
    "see you",
    "quit",
    "no thanks",
    "pass",
    "not a good fit",
    "end conversation",
];

/// Agreement phrases; these move towards scheduling.
pub const AGREEMENT_KEYWORDS: &[&str] = &["yes", "interested", "sounds good", "great", "perfect"];

const STATUS_KEYWORDS: &[&str] = &["status", "when is my", "my interview"];
/// Words that make "my interview" a booking request rather than a lookup.
const BOOKING_VERBS: &[&str] = &["schedule", "book", "pick", "choose"];
const RESCHEDULE_KEYWORDS: &[&str] = &[
    "reschedule",
    "change time",
    "different time",
    "move interview",
    "change interview",
];
const REJECTION_KEYWORDS: &[&str] = &[
    "other",
    "different",
    "more options",
    "none of",
    "don't work",
    "doesn't work",
];

static SLOT_PATTERN: LazyLock<Option<Regex>> =
    LazyLock::new(|| Regex::new(r"(\d{4}-\d{2}-\d{2})[ T]+(\d{1,2}:\d{2})").ok());
static TIME_PATTERN: LazyLock<Option<Regex>> =
    LazyLock::new(|| Regex::new(r"\b(\d{1,2}:\d{2})\b").ok());

fn contains_any(haystack: &str, needles: &[&str]) -> bool {
    needles.iter().any(|n| haystack.contains(n))
}

/// `YYYY-MM-DD HH:MM` found in the message, if any.
fn slot_in(message: &str) -> Option<String> {
    let caps = SLOT_PATTERN.as_ref()?.captures(message)?;
    Some(format!("{} {}", caps.get(1)?.as_str(), caps.get(2)?.as_str()))
}

/// Keyword action decision.
///
/// Case-insensitive substring match, first list to match wins: scheduling,
/// disinterest, goodbye, agreement. A message naming an explicit slot also
/// schedules. Anything else continues.
pub fn keyword_action(message: &str) -> Action {
    let lower = message.to_lowercase();
    if contains_any(&lower, SCHEDULE_KEYWORDS) {
        Action::Schedule
    } else if contains_any(&lower, DISINTEREST_KEYWORDS) || contains_any(&lower, GOODBYE_KEYWORDS) {
        Action::End
    } else if contains_any(&lower, AGREEMENT_KEYWORDS) || slot_in(message).is_some() {
        Action::Schedule
    } else {
        Action::Continue
    }
}

// ---------------------------------------------------------------------------
// Scheduling sub-intent
// ---------------------------------------------------------------------------

/// Inputs for the scheduling sub-intent.
#[derive(Debug, Clone, Copy)]
pub struct SchedulingContext<'a> {
    /// Recent conversation.
    pub context: &'a str,
    /// Slots offered earlier in this scheduling exchange.
    pub offered_slots: &'a [String],
    /// Open positions.
    pub positions: &'a [String],
    /// Position used when none is named.
    pub default_position: &'a str,
    /// Calendar date for relative dates.
    pub today: NaiveDate,
}

/// What a scheduling turn should do.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ScheduleDecision {
    /// Run this intent through the coordinator.
    Intent(SchedulingIntent),
    /// Reply with this text without touching the store.
    Reply(String),
    /// The message was not about scheduling.
    Handoff,
}

fn position_in(lower: &str, positions: &[String]) -> Option<String> {
    positions
        .iter()
        .find(|p| lower.contains(&p.to_lowercase()))
        .cloned()
}

/// Keyword scheduling sub-intent.
pub fn keyword_scheduling_intent(message: &str, ctx: &SchedulingContext<'_>) -> SchedulingIntent {
    let lower = message.to_lowercase();
    let position = position_in(&lower, ctx.positions);

    if let Some(slot) = slot_in(message) {
        return SchedulingIntent::Book {
            position,
            slot: SlotRequest::Raw(slot),
        };
    }
    if lower.contains("cancel") {
        return SchedulingIntent::Cancel;
    }
    if contains_any(&lower, RESCHEDULE_KEYWORDS) {
        return SchedulingIntent::Search {
            position,
            start_date: None,
            end_date: None,
            excluded: Vec::new(),
        };
    }
    if let Some(slot) = offered_slot_at_time(message, ctx.offered_slots) {
        return SchedulingIntent::Book {
            position,
            slot: SlotRequest::Raw(slot),
        };
    }
    if contains_any(&lower, STATUS_KEYWORDS) && !contains_any(&lower, BOOKING_VERBS) {
        return SchedulingIntent::Status;
    }

    let excluded = if contains_any(&lower, REJECTION_KEYWORDS) {
        ctx.offered_slots.to_vec()
    } else {
        Vec::new()
    };
    SchedulingIntent::Search {
        position,
        start_date: None,
        end_date: None,
        excluded,
    }
}

/// The single offered slot whose time the message names.
fn offered_slot_at_time(message: &str, offered: &[String]) -> Option<String> {
    let caps = TIME_PATTERN.as_ref()?.captures(message)?;
    let time = parse_time(caps.get(1)?.as_str())?.format(TIME_FORMAT).to_string();
    let mut matches = offered.iter().filter(|s| s.ends_with(&time));
    let first = matches.next()?;
    match matches.next() {
        Some(_) => None,
        None => Some(first.clone()),
    }
}

// ---------------------------------------------------------------------------
// Strategies
// ---------------------------------------------------------------------------

/// A way of classifying candidate messages.
#[async_trait]
pub trait IntentStrategy: Send + Sync {
    /// Name used in logs.
    fn name(&self) -> &'static str;

    /// Raw action token for the message.
    async fn decide_action(&self, message: &str, context: &str) -> String;

    /// Scheduling sub-intent. Defaults to keyword matching.
    async fn scheduling_intent(
        &self,
        message: &str,
        ctx: &SchedulingContext<'_>,
    ) -> ScheduleDecision {
        ScheduleDecision::Intent(keyword_scheduling_intent(message, ctx))
    }
}

/// Deterministic keyword matcher.
#[derive(Debug, Clone, Copy, Default)]
pub struct KeywordStrategy;

#[async_trait]
impl IntentStrategy for KeywordStrategy {
    fn name(&self) -> &'static str {
        "keyword"
    }

    async fn decide_action(&self, message: &str, _context: &str) -> String {
        keyword_action(message).as_str().to_owned()
    }
}

const DECIDE_MAX_TOKENS: u32 = 10;
const DECIDE_TEMPERATURE: f32 = 0.1;
const SCHEDULING_MAX_TOKENS: u32 = 300;
const SCHEDULING_TEMPERATURE: f32 = 0.2;

/// Model-backed classifier with keyword fallback on provider failure.
#[derive(Clone)]
pub struct ModelStrategy {
    intent: Arc<dyn LlmProvider>,
    scheduling: Arc<dyn LlmProvider>,
}

impl ModelStrategy {
    /// Use separate providers for the action decision and scheduling.
    pub fn new(intent: Arc<dyn LlmProvider>, scheduling: Arc<dyn LlmProvider>) -> Self {
        Self { intent, scheduling }
    }

    /// Resolve both providers from the router.
    pub fn from_router(router: &ModelRouter) -> Self {
        Self::new(router.resolve(roles::INTENT), router.resolve(roles::SCHEDULING))
    }
}

#[async_trait]
impl IntentStrategy for ModelStrategy {
    fn name(&self) -> &'static str {
        "model"
    }

    async fn decide_action(&self, message: &str, context: &str) -> String {
        let prompt = prompts::decide_action_prompt(context, message);
        match complete_text(
            self.intent.as_ref(),
            prompts::DECIDE_ACTION_SYSTEM,
            &prompt,
            DECIDE_MAX_TOKENS,
            DECIDE_TEMPERATURE,
        )
        .await
        {
            Ok(answer) => {
                let token = answer.trim().to_lowercase();
                match Action::parse(&token) {
                    Some(action) => action.as_str().to_owned(),
                    None => {
                        debug!(answer = %token, "model gave no action token, continuing");
                        Action::Continue.as_str().to_owned()
                    }
                }
            }
            Err(e) => {
                warn!(error = %e, "intent model failed, using keywords");
                keyword_action(message).as_str().to_owned()
            }
        }
    }

    async fn scheduling_intent(
        &self,
        message: &str,
        ctx: &SchedulingContext<'_>,
    ) -> ScheduleDecision {
        let offered = if ctx.offered_slots.is_empty() {
            "none".to_owned()
        } else {
            ctx.offered_slots.join(", ")
        };
        let user = format!(
            "Context:\n{}\n\nPreviously offered slots: {offered}\n\nCandidate message: {message}",
            ctx.context
        );
        let request = CompletionRequest::prompt(
            prompts::scheduling_system(ctx.today, ctx.default_position),
            user,
        )
        .tools(prompts::scheduling_tools())
        .max_tokens(SCHEDULING_MAX_TOKENS)
        .temperature(SCHEDULING_TEMPERATURE);

        let response = match self.scheduling.complete(request).await {
            Ok(response) => response,
            Err(e) => {
                warn!(error = %e, "scheduling model failed, using keywords");
                return ScheduleDecision::Intent(keyword_scheduling_intent(message, ctx));
            }
        };

        if let Some((tool, input)) = response.first_tool_use() {
            debug!(tool, "scheduling tool requested");
            if let Some(intent) = intent_from_tool(tool, input) {
                return ScheduleDecision::Intent(intent);
            }
            warn!(tool, "unknown scheduling tool, using keywords");
            return ScheduleDecision::Intent(keyword_scheduling_intent(message, ctx));
        }

        let text = response.text();
        let text = text.trim();
        if text.contains(prompts::HANDOFF_MARKER) {
            ScheduleDecision::Handoff
        } else if text.is_empty() {
            ScheduleDecision::Intent(keyword_scheduling_intent(message, ctx))
        } else {
            ScheduleDecision::Reply(text.to_owned())
        }
    }
}

/// Map a scheduling tool call onto an intent.
pub fn intent_from_tool(tool: &str, input: &Value) -> Option<SchedulingIntent> {
    let string = |key: &str| {
        input
            .get(key)
            .and_then(Value::as_str)
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(str::to_owned)
    };
    let date = |key: &str| {
        string(key).and_then(|s| NaiveDate::parse_from_str(&s, "%Y-%m-%d").ok())
    };

    match tool {
        "get_available_slots" => Some(SchedulingIntent::Search {
            position: string("position"),
            start_date: date("start_date"),
            end_date: date("end_date"),
            excluded: input
                .get("excluded_slots")
                .and_then(Value::as_array)
                .map(|items| {
                    items
                        .iter()
                        .filter_map(Value::as_str)
                        .map(str::to_owned)
                        .collect()
                })
                .unwrap_or_default(),
        }),
        "set_schedule" => {
            let raw = input.get("slot").cloned().unwrap_or(Value::Null);
            let slot = SlotRequest::from_json(&raw)
                .unwrap_or_else(|_| SlotRequest::Raw(raw.to_string()));
            Some(SchedulingIntent::Book {
                position: string("position"),
                slot,
            })
        }
        "get_schedule" => Some(SchedulingIntent::Status),
        "delete_schedule" => Some(SchedulingIntent::Cancel),
        _ => None,
    }
}

// ---------------------------------------------------------------------------
// Router
// ---------------------------------------------------------------------------

/// Applies a strategy and the registration gate.
#[derive(Clone)]
pub struct IntentRouter {
    strategy: Arc<dyn IntentStrategy>,
}

impl fmt::Debug for IntentRouter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("IntentRouter")
            .field("strategy", &self.strategy.name())
            .finish()
    }
}

impl IntentRouter {
    /// Wrap a strategy.
    pub fn new(strategy: Arc<dyn IntentStrategy>) -> Self {
        Self { strategy }
    }

    /// Keyword-only router.
    pub fn keyword() -> Self {
        Self::new(Arc::new(KeywordStrategy))
    }

    /// Build the configured strategy. Without models the keyword strategy is used.
    pub fn from_config(kind: IntentStrategyKind, models: Option<&ModelRouter>) -> Self {
        match (kind, models) {
            (IntentStrategyKind::Model, Some(router)) => {
                Self::new(Arc::new(ModelStrategy::from_router(router)))
            }
            (IntentStrategyKind::Model, None) => {
                warn!("model intent strategy requested but no model is available, using keywords");
                Self::keyword()
            }
            (IntentStrategyKind::Keyword, _) => Self::keyword(),
        }
    }

    /// Name of the wrapped strategy.
    pub fn strategy_name(&self) -> &'static str {
        self.strategy.name()
    }

    /// Decide the action for a message.
    ///
    /// Unregistered candidates are held at `continue` unless they are leaving.
    ///
    /// # Errors
    ///
    /// Returns [`UnrecognizedAction`] when the strategy answers with an
    /// unknown token.
    pub async fn decide(
        &self,
        message: &str,
        context: &str,
        registered: bool,
    ) -> Result<Action, UnrecognizedAction> {
        let raw = self.strategy.decide_action(message, context).await;
        let action = Action::parse(raw.trim()).ok_or(UnrecognizedAction(raw))?;
        if !registered && action != Action::End {
            if action != Action::Continue {
                debug!(requested = %action, "unregistered candidate held at continue");
            }
            return Ok(Action::Continue);
        }
        Ok(action)
    }

    /// Scheduling sub-intent for a message.
    pub async fn scheduling_intent(
        &self,
        message: &str,
        ctx: &SchedulingContext<'_>,
    ) -> ScheduleDecision {
        self.strategy.scheduling_intent(message, ctx).await
    }
}
