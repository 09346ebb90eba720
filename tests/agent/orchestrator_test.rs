//! Tests for full conversation turns.

use std::sync::Arc;

use async_trait::async_trait;

use hirebot::agent::exit::FALLBACK_EXIT_MESSAGE;
use hirebot::agent::intent::{Action, IntentRouter, IntentStrategy};
use hirebot::agent::prompts;
use hirebot::agent::{ConversationOrchestrator, UNRECOGNIZED_ACTION_MESSAGE};
use hirebot::candidates::SqliteCandidateStore;
use hirebot::config::IntentStrategyKind;

use crate::support::{config, router, seeded_pool, services, text, tool_call, FnProvider};

async fn keyword_orchestrator() -> (ConversationOrchestrator, sqlx::SqlitePool) {
    let pool = seeded_pool().await;
    let orchestrator =
        ConversationOrchestrator::new(&config(IntentStrategyKind::Keyword), services(&pool, None));
    (orchestrator, pool)
}

// ---------------------------------------------------------------------------
// Fallback-only conversation
// ---------------------------------------------------------------------------

#[tokio::test]
async fn register_schedule_and_leave() {
    let (mut bot, pool) = keyword_orchestrator().await;

    let hello = bot
        .process_message("Hi, I'm John, my number is 123-456-7890")
        .await;
    assert_eq!(hello.action, Action::Continue);
    assert_eq!(
        hello.message,
        "Thank you for providing your details, John. We will contact you at 1234567890."
    );
    assert!(hello.metadata.user_registered);
    assert_eq!(hello.metadata.registration_step, "complete");
    assert_eq!(hello.metadata.phone_number.as_deref(), Some("1234567890"));

    let offer = bot.process_message("I'd like to schedule an interview").await;
    assert_eq!(offer.action, Action::Schedule);
    assert_eq!(offer.metadata.scheduling_outcome.as_deref(), Some("slots_offered"));
    assert!(offer.message.contains("Wednesday, September 10"));
    assert_eq!(bot.state().offered_slots.len(), 3);

    let booked = bot.process_message("2025-09-10 10:00").await;
    assert_eq!(booked.action, Action::Continue);
    assert_eq!(
        booked.metadata.scheduling_outcome.as_deref(),
        Some("schedule_confirmed")
    );
    assert!(booked.metadata.scheduling_completed);
    assert_eq!(booked.metadata.scheduled_interview, "2025-09-10 10:00");
    assert!(booked
        .message
        .starts_with("Perfect! Your interview for Python Developer has been scheduled for Wednesday, September 10 at 10:00."));
    assert!(bot.state().offered_slots.is_empty());

    let bye = bot.process_message("no thanks, that's all").await;
    assert_eq!(bye.action, Action::End);
    assert_eq!(bye.message, FALLBACK_EXIT_MESSAGE);

    // State is cleared after the goodbye.
    assert!(bot.state().transcript.is_empty());
    assert!(bot.state().name().is_none());
    assert_eq!(bye.metadata.conversation_length, 0);

    // The transcript holds every line except the goodbye.
    let candidates = SqliteCandidateStore::new(pool);
    let history = candidates
        .conversation_history("1234567890", 5)
        .await
        .expect("history");
    assert_eq!(history.len(), 1);
    assert_eq!(history[0].message_count, 7);
    assert_eq!(history[0].transcript[0].role, "user");
    assert_eq!(
        history[0].transcript[6].content,
        "no thanks, that's all"
    );

    let record = candidates
        .get_candidate("1234567890")
        .await
        .expect("lookup")
        .expect("record");
    let summary = record.conversation_summary.expect("summary saved");
    assert!(summary.starts_with(
        "Conversation with 7 messages (4 from the candidate, 3 from the assistant)."
    ));
    assert!(summary.contains("scheduling"));

    // The booking outlives the conversation.
    let interview = bot
        .get_schedule("123-456-7890")
        .await
        .expect("lookup")
        .expect("booking");
    assert_eq!(interview.key().to_string(), "2025-09-10 10:00");
}

#[tokio::test]
async fn scheduling_requires_registration() {
    let (mut bot, _pool) = keyword_orchestrator().await;

    let reply = bot.process_message("Can I book an interview?").await;
    assert_eq!(reply.action, Action::Continue);
    assert_eq!(
        reply.message,
        "Hi! Could you please tell me your full name and phone number to proceed?"
    );
    assert!(reply.metadata.scheduling_outcome.is_none());
    assert_eq!(reply.metadata.scheduled_interview, "N/A");
    assert_eq!(reply.metadata.conversation_length, 2);
}

#[tokio::test]
async fn rejection_excludes_offered_dates() {
    let (mut bot, _pool) = keyword_orchestrator().await;
    bot.process_message("I'm Ana, 5551234567").await;
    bot.process_message("schedule please").await;

    let more = bot
        .process_message("yes but none of those dates work, other options?")
        .await;
    assert_eq!(more.action, Action::Schedule);
    assert_eq!(more.metadata.scheduling_outcome.as_deref(), Some("slots_offered"));
    assert!(more.message.contains("preferred time range"));
}

#[tokio::test]
async fn cancel_through_conversation_releases_booking() {
    let (mut bot, _pool) = keyword_orchestrator().await;
    bot.process_message("I'm Ana, 5551234567").await;
    bot.process_message("book 2025-09-11 09:00").await;
    assert!(bot.state().scheduled_interview.is_some());

    let cancelled = bot.process_message("please cancel my interview").await;
    assert_eq!(cancelled.action, Action::Schedule);
    assert_eq!(
        cancelled.metadata.scheduling_outcome.as_deref(),
        Some("schedule_cancelled")
    );
    assert_eq!(cancelled.metadata.scheduled_interview, "N/A");
    assert!(bot
        .get_schedule("5551234567")
        .await
        .expect("lookup")
        .is_none());
}

#[tokio::test]
async fn reset_forgets_the_candidate() {
    let (mut bot, _pool) = keyword_orchestrator().await;
    bot.process_message("I'm John, 123-456-7890").await;
    assert!(bot.state().is_registered());

    bot.reset_conversation();
    assert!(!bot.state().is_registered());
    assert!(bot.state().transcript.is_empty());

    let reply = bot.process_message("book an interview").await;
    assert_eq!(reply.action, Action::Continue);
}

// ---------------------------------------------------------------------------
// Strategy edge cases
// ---------------------------------------------------------------------------

struct Dancer;

#[async_trait]
impl IntentStrategy for Dancer {
    fn name(&self) -> &'static str {
        "dancer"
    }

    async fn decide_action(&self, _message: &str, _context: &str) -> String {
        "dance".to_owned()
    }
}

#[tokio::test]
async fn unknown_action_gets_apology() {
    let (bot, _pool) = keyword_orchestrator().await;
    let mut bot = bot.with_intent_router(IntentRouter::new(Arc::new(Dancer)));

    let reply = bot.process_message("hello").await;
    assert_eq!(reply.action, Action::Continue);
    assert_eq!(reply.message, UNRECOGNIZED_ACTION_MESSAGE);
    assert_eq!(reply.metadata.conversation_length, 2);
}

// ---------------------------------------------------------------------------
// Model-backed conversation
// ---------------------------------------------------------------------------

#[tokio::test]
async fn model_tool_call_books_slot() {
    let provider = FnProvider::new(|req| {
        if !req.tools.is_empty() {
            return tool_call(
                "set_schedule",
                serde_json::json!({"slot": "2025-09-10 16:00"}),
            );
        }
        match req.system.as_deref() {
            Some(prompts::DECIDE_ACTION_SYSTEM) => text("schedule"),
            Some(prompts::EXTRACT_NAME_SYSTEM) => text("John"),
            Some(prompts::EXTRACT_PHONE_SYSTEM) => text("123-456-7890"),
            Some(prompts::POST_SCHEDULING_SYSTEM) => text("All booked, see you then!"),
            _ => text("ok"),
        }
    });
    let pool = seeded_pool().await;
    let mut bot = ConversationOrchestrator::new(
        &config(IntentStrategyKind::Model),
        services(&pool, Some(router(provider))),
    );
    // Unregistered, so the model's "schedule" is held at registration.
    let first = bot.process_message("I'm John, 123-456-7890").await;
    assert_eq!(first.action, Action::Continue);
    assert!(first.metadata.user_registered);

    let booked = bot.process_message("the afternoon one please").await;
    assert_eq!(booked.action, Action::Continue);
    assert_eq!(booked.message, "All booked, see you then!");
    assert_eq!(booked.metadata.scheduled_interview, "2025-09-10 16:00");
}

#[tokio::test]
async fn handoff_answers_the_question_instead() {
    let provider = FnProvider::new(|req| {
        if !req.tools.is_empty() {
            return text(prompts::HANDOFF_MARKER);
        }
        match req.system.as_deref() {
            Some(prompts::DECIDE_ACTION_SYSTEM) => text("schedule"),
            Some(prompts::EXTRACT_NAME_SYSTEM) => text("John"),
            Some(prompts::EXTRACT_PHONE_SYSTEM) => text("1234567890"),
            _ => text("The role is fully remote."),
        }
    });
    let pool = seeded_pool().await;
    let mut bot = ConversationOrchestrator::new(
        &config(IntentStrategyKind::Model),
        services(&pool, Some(router(provider))),
    );
    bot.process_message("John, 1234567890").await;
    assert!(bot.state().is_registered());

    let reply = bot.process_message("is it remote?").await;
    assert_eq!(reply.action, Action::Continue);
    assert_eq!(reply.message, "The role is fully remote.");
    assert!(reply.metadata.scheduling_outcome.is_none());
}
