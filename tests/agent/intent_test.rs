//! Tests for action routing and the model-backed strategy.

use std::sync::Arc;

use serde_json::json;

use hirebot::agent::intent::{
    keyword_action, keyword_scheduling_intent, Action, IntentRouter, IntentStrategy, ModelStrategy,
    ScheduleDecision, SchedulingContext,
};
use hirebot::agent::prompts;
use hirebot::config::IntentStrategyKind;
use hirebot::scheduling::slot::SlotRequest;
use hirebot::scheduling::SchedulingIntent;

use crate::support::{router, text, today, tool_call, FnProvider};

fn positions() -> Vec<String> {
    vec!["Python Developer".to_owned(), "Data Analyst".to_owned()]
}

fn model_router(provider: Arc<FnProvider>) -> IntentRouter {
    IntentRouter::new(Arc::new(ModelStrategy::new(provider.clone(), provider)))
}

// ---------------------------------------------------------------------------
// Registration gate
// ---------------------------------------------------------------------------

#[tokio::test]
async fn unregistered_candidates_cannot_schedule() {
    let router = IntentRouter::keyword();
    let gated = router
        .decide("I want to book an interview", "", false)
        .await
        .expect("known action");
    assert_eq!(gated, Action::Continue);

    let open = router
        .decide("I want to book an interview", "", true)
        .await
        .expect("known action");
    assert_eq!(open, Action::Schedule);
}

#[tokio::test]
async fn leaving_is_allowed_before_registration() {
    let router = IntentRouter::keyword();
    let action = router
        .decide("not interested, bye", "", false)
        .await
        .expect("known action");
    assert_eq!(action, Action::End);
}

#[test]
fn keyword_precedence_prefers_scheduling() {
    // "cancel interview" matches the scheduling list before disinterest.
    assert_eq!(keyword_action("cancel interview please"), Action::Schedule);
    assert_eq!(keyword_action("no thanks"), Action::End);
    assert_eq!(keyword_action("Sounds good"), Action::Schedule);
    assert_eq!(keyword_action("What does the team do?"), Action::Continue);
}

#[test]
fn model_strategy_without_models_uses_keywords() {
    let router = IntentRouter::from_config(IntentStrategyKind::Model, None);
    assert_eq!(router.strategy_name(), "keyword");
}

// ---------------------------------------------------------------------------
// Model strategy
// ---------------------------------------------------------------------------

#[tokio::test]
async fn model_answer_is_normalized() {
    let provider = FnProvider::new(|_| text("  Schedule\n"));
    let action = model_router(provider.clone())
        .decide("whatever", "", true)
        .await
        .expect("known action");
    assert_eq!(action, Action::Schedule);

    let requests = provider.requests();
    assert_eq!(requests.len(), 1);
    assert_eq!(requests[0].system.as_deref(), Some(prompts::DECIDE_ACTION_SYSTEM));
    assert_eq!(requests[0].max_tokens, Some(10));
}

#[tokio::test]
async fn malformed_model_answer_continues() {
    let provider = FnProvider::new(|_| text("I think they want to schedule."));
    let action = model_router(provider)
        .decide("book me in", "", true)
        .await
        .expect("known action");
    assert_eq!(action, Action::Continue);
}

#[tokio::test]
async fn provider_failure_falls_back_to_keywords() {
    let router = model_router(FnProvider::failing());
    let action = router
        .decide("I'd like to schedule an interview", "", true)
        .await
        .expect("known action");
    assert_eq!(action, Action::Schedule);
}

#[tokio::test]
async fn router_built_from_models_uses_model_strategy() {
    let provider = FnProvider::new(|_| text("end"));
    let router = IntentRouter::from_config(IntentStrategyKind::Model, Some(&router(provider)));
    assert_eq!(router.strategy_name(), "model");
    assert_eq!(
        router.decide("hello", "", false).await.expect("known action"),
        Action::End
    );
}

// ---------------------------------------------------------------------------
// Scheduling sub-intent
// ---------------------------------------------------------------------------

#[tokio::test]
async fn tool_call_becomes_intent() {
    let provider = FnProvider::new(|req| {
        assert!(!req.tools.is_empty(), "scheduling tools must be offered");
        tool_call(
            "set_schedule",
            json!({"position": "Data Analyst", "slot": {"date": "2025-09-10", "time": "10:00"}}),
        )
    });
    let strategy = ModelStrategy::new(provider.clone(), provider);
    let positions = positions();
    let ctx = SchedulingContext {
        context: "",
        offered_slots: &[],
        positions: &positions,
        default_position: "Python Developer",
        today: today(),
    };

    let decision = strategy.scheduling_intent("the first one", &ctx).await;
    assert_eq!(
        decision,
        ScheduleDecision::Intent(SchedulingIntent::Book {
            position: Some("Data Analyst".to_owned()),
            slot: SlotRequest::Structured {
                date: "2025-09-10".to_owned(),
                time: "10:00".to_owned(),
            },
        })
    );
}

#[tokio::test]
async fn handoff_marker_and_plain_text() {
    let positions = positions();
    let ctx = SchedulingContext {
        context: "",
        offered_slots: &[],
        positions: &positions,
        default_position: "Python Developer",
        today: today(),
    };

    let handoff = FnProvider::new(|_| text(prompts::HANDOFF_MARKER));
    let strategy = ModelStrategy::new(handoff.clone(), handoff);
    assert_eq!(
        strategy.scheduling_intent("what's the salary?", &ctx).await,
        ScheduleDecision::Handoff
    );

    let reply = FnProvider::new(|_| text("Which day suits you best?"));
    let strategy = ModelStrategy::new(reply.clone(), reply);
    assert_eq!(
        strategy.scheduling_intent("sometime next week", &ctx).await,
        ScheduleDecision::Reply("Which day suits you best?".to_owned())
    );
}

#[tokio::test]
async fn failing_scheduling_model_uses_keyword_intent() {
    let positions = positions();
    let offered = vec!["2025-09-10 10:00".to_owned(), "2025-09-11 09:00".to_owned()];
    let ctx = SchedulingContext {
        context: "",
        offered_slots: &offered,
        positions: &positions,
        default_position: "Python Developer",
        today: today(),
    };
    let failing = FnProvider::failing();
    let strategy = ModelStrategy::new(failing.clone(), failing);

    assert_eq!(
        strategy.scheduling_intent("the 9:00 one works", &ctx).await,
        ScheduleDecision::Intent(SchedulingIntent::Book {
            position: None,
            slot: SlotRequest::Raw("2025-09-11 09:00".to_owned()),
        })
    );
}

#[test]
fn asking_to_schedule_my_interview_offers_slots() {
    let positions = positions();
    let ctx = SchedulingContext {
        context: "",
        offered_slots: &[],
        positions: &positions,
        default_position: "Python Developer",
        today: today(),
    };
    assert!(matches!(
        keyword_scheduling_intent("I want to schedule my interview", &ctx),
        SchedulingIntent::Search { position: None, .. }
    ));
    assert_eq!(
        keyword_scheduling_intent("When is my interview?", &ctx),
        SchedulingIntent::Status
    );
}

#[test]
fn booking_my_interview_at_an_offered_time_books_it() {
    let positions = positions();
    let offered = vec!["2025-09-10 10:00".to_owned(), "2025-09-10 16:00".to_owned()];
    let ctx = SchedulingContext {
        context: "",
        offered_slots: &offered,
        positions: &positions,
        default_position: "Python Developer",
        today: today(),
    };
    assert_eq!(
        keyword_scheduling_intent("please book my interview at 16:00", &ctx),
        SchedulingIntent::Book {
            position: None,
            slot: SlotRequest::Raw("2025-09-10 16:00".to_owned()),
        }
    );
}
