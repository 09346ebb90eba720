//! Tests for the conversation registry.

use std::sync::Arc;

use hirebot::agent::intent::Action;
use hirebot::agent::sessions::ConversationRegistry;
use hirebot::config::IntentStrategyKind;

use crate::support::{config, seeded_pool, services};

async fn registry() -> ConversationRegistry {
    let pool = seeded_pool().await;
    ConversationRegistry::new(config(IntentStrategyKind::Keyword), services(&pool, None))
}

#[tokio::test]
async fn conversations_are_isolated() {
    let registry = registry().await;
    assert!(registry.is_empty().await);

    registry
        .process_message("alice", "I'm Alice, 5551112222")
        .await;
    let bob = registry.process_message("bob", "book an interview").await;

    // Bob never registered, so he cannot reach scheduling.
    assert_eq!(bob.action, Action::Continue);
    assert!(!bob.metadata.user_registered);
    assert_eq!(registry.len().await, 2);

    let alice = registry.process_message("alice", "book an interview").await;
    assert_eq!(alice.action, Action::Schedule);
}

#[tokio::test]
async fn same_id_returns_same_conversation() {
    let registry = registry().await;
    let first = registry.get_or_create("c1").await;
    let second = registry.get_or_create("c1").await;
    assert!(Arc::ptr_eq(&first, &second));

    assert!(registry.remove("c1").await);
    assert!(!registry.remove("c1").await);
    assert!(registry.is_empty().await);
}

#[tokio::test]
async fn concurrent_conversations_progress_independently() {
    let registry = Arc::new(registry().await);
    let mut handles = Vec::new();
    for (id, intro) in [("a", "I'm Ann, 5550000001"), ("b", "I'm Ben, 5550000002")] {
        let registry = Arc::clone(&registry);
        handles.push(tokio::spawn(async move {
            registry.process_message(id, intro).await
        }));
    }
    for handle in handles {
        let reply = handle.await.expect("task should finish");
        assert!(reply.metadata.user_registered);
    }
    assert_eq!(registry.len().await, 2);
}
