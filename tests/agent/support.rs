#![allow(dead_code)]

//! Shared fixtures for agent tests.

use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use chrono::NaiveDate;
use serde_json::Value;
use sqlx::SqlitePool;

use hirebot::agent::AgentServices;
use hirebot::candidates::SqliteCandidateStore;
use hirebot::config::{Config, IntentStrategyKind, SchedulingConfig};
use hirebot::knowledge::SqliteDocumentStore;
use hirebot::providers::router::ModelRouter;
use hirebot::providers::{
    CompletionRequest, CompletionResponse, ContentPart, LlmProvider, ProviderError, StopReason,
    UsageStats,
};
use hirebot::scheduling::slot::SlotKey;
use hirebot::scheduling::store::SlotStore;
use hirebot::scheduling::SchedulingCoordinator;

/// Slots seeded for every agent test.
pub const SEEDED_SLOTS: &[&str] = &["2025-09-10 10:00", "2025-09-10 16:00", "2025-09-11 09:00"];

type Handler = dyn Fn(&CompletionRequest) -> Result<CompletionResponse, ProviderError> + Send + Sync;

/// Provider answering each request with a closure and recording the requests.
pub struct FnProvider {
    handler: Box<Handler>,
    requests: Mutex<Vec<CompletionRequest>>,
}

impl FnProvider {
    pub fn new(
        handler: impl Fn(&CompletionRequest) -> Result<CompletionResponse, ProviderError>
            + Send
            + Sync
            + 'static,
    ) -> Arc<Self> {
        Arc::new(Self {
            handler: Box::new(handler),
            requests: Mutex::new(Vec::new()),
        })
    }

    /// Always fails, as an unreachable model would.
    pub fn failing() -> Arc<Self> {
        Self::new(|_| Err(ProviderError::Unavailable("offline".to_owned())))
    }

    pub fn requests(&self) -> Vec<CompletionRequest> {
        self.requests.lock().expect("lock").clone()
    }
}

#[async_trait]
impl LlmProvider for FnProvider {
    async fn complete(
        &self,
        request: CompletionRequest,
    ) -> Result<CompletionResponse, ProviderError> {
        let result = (self.handler)(&request);
        self.requests.lock().expect("lock").push(request);
        result
    }

    fn model_id(&self) -> &str {
        "mock/model"
    }
}

pub fn text(reply: &str) -> Result<CompletionResponse, ProviderError> {
    Ok(CompletionResponse {
        content: vec![ContentPart::Text {
            text: reply.to_owned(),
        }],
        stop_reason: StopReason::EndTurn,
        usage: UsageStats {
            input_tokens: 1,
            output_tokens: 1,
        },
        model: "mock/model".to_owned(),
    })
}

pub fn tool_call(name: &str, input: Value) -> Result<CompletionResponse, ProviderError> {
    Ok(CompletionResponse {
        content: vec![ContentPart::ToolUse {
            id: "call_1".to_owned(),
            name: name.to_owned(),
            input,
        }],
        stop_reason: StopReason::ToolUse,
        usage: UsageStats {
            input_tokens: 1,
            output_tokens: 1,
        },
        model: "mock/model".to_owned(),
    })
}

pub fn router(provider: Arc<FnProvider>) -> ModelRouter {
    ModelRouter::for_testing("mock/model".to_owned(), provider)
}

pub fn today() -> NaiveDate {
    NaiveDate::from_ymd_opt(2025, 9, 1).expect("valid date")
}

pub fn config(strategy: IntentStrategyKind) -> Config {
    let mut config = Config::default();
    config.agent.intent_strategy = strategy;
    config
}

/// Migrated in-memory database with the seeded slots.
pub async fn seeded_pool() -> SqlitePool {
    let pool = hirebot::db::open_in_memory()
        .await
        .expect("in-memory db should open");
    let store = SlotStore::new(pool.clone());
    for raw in SEEDED_SLOTS {
        store
            .insert_slot(
                SlotKey::parse(raw).expect("slot"),
                "Python Developer",
                true,
            )
            .await
            .expect("insert slot");
    }
    pool
}

pub fn services(pool: &SqlitePool, models: Option<ModelRouter>) -> AgentServices {
    let store = SlotStore::new(pool.clone()).with_today(today());
    AgentServices {
        models,
        scheduling: SchedulingCoordinator::new(store, &SchedulingConfig::default()),
        candidates: Arc::new(SqliteCandidateStore::new(pool.clone())),
        documents: Arc::new(SqliteDocumentStore::new(pool.clone())),
    }
}
