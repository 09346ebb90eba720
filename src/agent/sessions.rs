//! Per-conversation orchestrators keyed by conversation id.
//!
//! Turns for one conversation are serialized by that conversation's mutex;
//! different conversations proceed independently and share only the
//! services in [`AgentServices`].

use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::Mutex;
use tracing::info;

use crate::config::Config;

use super::{AgentServices, ConversationOrchestrator, TurnResponse};

/// Registry of live conversations.
pub struct ConversationRegistry {
    config: Config,
    services: AgentServices,
    sessions: Mutex<HashMap<String, Arc<Mutex<ConversationOrchestrator>>>>,
}

impl ConversationRegistry {
    /// Create an empty registry.
    pub fn new(config: Config, services: AgentServices) -> Self {
        Self {
            config,
            services,
            sessions: Mutex::new(HashMap::new()),
        }
    }

    /// The orchestrator for `conversation_id`, created on first use.
    pub async fn get_or_create(&self, conversation_id: &str) -> Arc<Mutex<ConversationOrchestrator>> {
        let mut sessions = self.sessions.lock().await;
        if let Some(existing) = sessions.get(conversation_id) {
            return Arc::clone(existing);
        }
        let orchestrator = Arc::new(Mutex::new(ConversationOrchestrator::new(
            &self.config,
            self.services.clone(),
        )));
        sessions.insert(conversation_id.to_owned(), Arc::clone(&orchestrator));
        info!(conversation_id, active = sessions.len(), "conversation started");
        orchestrator
    }

    /// Route a message to its conversation.
    pub async fn process_message(&self, conversation_id: &str, text: &str) -> TurnResponse {
        let orchestrator = self.get_or_create(conversation_id).await;
        let mut orchestrator = orchestrator.lock().await;
        orchestrator.process_message(text).await
    }

    /// Drop a conversation. Returns `false` if it was unknown.
    pub async fn remove(&self, conversation_id: &str) -> bool {
        self.sessions.lock().await.remove(conversation_id).is_some()
    }

    /// Number of live conversations.
    pub async fn len(&self) -> usize {
        self.sessions.lock().await.len()
    }

    /// Whether no conversations are live.
    pub async fn is_empty(&self) -> bool {
        self.sessions.lock().await.is_empty()
    }
}
