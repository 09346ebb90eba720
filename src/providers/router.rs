//! Picks a model for each step of a conversation.
//!
//! Specs look like `openai/gpt-4o-mini` or `ollama/llama3`. A role without
//! an override, or whose override could not be built, uses the default.

use std::collections::HashMap;
use std::sync::Arc;

use anyhow::Context;

use crate::config::{all_model_specs, ModelsConfig};
use crate::credentials::{resolve_openai_auth, Credentials};

use super::ollama::OllamaProvider;
use super::openai::OpenAiProvider;
use super::LlmProvider;

/// Conversation steps that can use their own model.
pub mod roles {
    /// Top-level action decision.
    pub const INTENT: &str = "intent";
    /// Name and phone extraction, registration replies.
    pub const REGISTRATION: &str = "registration";
    /// Scheduling tool calls.
    pub const SCHEDULING: &str = "scheduling";
    /// Position questions.
    pub const INFO: &str = "info";
    /// Exit messages and summaries.
    pub const EXIT: &str = "exit";
}

/// Errors while building a [`ModelRouter`].
#[derive(Debug, thiserror::Error)]
pub enum RouterError {
    /// Not `<provider>/<model>`.
    #[error("invalid model spec '{spec}', expected '<provider>/<model>'")]
    InvalidModelSpec {
        /// The offending spec.
        spec: String,
    },
    /// The default model could not be built.
    #[error("default provider '{spec}' is unavailable")]
    DefaultUnavailable {
        /// The default spec.
        spec: String,
    },
    /// Neither `openai` nor `ollama`.
    #[error("unsupported provider '{provider}'")]
    UnsupportedProvider {
        /// The prefix.
        provider: String,
    },
    /// The provider needs a key that is not set.
    #[error("missing credential for provider '{provider}': {key}")]
    MissingCredential {
        /// Provider prefix.
        provider: String,
        /// Environment variable name.
        key: String,
    },
}

/// Role to provider lookup with a default.
#[derive(Clone)]
pub struct ModelRouter {
    providers: HashMap<String, Arc<dyn LlmProvider>>,
    default: String,
    role_overrides: HashMap<String, String>,
}

impl std::fmt::Debug for ModelRouter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ModelRouter")
            .field("default", &self.default)
            .field("available", &self.available_specs())
            .field("roles", &self.role_overrides)
            .finish()
    }
}

impl ModelRouter {
    /// Build every configured model. Overrides that fail to build are logged
    /// and skipped.
    ///
    /// # Errors
    ///
    /// Fails on a malformed spec or when the default cannot be built.
    pub fn from_config(models: &ModelsConfig, credentials: &Credentials) -> anyhow::Result<Self> {
        let mut providers: HashMap<String, Arc<dyn LlmProvider>> = HashMap::new();

        for spec in all_model_specs(models) {
            let (provider, model) = parse_model_spec(&spec)
                .with_context(|| format!("failed to parse model spec '{spec}'"))?;
            match instantiate_provider(&spec, provider, model, credentials) {
                Ok(instance) => {
                    providers.insert(spec.clone(), instance);
                }
                Err(e) => tracing::warn!(spec = %spec, error = %e, "skipping model"),
            }
        }

        if !providers.contains_key(&models.default) {
            return Err(RouterError::DefaultUnavailable {
                spec: models.default.clone(),
            }
            .into());
        }

        Ok(Self {
            providers,
            default: models.default.clone(),
            role_overrides: models.roles.clone(),
        })
    }

    /// A router with one provider serving every role.
    #[doc(hidden)]
    pub fn for_testing(default_spec: String, provider: Arc<dyn LlmProvider>) -> Self {
        let mut providers = HashMap::new();
        providers.insert(default_spec.clone(), provider);
        Self {
            providers,
            default: default_spec,
            role_overrides: HashMap::new(),
        }
    }

    /// Give one role its own provider.
    #[doc(hidden)]
    #[must_use]
    pub fn with_role(mut self, role: &str, spec: String, provider: Arc<dyn LlmProvider>) -> Self {
        self.providers.insert(spec.clone(), provider);
        self.role_overrides.insert(role.to_owned(), spec);
        self
    }

    /// Provider for a role.
    pub fn resolve(&self, role: &str) -> Arc<dyn LlmProvider> {
        let spec = self.resolve_spec(role);
        match self.providers.get(&spec) {
            Some(provider) => Arc::clone(provider),
            None => self.default_provider(),
        }
    }

    /// Spec serving a role.
    pub fn resolve_spec(&self, role: &str) -> String {
        self.role_overrides
            .get(role)
            .filter(|spec| self.providers.contains_key(*spec))
            .cloned()
            .unwrap_or_else(|| self.default.clone())
    }

    /// The default provider.
    pub fn default_provider(&self) -> Arc<dyn LlmProvider> {
        // Every constructor inserts the default.
        Arc::clone(&self.providers[&self.default])
    }

    /// Built specs, sorted.
    pub fn available_specs(&self) -> Vec<String> {
        let mut values: Vec<String> = self.providers.keys().cloned().collect();
        values.sort();
        values
    }
}

fn parse_model_spec(spec: &str) -> Result<(&str, &str), RouterError> {
    match spec.split_once('/') {
        Some((provider, model)) if !provider.is_empty() && !model.is_empty() => {
            Ok((provider, model))
        }
        _ => Err(RouterError::InvalidModelSpec {
            spec: spec.to_owned(),
        }),
    }
}

fn instantiate_provider(
    model_spec: &str,
    provider: &str,
    model: &str,
    credentials: &Credentials,
) -> Result<Arc<dyn LlmProvider>, RouterError> {
    match provider {
        "openai" => {
            let auth =
                resolve_openai_auth(credentials).ok_or_else(|| RouterError::MissingCredential {
                    provider: provider.to_owned(),
                    key: "OPENAI_API_KEY".to_owned(),
                })?;
            Ok(Arc::new(OpenAiProvider::new(
                model_spec.to_owned(),
                model.to_owned(),
                auth,
            )))
        }
        "ollama" => {
            let mut instance = OllamaProvider::new(model_spec.to_owned(), model.to_owned());
            if let Some(url) = credentials.get("OLLAMA_URL") {
                instance = instance.with_base_url(url);
            }
            Ok(Arc::new(instance))
        }
        _ => Err(RouterError::UnsupportedProvider {
            provider: provider.to_owned(),
        }),
    }
}
