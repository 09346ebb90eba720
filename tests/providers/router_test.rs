//! Model router resolution tests.

use std::collections::{BTreeMap, HashMap};

use hirebot::config::ModelsConfig;
use hirebot::credentials::Credentials;
use hirebot::providers::router::{roles, ModelRouter};

fn credentials(pairs: &[(&str, &str)]) -> Credentials {
    Credentials::from_map(
        pairs
            .iter()
            .map(|(k, v)| ((*k).to_owned(), (*v).to_owned()))
            .collect::<BTreeMap<_, _>>(),
    )
}

fn models(default: &str, roles: &[(&str, &str)]) -> ModelsConfig {
    ModelsConfig {
        default: default.to_owned(),
        roles: roles
            .iter()
            .map(|(k, v)| ((*k).to_owned(), (*v).to_owned()))
            .collect::<HashMap<_, _>>(),
    }
}

#[test]
fn roles_resolve_to_overrides_or_default() {
    let config = models(
        "ollama/llama3",
        &[(roles::INTENT, "ollama/phi3"), (roles::EXIT, "ollama/llama3")],
    );
    let router = ModelRouter::from_config(&config, &credentials(&[])).expect("router");

    assert_eq!(router.resolve_spec(roles::INTENT), "ollama/phi3");
    assert_eq!(router.resolve_spec(roles::SCHEDULING), "ollama/llama3");
    assert_eq!(router.resolve(roles::INTENT).model_id(), "ollama/phi3");
    assert_eq!(
        router.available_specs(),
        vec!["ollama/llama3".to_owned(), "ollama/phi3".to_owned()]
    );
}

#[test]
fn openai_default_needs_api_key() {
    let config = models("openai/gpt-4o-mini", &[]);
    let err = ModelRouter::from_config(&config, &credentials(&[]))
        .expect_err("missing key must fail");
    assert!(err.to_string().contains("openai/gpt-4o-mini"));

    let router = ModelRouter::from_config(
        &config,
        &credentials(&[("OPENAI_API_KEY", "sk-test")]),
    )
    .expect("router with key");
    assert_eq!(router.default_provider().model_id(), "openai/gpt-4o-mini");
}

#[test]
fn unavailable_role_falls_back_to_default() {
    let config = models("ollama/llama3", &[(roles::INFO, "openai/gpt-4o")]);
    let router = ModelRouter::from_config(&config, &credentials(&[])).expect("router");
    assert_eq!(router.resolve_spec(roles::INFO), "ollama/llama3");
}

#[test]
fn malformed_spec_is_rejected() {
    let config = models("llama3", &[]);
    assert!(ModelRouter::from_config(&config, &credentials(&[])).is_err());

    let config = models("anthropic/claude", &[]);
    assert!(ModelRouter::from_config(&config, &credentials(&[])).is_err());
}
