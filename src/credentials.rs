//! Provider keys from `~/.hirebot/.env` and the process environment.
//!
//! The file wins over the environment. Values never appear in `Debug` output.

use std::collections::BTreeMap;
use std::path::Path;

use anyhow::Context;
use tracing::debug;

/// Keys read from the environment when the file does not set them.
pub const KNOWN_KEYS: &[&str] = &["OPENAI_API_KEY", "OPENAI_BASE_URL", "OLLAMA_URL"];

/// Loaded provider keys.
#[derive(Clone, Default)]
pub struct Credentials {
    vars: BTreeMap<String, String>,
}

impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credentials")
            .field("keys", &self.vars.keys().collect::<Vec<_>>())
            .field("values", &"[REDACTED]")
            .finish()
    }
}

impl Credentials {
    /// Wrap an existing map.
    pub fn from_map(vars: BTreeMap<String, String>) -> Self {
        Self { vars }
    }

    /// A value, treating blank as unset.
    pub fn get(&self, key: &str) -> Option<&str> {
        self.vars
            .get(key)
            .map(String::as_str)
            .filter(|v| !v.trim().is_empty())
    }
}

/// What [`crate::providers::openai::OpenAiProvider`] needs to authenticate.
#[derive(Clone, PartialEq, Eq)]
pub struct OpenAiAuth {
    /// Bearer token.
    pub api_key: String,
    /// API root without a trailing slash.
    pub base_url: String,
}

impl std::fmt::Debug for OpenAiAuth {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OpenAiAuth")
            .field("api_key", &"[REDACTED]")
            .field("base_url", &self.base_url)
            .finish()
    }
}

/// Used when `OPENAI_BASE_URL` is unset.
pub const DEFAULT_OPENAI_BASE_URL: &str = "https://api.openai.com/v1";

/// OpenAI auth, or `None` without an `OPENAI_API_KEY`.
pub fn resolve_openai_auth(credentials: &Credentials) -> Option<OpenAiAuth> {
    let api_key = credentials.get("OPENAI_API_KEY")?;
    debug!("using OPENAI_API_KEY from credentials");
    Some(OpenAiAuth {
        api_key: api_key.to_owned(),
        base_url: credentials
            .get("OPENAI_BASE_URL")
            .unwrap_or(DEFAULT_OPENAI_BASE_URL)
            .trim_end_matches('/')
            .to_owned(),
    })
}

/// Read `path` if it exists, then fill missing [`KNOWN_KEYS`] from the
/// process environment.
///
/// # Errors
///
/// Returns an error if the file exists but cannot be parsed.
pub fn load_credentials(path: &Path) -> anyhow::Result<Credentials> {
    load_credentials_with(path, |key| std::env::var(key).ok())
}

/// [`load_credentials`] with an injectable environment lookup.
///
/// # Errors
///
/// Returns an error if the file exists but cannot be parsed.
pub fn load_credentials_with(
    path: &Path,
    env: impl Fn(&str) -> Option<String>,
) -> anyhow::Result<Credentials> {
    let mut vars = BTreeMap::new();

    if path.exists() {
        let iter = dotenvy::from_path_iter(path)
            .with_context(|| format!("failed to read credentials at {}", path.display()))?;
        for item in iter {
            let (key, value) = item.with_context(|| {
                format!("malformed line in {}", path.display())
            })?;
            vars.insert(key, value);
        }
        debug!(path = %path.display(), keys = vars.len(), "read credentials file");
    }

    for key in KNOWN_KEYS.iter().copied() {
        if vars.contains_key(key) {
            continue;
        }
        if let Some(value) = env(key) {
            vars.insert(key.to_owned(), value);
        }
    }

    Ok(Credentials { vars })
}
