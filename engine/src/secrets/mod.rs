pub mod cache;
pub mod string;

pub use cache::SecretCache;
pub use string::SecretString;

use eva_sdk::errors::EngineError;
use keyring::Entry;
use regex::Regex;
use std::sync::OnceLock;

/// Well-known secret keys
pub const ANTHROPIC_API_KEY: &str = "anthropic_api_key";
pub const OPENAI_API_KEY: &str = "openai_api_key";
pub const TAVILY_API_KEY: &str = "tavily_api_key";

/// SecretManager resolves API keys for the completion providers and tools.
///
/// Lookup order for a key such as `anthropic_api_key`:
/// 1. Environment variable with the upper-cased name (`ANTHROPIC_API_KEY`)
/// 2. OS keychain entry under the manager's service name
///
/// Eva runs unattended inside chat front-ends, so a missing key is an error
/// rather than an interactive prompt.
///
/// The manager also scrubs key-shaped substrings from text before it reaches
/// logs or users.
pub struct SecretManager {
    service_name: String,
}

static SECRET_PATTERNS: OnceLock<Vec<Regex>> = OnceLock::new();

/// Patterns match:
/// - Anthropic keys: sk-ant-...
/// - OpenAI keys: sk-... (including sk-proj-)
/// - Tavily keys: tvly-...
/// - Bearer tokens
fn get_secret_patterns() -> &'static Vec<Regex> {
    SECRET_PATTERNS.get_or_init(|| {
        [
            r"sk-ant-[a-zA-Z0-9\-_]{20,}",
            r"sk-[a-zA-Z0-9\-_]{20,}",
            r"tvly-[a-zA-Z0-9\-_]{16,}",
            r"Bearer\s+[^\s]{20,}",
        ]
        .iter()
        .filter_map(|pattern| Regex::new(pattern).ok())
        .collect()
    })
}

impl SecretManager {
    /// The service name namespaces entries in the OS keychain.
    pub fn new(service_name: impl Into<String>) -> Self {
        Self {
            service_name: service_name.into(),
        }
    }

    /// Name of the environment variable consulted for `key`
    pub fn env_var_name(key: &str) -> String {
        key.to_ascii_uppercase()
    }

    /// Retrieves a secret from the environment or the OS keychain.
    ///
    /// # Errors
    /// Returns `EngineError::MissingSecret` if neither source has the key and
    /// `EngineError::KeyringError` if keychain access itself fails.
    pub fn get_secret(&self, key: &str) -> Result<String, EngineError> {
        let env_name = Self::env_var_name(key);
        if let Ok(value) = std::env::var(&env_name) {
            if !value.trim().is_empty() {
                tracing::debug!("Resolved secret '{}' from ${}", key, env_name);
                return Ok(value);
            }
        }

        let entry = Entry::new(&self.service_name, key).map_err(|e| {
            EngineError::KeyringError(format!("Failed to create keyring entry: {}", e))
        })?;

        match entry.get_password() {
            Ok(secret) => {
                tracing::debug!("Retrieved secret '{}' from keychain", key);
                Ok(secret)
            }
            Err(keyring::Error::NoEntry) => Err(EngineError::MissingSecret(format!(
                "{} (set ${} or store it in the keychain)",
                key, env_name
            ))),
            Err(e) => Err(EngineError::KeyringError(format!(
                "Failed to retrieve secret '{}': {}",
                key, e
            ))),
        }
    }

    /// Checks whether a secret resolves from either source.
    pub fn has_secret(&self, key: &str) -> bool {
        self.get_secret(key).is_ok()
    }

    /// Replaces key-shaped substrings with `[REDACTED]`.
    ///
    /// ```
    /// use eva_engine::secrets::SecretManager;
    ///
    /// let manager = SecretManager::new("test");
    /// let scrubbed = manager.scrub("key=sk-ant-REDACTED");
    /// assert_eq!(scrubbed, "key=[REDACTED]");
    /// ```
    pub fn scrub(&self, text: &str) -> String {
        scrub(text)
    }
}

/// Free-function form of [`SecretManager::scrub`].
pub fn scrub(text: &str) -> String {
    let mut result = text.to_string();
    for pattern in get_secret_patterns() {
        result = pattern.replace_all(&result, "[REDACTED]").to_string();
    }
    result
}
