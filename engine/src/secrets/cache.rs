use crate::secrets::string::SecretString;
use crate::secrets::SecretManager;
use eva_sdk::errors::EngineError;
use std::collections::HashMap;
use std::sync::{Arc, RwLock};

/// An in-memory cache in front of `SecretManager`.
///
/// Providers look their key up on every request; the cache keeps that from
/// hitting the environment and OS keychain each time.
#[derive(Clone)]
pub struct SecretCache {
    manager: Arc<SecretManager>,
    cache: Arc<RwLock<HashMap<String, SecretString>>>,
}

impl SecretCache {
    pub fn new(manager: Arc<SecretManager>) -> Self {
        Self {
            manager,
            cache: Arc::new(RwLock::new(HashMap::new())),
        }
    }

    /// Build a cache pre-seeded with fixed values (tests, embedding callers).
    pub fn with_values<I, K, V>(manager: Arc<SecretManager>, values: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<SecretString>,
    {
        let cache = Self::new(manager);
        for (key, value) in values {
            cache.insert(key, value);
        }
        cache
    }

    /// Retrieves a secret, checking the memory cache first.
    pub fn get_secret(&self, key: &str) -> Result<SecretString, EngineError> {
        {
            let cache = self.cache.read().unwrap_or_else(|poisoned| poisoned.into_inner());
            if let Some(secret) = cache.get(key) {
                return Ok(secret.clone());
            }
        }

        let secret = SecretString::new(self.manager.get_secret(key)?);

        self.cache
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .insert(key.to_string(), secret.clone());

        Ok(secret)
    }

    /// True when the key resolves without error
    pub fn has_secret(&self, key: &str) -> bool {
        self.get_secret(key).is_ok()
    }

    pub fn insert(&self, key: impl Into<String>, value: impl Into<SecretString>) {
        self.cache
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .insert(key.into(), value.into());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_seeded_values_are_returned() {
        let manager = Arc::new(SecretManager::new("eva-test"));
        let cache = SecretCache::with_values(manager, [("anthropic_api_key", "sk-ant-test")]);

        let secret = cache.get_secret("anthropic_api_key").unwrap();
        assert_eq!(secret.expose(), "sk-ant-test");
        assert!(cache.has_secret("anthropic_api_key"));
    }

    #[test]
    fn test_insert_overrides() {
        let manager = Arc::new(SecretManager::new("eva-test"));
        let cache = SecretCache::new(manager);
        cache.insert("k", "one");
        cache.insert("k", "two");
        assert_eq!(cache.get_secret("k").unwrap().expose(), "two");
    }
}
