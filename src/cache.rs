//! Content-addressed cache of raw inference responses.
//!
//! Keys are the SHA-256 of the document bytes, so the same statement
//! uploaded twice skips the model call. The cache stores the model's raw
//! text rather than parsed transactions: parsing is cheap and deterministic,
//! and keeping the raw text means a parser fix applies to cached entries too.
//!
//! Entries are only written after the response parsed successfully.
//!
//! The cache has no size bound and no expiry. Whoever creates it owns its
//! lifetime: drop it, or call [`ResponseCache::clear`], when the statements
//! it holds are no longer interesting.

use sha2::{Digest, Sha256};
use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard};
use tracing::warn;

/// In-memory response cache, safe to share across concurrent analyses.
#[derive(Debug, Default)]
pub struct ResponseCache {
    entries: Mutex<HashMap<String, String>>,
}

impl ResponseCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Hex SHA-256 of `bytes`.
    pub fn key_for(bytes: &[u8]) -> String {
        let mut hasher = Sha256::new();
        hasher.update(bytes);
        format!("{:x}", hasher.finalize())
    }

    /// Each entry is written whole under the lock, so a panic elsewhere
    /// while holding it cannot leave a half-written entry behind.
    fn entries(&self) -> MutexGuard<'_, HashMap<String, String>> {
        self.entries.lock().unwrap_or_else(|poisoned| {
            warn!("Response cache lock was poisoned by a panicking thread; recovering");
            poisoned.into_inner()
        })
    }

    pub fn get(&self, key: &str) -> Option<String> {
        self.entries().get(key).cloned()
    }

    pub fn insert(&self, key: String, response: String) {
        self.entries().insert(key, response);
    }

    /// Drop every entry.
    pub fn clear(&self) {
        self.entries().clear();
    }

    pub fn len(&self) -> usize {
        self.entries().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn key_is_stable_hex_sha256() {
        let k = ResponseCache::key_for(b"abc");
        assert_eq!(
            k,
            "ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad"
        );
        assert_eq!(k, ResponseCache::key_for(b"abc"));
        assert_ne!(k, ResponseCache::key_for(b"abd"));
    }

    #[test]
    fn get_after_insert() {
        let cache = ResponseCache::new();
        assert!(cache.is_empty());
        let key = ResponseCache::key_for(b"statement");
        cache.insert(key.clone(), "[]".into());
        assert_eq!(cache.get(&key).as_deref(), Some("[]"));
        assert_eq!(cache.len(), 1);
        assert!(cache.get("missing").is_none());
        cache.clear();
        assert!(cache.is_empty());
    }

    #[test]
    fn survives_a_panic_while_locked() {
        let cache = std::sync::Arc::new(ResponseCache::new());
        cache.insert("a".into(), "[]".into());

        let shared = std::sync::Arc::clone(&cache);
        let result = std::thread::spawn(move || {
            let _guard = shared.entries.lock().unwrap();
            panic!("worker died holding the cache lock");
        })
        .join();
        assert!(result.is_err());
        assert!(cache.entries.is_poisoned());

        assert_eq!(cache.get("a").as_deref(), Some("[]"));
        cache.insert("b".into(), "{}".into());
        assert_eq!(cache.len(), 2);
    }
}
