//! Per-backend response cache with time-based expiry.
//!
//! Entries expire purely by time: a read past the expiry is a miss, and
//! [`ResponseCache::purge_expired`] lets a background sweeper reclaim memory.
//! Timestamps come from `tokio::time`, so paused-clock tests can drive expiry.

use parking_lot::RwLock;
use std::collections::HashMap;
use std::time::Duration;
use tokio::time::Instant;
use tracing::{debug, warn};

/// Upper bound on an entry's lifetime
pub const MAX_TTL: Duration = Duration::from_secs(10 * 365 * 24 * 60 * 60);

/// Cache key for one (backend, model, languages, input text) combination.
///
/// Fields are length-prefixed before hashing so that no two distinct
/// tuples can produce the same byte stream.
pub fn fingerprint(backend: &str, model: &str, from: &str, to: &str, text: &str) -> String {
    let mut hasher = blake3::Hasher::new();
    for field in [backend, model, from, to, text] {
        hasher.update(&(field.len() as u64).to_le_bytes());
        hasher.update(field.as_bytes());
    }
    format!("{}:{}", backend, hasher.finalize().to_hex())
}

#[derive(Debug, Clone)]
struct CacheEntry {
    value: String,
    expires_at: Instant,
}

/// In-memory key/value store with per-entry expiry
#[derive(Debug, Default)]
pub struct ResponseCache {
    entries: RwLock<HashMap<String, CacheEntry>>,
}

impl ResponseCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the cached value unless it is absent or expired
    pub fn get(&self, key: &str) -> Option<String> {
        let entries = self.entries.read();
        match entries.get(key) {
            Some(entry) if entry.expires_at > Instant::now() => Some(entry.value.clone()),
            _ => None,
        }
    }

    /// Insert or overwrite, resetting expiry to now + ttl.
    ///
    /// A ttl above [`MAX_TTL`] is clamped to it.
    pub fn set(&self, key: impl Into<String>, value: impl Into<String>, ttl: Duration) {
        if ttl > MAX_TTL {
            warn!(?ttl, max = ?MAX_TTL, "cache ttl clamped");
        }
        let now = Instant::now();
        let expires_at = now.checked_add(ttl.min(MAX_TTL)).unwrap_or(now);
        let entry = CacheEntry {
            value: value.into(),
            expires_at,
        };
        self.entries.write().insert(key.into(), entry);
    }

    /// Drop every expired entry, returning how many were removed
    pub fn purge_expired(&self) -> usize {
        let now = Instant::now();
        let mut entries = self.entries.write();
        let before = entries.len();
        entries.retain(|_, entry| entry.expires_at > now);
        let removed = before - entries.len();
        if removed > 0 {
            debug!(removed, remaining = entries.len(), "purged expired cache entries");
        }
        removed
    }

    /// Number of stored entries, expired ones included until purged
    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const HOUR: Duration = Duration::from_secs(3600);

    #[tokio::test(start_paused = true)]
    async fn test_huge_ttl_is_clamped() {
        let cache = ResponseCache::new();
        cache.set("forever", "v", Duration::MAX);
        cache.set("hours", "v", HOUR * 3_600_000_000);
        assert_eq!(cache.get("forever").as_deref(), Some("v"));
        assert_eq!(cache.get("hours").as_deref(), Some("v"));

        tokio::time::advance(MAX_TTL + HOUR).await;
        assert_eq!(cache.get("forever"), None);
        assert_eq!(cache.purge_expired(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_set_then_get() {
        let cache = ResponseCache::new();
        cache.set("k", "v", HOUR);
        assert_eq!(cache.get("k").as_deref(), Some("v"));
        assert_eq!(cache.get("missing"), None);
    }

    #[tokio::test(start_paused = true)]
    async fn test_entry_expires_after_ttl() {
        let cache = ResponseCache::new();
        cache.set("k", "v", HOUR);

        tokio::time::advance(HOUR - Duration::from_secs(1)).await;
        assert_eq!(cache.get("k").as_deref(), Some("v"));

        tokio::time::advance(Duration::from_secs(1)).await;
        assert_eq!(cache.get("k"), None);
    }

    #[tokio::test(start_paused = true)]
    async fn test_set_overwrites_and_resets_expiry() {
        let cache = ResponseCache::new();
        cache.set("k", "old", Duration::from_secs(10));
        tokio::time::advance(Duration::from_secs(8)).await;

        cache.set("k", "new", Duration::from_secs(10));
        tokio::time::advance(Duration::from_secs(8)).await;
        assert_eq!(cache.get("k").as_deref(), Some("new"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_purge_expired() {
        let cache = ResponseCache::new();
        cache.set("short", "a", Duration::from_secs(1));
        cache.set("long", "b", HOUR);

        tokio::time::advance(Duration::from_secs(2)).await;
        assert_eq!(cache.len(), 2);
        assert_eq!(cache.purge_expired(), 1);
        assert_eq!(cache.len(), 1);
        assert_eq!(cache.get("long").as_deref(), Some("b"));
    }

    #[test]
    fn test_fingerprint_depends_on_every_field() {
        let base = fingerprint("gpt", "gpt-4o", "EN", "ZH", "Hello");
        assert_eq!(base, fingerprint("gpt", "gpt-4o", "EN", "ZH", "Hello"));
        assert!(base.starts_with("gpt:"));

        assert_ne!(base, fingerprint("gpt", "gpt-4o", "EN", "ZH", "Goodbye"));
        assert_ne!(base, fingerprint("gpt", "gpt-4o", "EN", "JA", "Hello"));
        assert_ne!(base, fingerprint("gpt", "gpt-4o", "FR", "ZH", "Hello"));
        assert_ne!(base, fingerprint("gpt", "gpt-4o-mini", "EN", "ZH", "Hello"));
        assert_ne!(base, fingerprint("claude", "gpt-4o", "EN", "ZH", "Hello"));
    }

    #[test]
    fn test_fingerprint_field_boundaries() {
        assert_ne!(
            fingerprint("gpt", "m", "EN", "ZH", "ab"),
            fingerprint("gpt", "m", "EN", "ZHa", "b")
        );
    }
}
