//! In-process coordination store.

use super::{normalize, CoordinationStore, StoreNode};
use crate::error::StoreError;
use async_trait::async_trait;
use std::collections::BTreeMap;
use std::time::Duration;
use tokio::sync::RwLock;
use tokio::time::Instant;
use tracing::trace;

#[derive(Debug, Clone)]
struct Entry {
    value: String,
    expires_at: Instant,
}

impl Entry {
    fn is_live(&self, now: Instant) -> bool {
        now < self.expires_at
    }
}

/// Coordination store held in memory.
///
/// Expired keys are invisible immediately and purged on the next write.
/// Expiry uses Tokio's clock, so paused-time tests can step over leases.
#[derive(Debug, Default)]
pub struct MemoryStore {
    entries: RwLock<BTreeMap<String, Entry>>,
}

impl MemoryStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of live keys.
    pub async fn len(&self) -> usize {
        let now = Instant::now();
        let entries = self.entries.read().await;
        entries.values().filter(|e| e.is_live(now)).count()
    }

    /// Whether the store holds no live keys.
    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }

    fn purge(entries: &mut BTreeMap<String, Entry>, now: Instant) {
        let before = entries.len();
        entries.retain(|_, e| e.is_live(now));
        let purged = before - entries.len();
        if purged > 0 {
            trace!("Purged {} expired keys", purged);
        }
    }
}

#[async_trait]
impl CoordinationStore for MemoryStore {
    async fn get(&self, path: &str) -> Result<Vec<StoreNode>, StoreError> {
        let now = Instant::now();
        let dir = normalize(path);
        let prefix = if dir == "/" { dir } else { format!("{}/", dir) };

        let entries = self.entries.read().await;
        let children = entries
            .range(prefix.clone()..)
            .take_while(|(key, _)| key.starts_with(&prefix))
            .filter(|(key, entry)| !key[prefix.len()..].contains('/') && entry.is_live(now))
            .map(|(key, entry)| StoreNode {
                key: key.clone(),
                value: entry.value.clone(),
            })
            .collect();
        Ok(children)
    }

    async fn set(&self, path: &str, value: &str, ttl: Duration) -> Result<(), StoreError> {
        let now = Instant::now();
        let mut entries = self.entries.write().await;
        Self::purge(&mut entries, now);
        entries.insert(
            normalize(path),
            Entry {
                value: value.to_string(),
                expires_at: now + ttl,
            },
        );
        Ok(())
    }

    async fn update(&self, path: &str, value: &str, ttl: Duration) -> Result<(), StoreError> {
        let now = Instant::now();
        let key = normalize(path);
        let mut entries = self.entries.write().await;
        Self::purge(&mut entries, now);
        match entries.get_mut(&key) {
            Some(entry) => {
                entry.value = value.to_string();
                entry.expires_at = now + ttl;
                Ok(())
            }
            None => Err(StoreError::KeyNotFound(key)),
        }
    }

    async fn delete(&self, path: &str) -> Result<bool, StoreError> {
        let now = Instant::now();
        let mut entries = self.entries.write().await;
        Self::purge(&mut entries, now);
        Ok(entries.remove(&normalize(path)).is_some())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio_test::{assert_err, assert_ok};

    const TTL: Duration = Duration::from_secs(2);

    #[tokio::test]
    async fn test_set_and_get_children() {
        let store = MemoryStore::new();
        store.set("/svc/Math/a", "10.0.0.1:1", TTL).await.unwrap();
        store.set("/svc/Math/b", "10.0.0.2:1", TTL).await.unwrap();
        store.set("/svc/Mathematics/c", "10.0.0.3:1", TTL).await.unwrap();
        store.set("/svc/Math/a/deeper", "x", TTL).await.unwrap();

        let children = store.get("/svc/Math").await.unwrap();
        let keys: Vec<&str> = children.iter().map(|n| n.key.as_str()).collect();
        assert_eq!(keys, vec!["/svc/Math/a", "/svc/Math/b"]);
        assert_eq!(children[0].value, "10.0.0.1:1");
    }

    #[tokio::test]
    async fn test_get_missing_path_is_empty() {
        let store = MemoryStore::new();
        assert!(store.get("/nothing/here").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_update_requires_existing_key() {
        let store = MemoryStore::new();
        let err = assert_err!(store.update("/svc/Math/a", "v", TTL).await);
        assert_eq!(err, StoreError::KeyNotFound("/svc/Math/a".to_string()));

        assert_ok!(store.set("/svc/Math/a", "v1", TTL).await);
        assert_ok!(store.update("svc/Math/a/", "v2", TTL).await);
        assert_eq!(store.get("/svc/Math").await.unwrap()[0].value, "v2");
    }

    #[tokio::test(start_paused = true)]
    async fn test_entries_expire() {
        let store = MemoryStore::new();
        store.set("/svc/Math/a", "v", TTL).await.unwrap();
        assert_eq!(store.len().await, 1);

        tokio::time::sleep(TTL + Duration::from_millis(1)).await;

        assert!(store.get("/svc/Math").await.unwrap().is_empty());
        assert!(store.is_empty().await);
        assert_err!(store.update("/svc/Math/a", "v", TTL).await);
    }

    #[tokio::test(start_paused = true)]
    async fn test_update_resets_lease() {
        let store = MemoryStore::new();
        store.set("/svc/Math/a", "v", TTL).await.unwrap();

        tokio::time::sleep(Duration::from_millis(1500)).await;
        store.update("/svc/Math/a", "v", TTL).await.unwrap();
        tokio::time::sleep(Duration::from_millis(1500)).await;

        assert_eq!(store.get("/svc/Math").await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_delete() {
        let store = MemoryStore::new();
        store.set("/svc/Math/a", "v", TTL).await.unwrap();

        assert!(store.delete("/svc/Math/a").await.unwrap());
        assert!(!store.delete("/svc/Math/a").await.unwrap());
        assert!(store.is_empty().await);
    }
}
