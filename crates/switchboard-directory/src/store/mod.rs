//! Coordination store boundary.
//!
//! The directory only needs three operations from its backing store: list the
//! live children of a path, create-or-overwrite a key with a lease, and
//! refresh an existing key (failing if it is absent). Paths are `/`-separated
//! strings; there are no transactions across keys.

mod memory;
mod remote;

pub use memory::MemoryStore;
pub use remote::{connect_to_store, RemoteStore, StoreServer, StoreService, StoreServiceClient};

use crate::error::StoreError;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// A live key under some directory path.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoreNode {
    /// Full key path.
    pub key: String,
    pub value: String,
}

impl StoreNode {
    /// Last segment of the key.
    pub fn name(&self) -> &str {
        self.key.rsplit('/').next().unwrap_or(&self.key)
    }
}

/// Key-value store with per-key leases.
#[async_trait]
pub trait CoordinationStore: Send + Sync {
    /// Live direct children of `path`, sorted by key.
    async fn get(&self, path: &str) -> Result<Vec<StoreNode>, StoreError>;

    /// Create or overwrite `path`; the key expires after `ttl` unless refreshed.
    async fn set(&self, path: &str, value: &str, ttl: Duration) -> Result<(), StoreError>;

    /// Rewrite a live key and reset its lease. Fails with
    /// [`StoreError::KeyNotFound`] if the key is absent or expired.
    async fn update(&self, path: &str, value: &str, ttl: Duration) -> Result<(), StoreError>;

    /// Remove a key. Returns whether a live key was removed.
    async fn delete(&self, path: &str) -> Result<bool, StoreError>;
}

/// Canonical form of a key: leading `/`, no trailing `/`, no empty segments.
pub(crate) fn normalize(path: &str) -> String {
    let segments: Vec<&str> = path.split('/').filter(|s| !s.is_empty()).collect();
    format!("/{}", segments.join("/"))
}
