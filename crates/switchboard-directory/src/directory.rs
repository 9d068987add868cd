//! Directory client.
//!
//! Maps service names to the addresses currently announcing them. Every
//! entry carries a lease; a provider that stops refreshing disappears once
//! its lease runs out, so `resolve` only ever returns recently-live
//! providers.

use crate::config::DirectoryConfig;
use crate::error::DirectoryError;
use crate::identity::machine_identity;
use crate::selector::{RandomSelector, Selector};
use crate::store::{CoordinationStore, StoreNode};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, instrument, warn};

/// Handle onto a coordination store laid out as a service directory.
///
/// Cheap to clone; clones share the store and the selector.
#[derive(Clone)]
pub struct Directory {
    store: Arc<dyn CoordinationStore>,
    selector: Arc<dyn Selector>,
    config: DirectoryConfig,
    identity: String,
}

impl std::fmt::Debug for Directory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Directory")
            .field("config", &self.config)
            .field("identity", &self.identity)
            .finish_non_exhaustive()
    }
}

impl Directory {
    /// Create a directory over `store` with random provider selection.
    pub fn new(store: Arc<dyn CoordinationStore>, config: DirectoryConfig) -> Self {
        Self {
            store,
            selector: Arc::new(RandomSelector),
            config,
            identity: machine_identity().to_string(),
        }
    }

    /// Replace the provider selection strategy.
    pub fn with_selector(mut self, selector: impl Selector + 'static) -> Self {
        self.selector = Arc::new(selector);
        self
    }

    /// Announce under a different machine identity.
    ///
    /// Lets one process stand in for several providers, mostly in tests.
    pub fn with_identity(mut self, identity: impl Into<String>) -> Self {
        self.identity = identity.into();
        self
    }

    pub fn config(&self) -> &DirectoryConfig {
        &self.config
    }

    /// Lease length applied by [`register`](Self::register).
    pub fn ttl(&self) -> Duration {
        self.config.ttl()
    }

    /// Machine segment used for this directory's entries.
    pub fn machine_identity(&self) -> &str {
        &self.identity
    }

    /// Store path holding the providers of `service`.
    pub fn service_path(&self, service: &str) -> String {
        format!("/{}/{}", self.config.namespace.trim_matches('/'), service)
    }

    fn entry_path(&self, service: &str) -> String {
        format!("{}/{}", self.service_path(service), self.identity)
    }

    fn node_path(&self) -> String {
        format!(
            "/{}/{}",
            self.config.nodes_namespace.trim_matches('/'),
            self.identity
        )
    }

    /// Create or refresh this process's entry for `service`.
    ///
    /// Tries to refresh first and falls back to creating. The entry lives for
    /// one lease ([`ttl`](Self::ttl)) unless registered again.
    ///
    /// # Arguments
    ///
    /// * `service` - Service name, the second path segment
    /// * `address` - Value stored under `/<namespace>/<service>/<machine>`
    ///
    /// # Errors
    ///
    /// [`DirectoryError::Store`] if neither the refresh nor the create of the
    /// service entry succeeded. The node-liveness entry is best effort and
    /// only logged on failure.
    #[instrument(skip(self))]
    pub async fn register(&self, service: &str, address: &str) -> Result<(), DirectoryError> {
        let ttl = self.ttl();
        let path = self.entry_path(service);
        self.upsert(&path, address, ttl).await?;
        debug!("Registered {} at {} as {}", service, address, path);

        let node = self.node_path();
        if let Err(e) = self.upsert(&node, address, ttl).await {
            warn!("Failed to refresh node entry {}: {}", node, e);
        }
        Ok(())
    }

    async fn upsert(&self, path: &str, value: &str, ttl: Duration) -> Result<(), DirectoryError> {
        if self.store.update(path, value, ttl).await.is_ok() {
            return Ok(());
        }
        self.store.set(path, value, ttl).await?;
        Ok(())
    }

    /// Addresses of every live provider of `service`.
    pub async fn providers(&self, service: &str) -> Result<Vec<String>, DirectoryError> {
        let children = self.store.get(&self.service_path(service)).await?;
        Ok(children.into_iter().map(|node| node.value).collect())
    }

    /// Pick one live provider of `service`.
    ///
    /// Fails immediately with [`DirectoryError::NoProviders`] when nothing is
    /// announced; retrying is the caller's business.
    #[instrument(skip(self))]
    pub async fn resolve(&self, service: &str) -> Result<String, DirectoryError> {
        let mut candidates = self.providers(service).await?;
        let index = self
            .selector
            .select(&candidates)
            .filter(|i| *i < candidates.len())
            .ok_or_else(|| DirectoryError::NoProviders(service.to_string()))?;
        let address = candidates.swap_remove(index);
        debug!("Resolved {} to {}", service, address);
        Ok(address)
    }

    /// Live processes that announced anything, as `(identity, address)` pairs.
    pub async fn nodes(&self) -> Result<Vec<(String, String)>, DirectoryError> {
        let path = format!("/{}", self.config.nodes_namespace.trim_matches('/'));
        let children = self.store.get(&path).await?;
        Ok(children
            .iter()
            .map(|node: &StoreNode| (node.name().to_string(), node.value.clone()))
            .collect())
    }
}
