//! Directory configuration.

use crate::error::DirectoryError;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Lease and layout settings for a [`Directory`](crate::Directory).
///
/// Entries live at `/<namespace>/<service>/<machine>`; node liveness entries
/// at `/<nodes_namespace>/<machine>`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DirectoryConfig {
    #[serde(default = "default_namespace")]
    pub namespace: String,
    #[serde(default = "default_nodes_namespace")]
    pub nodes_namespace: String,
    /// Lease length of every announced entry.
    #[serde(default = "default_ttl_secs")]
    pub ttl_secs: u64,
    /// Renewal period. Half the lease when unset.
    #[serde(default)]
    pub announce_interval_ms: Option<u64>,
    /// Address of a networked store, for processes that share one.
    #[serde(default = "default_store_addr")]
    pub store_addr: String,
}

fn default_namespace() -> String { "switchboard/rpc".to_string() }
fn default_nodes_namespace() -> String { "switchboard/nodes".to_string() }
fn default_ttl_secs() -> u64 { 10 }
fn default_store_addr() -> String { "127.0.0.1:4002".to_string() }

impl Default for DirectoryConfig {
    fn default() -> Self {
        Self {
            namespace: default_namespace(),
            nodes_namespace: default_nodes_namespace(),
            ttl_secs: default_ttl_secs(),
            announce_interval_ms: None,
            store_addr: default_store_addr(),
        }
    }
}

impl DirectoryConfig {
    /// Lease length.
    pub fn ttl(&self) -> Duration {
        Duration::from_secs(self.ttl_secs)
    }

    /// Renewal period. [`validate`](Self::validate) checks that it is
    /// shorter than the lease.
    pub fn announce_interval(&self) -> Duration {
        match self.announce_interval_ms {
            Some(ms) => Duration::from_millis(ms),
            None => self.ttl() / 2,
        }
    }

    /// Check that announced entries can actually stay alive.
    ///
    /// # Errors
    ///
    /// [`DirectoryError::InvalidConfig`] when the lease is zero, or when the
    /// renewal period is zero or not shorter than the lease.
    pub fn validate(&self) -> Result<(), DirectoryError> {
        if self.ttl_secs == 0 {
            return Err(DirectoryError::InvalidConfig(
                "ttl_secs must be at least 1".to_string(),
            ));
        }
        let interval = self.announce_interval();
        if interval.is_zero() || interval >= self.ttl() {
            return Err(DirectoryError::InvalidConfig(format!(
                "announce interval {:?} must be non-zero and shorter than the {:?} lease",
                interval,
                self.ttl()
            )));
        }
        Ok(())
    }
}
