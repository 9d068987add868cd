//! Server and client configuration.

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Default number of directory lookups before a call gives up.
const DEFAULT_RESOLVE_ATTEMPTS: u32 = 3;

/// Default base wait between lookups; attempt `i` waits `i` times this.
const DEFAULT_RESOLVE_BACKOFF_MS: u64 = 200;

/// Default process-wide cap on concurrently outstanding calls.
const DEFAULT_MAX_CONNECTIONS: usize = 128;

/// Default period of the "still waiting" log while a call is outstanding.
const DEFAULT_LIVENESS_INTERVAL_MS: u64 = 2000;

/// Default connection timeout in milliseconds.
const DEFAULT_CONNECT_TIMEOUT_MS: u64 = 5000;

/// Deadline given to requests when none is configured.
///
/// tarpc tracks every deadline in a timer wheel that cannot hold more than
/// about two years, so "no deadline" is one year out.
pub const UNBOUNDED_REQUEST_DEADLINE: Duration = Duration::from_secs(365 * 24 * 60 * 60);

/// Configuration for [`Server`](crate::Server).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Address announced to the directory. The bound address when unset.
    #[serde(default)]
    pub advertise_addr: Option<String>,
    /// Report every method the registry rejects.
    #[serde(default)]
    pub debug: bool,
}

/// Configuration for [`Client`](crate::Client).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClientConfig {
    #[serde(default = "default_resolve_attempts")]
    pub resolve_attempts: u32,
    #[serde(default = "default_resolve_backoff_ms")]
    pub resolve_backoff_ms: u64,
    /// Calls beyond this many wait for a slot.
    #[serde(default = "default_max_connections")]
    pub max_connections: usize,
    #[serde(default = "default_liveness_interval_ms")]
    pub liveness_interval_ms: u64,
    #[serde(default = "default_connect_timeout_ms")]
    pub connect_timeout_ms: u64,
    /// Abort calls that take longer than this. Calls wait for as long as
    /// the connection holds when unset.
    #[serde(default)]
    pub request_deadline_secs: Option<u64>,
}

fn default_resolve_attempts() -> u32 { DEFAULT_RESOLVE_ATTEMPTS }
fn default_resolve_backoff_ms() -> u64 { DEFAULT_RESOLVE_BACKOFF_MS }
fn default_max_connections() -> usize { DEFAULT_MAX_CONNECTIONS }
fn default_liveness_interval_ms() -> u64 { DEFAULT_LIVENESS_INTERVAL_MS }
fn default_connect_timeout_ms() -> u64 { DEFAULT_CONNECT_TIMEOUT_MS }

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            resolve_attempts: DEFAULT_RESOLVE_ATTEMPTS,
            resolve_backoff_ms: DEFAULT_RESOLVE_BACKOFF_MS,
            max_connections: DEFAULT_MAX_CONNECTIONS,
            liveness_interval_ms: DEFAULT_LIVENESS_INTERVAL_MS,
            connect_timeout_ms: DEFAULT_CONNECT_TIMEOUT_MS,
            request_deadline_secs: None,
        }
    }
}

impl ClientConfig {
    pub fn resolve_backoff(&self) -> Duration {
        Duration::from_millis(self.resolve_backoff_ms)
    }

    pub fn liveness_interval(&self) -> Duration {
        Duration::from_millis(self.liveness_interval_ms)
    }

    pub fn connect_timeout(&self) -> Duration {
        Duration::from_millis(self.connect_timeout_ms)
    }

    /// How far past "now" each request's deadline lies.
    pub fn request_deadline(&self) -> Duration {
        match self.request_deadline_secs {
            Some(secs) => Duration::from_secs(secs).min(UNBOUNDED_REQUEST_DEADLINE),
            None => UNBOUNDED_REQUEST_DEADLINE,
        }
    }
}
