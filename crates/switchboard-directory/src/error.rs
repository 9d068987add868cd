//! Errors that can occur in directory operations.

use serde::{Deserialize, Serialize};
use std::time::Duration;
use thiserror::Error;

/// Failures reported by a coordination store.
///
/// Serializable so the networked store can return it verbatim.
#[derive(Error, Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum StoreError {
    #[error("key not found: {0}")]
    KeyNotFound(String),

    #[error("store unavailable: {0}")]
    Unavailable(String),
}

/// Errors returned by [`Directory`](crate::Directory).
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DirectoryError {
    #[error("no providers registered for {0}")]
    NoProviders(String),

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error("invalid directory config: {0}")]
    InvalidConfig(String),
}

/// Misuse of an [`Announcer`](crate::Announcer).
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AnnouncerError {
    #[error("announcer for {0} is already running")]
    AlreadyStarted(String),

    #[error("announcer for {0} has been stopped")]
    Stopped(String),

    #[error("announce interval {interval:?} for {service} must be non-zero and shorter than the {ttl:?} lease")]
    InvalidInterval {
        service: String,
        interval: Duration,
        ttl: Duration,
    },

    #[error("announcer task for {service} ended abnormally: {reason}")]
    Aborted { service: String, reason: String },
}
