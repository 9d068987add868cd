//! Errors that can occur serving or calling methods.

use switchboard_core::{RegistryError, RemoteError};
use switchboard_directory::{AnnouncerError, DirectoryError};
use thiserror::Error;

/// Errors returned by [`Server`](crate::Server).
#[derive(Error, Debug)]
pub enum ServerError {
    #[error("no services registered")]
    NoServices,

    #[error(transparent)]
    Registry(#[from] RegistryError),

    #[error("invalid listen address: {0}")]
    InvalidAddress(String),

    #[error("failed to bind {addr}: {source}")]
    Bind {
        addr: String,
        #[source]
        source: std::io::Error,
    },

    /// Bound to a wildcard address with nothing routable to announce.
    #[error("cannot announce wildcard address {0}; set advertise_addr")]
    UnroutableAddress(String),

    #[error("server is already serving")]
    AlreadyServing,

    #[error("server is closed")]
    Closed,

    #[error(transparent)]
    Directory(#[from] DirectoryError),

    #[error(transparent)]
    Announcer(#[from] AnnouncerError),
}

/// Errors returned by [`Client`](crate::Client).
///
/// `Application` is the only variant produced by the invoked method itself;
/// everything else is a failure to get a request there and an answer back.
#[derive(Error, Debug)]
pub enum CallError {
    #[error("invalid method name {0:?}, expected Service.Method")]
    InvalidMethodName(String),

    #[error("failed to encode arguments: {0}")]
    Encode(String),

    #[error("failed to resolve {service} after {attempts} attempts: {source}")]
    Resolution {
        service: String,
        attempts: u32,
        #[source]
        source: DirectoryError,
    },

    #[error("failed to connect to {address}: {source}")]
    Connect {
        address: String,
        #[source]
        source: std::io::Error,
    },

    #[error("transport failure talking to {address}: {source}")]
    Transport {
        address: String,
        #[source]
        source: tarpc::client::RpcError,
    },

    /// The method ran and returned this error message.
    #[error("{0}")]
    Application(String),

    /// The server could not run the method.
    #[error("remote {0}")]
    Remote(RemoteError),

    #[error("failed to decode reply: {0}")]
    Decode(String),

    #[error("client is closed")]
    Closed,
}

impl CallError {
    /// Whether the invoked method itself reported this error.
    pub fn is_application(&self) -> bool {
        matches!(self, CallError::Application(_))
    }
}
