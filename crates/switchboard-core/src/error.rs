//! Error types for registration, dispatch and payload encoding.

use thiserror::Error;

/// Errors raised while registering a receiver.
///
/// A failed registration leaves previously registered services untouched.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RegistryError {
    #[error("service {0} has no methods of suitable shape")]
    NoSuitableMethods(String),

    #[error("method {0} is already registered")]
    DuplicateService(String),

    #[error("invalid service name {0:?}")]
    InvalidServiceName(String),
}

/// Errors raised while dispatching a single call.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DispatchError {
    #[error("unknown method {0}")]
    UnknownMethod(String),

    #[error("cannot decode arguments: {0}")]
    Decode(String),

    #[error("cannot encode reply: {0}")]
    Encode(String),

    /// The error value returned by the invoked method itself.
    #[error("{0}")]
    Application(String),
}

/// Payload encoding failure.
#[derive(Error, Debug)]
#[error("payload codec: {0}")]
pub struct CodecError(#[from] serde_json::Error);
