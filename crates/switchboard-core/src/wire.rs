//! Request/response envelope exchanged between client and server.
//!
//! One request frame in, one response frame out. The envelope itself is
//! framed and encoded by the transport; only `payload` and `result` carry
//! codec-encoded values.

use crate::error::DispatchError;
use serde::{Deserialize, Serialize};
use std::fmt;

/// A call as sent by the client.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Request {
    /// Correlation number, unique per client process only.
    pub id: u64,
    /// Qualified method name (`Service.Method`).
    pub method: String,
    /// Encoded argument value.
    pub payload: Vec<u8>,
}

/// Category of a failure reported by the server.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RemoteErrorKind {
    /// The invoked method returned an error.
    Application,
    /// No method with that name is registered.
    UnknownMethod,
    /// The argument payload could not be decoded.
    Decode,
    /// The reply could not be encoded.
    Encode,
    /// The server failed outside the method (e.g. the method panicked).
    Internal,
}

impl fmt::Display for RemoteErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RemoteErrorKind::Application => write!(f, "application"),
            RemoteErrorKind::UnknownMethod => write!(f, "unknown method"),
            RemoteErrorKind::Decode => write!(f, "decode"),
            RemoteErrorKind::Encode => write!(f, "encode"),
            RemoteErrorKind::Internal => write!(f, "internal"),
        }
    }
}

/// The `error` field of a response.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RemoteError {
    pub kind: RemoteErrorKind,
    pub message: String,
}

impl RemoteError {
    /// Create a remote error.
    pub fn new(kind: RemoteErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }
}

impl fmt::Display for RemoteError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} error: {}", self.kind, self.message)
    }
}

impl From<DispatchError> for RemoteError {
    fn from(e: DispatchError) -> Self {
        let kind = match &e {
            DispatchError::UnknownMethod(_) => RemoteErrorKind::UnknownMethod,
            DispatchError::Decode(_) => RemoteErrorKind::Decode,
            DispatchError::Encode(_) => RemoteErrorKind::Encode,
            DispatchError::Application(_) => RemoteErrorKind::Application,
        };
        // Application messages are carried verbatim.
        let message = match e {
            DispatchError::Application(message) => message,
            other => other.to_string(),
        };
        Self { kind, message }
    }
}

/// The server's answer to one [`Request`].
///
/// Exactly one of `error` and `result` is set.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Response {
    pub id: u64,
    pub error: Option<RemoteError>,
    pub result: Option<Vec<u8>>,
}

impl Response {
    /// A successful response carrying an encoded reply.
    pub fn ok(id: u64, result: Vec<u8>) -> Self {
        Self {
            id,
            error: None,
            result: Some(result),
        }
    }

    /// A failed response.
    pub fn failure(id: u64, error: RemoteError) -> Self {
        Self {
            id,
            error: Some(error),
            result: None,
        }
    }

    /// Build a response from the outcome of a dispatch.
    pub fn from_dispatch(id: u64, outcome: Result<Vec<u8>, DispatchError>) -> Self {
        match outcome {
            Ok(result) => Self::ok(id, result),
            Err(e) => Self::failure(id, e.into()),
        }
    }

    /// Split into the error or the still-encoded result.
    pub fn into_result(self) -> Result<Vec<u8>, RemoteError> {
        match (self.error, self.result) {
            (Some(error), _) => Err(error),
            (None, Some(result)) => Ok(result),
            (None, None) => Err(RemoteError::new(
                RemoteErrorKind::Internal,
                "response carries neither error nor result",
            )),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_application_error_verbatim() {
        let remote: RemoteError = DispatchError::Application("can't square 1".to_string()).into();
        assert_eq!(remote.kind, RemoteErrorKind::Application);
        assert_eq!(remote.message, "can't square 1");
    }

    #[test]
    fn test_unknown_method_kind() {
        let remote: RemoteError = DispatchError::UnknownMethod("Foo.Bar".to_string()).into();
        assert_eq!(remote.kind, RemoteErrorKind::UnknownMethod);
        assert_eq!(remote.message, "unknown method Foo.Bar");
        assert_eq!(remote.to_string(), "unknown method error: unknown method Foo.Bar");
    }

    #[test]
    fn test_from_dispatch() {
        let ok = Response::from_dispatch(7, Ok(b"{}".to_vec()));
        assert_eq!(ok.id, 7);
        assert_eq!(ok.clone().into_result(), Ok(b"{}".to_vec()));

        let failed = Response::from_dispatch(8, Err(DispatchError::Decode("eof".to_string())));
        let err = failed.into_result().unwrap_err();
        assert_eq!(err.kind, RemoteErrorKind::Decode);
    }

    #[test]
    fn test_empty_response_is_internal_error() {
        let response = Response {
            id: 1,
            error: None,
            result: None,
        };
        let err = response.into_result().unwrap_err();
        assert_eq!(err.kind, RemoteErrorKind::Internal);
    }
}
