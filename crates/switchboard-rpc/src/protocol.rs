//! tarpc service definition.
//!
//! The generic dispatch surface: every registered method travels through the
//! single `dispatch` operation carrying the qualified name and the encoded
//! argument, so one service definition covers every receiver.

use switchboard_core::{Request, Response};

/// Service exposed by every Switchboard server.
#[tarpc::service]
pub trait RpcService {
    /// Invoke `request.method` with `request.payload`.
    ///
    /// Failures, including unknown methods and undecodable payloads, are
    /// reported inside the [`Response`] rather than as transport errors.
    async fn dispatch(request: Request) -> Response;
}
