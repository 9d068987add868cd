//! Switchboard Core Prelude - convenient imports for common usage.
//!
//! ```rust
//! use switchboard_core::prelude::*;
//! ```

pub use crate::codec;
pub use crate::error::{CodecError, DispatchError, RegistryError};
pub use crate::registry::{Methods, Receiver, ServiceRegistry};
pub use crate::wire::{RemoteError, RemoteErrorKind, Request, Response};
