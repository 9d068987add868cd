//! # Switchboard Core
//!
//! Transport-independent building blocks of the Switchboard RPC framework:
//!
//! - **Registry** - turns receiver objects into a table of remotely callable
//!   methods keyed by qualified name (`Service.Method`)
//! - **Codec** - the self-describing payload encoding for arguments and replies
//! - **Wire** - the request/response envelope exchanged between client and server
//!
//! ## Quick Start
//!
//! ```rust
//! use switchboard_core::prelude::*;
//! use std::sync::Arc;
//!
//! #[derive(serde::Serialize, serde::Deserialize, Default)]
//! struct Num {
//!     value: i64,
//! }
//!
//! struct Math;
//!
//! impl Math {
//!     fn square(&self, args: Num, reply: &mut Num) -> Result<(), String> {
//!         reply.value = args.value * args.value;
//!         Ok(())
//!     }
//! }
//!
//! impl Receiver for Math {
//!     fn methods(methods: &mut Methods<Self>) {
//!         methods.add("Square", Math::square);
//!     }
//! }
//!
//! let registry = ServiceRegistry::new();
//! registry.register(Arc::new(Math)).unwrap();
//!
//! let payload = codec::encode(&Num { value: 3 }).unwrap();
//! let reply: Num = codec::decode(&registry.dispatch("Math.Square", &payload).unwrap()).unwrap();
//! assert_eq!(reply.value, 9);
//! ```

pub mod codec;
pub mod error;
pub mod prelude;
pub mod registry;
pub mod wire;

pub use error::{CodecError, DispatchError, RegistryError};
pub use registry::{MethodDescriptor, Methods, Receiver, Rejection, ServiceRegistry, Shape};
pub use wire::{RemoteError, RemoteErrorKind, Request, Response};
