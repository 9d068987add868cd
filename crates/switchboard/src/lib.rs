//! # Switchboard
//!
//! Expose methods of plain Rust values as network services, and find and
//! call them elsewhere without hard-coded addresses.
//!
//! A server registers receivers in a method registry, listens, and announces
//! each service to a lease-based directory. A client resolves a qualified
//! method name (`Service.Method`) to one live provider and calls it.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use switchboard::prelude::*;
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
//! # async fn demo() -> Result<(), Box<dyn std::error::Error>> {
//! let store = Arc::new(MemoryStore::new());
//! let directory = Directory::new(store, DirectoryConfig::default());
//!
//! let server = Server::new(directory.clone(), ServerConfig::default());
//! server.register(Arc::new(Math))?;
//! tokio::spawn(server.bind("127.0.0.1:0").await?.run());
//!
//! let client = Client::new(directory, ClientConfig::default());
//! let reply: Num = client.call("Math.Square", &Num { value: 3 }).await?;
//! assert_eq!(reply.value, 9);
//! # Ok(())
//! # }
//! ```
//!
//! ## Architecture
//!
//! - [`switchboard_core`] - method registry, payload codec, wire envelope
//! - [`switchboard_directory`] - coordination store, directory client, announcer
//! - [`switchboard_rpc`] - tarpc server and client
//!
//! ## Leases
//!
//! | Setting | Default | Meaning |
//! |---------|---------|---------|
//! | `ttl_secs` | 10 | lifetime of an announced entry |
//! | `announce_interval_ms` | TTL / 2 | renewal period |
//! | `resolve_attempts` | 3 | directory lookups per call |
//! | `max_connections` | 128 | concurrently outstanding calls per client |

pub use switchboard_core as core;
pub use switchboard_directory as directory;
pub use switchboard_rpc as rpc;

/// Prelude module for convenient imports.
///
/// ```rust
/// use switchboard::prelude::*;
/// ```
pub mod prelude {
    // Registry
    pub use switchboard_core::codec;
    pub use switchboard_core::{
        DispatchError, MethodDescriptor, Methods, Receiver, RegistryError, Rejection,
        ServiceRegistry, Shape,
    };

    // Wire
    pub use switchboard_core::{RemoteError, RemoteErrorKind, Request, Response};

    // Directory
    pub use switchboard_directory::{
        connect_to_store, machine_identity, Announcer, AnnouncerError, AnnouncerState,
        CoordinationStore, Directory, DirectoryConfig, DirectoryError, FixedSelector, MemoryStore,
        RandomSelector, RemoteStore, Selector, StoreError, StoreNode, StoreServer,
    };

    // RPC
    pub use switchboard_rpc::{
        CallError, Client, ClientConfig, Listener, Server, ServerConfig, ServerError,
    };
}
