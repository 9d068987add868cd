//! # Switchboard Directory
//!
//! Service discovery for Switchboard: servers announce "service X is served
//! at address A" with a bounded lease, clients resolve X to one live address.
//!
//! - **Store**: the [`CoordinationStore`] boundary, an in-process
//!   [`MemoryStore`] with TTL expiry, and a tarpc-served variant
//!   ([`StoreServer`] / [`RemoteStore`]) shared between processes
//! - **Directory**: path layout, idempotent registration, randomized
//!   resolution through a pluggable [`Selector`]
//! - **Announcer**: background lease renewal for one service until stopped
//!
//! # Example
//!
//! ```rust,ignore
//! use switchboard_directory::{Directory, DirectoryConfig, MemoryStore};
//! use std::sync::Arc;
//!
//! let directory = Directory::new(Arc::new(MemoryStore::new()), DirectoryConfig::default());
//! directory.register("Math", "127.0.0.1:4100").await?;
//! let addr = directory.resolve("Math").await?;
//! ```

pub mod announcer;
pub mod config;
pub mod directory;
pub mod error;
pub mod identity;
pub mod selector;
pub mod store;

pub use announcer::{Announcer, AnnouncerState};
pub use config::DirectoryConfig;
pub use directory::Directory;
pub use error::{AnnouncerError, DirectoryError, StoreError};
pub use identity::machine_identity;
pub use selector::{FixedSelector, RandomSelector, Selector};
pub use store::{
    connect_to_store, CoordinationStore, MemoryStore, RemoteStore, StoreNode, StoreServer,
    StoreService, StoreServiceClient,
};
