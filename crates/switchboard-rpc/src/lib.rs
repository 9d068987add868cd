//! # Switchboard RPC
//!
//! Network half of Switchboard. A [`Server`] exposes registered receivers
//! over tarpc and announces them to the directory; a [`Client`] resolves a
//! qualified method name to a live provider and calls it.
//!
//! All methods share one tarpc service ([`RpcService`]) whose single
//! operation carries the qualified name and the encoded argument.
//!
//! # Example
//!
//! ```rust,ignore
//! use switchboard_rpc::{Client, ClientConfig, Server, ServerConfig};
//!
//! let server = Server::new(directory.clone(), ServerConfig::default());
//! server.register(Arc::new(Math))?;
//! tokio::spawn(server.bind("127.0.0.1:0").await?.run());
//!
//! let client = Client::new(directory, ClientConfig::default());
//! let reply: Num = client.call("Math.Square", &Num { value: 3 }).await?;
//! ```

pub mod client;
pub mod config;
pub mod error;
pub mod protocol;
pub mod server;

pub use client::Client;
pub use config::{ClientConfig, ServerConfig, UNBOUNDED_REQUEST_DEADLINE};
pub use error::{CallError, ServerError};
pub use protocol::{RpcService, RpcServiceClient};
pub use server::{Listener, Server};
