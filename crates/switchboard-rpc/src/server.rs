//! RPC server.
//!
//! Owns a [`ServiceRegistry`], listens for tarpc connections, dispatches each
//! request through the registry and keeps one [`Announcer`] per registered
//! service alive while serving.

use crate::config::ServerConfig;
use crate::error::ServerError;
use crate::protocol::RpcService;
use futures::future::{self, BoxFuture};
use futures::{FutureExt, StreamExt};
use std::net::SocketAddr;
use std::sync::Arc;
use switchboard_core::{Receiver, RemoteError, RemoteErrorKind, Request, Response, ServiceRegistry};
use switchboard_directory::{Announcer, Directory};
use tarpc::context::Context;
use tarpc::server::{self, Channel};
use tokio::sync::{watch, Mutex};
use tokio_serde::formats::Bincode;
use tracing::{debug, error, info, instrument};

/// Serves registered receivers and announces them to a [`Directory`].
///
/// # Example
///
/// ```rust,ignore
/// let server = Server::new(directory, ServerConfig::default());
/// server.register(Arc::new(Math))?;
/// let listener = server.bind("127.0.0.1:0").await?;
/// println!("serving on {}", listener.local_addr());
/// listener.run().await;
/// ```
pub struct Server {
    registry: Arc<ServiceRegistry>,
    directory: Directory,
    config: ServerConfig,
    announcers: Mutex<Vec<Announcer>>,
    shutdown: watch::Sender<bool>,
}

impl Server {
    /// Create a server with an empty registry.
    pub fn new(directory: Directory, config: ServerConfig) -> Self {
        let (shutdown, _) = watch::channel(false);
        Self {
            registry: Arc::new(ServiceRegistry::with_debug(config.debug)),
            directory,
            config,
            announcers: Mutex::new(Vec::new()),
            shutdown,
        }
    }

    pub fn registry(&self) -> &Arc<ServiceRegistry> {
        &self.registry
    }

    pub fn directory(&self) -> &Directory {
        &self.directory
    }

    /// Expose a receiver under its type name. Returns the number of methods.
    pub fn register<R: Receiver>(&self, receiver: Arc<R>) -> Result<usize, ServerError> {
        Ok(self.registry.register(receiver)?)
    }

    /// Expose a receiver under an explicit service name.
    pub fn register_name<R: Receiver>(
        &self,
        service: &str,
        receiver: Arc<R>,
    ) -> Result<usize, ServerError> {
        Ok(self.registry.register_name(service, receiver)?)
    }

    /// Bind `addr` and start announcing every registered service.
    ///
    /// Services registered after this call are dispatched but not announced.
    /// Nothing is accepted until [`Listener::run`] is polled. A server binds
    /// once; announcing the same services from two listeners would race on
    /// one directory entry.
    ///
    /// # Arguments
    ///
    /// * `addr` - Listen address, `host:port`. Port 0 picks a free port.
    ///
    /// # Errors
    ///
    /// - [`ServerError::NoServices`] if nothing is registered
    /// - [`ServerError::AlreadyServing`] / [`ServerError::Closed`] if the
    ///   server was bound before or has been closed
    /// - [`ServerError::Directory`] if the lease settings cannot keep an
    ///   entry alive
    /// - [`ServerError::InvalidAddress`] / [`ServerError::Bind`] if `addr`
    ///   does not parse or cannot be bound
    /// - [`ServerError::UnroutableAddress`] for a wildcard address without
    ///   `advertise_addr`
    pub async fn bind(&self, addr: &str) -> Result<Listener, ServerError> {
        let services = self.registry.service_names();
        if services.is_empty() {
            return Err(ServerError::NoServices);
        }

        // held until the announcers are in place so concurrent binds see them
        let mut announcers = self.announcers.lock().await;
        let is_closed = *self.shutdown.borrow();
        if is_closed {
            return Err(ServerError::Closed);
        }
        if !announcers.is_empty() {
            return Err(ServerError::AlreadyServing);
        }
        self.directory.config().validate()?;

        let socket_addr = tokio::net::lookup_host(addr)
            .await
            .ok()
            .and_then(|mut addrs| addrs.next())
            .ok_or_else(|| ServerError::InvalidAddress(addr.to_string()))?;
        if self.config.advertise_addr.is_none() && socket_addr.ip().is_unspecified() {
            return Err(ServerError::UnroutableAddress(addr.to_string()));
        }

        let listener = tarpc::serde_transport::tcp::listen(&socket_addr, Bincode::default)
            .await
            .map_err(|source| ServerError::Bind {
                addr: addr.to_string(),
                source,
            })?;
        let local_addr = listener.local_addr();
        info!("RPC server listening on {}", local_addr);

        let advertised = self
            .config
            .advertise_addr
            .clone()
            .unwrap_or_else(|| local_addr.to_string());
        // dropping a started announcer stops it, so an early return leaks none
        let mut started = Vec::with_capacity(services.len());
        for service in services {
            let mut announcer = Announcer::new(self.directory.clone(), service, &advertised);
            announcer.start()?;
            started.push(announcer);
        }
        *announcers = started;
        drop(announcers);

        let handler = Dispatcher {
            registry: self.registry.clone(),
        };
        let mut shutdown_rx = self.shutdown.subscribe();
        let closed = async move {
            let _ = shutdown_rx.wait_for(|closed| *closed).await;
        };

        let serving = listener
            .filter_map(|r| future::ready(r.ok()))
            .take_until(closed)
            .map(server::BaseChannel::with_defaults)
            .for_each(move |channel| {
                let handler = handler.clone();
                tokio::spawn(async move {
                    let peer = channel.transport().peer_addr().ok();
                    debug!("Accepted connection from {:?}", peer);
                    // responses on one connection are produced in order
                    channel
                        .execute(handler.serve())
                        .for_each(|response| response)
                        .await;
                    debug!("Connection from {:?} closed", peer);
                });
                future::ready(())
            })
            .boxed();

        Ok(Listener {
            local_addr,
            serving,
        })
    }

    /// Bind `addr` and serve until [`close`](Self::close) is called.
    pub async fn serve(&self, addr: &str) -> Result<(), ServerError> {
        self.bind(addr).await?.run().await;
        Ok(())
    }

    /// Stop announcing, then stop accepting connections.
    ///
    /// Entries lapse from the directory once their lease runs out.
    /// Connections already accepted finish on their own. The server cannot
    /// be bound again afterwards. Closing twice is harmless.
    ///
    /// # Errors
    ///
    /// [`ServerError::Announcer`] with the first announcer that did not stop
    /// cleanly. Every announcer is stopped and accepting ends regardless.
    pub async fn close(&self) -> Result<(), ServerError> {
        let mut announcers = self.announcers.lock().await;
        let mut outcome: Result<(), ServerError> = Ok(());
        for announcer in announcers.iter_mut() {
            if let Err(e) = announcer.stop().await {
                if outcome.is_ok() {
                    outcome = Err(e.into());
                }
            }
        }
        announcers.clear();
        self.shutdown.send_replace(true);
        info!("RPC server closed");
        outcome
    }
}

/// A bound, not yet running, accept loop.
pub struct Listener {
    local_addr: SocketAddr,
    serving: BoxFuture<'static, ()>,
}

impl Listener {
    /// Address actually bound; useful after binding port 0.
    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    /// Accept connections until the server is closed.
    ///
    /// Each connection runs on its own task.
    pub async fn run(self) {
        self.serving.await;
        debug!("Accept loop on {} finished", self.local_addr);
    }
}

impl std::fmt::Debug for Listener {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Listener")
            .field("local_addr", &self.local_addr)
            .finish_non_exhaustive()
    }
}

#[derive(Clone)]
struct Dispatcher {
    registry: Arc<ServiceRegistry>,
}

impl RpcService for Dispatcher {
    #[instrument(skip(self, _ctx, request), fields(id = request.id, method = %request.method))]
    async fn dispatch(self, _ctx: Context, request: Request) -> Response {
        let id = request.id;
        let registry = self.registry;
        // methods are synchronous and may block
        let outcome = tokio::task::spawn_blocking(move || {
            registry.dispatch(&request.method, &request.payload)
        })
        .await;

        match outcome {
            Ok(outcome) => {
                if let Err(e) = &outcome {
                    debug!("Dispatch failed: {}", e);
                }
                Response::from_dispatch(id, outcome)
            }
            Err(e) => {
                error!("Method task failed: {}", e);
                Response::failure(id, RemoteError::new(RemoteErrorKind::Internal, e.to_string()))
            }
        }
    }
}
