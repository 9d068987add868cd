//! Networked coordination store.
//!
//! A [`StoreServer`] exposes a [`MemoryStore`] over tarpc so several
//! processes can share one directory; [`RemoteStore`] is the client half and
//! implements [`CoordinationStore`] on top of the generated stub.

use super::{CoordinationStore, MemoryStore, StoreNode};
use crate::error::StoreError;
use async_trait::async_trait;
use futures::future::{self, BoxFuture};
use futures::{FutureExt, StreamExt};
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tarpc::client::Config;
use tarpc::context::{self, Context};
use tarpc::server::{self, Channel};
use tokio_serde::formats::Bincode;
use tracing::{debug, info, instrument};

/// Maximum concurrently served store connections.
const MAX_STORE_CONNECTIONS: usize = 64;

/// Store operations as served over the network.
#[tarpc::service]
pub trait StoreService {
    /// Live direct children of a path.
    async fn get(path: String) -> Result<Vec<StoreNode>, StoreError>;

    /// Create or overwrite a key with a lease of `ttl_ms`.
    async fn set(path: String, value: String, ttl_ms: u64) -> Result<(), StoreError>;

    /// Refresh an existing key.
    async fn update(path: String, value: String, ttl_ms: u64) -> Result<(), StoreError>;

    /// Remove a key.
    async fn delete(path: String) -> Result<bool, StoreError>;
}

/// Serves a [`MemoryStore`] over tarpc.
#[derive(Clone)]
pub struct StoreServer {
    store: Arc<MemoryStore>,
}

impl StoreServer {
    /// Wrap a store for serving.
    pub fn new(store: Arc<MemoryStore>) -> Self {
        Self { store }
    }

    /// The served store.
    pub fn store(&self) -> &Arc<MemoryStore> {
        &self.store
    }

    /// Serve on `addr` until the listener fails.
    pub async fn start(self, addr: SocketAddr) -> Result<(), std::io::Error> {
        let (_, serving) = self.bind(addr).await?;
        serving.await;
        Ok(())
    }

    /// Bind `addr` and return the bound address plus the accept loop.
    ///
    /// Binding port 0 picks a free port; the loop does nothing until polled.
    pub async fn bind(
        self,
        addr: SocketAddr,
    ) -> Result<(SocketAddr, BoxFuture<'static, ()>), std::io::Error> {
        let listener = tarpc::serde_transport::tcp::listen(&addr, Bincode::default).await?;
        let local_addr = listener.local_addr();
        info!("Store server listening on {}", local_addr);

        let serving = listener
            .filter_map(|r| future::ready(r.ok()))
            .map(server::BaseChannel::with_defaults)
            .for_each_concurrent(MAX_STORE_CONNECTIONS, move |channel| {
                let server = self.clone();
                async move {
                    channel
                        .execute(server.serve())
                        .for_each(|response| async move {
                            tokio::spawn(response);
                        })
                        .await
                }
            })
            .boxed();

        Ok((local_addr, serving))
    }
}

impl StoreService for StoreServer {
    #[instrument(skip(self, _ctx))]
    async fn get(self, _ctx: Context, path: String) -> Result<Vec<StoreNode>, StoreError> {
        self.store.get(&path).await
    }

    #[instrument(skip(self, _ctx, value))]
    async fn set(
        self,
        _ctx: Context,
        path: String,
        value: String,
        ttl_ms: u64,
    ) -> Result<(), StoreError> {
        self.store
            .set(&path, &value, Duration::from_millis(ttl_ms))
            .await
    }

    #[instrument(skip(self, _ctx, value))]
    async fn update(
        self,
        _ctx: Context,
        path: String,
        value: String,
        ttl_ms: u64,
    ) -> Result<(), StoreError> {
        self.store
            .update(&path, &value, Duration::from_millis(ttl_ms))
            .await
    }

    #[instrument(skip(self, _ctx))]
    async fn delete(self, _ctx: Context, path: String) -> Result<bool, StoreError> {
        self.store.delete(&path).await
    }
}

/// Client half of a networked store.
#[derive(Clone)]
pub struct RemoteStore {
    client: StoreServiceClient,
    addr: SocketAddr,
}

impl RemoteStore {
    /// Address of the store server.
    pub fn addr(&self) -> SocketAddr {
        self.addr
    }
}

/// Connect to a [`StoreServer`].
pub async fn connect_to_store(addr: SocketAddr) -> Result<RemoteStore, std::io::Error> {
    debug!("Connecting to store at {}", addr);
    let transport = tarpc::serde_transport::tcp::connect(addr, Bincode::default).await?;
    let client = StoreServiceClient::new(Config::default(), transport).spawn();
    info!("Connected to store at {}", addr);
    Ok(RemoteStore { client, addr })
}

fn unavailable(addr: SocketAddr, err: tarpc::client::RpcError) -> StoreError {
    StoreError::Unavailable(format!("{}: {}", addr, err))
}

fn ttl_millis(ttl: Duration) -> u64 {
    u64::try_from(ttl.as_millis()).unwrap_or(u64::MAX)
}

#[async_trait]
impl CoordinationStore for RemoteStore {
    async fn get(&self, path: &str) -> Result<Vec<StoreNode>, StoreError> {
        self.client
            .get(context::current(), path.to_string())
            .await
            .map_err(|e| unavailable(self.addr, e))?
    }

    async fn set(&self, path: &str, value: &str, ttl: Duration) -> Result<(), StoreError> {
        self.client
            .set(
                context::current(),
                path.to_string(),
                value.to_string(),
                ttl_millis(ttl),
            )
            .await
            .map_err(|e| unavailable(self.addr, e))?
    }

    async fn update(&self, path: &str, value: &str, ttl: Duration) -> Result<(), StoreError> {
        self.client
            .update(
                context::current(),
                path.to_string(),
                value.to_string(),
                ttl_millis(ttl),
            )
            .await
            .map_err(|e| unavailable(self.addr, e))?
    }

    async fn delete(&self, path: &str) -> Result<bool, StoreError> {
        self.client
            .delete(context::current(), path.to_string())
            .await
            .map_err(|e| unavailable(self.addr, e))?
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn spawn_store() -> (Arc<MemoryStore>, RemoteStore) {
        let store = Arc::new(MemoryStore::new());
        let (addr, serving) = StoreServer::new(store.clone())
            .bind("127.0.0.1:0".parse().unwrap())
            .await
            .unwrap();
        tokio::spawn(serving);
        let remote = connect_to_store(addr).await.unwrap();
        (store, remote)
    }

    #[tokio::test]
    async fn test_remote_set_visible_locally() {
        let (local, remote) = spawn_store().await;
        remote
            .set("/svc/Math/a", "127.0.0.1:1", Duration::from_secs(5))
            .await
            .unwrap();

        let children = local.get("/svc/Math").await.unwrap();
        assert_eq!(children.len(), 1);
        assert_eq!(children[0].value, "127.0.0.1:1");
    }

    #[tokio::test]
    async fn test_remote_errors_are_preserved() {
        let (_, remote) = spawn_store().await;
        let err = remote
            .update("/svc/Math/a", "v", Duration::from_secs(5))
            .await
            .unwrap_err();
        assert_eq!(err, StoreError::KeyNotFound("/svc/Math/a".to_string()));
    }

    #[tokio::test]
    async fn test_unreachable_store() {
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);
        assert!(connect_to_store(addr).await.is_err());
    }
}
