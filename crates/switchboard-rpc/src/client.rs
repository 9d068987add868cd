//! RPC client.
//!
//! Resolves the service part of a qualified name through the directory,
//! dials the chosen provider and performs one request/response exchange.

use crate::config::ClientConfig;
use crate::error::CallError;
use crate::protocol::RpcServiceClient;
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::SystemTime;
use switchboard_core::{codec, RemoteErrorKind, Request};
use switchboard_directory::Directory;
use tarpc::client::Config;
use tarpc::context::{self, Context};
use tokio::sync::Semaphore;
use tokio::time::{Instant, MissedTickBehavior};
use tokio_serde::formats::Bincode;
use tracing::{debug, instrument, trace, warn};

/// Calls methods on whichever provider the directory hands out.
///
/// Clones share the admission limit, so at most `max_connections` calls are
/// in flight across all of them.
#[derive(Clone)]
pub struct Client {
    directory: Directory,
    config: ClientConfig,
    permits: Arc<Semaphore>,
    next_id: Arc<AtomicU64>,
}

impl Client {
    pub fn new(directory: Directory, config: ClientConfig) -> Self {
        let permits = Arc::new(Semaphore::new(config.max_connections.max(1)));
        Self {
            directory,
            config,
            permits,
            next_id: Arc::new(AtomicU64::new(1)),
        }
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    /// Call `method` (`Service.Method`) with `args` and decode the reply.
    ///
    /// # Errors
    ///
    /// [`CallError::Application`] when the method itself failed; every
    /// other variant means the call never produced a usable answer.
    #[instrument(skip(self, args))]
    pub async fn call<A, R>(&self, method: &str, args: &A) -> Result<R, CallError>
    where
        A: Serialize + ?Sized,
        R: DeserializeOwned,
    {
        let service = service_name(method)?;
        let payload = codec::encode(args).map_err(|e| CallError::Encode(e.to_string()))?;

        let _permit = self.permits.acquire().await.map_err(|_| CallError::Closed)?;
        let address = self.resolve(service).await?;
        let result = self.exchange(&address, method, payload).await?;

        codec::decode(&result).map_err(|e| CallError::Decode(e.to_string()))
    }

    /// Out-parameter form of [`call`](Self::call).
    pub async fn call_into<A, R>(&self, method: &str, args: &A, reply: &mut R) -> Result<(), CallError>
    where
        A: Serialize + ?Sized,
        R: DeserializeOwned,
    {
        *reply = self.call(method, args).await?;
        Ok(())
    }

    /// Call a provider at a known address, skipping the directory.
    ///
    /// # Arguments
    ///
    /// * `address` - `host:port` of a server, as announced in the directory
    /// * `method` - Qualified method name, `Service.Method`
    /// * `args` - Method arguments
    ///
    /// # Errors
    ///
    /// Everything [`call`](Self::call) reports except
    /// [`CallError::Resolution`]; a dead address fails with
    /// [`CallError::Connect`] without retrying.
    #[instrument(skip(self, args))]
    pub async fn call_addr<A, R>(&self, address: &str, method: &str, args: &A) -> Result<R, CallError>
    where
        A: Serialize + ?Sized,
        R: DeserializeOwned,
    {
        service_name(method)?;
        let payload = codec::encode(args).map_err(|e| CallError::Encode(e.to_string()))?;

        let _permit = self.permits.acquire().await.map_err(|_| CallError::Closed)?;
        let result = self.exchange(address, method, payload).await?;

        codec::decode(&result).map_err(|e| CallError::Decode(e.to_string()))
    }

    /// Send `method` without waiting for its reply.
    ///
    /// Returns once a connection to the provider is open; the request is
    /// sent and answered in the background. The outcome, application errors
    /// included, is only logged. The call keeps its admission slot until the
    /// provider answers.
    ///
    /// # Errors
    ///
    /// The same name, encoding, resolution and connection errors as
    /// [`call`](Self::call). Never [`CallError::Application`].
    #[instrument(skip(self, args))]
    pub async fn notify<A>(&self, method: &str, args: &A) -> Result<(), CallError>
    where
        A: Serialize + ?Sized,
    {
        let service = service_name(method)?;
        let payload = codec::encode(args).map_err(|e| CallError::Encode(e.to_string()))?;

        let permit = self
            .permits
            .clone()
            .acquire_owned()
            .await
            .map_err(|_| CallError::Closed)?;
        let address = self.resolve(service).await?;
        let client = self.dial(&address).await?;
        let request = self.request(method, payload);
        let ctx = self.context();
        let method = method.to_string();

        tokio::spawn(async move {
            let _permit = permit;
            match client.dispatch(ctx, request).await {
                Ok(response) => match response.into_result() {
                    Ok(_) => debug!("One-way {} completed by {}", method, address),
                    Err(e) => warn!("One-way {} failed on {}: {}", method, address, e),
                },
                Err(e) => warn!("One-way {} to {} lost: {}", method, address, e),
            }
        });
        Ok(())
    }

    /// Refuse new calls. Calls already admitted run to completion.
    ///
    /// Clones share the admission limit, so closing one closes them all.
    ///
    /// # Errors
    ///
    /// [`CallError::Closed`] if the client was already closed.
    pub fn close(&self) -> Result<(), CallError> {
        if self.permits.is_closed() {
            return Err(CallError::Closed);
        }
        self.permits.close();
        debug!("RPC client closed");
        Ok(())
    }

    pub fn is_closed(&self) -> bool {
        self.permits.is_closed()
    }

    async fn resolve(&self, service: &str) -> Result<String, CallError> {
        let attempts = self.config.resolve_attempts.max(1);
        let mut attempt = 0;
        loop {
            if attempt > 0 {
                tokio::time::sleep(self.config.resolve_backoff() * attempt).await;
            }
            match self.directory.resolve(service).await {
                Ok(address) => return Ok(address),
                Err(source) => {
                    attempt += 1;
                    if attempt >= attempts {
                        return Err(CallError::Resolution {
                            service: service.to_string(),
                            attempts,
                            source,
                        });
                    }
                    warn!(
                        "Resolve attempt {}/{} for {} failed: {}",
                        attempt, attempts, service, source
                    );
                }
            }
        }
    }

    fn request(&self, method: &str, payload: Vec<u8>) -> Request {
        Request {
            id: self.next_id.fetch_add(1, Ordering::Relaxed),
            method: method.to_string(),
            payload,
        }
    }

    /// Request context whose deadline is the configured one, not tarpc's
    /// ten second default.
    fn context(&self) -> Context {
        let mut ctx = context::current();
        ctx.deadline = SystemTime::now() + self.config.request_deadline();
        ctx
    }

    async fn dial(&self, address: &str) -> Result<RpcServiceClient, CallError> {
        let connect_error = |source: std::io::Error| CallError::Connect {
            address: address.to_string(),
            source,
        };
        let transport = tokio::time::timeout(
            self.config.connect_timeout(),
            tarpc::serde_transport::tcp::connect(address.to_string(), Bincode::default),
        )
        .await
        .map_err(|_| {
            connect_error(std::io::Error::new(
                std::io::ErrorKind::TimedOut,
                "connection timeout",
            ))
        })?
        .map_err(connect_error)?;

        Ok(RpcServiceClient::new(Config::default(), transport).spawn())
    }

    async fn exchange(
        &self,
        address: &str,
        method: &str,
        payload: Vec<u8>,
    ) -> Result<Vec<u8>, CallError> {
        let client = self.dial(address).await?;
        let request = self.request(method, payload);
        let ctx = self.context();

        let started = Instant::now();
        let mut liveness = tokio::time::interval_at(
            started + self.config.liveness_interval(),
            self.config.liveness_interval(),
        );
        liveness.set_missed_tick_behavior(MissedTickBehavior::Delay);

        let pending = client.dispatch(ctx, request);
        tokio::pin!(pending);
        let response = loop {
            tokio::select! {
                response = &mut pending => break response,
                _ = liveness.tick() => {
                    trace!("Still waiting on {} from {} after {:?}", method, address, started.elapsed());
                }
            }
        };

        let response = response.map_err(|source| CallError::Transport {
            address: address.to_string(),
            source,
        })?;
        debug!("{} answered by {} in {:?}", method, address, started.elapsed());

        response.into_result().map_err(|e| match e.kind {
            RemoteErrorKind::Application => CallError::Application(e.message),
            _ => CallError::Remote(e),
        })
    }
}

/// Service part of a qualified name.
fn service_name(method: &str) -> Result<&str, CallError> {
    match method.split_once('.') {
        Some((service, name)) if !service.is_empty() && !name.is_empty() && !name.contains('.') => {
            Ok(service)
        }
        _ => Err(CallError::InvalidMethodName(method.to_string())),
    }
}
