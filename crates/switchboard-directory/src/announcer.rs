//! Background lease renewal for one service.

use crate::directory::Directory;
use crate::error::AnnouncerError;
use std::time::Duration;
use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

/// Lifecycle of an [`Announcer`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AnnouncerState {
    /// Created, not yet started.
    Idle,
    /// Renewing its entry in the background.
    Announcing,
    /// Stopped for good. The entry lapses once its lease runs out.
    Stopped,
}

/// Keeps `service -> address` alive in a [`Directory`] until stopped.
///
/// Starting registers once immediately, then renews every announce interval.
/// Renewal failures are logged and retried on the next tick. Stopping does
/// not delete the entry. Dropping a running announcer stops it.
pub struct Announcer {
    directory: Directory,
    service: String,
    address: String,
    interval: Duration,
    state: AnnouncerState,
    stop_tx: Option<oneshot::Sender<()>>,
    task: Option<JoinHandle<()>>,
}

impl Announcer {
    /// Create an idle announcer using the directory's announce interval.
    pub fn new(
        directory: Directory,
        service: impl Into<String>,
        address: impl Into<String>,
    ) -> Self {
        let interval = directory.config().announce_interval();
        Self {
            directory,
            service: service.into(),
            address: address.into(),
            interval,
            state: AnnouncerState::Idle,
            stop_tx: None,
            task: None,
        }
    }

    /// Override the renewal period.
    pub fn with_interval(mut self, interval: Duration) -> Self {
        self.interval = interval;
        self
    }

    pub fn state(&self) -> AnnouncerState {
        self.state
    }

    pub fn service(&self) -> &str {
        &self.service
    }

    pub fn address(&self) -> &str {
        &self.address
    }

    /// Spawn the renewal task. Must be called within a Tokio runtime.
    ///
    /// # Errors
    ///
    /// - [`AnnouncerError::AlreadyStarted`] / [`AnnouncerError::Stopped`] when
    ///   not idle.
    /// - [`AnnouncerError::InvalidInterval`] when the renewal period is zero
    ///   or would let the entry lapse between renewals.
    pub fn start(&mut self) -> Result<(), AnnouncerError> {
        match self.state {
            AnnouncerState::Announcing => {
                return Err(AnnouncerError::AlreadyStarted(self.service.clone()))
            }
            AnnouncerState::Stopped => return Err(AnnouncerError::Stopped(self.service.clone())),
            AnnouncerState::Idle => {}
        }

        let ttl = self.directory.ttl();
        if self.interval.is_zero() || self.interval >= ttl {
            return Err(AnnouncerError::InvalidInterval {
                service: self.service.clone(),
                interval: self.interval,
                ttl,
            });
        }

        let (stop_tx, stop_rx) = oneshot::channel();
        let task = tokio::spawn(announce_loop(
            self.directory.clone(),
            self.service.clone(),
            self.address.clone(),
            self.interval,
            stop_rx,
        ));

        info!(
            "Announcing {} at {} every {:?}",
            self.service, self.address, self.interval
        );
        self.stop_tx = Some(stop_tx);
        self.task = Some(task);
        self.state = AnnouncerState::Announcing;
        Ok(())
    }

    /// Stop renewing and wait for the task to finish. Idempotent.
    ///
    /// The announcer is stopped afterwards even when this returns an error.
    ///
    /// # Errors
    ///
    /// [`AnnouncerError::Aborted`] if the renewal task panicked or was
    /// cancelled before it could be stopped.
    pub async fn stop(&mut self) -> Result<(), AnnouncerError> {
        if let Some(tx) = self.stop_tx.take() {
            let _ = tx.send(());
        }
        let outcome = match self.task.take() {
            Some(task) => task.await.map_err(|e| {
                warn!("Announcer task for {} ended abnormally: {}", self.service, e);
                AnnouncerError::Aborted {
                    service: self.service.clone(),
                    reason: e.to_string(),
                }
            }),
            None => Ok(()),
        };
        if self.state != AnnouncerState::Stopped {
            debug!("Stopped announcing {}", self.service);
        }
        self.state = AnnouncerState::Stopped;
        outcome
    }
}

impl Drop for Announcer {
    fn drop(&mut self) {
        if let Some(tx) = self.stop_tx.take() {
            let _ = tx.send(());
        }
    }
}

async fn announce_loop(
    directory: Directory,
    service: String,
    address: String,
    interval: Duration,
    mut stop_rx: oneshot::Receiver<()>,
) {
    loop {
        if let Err(e) = directory.register(&service, &address).await {
            warn!("Failed to announce {} at {}: {}", service, address, e);
        }

        tokio::select! {
            _ = &mut stop_rx => break,
            _ = tokio::time::sleep(interval) => {}
        }
    }
}
