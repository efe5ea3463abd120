//! Shutdown coordination.

use std::fmt;
use std::sync::Arc;

use tokio::sync::watch;
use tokio::task::JoinHandle;

use crate::lifecycle::signals::shutdown_signal;

/// Why devgate is stopping.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopReason {
    /// SIGINT or SIGTERM.
    Signal,
    /// `Shutdown::trigger` called from code (tests, embedding).
    Requested,
}

impl fmt::Display for StopReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StopReason::Signal => f.write_str("signal"),
            StopReason::Requested => f.write_str("requested"),
        }
    }
}

/// Owner side of the stop latch shared by the server and its reload task.
///
/// The first trigger wins; later ones keep the original reason.
#[derive(Clone)]
pub struct Shutdown {
    tx: Arc<watch::Sender<Option<StopReason>>>,
}

impl Shutdown {
    pub fn new() -> Self {
        let (tx, _) = watch::channel(None);
        Self { tx: Arc::new(tx) }
    }

    /// A handle the server awaits to know when to stop.
    pub fn handle(&self) -> ShutdownHandle {
        ShutdownHandle {
            rx: self.tx.subscribe(),
        }
    }

    /// Stop with `reason` unless a stop is already under way.
    pub fn trigger(&self, reason: StopReason) {
        self.tx.send_if_modified(|current| {
            if current.is_some() {
                return false;
            }
            *current = Some(reason);
            true
        });
    }

    pub fn reason(&self) -> Option<StopReason> {
        *self.tx.borrow()
    }

    /// Trigger with `StopReason::Signal` once the process gets SIGINT/SIGTERM.
    pub fn trigger_on_signal(&self) -> JoinHandle<()> {
        let shutdown = self.clone();
        tokio::spawn(async move {
            shutdown_signal().await;
            shutdown.trigger(StopReason::Signal);
        })
    }
}

impl Default for Shutdown {
    fn default() -> Self {
        Self::new()
    }
}

/// Receiving side of [`Shutdown`].
#[derive(Clone)]
pub struct ShutdownHandle {
    rx: watch::Receiver<Option<StopReason>>,
}

impl ShutdownHandle {
    /// Resolve once a stop has been triggered.
    ///
    /// Dropping every [`Shutdown`] without triggering counts as `Requested`.
    pub async fn stopped(&mut self) -> StopReason {
        match self.rx.wait_for(Option::is_some).await {
            Ok(reason) => (*reason).unwrap_or(StopReason::Requested),
            Err(_) => StopReason::Requested,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[tokio::test]
    async fn test_trigger_reaches_every_handle() {
        let shutdown = Shutdown::new();
        let mut server = shutdown.handle();
        let mut reload = shutdown.handle();

        shutdown.trigger(StopReason::Requested);
        assert_eq!(server.stopped().await, StopReason::Requested);
        assert_eq!(reload.stopped().await, StopReason::Requested);
    }

    #[tokio::test]
    async fn test_first_reason_is_kept() {
        let shutdown = Shutdown::new();
        shutdown.trigger(StopReason::Signal);
        shutdown.trigger(StopReason::Requested);

        assert_eq!(shutdown.reason(), Some(StopReason::Signal));
        assert_eq!(shutdown.handle().stopped().await, StopReason::Signal);
    }

    #[tokio::test]
    async fn test_handle_waits_until_triggered() {
        let shutdown = Shutdown::default();
        let mut handle = shutdown.handle();
        assert_eq!(shutdown.reason(), None);

        let pending = tokio::time::timeout(Duration::from_millis(50), handle.stopped()).await;
        assert!(pending.is_err());

        shutdown.trigger(StopReason::Requested);
        assert_eq!(handle.stopped().await, StopReason::Requested);
    }

    #[tokio::test]
    async fn test_dropped_coordinator_releases_handles() {
        let shutdown = Shutdown::new();
        let mut handle = shutdown.handle();
        drop(shutdown);

        assert_eq!(handle.stopped().await, StopReason::Requested);
    }
}
