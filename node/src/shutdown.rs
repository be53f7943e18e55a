//! Graceful shutdown controller for the vote node.
//!
//! Listens for SIGINT/SIGTERM and signals every background task through a
//! `tokio::sync::watch` channel. A receiver created after the signal still
//! observes it.

use tokio::signal;
use tokio::sync::watch;

/// Coordinates graceful shutdown across the node's background tasks.
///
/// Tasks call [`ShutdownController::subscribe`] and `select!` on
/// [`ShutdownSignal::recv`] alongside their main loop.
pub struct ShutdownController {
    tx: watch::Sender<bool>,
}

/// Receiving half handed to a background task.
#[derive(Clone)]
pub struct ShutdownSignal {
    rx: watch::Receiver<bool>,
}

impl ShutdownSignal {
    /// Resolve once shutdown has been requested (immediately if it already was).
    pub async fn recv(&mut self) {
        // An error means the controller is gone, which is also a shutdown.
        let _ = self.rx.wait_for(|stop| *stop).await;
    }

    pub fn is_shutdown(&self) -> bool {
        *self.rx.borrow()
    }
}

impl ShutdownController {
    pub fn new() -> Self {
        let (tx, _) = watch::channel(false);
        Self { tx }
    }

    pub fn subscribe(&self) -> ShutdownSignal {
        ShutdownSignal {
            rx: self.tx.subscribe(),
        }
    }

    /// Trigger shutdown programmatically.
    pub fn shutdown(&self) {
        self.tx.send_replace(true);
    }

    pub fn is_shutdown(&self) -> bool {
        *self.tx.borrow()
    }

    /// Wait for SIGTERM or SIGINT, then trigger shutdown.
    pub async fn wait_for_signal(&self) -> std::io::Result<()> {
        #[cfg(unix)]
        {
            let mut terminate = signal::unix::signal(signal::unix::SignalKind::terminate())?;
            tokio::select! {
                res = signal::ctrl_c() => {
                    res?;
                    tracing::info!("received SIGINT, shutting down");
                }
                _ = terminate.recv() => { tracing::info!("received SIGTERM, shutting down"); }
            }
        }

        #[cfg(not(unix))]
        {
            signal::ctrl_c().await?;
            tracing::info!("received SIGINT, shutting down");
        }

        self.shutdown();
        Ok(())
    }
}

impl Default for ShutdownController {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[tokio::test]
    async fn programmatic_shutdown_notifies_subscribers() {
        let controller = ShutdownController::new();
        let mut rx = controller.subscribe();
        controller.shutdown();
        tokio::time::timeout(Duration::from_secs(1), rx.recv())
            .await
            .expect("signal should arrive");
        assert!(rx.is_shutdown());
    }

    #[tokio::test]
    async fn late_subscriber_sees_shutdown() {
        let controller = ShutdownController::new();
        controller.shutdown();
        let mut rx = controller.subscribe();
        tokio::time::timeout(Duration::from_secs(1), rx.recv())
            .await
            .expect("late subscriber should not hang");
    }

    #[tokio::test]
    async fn pending_until_shutdown() {
        let controller = ShutdownController::new();
        let mut rx = controller.subscribe();
        assert!(!controller.is_shutdown());
        assert!(tokio::time::timeout(Duration::from_millis(20), rx.recv())
            .await
            .is_err());
    }
}
