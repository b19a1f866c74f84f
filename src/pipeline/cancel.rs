//! Interrupt signalling between the CLI and the pipeline

use tokio::sync::watch;

/// Sender side: triggers the interrupt
#[derive(Debug, Clone)]
pub struct InterruptHandle {
    tx: watch::Sender<bool>,
}

impl InterruptHandle {
    /// Request the pipeline to stop at the next suspension point
    pub fn trigger(&self) {
        self.tx.send_replace(true);
    }
}

/// Receiver side, checked by the pipeline
#[derive(Debug, Clone)]
pub struct Interrupt {
    rx: watch::Receiver<bool>,
}

impl Interrupt {
    /// Create a connected handle/interrupt pair
    pub fn new() -> (InterruptHandle, Interrupt) {
        let (tx, rx) = watch::channel(false);
        (InterruptHandle { tx }, Interrupt { rx })
    }

    /// An interrupt that never fires
    pub fn never() -> Interrupt {
        let (_, interrupt) = Self::new();
        interrupt
    }

    /// Whether the interrupt has fired
    pub fn is_triggered(&self) -> bool {
        *self.rx.borrow()
    }

    /// Resolve once the interrupt fires; pends forever if it never can
    pub async fn triggered(&self) {
        let mut rx = self.rx.clone();
        if rx.wait_for(|fired| *fired).await.is_err() {
            std::future::pending::<()>().await;
        }
    }
}

/// Trigger `handle` on Ctrl-C or SIGTERM
///
/// Spawns a background task; must be called inside a Tokio runtime.
pub fn listen_for_signals(handle: InterruptHandle) {
    tokio::spawn(async move {
        let ctrl_c = async {
            if let Err(e) = tokio::signal::ctrl_c().await {
                tracing::warn!(error = %e, "Failed to install Ctrl+C handler");
                std::future::pending::<()>().await;
            }
        };

        #[cfg(unix)]
        let terminate = async {
            match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
                Ok(mut signal) => {
                    signal.recv().await;
                }
                Err(e) => {
                    tracing::warn!(error = %e, "Failed to install SIGTERM handler");
                    std::future::pending::<()>().await;
                }
            }
        };

        #[cfg(not(unix))]
        let terminate = std::future::pending::<()>();

        tokio::select! {
            _ = ctrl_c => tracing::info!("Received Ctrl+C, saving progress"),
            _ = terminate => tracing::info!("Received SIGTERM, saving progress"),
        }
        handle.trigger();
    });
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[tokio::test]
    async fn test_trigger_wakes_waiter() {
        let (handle, interrupt) = Interrupt::new();
        assert!(!interrupt.is_triggered());

        let waiter = interrupt.clone();
        let task = tokio::spawn(async move { waiter.triggered().await });
        handle.trigger();

        tokio::time::timeout(Duration::from_secs(5), task)
            .await
            .unwrap()
            .unwrap();
        assert!(interrupt.is_triggered());
    }

    #[tokio::test]
    async fn test_triggered_resolves_immediately_when_already_fired() {
        let (handle, interrupt) = Interrupt::new();
        handle.trigger();
        tokio::time::timeout(Duration::from_secs(1), interrupt.triggered())
            .await
            .unwrap();
    }

    #[tokio::test(start_paused = true)]
    async fn test_never_stays_pending() {
        let interrupt = Interrupt::never();
        let result = tokio::time::timeout(Duration::from_secs(60), interrupt.triggered()).await;
        assert!(result.is_err());
        assert!(!interrupt.is_triggered());
    }

    #[tokio::test(start_paused = true)]
    async fn test_dropped_handle_never_fires() {
        let (handle, interrupt) = Interrupt::new();
        drop(handle);
        let result = tokio::time::timeout(Duration::from_secs(60), interrupt.triggered()).await;
        assert!(result.is_err());
    }
}
