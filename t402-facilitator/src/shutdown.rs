//! OS signal handling for graceful shutdown.

#[cfg(unix)]
use tokio::signal::unix::{SignalKind, signal};
use tokio_util::sync::CancellationToken;
use tokio_util::task::TaskTracker;

/// Cancels a token on SIGTERM or SIGINT (Ctrl-C elsewhere).
#[allow(missing_debug_implementations)]
pub struct SigDown {
    tracker: TaskTracker,
    token: CancellationToken,
}

impl SigDown {
    /// Registers the signal handlers on the current runtime.
    ///
    /// # Errors
    ///
    /// Returns an I/O error if a handler cannot be registered.
    #[allow(clippy::unnecessary_wraps)]
    pub fn try_new() -> Result<Self, std::io::Error> {
        let token = CancellationToken::new();
        let tracker = TaskTracker::new();
        let trigger = token.clone();

        #[cfg(unix)]
        {
            let mut sigterm = signal(SignalKind::terminate())?;
            let mut sigint = signal(SignalKind::interrupt())?;
            tracker.spawn(async move {
                tokio::select! {
                    _ = sigterm.recv() => tracing::info!("received SIGTERM"),
                    _ = sigint.recv() => tracing::info!("received SIGINT"),
                }
                trigger.cancel();
            });
        }

        #[cfg(not(unix))]
        tracker.spawn(async move {
            let _ = tokio::signal::ctrl_c().await;
            tracing::info!("received Ctrl-C");
            trigger.cancel();
        });

        tracker.close();
        Ok(Self { tracker, token })
    }

    /// Token cancelled once a shutdown signal arrives.
    #[must_use]
    pub fn cancellation_token(&self) -> CancellationToken {
        self.token.clone()
    }

    /// Waits for the signal and for the handler task to finish.
    pub async fn recv(&self) {
        self.token.cancelled().await;
        self.tracker.wait().await;
    }
}
