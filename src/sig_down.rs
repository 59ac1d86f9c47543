//! Graceful shutdown on SIGTERM/SIGINT.

use tokio::signal::unix::{signal, SignalKind};
use tokio_util::sync::CancellationToken;

/// Listens for termination signals and fans out a cancellation token that
/// background tasks select on.
pub struct SigDown {
    token: CancellationToken,
}

impl SigDown {
    pub fn try_new() -> std::io::Result<Self> {
        let token = CancellationToken::new();
        let mut sigterm = signal(SignalKind::terminate())?;
        let mut sigint = signal(SignalKind::interrupt())?;

        let trigger = token.clone();
        tokio::spawn(async move {
            tokio::select! {
                _ = sigterm.recv() => tracing::info!("received SIGTERM"),
                _ = sigint.recv() => tracing::info!("received SIGINT"),
            }
            trigger.cancel();
        });

        Ok(Self { token })
    }

    /// A token cancelled when a termination signal arrives.
    pub fn cancellation_token(&self) -> CancellationToken {
        self.token.clone()
    }
}
