// Process shutdown: turn OS termination signals into a cancelled token.

use anyhow::{Context, Result};
use tokio_util::sync::CancellationToken;
use tracing::{error, info};

/// Registered termination handlers. Once installed, the signals no longer
/// take their default action on the process.
pub struct Signals {
    #[cfg(unix)]
    term: tokio::signal::unix::Signal,
    #[cfg(unix)]
    int: tokio::signal::unix::Signal,
    #[cfg(windows)]
    ctrl_c: tokio::signal::windows::CtrlC,
}

impl Signals {
    /// Register `SIGTERM` and `SIGINT` handlers on UNIX systems.
    #[cfg(unix)]
    pub fn install() -> Result<Self> {
        use tokio::signal::unix::{signal, SignalKind};

        let term = signal(SignalKind::terminate()).context("Failed to register SIGTERM handler")?;
        let int = signal(SignalKind::interrupt()).context("Failed to register SIGINT handler")?;
        Ok(Self { term, int })
    }

    /// Register the `ctrl+c` handler on Windows systems.
    #[cfg(windows)]
    pub fn install() -> Result<Self> {
        let ctrl_c = tokio::signal::windows::ctrl_c().context("Failed to listen for ctrl+c")?;
        Ok(Self { ctrl_c })
    }

    /// Wait for the first termination signal.
    #[cfg(unix)]
    pub async fn recv(&mut self) {
        tokio::select! {
            _ = self.term.recv() => info!("Received SIGTERM"),
            _ = self.int.recv() => info!("Received SIGINT"),
        }
    }

    #[cfg(windows)]
    pub async fn recv(&mut self) {
        self.ctrl_c.recv().await;
        info!("Received SIGINT");
    }
}

/// Install signal handlers now, then cancel `token` from a background task
/// when a termination signal arrives.
///
/// If the handlers cannot be installed the worker keeps running; it can
/// still be stopped by the container runtime's hard kill.
pub fn cancel_on_signal(token: CancellationToken) {
    let mut signals = match Signals::install() {
        Ok(signals) => signals,
        Err(e) => {
            error!(error = %e, "Signal handling unavailable");
            return;
        }
    };

    tokio::spawn(async move {
        signals.recv().await;
        info!("Worker shutting down...");
        token.cancel();
    });
}
