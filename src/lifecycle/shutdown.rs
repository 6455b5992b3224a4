//! Signal handling for graceful shutdown and foreground resync

use std::io;

use tokio::signal::unix::{signal, Signal, SignalKind};
use tracing::debug;

/// Handles shutdown signals (SIGTERM, SIGINT)
pub struct ShutdownSignal;

impl ShutdownSignal {
    pub fn new() -> Self {
        Self
    }

    /// Wait for a shutdown signal
    pub async fn wait(&self) -> io::Result<()> {
        let mut sigterm = signal(SignalKind::terminate())?;
        let mut sigint = signal(SignalKind::interrupt())?;

        tokio::select! {
            _ = sigterm.recv() => {
                debug!("received SIGTERM");
            }
            _ = sigint.recv() => {
                debug!("received SIGINT");
            }
        }
        Ok(())
    }
}

impl Default for ShutdownSignal {
    fn default() -> Self {
        Self::new()
    }
}

/// Yields each time the process is resumed (SIGCONT), i.e. returns to the foreground
pub struct ForegroundSignal {
    sigcont: Signal,
}

impl ForegroundSignal {
    pub fn new() -> io::Result<Self> {
        Ok(Self {
            sigcont: signal(SignalKind::from_raw(SIGCONT))?,
        })
    }

    /// Wait for the next resume; `None` once the signal stream ends
    pub async fn recv(&mut self) -> Option<()> {
        let resumed = self.sigcont.recv().await;
        if resumed.is_some() {
            debug!("received SIGCONT");
        }
        resumed
    }
}

// tokio has no named kind for SIGCONT
#[cfg(target_os = "linux")]
const SIGCONT: i32 = 18;
#[cfg(not(target_os = "linux"))]
const SIGCONT: i32 = 19;
