//! Termination signals (SIGINT, SIGTERM, SIGHUP) turned into an orderly quit.
//!
//! Once a [`Shutdown`] is listening the signals no longer kill the process,
//! so callers must check it and run their cleanup before returning.

use std::io;

use tokio::signal::unix::{signal, SignalKind};
use tokio::sync::watch;

pub struct Shutdown {
    requested: watch::Receiver<bool>,
}

impl Shutdown {
    /// Install the signal handlers and start waiting for the first signal
    pub fn listen() -> io::Result<Self> {
        let mut interrupt = signal(SignalKind::interrupt())?;
        let mut terminate = signal(SignalKind::terminate())?;
        let mut hangup = signal(SignalKind::hangup())?;
        let (tx, rx) = watch::channel(false);

        tokio::spawn(async move {
            let name = tokio::select! {
                _ = interrupt.recv() => "SIGINT",
                _ = terminate.recv() => "SIGTERM",
                _ = hangup.recv() => "SIGHUP",
            };
            tracing::info!("Received {}, shutting down", name);
            let _ = tx.send(true);
        });

        Ok(Self { requested: rx })
    }

    pub fn is_requested(&self) -> bool {
        *self.requested.borrow()
    }

    /// Resolve once a signal has arrived
    pub async fn requested(&mut self) {
        if self.requested.wait_for(|requested| *requested).await.is_err() {
            // Listener gone without a signal
            std::future::pending::<()>().await;
        }
    }
}
