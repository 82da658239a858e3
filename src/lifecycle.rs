//! Process lifecycle: stop broadcast, signal handling, and orderly shutdown.
//!
//! A single [`Shutdown`] owns the stop flag. Every monitor task and the supervisor hold a
//! [`ShutdownListener`] and observe the flag at each of their suspension points, so a
//! task blocked waiting for its next request wakes up as soon as stop is triggered.

use std::sync::Arc;

use tokio::signal::unix::{SignalKind, signal};
use tokio::sync::watch;

use crate::error::ResultOkLogExt;
use crate::monitor::Supervisor;

/// Broadcasts the stop condition to every listener.
#[derive(Debug, Clone)]
pub struct Shutdown {
    tx: Arc<watch::Sender<bool>>,
}

impl Default for Shutdown {
    fn default() -> Self {
        Self::new()
    }
}

impl Shutdown {
    pub fn new() -> Self {
        let (tx, _rx) = watch::channel(false);
        Self { tx: Arc::new(tx) }
    }

    pub fn listener(&self) -> ShutdownListener {
        ShutdownListener {
            rx: self.tx.subscribe(),
        }
    }

    /// Sets the stop flag. Idempotent.
    pub fn trigger(&self) {
        self.tx.send_replace(true);
    }

    pub fn is_triggered(&self) -> bool {
        *self.tx.borrow()
    }
}

/// Receiving side of [`Shutdown`].
#[derive(Debug, Clone)]
pub struct ShutdownListener {
    rx: watch::Receiver<bool>,
}

impl ShutdownListener {
    /// Completes once stop has been triggered, or once the [`Shutdown`] is gone.
    ///
    /// Cancel safe.
    pub async fn triggered(&mut self) {
        let _ = self.rx.wait_for(|stopped| *stopped).await;
    }

    pub fn is_triggered(&self) -> bool {
        *self.rx.borrow()
    }
}

/// Triggers `shutdown` on the first SIGINT, SIGTERM or SIGQUIT.
///
/// # Errors
///
/// Returns an error if a signal handler cannot be installed.
pub fn spawn_signal_handler(shutdown: Shutdown) -> std::io::Result<tokio::task::JoinHandle<()>> {
    let mut sigint = signal(SignalKind::interrupt())?;
    let mut sigterm = signal(SignalKind::terminate())?;
    let mut sigquit = signal(SignalKind::quit())?;

    Ok(tokio::spawn(async move {
        let name = tokio::select! {
            _ = sigint.recv() => "SIGINT",
            _ = sigterm.recv() => "SIGTERM",
            _ = sigquit.recv() => "SIGQUIT",
        };
        log::info!("Received {}, stopping monitors", name);
        shutdown.trigger();
    }))
}

/// Drives `supervisor` until `shutdown` is triggered, then stops and joins every
/// monitor task.
///
/// Returns the number of rows emitted.
///
/// # Errors
///
/// Returns an error if writing to the output fails. Monitors are still stopped and
/// joined in that case.
pub async fn run_until_stopped<W>(
    mut supervisor: Supervisor<W>,
    shutdown: &Shutdown,
) -> std::io::Result<u64>
where
    W: std::io::Write,
{
    let result = supervisor.run(shutdown.listener()).await;

    shutdown.trigger();
    let monitors = supervisor.into_monitors();
    log::debug!("Waiting for {} monitors to finish", monitors.len());
    for monitor in monitors {
        monitor.join().await.ok_log();
    }
    log::info!("All monitors stopped");

    result
}
