//! Graceful shutdown coordination.
//!
//! Streams register with the [`ShutdownController`] while open and watch its
//! signal. [`ShutdownController::shutdown`] flips the signal, refuses new
//! streams, and waits up to a grace period for the open ones to finish.

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{watch, Notify};
use tokio::time::timeout;
use tracing::{info, warn};

/// Coordinates shutdown between the server and its streams.
#[derive(Debug, Clone)]
pub struct ShutdownController {
    inner: Arc<ShutdownInner>,
}

#[derive(Debug)]
struct ShutdownInner {
    initiated: AtomicBool,
    tx: watch::Sender<bool>,
    active: AtomicUsize,
    drained: Notify,
}

impl Default for ShutdownController {
    fn default() -> Self {
        Self::new()
    }
}

impl ShutdownController {
    /// Create a controller in the running state.
    pub fn new() -> Self {
        let (tx, _) = watch::channel(false);
        Self {
            inner: Arc::new(ShutdownInner {
                initiated: AtomicBool::new(false),
                tx,
                active: AtomicUsize::new(0),
                drained: Notify::new(),
            }),
        }
    }

    /// Whether shutdown has begun.
    pub fn is_shutdown(&self) -> bool {
        self.inner.initiated.load(Ordering::SeqCst)
    }

    /// Future-producing handle that resolves once shutdown begins.
    pub fn signal(&self) -> ShutdownSignal {
        ShutdownSignal {
            rx: self.inner.tx.subscribe(),
        }
    }

    /// Begin shutdown and wait for registered operations to finish.
    ///
    /// Returns `true` if everything drained within `grace_period`. A second
    /// call returns `true` immediately.
    pub async fn shutdown(&self, grace_period: Duration) -> bool {
        if self
            .inner
            .initiated
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .is_err()
        {
            return true;
        }

        info!(grace_period = ?grace_period, active = self.active_operations(), "initiating graceful shutdown");
        self.inner.tx.send_replace(true);

        match timeout(grace_period, self.wait_for_drain()).await {
            Ok(()) => {
                info!("graceful shutdown completed");
                true
            }
            Err(_) => {
                warn!(
                    remaining = self.active_operations(),
                    "graceful shutdown timed out"
                );
                false
            }
        }
    }

    async fn wait_for_drain(&self) {
        loop {
            let drained = self.inner.drained.notified();
            if self.active_operations() == 0 {
                return;
            }
            drained.await;
        }
    }

    /// Register an open operation; it counts until the guard drops.
    pub fn register_operation(&self) -> OperationGuard {
        self.inner.active.fetch_add(1, Ordering::SeqCst);
        OperationGuard {
            controller: self.clone(),
        }
    }

    /// Number of open operations.
    pub fn active_operations(&self) -> usize {
        self.inner.active.load(Ordering::SeqCst)
    }
}

/// Keeps an operation registered with its [`ShutdownController`].
#[derive(Debug)]
pub struct OperationGuard {
    controller: ShutdownController,
}

impl Drop for OperationGuard {
    fn drop(&mut self) {
        if self.controller.inner.active.fetch_sub(1, Ordering::SeqCst) == 1 {
            self.controller.inner.drained.notify_waiters();
        }
    }
}

/// Resolves when shutdown begins.
#[derive(Debug, Clone)]
pub struct ShutdownSignal {
    rx: watch::Receiver<bool>,
}

impl ShutdownSignal {
    /// Wait for the signal. Cancel-safe.
    pub async fn wait(&mut self) {
        // A closed channel means the controller is gone; treat as shutdown.
        let _ = self.rx.wait_for(|initiated| *initiated).await;
    }
}

/// Wait for SIGTERM or SIGINT (Ctrl+C elsewhere).
pub async fn wait_for_signal() {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{signal, SignalKind};

        match (signal(SignalKind::terminate()), signal(SignalKind::interrupt())) {
            (Ok(mut sigterm), Ok(mut sigint)) => {
                tokio::select! {
                    _ = sigterm.recv() => info!("received SIGTERM"),
                    _ = sigint.recv() => info!("received SIGINT"),
                }
            }
            _ => {
                warn!("could not install signal handlers, falling back to ctrl-c");
                ctrl_c().await;
            }
        }
    }

    #[cfg(not(unix))]
    ctrl_c().await;
}

async fn ctrl_c() {
    match tokio::signal::ctrl_c().await {
        Ok(()) => info!("received Ctrl+C"),
        Err(e) => {
            warn!(error = %e, "ctrl-c handler failed, waiting forever");
            std::future::pending::<()>().await;
        }
    }
}
