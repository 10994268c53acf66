use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use tokio::sync::broadcast::error::RecvError;
use tokio::sync::broadcast::{Receiver, Sender};
use tokio::sync::Mutex;

/// Signals engines, workers and scenario loops that they should stop.
///
/// The signal is latched: listeners created after [ShutdownHandle::shutdown] still observe it.
#[derive(Debug, Clone)]
pub struct ShutdownHandle {
    sender: Sender<()>,
    signalled: Arc<AtomicBool>,
}

impl Default for ShutdownHandle {
    fn default() -> Self {
        Self::new()
    }
}

impl ShutdownHandle {
    pub fn new() -> Self {
        Self {
            sender: tokio::sync::broadcast::channel(1).0,
            signalled: Arc::new(AtomicBool::new(false)),
        }
    }

    pub fn shutdown(&self) {
        if self.signalled.swap(true, Ordering::AcqRel) {
            return;
        }

        if let Err(e) = self.sender.send(()) {
            // Nobody is waiting asynchronously; the latched flag is still visible to pollers.
            log::trace!("No async shutdown listeners: {e:?}");
        }
    }

    pub fn is_shutdown(&self) -> bool {
        self.signalled.load(Ordering::Acquire)
    }

    pub fn new_listener(&self) -> DelegatedShutdownListener {
        DelegatedShutdownListener::new(self.sender.subscribe(), self.signalled.clone())
    }
}

#[derive(Clone, Debug)]
pub struct DelegatedShutdownListener {
    receiver: Arc<Mutex<Receiver<()>>>,
    signalled: Arc<AtomicBool>,
}

impl DelegatedShutdownListener {
    pub(crate) fn new(receiver: Receiver<()>, signalled: Arc<AtomicBool>) -> Self {
        Self {
            receiver: Arc::new(Mutex::new(receiver)),
            signalled,
        }
    }

    /// Point in time check of the shutdown signal. Cheap enough to call between every task.
    pub fn should_shutdown(&self) -> bool {
        self.signalled.load(Ordering::Acquire)
    }

    /// Wait until the shutdown signal is sent. Safe to race against other futures with
    /// `tokio::select!` so that the signal can cancel work in progress.
    pub async fn wait_for_shutdown(&mut self) {
        if self.should_shutdown() {
            return;
        }

        let mut receiver = self.receiver.lock().await;
        match receiver.recv().await {
            Ok(()) | Err(RecvError::Lagged(_)) => {}
            Err(RecvError::Closed) if self.should_shutdown() => {}
            // Every handle is gone without signalling, so the signal can never arrive.
            Err(RecvError::Closed) => std::future::pending().await,
        }
    }
}

#[derive(derive_more::Error, derive_more::Display, Debug)]
pub struct ShutdownSignalError {
    msg: String,
}

impl Default for ShutdownSignalError {
    fn default() -> Self {
        Self {
            msg: "Execution cancelled by shutdown signal".to_string(),
        }
    }
}
