//! Shutdown signalling.
//!
//! A watch channel broadcast once, observed by every worker and by passes
//! in flight. A pass checks the signal between cluster calls and aborts
//! without issuing further mutations; anything already applied stays
//! applied.

use tokio::sync::watch;

/// Owning side of the shutdown signal.
pub struct Shutdown {
    tx: watch::Sender<bool>,
}

impl Shutdown {
    /// Create a new, un-signalled shutdown handle.
    pub fn new() -> Self {
        let (tx, _rx) = watch::channel(false);
        Self { tx }
    }

    /// Signal shutdown to every subscriber.
    pub fn signal(&self) {
        let _ = self.tx.send(true);
    }

    /// Create a new subscriber.
    pub fn subscribe(&self) -> ShutdownSignal {
        ShutdownSignal {
            rx: self.tx.subscribe(),
        }
    }
}

impl Default for Shutdown {
    fn default() -> Self {
        Self::new()
    }
}

/// Observer side of the shutdown signal.
#[derive(Clone)]
pub struct ShutdownSignal {
    rx: watch::Receiver<bool>,
}

impl ShutdownSignal {
    /// Whether shutdown has been signalled.
    pub fn is_shutdown(&self) -> bool {
        *self.rx.borrow()
    }

    /// Wait until shutdown is signalled.
    ///
    /// Also resolves if the owning [`Shutdown`] handle is dropped, which
    /// counts as shutdown.
    pub async fn wait(&mut self) {
        let _ = self.rx.wait_for(|stopped| *stopped).await;
    }
}
