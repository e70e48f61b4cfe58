//! Graceful shutdown plumbing. The embedder (or the server's drop path)
//! triggers a [`Notifier`]; every session task holds a [`Listener`] and winds
//! itself down when it fires. The library installs no signal handlers; wiring
//! SIGINT/SIGTERM to [`Notifier::notify`] is the binary's decision.

use std::fmt::Debug;
use tokio::sync::{broadcast, mpsc, Mutex, RwLock};

/// Lets the accept loop and all session tasks know that we're shutting down.
#[derive(Debug)]
pub struct Notifier {
    shutdown_tx: RwLock<Option<broadcast::Sender<()>>>,
    shutdown_complete_tx: RwLock<Option<mpsc::Sender<()>>>,
    shutdown_complete_rx: Mutex<mpsc::Receiver<()>>,
}

impl Notifier {
    /// Creates a new shutdown notifier.
    pub fn new() -> Notifier {
        let (shutdown_tx, _) = broadcast::channel(1);
        let (shutdown_complete_tx, shutdown_complete_rx) = mpsc::channel(1);
        Notifier {
            shutdown_tx: RwLock::new(Some(shutdown_tx)),
            shutdown_complete_tx: RwLock::new(Some(shutdown_complete_tx)),
            shutdown_complete_rx: Mutex::new(shutdown_complete_rx),
        }
    }

    /// Notifies all listeners that shutdown is commencing. Listeners signal
    /// that they are done by simply dropping their [`Listener`].
    pub async fn notify(&self) {
        // Dropping the broadcast sender wakes every subscriber.
        drop(self.shutdown_tx.write().await.take());
        // Dropping the final mpsc sender lets linger() complete once all
        // listener clones are gone too.
        drop(self.shutdown_complete_tx.write().await.take())
    }

    /// Waits until every task holding a [`Listener`] has finished.
    pub async fn linger(&self) {
        // All remaining mpsc senders live inside Listeners held by session
        // tasks. recv() returns None when the last of them drops.
        let _ = self.shutdown_complete_rx.lock().await.recv().await;
    }

    pub(crate) async fn subscribe(&self) -> Listener {
        let sender_opt = self.shutdown_tx.read().await;
        let complete_sender_opt = self.shutdown_complete_tx.read().await;
        Listener {
            shutdown: sender_opt.is_none(),
            shutdown_rx: sender_opt.as_ref().map(|tx| tx.subscribe()),
            shutdown_complete_tx: complete_sender_opt.clone(),
        }
    }
}

impl Default for Notifier {
    fn default() -> Self {
        Notifier::new()
    }
}

// Listens for the shutdown notification. Keeping the instance alive tells
// the Notifier we're still busy; dropping it signals completion.
#[derive(Debug)]
pub(crate) struct Listener {
    shutdown: bool,
    shutdown_rx: Option<broadcast::Receiver<()>>,
    #[allow(dead_code)]
    shutdown_complete_tx: Option<mpsc::Sender<()>>,
}

impl Listener {
    fn is_shutdown(&self) -> bool {
        self.shutdown
    }

    /// Receive the shutdown notice, waiting if necessary.
    pub(crate) async fn listen(&mut self) {
        if self.is_shutdown() {
            return;
        }
        // Cannot receive a "lag error" as only one value is ever sent.
        if let Some(rx) = self.shutdown_rx.as_mut() {
            let _ = rx.recv().await;
        }
        self.shutdown = true;
    }
}
