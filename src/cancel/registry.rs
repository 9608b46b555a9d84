//! Registry of waiters released by a broadcast cancel.
//!
//! Each blocked run owns one [`Waiter`]. The registry keeps the sending half
//! of the waiter's oneshot channel; releasing a waiter removes the sender
//! from the map and consumes it in the same critical section, so a waiter
//! can never be released twice or after it was deregistered.

use parking_lot::Mutex;
use std::collections::HashMap;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::sync::oneshot;
use tracing::debug;

/// Key of a registered waiter, unique within its registry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct WaiterId(u64);

impl WaiterId {
    /// Raw counter value.
    pub fn as_u64(&self) -> u64 {
        self.0
    }
}

impl fmt::Display for WaiterId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "waiter-{}", self.0)
    }
}

/// Process-wide set of waiters awaiting a broadcast cancel.
///
/// There is no global instance: create one with [`CancelRegistry::new`] at
/// start-up and hand clones of the `Arc` to every runner that should be
/// reachable by [`cancel_all`](CancelRegistry::cancel_all).
#[derive(Debug, Default)]
pub struct CancelRegistry {
    waiters: Mutex<HashMap<WaiterId, oneshot::Sender<()>>>,
    next_id: AtomicU64,
}

impl CancelRegistry {
    /// Create an empty registry.
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Register a new waiter.
    ///
    /// The waiter is removed again when it is dropped, when
    /// [`Waiter::deregister`] is called, or when a broadcast releases it.
    pub fn register(self: &Arc<Self>) -> Waiter {
        let id = WaiterId(self.next_id.fetch_add(1, Ordering::Relaxed));
        let (tx, rx) = oneshot::channel();

        self.waiters.lock().insert(id, tx);
        debug!(waiter = %id, "waiter registered");

        Waiter {
            id,
            rx,
            released: false,
            detached: false,
            registry: Arc::clone(self),
        }
    }

    /// Remove a waiter without releasing it.
    ///
    /// Returns `false` if the waiter was already removed or released.
    pub fn deregister(&self, id: WaiterId) -> bool {
        self.waiters.lock().remove(&id).is_some()
    }

    /// Release every registered waiter and leave the registry empty.
    ///
    /// Returns the number of waiters released. With nothing registered this
    /// is a no-op returning 0.
    pub fn cancel_all(&self) -> usize {
        let mut waiters = self.waiters.lock();
        let released = waiters.len();
        for (_, tx) in waiters.drain() {
            // The receiving waiter may be mid-drop; nothing to wake then.
            let _ = tx.send(());
        }
        drop(waiters);

        if released > 0 {
            debug!(released, "broadcast cancel released waiters");
        }
        released
    }

    /// Number of currently registered waiters.
    pub fn len(&self) -> usize {
        self.waiters.lock().len()
    }

    /// True if no waiter is registered.
    pub fn is_empty(&self) -> bool {
        self.waiters.lock().is_empty()
    }
}

/// One-shot handle owned by a single blocked run.
#[derive(Debug)]
pub struct Waiter {
    id: WaiterId,
    rx: oneshot::Receiver<()>,
    released: bool,
    // Sender dropped without a broadcast
    detached: bool,
    registry: Arc<CancelRegistry>,
}

impl Waiter {
    /// Key of this waiter in its registry.
    pub fn id(&self) -> WaiterId {
        self.id
    }

    /// Resolve once the waiter is released by a broadcast.
    ///
    /// A waiter removed from the registry by someone else can no longer be
    /// released, so the future stays pending. Cancel safe.
    pub async fn cancelled(&mut self) {
        if self.released {
            return;
        }
        if !self.detached {
            match (&mut self.rx).await {
                Ok(()) => {
                    self.released = true;
                    return;
                }
                Err(_) => self.detached = true,
            }
        }
        std::future::pending::<()>().await
    }

    /// Non-blocking check for [`cancelled`](Waiter::cancelled).
    pub fn is_cancelled(&mut self) -> bool {
        if !self.released && !self.detached {
            match self.rx.try_recv() {
                Ok(()) => self.released = true,
                Err(oneshot::error::TryRecvError::Closed) => self.detached = true,
                Err(oneshot::error::TryRecvError::Empty) => {}
            }
        }
        self.released
    }

    /// Remove this waiter from its registry.
    ///
    /// Returns `false` if a broadcast had already released it.
    pub fn deregister(self) -> bool {
        self.registry.deregister(self.id)
    }
}

impl Drop for Waiter {
    fn drop(&mut self) {
        self.registry.deregister(self.id);
    }
}
