//! Background entrypoints for tests and embedding.
//!
//! [`run_in_background`] spawns a function that blocks in a run (typically
//! a program's `main` logic) and hands back a [`CancelHandle`]. Cancelling
//! broadcasts on the registry until a broadcast lands while the entrypoint's
//! own run is registered, so a cancel issued before the entrypoint reached its
//! run is not lost. After that the handle only waits for the entrypoint, and
//! runs started later on the same registry are left alone.
//!
//! Each broadcast is registry-wide: other runs blocked on the registry at that
//! moment are released too. A run is counted as the entrypoint's own only when
//! it executes in the entrypoint's task; runs in tasks the entrypoint spawns
//! are not seen, and for those the broadcast repeats until the entrypoint
//! returns.

use std::future::Future;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::Notify;
use tokio::task::{JoinError, JoinHandle};
use tracing::{debug, info_span, Instrument};

use crate::cancel::CancelRegistry;
use crate::error::RunError;
use crate::runner::run_loop::DEFAULT_CANCEL_RETRY;
use crate::util::RunId;

tokio::task_local! {
    static ENTRYPOINT: Arc<EntrypointRuns>;
}

/// Runs of one background entrypoint that currently hold a waiter.
#[derive(Debug)]
struct EntrypointRuns {
    registry: Arc<CancelRegistry>,
    active: AtomicUsize,
}

impl EntrypointRuns {
    fn is_blocked(&self) -> bool {
        self.active.load(Ordering::SeqCst) > 0
    }
}

/// Marks a run as registered on behalf of the surrounding background
/// entrypoint until dropped. No-op outside one, or on another registry.
#[derive(Debug)]
pub(crate) struct ActiveRun(Option<Arc<EntrypointRuns>>);

impl ActiveRun {
    pub(crate) fn enter(registry: &Arc<CancelRegistry>) -> Self {
        let runs = ENTRYPOINT
            .try_with(Arc::clone)
            .ok()
            .filter(|runs| Arc::ptr_eq(&runs.registry, registry));
        if let Some(runs) = &runs {
            runs.active.fetch_add(1, Ordering::SeqCst);
        }
        Self(runs)
    }
}

impl Drop for ActiveRun {
    fn drop(&mut self) {
        if let Some(runs) = &self.0 {
            runs.active.fetch_sub(1, Ordering::SeqCst);
        }
    }
}

/// Handle to a background entrypoint.
///
/// Dropping the handle detaches the entrypoint without cancelling it.
#[derive(Debug)]
pub struct CancelHandle<T> {
    trigger: Arc<Notify>,
    task: JoinHandle<Result<T, JoinError>>,
}

impl<T> CancelHandle<T> {
    /// Request termination of the entrypoint's run.
    ///
    /// Calling this more than once has no further effect.
    pub fn cancel(&self) {
        self.trigger.notify_one();
    }

    /// Wait for the entrypoint to return, without cancelling it.
    pub async fn wait(self) -> Result<T, RunError> {
        Ok(self.task.await??)
    }

    /// Cancel, then wait for the entrypoint to return.
    pub async fn cancel_and_wait(self) -> Result<T, RunError> {
        self.cancel();
        self.wait().await
    }

    /// True once the entrypoint has returned.
    pub fn is_finished(&self) -> bool {
        self.task.is_finished()
    }
}

/// Spawn `entrypoint` on the current tokio runtime with the default cancel
/// retry interval.
///
/// The entrypoint is expected to block in [`Runner::run`](crate::Runner::run)
/// on a runner sharing `registry`. Must be called from within a tokio
/// runtime.
pub fn run_in_background<F, Fut, T>(registry: Arc<CancelRegistry>, entrypoint: F) -> CancelHandle<T>
where
    F: FnOnce() -> Fut + Send + 'static,
    Fut: Future<Output = T> + Send + 'static,
    T: Send + 'static,
{
    spawn(registry, DEFAULT_CANCEL_RETRY, entrypoint)
}

pub(crate) fn spawn<F, Fut, T>(
    registry: Arc<CancelRegistry>,
    retry: Duration,
    entrypoint: F,
) -> CancelHandle<T>
where
    F: FnOnce() -> Fut + Send + 'static,
    Fut: Future<Output = T> + Send + 'static,
    T: Send + 'static,
{
    let trigger = Arc::new(Notify::new());
    let requested = Arc::clone(&trigger);
    let span = info_span!("background", id = %RunId::short());

    let runs = Arc::new(EntrypointRuns {
        registry: Arc::clone(&registry),
        active: AtomicUsize::new(0),
    });

    let task = tokio::spawn(
        async move {
            let mut main = tokio::spawn(
                ENTRYPOINT
                    .scope(Arc::clone(&runs), async move { entrypoint().await })
                    .in_current_span(),
            );

            tokio::select! {
                res = &mut main => return res,
                _ = requested.notified() => {}
            }
            debug!("cancel requested");

            loop {
                // Read before broadcasting: a run counted here is in the
                // registry or already past it, so this broadcast ends it.
                let own_run = runs.is_blocked();
                let released = registry.cancel_all();
                if released > 0 {
                    debug!(released, "cancel broadcast");
                }
                if own_run {
                    break;
                }
                tokio::select! {
                    res = &mut main => return res,
                    _ = tokio::time::sleep(retry) => {}
                }
            }

            main.await
        }
        .instrument(span),
    );

    CancelHandle { trigger, task }
}
