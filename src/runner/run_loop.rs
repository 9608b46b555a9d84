//! Run workers until terminated.
//!
//! ```text
//! subscribe(signals) ─► registry.register() ─► start workers
//!                                                   │
//!                     ┌─────────────────────────────┤
//!                     ▼                             ▼
//!              listener.recv()             waiter.cancelled()
//!                     └──────────────┬──────────────┘
//!                                    ▼
//!                 deregister ─► shutdown callbacks (reverse order)
//! ```
//!
//! Listening starts before the workers do, so a signal or broadcast that
//! arrives while start callbacks run is held and ends the run as soon as
//! they return.

use std::any::Any;
use std::fmt;
use std::future::Future;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, error, info, info_span, warn, Instrument};

use crate::cancel::CancelRegistry;
use crate::config::RunConfig;
use crate::error::RunError;
use crate::runner::background::{self, ActiveRun, CancelHandle};
use crate::runner::worker::{BoxWorker, ShutdownFn};
use crate::signal::{self, Signal};
use crate::util::RunId;

/// Default pause between repeated broadcasts of a background cancel.
pub const DEFAULT_CANCEL_RETRY: Duration = Duration::from_millis(5);

/// What ended a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Termination {
    /// An OS signal from the run's signal set was delivered.
    Signal(Signal),
    /// The registry broadcast a cancel.
    Cancelled,
}

impl fmt::Display for Termination {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Termination::Signal(signal) => write!(f, "signal {signal}"),
            Termination::Cancelled => f.write_str("broadcast cancel"),
        }
    }
}

/// A shutdown callback that panicked.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorkerFault {
    /// Name of the worker.
    pub worker: String,
    /// Panic message.
    pub message: String,
}

/// Result of a completed run.
#[derive(Debug, Clone)]
pub struct RunOutcome {
    /// Id recorded on the run's tracing span.
    pub run_id: RunId,
    /// What ended the run.
    pub termination: Termination,
    /// Shutdown callbacks that panicked. The others still ran.
    pub faults: Vec<WorkerFault>,
}

impl RunOutcome {
    /// True if every shutdown callback completed without panicking.
    pub fn is_clean(&self) -> bool {
        self.faults.is_empty()
    }
}

/// Runs workers until a signal or a broadcast cancel arrives.
#[derive(Debug, Clone)]
pub struct Runner {
    registry: Arc<CancelRegistry>,
    signals: Vec<Signal>,
    cancel_retry: Duration,
}

impl Runner {
    /// Create a runner listening for the default signal set
    /// (`SIGINT`, `SIGTERM`).
    pub fn new(registry: Arc<CancelRegistry>) -> Self {
        Self {
            registry,
            signals: Signal::DEFAULT_SET.to_vec(),
            cancel_retry: DEFAULT_CANCEL_RETRY,
        }
    }

    /// Create a runner from the `run` section of the configuration.
    pub fn from_config(registry: Arc<CancelRegistry>, config: &RunConfig) -> Self {
        Self {
            registry,
            signals: config.signals.clone(),
            cancel_retry: config.cancel_retry_interval,
        }
    }

    /// Replace the signal set used by [`run`](Runner::run).
    pub fn with_signals(mut self, signals: &[Signal]) -> Self {
        self.signals = signals.to_vec();
        self
    }

    /// Set the pause between repeated broadcasts of a background cancel.
    pub fn with_cancel_retry(mut self, interval: Duration) -> Self {
        self.cancel_retry = interval;
        self
    }

    /// The registry this runner's waiters are registered in.
    pub fn registry(&self) -> &Arc<CancelRegistry> {
        &self.registry
    }

    /// Signal set used by [`run`](Runner::run).
    pub fn signals(&self) -> &[Signal] {
        &self.signals
    }

    /// Run `workers` until one of the runner's signals is delivered or the
    /// registry broadcasts a cancel, then call every shutdown callback.
    pub async fn run(
        &self,
        workers: impl IntoIterator<Item = BoxWorker>,
    ) -> Result<RunOutcome, RunError> {
        self.run_with_signals(&self.signals, workers).await
    }

    /// Same as [`run`](Runner::run) with an explicit signal set.
    ///
    /// Returns an error if a signal cannot be registered, or if a start
    /// callback panics (workers started before it are shut down first).
    pub async fn run_with_signals(
        &self,
        signals: &[Signal],
        workers: impl IntoIterator<Item = BoxWorker>,
    ) -> Result<RunOutcome, RunError> {
        let run_id = RunId::new();
        let span = info_span!("run", run = %run_id);
        let workers: Vec<BoxWorker> = workers.into_iter().collect();

        self.run_inner(run_id, signals, workers)
            .instrument(span)
            .await
    }

    async fn run_inner(
        &self,
        run_id: RunId,
        signals: &[Signal],
        workers: Vec<BoxWorker>,
    ) -> Result<RunOutcome, RunError> {
        let mut listener = signal::subscribe(signals)?;
        let mut waiter = self.registry.register();
        let _active = ActiveRun::enter(&self.registry);
        debug!(waiter = %waiter.id(), ?signals, "listening for termination");

        let started = start_workers(workers)?;
        info!(workers = started.len(), "workers started");

        let termination = tokio::select! {
            signal = listener.recv() => Termination::Signal(signal),
            _ = waiter.cancelled() => Termination::Cancelled,
        };
        info!(%termination, "termination requested");

        // Still registered only when the signal won.
        if waiter.deregister() {
            debug!("waiter removed from registry");
        }

        let faults = shutdown_workers(started);
        if faults.is_empty() {
            info!("run finished");
        } else {
            warn!(faults = faults.len(), "run finished with faulted shutdowns");
        }

        Ok(RunOutcome {
            run_id,
            termination,
            faults,
        })
    }

    /// Release every run blocked on this runner's registry.
    ///
    /// Returns the number of runs released.
    pub fn broadcast_cancel(&self) -> usize {
        self.registry.cancel_all()
    }

    /// Spawn `entrypoint` on the tokio runtime and return a handle that
    /// terminates it through this runner's registry.
    ///
    /// See [`run_in_background`](crate::run_in_background).
    pub fn run_in_background<F, Fut, T>(&self, entrypoint: F) -> CancelHandle<T>
    where
        F: FnOnce() -> Fut + Send + 'static,
        Fut: Future<Output = T> + Send + 'static,
        T: Send + 'static,
    {
        background::spawn(Arc::clone(&self.registry), self.cancel_retry, entrypoint)
    }
}

/// Start each worker in order, collecting its shutdown callback.
fn start_workers(workers: Vec<BoxWorker>) -> Result<Vec<(String, ShutdownFn)>, RunError> {
    let mut started = Vec::with_capacity(workers.len());

    for worker in workers {
        let name = worker.name().to_string();
        match catch_unwind(AssertUnwindSafe(|| worker.start())) {
            Ok(shutdown) => {
                debug!(worker = %name, "worker started");
                started.push((name, shutdown));
            }
            Err(panic) => {
                error!(worker = %name, panic = %panic_message(&*panic), "worker panicked while starting");
                let faults = shutdown_workers(started);
                if !faults.is_empty() {
                    warn!(faults = faults.len(), "shutdown after failed start faulted");
                }
                return Err(RunError::WorkerStartPanicked { worker: name });
            }
        }
    }

    Ok(started)
}

/// Run every shutdown callback, last started first, isolating panics.
fn shutdown_workers(started: Vec<(String, ShutdownFn)>) -> Vec<WorkerFault> {
    let mut faults = Vec::new();

    for (name, shutdown) in started.into_iter().rev() {
        match catch_unwind(AssertUnwindSafe(shutdown)) {
            Ok(()) => debug!(worker = %name, "worker shut down"),
            Err(panic) => {
                let message = panic_message(&*panic);
                error!(worker = %name, panic = %message, "shutdown callback panicked");
                faults.push(WorkerFault {
                    worker: name,
                    message,
                });
            }
        }
    }

    faults
}

fn panic_message(panic: &(dyn Any + Send)) -> String {
    if let Some(s) = panic.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = panic.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}
