//! Worker callback contracts.

use std::fmt;

/// Gracefully stops whatever a worker's start callback launched.
pub type ShutdownFn = Box<dyn FnOnce() + Send>;

/// Something a run starts, and later shuts down.
///
/// `start` must return promptly: long-running work belongs in tasks it
/// spawns, and the returned [`ShutdownFn`] stops them. A start callback that
/// never returns blocks the run forever.
///
/// Any `FnOnce() -> ShutdownFn + Send` closure is a worker. Wrap it in
/// [`WorkerFn`] to give it a name for logs and fault reports.
pub trait Worker: Send {
    /// Launch background work and return the callback that stops it.
    fn start(self: Box<Self>) -> ShutdownFn;

    /// Name used in logs and fault reports.
    fn name(&self) -> &str {
        "worker"
    }
}

impl<F> Worker for F
where
    F: FnOnce() -> ShutdownFn + Send,
{
    fn start(self: Box<Self>) -> ShutdownFn {
        (*self)()
    }
}

/// A named closure worker.
pub struct WorkerFn<F> {
    name: String,
    start: F,
}

impl<F> WorkerFn<F>
where
    F: FnOnce() -> ShutdownFn + Send + 'static,
{
    /// Create a named worker from a start closure.
    pub fn new(name: impl Into<String>, start: F) -> Self {
        Self {
            name: name.into(),
            start,
        }
    }

    /// Create a named worker, boxed and ready to pass to a run.
    pub fn boxed(name: impl Into<String>, start: F) -> BoxWorker {
        Box::new(Self::new(name, start))
    }
}

impl<F> Worker for WorkerFn<F>
where
    F: FnOnce() -> ShutdownFn + Send,
{
    fn start(self: Box<Self>) -> ShutdownFn {
        (self.start)()
    }

    fn name(&self) -> &str {
        &self.name
    }
}

impl<F> fmt::Debug for WorkerFn<F> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WorkerFn").field("name", &self.name).finish()
    }
}

/// Boxed worker as accepted by a run.
pub type BoxWorker = Box<dyn Worker>;

/// Box a shutdown closure.
pub fn shutdown_fn(f: impl FnOnce() + Send + 'static) -> ShutdownFn {
    Box::new(f)
}
