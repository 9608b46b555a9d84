//! Running workers until termination.

mod background;
mod run_loop;
mod worker;

pub use background::{run_in_background, CancelHandle};
pub use run_loop::{RunOutcome, Runner, Termination, WorkerFault, DEFAULT_CANCEL_RETRY};
pub use worker::{shutdown_fn, BoxWorker, ShutdownFn, Worker, WorkerFn};
