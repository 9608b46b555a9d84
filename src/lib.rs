//! rununtil - run background workers until told to stop
//!
//! This crate provides:
//! - A [`Runner`] that starts workers, waits for `SIGINT`/`SIGTERM` (or a
//!   configured signal set), then calls every worker's shutdown callback once
//! - A [`CancelRegistry`] that releases every blocked run at once, without
//!   sending a real OS signal
//! - [`run_in_background`] for driving a program's main loop from tests
//! - YAML configuration and logging setup for host binaries
//!
//! ```no_run
//! use rununtil::{shutdown_fn, CancelRegistry, Runner, WorkerFn};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), rununtil::RunError> {
//!     let registry = CancelRegistry::new();
//!     let runner = Runner::new(registry);
//!
//!     let server = WorkerFn::boxed("server", || {
//!         let task = tokio::spawn(async { /* serve */ });
//!         shutdown_fn(move || task.abort())
//!     });
//!
//!     let outcome = runner.run(vec![server]).await?;
//!     println!("stopped by {}", outcome.termination);
//!     Ok(())
//! }
//! ```

pub mod cancel;
pub mod config;
pub mod error;
pub mod runner;
pub mod signal;
pub mod util;

pub use cancel::{CancelRegistry, Waiter, WaiterId};
pub use config::Config;
pub use error::RunError;
pub use runner::{
    run_in_background, shutdown_fn, BoxWorker, CancelHandle, RunOutcome, Runner, ShutdownFn,
    Termination, Worker, WorkerFault, WorkerFn,
};
pub use signal::Signal;
