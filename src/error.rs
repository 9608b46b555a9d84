//! Errors surfaced by a run.

use crate::signal::Signal;
use thiserror::Error;

/// Errors that end a run (or a background entrypoint) abnormally.
///
/// Faults raised by shutdown callbacks are not errors: they are isolated per
/// worker and reported in [`RunOutcome::faults`](crate::RunOutcome).
#[non_exhaustive]
#[derive(Debug, Error)]
pub enum RunError {
    /// The OS refused to install interception for a signal.
    #[error("failed to register handler for {signal}: {source}")]
    SignalRegistration {
        signal: Signal,
        #[source]
        source: std::io::Error,
    },

    /// The signal cannot be listened for on this platform.
    #[error("signal {0} is not supported on this platform")]
    UnsupportedSignal(Signal),

    /// A start callback panicked; workers started before it were shut down.
    #[error("worker '{worker}' panicked while starting")]
    WorkerStartPanicked { worker: String },

    /// A background entrypoint panicked.
    #[error("background entrypoint panicked")]
    EntrypointPanicked,

    /// A background entrypoint was aborted before finishing.
    #[error("background entrypoint was aborted")]
    EntrypointAborted,
}

impl RunError {
    /// Returns a short stable label (snake_case) for use in logs.
    pub fn as_label(&self) -> &'static str {
        match self {
            RunError::SignalRegistration { .. } => "signal_registration_failed",
            RunError::UnsupportedSignal(_) => "signal_unsupported",
            RunError::WorkerStartPanicked { .. } => "worker_start_panicked",
            RunError::EntrypointPanicked => "entrypoint_panicked",
            RunError::EntrypointAborted => "entrypoint_aborted",
        }
    }
}

impl From<tokio::task::JoinError> for RunError {
    fn from(err: tokio::task::JoinError) -> Self {
        if err.is_panic() {
            RunError::EntrypointPanicked
        } else {
            RunError::EntrypointAborted
        }
    }
}
