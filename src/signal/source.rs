//! OS signal subscription.
//!
//! Every call to [`subscribe`] creates independent listeners on tokio's
//! signal driver, so any number of concurrent runs each observe the same
//! delivery.
//!
//! ## Unix
//! All [`Signal`] kinds are supported.
//!
//! ## Windows
//! Only [`Signal::Interrupt`] is supported, through [`tokio::signal::ctrl_c`].

use crate::error::RunError;
use crate::signal::Signal;

/// Listener for one subscription to a set of signals.
#[derive(Debug)]
pub struct SignalListener {
    #[cfg(unix)]
    streams: Vec<(Signal, tokio::signal::unix::Signal)>,
    #[cfg(not(unix))]
    ctrl_c: bool,
}

/// Install OS interception for `signals` and return a listener for them.
///
/// Duplicate kinds are subscribed once. An empty set yields a listener that
/// never fires.
///
/// Must be called from within a tokio runtime.
#[cfg(unix)]
pub fn subscribe(signals: &[Signal]) -> Result<SignalListener, RunError> {
    let mut streams: Vec<(Signal, tokio::signal::unix::Signal)> = Vec::with_capacity(signals.len());

    for &signal in signals {
        if streams.iter().any(|(s, _)| *s == signal) {
            continue;
        }
        let stream = tokio::signal::unix::signal(signal.to_kind())
            .map_err(|source| RunError::SignalRegistration { signal, source })?;
        streams.push((signal, stream));
    }

    Ok(SignalListener { streams })
}

/// Install OS interception for `signals` and return a listener for them.
#[cfg(not(unix))]
pub fn subscribe(signals: &[Signal]) -> Result<SignalListener, RunError> {
    if let Some(&signal) = signals.iter().find(|s| **s != Signal::Interrupt) {
        return Err(RunError::UnsupportedSignal(signal));
    }
    Ok(SignalListener {
        ctrl_c: !signals.is_empty(),
    })
}

impl SignalListener {
    /// Wait for the first delivery of any subscribed signal.
    #[cfg(unix)]
    pub async fn recv(&mut self) -> Signal {
        if self.streams.is_empty() {
            return std::future::pending().await;
        }

        let pending = self.streams.iter_mut().map(|(signal, stream)| {
            Box::pin(async move {
                // `None` means the signal driver is gone; treat it as delivery.
                let _ = stream.recv().await;
                *signal
            })
        });

        let (signal, _, _) = futures::future::select_all(pending).await;
        signal
    }

    /// Wait for the first delivery of any subscribed signal.
    #[cfg(not(unix))]
    pub async fn recv(&mut self) -> Signal {
        if !self.ctrl_c {
            return std::future::pending().await;
        }
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "ctrl-c listener failed");
            return std::future::pending().await;
        }
        Signal::Interrupt
    }

    /// Number of distinct signals this listener is subscribed to.
    pub fn len(&self) -> usize {
        #[cfg(unix)]
        {
            self.streams.len()
        }
        #[cfg(not(unix))]
        {
            usize::from(self.ctrl_c)
        }
    }

    /// True if the listener is not subscribed to any signal.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
