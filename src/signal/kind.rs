//! Termination signal kinds.

use serde::{Deserialize, Serialize};
use std::fmt;

/// An OS signal a run can terminate on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Signal {
    /// `SIGINT` (Ctrl-C in a terminal).
    Interrupt,
    /// `SIGTERM` (default kill signal, used by systemd/Kubernetes).
    Terminate,
    /// `SIGHUP`.
    Hangup,
    /// `SIGQUIT`.
    Quit,
    /// `SIGUSR1`.
    User1,
    /// `SIGUSR2`.
    User2,
}

impl Signal {
    /// Signals a run listens for when the caller does not choose a set.
    pub const DEFAULT_SET: [Signal; 2] = [Signal::Interrupt, Signal::Terminate];

    /// Conventional signal name, e.g. `SIGINT`.
    pub fn as_str(&self) -> &'static str {
        match self {
            Signal::Interrupt => "SIGINT",
            Signal::Terminate => "SIGTERM",
            Signal::Hangup => "SIGHUP",
            Signal::Quit => "SIGQUIT",
            Signal::User1 => "SIGUSR1",
            Signal::User2 => "SIGUSR2",
        }
    }

    #[cfg(unix)]
    pub(crate) fn to_kind(self) -> tokio::signal::unix::SignalKind {
        use tokio::signal::unix::SignalKind;

        match self {
            Signal::Interrupt => SignalKind::interrupt(),
            Signal::Terminate => SignalKind::terminate(),
            Signal::Hangup => SignalKind::hangup(),
            Signal::Quit => SignalKind::quit(),
            Signal::User1 => SignalKind::user_defined1(),
            Signal::User2 => SignalKind::user_defined2(),
        }
    }
}

impl fmt::Display for Signal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_signal_serde() {
        let signal: Signal = serde_yaml::from_str("interrupt").unwrap();
        assert_eq!(signal, Signal::Interrupt);

        let signals: Vec<Signal> = serde_yaml::from_str("[terminate, user1]").unwrap();
        assert_eq!(signals, vec![Signal::Terminate, Signal::User1]);

        assert!(serde_yaml::from_str::<Signal>("sigkill").is_err());
    }

    #[test]
    fn test_signal_display() {
        assert_eq!(Signal::Interrupt.to_string(), "SIGINT");
        assert_eq!(Signal::Terminate.to_string(), "SIGTERM");
    }

    #[test]
    fn test_default_set() {
        assert_eq!(Signal::DEFAULT_SET, [Signal::Interrupt, Signal::Terminate]);
    }

    #[cfg(unix)]
    #[test]
    fn test_kind_maps_to_os_signal() {
        let cases = [
            (Signal::Interrupt, libc::SIGINT),
            (Signal::Terminate, libc::SIGTERM),
            (Signal::Hangup, libc::SIGHUP),
            (Signal::Quit, libc::SIGQUIT),
            (Signal::User1, libc::SIGUSR1),
            (Signal::User2, libc::SIGUSR2),
        ];
        for (signal, raw) in cases {
            assert_eq!(signal.to_kind().as_raw_value(), raw, "{signal}");
        }
    }
}
