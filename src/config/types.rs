//! Configuration data types.

use crate::runner::DEFAULT_CANCEL_RETRY;
use crate::signal::Signal;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Root configuration structure.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct Config {
    /// Global settings
    #[serde(default)]
    pub global: GlobalConfig,

    /// Run settings
    #[serde(default)]
    pub run: RunConfig,

    /// Heartbeat workers started by the demo binary
    #[serde(default)]
    pub heartbeat: HeartbeatConfig,
}

/// Global configuration settings.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct GlobalConfig {
    /// Log level: trace, debug, info, warn, error
    #[serde(default = "default_log_level")]
    pub log_level: String,

    /// Log format: json or pretty
    #[serde(default = "default_log_format")]
    pub log_format: LogFormat,
}

impl Default for GlobalConfig {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
            log_format: default_log_format(),
        }
    }
}

/// Log output format.
#[derive(Debug, Clone, Default, Deserialize, Serialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Json,
    Pretty,
}

/// Settings for a run.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct RunConfig {
    /// Signals that terminate the run
    #[serde(default = "default_signals")]
    pub signals: Vec<Signal>,

    /// Pause between repeated broadcasts of a background cancel
    #[serde(default = "default_cancel_retry_interval", with = "humantime_serde")]
    pub cancel_retry_interval: Duration,
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            signals: default_signals(),
            cancel_retry_interval: default_cancel_retry_interval(),
        }
    }
}

/// Heartbeat worker settings.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct HeartbeatConfig {
    /// Number of heartbeat workers
    #[serde(default = "default_heartbeat_workers")]
    pub workers: u32,

    /// Time between heartbeats
    #[serde(default = "default_heartbeat_interval", with = "humantime_serde")]
    pub interval: Duration,
}

impl Default for HeartbeatConfig {
    fn default() -> Self {
        Self {
            workers: default_heartbeat_workers(),
            interval: default_heartbeat_interval(),
        }
    }
}

// Default value functions
fn default_log_level() -> String {
    "info".to_string()
}

fn default_log_format() -> LogFormat {
    LogFormat::Json
}

fn default_signals() -> Vec<Signal> {
    Signal::DEFAULT_SET.to_vec()
}

fn default_cancel_retry_interval() -> Duration {
    DEFAULT_CANCEL_RETRY
}

fn default_heartbeat_workers() -> u32 {
    1
}

fn default_heartbeat_interval() -> Duration {
    Duration::from_secs(1)
}

/// Custom serde module for humantime durations.
mod humantime_serde {
    use serde::{self, Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        let s = humantime::format_duration(*duration).to_string();
        serializer.serialize_str(&s)
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
    where
        D: Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        humantime::parse_duration(&s).map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.global.log_level, "info");
        assert_eq!(config.global.log_format, LogFormat::Json);
        assert_eq!(config.run.signals, vec![Signal::Interrupt, Signal::Terminate]);
        assert_eq!(config.run.cancel_retry_interval, Duration::from_millis(5));
        assert_eq!(config.heartbeat.workers, 1);
    }

    #[test]
    fn test_empty_global_section_uses_defaults() {
        let global: GlobalConfig = serde_yaml::from_str("{}").unwrap();
        let defaults = GlobalConfig::default();
        assert_eq!(global.log_level, defaults.log_level);
        assert_eq!(global.log_format, defaults.log_format);
        assert_eq!(defaults.log_format, default_log_format());
    }

    #[test]
    fn test_run_section_serde() {
        let run: RunConfig = serde_yaml::from_str(
            r#"
signals: [hangup, quit]
cancel_retry_interval: 20ms
"#,
        )
        .unwrap();
        assert_eq!(run.signals, vec![Signal::Hangup, Signal::Quit]);
        assert_eq!(run.cancel_retry_interval, Duration::from_millis(20));
    }

    #[test]
    fn test_invalid_duration() {
        let res: Result<HeartbeatConfig, _> = serde_yaml::from_str("interval: soon");
        assert!(res.is_err());
    }

    #[test]
    fn test_duration_serializes_humantime() {
        let yaml = serde_yaml::to_string(&HeartbeatConfig::default()).unwrap();
        assert!(yaml.contains("interval: 1s"));
    }
}
