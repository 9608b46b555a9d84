//! Configuration validation.

use crate::config::Config;
use std::collections::HashSet;

/// Validate the configuration.
///
/// Checks for:
/// - A known log level
/// - No duplicate signals in the run signal set
/// - A non-zero cancel retry interval
/// - A non-zero heartbeat interval
///
/// # Returns
///
/// `Ok(())` if valid, or an error message describing every problem found.
pub fn validate_config(config: &Config) -> Result<(), String> {
    let mut errors = Vec::new();

    // Validate log level
    let valid_levels = ["trace", "debug", "info", "warn", "error"];
    if !valid_levels.contains(&config.global.log_level.to_lowercase().as_str()) {
        errors.push(format!(
            "invalid log level '{}', must be one of: {}",
            config.global.log_level,
            valid_levels.join(", ")
        ));
    }

    // Check for duplicate signals
    let mut seen = HashSet::new();
    for signal in &config.run.signals {
        if !seen.insert(signal) {
            errors.push(format!("duplicate signal: {}", signal));
        }
    }

    if config.run.signals.is_empty() {
        tracing::warn!("empty signal set, runs end only on a broadcast cancel");
    }

    if config.run.cancel_retry_interval.is_zero() {
        errors.push("run.cancel_retry_interval must be greater than zero".to_string());
    }

    if config.heartbeat.interval.is_zero() {
        errors.push("heartbeat.interval must be greater than zero".to_string());
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors.join("; "))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::signal::Signal;
    use std::time::Duration;

    #[test]
    fn test_valid_config() {
        let config = Config::default();
        assert!(validate_config(&config).is_ok());
    }

    #[test]
    fn test_empty_signal_set_is_valid() {
        let mut config = Config::default();
        config.run.signals.clear();
        assert!(validate_config(&config).is_ok());
    }

    #[test]
    fn test_invalid_log_level() {
        let mut config = Config::default();
        config.global.log_level = "verbose".to_string();
        let result = validate_config(&config);
        assert!(result.unwrap_err().contains("invalid log level 'verbose'"));
    }

    #[test]
    fn test_duplicate_signal() {
        let mut config = Config::default();
        config.run.signals.push(Signal::Interrupt);
        let result = validate_config(&config);
        assert!(result.unwrap_err().contains("duplicate signal: SIGINT"));
    }

    #[test]
    fn test_zero_intervals_reports_all() {
        let mut config = Config::default();
        config.run.cancel_retry_interval = Duration::ZERO;
        config.heartbeat.interval = Duration::ZERO;

        let err = validate_config(&config).unwrap_err();
        assert!(err.contains("cancel_retry_interval"));
        assert!(err.contains("heartbeat.interval"));
        assert_eq!(err.matches("; ").count(), 1);
    }
}
