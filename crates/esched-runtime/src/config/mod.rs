//! Priority scheduler configuration
//!
//! Provides compile-time defaults with runtime environment overrides.
//!
//! # Configuration Priority (highest wins)
//!
//! 1. Environment variables (runtime)
//! 2. Library defaults
//!
//! # Example
//!
//! ```rust,ignore
//! use esched_runtime::config::PrioSchedConfig;
//!
//! // Use defaults with env overrides
//! let config = PrioSchedConfig::from_env();
//!
//! // Or customize programmatically
//! let config = PrioSchedConfig::from_env().event_freq(100);
//! ```

pub mod defaults;

use std::time::Duration;

use esched_core::env::env_get;

/// Priority scheduler configuration with builder pattern.
///
/// Use `from_env()` to start with compile-time defaults and apply any
/// environment variable overrides; only `event_freq` is a recognised
/// external configuration key (§6.4) — anything else a caller wants tunable
/// belongs in their own config layer, not here.
#[derive(Debug, Clone)]
pub struct PrioSchedConfig {
    /// Work units dispatched before a housekeeping pass.
    pub event_freq: u32,
    /// Sleep duration when a drain pass finds no work. `None` disables it.
    pub sleep_time: Option<Duration>,
}

impl Default for PrioSchedConfig {
    fn default() -> Self {
        Self::from_env()
    }
}

impl PrioSchedConfig {
    /// Create config from compile-time defaults with environment overrides.
    ///
    /// Environment variables (all optional):
    /// - `ESCHED_EVENT_FREQ` - work units between housekeeping passes
    /// - `ESCHED_SLEEP_NS` - idle-pass sleep duration in nanoseconds (0 disables)
    pub fn from_env() -> Self {
        let sleep_ns = env_get("ESCHED_SLEEP_NS", defaults::SLEEP_NS);
        Self {
            event_freq: env_get("ESCHED_EVENT_FREQ", defaults::EVENT_FREQ),
            sleep_time: if sleep_ns == 0 {
                None
            } else {
                Some(Duration::from_nanos(sleep_ns))
            },
        }
    }

    /// Create config with explicit defaults (no env override). Useful for
    /// tests or when full control is wanted.
    pub fn new() -> Self {
        Self {
            event_freq: defaults::EVENT_FREQ,
            sleep_time: Some(Duration::from_nanos(defaults::SLEEP_NS)),
        }
    }

    pub fn event_freq(mut self, n: u32) -> Self {
        self.event_freq = n;
        self
    }

    pub fn sleep_time(mut self, d: Option<Duration>) -> Self {
        self.sleep_time = d;
        self
    }

    /// Validate configuration and return errors if invalid.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.event_freq == 0 {
            return Err(ConfigError::InvalidValue("event_freq must be > 0"));
        }
        Ok(())
    }

    /// Print configuration (for debugging).
    pub fn print(&self) {
        eprintln!("Priority scheduler configuration:");
        eprintln!("  event_freq:  {}", self.event_freq);
        eprintln!("  sleep_time:  {:?}", self.sleep_time);
    }
}

/// Configuration error
#[derive(Debug, Clone)]
pub enum ConfigError {
    InvalidValue(&'static str),
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigError::InvalidValue(msg) => write!(f, "invalid config: {}", msg),
        }
    }
}

impl std::error::Error for ConfigError {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_env() {
        let config = PrioSchedConfig::from_env();
        assert!(config.event_freq >= 1);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_builder() {
        let config = PrioSchedConfig::from_env()
            .event_freq(100)
            .sleep_time(None);
        assert_eq!(config.event_freq, 100);
        assert_eq!(config.sleep_time, None);
    }

    #[test]
    fn test_validation() {
        let config = PrioSchedConfig::from_env().event_freq(0);
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_sleep_ns_zero_disables_sleep() {
        std::env::set_var("ESCHED_SLEEP_NS", "0");
        let config = PrioSchedConfig::from_env();
        assert_eq!(config.sleep_time, None);
        std::env::remove_var("ESCHED_SLEEP_NS");
    }
}
