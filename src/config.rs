//! Admission Control Configuration
//!
//! All tuning knobs for the adaptive admission controller, loadable from
//! an `[admission]` TOML section. Only `upper_limit` is required; the
//! remaining fields default to the standard tuning: 1s sampling,
//! 5-sample hysteresis, 80%/85% recovery band, 10% rate steps.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Adaptive admission controller configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AdmissionConfig {
    /// Throughput ceiling in requests per second
    pub upper_limit: u64,

    /// Interval between throughput samples in ms
    #[serde(default = "default_sample_interval_ms")]
    pub sample_interval_ms: u64,

    /// Bound on each throughput probe in ms
    ///
    /// A probe that takes longer is abandoned and its sample skipped.
    #[serde(default = "default_monitor_timeout_ms")]
    pub monitor_timeout_ms: u64,

    /// Consecutive qualifying samples required before a slow transition
    ///
    /// Applies to entering rate limiting, entering recovery, and each
    /// recovery increment. Back-off during recovery ignores this and
    /// reacts to a single sample.
    #[serde(default = "default_required_samples")]
    pub required_samples: u32,

    /// Fraction of `upper_limit` under which a rate-limited backend is
    /// quiet enough to begin recovering
    #[serde(default = "default_recover_enter_ratio")]
    pub recover_enter_ratio: f64,

    /// Fraction of `upper_limit` under which a recovering backend earns
    /// the next admission-rate increment
    #[serde(default = "default_recover_step_ratio")]
    pub recover_step_ratio: f64,

    /// Admission-rate step in percentage points
    ///
    /// Used for the initial rate on entering recovery, each increment,
    /// and each back-off decrement.
    #[serde(default = "default_rate_step_percent")]
    pub rate_step_percent: u8,
}

fn default_sample_interval_ms() -> u64 {
    1000
}

fn default_monitor_timeout_ms() -> u64 {
    3000
}

fn default_required_samples() -> u32 {
    5
}

fn default_recover_enter_ratio() -> f64 {
    0.8
}

fn default_recover_step_ratio() -> f64 {
    0.85
}

fn default_rate_step_percent() -> u8 {
    10
}

impl AdmissionConfig {
    /// Configuration with the given throughput ceiling and default tuning.
    pub fn new(upper_limit: u64) -> Self {
        Self {
            upper_limit,
            sample_interval_ms: default_sample_interval_ms(),
            monitor_timeout_ms: default_monitor_timeout_ms(),
            required_samples: default_required_samples(),
            recover_enter_ratio: default_recover_enter_ratio(),
            recover_step_ratio: default_recover_step_ratio(),
            rate_step_percent: default_rate_step_percent(),
        }
    }

    /// Validate all fields, collecting every violation.
    ///
    /// Rejects values that would stall the state machine (a zero rate
    /// step, zero hysteresis) or invert the recovery band.
    pub fn validate(&self) -> Result<(), Vec<ConfigError>> {
        let mut errors = Vec::new();

        if self.upper_limit == 0 {
            errors.push(ConfigError::new(
                "upper_limit",
                self.upper_limit,
                "throughput ceiling must be positive",
            ));
        }
        if self.sample_interval_ms == 0 {
            errors.push(ConfigError::new(
                "sample_interval_ms",
                self.sample_interval_ms,
                "sampling interval must be positive",
            ));
        }
        if self.monitor_timeout_ms == 0 {
            errors.push(ConfigError::new(
                "monitor_timeout_ms",
                self.monitor_timeout_ms,
                "probe timeout must be positive",
            ));
        }
        if self.required_samples == 0 {
            errors.push(ConfigError::new(
                "required_samples",
                self.required_samples,
                "hysteresis requires at least one sample",
            ));
        }
        if !(self.recover_enter_ratio > 0.0 && self.recover_enter_ratio <= 1.0) {
            errors.push(ConfigError::new(
                "recover_enter_ratio",
                self.recover_enter_ratio,
                "ratio must be within (0, 1]",
            ));
        }
        if !(self.recover_step_ratio > 0.0 && self.recover_step_ratio <= 1.0) {
            errors.push(ConfigError::new(
                "recover_step_ratio",
                self.recover_step_ratio,
                "ratio must be within (0, 1]",
            ));
        }
        if self.recover_enter_ratio > self.recover_step_ratio {
            errors.push(ConfigError::new(
                "recover_enter_ratio",
                self.recover_enter_ratio,
                "recovery entry threshold cannot exceed the step threshold",
            ));
        }
        if self.rate_step_percent == 0 || self.rate_step_percent > 100 {
            errors.push(ConfigError::new(
                "rate_step_percent",
                self.rate_step_percent,
                "step must be between 1 and 100",
            ));
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }

    /// Qps below which a rate-limited backend may start recovering.
    ///
    /// Truncates toward zero, so `upper_limit = 999` with ratio 0.8
    /// yields 799.
    pub(crate) fn recover_enter_threshold(&self) -> u64 {
        (self.upper_limit as f64 * self.recover_enter_ratio) as u64
    }

    /// Qps below which a recovering backend earns the next increment.
    pub(crate) fn recover_step_threshold(&self) -> u64 {
        (self.upper_limit as f64 * self.recover_step_ratio) as u64
    }
}

/// A single rejected configuration value
#[derive(Debug, Clone)]
pub struct ConfigError {
    pub field: &'static str,
    pub value: String,
    pub message: &'static str,
}

impl ConfigError {
    fn new(field: &'static str, value: impl fmt::Display, message: &'static str) -> Self {
        Self {
            field,
            value: value.to_string(),
            message,
        }
    }
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "invalid value for '{}': {} (value: {})",
            self.field, self.message, self.value
        )
    }
}

impl std::error::Error for ConfigError {}
