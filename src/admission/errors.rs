//! Admission Errors

use crate::config::ConfigError;
use thiserror::Error;

/// Result type for admission operations
pub type AdmissionResult<T> = Result<T, AdmissionError>;

/// Admission controller errors
#[derive(Debug, Error)]
pub enum AdmissionError {
    /// Construction rejected an invalid configuration.
    #[error("invalid admission configuration: {}", join_errors(.0))]
    InvalidConfig(Vec<ConfigError>),

    /// A writer panicked while updating the gate record. The state can
    /// no longer be trusted, so decisions fail explicitly instead of
    /// guessing between admit and reject.
    #[error("admission state lock poisoned")]
    StatePoisoned,
}

fn join_errors(errors: &[ConfigError]) -> String {
    errors
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::AdmissionConfig;

    #[test]
    fn test_invalid_config_lists_every_violation() {
        let mut config = AdmissionConfig::new(0);
        config.rate_step_percent = 0;
        let errors = config.validate().unwrap_err();
        let msg = AdmissionError::InvalidConfig(errors).to_string();
        assert!(msg.contains("upper_limit"));
        assert!(msg.contains("rate_step_percent"));
    }

    #[test]
    fn test_poisoned_display() {
        let msg = AdmissionError::StatePoisoned.to_string();
        assert!(msg.contains("poisoned"));
    }
}
