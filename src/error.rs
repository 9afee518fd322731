//! Error types for the risk engine.

use thiserror::Error;

/// Result type alias for engine operations.
pub type Result<T> = std::result::Result<T, RiskError>;

/// Errors surfaced at the engine boundary.
///
/// Numerical edge cases (an infinite negative growth rate, the percentile
/// of an empty sample) are defined values and never show up here.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum RiskError {
    /// Caller-supplied input outside the documented domain.
    #[error("Invalid input: {field} = {value} ({reason})")]
    InvalidInput {
        field: &'static str,
        value: f64,
        reason: &'static str,
    },

    /// Simulation configuration that cannot produce a result.
    #[error("Invalid configuration: {message}")]
    InvalidConfig { message: String },

    /// The caller tripped the cancellation token mid-run.
    #[error("Simulation cancelled after {completed_paths} paths")]
    Cancelled { completed_paths: usize },
}

impl RiskError {
    /// Create an invalid input error.
    pub fn invalid_input(field: &'static str, value: f64, reason: &'static str) -> Self {
        Self::InvalidInput { field, value, reason }
    }

    /// Create an invalid configuration error.
    pub fn invalid_config(message: impl Into<String>) -> Self {
        Self::InvalidConfig {
            message: message.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_messages() {
        let err = RiskError::invalid_input("equity", -5.0, "must be positive");
        assert_eq!(
            err.to_string(),
            "Invalid input: equity = -5 (must be positive)"
        );

        let err = RiskError::invalid_config("path_count must be non-zero");
        assert!(err.to_string().contains("path_count"));
    }
}
