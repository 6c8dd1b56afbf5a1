// src/error.rs
use std::fmt;

/// Custom error types for the fast-pde library
#[derive(Debug, Clone)]
pub enum FdError {
    /// Invalid parameter values
    InvalidParameters {
        parameter: String,
        value: f64,
        constraint: String,
    },

    /// Invalid configuration
    InvalidConfiguration { field: String, reason: String },

    /// Inconsistent internal state (size mismatch between grid, operator
    /// and payoff buffers). Indicates a programming bug, not bad input.
    InvalidState { context: String, reason: String },

    /// Numerical instability or non-finite result detected during stepping
    NumericalInstability { method: String, reason: String },

    /// Grid construction failure
    GridConstruction { grid_type: String, reason: String },
}

impl fmt::Display for FdError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FdError::InvalidParameters {
                parameter,
                value,
                constraint,
            } => {
                write!(
                    f,
                    "Invalid parameter '{}' = {}: {}",
                    parameter, value, constraint
                )
            }
            FdError::InvalidConfiguration { field, reason } => {
                write!(f, "Invalid configuration for '{}': {}", field, reason)
            }
            FdError::InvalidState { context, reason } => {
                write!(f, "Invalid state in {}: {}", context, reason)
            }
            FdError::NumericalInstability { method, reason } => {
                write!(f, "Numerical instability in {}: {}", method, reason)
            }
            FdError::GridConstruction { grid_type, reason } => {
                write!(f, "Cannot build {} grid: {}", grid_type, reason)
            }
        }
    }
}

impl std::error::Error for FdError {}

/// Result type alias for fast-pde operations
pub type FdResult<T> = Result<T, FdError>;

/// Validation utilities
pub mod validation {
    use super::{FdError, FdResult};

    /// Validate that a parameter is positive
    pub fn validate_positive(name: &str, value: f64) -> FdResult<()> {
        if value <= 0.0 {
            Err(FdError::InvalidParameters {
                parameter: name.to_string(),
                value,
                constraint: "must be positive (> 0)".to_string(),
            })
        } else {
            Ok(())
        }
    }

    /// Validate that a parameter is non-negative
    pub fn validate_non_negative(name: &str, value: f64) -> FdResult<()> {
        if value < 0.0 {
            Err(FdError::InvalidParameters {
                parameter: name.to_string(),
                value,
                constraint: "must be non-negative (≥ 0)".to_string(),
            })
        } else {
            Ok(())
        }
    }

    /// Validate that a parameter is within a range
    pub fn validate_range(name: &str, value: f64, min: f64, max: f64) -> FdResult<()> {
        if value < min || value > max {
            Err(FdError::InvalidParameters {
                parameter: name.to_string(),
                value,
                constraint: format!("must be in range [{}, {}]", min, max),
            })
        } else {
            Ok(())
        }
    }

    /// Validate that a value is finite and not NaN
    pub fn validate_finite(name: &str, value: f64) -> FdResult<()> {
        if !value.is_finite() {
            Err(FdError::InvalidParameters {
                parameter: name.to_string(),
                value,
                constraint: "must be finite (not NaN or infinite)".to_string(),
            })
        } else {
            Ok(())
        }
    }

    /// Validate spatial interval count (grid has n + 1 nodes)
    pub fn validate_intervals(n: usize) -> FdResult<()> {
        if n < 2 {
            Err(FdError::InvalidConfiguration {
                field: "n".to_string(),
                reason: "must be at least 2 spatial intervals".to_string(),
            })
        } else if n > 1_000_000 {
            Err(FdError::InvalidConfiguration {
                field: "n".to_string(),
                reason: "exceeds maximum allowed (1,000,000)".to_string(),
            })
        } else {
            Ok(())
        }
    }

    /// Validate time step count
    pub fn validate_time_steps(m: usize) -> FdResult<()> {
        if m == 0 {
            Err(FdError::InvalidConfiguration {
                field: "m".to_string(),
                reason: "must be greater than 0".to_string(),
            })
        } else if m > 10_000_000 {
            Err(FdError::InvalidConfiguration {
                field: "m".to_string(),
                reason: "exceeds maximum allowed (10,000,000)".to_string(),
            })
        } else {
            Ok(())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::validation::*;
    use super::*;

    #[test]
    fn test_validate_positive() {
        assert!(validate_positive("sigma", 0.2).is_ok());
        assert!(validate_positive("sigma", 0.0).is_err());
        assert!(validate_positive("sigma", -0.1).is_err());
    }

    #[test]
    fn test_validate_intervals() {
        assert!(validate_intervals(2).is_ok());
        assert!(validate_intervals(200).is_ok());
        assert!(validate_intervals(1).is_err());
        assert!(validate_intervals(0).is_err());
    }

    #[test]
    fn test_validate_finite() {
        assert!(validate_finite("value", 1.0).is_ok());
        assert!(validate_finite("value", f64::NAN).is_err());
        assert!(validate_finite("value", f64::INFINITY).is_err());
        assert!(validate_finite("value", f64::NEG_INFINITY).is_err());
    }

    #[test]
    fn test_error_display() {
        let error = FdError::InvalidParameters {
            parameter: "sigma".to_string(),
            value: -0.1,
            constraint: "must be positive".to_string(),
        };

        let display = format!("{}", error);
        assert!(display.contains("sigma"));
        assert!(display.contains("-0.1"));
        assert!(display.contains("positive"));
    }

    #[test]
    fn test_invalid_state_display() {
        let error = FdError::InvalidState {
            context: "TridiagonalOperator::dot".to_string(),
            reason: "payoff length 201 does not match operator size 101".to_string(),
        };

        let display = format!("{}", error);
        assert!(display.contains("TridiagonalOperator::dot"));
        assert!(display.contains("201"));
    }
}
