//! Error types for core arithmetic.

use thiserror::Error;

/// A specialized Result type for core operations.
pub type CoreResult<T> = Result<T, CoreError>;

/// Errors raised by the pure arithmetic in this crate.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum CoreError {
    /// An intermediate value was NaN or infinite.
    #[error("non-finite {quantity}: {value}")]
    NonFinite {
        /// Name of the quantity being computed.
        quantity: &'static str,
        /// The offending value.
        value: f64,
    },

    /// A divisor was zero or negative where a positive value is required.
    #[error("{quantity} must be positive, got {value}")]
    NonPositive {
        /// Name of the divisor.
        quantity: &'static str,
        /// The offending value.
        value: f64,
    },
}

/// Checks that `value` is finite.
pub fn ensure_finite(quantity: &'static str, value: f64) -> CoreResult<f64> {
    if value.is_finite() {
        Ok(value)
    } else {
        Err(CoreError::NonFinite { quantity, value })
    }
}

/// Checks that `value` is finite and strictly positive.
pub fn ensure_positive(quantity: &'static str, value: f64) -> CoreResult<f64> {
    let value = ensure_finite(quantity, value)?;
    if value > 0.0 {
        Ok(value)
    } else {
        Err(CoreError::NonPositive { quantity, value })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ensure_finite() {
        assert_eq!(ensure_finite("apr", 1.5), Ok(1.5));
        assert!(matches!(
            ensure_finite("apr", f64::NAN),
            Err(CoreError::NonFinite { quantity: "apr", .. })
        ));
        assert!(ensure_finite("apr", f64::INFINITY).is_err());
    }

    #[test]
    fn test_ensure_positive() {
        assert_eq!(ensure_positive("staked", 2.0), Ok(2.0));
        assert_eq!(
            ensure_positive("staked", 0.0),
            Err(CoreError::NonPositive {
                quantity: "staked",
                value: 0.0
            })
        );
        assert!(ensure_positive("staked", -1.0).is_err());
    }
}
