//! Error type shared by all detectors.

/// Convenience alias used throughout the crate.
pub type Result<T> = std::result::Result<T, HoughError>;

/// Failures reported by configuration validation and detection.
///
/// Absence of detections is never an error: detectors return an empty `Vec`.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum HoughError {
    /// A configuration value is outside its valid range.
    #[error("invalid parameter `{param}`: {reason}")]
    InvalidParameter {
        /// Name of the offending config field.
        param: &'static str,
        /// Human-readable description of the violated constraint.
        reason: String,
    },

    /// Detection was stopped through a [`CancelToken`](crate::CancelToken).
    #[error("detection cancelled")]
    Cancelled,
}

impl HoughError {
    pub(crate) fn invalid(param: &'static str, reason: impl Into<String>) -> Self {
        Self::InvalidParameter {
            param,
            reason: reason.into(),
        }
    }
}

/// Reject non-finite and non-positive values.
pub(crate) fn ensure_positive(param: &'static str, value: f32) -> Result<()> {
    if !value.is_finite() {
        return Err(HoughError::invalid(param, format!("must be finite, got {value}")));
    }
    if value <= 0.0 {
        return Err(HoughError::invalid(param, format!("must be > 0, got {value}")));
    }
    Ok(())
}
