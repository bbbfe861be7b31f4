//! Error types for the analysis engine.
use thiserror::Error;

/// Reasons the engine may refuse to analyse a request.
///
/// Empty sample sets are not an error: they fall back to a neutral score.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum AnalysisError {
    /// The request (or the calibration it is evaluated against) is malformed
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// An ROI projection was requested for a return that is zero, negative or not finite
    #[error("Annual return must be a finite number greater than zero, got {0}")]
    NonPositiveReturn(f64),
}

/// Convenience alias for results returned by the engine
pub type Result<T> = std::result::Result<T, AnalysisError>;

/// Return an [`AnalysisError::InvalidInput`] from the current function if the condition fails.
macro_rules! ensure_valid {
    ($cond:expr, $($arg:tt)+) => {
        let valid: bool = $cond;
        if !valid {
            return Err($crate::error::AnalysisError::InvalidInput(format!(
                $($arg)+
            )));
        }
    };
}
pub(crate) use ensure_valid;
