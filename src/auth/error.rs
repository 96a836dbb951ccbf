use thiserror::Error;

/// Faults a caller may need to tell apart from plain infrastructure errors.
///
/// These travel inside `anyhow::Error` and can be recovered with
/// `downcast_ref::<AuthError>()`.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum AuthError {
    #[error("unsupported hash algorithm: {0}")]
    UnsupportedAlgorithm(String),

    #[error("{operation} is not supported by this provider")]
    Unsupported { operation: &'static str },

    #[error("invalid field mapping for '{field}': {reason}")]
    InvalidFieldMapping { field: &'static str, reason: String },

    #[error("column '{column}' is missing from the external record")]
    MissingColumn { column: String },
}
