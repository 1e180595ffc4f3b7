//! Runtime error types for the WMM submission pipeline.
//!
//! Validation rejections are not errors (see `verdict::Rejection`). The
//! variants here are configuration, data, and storage faults that an operator
//! needs to see.

use thiserror::Error;

/// The unified error type for the WMM crates.
#[derive(Debug, Error)]
pub enum WmmError {
    /// The effectiveness table has no column for this intervention type.
    #[error("unknown intervention type '{intervention_type}'")]
    UnknownInterventionType { intervention_type: String },

    /// The effectiveness column exists but holds no usable values.
    #[error("no effectiveness data for intervention type '{intervention_type}'")]
    InsufficientData { intervention_type: String },

    /// Reading an object from storage failed. Nothing was mutated.
    #[error("storage read failed for '{key}': {reason}")]
    StorageRead { key: String, reason: String },

    /// Writing an object back failed. The event is NOT guaranteed committed.
    #[error("storage write failed for '{key}': {reason}")]
    StorageWrite { key: String, reason: String },

    /// A conditional write found the object changed since it was read.
    #[error("write conflict on '{key}': expected version {expected}, found {found}")]
    WriteConflict {
        key: String,
        expected: String,
        found: String,
    },

    /// A stored object could not be encoded or decoded.
    #[error("codec error: {reason}")]
    Codec { reason: String },

    /// A required configuration value is missing or invalid.
    #[error("configuration error: {reason}")]
    ConfigError { reason: String },

    /// A notifier could not deliver an intent.
    #[error("notification failed for '{recipient}': {reason}")]
    NotificationFailed { recipient: String, reason: String },
}

impl WmmError {
    /// True for failures a caller may retry without risk of double-applying.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            WmmError::StorageRead { .. } | WmmError::WriteConflict { .. }
        )
    }

    /// True for faults in the effectiveness data or configuration.
    pub fn is_resolver_fault(&self) -> bool {
        matches!(
            self,
            WmmError::UnknownInterventionType { .. } | WmmError::InsufficientData { .. }
        )
    }

    /// The text shown to an end user. Detail stays in the operator logs.
    pub fn user_message(&self) -> String {
        match self {
            WmmError::StorageWrite { .. } | WmmError::WriteConflict { .. } => {
                "Your event could not be saved. Please submit it again.".to_string()
            }
            _ => "Something went wrong on our side. Please try again later.".to_string(),
        }
    }
}

/// Convenience alias used throughout the WMM crates.
pub type WmmResult<T> = Result<T, WmmError>;
