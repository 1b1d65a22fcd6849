//! Error types for subscription operations.

use crate::types::SubscriptionId;
use thiserror::Error;

/// Main error type for subscription operations.
#[derive(Debug, Error)]
pub enum SubscriptionError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("duplicate subscription ID {0:?}")]
    DuplicateSubscription(SubscriptionId),

    #[error("invalid path {path:?}: {reason}")]
    InvalidPath { path: String, reason: String },

    #[error("path resolution failed: {0}")]
    Resolution(String),

    #[error("change registration failed: {0}")]
    Registration(String),
}

impl SubscriptionError {
    pub(crate) fn invalid_path(path: impl Into<String>, reason: impl Into<String>) -> Self {
        SubscriptionError::InvalidPath {
            path: path.into(),
            reason: reason.into(),
        }
    }
}

/// Result type for subscription operations.
pub type Result<T> = std::result::Result<T, SubscriptionError>;
