//! Error types for import job operations.

use thiserror::Error;

use super::store::StoreError;
use crate::directory::DirectoryError;

/// Errors returned by [`super::ImportController`].
#[derive(Debug, Error)]
pub enum ImportError {
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    #[error("An import is already {status} for {username}; reset it first")]
    AlreadyActive { username: String, status: String },

    #[error("Another batch is still running")]
    BatchInFlight,

    #[error("Progress store error: {0}")]
    Store(#[from] StoreError),

    #[error("Directory error: {0}")]
    Directory(#[from] DirectoryError),
}

impl ImportError {
    #[inline]
    pub fn invalid_argument(message: impl Into<String>) -> Self {
        Self::InvalidArgument(message.into())
    }
}

pub type Result<T> = std::result::Result<T, ImportError>;
