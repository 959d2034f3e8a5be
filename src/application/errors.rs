//! Retrieval error taxonomy
//!
//! Fetcher and storage errors are translated here, at the service boundary.
//! `status_code` / `public_message` give a transport the mapping it needs
//! without leaking internal detail on server-side failures.

use thiserror::Error;

use crate::infrastructure::storage_error::StorageError;
use crate::infrastructure::youtube_client::FetchError;

const GENERIC_FAILURE_MESSAGE: &str = "An internal error occurred while retrieving comments";

#[derive(Error, Debug)]
pub enum CommentServiceError {
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    #[error("Service is misconfigured: {0}")]
    Misconfigured(String),

    #[error("Upstream comment API returned status {status_code}: {body}")]
    UpstreamError { status_code: u16, body: String },

    #[error("Fetching comments failed: {0}")]
    FetchFailed(#[source] FetchError),

    #[error("Storage stayed busy after retries: {0}")]
    TransientStorageFault(#[source] StorageError),

    #[error("Storage schema is missing: {0}")]
    SchemaMissing(#[source] StorageError),

    #[error("Storage schema could not be repaired: {0}")]
    SchemaCorrupt(#[source] StorageError),

    #[error("Storage failure: {0}")]
    Storage(#[source] StorageError),

    #[error("Request was cancelled")]
    Cancelled,
}

impl CommentServiceError {
    /// HTTP-style status for a transport mapping: 400 for bad input,
    /// 499 for cancellation, 500 for everything else.
    pub const fn status_code(&self) -> u16 {
        match self {
            Self::InvalidArgument(_) => 400,
            Self::Cancelled => 499,
            _ => 500,
        }
    }

    /// Message safe to hand to a caller.
    pub fn public_message(&self) -> String {
        if self.status_code() < 500 {
            self.to_string()
        } else {
            GENERIC_FAILURE_MESSAGE.to_string()
        }
    }

    pub const fn is_schema_missing(&self) -> bool {
        matches!(self, Self::SchemaMissing(_))
    }
}

impl From<FetchError> for CommentServiceError {
    fn from(error: FetchError) -> Self {
        match error {
            FetchError::Upstream { status_code, body } => Self::UpstreamError { status_code, body },
            FetchError::Cancelled => Self::Cancelled,
            FetchError::InvalidConfig(message) => Self::Misconfigured(message),
            other => Self::FetchFailed(other),
        }
    }
}

impl From<StorageError> for CommentServiceError {
    fn from(error: StorageError) -> Self {
        match error {
            StorageError::Cancelled => Self::Cancelled,
            StorageError::Transient { .. } | StorageError::RetriesExhausted { .. } => {
                Self::TransientStorageFault(error)
            }
            StorageError::SchemaMissing { .. } => Self::SchemaMissing(error),
            StorageError::SchemaCorrupt { .. } => Self::SchemaCorrupt(error),
            other => Self::Storage(other),
        }
    }
}
