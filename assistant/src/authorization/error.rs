//! Authorization Error Types

use thiserror::Error;

use crate::api::ApiError;
use crate::storage::StorageError;

/// Errors from an authorization pass.
#[derive(Debug, Error)]
pub enum AuthorizeError {
    /// No acting user was given.
    #[error("User ID is required for authorization")]
    MissingUserId,

    /// A newer authorization pass started before this one finished.
    #[error("Authorization pass superseded by a newer one")]
    Superseded,

    /// The membership list could not be fetched.
    #[error("Upstream error: {0}")]
    Upstream(#[from] ApiError),

    /// The authorized set could not be persisted.
    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),
}
