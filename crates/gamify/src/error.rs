//! Engine error taxonomy.

use questlog_storage::StorageError;

/// Result type for engine operations.
pub type Result<T> = std::result::Result<T, GamifyError>;

/// Errors the gamification engine can return.
///
/// Achievement double-completion races are deliberately absent: they are
/// resolved by the store's check-and-set contract, not reported as errors.
#[derive(Debug, thiserror::Error)]
pub enum GamifyError {
    /// Bad action, difficulty or condition parameters - the caller's
    /// fault; retrying the same call cannot succeed.
    #[error("validation error: {0}")]
    Validation(String),

    /// Unknown user.
    #[error("not found: {0}")]
    NotFound(String),

    /// Collaborator failure, propagated unchanged. The engine performs no
    /// retries; exactly-once application is the store's responsibility.
    #[error("storage error: {0}")]
    Storage(StorageError),
}

impl From<StorageError> for GamifyError {
    fn from(e: StorageError) -> Self {
        match e {
            StorageError::NotFound(what) => Self::NotFound(what),
            other => Self::Storage(other),
        }
    }
}
