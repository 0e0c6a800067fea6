use darzi_core::CoreError;
use darzi_storage::StorageError;
use thiserror::Error;

/// The three error kinds the UI layer distinguishes: a missing record, bad
/// caller-supplied data, and an underlying storage failure. Nothing is
/// retried here; retries are a caller policy.
#[derive(Debug, Error)]
pub enum ShopError {
    #[error("not found: {0}")]
    NotFound(String),

    #[error("validation failed: {0}")]
    Validation(String),

    #[error("storage failure: {0}")]
    Storage(StorageError),
}

impl From<StorageError> for ShopError {
    fn from(e: StorageError) -> Self {
        match e {
            StorageError::NotFound(what) => ShopError::NotFound(what),
            other => ShopError::Storage(other),
        }
    }
}

impl From<CoreError> for ShopError {
    fn from(e: CoreError) -> Self {
        ShopError::Validation(e.to_string())
    }
}
