use thiserror::Error;

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("sqlite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("serialization error: {0}")]
    Serialization(String),

    #[error("not found: {0}")]
    NotFound(String),

    #[error("daily id sequence exhausted for {0}")]
    SequenceExhausted(String),

    #[error("unsupported schema version {found} (this build supports up to {supported})")]
    SchemaTooNew { found: i32, supported: i32 },

    #[error("core error: {0}")]
    Core(#[from] darzi_core::CoreError),
}
