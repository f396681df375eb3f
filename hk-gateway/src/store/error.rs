//! Store error types.

/// Errors from persisting or loading the store snapshot.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// Snapshot file could not be read or written
    #[error("snapshot I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Snapshot file is not valid JSON
    #[error("snapshot JSON error: {0}")]
    Json(#[from] serde_json::Error),
}
