use thiserror::Error;

/// All errors produced by the client store crates.
#[derive(Error, Debug)]
pub enum StoreError {
    /// A durable storage entry could not be read.
    #[error("Failed to read storage key {key}: {source}")]
    StorageRead {
        key: String,
        #[source]
        source: std::io::Error,
    },

    /// A durable storage entry could not be written or removed.
    #[error("Failed to write storage key {key}: {source}")]
    StorageWrite {
        key: String,
        #[source]
        source: std::io::Error,
    },

    /// A JSON document could not be parsed or produced.
    #[error("Failed to parse JSON: {0}")]
    JsonParse(#[from] serde_json::Error),

    /// A configuration value is missing or invalid.
    #[error("Configuration error: {0}")]
    Config(String),

    /// User input rejected before it reached the store.
    #[error("Validation failed: {0}")]
    Validation(String),

    /// Pass-through for any raw I/O error that does not carry a key.
    #[error(transparent)]
    Io(#[from] std::io::Error),

    /// Catch-all for errors from third-party crates via `anyhow`.
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

/// Convenience alias used throughout the store crates.
pub type Result<T> = std::result::Result<T, StoreError>;
