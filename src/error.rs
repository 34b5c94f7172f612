use thiserror::Error;

/// Result alias for every fallible operation in the persistence layer.
pub type Result<T> = std::result::Result<T, StorageError>;

/// Failures raised while building, writing or reading sweep data.
#[derive(Debug, Error)]
pub enum StorageError {
    // ---- Collaborator failures, surfaced verbatim ----
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("Parquet error: {0}")]
    Parquet(#[from] parquet::errors::ParquetError),

    #[error("Arrow error: {0}")]
    Arrow(#[from] arrow::error::ArrowError),

    #[error("array shape error: {0}")]
    Shape(#[from] ndarray::ShapeError),

    // ---- Metadata ----
    /// A required metadata key (`param_name`, `param_vals`) is missing.
    #[error("metadata is missing required key '{key}'")]
    MissingKey { key: String },

    /// A required metadata key is present but holds the wrong kind of value.
    #[error("metadata key '{key}': {reason}")]
    InvalidMetadata { key: String, reason: String },

    /// Two system parameters flatten onto the same metadata key.
    #[error("metadata key '{key}' occurs more than once after flattening")]
    KeyCollision { key: String },

    // ---- Data fields ----
    #[error("shape mismatch for {what}: expected {expected:?}, got {actual:?}")]
    ShapeMismatch {
        what: String,
        expected: Vec<usize>,
        actual: Vec<usize>,
    },

    #[error("required data field '{name}' is missing")]
    MissingField { name: String },

    #[error("data field '{name}' is not accepted by this type")]
    UnexpectedField { name: String },

    #[error("data field '{name}': {reason}")]
    InvalidField { name: String, reason: String },

    // ---- File structure ----
    #[error("malformed file: {0}")]
    Malformed(String),

    #[error("unsupported file format: {0}")]
    UnsupportedFormat(String),
}
