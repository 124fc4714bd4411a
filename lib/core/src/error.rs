use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Error, Debug)]
pub enum Error {
    #[error("schema error in field '{field}': {reason}")]
    Schema { field: String, reason: String },

    #[error("feature assembly failed: {0}")]
    FeatureAssembly(String),

    #[error("training failed: {0}")]
    Training(String),

    #[error("schema mismatch: {0}")]
    SchemaMismatch(String),

    #[error("training already in flight for dataset version {0}")]
    RegistryConflict(u64),

    #[error("dataset version not found: {0}")]
    DatasetNotFound(u64),

    #[error("model version not found: {0}")]
    ModelNotFound(u64),

    #[error("storage error: {0}")]
    Storage(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("serialization error: {0}")]
    Serialization(String),
}

impl Error {
    /// Shorthand for a schema violation tied to one input field.
    pub fn schema(field: impl Into<String>, reason: impl Into<String>) -> Self {
        Error::Schema {
            field: field.into(),
            reason: reason.into(),
        }
    }

    /// Whether the caller may retry the same request later unchanged.
    /// Only conflicts with an in-flight training run qualify.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Error::RegistryConflict(_))
    }
}

impl From<serde_json::Error> for Error {
    fn from(e: serde_json::Error) -> Self {
        Error::Serialization(e.to_string())
    }
}
