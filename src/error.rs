//! Error handling types and utilities.

/// Errors produced by the documentation search engine.
///
/// Every operation boundary maps these to a structured `{status, message}`
/// response; none of them are allowed to take the process down.
#[derive(Debug, thiserror::Error)]
pub enum DocsError {
    /// Malformed caller input. The operation aborts with no state mutated.
    #[error("invalid input: {0}")]
    Validation(String),

    /// A requested item or crate is absent from the corpus.
    #[error("not found: {0}")]
    NotFound(String),

    /// Corpus ingestion failed partway; the store was rolled back.
    #[error("documentation generation failed: {0}")]
    Generation(String),

    /// Underlying storage I/O failure.
    #[error("storage error: {0}")]
    Storage(#[from] std::io::Error),

    /// Corpus record or cache value (de)serialization failure.
    #[error("serialization error: {0}")]
    Serde(#[from] serde_json::Error),
}

impl DocsError {
    /// Human-readable message for the structured response `message` field.
    pub fn message(&self) -> String {
        self.to_string()
    }
}

/// A specialized Result type for documentation search operations.
pub type Result<T> = std::result::Result<T, DocsError>;
