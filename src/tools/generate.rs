//! Documentation generation operation.

use crate::error::{DocsError, Result};
use crate::service::DocService;
use crate::tools::Status;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

#[derive(Debug, Clone, Deserialize, schemars::JsonSchema)]
pub struct GenerateDocsRequest {
    /// Path to the crate directory containing a documentation manifest
    pub crate_path: String,
    /// Also ingest dependency manifests found under the crate (default: true)
    #[serde(default = "super::default_true")]
    pub include_dependencies: bool,
    /// Abort the generation if it has not finished after this many seconds
    #[serde(default)]
    pub timeout_secs: Option<u64>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GenerateDocsResponse {
    pub status: Status,
    pub message: String,
    /// Number of documentation items ingested across all crates in the batch.
    pub doc_count: usize,
}

/// Ingest documentation for a crate (and optionally its dependencies).
///
/// Never cached: generation is a write, and its cache effect is
/// invalidation, not population. Failures that leave the corpus unchanged
/// (missing or malformed manifests, timeouts) come back as a structured
/// error response.
pub async fn generate_crate_docs(
    service: &DocService,
    request: GenerateDocsRequest,
) -> Result<GenerateDocsResponse> {
    let path = PathBuf::from(&request.crate_path);
    let timeout = request.timeout_secs.map(Duration::from_secs);

    match service
        .generate_crate_docs(&path, request.include_dependencies, timeout)
        .await
    {
        Ok(doc_count) => Ok(GenerateDocsResponse {
            status: Status::Success,
            message: format!(
                "Generated documentation for '{}' ({} items)",
                request.crate_path, doc_count
            ),
            doc_count,
        }),
        Err(DocsError::Generation(message)) => Ok(GenerateDocsResponse {
            status: Status::Error,
            message,
            doc_count: 0,
        }),
        Err(e) => Err(e),
    }
}
