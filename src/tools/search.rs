//! Fuzzy documentation search operation.

use crate::cache::CacheKey;
use crate::error::{DocsError, Result};
use crate::service::DocService;
use crate::tools::Status;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Deserialize, schemars::JsonSchema)]
pub struct SearchDocsRequest {
    /// Search query term
    pub query: String,
    /// Restrict results to a single crate
    #[serde(default, rename = "crate")]
    pub crate_name: Option<String>,
    /// Maximum number of results to return (default: 5)
    #[serde(default = "default_max_results")]
    pub max_results: usize,
    /// Include standard library items in unfiltered searches (default: true)
    #[serde(default = "super::default_true")]
    pub include_std: bool,
}

fn default_max_results() -> usize {
    5
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchResultEntry {
    /// Fully-qualified item path.
    pub path: String,
    /// Similarity score in `[0.0, 1.0]`.
    pub score: f64,
    /// One-line summary, if the item has one.
    pub summary: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchDocsResponse {
    pub status: Status,
    pub message: String,
    pub results: Vec<SearchResultEntry>,
}

/// Execute a fuzzy search over the documentation corpus.
///
/// Results are served from the cache when an identical request (after
/// normalization) was answered within the TTL. Invalid input (an unknown
/// crate filter) comes back as a structured error response with no results;
/// it is never cached.
pub async fn search_rust_docs(
    service: &DocService,
    request: SearchDocsRequest,
) -> Result<SearchDocsResponse> {
    let key = cache_key(&request);
    let outcome = service
        .cache()
        .get_or_compute(key, service.cache_ttl(), || run_search(service, &request))
        .await;

    match outcome {
        Ok(value) => Ok(serde_json::from_value(value)?),
        Err(DocsError::Validation(message)) => Ok(SearchDocsResponse {
            status: Status::Error,
            message,
            results: vec![],
        }),
        Err(e) => Err(e),
    }
}

async fn run_search(
    service: &DocService,
    request: &SearchDocsRequest,
) -> Result<serde_json::Value> {
    let hits = service
        .search(
            &request.query,
            request.crate_name.as_deref(),
            request.max_results,
            request.include_std,
        )
        .await?;

    let mut results = Vec::with_capacity(hits.len());
    for hit in hits {
        let summary = match service.get_item(&hit.path).await {
            Ok(item) => item.summary,
            // The index briefly outliving a store write is fine; skip the
            // summary rather than fail the whole search.
            Err(_) => String::new(),
        };
        results.push(SearchResultEntry {
            path: hit.path,
            score: hit.score,
            summary,
        });
    }

    let message = if results.is_empty() {
        format!("No matches for '{}'", request.query)
    } else {
        format!("Found {} matching items", results.len())
    };

    Ok(serde_json::to_value(SearchDocsResponse {
        status: Status::Success,
        message,
        results,
    })?)
}

/// Cache key over the normalized request: tokenization happens later, so two
/// requests differing only in parameter order or defaults collapse here.
fn cache_key(request: &SearchDocsRequest) -> CacheKey {
    CacheKey {
        op: "search_rust_docs",
        params: format!(
            "q={}&crate={}&max={}&std={}",
            request.query.trim().to_lowercase(),
            request.crate_name.as_deref().unwrap_or(""),
            request.max_results,
            request.include_std,
        ),
        crate_scope: request.crate_name.clone(),
    }
}
