//! Detailed documentation lookup for a single item.

use crate::cache::CacheKey;
use crate::error::{DocsError, Result};
use crate::service::DocService;
use crate::store::ItemKind;
use crate::tools::Status;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Deserialize, schemars::JsonSchema)]
pub struct DocDetailsRequest {
    /// Fully-qualified item path, e.g. `std::vec::Vec::push`
    pub item_path: String,
    /// Include code examples in the response (default: true)
    #[serde(default = "super::default_true")]
    pub include_examples: bool,
    /// Include method listings for container items (default: true)
    #[serde(default = "super::default_true")]
    pub include_methods: bool,
}

/// Full documentation payload for one item. Every field is always present;
/// omitted sections are empty rather than absent.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Documentation {
    pub path: String,
    pub kind: Option<ItemKind>,
    pub signature: String,
    pub summary: String,
    pub description: String,
    pub examples: Vec<String>,
    pub crate_name: String,
    pub parent: Option<String>,
    pub methods: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DocDetailsResponse {
    pub status: Status,
    pub message: String,
    pub documentation: Documentation,
}

/// Look up one item by its exact path.
///
/// A path that resolves to nothing is an expected outcome, not a transport
/// failure: the response carries `status: error` and an empty documentation
/// payload so callers always see the same shape.
pub async fn get_rust_doc_details(
    service: &DocService,
    request: DocDetailsRequest,
) -> Result<DocDetailsResponse> {
    let key = cache_key(&request);
    let value = service
        .cache()
        .get_or_compute(key, service.cache_ttl(), || run_lookup(service, &request))
        .await?;
    Ok(serde_json::from_value(value)?)
}

async fn run_lookup(
    service: &DocService,
    request: &DocDetailsRequest,
) -> Result<serde_json::Value> {
    let response = match service.get_item(&request.item_path).await {
        Ok(item) => DocDetailsResponse {
            status: Status::Success,
            message: format!("Documentation for '{}'", item.path),
            documentation: Documentation {
                path: item.path,
                kind: Some(item.kind),
                signature: item.signature,
                summary: item.summary,
                description: item.description,
                examples: if request.include_examples {
                    item.examples
                } else {
                    vec![]
                },
                crate_name: item.crate_name,
                parent: item.parent,
                methods: if request.include_methods {
                    item.methods
                } else {
                    vec![]
                },
            },
        },
        Err(DocsError::NotFound(_)) => DocDetailsResponse {
            status: Status::Error,
            message: format!("No documentation found for '{}'", request.item_path),
            documentation: Documentation::default(),
        },
        Err(e) => return Err(e),
    };
    Ok(serde_json::to_value(response)?)
}

fn cache_key(request: &DocDetailsRequest) -> CacheKey {
    CacheKey {
        op: "get_rust_doc_details",
        params: format!(
            "path={}&examples={}&methods={}",
            request.item_path, request.include_examples, request.include_methods,
        ),
        // The first path segment names the owning crate.
        crate_scope: request
            .item_path
            .split("::")
            .next()
            .map(ToString::to_string),
    }
}
