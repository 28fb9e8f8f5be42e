//! Operation registry.
//!
//! A static table of the operations this service exposes, each with its
//! human-readable description and a JSON schema for its request type, so a
//! hosting layer can enumerate and validate calls without knowing the
//! concrete types.

use crate::tools::details::DocDetailsRequest;
use crate::tools::generate::GenerateDocsRequest;
use crate::tools::search::SearchDocsRequest;
use schemars::{JsonSchema, generate::SchemaSettings};
use std::sync::OnceLock;

/// Descriptor for one externally callable operation.
#[derive(Debug, Clone)]
pub struct OperationSpec {
    pub name: &'static str,
    pub description: &'static str,
    /// Draft-07 JSON schema of the request parameters.
    pub parameters: serde_json::Value,
}

/// All operations, in stable order.
pub fn operations() -> &'static [OperationSpec] {
    static OPERATIONS: OnceLock<Vec<OperationSpec>> = OnceLock::new();
    OPERATIONS.get_or_init(|| {
        vec![
            OperationSpec {
                name: "search_rust_docs",
                description: "Search Rust documentation using fuzzy matching",
                parameters: inline_schema_for_type::<SearchDocsRequest>(),
            },
            OperationSpec {
                name: "get_rust_doc_details",
                description: "Get detailed documentation for a specific Rust item",
                parameters: inline_schema_for_type::<DocDetailsRequest>(),
            },
            OperationSpec {
                name: "generate_crate_docs",
                description: "Generate and process documentation for a specific crate",
                parameters: inline_schema_for_type::<GenerateDocsRequest>(),
            },
        ]
    })
}

/// Look up one operation by name.
pub fn operation(name: &str) -> Option<&'static OperationSpec> {
    operations().iter().find(|op| op.name == name)
}

/// Generate an inline JSON schema for an operation request type.
///
/// `inline_subschemas = true` generates inline definitions instead of $ref
/// patterns, so consumers see self-contained parameter schemas.
fn inline_schema_for_type<T: JsonSchema>() -> serde_json::Value {
    let mut settings = SchemaSettings::draft07();
    settings.transforms = vec![Box::new(schemars::transform::AddNullable::default())];
    settings.inline_subschemas = true;

    let generator = settings.into_generator();
    let schema = generator.into_root_schema_for::<T>();
    serde_json::to_value(schema).unwrap_or(serde_json::Value::Null)
}
