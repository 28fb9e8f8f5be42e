//! Shared test fixtures and utilities for integration tests.
//!
//! Each test gets a fresh temporary storage directory and its own
//! [`DocService`] with an empty cache, so tests can run in parallel without
//! interference. The `seeded_service` fixture ships a small standard-library
//! corpus; `empty_service` starts with nothing stored.

use rstest::fixture;
use rust_docs_search::{CrateDocs, DocItem, DocService, ItemKind, ServerConfig};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tempfile::TempDir;

/// A service backed by an isolated temporary storage directory.
///
/// The temp directory must outlive the service, so tests receive this
/// wrapper rather than a bare `DocService`.
pub struct TestService {
    _temp: TempDir,
    db: PathBuf,
    pub service: Arc<DocService>,
}

impl TestService {
    /// The storage directory the service persists crate records into.
    #[allow(dead_code)] // Used across different integration test crates
    pub fn db_path(&self) -> &Path {
        &self.db
    }
}

/// Build a documentation item with the fields most tests care about.
pub fn item(path: &str, kind: ItemKind, summary: &str) -> DocItem {
    let crate_name = path.split("::").next().unwrap_or(path).to_string();
    DocItem {
        path: path.to_string(),
        kind,
        signature: String::new(),
        summary: summary.to_string(),
        description: String::new(),
        examples: vec![],
        crate_name,
        parent: None,
        methods: vec![],
    }
}

/// A small standard-library corpus covering the common search targets.
pub fn std_corpus() -> CrateDocs {
    let items = vec![
        item(
            "std::vec::Vec::push",
            ItemKind::Method,
            "Appends an element to the back of a collection",
        ),
        item(
            "std::vec::Vec::pop",
            ItemKind::Method,
            "Removes the last element and returns it",
        ),
        item("std::vec::Vec", ItemKind::Struct, "A contiguous growable array type"),
        item(
            "std::collections::HashMap",
            ItemKind::Struct,
            "A hash map implemented with quadratic probing",
        ),
        item("std::string::String", ItemKind::Struct, "A UTF-8 encoded, growable string"),
        item("std::fs::read_to_string", ItemKind::Function, "Reads a file into a string"),
    ];
    CrateDocs::new("std".to_string(), "1.0.0".to_string(), vec![], items)
        .expect("std corpus fixture must be valid")
}

fn build_service(seed: bool) -> TestService {
    let temp = TempDir::new().expect("Failed to create temp directory");
    let db = temp.path().join("db");
    let config = ServerConfig {
        db_path: db.clone(),
        default_crates: vec![],
        ..ServerConfig::default()
    };

    let service = tokio::task::block_in_place(|| {
        tokio::runtime::Handle::current().block_on(async {
            let service = DocService::new(config)
                .await
                .expect("Failed to create service");
            if seed {
                service
                    .put_crate(std_corpus())
                    .await
                    .expect("Failed to seed std corpus");
            }
            service
        })
    });

    TestService {
        _temp: temp,
        db,
        service: Arc::new(service),
    }
}

/// A service pre-seeded with the standard-library corpus.
#[fixture]
pub fn seeded_service() -> TestService {
    build_service(true)
}

/// A service with nothing stored.
#[fixture]
#[allow(dead_code)] // Used across different integration test crates
pub fn empty_service() -> TestService {
    build_service(false)
}

/// Write a documentation manifest into `dir` as `docs.json`.
#[allow(dead_code)] // Used in generation tests
pub fn write_manifest(dir: &Path, manifest: &serde_json::Value) {
    std::fs::write(
        dir.join("docs.json"),
        serde_json::to_string_pretty(manifest).expect("manifest fixture must serialize"),
    )
    .expect("Failed to write manifest");
}
