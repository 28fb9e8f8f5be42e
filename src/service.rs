//! Shared documentation service state.
//!
//! [`DocService`] wires the corpus store, per-crate search indexes, the
//! result cache, and per-crate generation locks behind one shared value.
//! Requests run concurrently; mutations to a single crate's store-and-index
//! pair are serialized by that crate's generation lock, and readers always
//! see a consistent snapshot (pre- or post-write, never a mix). Operations
//! on one crate never wait on another crate's generation.

use crate::cache::ResultCache;
use crate::config::ServerConfig;
use crate::error::{DocsError, Result};
use crate::search::{SearchHit, SearchIndex, Tokenizer, search_indexes};
use crate::store::{CorpusStore, CrateDocs, DocItem};
use serde::Deserialize;
use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{Mutex, OwnedMutexGuard, RwLock};

/// Name of the standard-library documentation set.
pub const STD_CRATE: &str = "std";

/// File name of the structured documentation manifest an external extraction
/// step leaves in a crate directory.
pub const MANIFEST_FILE: &str = "docs.json";

/// Raw documentation manifest as produced by the external ingestion step.
#[derive(Debug, Deserialize)]
pub struct DocManifest {
    pub name: String,
    #[serde(default = "default_version")]
    pub version: String,
    #[serde(default)]
    pub dependencies: Vec<String>,
    #[serde(default)]
    pub items: Vec<DocItem>,
}

fn default_version() -> String {
    "0.0.0".to_string()
}

/// Central coordination point for search, retrieval, and generation.
pub struct DocService {
    config: ServerConfig,
    store: CorpusStore,
    /// Per-crate search indexes, rebuilt lazily when stale.
    indexes: RwLock<HashMap<String, Arc<SearchIndex>>>,
    cache: ResultCache,
    /// Per-crate generation locks. A generation locks every crate its batch
    /// will commit; unrelated crates proceed independently.
    generation_locks: Mutex<HashMap<String, Arc<Mutex<()>>>>,
}

impl DocService {
    /// Create a service from an immutable configuration, opening the storage
    /// directory and loading persisted docs for the configured default
    /// crates.
    pub async fn new(config: ServerConfig) -> Result<Self> {
        let store = CorpusStore::open(&config.db_path).await?;
        store.load_persisted(&config.default_crates).await;

        let cache = ResultCache::new(config.cache_size_limit);
        Ok(Self {
            config,
            store,
            indexes: RwLock::new(HashMap::new()),
            cache,
            generation_locks: Mutex::new(HashMap::new()),
        })
    }

    pub fn config(&self) -> &ServerConfig {
        &self.config
    }

    pub fn store(&self) -> &CorpusStore {
        &self.store
    }

    pub fn cache(&self) -> &ResultCache {
        &self.cache
    }

    /// Configured cache TTL as a `Duration`.
    pub fn cache_ttl(&self) -> Duration {
        Duration::from_secs(self.config.cache_ttl)
    }

    /// Replace a crate's documentation, invalidating its search index and
    /// every cache entry that references it (including corpus-wide entries).
    pub async fn put_crate(&self, docs: CrateDocs) -> Result<usize> {
        let name = docs.name.clone();
        let count = docs.item_count();

        self.store.put_crate(docs).await?;
        self.indexes.write().await.remove(&name);
        let removed = self
            .cache
            .invalidate(|key| key.crate_scope.as_deref() == Some(name.as_str()) || key.crate_scope.is_none());
        tracing::debug!(
            "Stored {} items for '{}', invalidated {} cache entries",
            count,
            name,
            removed
        );
        Ok(count)
    }

    /// Return the crate's search index, rebuilding it only if the store has
    /// moved past the revision it was built from.
    ///
    /// Idempotent: a second call without an intervening write returns the
    /// same index without rebuilding.
    pub async fn rebuild_if_stale(&self, crate_name: &str) -> Result<Arc<SearchIndex>> {
        let revision = self
            .store
            .revision(crate_name)
            .await
            .ok_or_else(|| DocsError::NotFound(format!("crate '{crate_name}' is not in the corpus")))?;

        if let Some(index) = self.indexes.read().await.get(crate_name)
            && index.is_current(revision)
        {
            return Ok(index.clone());
        }

        let docs = self
            .store
            .get_crate(crate_name)
            .await
            .ok_or_else(|| DocsError::NotFound(format!("crate '{crate_name}' is not in the corpus")))?;

        // Build outside the lock so searches on other crates aren't stalled.
        let index = Arc::new(SearchIndex::build(&docs, revision, &Tokenizer::new()));

        let mut indexes = self.indexes.write().await;
        match indexes.get(crate_name) {
            // A concurrent rebuild got there first with the same or a newer
            // revision; keep it.
            Some(existing) if existing.revision() >= revision => Ok(existing.clone()),
            _ => {
                indexes.insert(crate_name.to_string(), index.clone());
                Ok(index)
            }
        }
    }

    /// Fuzzy-search the corpus.
    ///
    /// `crate_filter` restricts candidates to one crate (unknown names are a
    /// validation error); otherwise all stored crates are searched, with
    /// `include_std = false` excluding the standard library set. The result
    /// cap is the smaller of `max_results` and the configured maximum.
    pub async fn search(
        &self,
        query: &str,
        crate_filter: Option<&str>,
        max_results: usize,
        include_std: bool,
    ) -> Result<Vec<SearchHit>> {
        let query_tokens = Tokenizer::new().query_tokens(query);
        if query_tokens.is_empty() {
            return Ok(vec![]);
        }

        let crate_names: Vec<String> = match crate_filter {
            Some(name) => {
                if self.store.revision(name).await.is_none() {
                    return Err(DocsError::Validation(format!(
                        "unknown crate '{name}': generate its documentation first"
                    )));
                }
                vec![name.to_string()]
            }
            None => self
                .store
                .crate_names()
                .await
                .into_iter()
                .filter(|name| include_std || name != STD_CRATE)
                .collect(),
        };

        let mut indexes = Vec::with_capacity(crate_names.len());
        for name in &crate_names {
            indexes.push(self.rebuild_if_stale(name).await?);
        }

        let limit = max_results.min(self.config.max_search_results);
        Ok(search_indexes(
            &indexes,
            &query_tokens,
            self.config.fuzzy_match_threshold,
            limit,
        ))
    }

    /// Exact-path item lookup.
    pub async fn get_item(&self, path: &str) -> Result<DocItem> {
        self.store.get_item(path).await
    }

    /// Ingest documentation for the crate at `crate_path` from its manifest.
    ///
    /// With `include_dependencies`, dependency manifests found under
    /// `crate_path/deps/` are ingested as their own crates; dependencies
    /// without a manifest are recorded by name only. The whole batch is
    /// validated before anything is committed; `timeout` bounds everything up
    /// to the commit (manifest reads, validation, waiting on other
    /// generations), and a failure or timeout leaves the store — memory and
    /// disk — at its pre-operation state. Returns the total number of items
    /// ingested.
    pub async fn generate_crate_docs(
        &self,
        crate_path: &Path,
        include_dependencies: bool,
        timeout: Option<Duration>,
    ) -> Result<usize> {
        // The prepare phase is cancellation-safe; the commit loop is not (a
        // cancelled commit would skip its own rollback), so the timeout
        // covers prepare and lock acquisition only.
        let prepare = self.prepare_generation(crate_path, include_dependencies);
        let (batch, _guards) = match timeout {
            Some(t) => tokio::time::timeout(t, prepare).await.map_err(|_| {
                DocsError::Generation(format!(
                    "generation from {} timed out after {}s",
                    crate_path.display(),
                    t.as_secs()
                ))
            })??,
            None => prepare.await?,
        };

        self.commit_generation(batch).await
    }

    /// Read and validate the full ingestion batch without touching the
    /// store, then take the generation lock of every crate in the batch.
    async fn prepare_generation(
        &self,
        crate_path: &Path,
        include_dependencies: bool,
    ) -> Result<(Vec<CrateDocs>, Vec<OwnedMutexGuard<()>>)> {
        let manifest = load_manifest(&crate_path.join(MANIFEST_FILE)).await?;
        let dependencies = manifest.dependencies.clone();
        let mut batch = vec![docs_from_manifest(manifest)?];

        if include_dependencies {
            for dep in &dependencies {
                let dep_path = crate_path
                    .join("deps")
                    .join(format!("{}.json", dep.replace('-', "_")));
                if !tokio::fs::try_exists(&dep_path).await.unwrap_or(false) {
                    tracing::warn!(
                        "No manifest for dependency '{}' at {}; recording name only",
                        dep,
                        dep_path.display()
                    );
                    continue;
                }
                let dep_manifest = load_manifest(&dep_path).await?;
                batch.push(docs_from_manifest(dep_manifest)?);
            }
        }

        // Every crate the commit will touch gets locked, dependencies
        // included, so two batches sharing a dependency serialize on it.
        // Sorted acquisition order prevents deadlock between such batches.
        let mut names: Vec<String> = batch.iter().map(|docs| docs.name.clone()).collect();
        names.sort();
        names.dedup();
        let mut guards = Vec::with_capacity(names.len());
        for name in names {
            let lock = self.generation_lock(&name).await;
            guards.push(lock.lock_owned().await);
        }

        Ok((batch, guards))
    }

    /// Commit a validated batch crate by crate, rolling back
    /// already-committed crates (served snapshots and their persisted
    /// records) if a later one fails.
    async fn commit_generation(&self, batch: Vec<CrateDocs>) -> Result<usize> {
        let mut committed: Vec<(String, Option<Arc<CrateDocs>>)> = Vec::new();
        let mut total = 0;

        for docs in batch {
            let name = docs.name.clone();
            let previous = self.store.get_crate(&name).await;
            match self.put_crate(docs).await {
                Ok(count) => {
                    committed.push((name, previous));
                    total += count;
                }
                Err(e) => {
                    tracing::warn!("Generation failed while committing '{}', rolling back: {}", name, e);
                    for (name, snapshot) in committed.into_iter().rev() {
                        self.store.restore_snapshot(&name, snapshot).await;
                        self.indexes.write().await.remove(&name);
                        self.cache.invalidate(|key| {
                            key.crate_scope.as_deref() == Some(name.as_str())
                                || key.crate_scope.is_none()
                        });
                    }
                    return Err(DocsError::Generation(e.to_string()));
                }
            }
        }

        Ok(total)
    }

    async fn generation_lock(&self, crate_name: &str) -> Arc<Mutex<()>> {
        let mut locks = self.generation_locks.lock().await;
        locks
            .entry(crate_name.to_string())
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone()
    }
}

/// Validate a manifest into a store snapshot. Content problems (empty or
/// duplicate paths, crate-name mismatches) are generation failures.
fn docs_from_manifest(manifest: DocManifest) -> Result<CrateDocs> {
    CrateDocs::new(
        manifest.name,
        manifest.version,
        manifest.dependencies,
        manifest.items,
    )
    .map_err(|e| DocsError::Generation(e.to_string()))
}

/// Read a documentation manifest from disk.
async fn load_manifest(path: &Path) -> Result<DocManifest> {
    let text = tokio::fs::read_to_string(path).await.map_err(|e| {
        DocsError::Generation(format!("cannot read manifest {}: {}", path.display(), e))
    })?;
    serde_json::from_str(&text).map_err(|e| {
        DocsError::Generation(format!("malformed manifest {}: {}", path.display(), e))
    })
}
