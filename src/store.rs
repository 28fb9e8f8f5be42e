//! Corpus store: durable, queryable storage of documentation items per crate.
//!
//! The store is the source of truth for the corpus. Each crate's items live in
//! an immutable [`CrateDocs`] snapshot behind an `Arc`; `put_crate` swaps in a
//! fresh snapshot atomically, so concurrent readers either observe the old
//! corpus or the new one, never a partially written mix. Every successful
//! write bumps a monotonic per-crate revision that the search index uses for
//! staleness checks.
//!
//! Crate records are persisted as pretty-printed JSON under the configured
//! storage directory, one file per crate, written via temp-file + rename.

use crate::error::{DocsError, Result};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{SystemTime, UNIX_EPOCH};
use tokio::sync::RwLock;

/// The kind of a documented entity. Closed set; immutable after creation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, schemars::JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum ItemKind {
    Function,
    Struct,
    Trait,
    Method,
    Module,
    Constant,
}

impl ItemKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Function => "function",
            Self::Struct => "struct",
            Self::Trait => "trait",
            Self::Method => "method",
            Self::Module => "module",
            Self::Constant => "constant",
        }
    }
}

/// One documented entity, identified by its fully-qualified path
/// (e.g. `std::vec::Vec::push`).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, schemars::JsonSchema)]
pub struct DocItem {
    /// Fully-qualified path, unique within the owning crate.
    pub path: String,
    /// Entity kind.
    pub kind: ItemKind,
    /// Signature text, e.g. `pub fn push(&mut self, value: T)`.
    #[serde(default)]
    pub signature: String,
    /// One-line description.
    #[serde(default)]
    pub summary: String,
    /// Long-form description.
    #[serde(default)]
    pub description: String,
    /// Ordered example code blocks; possibly empty.
    #[serde(default)]
    pub examples: Vec<String>,
    /// Name of the owning crate.
    pub crate_name: String,
    /// Path of the containing item, if any. Back-reference only; the parent
    /// does not own this item through it.
    #[serde(default)]
    pub parent: Option<String>,
    /// Paths of child methods, for types.
    #[serde(default)]
    pub methods: Vec<String>,
}

/// A named, versioned unit of documentation and the items it owns.
///
/// Snapshots are immutable once stored; superseding a crate replaces the
/// whole snapshot.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CrateDocs {
    pub name: String,
    pub version: String,
    /// Dependency crate names. Recorded regardless of whether their docs
    /// were ingested.
    #[serde(default)]
    pub dependencies: Vec<String>,
    /// Unix timestamp (seconds) of the generation that produced this snapshot.
    pub generated_at: u64,
    /// Items keyed by path. BTreeMap keeps listing order deterministic.
    items: BTreeMap<String, DocItem>,
}

impl CrateDocs {
    /// Assemble a crate snapshot, validating every item before accepting any.
    ///
    /// Rejected inputs: an empty item path, an item whose `crate_name` does
    /// not match the crate, or a duplicate path.
    pub fn new(
        name: String,
        version: String,
        dependencies: Vec<String>,
        items: Vec<DocItem>,
    ) -> Result<Self> {
        if name.is_empty() {
            return Err(DocsError::Validation("crate name must not be empty".into()));
        }

        let mut map = BTreeMap::new();
        for item in items {
            if item.path.is_empty() {
                return Err(DocsError::Validation(format!(
                    "item in crate '{name}' has an empty path"
                )));
            }
            if item.crate_name != name {
                return Err(DocsError::Validation(format!(
                    "item '{}' claims crate '{}' but is being stored in '{}'",
                    item.path, item.crate_name, name
                )));
            }
            if map.insert(item.path.clone(), item).is_some() {
                return Err(DocsError::Validation(format!(
                    "duplicate item path in crate '{name}'"
                )));
            }
        }

        Ok(Self {
            name,
            version,
            dependencies,
            generated_at: unix_now(),
            items: map,
        })
    }

    /// Look up one item by path.
    pub fn get(&self, path: &str) -> Option<&DocItem> {
        self.items.get(path)
    }

    /// All items in deterministic (path) order.
    pub fn items(&self) -> impl Iterator<Item = &DocItem> {
        self.items.values()
    }

    pub fn item_count(&self) -> usize {
        self.items.len()
    }
}

/// Per-crate slot: the current snapshot and the revision it belongs to.
#[derive(Clone)]
struct CrateSlot {
    docs: Arc<CrateDocs>,
    revision: u64,
}

/// Thread-safe corpus store backed by a storage directory.
pub struct CorpusStore {
    db_path: PathBuf,
    crates: RwLock<HashMap<String, CrateSlot>>,
    /// Monotonic revision counter shared across crates.
    next_revision: AtomicU64,
}

impl CorpusStore {
    /// Create a store rooted at `db_path`, creating the directory if needed.
    pub async fn open(db_path: &Path) -> Result<Self> {
        tokio::fs::create_dir_all(db_path).await?;
        Ok(Self {
            db_path: db_path.to_path_buf(),
            crates: RwLock::new(HashMap::new()),
            next_revision: AtomicU64::new(1),
        })
    }

    /// Load persisted crate records for the given crate names, skipping any
    /// that have no record on disk.
    ///
    /// Returns the names that were actually loaded.
    pub async fn load_persisted(&self, crate_names: &[String]) -> Vec<String> {
        let mut loaded = Vec::new();
        for name in crate_names {
            let path = self.record_path(name);
            let text = match tokio::fs::read_to_string(&path).await {
                Ok(text) => text,
                Err(_) => {
                    tracing::debug!("No persisted docs for '{}' at {}", name, path.display());
                    continue;
                }
            };
            match serde_json::from_str::<CrateDocs>(&text) {
                Ok(docs) => {
                    let revision = self.next_revision.fetch_add(1, Ordering::SeqCst);
                    self.crates.write().await.insert(
                        name.clone(),
                        CrateSlot { docs: Arc::new(docs), revision },
                    );
                    loaded.push(name.clone());
                }
                Err(e) => {
                    tracing::warn!("Ignoring corrupt crate record {}: {}", path.display(), e);
                }
            }
        }
        if !loaded.is_empty() {
            tracing::info!("Loaded persisted docs for: {}", loaded.join(", "));
        }
        loaded
    }

    /// Atomically replace all items for a crate.
    ///
    /// Persist and swap happen under the write lock, so the served snapshot
    /// and the on-disk record always move together; on any failure the
    /// previous snapshot stays in place, in memory and on disk. Returns the
    /// new revision.
    pub async fn put_crate(&self, docs: CrateDocs) -> Result<u64> {
        let name = docs.name.clone();
        let mut crates = self.crates.write().await;
        self.persist(&docs).await?;

        let revision = self.next_revision.fetch_add(1, Ordering::SeqCst);
        crates.insert(name.clone(), CrateSlot { docs: Arc::new(docs), revision });
        tracing::debug!("Stored crate '{}' at revision {}", name, revision);
        Ok(revision)
    }

    /// Restore a previous snapshot for a crate (generation rollback), in
    /// memory and on disk. `None` removes the crate entirely, including its
    /// persisted record, so a restart cannot resurrect the rolled-back state.
    pub(crate) async fn restore_snapshot(&self, name: &str, snapshot: Option<Arc<CrateDocs>>) {
        let mut crates = self.crates.write().await;
        match snapshot {
            Some(docs) => {
                if let Err(e) = self.persist(&docs).await {
                    tracing::warn!("Failed to re-persist '{}' during rollback: {}", name, e);
                }
                let revision = self.next_revision.fetch_add(1, Ordering::SeqCst);
                crates.insert(name.to_string(), CrateSlot { docs, revision });
            }
            None => {
                crates.remove(name);
                if let Err(e) = tokio::fs::remove_file(self.record_path(name)).await
                    && e.kind() != std::io::ErrorKind::NotFound
                {
                    tracing::warn!("Failed to remove record for '{}' during rollback: {}", name, e);
                }
            }
        }
    }

    /// Current snapshot of a crate, if present.
    pub async fn get_crate(&self, name: &str) -> Option<Arc<CrateDocs>> {
        self.crates.read().await.get(name).map(|slot| slot.docs.clone())
    }

    /// Current revision of a crate, if present.
    pub async fn revision(&self, name: &str) -> Option<u64> {
        self.crates.read().await.get(name).map(|slot| slot.revision)
    }

    /// Names of all stored crates, sorted.
    pub async fn crate_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.crates.read().await.keys().cloned().collect();
        names.sort();
        names
    }

    /// Look up an item by its fully-qualified path. The first path segment
    /// names the crate.
    pub async fn get_item(&self, path: &str) -> Result<DocItem> {
        if path.is_empty() {
            return Err(DocsError::Validation("item path must not be empty".into()));
        }
        let crate_name = path.split("::").next().unwrap_or(path);
        let docs = self
            .get_crate(crate_name)
            .await
            .ok_or_else(|| DocsError::NotFound(format!("crate '{crate_name}' is not in the corpus")))?;
        docs.get(path)
            .cloned()
            .ok_or_else(|| DocsError::NotFound(format!("no documentation for '{path}'")))
    }

    /// List items, optionally restricted to one crate, in deterministic
    /// order (crate name, then item path).
    pub async fn list_items(&self, crate_name: Option<&str>) -> Result<Vec<DocItem>> {
        match crate_name {
            Some(name) => {
                let docs = self.get_crate(name).await.ok_or_else(|| {
                    DocsError::NotFound(format!("crate '{name}' is not in the corpus"))
                })?;
                Ok(docs.items().cloned().collect())
            }
            None => {
                let mut all = Vec::new();
                for name in self.crate_names().await {
                    if let Some(docs) = self.get_crate(&name).await {
                        all.extend(docs.items().cloned());
                    }
                }
                Ok(all)
            }
        }
    }

    /// Write a crate record to disk via temp-file + rename.
    async fn persist(&self, docs: &CrateDocs) -> Result<()> {
        let final_path = self.record_path(&docs.name);
        let tmp_path = final_path.with_extension("json.tmp");

        let content = serde_json::to_string_pretty(docs)?;
        tokio::fs::write(&tmp_path, content).await?;
        tokio::fs::rename(&tmp_path, &final_path).await?;
        tracing::debug!("Persisted crate record to {}", final_path.display());
        Ok(())
    }

    fn record_path(&self, crate_name: &str) -> PathBuf {
        // Hyphens normalize to underscores, matching rustdoc file naming.
        self.db_path.join(format!("{}.json", crate_name.replace('-', "_")))
    }
}

fn unix_now() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0)
}
