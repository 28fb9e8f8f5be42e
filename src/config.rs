//! Server configuration with layered loading.
//!
//! Configuration is resolved once at startup from three layers: built-in
//! defaults, `RUST_DOCS_*` environment variables, and an optional JSON config
//! file (file wins over environment, both win over defaults). The resolved
//! [`ServerConfig`] is immutable and passed explicitly into each component;
//! there is no process-wide mutable configuration.
//!
//! A value that fails to parse or validate is replaced by the built-in
//! default for that field only, with a logged warning. Loading never fails.

use anyhow::Context;
use serde::Deserialize;
use std::path::{Path, PathBuf};

/// Default storage directory for persisted crate documentation.
const DEFAULT_DB_PATH: &str = "./rust_docs_db";

/// Default cache size limit: 1 GiB.
const DEFAULT_CACHE_SIZE_LIMIT: u64 = 1024 * 1024 * 1024;

/// Default cache entry time-to-live: 7 days.
const DEFAULT_CACHE_TTL_SECS: u64 = 7 * 24 * 60 * 60;

/// Default cap on search results, regardless of what callers request.
const DEFAULT_MAX_SEARCH_RESULTS: usize = 10;

/// Default fuzzy match threshold.
const DEFAULT_FUZZY_MATCH_THRESHOLD: f64 = 0.7;

/// Process-wide configuration, read-only after load.
#[derive(Debug, Clone, PartialEq)]
pub struct ServerConfig {
    /// Directory where crate documentation records are persisted.
    pub db_path: PathBuf,
    /// Cache size limit in bytes.
    pub cache_size_limit: u64,
    /// Cache entry time-to-live in seconds.
    pub cache_ttl: u64,
    /// Crates loaded from the storage directory at startup.
    pub default_crates: Vec<String>,
    /// Hard cap on search results returned by any query.
    pub max_search_results: usize,
    /// Fuzzy matching threshold in `[0.0, 1.0]`.
    pub fuzzy_match_threshold: f64,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            db_path: PathBuf::from(DEFAULT_DB_PATH),
            cache_size_limit: DEFAULT_CACHE_SIZE_LIMIT,
            cache_ttl: DEFAULT_CACHE_TTL_SECS,
            default_crates: vec!["std".to_string()],
            max_search_results: DEFAULT_MAX_SEARCH_RESULTS,
            fuzzy_match_threshold: DEFAULT_FUZZY_MATCH_THRESHOLD,
        }
    }
}

/// Partial configuration as it appears in a JSON config file.
///
/// Every field is optional; absent fields keep their previously layered value.
#[derive(Debug, Default, Deserialize)]
struct FileConfig {
    db_path: Option<String>,
    cache_size_limit: Option<serde_json::Value>,
    cache_ttl: Option<serde_json::Value>,
    default_crates: Option<Vec<String>>,
    max_search_results: Option<serde_json::Value>,
    fuzzy_match_threshold: Option<serde_json::Value>,
}

/// Load the server configuration from environment variables and an optional
/// JSON config file.
///
/// Invalid values are logged and replaced by per-field defaults; this
/// function never fails.
pub fn load_config(config_path: Option<&Path>) -> ServerConfig {
    let mut config = ServerConfig::default();

    apply_env(&mut config);

    if let Some(path) = config_path {
        match read_file_config(path) {
            Ok(file) => apply_file(&mut config, file),
            Err(e) => {
                tracing::warn!("Ignoring config file {}: {:#}", path.display(), e);
            }
        }
    }

    tracing::info!(
        "Configuration loaded: db_path={}, cache_size_limit={}, cache_ttl={}s, \
         default_crates={:?}, max_search_results={}, fuzzy_match_threshold={}",
        config.db_path.display(),
        config.cache_size_limit,
        config.cache_ttl,
        config.default_crates,
        config.max_search_results,
        config.fuzzy_match_threshold,
    );

    config
}

/// Apply `RUST_DOCS_*` environment variables onto `config`.
fn apply_env(config: &mut ServerConfig) {
    if let Ok(path) = std::env::var("RUST_DOCS_DB_PATH")
        && !path.is_empty()
    {
        config.db_path = PathBuf::from(path);
    }

    if let Ok(raw) = std::env::var("RUST_DOCS_CACHE_SIZE_LIMIT") {
        match raw.parse::<u64>() {
            Ok(v) => config.cache_size_limit = v,
            Err(_) => tracing::warn!("Invalid RUST_DOCS_CACHE_SIZE_LIMIT {:?}, using default", raw),
        }
    }

    if let Ok(raw) = std::env::var("RUST_DOCS_CACHE_TTL") {
        match raw.parse::<u64>() {
            Ok(v) => config.cache_ttl = v,
            Err(_) => tracing::warn!("Invalid RUST_DOCS_CACHE_TTL {:?}, using default", raw),
        }
    }

    if let Ok(raw) = std::env::var("RUST_DOCS_DEFAULT_CRATES")
        && !raw.is_empty()
    {
        config.default_crates = parse_crate_list(&raw);
    }

    if let Ok(raw) = std::env::var("RUST_DOCS_MAX_SEARCH_RESULTS") {
        match raw.parse::<usize>() {
            Ok(v) if v > 0 => config.max_search_results = v,
            _ => tracing::warn!("Invalid RUST_DOCS_MAX_SEARCH_RESULTS {:?}, using default", raw),
        }
    }

    if let Ok(raw) = std::env::var("RUST_DOCS_FUZZY_MATCH_THRESHOLD") {
        match raw.parse::<f64>() {
            Ok(v) if valid_threshold(v) => config.fuzzy_match_threshold = v,
            _ => {
                tracing::warn!(
                    "Invalid RUST_DOCS_FUZZY_MATCH_THRESHOLD {:?} (expected 0.0..=1.0), using default",
                    raw
                );
            }
        }
    }
}

/// Apply a parsed config file onto `config`, validating each field
/// independently.
fn apply_file(config: &mut ServerConfig, file: FileConfig) {
    if let Some(path) = file.db_path {
        config.db_path = PathBuf::from(path);
    }

    if let Some(raw) = file.cache_size_limit {
        match raw.as_u64() {
            Some(v) => config.cache_size_limit = v,
            None => tracing::warn!("Invalid cache_size_limit {} in config file, using default", raw),
        }
    }

    if let Some(raw) = file.cache_ttl {
        match raw.as_u64() {
            Some(v) => config.cache_ttl = v,
            None => tracing::warn!("Invalid cache_ttl {} in config file, using default", raw),
        }
    }

    if let Some(crates) = file.default_crates {
        config.default_crates = crates
            .into_iter()
            .map(|c| c.trim().to_string())
            .filter(|c| !c.is_empty())
            .collect();
    }

    if let Some(raw) = file.max_search_results {
        match raw.as_u64() {
            Some(v) if v > 0 => config.max_search_results = v as usize,
            _ => {
                tracing::warn!("Invalid max_search_results {} in config file, using default", raw);
            }
        }
    }

    if let Some(raw) = file.fuzzy_match_threshold {
        match raw.as_f64() {
            Some(v) if valid_threshold(v) => config.fuzzy_match_threshold = v,
            _ => {
                tracing::warn!(
                    "Invalid fuzzy_match_threshold {} in config file (expected 0.0..=1.0), using default",
                    raw
                );
            }
        }
    }
}

/// Read and parse a JSON config file.
fn read_file_config(path: &Path) -> anyhow::Result<FileConfig> {
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read config file {}", path.display()))?;
    serde_json::from_str(&text).context("config file is not valid JSON")
}

/// Split a comma-separated crate list, dropping empty segments.
fn parse_crate_list(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(ToString::to_string)
        .collect()
}

fn valid_threshold(v: f64) -> bool {
    (0.0..=1.0).contains(&v)
}
