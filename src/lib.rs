pub mod cache;
pub mod config;
pub mod error;
pub mod search;
pub mod service;
pub mod store;
pub mod tools;
pub mod tracing;

pub use cache::{CacheKey, ResultCache};
pub use config::{ServerConfig, load_config};
pub use error::{DocsError, Result};
pub use search::{SearchHit, SearchIndex};
pub use service::DocService;
pub use store::{CorpusStore, CrateDocs, DocItem, ItemKind};
