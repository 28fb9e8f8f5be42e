//! Fuzzy documentation search.
//!
//! Split into three layers: [`tokenize`] normalizes text into search terms,
//! [`index`] builds per-crate token indexes from corpus snapshots, and
//! [`engine`] ranks items across indexes by Jaro-Winkler similarity.

pub mod engine;
pub mod index;
pub mod tokenize;

pub use engine::{SearchHit, search_indexes};
pub use index::SearchIndex;
pub use tokenize::Tokenizer;
