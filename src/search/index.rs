//! Search index construction.
//!
//! A [`SearchIndex`] is a rebuildable derivative of one crate's corpus
//! snapshot: it maps normalized tokens to candidate item paths and keeps the
//! full token set per item for scoring. The store stays authoritative; the
//! index records the store revision it was built from so staleness checks
//! are a cheap integer comparison.
//!
//! All internal structures are BTree-backed, so building twice from the same
//! snapshot yields identical output and ranked results never depend on the
//! iteration order of unordered maps.

use crate::store::CrateDocs;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

use super::tokenize::Tokenizer;

/// A searchable token index for a single crate.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchIndex {
    crate_name: String,
    /// Store revision this index was built from.
    revision: u64,
    /// Token → paths of items containing that token.
    tokens: BTreeMap<String, BTreeSet<String>>,
    /// Item path → its sorted, deduplicated token set.
    item_tokens: BTreeMap<String, Vec<String>>,
}

impl SearchIndex {
    /// Build an index from a crate snapshot.
    ///
    /// Each item contributes tokens from its path, signature, and both
    /// description fields. Items that tokenize to nothing are left out
    /// entirely, so they can never match — not even at threshold 0.0.
    pub fn build(docs: &CrateDocs, revision: u64, tokenizer: &Tokenizer) -> Self {
        let start = std::time::Instant::now();
        let mut tokens: BTreeMap<String, BTreeSet<String>> = BTreeMap::new();
        let mut item_tokens: BTreeMap<String, Vec<String>> = BTreeMap::new();

        for item in docs.items() {
            let mut terms = tokenizer.tokenize(&item.path);
            terms.extend(tokenizer.tokenize(&item.signature));
            terms.extend(tokenizer.tokenize(&item.summary));
            terms.extend(tokenizer.tokenize(&item.description));

            terms.sort();
            terms.dedup();
            if terms.is_empty() {
                continue;
            }

            for term in &terms {
                tokens
                    .entry(term.clone())
                    .or_default()
                    .insert(item.path.clone());
            }
            item_tokens.insert(item.path.clone(), terms);
        }

        tracing::debug!(
            "Built search index for '{}': {} unique tokens, {} documents in {:?}",
            docs.name,
            tokens.len(),
            item_tokens.len(),
            start.elapsed()
        );

        Self {
            crate_name: docs.name.clone(),
            revision,
            tokens,
            item_tokens,
        }
    }

    /// Whether this index still matches the given store revision.
    pub fn is_current(&self, store_revision: u64) -> bool {
        self.revision == store_revision
    }

    pub fn crate_name(&self) -> &str {
        &self.crate_name
    }

    pub fn revision(&self) -> u64 {
        self.revision
    }

    /// Number of unique tokens in the index.
    pub fn token_count(&self) -> usize {
        self.tokens.len()
    }

    /// Number of indexed items.
    pub fn document_count(&self) -> usize {
        self.item_tokens.len()
    }

    pub(crate) fn tokens(&self) -> &BTreeMap<String, BTreeSet<String>> {
        &self.tokens
    }

    pub(crate) fn item_tokens(&self) -> &BTreeMap<String, Vec<String>> {
        &self.item_tokens
    }
}
