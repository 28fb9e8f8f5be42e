//! Text tokenization and stemming for search indexing.
//!
//! One pipeline serves both index construction and query normalization, so a
//! query term and an indexed term that started as the same identifier always
//! collapse to the same token.

use rust_stemmers::{Algorithm, Stemmer};

/// Minimum token length. Set to 1 to allow short Rust names like `u8`, `io`.
const MIN_TOKEN_LENGTH: usize = 1;

/// Common English stop words filtered out of indexing and queries.
/// These high-frequency words add little value to search relevance.
pub(crate) const STOP_WORDS: &[&str] = &[
    "a", "an", "and", "are", "as", "at", "be", "by", "for", "from", "has", "he", "in", "is", "it",
    "its", "of", "on", "that", "the", "to", "was", "will", "with",
];

/// Tokenizer with a reusable English stemmer.
pub struct Tokenizer {
    stemmer: Stemmer,
}

impl Default for Tokenizer {
    fn default() -> Self {
        Self::new()
    }
}

impl Tokenizer {
    pub fn new() -> Self {
        Self {
            stemmer: Stemmer::create(Algorithm::English),
        }
    }

    /// Tokenizes text into normalized search terms.
    ///
    /// Words are cut at non-alphanumeric boundaries (which covers snake_case
    /// and hyphen-case), then each word is further split at case and
    /// letter/digit transitions:
    /// - "HttpServer" → ["http", "server", "httpserver"]
    /// - "parse_json" → ["parse", "json"]
    /// - "Vec2" → ["vec", "vec2"]
    ///
    /// Both the sub-components and the full compound word are emitted, so
    /// "HttpServer" is findable by "http", "server", or the whole name.
    pub fn tokenize(&self, text: &str) -> Vec<String> {
        let mut tokens = Vec::new();

        for word in text.split(|c: char| !c.is_alphanumeric()) {
            if word.is_empty() {
                continue;
            }

            let subwords = split_word(word);
            if subwords.len() > 1 {
                for sub in &subwords {
                    self.push_token(sub, &mut tokens);
                }
            }
            self.push_token(word, &mut tokens);
        }

        tokens
    }

    /// Tokenizes a query, deduplicating while preserving first-seen order so
    /// repeated terms don't skew scoring.
    pub fn query_tokens(&self, query: &str) -> Vec<String> {
        let mut tokens = self.tokenize(query);
        let mut seen = ahash::AHashSet::with_capacity(tokens.len());
        tokens.retain(|t| seen.insert(t.clone()));
        tokens
    }

    /// Normalize and record one token: lowercase, drop stop words and
    /// digit-only fragments, stem.
    fn push_token(&self, token: &str, tokens: &mut Vec<String>) {
        if token.len() < MIN_TOKEN_LENGTH || token.chars().all(|c| c.is_ascii_digit()) {
            return;
        }

        let lowercase = token.to_lowercase();
        if STOP_WORDS.contains(&lowercase.as_str()) {
            return;
        }

        tokens.push(self.stemmer.stem(&lowercase).into_owned());
    }
}

/// Split one word at camelCase boundaries (lowercase → uppercase) and
/// letter/digit transitions.
fn split_word(word: &str) -> Vec<&str> {
    let mut parts = Vec::new();
    let mut start = 0;
    let mut prev: Option<char> = None;

    for (i, c) in word.char_indices() {
        let boundary = match prev {
            Some(p) => {
                (p.is_lowercase() && c.is_uppercase())
                    || (p.is_alphabetic() && c.is_ascii_digit())
                    || (p.is_ascii_digit() && c.is_alphabetic())
            }
            None => false,
        };

        if boundary {
            parts.push(&word[start..i]);
            start = i;
        }
        prev = Some(c);
    }

    parts.push(&word[start..]);
    parts
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert2::check;
    use rstest::rstest;

    #[rstest]
    #[case("CamelCase", &["camel", "case", "camelcas"])]
    #[case("snake_case", &["snake", "case"])]
    #[case("hyphen-case", &["hyphen", "case"])]
    #[case("std::vec::Vec::push", &["std", "vec", "push"])]
    fn tokenize_contains(#[case] input: &str, #[case] expected: &[&str]) {
        let tokenizer = Tokenizer::new();
        let tokens = tokenizer.tokenize(input);
        for token in expected {
            check!(tokens.contains(&(*token).to_string()), "missing {token:?} in {tokens:?}");
        }
    }

    #[rstest]
    #[case("plurals", vec!["plural"])]
    #[case("ab abc", vec!["ab", "abc"])] // "a" alone would be a stop word
    #[case("push", vec!["push"])]
    fn tokenize_exact(#[case] input: &str, #[case] expected: Vec<&str>) {
        let tokenizer = Tokenizer::new();
        let tokens = tokenizer.tokenize(input);
        let expected: Vec<String> = expected.iter().map(ToString::to_string).collect();
        check!(tokens == expected);
    }

    #[rstest]
    #[case("u8", vec!["u", "u8"])]
    #[case("i32", vec!["i", "i32"])]
    #[case("io", vec!["io"])]
    fn short_rust_types_stay_searchable(#[case] input: &str, #[case] expected: Vec<&str>) {
        let tokenizer = Tokenizer::new();
        let tokens = tokenizer.tokenize(input);
        let expected: Vec<String> = expected.iter().map(ToString::to_string).collect();
        check!(tokens == expected);
    }

    #[rstest]
    #[case("the quick brown fox", vec!["quick", "brown", "fox"])]
    #[case("a function for parsing", vec!["function", "pars"])]
    #[case("Appends an element", vec!["append", "element"])]
    fn stop_words_filtered(#[case] input: &str, #[case] expected_contains: Vec<&str>) {
        let tokenizer = Tokenizer::new();
        let tokens = tokenizer.tokenize(input);

        for stop_word in STOP_WORDS {
            check!(!tokens.contains(&(*stop_word).to_string()));
        }
        for expected in expected_contains {
            check!(tokens.contains(&expected.to_string()), "missing {expected:?} in {tokens:?}");
        }
    }

    #[rstest]
    #[case("Vec2", &["vec", "vec2"])]
    #[case("HTTP2Server", &["http", "server"])]
    fn numbers_split_but_compound_kept(#[case] input: &str, #[case] expected_contains: &[&str]) {
        let tokenizer = Tokenizer::new();
        let tokens = tokenizer.tokenize(input);
        for expected in expected_contains {
            check!(tokens.contains(&(*expected).to_string()), "missing {expected:?} in {tokens:?}");
        }
    }

    #[rstest]
    #[case("Москва")]
    #[case("日本")]
    #[case("🦀")]
    fn unicode_does_not_panic(#[case] input: &str) {
        let tokenizer = Tokenizer::new();
        let _tokens = tokenizer.tokenize(input);
    }

    #[test]
    fn empty_and_whitespace() {
        let tokenizer = Tokenizer::new();
        check!(tokenizer.tokenize("").is_empty());
        check!(tokenizer.tokenize("   ").is_empty());
        check!(tokenizer.tokenize("\n\t").is_empty());
    }

    #[test]
    fn query_tokens_deduplicate_in_order() {
        let tokenizer = Tokenizer::new();
        let tokens = tokenizer.query_tokens("push push pop push");
        check!(tokens == vec!["push".to_string(), "pop".to_string()]);
    }
}
