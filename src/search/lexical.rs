use std::fmt;
use std::future::Future;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use super::error::SearchError;
use crate::passage::{MetadataFilter, Passage};

/// How a lexical backend interprets the query text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LexicalMode {
    /// Term matching with BM25 weighting.
    Natural,
    /// Exact, case-insensitive substring matching; for codes like `E11.9`.
    Phrase,
}

impl fmt::Display for LexicalMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LexicalMode::Natural => f.write_str("natural"),
            LexicalMode::Phrase => f.write_str("phrase"),
        }
    }
}

/// Chooses the lexical mode per query.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LexicalModePolicy {
    /// Phrase for code-like queries, natural otherwise.
    #[default]
    Auto,
    Fixed(LexicalMode),
}

impl LexicalModePolicy {
    pub fn resolve(&self, query: &str) -> LexicalMode {
        match self {
            LexicalModePolicy::Fixed(mode) => *mode,
            LexicalModePolicy::Auto if is_code_like(query) => LexicalMode::Phrase,
            LexicalModePolicy::Auto => LexicalMode::Natural,
        }
    }
}

impl FromStr for LexicalModePolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "auto" => Ok(LexicalModePolicy::Auto),
            "natural" => Ok(LexicalModePolicy::Fixed(LexicalMode::Natural)),
            "phrase" => Ok(LexicalModePolicy::Fixed(LexicalMode::Phrase)),
            other => Err(format!(
                "unknown lexical mode '{other}' (expected auto, natural or phrase)"
            )),
        }
    }
}

/// Full-text retrieval, best match first.
pub trait LexicalSearch: Send + Sync {
    fn search(
        &self,
        query: &str,
        k: usize,
        filter: &MetadataFilter,
        mode: LexicalMode,
    ) -> impl Future<Output = Result<Vec<Passage>, SearchError>> + Send;
}

/// `true` when any token mixes digits with letters, `.` or `-` (`E11.9`, `2339-0`, `A1c`).
pub fn is_code_like(query: &str) -> bool {
    query.split_whitespace().map(trim_token).any(is_code_token)
}

/// Substrings a passage must contain to match in [`LexicalMode::Phrase`].
///
/// Double-quoted sections win; otherwise the code-like tokens; otherwise the whole query.
pub fn phrase_terms(query: &str) -> Vec<String> {
    let quoted: Vec<String> = query
        .split('"')
        .skip(1)
        .step_by(2)
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_lowercase)
        .collect();
    if !quoted.is_empty() {
        return quoted;
    }

    let codes: Vec<String> = query
        .split_whitespace()
        .map(trim_token)
        .filter(|token| is_code_token(token))
        .map(str::to_lowercase)
        .collect();
    if !codes.is_empty() {
        return codes;
    }

    let whole = query.trim().to_lowercase();
    if whole.is_empty() { Vec::new() } else { vec![whole] }
}

fn trim_token(token: &str) -> &str {
    token.trim_matches(|c: char| !c.is_alphanumeric())
}

fn is_code_token(token: &str) -> bool {
    let has_digit = token.chars().any(|c| c.is_ascii_digit());
    let has_marker = token
        .chars()
        .any(|c| c.is_alphabetic() || c == '.' || c == '-');
    has_digit && has_marker
}
