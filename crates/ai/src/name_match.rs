//! Deterministic product-name matcher.
//!
//! Model:
//! - Normalize: lowercase, strip accents, split digits from letters
//!   ("500mg" -> "500 mg"), drop punctuation, sort tokens.
//! - Score: Sørensen-Dice coefficient over character bigrams of the normalized
//!   names (1.0 for identical names, 0.0 for nothing in common).
//! - Suggest the best-scoring catalog entry; ties go to the lowest item id.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use serde_json::json;

use crate::catalog::CatalogSource;
use crate::result::{AiError, MatchCandidate};
use crate::suggester::MatchSuggester;

const MODEL_NAME: &str = "bigram-dice-v1";

pub struct NameSimilaritySuggester {
    catalog: Arc<dyn CatalogSource>,
}

impl NameSimilaritySuggester {
    pub fn new(catalog: Arc<dyn CatalogSource>) -> Self {
        Self { catalog }
    }

    /// Synchronous core of [`MatchSuggester::suggest`].
    pub fn best_match(&self, candidate_name: &str) -> Result<MatchCandidate, AiError> {
        let needle = normalize_name(candidate_name);
        if needle.is_empty() {
            return Err(AiError::InvalidInput(
                "candidate name has no letters or digits".to_string(),
            ));
        }

        let entries = self.catalog.entries();
        let considered = entries.len();
        let best = entries
            .into_iter()
            .map(|entry| {
                let score = dice(&needle, &normalize_name(&entry.name));
                (score, entry)
            })
            .filter(|(score, _)| *score > 0.0)
            .max_by(|(sa, ea), (sb, eb)| {
                sa.total_cmp(sb)
                    // Reverse so the lowest id wins a tie under `max_by`.
                    .then_with(|| eb.item_id.cmp(&ea.item_id))
            });

        let metadata = json!({ "model": MODEL_NAME, "considered": considered });
        Ok(match best {
            Some((score, entry)) => {
                MatchCandidate::found(entry.item_id, entry.name, score).with_metadata(metadata)
            }
            None => MatchCandidate::none().with_metadata(metadata),
        })
    }
}

#[async_trait]
impl MatchSuggester for NameSimilaritySuggester {
    async fn suggest(&self, candidate_name: &str) -> Result<MatchCandidate, AiError> {
        self.best_match(candidate_name)
    }
}

/// Similarity of two raw product names in `[0, 1]`.
pub fn similarity(a: &str, b: &str) -> f64 {
    dice(&normalize_name(a), &normalize_name(b))
}

/// Canonical form used for matching (see module docs).
pub fn normalize_name(name: &str) -> String {
    let mut spaced = String::with_capacity(name.len() + 8);
    let mut prev: Option<char> = None;

    for ch in name.chars().flat_map(char::to_lowercase) {
        let ch = fold_accent(ch);
        if !ch.is_alphanumeric() {
            spaced.push(' ');
            prev = None;
            continue;
        }
        if let Some(p) = prev {
            if p.is_ascii_digit() != ch.is_ascii_digit() {
                spaced.push(' ');
            }
        }
        spaced.push(ch);
        prev = Some(ch);
    }

    let mut tokens: Vec<&str> = spaced.split_whitespace().collect();
    tokens.sort_unstable();
    tokens.join(" ")
}

fn fold_accent(ch: char) -> char {
    match ch {
        'á' | 'à' | 'ä' | 'â' => 'a',
        'é' | 'è' | 'ë' | 'ê' => 'e',
        'í' | 'ì' | 'ï' | 'î' => 'i',
        'ó' | 'ò' | 'ö' | 'ô' => 'o',
        'ú' | 'ù' | 'ü' | 'û' => 'u',
        'ñ' => 'n',
        'ç' => 'c',
        other => other,
    }
}

fn bigrams(s: &str) -> HashMap<(char, char), usize> {
    let chars: Vec<char> = s.chars().collect();
    let mut counts = HashMap::new();
    for pair in chars.windows(2) {
        *counts.entry((pair[0], pair[1])).or_insert(0) += 1;
    }
    counts
}

fn dice(a: &str, b: &str) -> f64 {
    if a.is_empty() || b.is_empty() {
        return 0.0;
    }
    if a == b {
        return 1.0;
    }

    let ba = bigrams(a);
    let bb = bigrams(b);
    let total: usize = ba.values().sum::<usize>() + bb.values().sum::<usize>();
    if total == 0 {
        return 0.0;
    }

    let shared: usize = ba
        .iter()
        .map(|(k, n)| (*n).min(bb.get(k).copied().unwrap_or(0)))
        .sum();
    (2 * shared) as f64 / total as f64
}
