//! Character shingle extraction.
//!
//! Shingles are `n` lower-cased alphanumeric characters collected from a
//! start position, skipping punctuation and whitespace. By default a shingle
//! may only start at the beginning of a word.

use crate::models::{FeatureKey, Occurrence, Posting};
use std::collections::HashMap;

/// Extract every shingle of `n` alphanumeric characters from `text`.
///
/// Offsets are character indices. With `floating_ngrams` unset, a shingle
/// starts only at index 0 or right after a non-alphanumeric character.
/// Candidates cut short by the end of the text are discarded.
pub fn extract_shingles(text: &str, n: usize, floating_ngrams: bool) -> Vec<Occurrence> {
    if n == 0 {
        return Vec::new();
    }

    let chars: Vec<char> = text.chars().collect();
    let mut occurrences = Vec::new();

    for (i, &c) in chars.iter().enumerate() {
        if !c.is_alphanumeric() {
            continue;
        }
        if !floating_ngrams && i > 0 && chars[i - 1].is_alphanumeric() {
            continue;
        }

        // Lower-casing may expand a character; combining marks it adds are dropped
        let mut feature = String::with_capacity(n);
        let mut collected = 0;
        let lowered = chars[i..]
            .iter()
            .filter(|c| c.is_alphanumeric())
            .flat_map(|c| c.to_lowercase())
            .filter(|c| c.is_alphanumeric());
        for c in lowered.take(n) {
            feature.push(c);
            collected += 1;
        }

        // Reached end of text before collecting n characters
        if collected < n {
            break;
        }

        occurrences.push(Occurrence { feature, start: i });
    }

    occurrences
}

/// Hash a shingle to its fixed-width key.
#[inline]
pub fn feature_key(feature: &str) -> FeatureKey {
    let hash = blake3::hash(feature.as_bytes());
    let mut bytes = [0u8; 8];
    bytes.copy_from_slice(&hash.as_bytes()[..8]);
    FeatureKey(u64::from_le_bytes(bytes))
}

/// Count how often each shingle occurs in one document.
pub fn term_frequencies(occurrences: &[Occurrence]) -> HashMap<&str, usize> {
    let mut counts: HashMap<&str, usize> = HashMap::new();
    for occ in occurrences {
        *counts.entry(occ.feature.as_str()).or_default() += 1;
    }
    counts
}

/// Extract shingles and keep only those occurring exactly once in the text.
///
/// Repeated shingles are ambiguous anchors and never reach the matcher.
pub fn unique_postings(text: &str, n: usize, floating_ngrams: bool) -> Vec<Posting> {
    let occurrences = extract_shingles(text, n, floating_ngrams);
    let tf = term_frequencies(&occurrences);

    occurrences
        .iter()
        .filter(|occ| tf.get(occ.feature.as_str()) == Some(&1))
        .map(|occ| Posting {
            feature: feature_key(&occ.feature),
            start: occ.start,
        })
        .collect()
}
