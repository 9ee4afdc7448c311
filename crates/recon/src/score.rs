//! String-similarity scorers.
//!
//! All scores are on a 0..=100 scale. The default [`WRatio`] combines
//! several indel-based ratios:
//!
//! - `ratio`: normalized indel similarity, `2 * LCS / (len_a + len_b)`
//! - `partial_ratio`: best `ratio` of the shorter string against any
//!   same-length window of the longer one
//! - `token_sort_ratio` / `token_set_ratio`: the same after sorting or
//!   set-reducing whitespace tokens
//!
//! WRatio is asymmetric in general; only the range and the ordering of
//! results are contractual.

use std::collections::BTreeSet;

use crate::config::ScorerKind;

/// Similarity capability: `score(a, b)` in `0.0..=100.0`.
pub trait Scorer {
    fn name(&self) -> &'static str;
    fn score(&self, query: &str, choice: &str) -> f64;
}

/// Weighted ratio over plain, partial and token-based ratios.
#[derive(Debug, Clone, Copy, Default)]
pub struct WRatio;

impl Scorer for WRatio {
    fn name(&self) -> &'static str {
        "wratio"
    }

    fn score(&self, query: &str, choice: &str) -> f64 {
        wratio(query, choice).clamp(0.0, 100.0)
    }
}

/// Jaro-Winkler similarity scaled to 0..=100.
#[derive(Debug, Clone, Copy, Default)]
pub struct JaroWinkler;

impl Scorer for JaroWinkler {
    fn name(&self) -> &'static str {
        "jaro_winkler"
    }

    fn score(&self, query: &str, choice: &str) -> f64 {
        if query.is_empty() || choice.is_empty() {
            return 0.0;
        }
        (strsim::jaro_winkler(query, choice) * 100.0).clamp(0.0, 100.0)
    }
}

pub fn scorer_for(kind: ScorerKind) -> Box<dyn Scorer> {
    match kind {
        ScorerKind::Wratio => Box::new(WRatio),
        ScorerKind::JaroWinkler => Box::new(JaroWinkler),
    }
}

// ---------------------------------------------------------------------------
// Normalization
// ---------------------------------------------------------------------------

/// Optional name pre-processing applied to both query and candidates.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum NameNormalizer {
    /// Compare names exactly as stored.
    #[default]
    Raw,
    /// Lowercase, non-alphanumerics to spaces, collapse whitespace.
    Simple,
}

impl NameNormalizer {
    pub fn from_flag(normalize: bool) -> Self {
        if normalize {
            Self::Simple
        } else {
            Self::Raw
        }
    }

    pub fn apply(&self, name: &str) -> String {
        match self {
            Self::Raw => name.to_string(),
            Self::Simple => default_process(name),
        }
    }
}

pub fn default_process(name: &str) -> String {
    let spaced: String = name
        .chars()
        .flat_map(|c| {
            let keep = if c.is_alphanumeric() { c } else { ' ' };
            keep.to_lowercase()
        })
        .collect();
    spaced.split_whitespace().collect::<Vec<_>>().join(" ")
}

// ---------------------------------------------------------------------------
// Ratios
// ---------------------------------------------------------------------------

const UNBASE_SCALE: f64 = 0.95;

pub fn wratio(a: &str, b: &str) -> f64 {
    let len_a = a.chars().count();
    let len_b = b.chars().count();
    if len_a == 0 || len_b == 0 {
        return 0.0;
    }

    let len_ratio = len_a.max(len_b) as f64 / len_a.min(len_b) as f64;
    let end_ratio = ratio(a, b);

    if len_ratio < 1.5 {
        return end_ratio.max(token_ratio(a, b) * UNBASE_SCALE);
    }

    let partial_scale = if len_ratio < 8.0 { 0.9 } else { 0.6 };
    let end_ratio = end_ratio.max(partial_ratio(a, b) * partial_scale);
    end_ratio.max(partial_token_ratio(a, b) * UNBASE_SCALE * partial_scale)
}

pub fn ratio(a: &str, b: &str) -> f64 {
    let a: Vec<char> = a.chars().collect();
    let b: Vec<char> = b.chars().collect();
    ratio_chars(&a, &b)
}

pub fn partial_ratio(a: &str, b: &str) -> f64 {
    let a: Vec<char> = a.chars().collect();
    let b: Vec<char> = b.chars().collect();
    if a.is_empty() || b.is_empty() {
        return if a.is_empty() && b.is_empty() { 100.0 } else { 0.0 };
    }

    let (short, long) = if a.len() <= b.len() { (&a, &b) } else { (&b, &a) };
    let best = best_window(short, long);
    if best < 100.0 && a.len() == b.len() {
        best.max(best_window(long, short))
    } else {
        best
    }
}

pub fn token_sort_ratio(a: &str, b: &str) -> f64 {
    ratio(&sorted_tokens(a), &sorted_tokens(b))
}

pub fn token_set_ratio(a: &str, b: &str) -> f64 {
    let tokens_a: BTreeSet<&str> = a.split_whitespace().collect();
    let tokens_b: BTreeSet<&str> = b.split_whitespace().collect();
    if tokens_a.is_empty() || tokens_b.is_empty() {
        return 0.0;
    }

    let sect: Vec<&str> = tokens_a.intersection(&tokens_b).copied().collect();
    let diff_ab: Vec<&str> = tokens_a.difference(&tokens_b).copied().collect();
    let diff_ba: Vec<&str> = tokens_b.difference(&tokens_a).copied().collect();

    // One token set contains the other.
    if !sect.is_empty() && (diff_ab.is_empty() || diff_ba.is_empty()) {
        return 100.0;
    }

    let diff_ab_joined = diff_ab.join(" ");
    let diff_ba_joined = diff_ba.join(" ");
    let ab_len = diff_ab_joined.chars().count();
    let ba_len = diff_ba_joined.chars().count();
    let sect_len = sect.join(" ").chars().count();

    // Lengths of "sect + ab" and "sect + ba", joined by one space when sect is non-empty.
    let sep = usize::from(sect_len != 0);
    let sect_ab_len = sect_len + sep + ab_len;
    let sect_ba_len = sect_len + sep + ba_len;

    let dist = indel_distance(&diff_ab_joined, &diff_ba_joined);
    let result = normalized_similarity(dist, sect_ab_len + sect_ba_len);
    if sect_len == 0 {
        return result;
    }

    // sect+ab vs sect differs only by the appended diff, so distance is its length.
    let sect_ab_ratio = normalized_similarity(sep + ab_len, sect_len + sect_ab_len);
    let sect_ba_ratio = normalized_similarity(sep + ba_len, sect_len + sect_ba_len);
    result.max(sect_ab_ratio).max(sect_ba_ratio)
}

pub fn token_ratio(a: &str, b: &str) -> f64 {
    token_sort_ratio(a, b).max(token_set_ratio(a, b))
}

/// max(partial token-sort ratio, partial token-set ratio).
pub fn partial_token_ratio(a: &str, b: &str) -> f64 {
    let split_a: Vec<&str> = a.split_whitespace().collect();
    let split_b: Vec<&str> = b.split_whitespace().collect();
    let tokens_a: BTreeSet<&str> = split_a.iter().copied().collect();
    let tokens_b: BTreeSet<&str> = split_b.iter().copied().collect();
    if tokens_a.is_empty() || tokens_b.is_empty() {
        return 0.0;
    }

    // Any shared word is a full partial match.
    if tokens_a.intersection(&tokens_b).next().is_some() {
        return 100.0;
    }

    let result = partial_ratio(&sorted_tokens(a), &sorted_tokens(b));

    // Without repeated tokens the set difference equals the sorted split.
    if split_a.len() == tokens_a.len() && split_b.len() == tokens_b.len() {
        return result;
    }

    let diff_ab: Vec<&str> = tokens_a.difference(&tokens_b).copied().collect();
    let diff_ba: Vec<&str> = tokens_b.difference(&tokens_a).copied().collect();
    result.max(partial_ratio(&diff_ab.join(" "), &diff_ba.join(" ")))
}

// ---------------------------------------------------------------------------
// Primitives
// ---------------------------------------------------------------------------

fn sorted_tokens(s: &str) -> String {
    let mut tokens: Vec<&str> = s.split_whitespace().collect();
    tokens.sort_unstable();
    tokens.join(" ")
}

fn normalized_similarity(dist: usize, lensum: usize) -> f64 {
    if lensum == 0 {
        return 100.0;
    }
    100.0 * (1.0 - dist as f64 / lensum as f64)
}

fn indel_distance(a: &str, b: &str) -> usize {
    let a: Vec<char> = a.chars().collect();
    let b: Vec<char> = b.chars().collect();
    a.len() + b.len() - 2 * lcs_len(&a, &b)
}

fn ratio_chars(a: &[char], b: &[char]) -> f64 {
    let lensum = a.len() + b.len();
    normalized_similarity(lensum - 2 * lcs_len(a, b), lensum)
}

/// Best `ratio` of `needle` against every alignment inside `hay`, including
/// the partial overlaps at either end. `needle.len() <= hay.len()`.
fn best_window(needle: &[char], hay: &[char]) -> f64 {
    let (m, n) = (needle.len(), hay.len());
    let prefixes = (1..m).map(|i| &hay[..i]);
    let windows = (0..=n - m).map(|i| &hay[i..i + m]);
    let suffixes = (n - m + 1..n).map(|i| &hay[i..]);

    let mut best = 0.0f64;
    for window in prefixes.chain(windows).chain(suffixes) {
        best = best.max(ratio_chars(needle, window));
        if best >= 100.0 {
            break;
        }
    }
    best
}

/// Length of the longest common subsequence.
fn lcs_len(a: &[char], b: &[char]) -> usize {
    if a.is_empty() || b.is_empty() {
        return 0;
    }
    let mut prev = vec![0usize; b.len() + 1];
    let mut cur = vec![0usize; b.len() + 1];
    for &ca in a {
        for (j, &cb) in b.iter().enumerate() {
            cur[j + 1] = if ca == cb {
                prev[j] + 1
            } else {
                prev[j + 1].max(cur[j])
            };
        }
        std::mem::swap(&mut prev, &mut cur);
    }
    prev[b.len()]
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn approx(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-9
    }

    #[test]
    fn ratio_basics() {
        assert_eq!(ratio("abc", "abc"), 100.0);
        assert_eq!(ratio("", ""), 100.0);
        assert_eq!(ratio("abc", ""), 0.0);
        // LCS("this is a test", "this is a test!") = 14 over 29 chars
        assert!(approx(ratio("this is a test", "this is a test!"), 100.0 * 28.0 / 29.0));
    }

    #[test]
    fn partial_ratio_finds_substring() {
        assert_eq!(partial_ratio("Navajo", "Navajo Generating Station"), 100.0);
        assert_eq!(partial_ratio("Navajo Generating Station", "Navajo"), 100.0);
        assert_eq!(partial_ratio("abc", ""), 0.0);
        assert!(partial_ratio("xyz", "Navajo Generating Station") < 50.0);
    }

    #[test]
    fn token_sort_ignores_order() {
        assert_eq!(token_sort_ratio("Unit 1 Colstrip", "Colstrip Unit 1"), 100.0);
    }

    #[test]
    fn token_set_subset_is_full_score() {
        assert_eq!(token_set_ratio("Colstrip", "Colstrip Unit 1"), 100.0);
        assert_eq!(token_set_ratio("a b", ""), 0.0);
    }

    #[test]
    fn token_set_without_intersection_compares_diffs() {
        let score = token_set_ratio("alpha", "beta");
        assert!(approx(score, ratio("alpha", "beta")));
    }

    #[test]
    fn partial_token_shared_word_is_full_score() {
        assert_eq!(partial_token_ratio("Scherer", "Scherer Unit 1"), 100.0);
        assert!(partial_token_ratio("Nowhere", "Scherer Unit 1") < 100.0);
    }

    #[test]
    fn wratio_identical_is_100() {
        assert_eq!(wratio("Colstrip", "Colstrip"), 100.0);
    }

    #[test]
    fn wratio_short_query_against_long_name_is_scaled() {
        // len ratio 15/8 → partial scale 0.9, partial ratio 100.
        assert!(approx(wratio("Colstrip", "Colstrip Unit 1"), 90.0));
        // len ratio 32/6 → still 0.9.
        assert!(approx(wratio("Navajo", "Navajo Generating Station Unit 1"), 90.0));
        // len ratio >= 8 → scale 0.6.
        assert!(approx(wratio("Ab", "Ab Generating Station"), 60.0));
    }

    #[test]
    fn wratio_similar_length_uses_token_ratio() {
        let score = wratio("Station Navajo Generating", "Navajo Generating Station");
        assert!(approx(score, 95.0));
    }

    #[test]
    fn wratio_empty_is_zero() {
        assert_eq!(wratio("", "Colstrip"), 0.0);
        assert_eq!(wratio("Colstrip", ""), 0.0);
    }

    #[test]
    fn wratio_unrelated_is_low() {
        assert!(wratio("NonexistentPlant", "Colstrip Unit 1") < 90.0);
        assert!(wratio("NonexistentPlant", "Scherer Unit 1") < 90.0);
        assert!(wratio("NonexistentPlant", "Navajo Generating Station Unit 1") < 90.0);
    }

    #[test]
    fn default_process_strips_punctuation() {
        assert_eq!(default_process("  Colstrip (Unit-1) "), "colstrip unit 1");
        assert_eq!(NameNormalizer::Raw.apply("A-B"), "A-B");
        assert_eq!(NameNormalizer::from_flag(true).apply("A-B"), "a b");
    }

    #[test]
    fn jaro_winkler_scorer_range() {
        let s = JaroWinkler;
        assert_eq!(s.score("Colstrip", "Colstrip"), 100.0);
        assert_eq!(s.score("", "Colstrip"), 0.0);
        assert!(s.score("Colstrip", "Colstrop") > 80.0);
    }

    #[test]
    fn scorer_for_kind() {
        assert_eq!(scorer_for(ScorerKind::Wratio).name(), "wratio");
        assert_eq!(scorer_for(ScorerKind::JaroWinkler).name(), "jaro_winkler");
    }

    proptest! {
        #[test]
        fn wratio_stays_in_range(a in "[a-zA-Z0-9 ]{0,24}", b in "[a-zA-Z0-9 ]{0,24}") {
            let score = WRatio.score(&a, &b);
            prop_assert!((0.0..=100.0).contains(&score), "score {score} for {a:?} / {b:?}");
        }

        #[test]
        fn ratio_is_symmetric(a in "[a-z ]{0,16}", b in "[a-z ]{0,16}") {
            prop_assert!(approx(ratio(&a, &b), ratio(&b, &a)));
        }
    }
}
