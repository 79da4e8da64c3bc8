//! Result merging: deduplication, filtering, sorting, and limiting.
//!
//! The merger is a pure, synchronous transformation over the successful
//! payloads extracted from a query's outcomes. It never performs I/O and its
//! output is fully deterministic for a given input order, independent of
//! which source happened to answer first, because the engine extracts
//! payloads in snapshot order before handing them over.
//!
//! # Rules
//!
//! - **Deduplication**: two results are the same logical title when their
//!   [normalized titles](normalize_title) match exactly. The survivor is the
//!   record from the source with the lowest priority value; ties keep the
//!   record that appeared first.
//! - **Sorting**: stable, so equal-key items retain their dedup-resolved
//!   relative order.
//! - **Limiting**: applied strictly last, after dedup and sort; otherwise a
//!   noisy source could crowd out better results from other sources.
//!
//! # Examples
//!
//! ```rust
//! use hakken::merge::normalize_title;
//!
//! assert_eq!(normalize_title("  Cowboy Bebop!  "), "cowboy bebop");
//! assert_eq!(normalize_title("COWBOY-BEBOP"), "cowboy bebop");
//! ```

use std::cmp::Ordering;
use std::collections::HashMap;
use std::collections::hash_map::Entry;

use once_cell::sync::Lazy;
use regex::Regex;

use crate::types::{SearchResult, SortKey};

static PUNCTUATION: Lazy<Regex> = Lazy::new(|| Regex::new(r"[^\w\s]").unwrap());
static WHITESPACE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s+").unwrap());

/// Options controlling a [`merge`] pass.
#[derive(Debug, Clone, Default)]
pub struct MergeOptions {
    /// Sort key applied after deduplication
    pub sort: Option<SortKey>,
    /// Maximum number of results, applied after dedup and sort
    pub limit: Option<usize>,
    /// Drop results rated below this value (unrated results are dropped too)
    pub min_rating: Option<f32>,
    /// Keep only results from this release year
    pub year: Option<u16>,
}

/// Normalizes a title for duplicate detection.
///
/// Case-folds, replaces punctuation with spaces, collapses whitespace runs,
/// and trims. Two titles are considered the same logical title when their
/// normalized forms match exactly.
pub fn normalize_title(title: &str) -> String {
    let lowered = title.to_lowercase();
    let stripped = PUNCTUATION.replace_all(&lowered, " ");
    WHITESPACE.replace_all(&stripped, " ").trim().to_string()
}

/// Removes duplicate titles, keeping the highest-precedence record.
///
/// `priorities` maps source names to their priority values (lower value =
/// higher precedence); sources missing from the map rank last. Each
/// normalized title keeps the slot of its first occurrence, but a later
/// duplicate from a strictly higher-precedence source replaces the record
/// held there. Running this on an already-deduplicated set is a no-op.
pub fn dedupe(results: Vec<SearchResult>, priorities: &HashMap<String, u32>) -> Vec<SearchResult> {
    let mut out: Vec<SearchResult> = Vec::with_capacity(results.len());
    let mut slots: HashMap<String, usize> = HashMap::new();

    let rank = |result: &SearchResult| {
        priorities
            .get(result.source.as_str())
            .copied()
            .unwrap_or(u32::MAX)
    };

    for result in results {
        match slots.entry(normalize_title(&result.title)) {
            Entry::Vacant(slot) => {
                slot.insert(out.len());
                out.push(result);
            }
            Entry::Occupied(slot) => {
                let held = *slot.get();
                if rank(&result) < rank(&out[held]) {
                    out[held] = result;
                }
            }
        }
    }

    out
}

/// Sorts results in place by the given key.
///
/// The sort is stable: equal-key results keep their relative order. Missing
/// years and ratings sort last under their respective keys.
pub fn sort_results(results: &mut [SearchResult], key: SortKey) {
    match key {
        SortKey::Title => {
            results.sort_by(|a, b| a.title.to_lowercase().cmp(&b.title.to_lowercase()));
        }
        SortKey::Year => {
            results.sort_by(|a, b| descending_optional(a.year, b.year));
        }
        SortKey::Rating => {
            results.sort_by(|a, b| match (a.rating, b.rating) {
                (Some(x), Some(y)) => y.partial_cmp(&x).unwrap_or(Ordering::Equal),
                (Some(_), None) => Ordering::Less,
                (None, Some(_)) => Ordering::Greater,
                (None, None) => Ordering::Equal,
            });
        }
    }
}

fn descending_optional<T: Ord>(a: Option<T>, b: Option<T>) -> Ordering {
    match (a, b) {
        (Some(x), Some(y)) => y.cmp(&x),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    }
}

/// Full merge pass: dedup, filter, sort, limit, in that order.
pub fn merge(
    results: Vec<SearchResult>,
    priorities: &HashMap<String, u32>,
    opts: &MergeOptions,
) -> Vec<SearchResult> {
    let mut merged = dedupe(results, priorities);

    if let Some(min) = opts.min_rating {
        merged.retain(|r| r.rating.is_some_and(|rating| rating >= min));
    }
    if let Some(year) = opts.year {
        merged.retain(|r| r.year == Some(year));
    }
    if let Some(key) = opts.sort {
        sort_results(&mut merged, key);
    }
    if let Some(limit) = opts.limit {
        merged.truncate(limit);
    }

    merged
}

#[cfg(test)]
mod tests {
    use super::*;

    fn result(title: &str, source: &str) -> SearchResult {
        SearchResult {
            title: title.to_string(),
            url: format!("https://{}.example/{}", source, title.to_lowercase()),
            source: source.to_string(),
            episode_count: None,
            description: None,
            thumbnail: None,
            year: None,
            genres: vec![],
            rating: None,
        }
    }

    fn priorities(pairs: &[(&str, u32)]) -> HashMap<String, u32> {
        pairs
            .iter()
            .map(|(name, p)| (name.to_string(), *p))
            .collect()
    }

    #[test]
    fn normalization_folds_case_punctuation_and_whitespace() {
        assert_eq!(normalize_title("One  Piece"), "one piece");
        assert_eq!(normalize_title("One-Piece!"), "one piece");
        assert_eq!(normalize_title("  ONE PIECE  "), "one piece");
        assert_eq!(normalize_title("one piece"), "one piece");
    }

    #[test]
    fn dedupe_keeps_lowest_priority_value() {
        let input = vec![result("Naruto", "b"), result("NARUTO!", "a")];
        let prio = priorities(&[("a", 1), ("b", 5)]);

        let out = dedupe(input, &prio);
        assert_eq!(out.len(), 1);
        assert_eq!(out[0].source, "a");
    }

    #[test]
    fn dedupe_ties_keep_first_appearance() {
        let input = vec![result("Naruto", "a"), result("Naruto", "b")];
        let prio = priorities(&[("a", 2), ("b", 2)]);

        let out = dedupe(input, &prio);
        assert_eq!(out.len(), 1);
        assert_eq!(out[0].source, "a");
    }

    #[test]
    fn dedupe_is_idempotent() {
        let input = vec![
            result("Naruto", "a"),
            result("Bleach", "b"),
            result("naruto", "b"),
        ];
        let prio = priorities(&[("a", 1), ("b", 2)]);

        let once = dedupe(input, &prio);
        let twice = dedupe(once.clone(), &prio);
        assert_eq!(once.len(), twice.len());
        let titles: Vec<_> = twice.iter().map(|r| r.title.as_str()).collect();
        assert_eq!(titles, vec!["Naruto", "Bleach"]);
    }

    #[test]
    fn rating_sort_is_stable_with_missing_last() {
        let mut input = vec![
            {
                let mut r = result("X", "x");
                r.rating = Some(8.0);
                r
            },
            result("Y", "y"),
            {
                let mut r = result("Z", "z");
                r.rating = Some(8.0);
                r
            },
        ];

        sort_results(&mut input, SortKey::Rating);
        let order: Vec<_> = input.iter().map(|r| r.title.as_str()).collect();
        assert_eq!(order, vec!["X", "Z", "Y"]);
    }

    #[test]
    fn year_sort_descends_with_missing_last() {
        let mut input = vec![
            {
                let mut r = result("Old", "a");
                r.year = Some(1998);
                r
            },
            result("Unknown", "a"),
            {
                let mut r = result("New", "a");
                r.year = Some(2022);
                r
            },
        ];

        sort_results(&mut input, SortKey::Year);
        let order: Vec<_> = input.iter().map(|r| r.title.as_str()).collect();
        assert_eq!(order, vec!["New", "Old", "Unknown"]);
    }

    #[test]
    fn limit_applies_after_dedup_and_sort() {
        let prio = priorities(&[("a", 1), ("b", 2)]);
        let mut low = result("Low", "b");
        low.rating = Some(2.0);
        let mut high = result("High", "a");
        high.rating = Some(9.0);
        let mut dup = result("high", "b");
        dup.rating = Some(1.0);

        let out = merge(
            vec![low, dup, high],
            &prio,
            &MergeOptions {
                sort: Some(SortKey::Rating),
                limit: Some(1),
                ..Default::default()
            },
        );

        // The duplicate collapses onto the priority-1 record before the
        // limit is applied, so the single survivor is the 9.0-rated one.
        assert_eq!(out.len(), 1);
        assert_eq!(out[0].title, "High");
        assert_eq!(out[0].source, "a");
    }
}
