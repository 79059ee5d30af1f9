// src/dedup.rs
//! Cross-source deduplication.
//!
//! Two items are duplicates when they share an exact URL or when their titles
//! normalize to the same key. The pass is greedy and first-wins: whichever
//! item arrives first in concatenation order is kept, regardless of source
//! quality. That means a lower-authority source can suppress a
//! higher-authority duplicate; a known limitation of the policy, kept as-is.

use metrics::counter;
use std::collections::HashSet;

use crate::item::Item;

/// Title normalization for the dedup key: lowercase, strip everything that is
/// not ASCII alphanumeric, cap at 60 chars.
pub fn normalize_title(title: &str) -> String {
    title
        .to_lowercase()
        .chars()
        .filter(char::is_ascii_alphanumeric)
        .take(60)
        .collect()
}

/// Single pass over the concatenated adapter output, preserving first-seen
/// order. An item is dropped when its URL or normalized title was already
/// seen; otherwise both keys are recorded and the item is kept.
pub fn deduplicate(items: Vec<Item>) -> Vec<Item> {
    let mut seen: HashSet<String> = HashSet::with_capacity(items.len() * 2);
    let mut kept = Vec::with_capacity(items.len());
    let mut dropped = 0usize;

    for item in items {
        let norm = normalize_title(&item.title);
        if seen.contains(&item.url) || seen.contains(&norm) {
            dropped += 1;
            continue;
        }
        seen.insert(item.url.clone());
        seen.insert(norm);
        kept.push(item);
    }

    if dropped > 0 {
        counter!("digest_dedup_dropped_total").increment(dropped as u64);
    }
    kept
}
