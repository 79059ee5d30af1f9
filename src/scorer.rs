// src/scorer.rs
//! Relevance scoring: `0.35*recency + 0.35*engagement + 0.30*authority`,
//! rounded to an integer in [0, 100].
//!
//! Pure and deterministic given `now`; scoring never mutates the input items,
//! it returns augmented copies. The engagement and authority tables live in
//! [`crate::config`] as data.

use chrono::{DateTime, NaiveDate, NaiveDateTime, TimeZone, Utc};
use std::sync::Arc;
use time::format_description::well_known::Rfc2822;
use time::OffsetDateTime;

use crate::config::DigestConfig;
use crate::item::Item;

const W_RECENCY: f64 = 0.35;
const W_ENGAGEMENT: f64 = 0.35;
const W_AUTHORITY: f64 = 0.30;

/// Recency half-life style decay: 100 at age zero, ~37 after two days.
const RECENCY_DECAY_HOURS: f64 = 48.0;

pub struct Scorer {
    config: Arc<DigestConfig>,
}

impl Scorer {
    pub fn new(config: Arc<DigestConfig>) -> Self {
        Self { config }
    }

    /// Integer relevance score in [0, 100].
    pub fn score_item(&self, item: &Item, now: DateTime<Utc>) -> u32 {
        let r = recency_score(&item.published_at, now);
        let e = self
            .config
            .engagement
            .value_for(&item.source, &item.engagement);
        let a = self.config.authority.weight_for(&item.source) * 100.0;
        let total = r * W_RECENCY + e * W_ENGAGEMENT + a * W_AUTHORITY;
        total.round().clamp(0.0, 100.0) as u32
    }

    /// Score every item and sort descending. Returns augmented copies; the
    /// relative order of exact score ties is unspecified.
    pub fn score_and_sort(&self, items: Vec<Item>) -> Vec<Item> {
        let now = Utc::now();
        self.score_and_sort_at(items, now)
    }

    /// Deterministic variant with an explicit `now`, for tests.
    pub fn score_and_sort_at(&self, items: Vec<Item>, now: DateTime<Utc>) -> Vec<Item> {
        let mut scored: Vec<Item> = items
            .into_iter()
            .map(|item| {
                let score = self.score_item(&item, now);
                Item {
                    score: Some(score),
                    ..item
                }
            })
            .collect();
        scored.sort_unstable_by_key(|i| std::cmp::Reverse(i.score.unwrap_or(0)));
        scored
    }
}

/// `100 * exp(-age_hours / 48)` clamped to [0, 100]; items dated in the
/// future clamp to 100, unparseable dates score 0.
pub fn recency_score(published_at: &str, now: DateTime<Utc>) -> f64 {
    let Some(published) = parse_published_at(published_at) else {
        return 0.0;
    };
    let age_hours = (now - published).num_seconds() as f64 / 3600.0;
    (100.0 * (-age_hours / RECENCY_DECAY_HOURS).exp()).clamp(0.0, 100.0)
}

/// Parse the loosely-typed `publishedAt` strings the adapters emit:
/// RFC 3339 (JSON APIs), RFC 2822 (RSS `pubDate`), bare `T`-joined local
/// date-times (curated releases), and plain dates (paper fallbacks).
pub fn parse_published_at(raw: &str) -> Option<DateTime<Utc>> {
    let raw = raw.trim();
    if raw.is_empty() {
        return None;
    }
    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Some(dt.with_timezone(&Utc));
    }
    if let Ok(dt) = OffsetDateTime::parse(raw, &Rfc2822) {
        return Utc.timestamp_opt(dt.unix_timestamp(), 0).single();
    }
    if let Ok(naive) = NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S") {
        return Some(Utc.from_utc_datetime(&naive));
    }
    if let Ok(date) = NaiveDate::parse_from_str(raw, "%Y-%m-%d") {
        return Some(Utc.from_utc_datetime(&date.and_hms_opt(0, 0, 0)?));
    }
    None
}
