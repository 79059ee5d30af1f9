// src/item.rs
//! The unified item schema shared by every source adapter.
//!
//! Items are produced fresh on every fetch and are immutable afterwards;
//! scoring returns augmented copies instead of mutating in place. The serde
//! renames pin the cached JSON layout (`sourceName`, `publishedAt`, `type`)
//! so entries written by older builds keep deserializing.

use serde::{Deserialize, Serialize};

/// Content category of an item.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ItemKind {
    News,
    Paper,
    Release,
}

/// Source-native popularity signal. Zero when the origin has none.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Engagement {
    #[serde(default)]
    pub score: f64,
    #[serde(default)]
    pub comments: u32,
}

impl Engagement {
    pub fn new(score: f64, comments: u32) -> Self {
        Self { score, comments }
    }
}

/// Optional bag of source-specific fields.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Extra {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pdf_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub citations: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub significance: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Item {
    /// Source-namespaced stable id, e.g. `hn-38123456` or `rss-a1b2c3d4e5f6`.
    pub id: String,
    pub title: String,
    /// Canonical link; dedup key alongside the normalized title.
    pub url: String,
    #[serde(default)]
    pub description: String,
    /// Machine id of the origin; multi-feed adapters add a per-feed suffix.
    pub source: String,
    pub source_name: String,
    #[serde(default)]
    pub author: String,
    /// ISO-8601 or otherwise parseable date string, as delivered by the origin.
    pub published_at: String,
    #[serde(default)]
    pub engagement: Engagement,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(rename = "type")]
    pub kind: ItemKind,
    /// Attached by the scorer; absent before scoring.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub score: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub extra: Option<Extra>,
}

/// Short stable hex digest for building ids from URLs or title fragments.
pub fn short_hash(input: &str) -> String {
    use sha2::{Digest, Sha256};
    let digest = Sha256::digest(input.as_bytes());
    let mut out = String::with_capacity(12);
    for b in digest.iter().take(6) {
        use std::fmt::Write as _;
        let _ = write!(&mut out, "{b:02x}");
    }
    out
}
