// src/sources/mod.rs
//! Source adapters: one module per external origin, all implementing the same
//! [`SourceAdapter`] contract. Each adapter owns its query construction,
//! response shape, pagination cap, and mapping into the common [`Item`]
//! schema, and consults the cache under its own fixed key before going to the
//! network.

pub mod arxiv;
pub mod devto;
pub mod hackernews;
pub mod hn_releases;
pub mod huggingface;
pub mod major_releases;
pub mod reddit;
pub mod rss;
pub mod semantic_scholar;

use anyhow::Result;
use async_trait::async_trait;
use std::sync::Arc;

use crate::cache::{CacheStore, MemoryStorage};
use crate::config::DigestConfig;
use crate::item::Item;
use crate::transport::{HttpDispatcher, ResilientClient};

/// Fetch-and-normalize contract every origin implements.
#[async_trait]
pub trait SourceAdapter: Send + Sync {
    async fn fetch_items(&self) -> Result<Vec<Item>>;
    fn name(&self) -> &'static str;
}

/// Injected collaborators shared by all adapters: transport (with its
/// per-origin route memory), cache, and configuration. Passed explicitly so
/// nothing in the pipeline depends on ambient globals.
#[derive(Clone)]
pub struct SourceContext {
    pub client: Arc<ResilientClient>,
    pub cache: CacheStore,
    pub config: Arc<DigestConfig>,
}

impl SourceContext {
    pub fn new(client: Arc<ResilientClient>, cache: CacheStore, config: Arc<DigestConfig>) -> Self {
        Self {
            client,
            cache,
            config,
        }
    }

    /// Production wiring: reqwest-backed transport with the configured relay
    /// chain and an unbounded in-memory cache.
    pub fn with_defaults(config: Arc<DigestConfig>) -> Self {
        let client = Arc::new(ResilientClient::new(
            Arc::new(HttpDispatcher::new()),
            config.relays.chain.clone(),
        ));
        let cache = CacheStore::new(Arc::new(MemoryStorage::unbounded()));
        Self::new(client, cache, config)
    }
}

/// Character-cap a description without splitting multi-byte sequences.
pub(crate) fn truncate_chars(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        return s.to_string();
    }
    s.chars().take(max).collect()
}

/// Decode HTML entities, drop tags, collapse whitespace. Feed descriptions
/// routinely arrive as HTML fragments.
pub(crate) fn strip_html(s: &str) -> String {
    let decoded = html_escape::decode_html_entities(s).to_string();
    static RE_TAGS: once_cell::sync::OnceCell<regex::Regex> = once_cell::sync::OnceCell::new();
    let re_tags = RE_TAGS.get_or_init(|| regex::Regex::new(r"(?is)</?[^>]+>").unwrap());
    let stripped = re_tags.replace_all(&decoded, " ");
    collapse_ws(&stripped)
}

pub(crate) fn collapse_ws(s: &str) -> String {
    s.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Named HTML entities are not valid XML; scrub the common ones before the
/// XML parser sees the payload.
pub(crate) fn scrub_html_entities_for_xml(s: &str) -> String {
    s.replace("&nbsp;", " ")
        .replace("&ndash;", "-")
        .replace("&mdash;", "-")
        .replace("&ldquo;", "\"")
        .replace("&rdquo;", "\"")
        .replace("&lsquo;", "'")
        .replace("&rsquo;", "'")
}
