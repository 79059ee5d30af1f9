// src/sources/rss.rs
//! General blog-feed adapter: RSS 2.0 and Atom, one namespaced source id per
//! configured feed (`rss_<slug>`). Feeds are fetched concurrently and joined
//! all-settled; a dead feed is skipped, never fatal for the rest.

use anyhow::{Context, Result};
use async_trait::async_trait;
use futures::future::join_all;
use quick_xml::de::from_str;
use serde::Deserialize;

use super::{scrub_html_entities_for_xml, strip_html, truncate_chars, SourceAdapter, SourceContext};
use crate::config::FeedSpec;
use crate::item::{short_hash, Engagement, Item, ItemKind};
use crate::transport::DEFAULT_TIMEOUT;

const CACHE_KEY: &str = "rss";

// --- RSS 2.0 ---

#[derive(Debug, Deserialize)]
struct Rss {
    channel: Channel,
}

#[derive(Debug, Deserialize)]
struct Channel {
    #[serde(rename = "item", default)]
    items: Vec<RssEntry>,
}

#[derive(Debug, Deserialize)]
struct RssEntry {
    title: Option<String>,
    link: Option<String>,
    description: Option<String>,
    #[serde(rename = "pubDate")]
    pub_date: Option<String>,
    #[serde(rename = "dc:creator")]
    dc_creator: Option<String>,
    creator: Option<String>,
    author: Option<String>,
}

// --- Atom ---

#[derive(Debug, Deserialize)]
struct AtomFeed {
    #[serde(rename = "entry", default)]
    entries: Vec<AtomEntry>,
}

#[derive(Debug, Deserialize)]
struct AtomEntry {
    title: Option<String>,
    #[serde(rename = "link", default)]
    links: Vec<AtomLink>,
    summary: Option<AtomText>,
    content: Option<AtomText>,
    author: Option<AtomAuthor>,
    published: Option<String>,
    updated: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct AtomLink {
    #[serde(rename = "@href")]
    href: Option<String>,
    #[serde(rename = "$text")]
    text: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct AtomText {
    #[serde(rename = "$text")]
    value: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct AtomAuthor {
    name: Option<String>,
}

/// Feed entry reduced to the fields the item schema needs.
#[derive(Debug)]
pub(crate) struct ParsedEntry {
    pub title: String,
    pub url: String,
    pub description: String,
    pub author: String,
    pub published_at: String,
}

/// Parse a feed payload, trying RSS 2.0 `<item>` elements first, then Atom
/// `<entry>` elements. `fallback_author` is the feed's display name.
pub(crate) fn parse_feed(xml: &str, fallback_author: &str) -> Result<Vec<ParsedEntry>> {
    let clean = scrub_html_entities_for_xml(xml);

    if let Ok(rss) = from_str::<Rss>(&clean) {
        return Ok(rss
            .channel
            .items
            .into_iter()
            .map(|it| ParsedEntry {
                title: it.title.as_deref().unwrap_or_default().trim().to_string(),
                url: it.link.as_deref().unwrap_or_default().trim().to_string(),
                description: truncate_chars(
                    &strip_html(it.description.as_deref().unwrap_or_default()),
                    200,
                ),
                author: it
                    .dc_creator
                    .or(it.creator)
                    .or(it.author)
                    .map(|a| a.trim().to_string())
                    .filter(|a| !a.is_empty())
                    .unwrap_or_else(|| fallback_author.to_string()),
                published_at: it.pub_date.unwrap_or_default(),
            })
            .collect());
    }

    let feed: AtomFeed = from_str::<AtomFeed>(&clean).context("parsing feed as rss or atom")?;
    Ok(feed
        .entries
        .into_iter()
        .map(|entry| {
            let url = entry
                .links
                .iter()
                .find_map(|l| l.href.clone())
                .or_else(|| entry.links.iter().find_map(|l| l.text.clone()))
                .unwrap_or_default()
                .trim()
                .to_string();
            let body = entry
                .summary
                .and_then(|t| t.value)
                .or_else(|| entry.content.and_then(|t| t.value))
                .unwrap_or_default();
            ParsedEntry {
                title: entry.title.as_deref().unwrap_or_default().trim().to_string(),
                url,
                description: truncate_chars(&strip_html(&body), 200),
                author: entry
                    .author
                    .and_then(|a| a.name)
                    .map(|n| n.trim().to_string())
                    .filter(|n| !n.is_empty())
                    .unwrap_or_else(|| fallback_author.to_string()),
                published_at: entry.published.or(entry.updated).unwrap_or_default(),
            }
        })
        .collect())
}

/// Source id for one feed: `rss_` plus the lowercased name with every
/// non-alphanumeric run replaced by underscores.
pub(crate) fn feed_source_id(feed_name: &str) -> String {
    let slug: String = feed_name
        .to_lowercase()
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() { c } else { '_' })
        .collect();
    format!("rss_{slug}")
}

pub struct RssAdapter {
    ctx: SourceContext,
}

impl RssAdapter {
    pub fn new(ctx: SourceContext) -> Self {
        Self { ctx }
    }

    fn map_entries(entries: Vec<ParsedEntry>, feed: &FeedSpec) -> Vec<Item> {
        let source_id = feed_source_id(&feed.name);
        entries
            .into_iter()
            .map(|entry| Item {
                id: format!("rss-{}", short_hash(&entry.url)),
                title: entry.title,
                url: entry.url,
                description: entry.description,
                source: source_id.clone(),
                source_name: feed.name.clone(),
                author: entry.author,
                published_at: entry.published_at,
                engagement: Engagement::default(),
                tags: vec!["ai".into(), feed.name.clone()],
                kind: ItemKind::News,
                score: None,
                extra: None,
            })
            .collect()
    }

    async fn fetch_feed(&self, feed: &FeedSpec) -> Result<Vec<Item>> {
        let body = self
            .ctx
            .client
            .fetch_text(&feed.url, true, DEFAULT_TIMEOUT)
            .await
            .with_context(|| format!("fetching feed {}", feed.name))?;
        let entries = parse_feed(&body, &feed.name)
            .with_context(|| format!("parsing feed {}", feed.name))?;
        Ok(Self::map_entries(entries, feed))
    }
}

#[async_trait]
impl SourceAdapter for RssAdapter {
    async fn fetch_items(&self) -> Result<Vec<Item>> {
        if let Some(items) = self.ctx.cache.get::<Vec<Item>>(CACHE_KEY) {
            return Ok(items);
        }

        let feeds = &self.ctx.config.feeds.feeds;
        let results = join_all(feeds.iter().map(|feed| self.fetch_feed(feed))).await;

        let mut items = Vec::new();
        for (feed, result) in feeds.iter().zip(results) {
            match result {
                Ok(mut v) => items.append(&mut v),
                Err(e) => {
                    tracing::warn!(error = ?e, feed = %feed.name, "feed skipped");
                }
            }
        }

        self.ctx.cache.set(CACHE_KEY, &items, self.ctx.config.ttl.news_ms);
        Ok(items)
    }

    fn name(&self) -> &'static str {
        "rss"
    }
}
