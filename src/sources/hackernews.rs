// src/sources/hackernews.rs
//! News-forum adapter over the Algolia search API.

use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::Utc;
use serde::Deserialize;

use super::{truncate_chars, SourceAdapter, SourceContext};
use crate::item::{Engagement, Item, ItemKind};

const CACHE_KEY: &str = "hackernews";
pub(crate) const SEARCH_BASE: &str = "https://hn.algolia.com/api/v1/search";

#[derive(Debug, Deserialize)]
pub(crate) struct SearchResponse {
    #[serde(default)]
    pub hits: Vec<Hit>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct Hit {
    #[serde(rename = "objectID")]
    pub object_id: String,
    pub title: Option<String>,
    pub url: Option<String>,
    pub story_text: Option<String>,
    pub author: Option<String>,
    pub created_at: Option<String>,
    pub points: Option<f64>,
    pub num_comments: Option<u32>,
}

impl Hit {
    /// Link for the story, falling back to the discussion page for text
    /// posts.
    pub fn link(&self) -> String {
        match self.url.as_deref() {
            Some(u) if !u.is_empty() => u.to_string(),
            _ => format!("https://news.ycombinator.com/item?id={}", self.object_id),
        }
    }

    pub fn engagement(&self) -> Engagement {
        Engagement::new(self.points.unwrap_or(0.0), self.num_comments.unwrap_or(0))
    }
}

pub struct HackerNewsAdapter {
    ctx: SourceContext,
}

impl HackerNewsAdapter {
    pub fn new(ctx: SourceContext) -> Self {
        Self { ctx }
    }

    pub(crate) fn map_hits(hits: &[Hit]) -> Vec<Item> {
        hits.iter()
            .map(|hit| Item {
                id: format!("hn-{}", hit.object_id),
                title: hit.title.clone().unwrap_or_default(),
                url: hit.link(),
                description: hit
                    .story_text
                    .as_deref()
                    .map(|t| truncate_chars(t, 200))
                    .unwrap_or_default(),
                source: "hackernews".into(),
                source_name: "Hacker News".into(),
                author: hit.author.clone().unwrap_or_default(),
                published_at: hit.created_at.clone().unwrap_or_default(),
                engagement: hit.engagement(),
                tags: vec!["ai".into()],
                kind: ItemKind::News,
                score: None,
                extra: None,
            })
            .collect()
    }
}

#[async_trait]
impl SourceAdapter for HackerNewsAdapter {
    async fn fetch_items(&self) -> Result<Vec<Item>> {
        if let Some(items) = self.ctx.cache.get::<Vec<Item>>(CACHE_KEY) {
            return Ok(items);
        }

        let week_ago = Utc::now().timestamp() - 7 * 24 * 60 * 60;
        let url = format!(
            "{SEARCH_BASE}?query={}&tags=story&numericFilters=created_at_i>{week_ago}&hitsPerPage={}",
            urlencoding::encode(&self.ctx.config.queries.hn),
            self.ctx.config.max_items_per_source.0,
        );

        let resp: SearchResponse = self
            .ctx
            .client
            .fetch_json(&url, false)
            .await
            .context("hacker news search")?;
        let items = Self::map_hits(&resp.hits);

        self.ctx.cache.set(CACHE_KEY, &items, self.ctx.config.ttl.news_ms);
        Ok(items)
    }

    fn name(&self) -> &'static str {
        "hackernews"
    }
}
