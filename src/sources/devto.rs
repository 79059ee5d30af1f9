// src/sources/devto.rs
//! Dev-blog-platform adapter: per-tag article queries, joined all-settled so
//! one failing tag never sinks the rest.

use anyhow::Result;
use async_trait::async_trait;
use futures::future::join_all;
use serde::Deserialize;
use std::collections::HashSet;

use super::{SourceAdapter, SourceContext};
use crate::item::{Engagement, Item, ItemKind};

const CACHE_KEY: &str = "devto";
const ARTICLES_BASE: &str = "https://dev.to/api/articles";

#[derive(Debug, Deserialize)]
struct Article {
    id: u64,
    title: Option<String>,
    url: Option<String>,
    description: Option<String>,
    #[serde(default)]
    user: Option<ArticleUser>,
    published_timestamp: Option<String>,
    published_at: Option<String>,
    #[serde(default)]
    positive_reactions_count: f64,
    #[serde(default)]
    comments_count: u32,
    #[serde(default)]
    tag_list: Vec<String>,
}

#[derive(Debug, Default, Deserialize)]
struct ArticleUser {
    name: Option<String>,
    username: Option<String>,
}

pub struct DevtoAdapter {
    ctx: SourceContext,
}

impl DevtoAdapter {
    pub fn new(ctx: SourceContext) -> Self {
        Self { ctx }
    }

    fn map_article(article: &Article) -> Item {
        let author = article
            .user
            .as_ref()
            .and_then(|u| u.name.clone().or_else(|| u.username.clone()))
            .unwrap_or_default();
        let published_at = article
            .published_timestamp
            .clone()
            .or_else(|| article.published_at.clone())
            .unwrap_or_default();
        Item {
            id: format!("devto-{}", article.id),
            title: article.title.clone().unwrap_or_default(),
            url: article.url.clone().unwrap_or_default(),
            description: article.description.clone().unwrap_or_default(),
            source: "devto".into(),
            source_name: "Dev.to".into(),
            author,
            published_at,
            engagement: Engagement::new(article.positive_reactions_count, article.comments_count),
            tags: article.tag_list.clone(),
            kind: ItemKind::News,
            score: None,
            extra: None,
        }
    }
}

#[async_trait]
impl SourceAdapter for DevtoAdapter {
    async fn fetch_items(&self) -> Result<Vec<Item>> {
        if let Some(items) = self.ctx.cache.get::<Vec<Item>>(CACHE_KEY) {
            return Ok(items);
        }

        let tags = &self.ctx.config.queries.devto_tags;
        if tags.is_empty() {
            return Ok(Vec::new());
        }
        let max = self.ctx.config.max_items_per_source.0;
        let per_tag = max.div_ceil(tags.len() as u32);

        let fetches = tags.iter().map(|tag| {
            let url = format!("{ARTICLES_BASE}?tag={tag}&top=7&per_page={per_tag}");
            async move { self.ctx.client.fetch_json::<Vec<Article>>(&url, false).await }
        });
        let results = join_all(fetches).await;

        let mut seen_ids: HashSet<u64> = HashSet::new();
        let mut items = Vec::new();
        for result in results {
            let articles = match result {
                Ok(v) => v,
                Err(e) => {
                    tracing::warn!(error = ?e, "devto tag fetch failed");
                    continue;
                }
            };
            for article in &articles {
                if seen_ids.insert(article.id) {
                    items.push(Self::map_article(article));
                }
            }
        }

        self.ctx.cache.set(CACHE_KEY, &items, self.ctx.config.ttl.news_ms);
        Ok(items)
    }

    fn name(&self) -> &'static str {
        "devto"
    }
}
