// src/sources/huggingface.rs
//! Model-hub papers adapter over the daily-papers endpoint. Entries usually
//! wrap the paper in an envelope with community engagement, but the endpoint
//! has also served bare paper objects; both shapes are accepted.

use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::Utc;
use serde::Deserialize;

use super::{truncate_chars, SourceAdapter, SourceContext};
use crate::item::{Engagement, Item, ItemKind};

const CACHE_KEY: &str = "huggingface";
const DAILY_PAPERS_URL: &str = "https://huggingface.co/api/daily_papers?limit=30";

#[derive(Debug, Deserialize)]
struct DailyEntry {
    paper: Option<PaperInfo>,
    #[serde(rename = "publishedAt")]
    published_at: Option<String>,
    upvotes: Option<f64>,
    #[serde(rename = "numComments")]
    num_comments: Option<u32>,
    #[serde(flatten)]
    inline: PaperInfo,
}

#[derive(Debug, Default, Deserialize)]
struct PaperInfo {
    id: Option<String>,
    #[serde(rename = "_id")]
    mongo_id: Option<String>,
    title: Option<String>,
    summary: Option<String>,
    #[serde(default)]
    authors: Vec<HfAuthor>,
    #[serde(rename = "publishedAt")]
    published_at: Option<String>,
    upvotes: Option<f64>,
    ai_keywords: Option<Vec<String>>,
}

#[derive(Debug, Default, Deserialize)]
struct HfAuthor {
    name: Option<String>,
    user: Option<HfUser>,
}

#[derive(Debug, Default, Deserialize)]
struct HfUser {
    fullname: Option<String>,
}

pub struct HuggingFaceAdapter {
    ctx: SourceContext,
}

impl HuggingFaceAdapter {
    pub fn new(ctx: SourceContext) -> Self {
        Self { ctx }
    }

    fn map_entry(entry: &DailyEntry) -> Item {
        let paper = entry.paper.as_ref().unwrap_or(&entry.inline);
        let paper_id = paper
            .id
            .clone()
            .or_else(|| paper.mongo_id.clone())
            .unwrap_or_default();

        let author = paper
            .authors
            .iter()
            .take(5)
            .filter_map(|a| {
                a.name
                    .clone()
                    .or_else(|| a.user.as_ref().and_then(|u| u.fullname.clone()))
            })
            .collect::<Vec<_>>()
            .join(", ");

        let published_at = paper
            .published_at
            .clone()
            .or_else(|| entry.published_at.clone())
            .unwrap_or_else(|| Utc::now().to_rfc3339());

        let upvotes = paper.upvotes.or(entry.upvotes).unwrap_or(0.0);

        Item {
            id: format!("hf-{paper_id}"),
            title: paper.title.clone().unwrap_or_default(),
            url: format!("https://huggingface.co/papers/{paper_id}"),
            description: truncate_chars(paper.summary.as_deref().unwrap_or_default(), 300),
            source: "huggingface".into(),
            source_name: "HuggingFace".into(),
            author,
            published_at,
            engagement: Engagement::new(upvotes, entry.num_comments.unwrap_or(0)),
            tags: paper
                .ai_keywords
                .clone()
                .unwrap_or_else(|| vec!["ai".into()]),
            kind: ItemKind::Paper,
            score: None,
            extra: None,
        }
    }
}

#[async_trait]
impl SourceAdapter for HuggingFaceAdapter {
    async fn fetch_items(&self) -> Result<Vec<Item>> {
        if let Some(items) = self.ctx.cache.get::<Vec<Item>>(CACHE_KEY) {
            return Ok(items);
        }

        let entries: Vec<DailyEntry> = match self.ctx.client.fetch_json(DAILY_PAPERS_URL, false).await
        {
            Ok(v) => v,
            Err(e) => {
                tracing::debug!(error = ?e, "daily papers direct fetch failed, retrying via relay");
                self.ctx
                    .client
                    .fetch_json(DAILY_PAPERS_URL, true)
                    .await
                    .context("daily papers")?
            }
        };

        let items: Vec<Item> = entries.iter().map(Self::map_entry).collect();
        self.ctx.cache.set(CACHE_KEY, &items, self.ctx.config.ttl.papers_ms);
        Ok(items)
    }

    fn name(&self) -> &'static str {
        "huggingface"
    }
}
