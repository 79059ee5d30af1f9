// src/learning.rs
//! Trending learning resources per curriculum topic: a light two-source
//! search (news forum + dev-blog platform) with an educational-content bonus
//! in the ranking. Tutorials and guides outrank plain news for the same
//! popularity, and a 7-day recency half-life keeps evergreen material alive
//! longer than the main pipeline would.

use anyhow::Result;
use chrono::{DateTime, Utc};
use futures::future::join_all;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::cache::CacheStore;
use crate::config::LearningTopic;
use crate::scorer::parse_published_at;
use crate::sources::hackernews::{SearchResponse, SEARCH_BASE};
use crate::transport::ResilientClient;

const CACHE_TTL_MS: u64 = 30 * 60 * 1000;
const DEVTO_BASE: &str = "https://dev.to/api/articles";
const TOP_PER_TOPIC: usize = 2;

const EDU_KEYWORDS: &[&str] = &[
    "tutorial",
    "guide",
    "introduction",
    "intro",
    "explained",
    "how to",
    "course",
    "learn",
    "beginner",
    "from scratch",
    "step by step",
    "fundamentals",
    "getting started",
    "overview",
    "practical",
    "hands-on",
    "walkthrough",
];

const W_RECENCY: f64 = 0.20;
const W_POPULARITY: f64 = 0.30;
const W_AUTHORITY: f64 = 0.20;
const W_EDU: f64 = 0.30;

/// Educational recency half-life, in hours (7 days).
const EDU_DECAY_HOURS: f64 = 7.0 * 24.0;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrendingResource {
    pub title: String,
    pub url: String,
    pub points: f64,
    pub comments: u32,
    pub date: String,
    pub source: String,
    #[serde(default)]
    pub score: f64,
}

pub struct LearningFetcher {
    client: Arc<ResilientClient>,
    cache: CacheStore,
}

impl LearningFetcher {
    pub fn new(client: Arc<ResilientClient>, cache: CacheStore) -> Self {
        Self { client, cache }
    }

    async fn fetch_forum(&self, query: &str) -> Vec<TrendingResource> {
        let month_ago = Utc::now().timestamp() - 30 * 24 * 60 * 60;
        let url = format!(
            "{SEARCH_BASE}?query={}&tags=story&numericFilters=created_at_i>{month_ago},points>5&hitsPerPage=10",
            urlencoding::encode(query),
        );
        match self.client.fetch_json::<SearchResponse>(&url, false).await {
            Ok(resp) => resp
                .hits
                .iter()
                .map(|hit| TrendingResource {
                    title: hit.title.clone().unwrap_or_default(),
                    url: hit.link(),
                    points: hit.points.unwrap_or(0.0),
                    comments: hit.num_comments.unwrap_or(0),
                    date: hit.created_at.clone().unwrap_or_default(),
                    source: "hn".into(),
                    score: 0.0,
                })
                .collect(),
            Err(e) => {
                tracing::debug!(error = ?e, "forum trending fetch failed");
                Vec::new()
            }
        }
    }

    async fn fetch_devto(&self, tag: &str) -> Vec<TrendingResource> {
        #[derive(Deserialize)]
        struct Article {
            title: Option<String>,
            url: Option<String>,
            #[serde(default)]
            positive_reactions_count: f64,
            #[serde(default)]
            comments_count: u32,
            published_at: Option<String>,
        }

        let url = format!("{DEVTO_BASE}?tag={tag}&top=30&per_page=5");
        match self.client.fetch_json::<Vec<Article>>(&url, false).await {
            Ok(articles) => articles
                .into_iter()
                .map(|a| TrendingResource {
                    title: a.title.unwrap_or_default(),
                    url: a.url.unwrap_or_default(),
                    points: a.positive_reactions_count,
                    comments: a.comments_count,
                    date: a.published_at.unwrap_or_default(),
                    source: "devto".into(),
                    score: 0.0,
                })
                .collect(),
            Err(e) => {
                tracing::debug!(error = ?e, "devto trending fetch failed");
                Vec::new()
            }
        }
    }

    /// Top trending resources for one topic id, cached for 30 minutes.
    /// Unknown topics yield an empty list.
    pub async fn fetch_trending(
        &self,
        topics: &[LearningTopic],
        topic_id: &str,
    ) -> Result<Vec<TrendingResource>> {
        let cache_key = format!("lp-trending:{topic_id}");
        if let Some(cached) = self.cache.get::<Vec<TrendingResource>>(&cache_key) {
            return Ok(cached);
        }

        let Some(topic) = topics.iter().find(|t| t.id == topic_id) else {
            return Ok(Vec::new());
        };

        let (forum, devto) =
            futures::join!(self.fetch_forum(&topic.query), self.fetch_devto(&topic.tag));

        let mut seen = std::collections::HashSet::new();
        let now = Utc::now();
        let mut ranked: Vec<TrendingResource> = forum
            .into_iter()
            .chain(devto)
            .filter(|r| !r.url.is_empty() && seen.insert(r.url.clone()))
            .map(|mut r| {
                r.score = score_resource(&r, now);
                r
            })
            .collect();
        ranked.sort_by(|a, b| b.score.total_cmp(&a.score));
        ranked.truncate(TOP_PER_TOPIC);

        self.cache.set(&cache_key, &ranked, CACHE_TTL_MS);
        Ok(ranked)
    }

    /// Trending resources for every configured topic, all-settled in the
    /// sense that a failed topic simply contributes an empty list.
    pub async fn fetch_all_trending(
        &self,
        topics: &[LearningTopic],
    ) -> Vec<(String, Vec<TrendingResource>)> {
        let fetches = topics
            .iter()
            .map(|t| async move { (t.id.clone(), self.fetch_trending(topics, &t.id).await) });
        join_all(fetches)
            .await
            .into_iter()
            .map(|(id, result)| (id, result.unwrap_or_default()))
            .collect()
    }

}

/// `0.20*recency + 0.30*popularity + 0.20*authority + 0.30*edu_bonus`.
pub fn score_resource(resource: &TrendingResource, now: DateTime<Utc>) -> f64 {
    let title = resource.title.to_lowercase();
    let edu_bonus = if EDU_KEYWORDS.iter().any(|kw| title.contains(kw)) {
        25.0
    } else {
        0.0
    };

    let popularity = if resource.source == "hn" {
        resource.points / 3.0 + f64::from(resource.comments) * 0.5
    } else {
        resource.points / 2.0 + f64::from(resource.comments) * 0.5
    }
    .min(100.0);

    let recency = match parse_published_at(&resource.date) {
        Some(published) => {
            let age_hours = (now - published).num_seconds() as f64 / 3600.0;
            100.0 * (-age_hours / EDU_DECAY_HOURS).exp()
        }
        None => 0.0,
    };

    let authority = if resource.source == "hn" { 90.0 } else { 60.0 };

    recency * W_RECENCY + popularity * W_POPULARITY + authority * W_AUTHORITY + edu_bonus * W_EDU
}
