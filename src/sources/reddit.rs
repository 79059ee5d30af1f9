// src/sources/reddit.rs
//! Social-forum adapter over the multi-subreddit listing API. The origin
//! refuses direct cross-origin reads, so this adapter opts into the relay
//! path.

use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::{DateTime, SecondsFormat};
use serde::Deserialize;

use super::{truncate_chars, SourceAdapter, SourceContext};
use crate::item::{Engagement, Item, ItemKind};

const CACHE_KEY: &str = "reddit";

#[derive(Debug, Deserialize)]
struct Listing {
    data: ListingData,
}

#[derive(Debug, Deserialize)]
struct ListingData {
    #[serde(default)]
    children: Vec<Child>,
}

#[derive(Debug, Deserialize)]
struct Child {
    data: Post,
}

#[derive(Debug, Deserialize)]
struct Post {
    id: String,
    title: Option<String>,
    url: Option<String>,
    permalink: Option<String>,
    selftext: Option<String>,
    subreddit: Option<String>,
    author: Option<String>,
    created_utc: Option<f64>,
    #[serde(default)]
    score: f64,
    #[serde(default)]
    num_comments: u32,
    #[serde(default)]
    stickied: bool,
}

pub struct RedditAdapter {
    ctx: SourceContext,
}

impl RedditAdapter {
    pub fn new(ctx: SourceContext) -> Self {
        Self { ctx }
    }

    fn map_post(post: &Post) -> Item {
        // Self-posts carry a relative `/r/...` url; resolve to the permalink.
        let url = match post.url.as_deref() {
            Some(u) if !u.is_empty() && !u.starts_with("/r/") => u.to_string(),
            _ => format!(
                "https://www.reddit.com{}",
                post.permalink.as_deref().unwrap_or_default()
            ),
        };
        let published_at = post
            .created_utc
            .and_then(|secs| DateTime::from_timestamp(secs as i64, 0))
            .map(|dt| dt.to_rfc3339_opts(SecondsFormat::Millis, true))
            .unwrap_or_default();
        let subreddit = post.subreddit.clone().unwrap_or_default();
        Item {
            id: format!("reddit-{}", post.id),
            title: post.title.clone().unwrap_or_default(),
            url,
            description: post
                .selftext
                .as_deref()
                .map(|t| truncate_chars(t, 200))
                .unwrap_or_default(),
            source: "reddit".into(),
            source_name: format!("r/{subreddit}"),
            author: post.author.clone().unwrap_or_default(),
            published_at,
            engagement: Engagement::new(post.score, post.num_comments),
            tags: vec![subreddit],
            kind: ItemKind::News,
            score: None,
            extra: None,
        }
    }
}

#[async_trait]
impl SourceAdapter for RedditAdapter {
    async fn fetch_items(&self) -> Result<Vec<Item>> {
        if let Some(items) = self.ctx.cache.get::<Vec<Item>>(CACHE_KEY) {
            return Ok(items);
        }

        let url = format!(
            "https://www.reddit.com/r/{}/hot.json?limit={}&raw_json=1",
            self.ctx.config.queries.reddit_subreddits,
            self.ctx.config.max_items_per_source.0,
        );
        let listing: Listing = self
            .ctx
            .client
            .fetch_json(&url, true)
            .await
            .context("reddit hot listing")?;

        let items: Vec<Item> = listing
            .data
            .children
            .iter()
            .filter(|c| !c.data.stickied)
            .map(|c| Self::map_post(&c.data))
            .collect();

        self.ctx.cache.set(CACHE_KEY, &items, self.ctx.config.ttl.news_ms);
        Ok(items)
    }

    fn name(&self) -> &'static str {
        "reddit"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn post(url: Option<&str>) -> Post {
        Post {
            id: "abc1".into(),
            title: Some("Local agents thread".into()),
            url: url.map(String::from),
            permalink: Some("/r/LocalLLaMA/comments/abc1/local_agents_thread/".into()),
            selftext: Some("What stacks are people running?".into()),
            subreddit: Some("LocalLLaMA".into()),
            author: Some("llmfan".into()),
            created_utc: Some(1_754_000_000.0),
            score: 120.0,
            num_comments: 45,
            stickied: false,
        }
    }

    #[test]
    fn external_link_is_kept() {
        let item = RedditAdapter::map_post(&post(Some("https://example.com/blog")));
        assert_eq!(item.url, "https://example.com/blog");
        assert_eq!(item.source_name, "r/LocalLLaMA");
        assert_eq!(item.tags, vec!["LocalLLaMA"]);
    }

    #[test]
    fn relative_link_resolves_to_permalink() {
        let item = RedditAdapter::map_post(&post(Some("/r/LocalLLaMA/comments/abc1/x/")));
        assert_eq!(
            item.url,
            "https://www.reddit.com/r/LocalLLaMA/comments/abc1/local_agents_thread/"
        );
    }

    #[test]
    fn epoch_seconds_become_iso_timestamps() {
        let item = RedditAdapter::map_post(&post(None));
        assert!(item.published_at.ends_with('Z'));
        assert!(item.published_at.starts_with("2025-"));
    }
}
