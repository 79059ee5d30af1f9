// src/podcasts.rs
//! Podcast/video channel ingestion: latest uploads per configured channel
//! from the video platform's Atom feeds, fetched through the relay path and
//! cached per channel.

use anyhow::{Context, Result};
use futures::future::join_all;
use quick_xml::de::from_str;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use crate::cache::CacheStore;
use crate::config::PodcastChannel;
use crate::sources::scrub_html_entities_for_xml;
use crate::transport::ResilientClient;

const YT_FEED_URL: &str = "https://www.youtube.com/feeds/videos.xml?channel_id=";
const MAX_VIDEOS: usize = 5;
const CHANNEL_TTL_MS: u64 = 4 * 60 * 60 * 1000;
const FEED_TIMEOUT: Duration = Duration::from_secs(10);

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChannelVideo {
    pub title: String,
    pub url: String,
    pub video_id: String,
    pub published_at: String,
    pub thumbnail: String,
    pub description: String,
}

/// Per-channel video lists plus how many channels failed this round.
#[derive(Debug, Default)]
pub struct PodcastOutcome {
    pub videos_by_channel: HashMap<String, Vec<ChannelVideo>>,
    pub error_count: usize,
}

#[derive(Debug, Deserialize)]
struct Feed {
    #[serde(rename = "entry", default)]
    entries: Vec<Entry>,
}

#[derive(Debug, Deserialize)]
struct Entry {
    #[serde(rename = "yt:videoId")]
    video_id: Option<String>,
    id: Option<String>,
    title: Option<String>,
    published: Option<String>,
    #[serde(rename = "media:group")]
    group: Option<MediaGroup>,
}

#[derive(Debug, Default, Deserialize)]
struct MediaGroup {
    #[serde(rename = "media:thumbnail")]
    thumbnail: Option<Thumbnail>,
    #[serde(rename = "media:description")]
    description: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct Thumbnail {
    #[serde(rename = "@url")]
    url: Option<String>,
}

pub struct PodcastFetcher {
    client: Arc<ResilientClient>,
    cache: CacheStore,
}

impl PodcastFetcher {
    pub fn new(client: Arc<ResilientClient>, cache: CacheStore) -> Self {
        Self { client, cache }
    }

    pub(crate) fn parse_videos(xml: &str) -> Result<Vec<ChannelVideo>> {
        let clean = scrub_html_entities_for_xml(xml);
        let feed: Feed = from_str(&clean).context("parsing channel video feed")?;
        Ok(feed
            .entries
            .into_iter()
            .take(MAX_VIDEOS)
            .map(|entry| {
                // Prefer the explicit video id; fall back to the tail of the
                // namespaced <id> element (`yt:video:VIDEOID`).
                let video_id = entry
                    .video_id
                    .clone()
                    .or_else(|| {
                        entry
                            .id
                            .as_deref()
                            .and_then(|id| id.rsplit(':').next())
                            .map(str::to_string)
                    })
                    .unwrap_or_default();
                let group = entry.group.unwrap_or_default();
                ChannelVideo {
                    title: entry.title.unwrap_or_default(),
                    url: format!("https://www.youtube.com/watch?v={video_id}"),
                    thumbnail: group
                        .thumbnail
                        .and_then(|t| t.url)
                        .unwrap_or_else(|| {
                            format!("https://i.ytimg.com/vi/{video_id}/mqdefault.jpg")
                        }),
                    description: group.description.unwrap_or_default(),
                    published_at: entry.published.unwrap_or_default(),
                    video_id,
                }
            })
            .collect())
    }

    async fn fetch_channel(&self, channel_id: &str) -> Result<Vec<ChannelVideo>> {
        let cache_key = format!("podcast-yt:{channel_id}");
        if let Some(videos) = self.cache.get::<Vec<ChannelVideo>>(&cache_key) {
            return Ok(videos);
        }

        let url = format!("{YT_FEED_URL}{channel_id}");
        let body = self
            .client
            .fetch_text(&url, true, FEED_TIMEOUT)
            .await
            .with_context(|| format!("fetching channel feed {channel_id}"))?;
        let videos = Self::parse_videos(&body)?;

        self.cache.set(&cache_key, &videos, CHANNEL_TTL_MS);
        Ok(videos)
    }

    /// All-settled over the configured channels; a failed channel yields an
    /// empty list and bumps the error count.
    pub async fn fetch_all_channel_videos(&self, channels: &[PodcastChannel]) -> PodcastOutcome {
        let results = join_all(
            channels
                .iter()
                .map(|ch| self.fetch_channel(&ch.channel_id)),
        )
        .await;

        let mut outcome = PodcastOutcome::default();
        for (channel, result) in channels.iter().zip(results) {
            match result {
                Ok(videos) => {
                    outcome
                        .videos_by_channel
                        .insert(channel.channel_id.clone(), videos);
                }
                Err(e) => {
                    tracing::warn!(error = ?e, channel = %channel.name, "channel feed failed");
                    outcome
                        .videos_by_channel
                        .insert(channel.channel_id.clone(), Vec::new());
                    outcome.error_count += 1;
                }
            }
        }
        outcome
    }
}
