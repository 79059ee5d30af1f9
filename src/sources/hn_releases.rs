// src/sources/hn_releases.rs
//! Forum-based release detector: searches the news forum for major AI
//! product/model announcements, filtering out library/SDK/config churn and
//! low-engagement stories, and tagging items by company/product patterns.

use anyhow::Result;
use async_trait::async_trait;
use chrono::Utc;
use futures::future::join_all;
use once_cell::sync::OnceCell;
use regex::Regex;
use std::collections::HashSet;

use super::hackernews::{Hit, SearchResponse, SEARCH_BASE};
use super::{truncate_chars, SourceAdapter, SourceContext};
use crate::item::{Item, ItemKind};

const CACHE_KEY: &str = "hn_releases";

/// Major AI products/models/companies, not libraries or SDKs.
const PRODUCT_QUERIES: &[&str] = &[
    "Claude",
    "Opus",
    "Sonnet",
    "GPT-4",
    "GPT-5",
    "ChatGPT",
    "OpenAI Codex",
    "Gemini",
    "Gemma",
    "Llama",
    "Mistral",
    "DeepSeek",
    "Grok",
    "Kimi",
    "Qwen",
    "Copilot",
    "Cursor AI",
    "Windsurf",
    "Claude Code",
    "Stable Diffusion",
    "Midjourney",
    "Sora",
    "DALL-E",
    "Ollama",
    "Perplexity",
    "NotebookLM",
    "Replit Agent",
    // Inference & serving
    "vLLM",
    "TensorRT-LLM",
    "SGLang",
    "llama.cpp",
    "TGI",
    "LLM inference",
];

const QUERY_BATCH_SIZE: usize = 5;
const HITS_PER_BATCH: u32 = 15;

/// Stories about SDKs, packages, configs, docs, and minor patches are
/// maintenance noise, not product announcements.
fn noise_pattern() -> &'static Regex {
    static RE: OnceCell<Regex> = OnceCell::new();
    RE.get_or_init(|| {
        Regex::new(
            r"(?i)\b(sdk|npm|pip|package|library|binding|wrapper|client|dependency|dependencies|changelog|patch|hotfix|bugfix|docs update|readme|typo|config|lint|ci/cd|docker|yaml|\.toml|\.json schema)\b",
        )
        .unwrap()
    })
}

/// Ordered company/product tag table; one tag per matching category, first
/// match wins within a category.
fn tag_rules() -> &'static Vec<(Regex, &'static str)> {
    static RULES: OnceCell<Vec<(Regex, &'static str)>> = OnceCell::new();
    RULES.get_or_init(|| {
        [
            (r"claude|opus|sonnet|anthropic", "Anthropic"),
            (r"gpt|chatgpt|openai|codex|dall.e|sora", "OpenAI"),
            (r"gemini|gemma|google|deepmind|notebooklm", "Google"),
            (r"llama|meta ai", "Meta"),
            (r"mistral", "Mistral"),
            (r"deepseek", "DeepSeek"),
            (r"grok|xai", "xAI"),
            (r"kimi|moonshot", "Kimi"),
            (r"copilot|cursor|windsurf|claude code|replit", "coding-tool"),
            (r"stable diffusion|midjourney|flux|dall.e", "image-gen"),
            (r"perplexity", "search"),
            (
                r"vllm|tensorrt|sglang|llama\.cpp|tgi|inference|serving|throughput|latency|quantiz",
                "inference",
            ),
        ]
        .iter()
        .map(|(pat, tag)| (Regex::new(pat).unwrap(), *tag))
        .collect()
    })
}

/// Assign categorical tags from the title. Falls back to a generic tag when
/// nothing matches.
pub(crate) fn detect_tags(title: &str) -> Vec<String> {
    let t = title.to_lowercase();
    let mut tags: Vec<String> = tag_rules()
        .iter()
        .filter(|(re, _)| re.is_match(&t))
        .map(|(_, tag)| tag.to_string())
        .collect();
    if tags.is_empty() {
        tags.push("AI".into());
    }
    tags
}

pub(crate) fn is_noise(title: &str) -> bool {
    noise_pattern().is_match(title)
}

pub struct HnReleasesAdapter {
    ctx: SourceContext,
}

impl HnReleasesAdapter {
    pub fn new(ctx: SourceContext) -> Self {
        Self { ctx }
    }

    /// Batch product names into grouped OR-queries to keep the request count
    /// down.
    fn batch_queries() -> Vec<String> {
        PRODUCT_QUERIES
            .chunks(QUERY_BATCH_SIZE)
            .map(|group| {
                group
                    .iter()
                    .map(|p| format!("\"{p}\""))
                    .collect::<Vec<_>>()
                    .join(" OR ")
            })
            .collect()
    }

    pub(crate) fn map_hit(hit: &Hit) -> Item {
        Item {
            id: format!("hnr-{}", hit.object_id),
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
            tags: detect_tags(hit.title.as_deref().unwrap_or_default()),
            kind: ItemKind::Release,
            score: None,
            extra: None,
        }
    }
}

#[async_trait]
impl SourceAdapter for HnReleasesAdapter {
    async fn fetch_items(&self) -> Result<Vec<Item>> {
        if let Some(items) = self.ctx.cache.get::<Vec<Item>>(CACHE_KEY) {
            return Ok(items);
        }

        let month_ago = Utc::now().timestamp() - 30 * 24 * 60 * 60;
        let min_points = self.ctx.config.releases.min_points;

        let fetches = Self::batch_queries().into_iter().map(|query| {
            let url = format!(
                "{SEARCH_BASE}?query={}&tags=story&numericFilters=created_at_i>{month_ago},points>{min_points}&hitsPerPage={HITS_PER_BATCH}",
                urlencoding::encode(&query),
            );
            async move { self.ctx.client.fetch_json::<SearchResponse>(&url, false).await }
        });
        let results = join_all(fetches).await;

        let mut all_hits: Vec<Hit> = Vec::new();
        for result in results {
            match result {
                Ok(resp) => all_hits.extend(resp.hits),
                Err(e) => {
                    tracing::warn!(error = ?e, "release query batch failed");
                }
            }
        }

        let mut seen: HashSet<String> = HashSet::new();
        let items: Vec<Item> = all_hits
            .iter()
            .filter(|hit| seen.insert(hit.object_id.clone()))
            .filter(|hit| !is_noise(hit.title.as_deref().unwrap_or_default()))
            .map(Self::map_hit)
            .collect();

        self.ctx
            .cache
            .set(CACHE_KEY, &items, self.ctx.config.ttl.releases_ms);
        Ok(items)
    }

    fn name(&self) -> &'static str {
        "hn_releases"
    }
}
