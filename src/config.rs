// src/config.rs
//! Pipeline configuration: cache TTLs, refresh intervals, source queries,
//! authority weights, engagement normalization rules, relay chain, and feed
//! lists.
//!
//! - Loads from TOML or JSON (partial files are fine; every section defaults).
//! - Falls back to a compiled-in seed when no config file is present.
//! - Engagement divisors and authority weights are deliberately data, not
//!   logic: they are empirically chosen and get recalibrated without touching
//!   the scoring algorithm.

use anyhow::{anyhow, Context, Result};
use serde::Deserialize;
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

use crate::item::Engagement;
use crate::transport::RelaySpec;

pub const ENV_CONFIG_PATH: &str = "DIGEST_CONFIG_PATH";

const DEFAULT_TOML_PATH: &str = "config/digest.toml";
const DEFAULT_JSON_PATH: &str = "config/digest.json";

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct DigestConfig {
    pub ttl: TtlConfig,
    pub refresh: RefreshConfig,
    pub max_items_per_source: MaxItems,
    pub queries: QueryConfig,
    pub authority: AuthorityConfig,
    pub engagement: EngagementConfig,
    pub relays: RelayConfig,
    pub feeds: FeedConfig,
    pub releases: ReleaseConfig,
    pub podcasts: PodcastConfig,
    pub learning: LearningConfig,
}

impl DigestConfig {
    /// Load configuration using env var + fallbacks:
    /// 1) $DIGEST_CONFIG_PATH
    /// 2) config/digest.toml
    /// 3) config/digest.json
    /// 4) compiled-in seed
    pub fn load_default() -> Result<Self> {
        if let Ok(p) = std::env::var(ENV_CONFIG_PATH) {
            let pb = PathBuf::from(p);
            if pb.exists() {
                return Self::load_from(&pb);
            }
            return Err(anyhow!("DIGEST_CONFIG_PATH points to non-existent path"));
        }
        let toml_p = PathBuf::from(DEFAULT_TOML_PATH);
        if toml_p.exists() {
            return Self::load_from(&toml_p);
        }
        let json_p = PathBuf::from(DEFAULT_JSON_PATH);
        if json_p.exists() {
            return Self::load_from(&json_p);
        }
        Ok(Self::default())
    }

    /// Load from an explicit path. Supports TOML or JSON by extension.
    pub fn load_from(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("reading digest config from {}", path.display()))?;
        let ext = path
            .extension()
            .and_then(|s| s.to_str())
            .unwrap_or_default()
            .to_ascii_lowercase();
        match ext.as_str() {
            "json" => serde_json::from_str(&content)
                .with_context(|| format!("parsing json config {}", path.display())),
            _ => toml::from_str(&content)
                .with_context(|| format!("parsing toml config {}", path.display())),
        }
    }
}

/// Per-category cache TTLs, in milliseconds.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct TtlConfig {
    pub news_ms: u64,
    pub papers_ms: u64,
    pub releases_ms: u64,
    pub resources_ms: u64,
}

impl Default for TtlConfig {
    fn default() -> Self {
        Self {
            news_ms: 10 * 60 * 1000,
            papers_ms: 30 * 60 * 1000,
            releases_ms: 15 * 60 * 1000,
            resources_ms: 24 * 60 * 60 * 1000,
        }
    }
}

/// Scheduler re-aggregation intervals, in milliseconds.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct RefreshConfig {
    pub news_ms: u64,
    pub papers_ms: u64,
    pub releases_ms: u64,
}

impl Default for RefreshConfig {
    fn default() -> Self {
        Self {
            news_ms: 10 * 60 * 1000,
            papers_ms: 30 * 60 * 1000,
            releases_ms: 15 * 60 * 1000,
        }
    }
}

/// Pagination cap applied by every adapter.
#[derive(Debug, Clone, Copy, Deserialize)]
#[serde(transparent)]
pub struct MaxItems(pub u32);

impl Default for MaxItems {
    fn default() -> Self {
        MaxItems(20)
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct QueryConfig {
    pub hn: String,
    pub devto_tags: Vec<String>,
    pub reddit_subreddits: String,
    /// Pre-encoded arXiv query fragment (goes into the URL verbatim).
    pub arxiv_categories: String,
    pub semantic_scholar: String,
}

impl Default for QueryConfig {
    fn default() -> Self {
        Self {
            hn: "AI OR \"artificial intelligence\" OR \"machine learning\" OR LLM OR \
                 \"large language model\" OR GPT OR \"deep learning\" OR vLLM OR \
                 \"LLM inference\" OR TensorRT"
                .into(),
            devto_tags: [
                "ai",
                "machinelearning",
                "deeplearning",
                "llm",
                "artificialintelligence",
                "inference",
            ]
            .into_iter()
            .map(String::from)
            .collect(),
            reddit_subreddits: "artificial+MachineLearning+deeplearning+LanguageTechnology+LocalLLaMA"
                .into(),
            arxiv_categories: "cat:cs.AI+OR+cat:cs.LG+OR+cat:cs.CL".into(),
            semantic_scholar: "artificial intelligence large language model".into(),
        }
    }
}

/// Fixed per-source trust weights in [0, 1], with prefix fallback for
/// namespaced multi-feed sources (`rss_<slug>` falls back to `rss`).
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct AuthorityConfig {
    pub default_weight: f64,
    pub weights: HashMap<String, f64>,
    /// source-id prefix -> canonical weight key
    pub prefixes: HashMap<String, String>,
}

impl Default for AuthorityConfig {
    fn default() -> Self {
        let mut weights = HashMap::new();
        for (k, v) in [
            ("hackernews", 0.9),
            ("devto", 0.6),
            ("reddit", 0.7),
            ("rss", 0.85),
            ("arxiv", 0.95),
            ("semantic_scholar", 0.9),
            ("huggingface", 0.85),
            ("major_releases", 1.0),
        ] {
            weights.insert(k.to_string(), v);
        }
        let mut prefixes = HashMap::new();
        prefixes.insert("rss_".to_string(), "rss".to_string());
        Self {
            default_weight: 0.5,
            weights,
            prefixes,
        }
    }
}

impl AuthorityConfig {
    /// Exact match, then prefix fallback, then default. Clamped to [0, 1].
    pub fn weight_for(&self, source: &str) -> f64 {
        if let Some(&w) = self.weights.get(source) {
            return w.clamp(0.0, 1.0);
        }
        for (prefix, canon) in &self.prefixes {
            if source.starts_with(prefix.as_str()) {
                if let Some(&w) = self.weights.get(canon) {
                    return w.clamp(0.0, 1.0);
                }
            }
        }
        self.default_weight.clamp(0.0, 1.0)
    }
}

/// How a source's native engagement signal maps into [0, 100].
///
/// The divisors are empirically chosen per source; keep them here rather
/// than in the scorer so recalibration is a config edit.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(tag = "mode", rename_all = "snake_case")]
pub enum EngagementRule {
    /// `(score + 0.5 * comments) / divisor`
    Combined { divisor: f64 },
    /// `score / divisor`, ignoring comments (e.g. citation counts)
    ScoreOnly { divisor: f64 },
    /// Flat constant for sources with no native signal
    Fixed { value: f64 },
}

impl EngagementRule {
    pub fn apply(&self, engagement: &Engagement) -> f64 {
        let v = match self {
            EngagementRule::Combined { divisor } => {
                (engagement.score + 0.5 * f64::from(engagement.comments)) / divisor
            }
            EngagementRule::ScoreOnly { divisor } => engagement.score / divisor,
            EngagementRule::Fixed { value } => *value,
        };
        v.clamp(0.0, 100.0)
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct EngagementConfig {
    pub default_value: f64,
    pub rules: HashMap<String, EngagementRule>,
    /// source-id prefix -> rule, consulted after exact matches
    pub prefix_rules: HashMap<String, EngagementRule>,
}

impl Default for EngagementConfig {
    fn default() -> Self {
        let mut rules = HashMap::new();
        rules.insert("hackernews".into(), EngagementRule::Combined { divisor: 3.0 });
        rules.insert("reddit".into(), EngagementRule::Combined { divisor: 10.0 });
        rules.insert("devto".into(), EngagementRule::Combined { divisor: 2.0 });
        rules.insert(
            "huggingface".into(),
            EngagementRule::Combined { divisor: 1.5 },
        );
        rules.insert(
            "semantic_scholar".into(),
            EngagementRule::ScoreOnly { divisor: 5.0 },
        );
        rules.insert(
            "major_releases".into(),
            EngagementRule::ScoreOnly { divisor: 1.0 },
        );
        rules.insert("arxiv".into(), EngagementRule::Fixed { value: 30.0 });

        let mut prefix_rules = HashMap::new();
        prefix_rules.insert("rss_".into(), EngagementRule::Fixed { value: 40.0 });

        Self {
            default_value: 20.0,
            rules,
            prefix_rules,
        }
    }
}

impl EngagementConfig {
    pub fn value_for(&self, source: &str, engagement: &Engagement) -> f64 {
        if let Some(rule) = self.rules.get(source) {
            return rule.apply(engagement);
        }
        for (prefix, rule) in &self.prefix_rules {
            if source.starts_with(prefix.as_str()) {
                return rule.apply(engagement);
            }
        }
        self.default_value.clamp(0.0, 100.0)
    }
}

/// Prioritized relay chain for origins that block direct cross-origin reads.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct RelayConfig {
    pub chain: Vec<RelaySpec>,
}

impl Default for RelayConfig {
    fn default() -> Self {
        Self {
            chain: vec![
                RelaySpec {
                    name: "allorigins".into(),
                    template: "https://api.allorigins.win/raw?url={url}".into(),
                },
                RelaySpec {
                    name: "corsproxy".into(),
                    template: "https://corsproxy.io/?url={url}".into(),
                },
            ],
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct FeedSpec {
    pub name: String,
    pub url: String,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct FeedConfig {
    pub feeds: Vec<FeedSpec>,
}

impl Default for FeedConfig {
    fn default() -> Self {
        let feeds = [
            // Company blogs
            ("Anthropic", "https://www.anthropic.com/feed.xml"),
            ("OpenAI Blog", "https://openai.com/blog/rss/"),
            (
                "Google AI Blog",
                "https://blog.research.google/feeds/posts/default?alt=rss",
            ),
            ("Meta AI", "https://ai.meta.com/blog/rss/"),
            ("Microsoft AI", "https://blogs.microsoft.com/ai/feed/"),
            // Inference & serving
            ("vLLM Blog", "https://blog.vllm.ai/feed.xml"),
            ("Anyscale Blog", "https://www.anyscale.com/blog/rss.xml"),
            // Popular AI media
            (
                "MIT Tech Review AI",
                "https://www.technologyreview.com/topic/artificial-intelligence/feed",
            ),
            ("The Gradient", "https://thegradient.pub/rss/"),
            ("Hugging Face Blog", "https://huggingface.co/blog/feed.xml"),
            ("Lilian Weng", "https://lilianweng.github.io/index.xml"),
        ]
        .into_iter()
        .map(|(name, url)| FeedSpec {
            name: name.into(),
            url: url.into(),
        })
        .collect();
        Self { feeds }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ReleaseConfig {
    /// Minimum points for a forum story to count as a release candidate.
    pub min_points: u32,
    /// Bundled curated-releases JSON file.
    pub major_releases_path: PathBuf,
}

impl Default for ReleaseConfig {
    fn default() -> Self {
        Self {
            min_points: 20,
            major_releases_path: PathBuf::from("data/major-releases.json"),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct PodcastChannel {
    pub name: String,
    pub channel_id: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct PodcastConfig {
    pub channels: Vec<PodcastChannel>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LearningTopic {
    pub id: String,
    /// Forum search query for the topic.
    pub query: String,
    /// dev.to tag for the topic.
    pub tag: String,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LearningConfig {
    pub topics: Vec<LearningTopic>,
}

impl Default for LearningConfig {
    fn default() -> Self {
        let topics = [
            ("deep-learning", "deep learning tutorial architecture CNN", "deeplearning"),
            ("nlp-transformers", "transformer NLP attention tutorial", "nlp"),
            ("llm-finetuning", "LLM fine-tuning training RLHF", "llm"),
            ("agentic-ai", "AI agent agentic design ReAct tool use", "ai"),
            ("mlops", "MLOps pipeline deployment kubernetes", "mlops"),
            ("llm-serving", "LLM inference serving vLLM deployment", "llm"),
            ("mcp-gateways", "MCP model context protocol gateway", "ai"),
            ("guardrails-ops", "AI guardrails safety production", "machinelearning"),
            ("llm-apis", "prompt engineering LLM API tutorial", "ai"),
            ("rag-vectors", "RAG retrieval augmented vector database", "ai"),
            ("agents-mcp", "AI agent building MCP tool LangGraph", "ai"),
            ("production-ai", "production AI app deployment LLM", "ai"),
        ]
        .into_iter()
        .map(|(id, query, tag)| LearningTopic {
            id: id.into(),
            query: query.into(),
            tag: tag.into(),
        })
        .collect();
        Self { topics }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn seed_matches_expected_tables() {
        let cfg = DigestConfig::default();
        assert_eq!(cfg.ttl.news_ms, 600_000);
        assert_eq!(cfg.ttl.papers_ms, 1_800_000);
        assert_eq!(cfg.max_items_per_source.0, 20);
        assert_eq!(cfg.feeds.feeds.len(), 11);
        assert_eq!(cfg.relays.chain[0].name, "allorigins");
        assert_eq!(cfg.learning.topics.len(), 12);
    }

    #[test]
    fn authority_prefix_and_default() {
        let cfg = AuthorityConfig::default();
        assert!((cfg.weight_for("arxiv") - 0.95).abs() < 1e-9);
        assert!((cfg.weight_for("rss_anthropic") - 0.85).abs() < 1e-9);
        assert!((cfg.weight_for("totally_unknown") - 0.5).abs() < 1e-9);
    }

    #[test]
    fn engagement_rules_match_source_shapes() {
        let cfg = EngagementConfig::default();
        let e = Engagement::new(150.0, 60);
        // hackernews: (150 + 30) / 3 = 60
        assert!((cfg.value_for("hackernews", &e) - 60.0).abs() < 1e-9);
        // semantic scholar ignores comments: 150 / 5 = 30
        assert!((cfg.value_for("semantic_scholar", &e) - 30.0).abs() < 1e-9);
        // rss feeds are flat 40 via prefix rule
        assert!((cfg.value_for("rss_the_gradient", &e) - 40.0).abs() < 1e-9);
        // unknown sources fall back to 20
        assert!((cfg.value_for("mystery", &e) - 20.0).abs() < 1e-9);
    }

    #[test]
    fn engagement_clamps_to_100() {
        let cfg = EngagementConfig::default();
        let e = Engagement::new(10_000.0, 0);
        assert!((cfg.value_for("hackernews", &e) - 100.0).abs() < 1e-9);
    }

    #[test]
    fn partial_toml_overlays_seed() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("digest.toml");
        std::fs::write(
            &path,
            r#"
[ttl]
news_ms = 5000

[authority]
default_weight = 0.4
"#,
        )
        .unwrap();
        let cfg = DigestConfig::load_from(&path).unwrap();
        assert_eq!(cfg.ttl.news_ms, 5000);
        // untouched sections keep their own defaults
        assert_eq!(cfg.ttl.papers_ms, 1_800_000);
        assert!((cfg.authority.default_weight - 0.4).abs() < 1e-9);
        assert_eq!(cfg.relays.chain.len(), 2);
    }

    #[test]
    fn json_config_parses_engagement_rules() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("digest.json");
        std::fs::write(
            &path,
            r#"{
                "engagement": {
                    "rules": {
                        "hackernews": { "mode": "combined", "divisor": 4.0 }
                    }
                }
            }"#,
        )
        .unwrap();
        let cfg = DigestConfig::load_from(&path).unwrap();
        assert_eq!(
            cfg.engagement.rules.get("hackernews"),
            Some(&EngagementRule::Combined { divisor: 4.0 })
        );
    }
}
