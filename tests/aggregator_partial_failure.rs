// tests/aggregator_partial_failure.rs
//! Aggregation-level guarantees: all-settled joins, cross-source dedup, and
//! the informational error channel.

use anyhow::{anyhow, Result};
use async_trait::async_trait;
use std::sync::Arc;

use ai_digest::config::DigestConfig;
use ai_digest::item::{Engagement, Item, ItemKind};
use ai_digest::scorer::Scorer;
use ai_digest::sources::SourceAdapter;
use ai_digest::Aggregator;

struct StaticAdapter {
    name: &'static str,
    items: Vec<Item>,
}

#[async_trait]
impl SourceAdapter for StaticAdapter {
    async fn fetch_items(&self) -> Result<Vec<Item>> {
        Ok(self.items.clone())
    }
    fn name(&self) -> &'static str {
        self.name
    }
}

struct FailingAdapter {
    message: &'static str,
}

#[async_trait]
impl SourceAdapter for FailingAdapter {
    async fn fetch_items(&self) -> Result<Vec<Item>> {
        Err(anyhow!("{}", self.message))
    }
    fn name(&self) -> &'static str {
        "failing"
    }
}

fn item(title: &str, url: &str, source: &str) -> Item {
    Item {
        id: ai_digest::item::short_hash(url),
        title: title.into(),
        url: url.into(),
        description: String::new(),
        source: source.into(),
        source_name: source.into(),
        author: String::new(),
        published_at: chrono::Utc::now().to_rfc3339(),
        engagement: Engagement::default(),
        tags: vec![],
        kind: ItemKind::News,
        score: None,
        extra: None,
    }
}

fn aggregator(news: Vec<Arc<dyn SourceAdapter>>) -> Aggregator {
    let scorer = Scorer::new(Arc::new(DigestConfig::default()));
    Aggregator::with_adapters(news, vec![], vec![], scorer)
}

#[tokio::test]
async fn failed_adapter_contributes_error_not_exception() {
    let agg = aggregator(vec![
        Arc::new(StaticAdapter {
            name: "a",
            items: vec![
                item("One", "https://a.com/1", "hackernews"),
                item("Two", "https://a.com/2", "hackernews"),
                item("Three", "https://a.com/3", "hackernews"),
            ],
        }),
        Arc::new(FailingAdapter { message: "timeout" }),
    ]);

    let outcome = agg.fetch_all_news().await;
    assert_eq!(outcome.items.len(), 3);
    assert_eq!(outcome.errors, vec!["timeout".to_string()]);
    // every surviving item is scored and the list is sorted descending
    assert!(outcome.items.iter().all(|i| i.score.is_some()));
    assert!(outcome
        .items
        .windows(2)
        .all(|w| w[0].score.unwrap() >= w[1].score.unwrap()));
}

#[tokio::test]
async fn cross_adapter_title_duplicates_collapse_to_first_seen() {
    let agg = aggregator(vec![
        Arc::new(StaticAdapter {
            name: "a",
            items: vec![item("GPT-5 Released", "https://a.com/x", "hackernews")],
        }),
        Arc::new(StaticAdapter {
            name: "b",
            items: vec![item("gpt-5 released!!", "https://b.com/y", "reddit")],
        }),
    ]);

    let outcome = agg.fetch_all_news().await;
    assert_eq!(outcome.items.len(), 1);
    assert_eq!(outcome.items[0].url, "https://a.com/x");
    assert!(outcome.errors.is_empty());
}

#[tokio::test]
async fn all_adapters_failing_still_returns_a_result() {
    let agg = aggregator(vec![
        Arc::new(FailingAdapter { message: "dns" }),
        Arc::new(FailingAdapter { message: "quota" }),
    ]);

    let outcome = agg.fetch_all_news().await;
    assert!(outcome.items.is_empty());
    assert_eq!(outcome.errors.len(), 2);
    assert!(outcome.errors.contains(&"dns".to_string()));
    assert!(outcome.errors.contains(&"quota".to_string()));
}

#[tokio::test]
async fn higher_authority_source_wins_the_sort() {
    let now = chrono::Utc::now().to_rfc3339();
    let mut curated = item("Opus 5 launched", "https://r.com/1", "major_releases");
    curated.engagement = Engagement::new(95.0, 0);
    curated.published_at = now.clone();
    let mut noise = item("Weekly ramblings", "https://r.com/2", "unknown_source");
    noise.published_at = now;

    let agg = aggregator(vec![Arc::new(StaticAdapter {
        name: "mixed",
        items: vec![noise, curated],
    })]);

    let outcome = agg.fetch_all_news().await;
    assert_eq!(outcome.items[0].source, "major_releases");
}
