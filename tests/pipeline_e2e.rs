// tests/pipeline_e2e.rs
//! Fixture-driven end-to-end run: scripted HTTP -> real adapters (with the
//! relay path for the feed origin) -> dedup -> scoring -> sorted outcome,
//! plus cache behavior across a second round.

mod support;

use std::sync::Arc;

use ai_digest::cache::{CacheStore, MemoryStorage};
use ai_digest::config::{DigestConfig, FeedSpec};
use ai_digest::scorer::Scorer;
use ai_digest::sources::hackernews::HackerNewsAdapter;
use ai_digest::sources::rss::RssAdapter;
use ai_digest::sources::{SourceAdapter, SourceContext};
use ai_digest::transport::ResilientClient;
use ai_digest::Aggregator;
use support::{json_response, xml_response, FakeDispatcher, Scripted};

const HN_FIXTURE: &str = include_str!("fixtures/hn_search.json");
const FEED_FIXTURE: &str = include_str!("fixtures/example_feed.xml");

fn scripted_pipeline() -> (Arc<FakeDispatcher>, Aggregator) {
    let dispatcher = Arc::new(FakeDispatcher::new(vec![
        (
            "https://hn.algolia.com/".into(),
            Scripted::Ok(json_response(HN_FIXTURE)),
        ),
        // the feed origin refuses direct reads; only the relay path works
        (
            "https://blog.example.com/".into(),
            Scripted::Fail("blocked by cors"),
        ),
        (
            "https://api.allorigins.win/".into(),
            Scripted::Ok(xml_response(FEED_FIXTURE)),
        ),
    ]));

    let mut config = DigestConfig::default();
    config.feeds.feeds = vec![FeedSpec {
        name: "Example Blog".into(),
        url: "https://blog.example.com/feed.xml".into(),
    }];
    let config = Arc::new(config);

    let client = Arc::new(ResilientClient::new(
        dispatcher.clone(),
        config.relays.chain.clone(),
    ));
    let cache = CacheStore::new(Arc::new(MemoryStorage::unbounded()));
    let ctx = SourceContext::new(client, cache, config.clone());

    let news: Vec<Arc<dyn SourceAdapter>> = vec![
        Arc::new(HackerNewsAdapter::new(ctx.clone())),
        Arc::new(RssAdapter::new(ctx.clone())),
    ];
    let aggregator =
        Aggregator::with_adapters(news, vec![], vec![], Scorer::new(config));
    (dispatcher, aggregator)
}

#[tokio::test]
async fn fixtures_flow_through_fetch_dedup_score_sort() {
    let (_dispatcher, aggregator) = scripted_pipeline();

    let outcome = aggregator.fetch_all_news().await;
    assert!(outcome.errors.is_empty());

    // 2 forum hits + 2 feed posts, minus the cross-source title duplicate
    assert_eq!(outcome.items.len(), 3);

    // the forum copy of the duplicated story came first in adapter order
    let classifier = outcome
        .items
        .iter()
        .find(|i| i.title.to_lowercase().contains("classifiers"))
        .unwrap();
    assert_eq!(classifier.source, "hackernews");
    assert_eq!(classifier.url, "https://example.com/classifiers-hn");

    // feed items carry the namespaced source id and the feed display name
    let feed_item = outcome
        .items
        .iter()
        .find(|i| i.source.starts_with("rss_"))
        .unwrap();
    assert_eq!(feed_item.source, "rss_example_blog");
    assert_eq!(feed_item.source_name, "Example Blog");

    // scored, sorted, bounded
    assert!(outcome.items.iter().all(|i| i.score.is_some()));
    assert!(outcome.items.iter().all(|i| i.score.unwrap() <= 100));
    assert!(outcome
        .items
        .windows(2)
        .all(|w| w[0].score.unwrap() >= w[1].score.unwrap()));
}

#[tokio::test]
async fn second_round_is_served_from_cache() {
    let (dispatcher, aggregator) = scripted_pipeline();

    let first = aggregator.fetch_all_news().await;
    let calls_after_first = dispatcher.calls.lock().unwrap().len();

    let second = aggregator.fetch_all_news().await;
    let calls_after_second = dispatcher.calls.lock().unwrap().len();

    assert_eq!(first.items.len(), second.items.len());
    // no new HTTP traffic: both adapters answered from cache
    assert_eq!(calls_after_first, calls_after_second);
}

#[tokio::test]
async fn text_posts_fall_back_to_discussion_links() {
    let (_dispatcher, aggregator) = scripted_pipeline();
    let outcome = aggregator.fetch_all_news().await;

    let ask = outcome
        .items
        .iter()
        .find(|i| i.title.starts_with("Ask HN"))
        .unwrap();
    assert_eq!(ask.url, "https://news.ycombinator.com/item?id=41001002");
    assert_eq!(ask.description, "Curious what people run at home for 70B models.");
}
