// src/aggregator.rs
//! Category orchestration: fan out to the configured adapters, join
//! all-settled, concatenate, deduplicate, score, and sort.
//!
//! Adapter failures never cancel siblings and never fail the aggregation;
//! they surface as message strings in [`AggregateOutcome::errors`], intended
//! for a non-blocking "N source(s) unavailable" notice.

use futures::future::join_all;
use metrics::{counter, describe_counter, describe_gauge, describe_histogram, gauge, histogram};
use once_cell::sync::OnceCell;
use std::sync::Arc;

use crate::dedup::deduplicate;
use crate::item::Item;
use crate::scorer::Scorer;
use crate::sources::{
    arxiv::ArxivAdapter, devto::DevtoAdapter, hackernews::HackerNewsAdapter,
    hn_releases::HnReleasesAdapter, huggingface::HuggingFaceAdapter,
    major_releases::MajorReleasesAdapter, reddit::RedditAdapter, rss::RssAdapter,
    semantic_scholar::SemanticScholarAdapter, SourceAdapter, SourceContext,
};

/// One-time metrics registration (so series show up on scrape).
fn ensure_metrics_described() {
    static ONCE: OnceCell<()> = OnceCell::new();
    ONCE.get_or_init(|| {
        describe_counter!("digest_items_total", "Items returned by adapters before dedup.");
        describe_counter!("digest_dedup_dropped_total", "Items removed as duplicates.");
        describe_counter!("digest_adapter_errors_total", "Adapter fetch/parse failures.");
        describe_counter!("digest_cache_hits_total", "Cache reads served fresh.");
        describe_counter!("digest_cache_misses_total", "Cache reads that missed or were malformed.");
        describe_counter!("digest_cache_expired_total", "Cache entries evicted lazily on read.");
        describe_counter!("digest_cache_evictions_total", "Quota-driven oldest-entry evictions.");
        describe_counter!("digest_transport_direct_total", "Requests pinned to the direct route.");
        describe_counter!("digest_transport_relay_total", "Requests served through a relay.");
        describe_counter!(
            "digest_transport_relay_rejected_html_total",
            "Relay responses rejected as masquerading HTML."
        );
        describe_counter!("digest_transport_exhausted_total", "Requests that ran out of relays.");
        describe_histogram!("digest_aggregate_ms", "Aggregation round time in milliseconds.");
        describe_gauge!("digest_aggregate_last_run_ts", "Unix ts of the last aggregation run.");
    });
}

/// Result of one aggregation round. `errors` is informational only.
#[derive(Debug, Clone)]
pub struct AggregateOutcome {
    pub items: Vec<Item>,
    pub errors: Vec<String>,
}

pub struct Aggregator {
    news: Vec<Arc<dyn SourceAdapter>>,
    papers: Vec<Arc<dyn SourceAdapter>>,
    releases: Vec<Arc<dyn SourceAdapter>>,
    scorer: Scorer,
}

impl Aggregator {
    /// Wire the fixed adapter set per category from a shared context.
    pub fn new(ctx: SourceContext) -> Self {
        let news: Vec<Arc<dyn SourceAdapter>> = vec![
            Arc::new(HackerNewsAdapter::new(ctx.clone())),
            Arc::new(DevtoAdapter::new(ctx.clone())),
            Arc::new(RedditAdapter::new(ctx.clone())),
            Arc::new(RssAdapter::new(ctx.clone())),
        ];
        let papers: Vec<Arc<dyn SourceAdapter>> = vec![
            Arc::new(ArxivAdapter::new(ctx.clone())),
            Arc::new(SemanticScholarAdapter::new(ctx.clone())),
            Arc::new(HuggingFaceAdapter::new(ctx.clone())),
        ];
        let releases: Vec<Arc<dyn SourceAdapter>> = vec![
            Arc::new(MajorReleasesAdapter::new(ctx.clone())),
            Arc::new(HnReleasesAdapter::new(ctx.clone())),
        ];
        let scorer = Scorer::new(ctx.config.clone());
        Self {
            news,
            papers,
            releases,
            scorer,
        }
    }

    /// Custom adapter sets, mainly for tests and embedders that add or remove
    /// sources.
    pub fn with_adapters(
        news: Vec<Arc<dyn SourceAdapter>>,
        papers: Vec<Arc<dyn SourceAdapter>>,
        releases: Vec<Arc<dyn SourceAdapter>>,
        scorer: Scorer,
    ) -> Self {
        Self {
            news,
            papers,
            releases,
            scorer,
        }
    }

    pub async fn fetch_all_news(&self) -> AggregateOutcome {
        self.run("news", &self.news).await
    }

    pub async fn fetch_all_papers(&self) -> AggregateOutcome {
        self.run("papers", &self.papers).await
    }

    pub async fn fetch_all_releases(&self) -> AggregateOutcome {
        self.run("releases", &self.releases).await
    }

    /// All-settled join over the category's adapters: every future is awaited
    /// independently, a rejection contributes its message and zero items.
    async fn collect(&self, adapters: &[Arc<dyn SourceAdapter>]) -> (Vec<Item>, Vec<String>) {
        let results = join_all(adapters.iter().map(|a| a.fetch_items())).await;
        let mut items = Vec::new();
        let mut errors = Vec::new();
        for (adapter, result) in adapters.iter().zip(results) {
            match result {
                Ok(mut fetched) => items.append(&mut fetched),
                Err(e) => {
                    tracing::warn!(error = ?e, adapter = adapter.name(), "adapter failed");
                    counter!("digest_adapter_errors_total").increment(1);
                    errors.push(e.to_string());
                }
            }
        }
        (items, errors)
    }

    async fn run(&self, category: &str, adapters: &[Arc<dyn SourceAdapter>]) -> AggregateOutcome {
        ensure_metrics_described();
        let t0 = std::time::Instant::now();

        let (items, errors) = self.collect(adapters).await;
        counter!("digest_items_total").increment(items.len() as u64);

        let deduped = deduplicate(items);
        let scored = self.scorer.score_and_sort(deduped);

        histogram!("digest_aggregate_ms").record(t0.elapsed().as_secs_f64() * 1_000.0);
        gauge!("digest_aggregate_last_run_ts")
            .set(chrono::Utc::now().timestamp().max(0) as f64);
        tracing::info!(
            target: "aggregate",
            category,
            items = scored.len(),
            errors = errors.len(),
            "aggregation round finished"
        );

        AggregateOutcome {
            items: scored,
            errors,
        }
    }
}
