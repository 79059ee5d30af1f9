//! One-shot demo: run a single aggregation round per category and print the
//! top items with their scores.

use std::sync::Arc;

use ai_digest::{Aggregator, DigestConfig, SourceContext};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env in local/dev; no-op elsewhere. Enables DIGEST_CONFIG_PATH.
    let _ = dotenvy::dotenv();
    tracing_subscriber::fmt().with_target(false).init();

    let config = Arc::new(DigestConfig::load_default()?);
    let ctx = SourceContext::with_defaults(config);
    let aggregator = Aggregator::new(ctx);

    let rounds = [
        ("news", aggregator.fetch_all_news().await),
        ("papers", aggregator.fetch_all_papers().await),
        ("releases", aggregator.fetch_all_releases().await),
    ];

    for (category, outcome) in rounds {
        println!(
            "== {category}: {} items ({} source(s) unavailable)",
            outcome.items.len(),
            outcome.errors.len()
        );
        for item in outcome.items.iter().take(5) {
            println!(
                "  [{:>3}] {} ({})",
                item.score.unwrap_or(0),
                item.title,
                item.source_name
            );
        }
        for error in &outcome.errors {
            tracing::warn!(error, category, "source unavailable");
        }
    }

    Ok(())
}
