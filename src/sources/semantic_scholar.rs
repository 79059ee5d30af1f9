// src/sources/semantic_scholar.rs
//! Citation-index adapter over the graph paper-search API. Tries a direct
//! request first and falls back to the relay path, since the API throttles
//! some networks and not others.

use anyhow::{Context, Result};
use async_trait::async_trait;
use serde::Deserialize;

use super::{truncate_chars, SourceAdapter, SourceContext};
use crate::item::{Engagement, Extra, Item, ItemKind};

const CACHE_KEY: &str = "semantic_scholar";
const SEARCH_BASE: &str = "https://api.semanticscholar.org/graph/v1/paper/search";
const FIELDS: &str = "title,url,abstract,year,citationCount,authors,publicationDate,openAccessPdf";

const MAX_LISTED_AUTHORS: usize = 5;

#[derive(Debug, Deserialize)]
struct SearchResponse {
    #[serde(default)]
    data: Vec<Paper>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Paper {
    paper_id: String,
    title: Option<String>,
    url: Option<String>,
    #[serde(rename = "abstract")]
    abstract_text: Option<String>,
    year: Option<i32>,
    citation_count: Option<u64>,
    #[serde(default)]
    authors: Vec<PaperAuthor>,
    publication_date: Option<String>,
    open_access_pdf: Option<OpenAccessPdf>,
}

#[derive(Debug, Deserialize)]
struct PaperAuthor {
    name: Option<String>,
}

#[derive(Debug, Deserialize)]
struct OpenAccessPdf {
    url: Option<String>,
}

pub struct SemanticScholarAdapter {
    ctx: SourceContext,
}

impl SemanticScholarAdapter {
    pub fn new(ctx: SourceContext) -> Self {
        Self { ctx }
    }

    fn map_paper(paper: &Paper) -> Item {
        let names: Vec<String> = paper
            .authors
            .iter()
            .filter_map(|a| a.name.clone())
            .collect();
        let mut author = names
            .iter()
            .take(MAX_LISTED_AUTHORS)
            .cloned()
            .collect::<Vec<_>>()
            .join(", ");
        if paper.authors.len() > MAX_LISTED_AUTHORS {
            author.push_str(" et al.");
        }

        let published_at = paper
            .publication_date
            .clone()
            .or_else(|| paper.year.map(|y| format!("{y}-01-01")))
            .unwrap_or_default();

        Item {
            id: format!("ss-{}", paper.paper_id),
            title: paper.title.clone().unwrap_or_default(),
            url: paper.url.clone().unwrap_or_else(|| {
                format!("https://www.semanticscholar.org/paper/{}", paper.paper_id)
            }),
            description: truncate_chars(paper.abstract_text.as_deref().unwrap_or_default(), 300),
            source: "semantic_scholar".into(),
            source_name: "Semantic Scholar".into(),
            author,
            published_at,
            engagement: Engagement::new(paper.citation_count.unwrap_or(0) as f64, 0),
            tags: vec!["ai".into(), "ml".into()],
            kind: ItemKind::Paper,
            score: None,
            extra: Some(Extra {
                pdf_url: paper.open_access_pdf.as_ref().and_then(|p| p.url.clone()),
                citations: paper.citation_count,
                ..Extra::default()
            }),
        }
    }
}

#[async_trait]
impl SourceAdapter for SemanticScholarAdapter {
    async fn fetch_items(&self) -> Result<Vec<Item>> {
        if let Some(items) = self.ctx.cache.get::<Vec<Item>>(CACHE_KEY) {
            return Ok(items);
        }

        let url = format!(
            "{SEARCH_BASE}?query={}&fields={FIELDS}&limit={}&year=2024-2026",
            urlencoding::encode(&self.ctx.config.queries.semantic_scholar),
            self.ctx.config.max_items_per_source.0,
        );

        let resp: SearchResponse = match self.ctx.client.fetch_json(&url, false).await {
            Ok(resp) => resp,
            Err(e) => {
                tracing::debug!(error = ?e, "semantic scholar direct fetch failed, retrying via relay");
                self.ctx
                    .client
                    .fetch_json(&url, true)
                    .await
                    .context("semantic scholar search")?
            }
        };

        let items: Vec<Item> = resp.data.iter().map(Self::map_paper).collect();
        self.ctx.cache.set(CACHE_KEY, &items, self.ctx.config.ttl.papers_ms);
        Ok(items)
    }

    fn name(&self) -> &'static str {
        "semantic_scholar"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn paper_maps_with_citations_and_pdf_extra() {
        let raw = r#"{
            "paperId": "p1",
            "title": "Scaling Laws Revisited",
            "abstract": "We revisit scaling laws.",
            "year": 2025,
            "citationCount": 42,
            "authors": [{"name": "X"}, {"name": "Y"}],
            "publicationDate": "2025-11-02",
            "openAccessPdf": {"url": "https://pdfs.example.com/p1.pdf"}
        }"#;
        let paper: Paper = serde_json::from_str(raw).unwrap();
        let item = SemanticScholarAdapter::map_paper(&paper);
        assert_eq!(item.id, "ss-p1");
        assert_eq!(item.url, "https://www.semanticscholar.org/paper/p1");
        assert_eq!(item.engagement.score, 42.0);
        assert_eq!(item.engagement.comments, 0);
        let extra = item.extra.unwrap();
        assert_eq!(extra.citations, Some(42));
        assert_eq!(extra.pdf_url.as_deref(), Some("https://pdfs.example.com/p1.pdf"));
    }

    #[test]
    fn year_fallback_builds_january_first_date() {
        let paper: Paper =
            serde_json::from_str(r#"{"paperId": "p2", "year": 2024}"#).unwrap();
        let item = SemanticScholarAdapter::map_paper(&paper);
        assert_eq!(item.published_at, "2024-01-01");
    }
}
