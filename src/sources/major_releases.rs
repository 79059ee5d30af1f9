// src/sources/major_releases.rs
//! Curated product-release adapter backed by a bundled JSON file. No network
//! and no cache layer; the file read is effectively instant.

use anyhow::{Context, Result};
use async_trait::async_trait;
use serde::Deserialize;
use std::fs;
use std::path::Path;

use super::{SourceAdapter, SourceContext};
use crate::item::{short_hash, Engagement, Extra, Item, ItemKind};

#[derive(Debug, Deserialize)]
struct ReleasesFile {
    #[serde(default)]
    releases: Vec<RawRelease>,
}

#[derive(Debug, Deserialize)]
struct RawRelease {
    title: String,
    url: String,
    #[serde(default)]
    description: String,
    company: String,
    /// Calendar date `YYYY-MM-DD`.
    date: String,
    /// Editorial significance rank, already on a 0-100 scale.
    significance: f64,
    category: Option<String>,
}

pub struct MajorReleasesAdapter {
    ctx: SourceContext,
}

impl MajorReleasesAdapter {
    pub fn new(ctx: SourceContext) -> Self {
        Self { ctx }
    }

    pub(crate) fn parse_file(path: &Path) -> Result<Vec<Item>> {
        let raw = fs::read_to_string(path)
            .with_context(|| format!("reading curated releases from {}", path.display()))?;
        let file: ReleasesFile = serde_json::from_str(&raw)
            .with_context(|| format!("parsing curated releases {}", path.display()))?;
        Ok(file.releases.iter().map(Self::map_release).collect())
    }

    fn map_release(release: &RawRelease) -> Item {
        Item {
            id: format!("major-{}", short_hash(&release.title)),
            title: release.title.clone(),
            url: release.url.clone(),
            description: release.description.clone(),
            source: "major_releases".into(),
            source_name: release.company.clone(),
            author: release.company.clone(),
            // Noon local keeps the calendar date stable across timezones.
            published_at: format!("{}T12:00:00", release.date),
            engagement: Engagement::new(release.significance, 0),
            tags: release
                .category
                .iter()
                .cloned()
                .chain(std::iter::once(release.company.clone()))
                .collect(),
            kind: ItemKind::Release,
            score: None,
            extra: Some(Extra {
                category: release.category.clone(),
                significance: Some(release.significance),
                ..Extra::default()
            }),
        }
    }
}

#[async_trait]
impl SourceAdapter for MajorReleasesAdapter {
    async fn fetch_items(&self) -> Result<Vec<Item>> {
        Self::parse_file(&self.ctx.config.releases.major_releases_path)
    }

    fn name(&self) -> &'static str {
        "major_releases"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write as _;

    #[test]
    fn curated_file_maps_to_release_items() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(
            file,
            r#"{{
                "releases": [
                    {{
                        "title": "Opus 5 launched",
                        "url": "https://example.com/opus-5",
                        "description": "Frontier model release",
                        "company": "Anthropic",
                        "date": "2026-08-01",
                        "significance": 95,
                        "category": "model"
                    }},
                    {{
                        "title": "Agent platform GA",
                        "url": "https://example.com/agents",
                        "company": "Acme",
                        "date": "2026-07-20",
                        "significance": 60
                    }}
                ]
            }}"#
        )
        .unwrap();

        let items = MajorReleasesAdapter::parse_file(file.path()).unwrap();
        assert_eq!(items.len(), 2);
        assert_eq!(items[0].published_at, "2026-08-01T12:00:00");
        assert_eq!(items[0].engagement.score, 95.0);
        assert_eq!(items[0].tags, vec!["model", "Anthropic"]);
        assert_eq!(items[0].extra.as_ref().unwrap().significance, Some(95.0));
        // category is optional; the company tag is always present
        assert_eq!(items[1].tags, vec!["Acme"]);
        assert!(items[1].id.starts_with("major-"));
    }

    #[test]
    fn missing_file_is_an_error_not_a_panic() {
        assert!(MajorReleasesAdapter::parse_file(Path::new("/nonexistent/releases.json")).is_err());
    }
}
