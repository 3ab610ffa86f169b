// src/scrape/sources.rs
use anyhow::{anyhow, Context, Result};
use std::path::{Path, PathBuf};

use crate::scrape::types::{Category, SourceDescriptor};

const ENV_PATH: &str = "SCRAPER_SOURCES_PATH";

/// Built-in registry. Sources without a feed URL are registered for future
/// scraping strategies and contribute nothing during a cycle.
pub fn builtin_sources() -> Vec<SourceDescriptor> {
    vec![
        SourceDescriptor::new(
            "techcrunch",
            Some("https://feeds.techcrunch.com/techcrunch/startups"),
            "https://techcrunch.com",
            Category::Innovation,
        ),
        SourceDescriptor::new(
            "hackernews",
            Some("https://news.ycombinator.com/rss"),
            "https://news.ycombinator.com",
            Category::Innovation,
        ),
        SourceDescriptor::new(
            "arxiv",
            Some("https://arxiv.org/rss/cs.AI"),
            "https://arxiv.org",
            Category::Science,
        ),
        SourceDescriptor::new(
            "github-trending",
            None,
            "https://github.com/trending",
            Category::Innovation,
        ),
        SourceDescriptor::new(
            "medium-tech",
            None,
            "https://medium.com/tag/technology",
            Category::Science,
        ),
        SourceDescriptor::new(
            "reddit-engineering",
            None,
            "https://reddit.com/r/engineering",
            Category::Innovation,
        ),
        SourceDescriptor::new(
            "bbc-tech",
            None,
            "https://bbc.com/news/technology",
            Category::Innovation,
        ),
        SourceDescriptor::new(
            "wired-science",
            None,
            "https://wired.com/science",
            Category::Science,
        ),
    ]
}

/// Load a source table from an explicit TOML path.
pub fn load_sources_from(path: &Path) -> Result<Vec<SourceDescriptor>> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("reading sources from {}", path.display()))?;
    parse_sources(&content)
}

/// Resolve the source table:
/// 1) $SCRAPER_SOURCES_PATH
/// 2) config/sources.toml
/// 3) built-in registry
pub fn load_sources_default() -> Result<Vec<SourceDescriptor>> {
    if let Ok(p) = std::env::var(ENV_PATH) {
        let pb = PathBuf::from(p);
        if pb.exists() {
            return load_sources_from(&pb);
        }
        return Err(anyhow!("SCRAPER_SOURCES_PATH points to non-existent path"));
    }
    let toml_p = PathBuf::from("config/sources.toml");
    if toml_p.exists() {
        return load_sources_from(&toml_p);
    }
    Ok(builtin_sources())
}

fn parse_sources(s: &str) -> Result<Vec<SourceDescriptor>> {
    #[derive(serde::Deserialize)]
    struct SourcesFile {
        sources: Vec<SourceDescriptor>,
    }
    let v: SourcesFile = toml::from_str(s).context("parsing sources toml")?;
    let sources = v.sources;
    if sources.is_empty() {
        return Err(anyhow!("sources table is empty"));
    }
    Ok(sources)
}
