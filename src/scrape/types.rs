// src/scrape/types.rs
use anyhow::Result;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::scrape::feed::parse_pub_date;
use crate::scrape::truncate_chars;

/// Article category understood by the backend schema.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Category {
    Innovation,
    Science,
    Culture,
    Health,
    Transportation,
    Military,
    Energy,
    Other,
}

impl Default for Category {
    fn default() -> Self {
        Category::Other
    }
}

/// A registered feed origin. `feed_url: None` means the source is listed but
/// never fetched during a cycle.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SourceDescriptor {
    pub id: String,
    #[serde(default)]
    pub feed_url: Option<String>,
    pub site_url: String,
    #[serde(default)]
    pub category: Category,
}

impl SourceDescriptor {
    pub fn new(id: &str, feed_url: Option<&str>, site_url: &str, category: Category) -> Self {
        Self {
            id: id.to_string(),
            feed_url: feed_url.map(str::to_string),
            site_url: site_url.to_string(),
            category,
        }
    }

    /// Attribution notice shipped with every article taken from this source.
    pub fn rights(&self) -> String {
        format!("Content from {}. See original at {}", self.id, self.site_url)
    }
}

/// An article extracted from a feed, not yet accepted by the backend.
/// Title and link are guaranteed non-empty by the parser.
#[derive(Debug, Clone, PartialEq)]
pub struct CandidateArticle {
    pub title: String,
    pub link: String,
    pub description: String,
    pub published_at: Option<String>,
    pub author: Option<String>,
    pub source_id: String,
    pub site_url: String,
    pub category: Category,
    pub image_url: Option<String>,
    pub scraped_at: DateTime<Utc>,
    pub rights: String,
}

impl CandidateArticle {
    /// Build the submission payload: caps field lengths, marks the article as
    /// aggregated, and resolves the raw pubDate string into a timestamp.
    /// An unparsable pubDate serializes as `createdAt: null` rather than
    /// dropping the candidate.
    pub fn normalize(&self) -> NormalizedArticle {
        NormalizedArticle {
            title: truncate_chars(&self.title, 500),
            description: truncate_chars(&self.description, 2000),
            content: truncate_chars(&self.description, 2000),
            source: self.source_id.clone(),
            source_url: self.site_url.clone(),
            category: self.category,
            author: self.author.clone(),
            image_url: self.image_url.clone(),
            original_link: self.link.clone(),
            rights: self.rights.clone(),
            is_aggregated: true,
            needs_attribution_display: true,
            created_at: self.published_at.as_deref().and_then(parse_pub_date),
            scraped_at: self.scraped_at,
        }
    }
}

/// Wire payload for `POST /api/articles/aggregate`.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NormalizedArticle {
    pub title: String,
    pub description: String,
    pub content: String,
    pub source: String,
    pub source_url: String,
    pub category: Category,
    pub author: Option<String>,
    pub image_url: Option<String>,
    pub original_link: String,
    pub rights: String,
    pub is_aggregated: bool,
    pub needs_attribution_display: bool,
    pub created_at: Option<DateTime<Utc>>,
    pub scraped_at: DateTime<Utc>,
}

/// Per-source counters, reset at process start.
#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SourceStats {
    pub last_scrape: Option<DateTime<Utc>>,
    pub articles_found: u64,
    pub errors: u64,
}

/// What a single pass over all sources produced.
#[derive(Debug, Clone, Default)]
pub struct CycleOutcome {
    pub accepted: Vec<CandidateArticle>,
    pub duplicates: usize,
    pub rejected: usize,
}

/// Result of pushing one candidate through dedup + aggregate submit.
#[derive(Debug, Clone, PartialEq)]
pub enum IngestOutcome {
    Accepted { id: Option<String> },
    Duplicate,
    Rejected { detail: String },
}

/// One full scrape pass. The scheduler only drives this trait, so tests can
/// stand in a failing runner to exercise the retry machine.
#[async_trait::async_trait]
pub trait ScrapeCycle: Send + Sync {
    async fn run_cycle(&self) -> Result<CycleOutcome>;
}
