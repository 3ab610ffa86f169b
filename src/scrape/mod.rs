// src/scrape/mod.rs
pub mod config;
pub mod events;
pub mod feed;
pub mod scheduler;
pub mod sources;
pub mod state;
pub mod types;

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use anyhow::Result;
use chrono::Utc;
use futures::future::join_all;
use metrics::{counter, describe_counter, describe_gauge, describe_histogram, gauge};
use once_cell::sync::OnceCell;
use tracing::{debug, info, warn};

use crate::backend::BackendApi;
use crate::scrape::feed::FeedTransport;
use crate::scrape::types::{
    CandidateArticle, CycleOutcome, IngestOutcome, ScrapeCycle, SourceDescriptor, SourceStats,
};

/// One-time metrics registration (so series show up on /metrics).
fn ensure_metrics_described() {
    static ONCE: OnceCell<()> = OnceCell::new();
    ONCE.get_or_init(|| {
        describe_counter!(
            "scrape_candidates_total",
            "Candidates extracted from feeds."
        );
        describe_counter!("scrape_accepted_total", "Candidates accepted by the backend.");
        describe_counter!(
            "scrape_duplicates_total",
            "Candidates skipped as backend duplicates."
        );
        describe_counter!(
            "scrape_rejected_total",
            "Candidates the aggregate endpoint rejected."
        );
        describe_counter!(
            "scrape_source_errors_total",
            "Feed fetch/parse errors, one per failed source scrape."
        );
        describe_histogram!("scrape_parse_ms", "Feed parse time in milliseconds.");
        describe_gauge!("scrape_last_cycle_ts", "Unix ts when the last cycle finished.");
    });
}

/// Char-boundary-safe length cap.
pub fn truncate_chars(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        s.to_string()
    } else {
        s.chars().take(max).collect()
    }
}

/// First `<img src=...>` URL embedded in a description's markup, if any.
pub fn extract_image_url(description: &str) -> Option<String> {
    static RE_IMG: OnceCell<regex::Regex> = OnceCell::new();
    let re = RE_IMG
        .get_or_init(|| regex::Regex::new(r#"(?i)<img[^>]+src="?([^"\s>]+)"?"#).unwrap());
    re.captures(description).map(|c| c[1].to_string())
}

/// Fans feed fetches out across every registered source, then walks the
/// surviving candidates through dedup + submit one at a time.
pub struct Scraper {
    sources: Vec<SourceDescriptor>,
    transport: Arc<dyn FeedTransport>,
    backend: Arc<dyn BackendApi>,
    stats: Mutex<HashMap<String, SourceStats>>,
    fail_open_duplicate_check: bool,
}

impl Scraper {
    pub fn new(
        sources: Vec<SourceDescriptor>,
        transport: Arc<dyn FeedTransport>,
        backend: Arc<dyn BackendApi>,
        fail_open_duplicate_check: bool,
    ) -> Self {
        let stats = sources
            .iter()
            .map(|s| (s.id.clone(), SourceStats::default()))
            .collect();
        Self {
            sources,
            transport,
            backend,
            stats: Mutex::new(stats),
            fail_open_duplicate_check,
        }
    }

    /// Snapshot of the per-source counters.
    pub fn source_stats(&self) -> HashMap<String, SourceStats> {
        self.stats.lock().expect("stats mutex poisoned").clone()
    }

    /// Fetch and parse one source. Failures are absorbed here: they cost the
    /// source one error count and yield an empty list, never an `Err`.
    async fn scrape_source(&self, source: &SourceDescriptor) -> Vec<CandidateArticle> {
        let Some(feed_url) = source.feed_url.as_deref() else {
            return Vec::new();
        };

        let scraped_at = Utc::now();
        let parsed = match self.transport.fetch(feed_url).await {
            Ok(body) => feed::parse_feed(&body, source, scraped_at),
            Err(e) => Err(e),
        };

        let mut stats = self.stats.lock().expect("stats mutex poisoned");
        let entry = stats.entry(source.id.clone()).or_default();
        match parsed {
            Ok(articles) => {
                entry.articles_found = articles.len() as u64;
                entry.last_scrape = Some(scraped_at);
                articles
            }
            Err(e) => {
                warn!(error = ?e, source = %source.id, "feed scrape failed");
                counter!("scrape_source_errors_total").increment(1);
                entry.errors += 1;
                Vec::new()
            }
        }
    }

    /// Dedup + submit one candidate. Backend trouble never escapes; it shows
    /// up as `Duplicate` or `Rejected` depending on where it struck.
    pub async fn ingest_one(&self, article: &CandidateArticle) -> IngestOutcome {
        let duplicate = match self
            .backend
            .check_duplicate(&article.title, &article.source_id, Some(&article.link))
            .await
        {
            Ok(d) => d,
            Err(e) => {
                warn!(error = ?e, title = %article.title, "duplicate check failed");
                // Fail-open keeps ingesting through backend outages; the
                // aggregate endpoint is the second line of dedup defense.
                !self.fail_open_duplicate_check
            }
        };
        if duplicate {
            counter!("scrape_duplicates_total").increment(1);
            return IngestOutcome::Duplicate;
        }

        match self.backend.submit_article(&article.normalize()).await {
            Ok(resp) => {
                counter!("scrape_accepted_total").increment(1);
                IngestOutcome::Accepted { id: resp.id }
            }
            Err(e) => {
                warn!(error = ?e, title = %article.title, "aggregate submit failed");
                counter!("scrape_rejected_total").increment(1);
                IngestOutcome::Rejected {
                    detail: e.to_string(),
                }
            }
        }
    }

    /// One full pass: concurrent fan-out over sources, then strictly
    /// sequential ingestion as a throttle on backend writes. A source going
    /// dark never aborts the cycle.
    pub async fn run_cycle(&self) -> CycleOutcome {
        ensure_metrics_described();

        let per_source = join_all(self.sources.iter().map(|s| self.scrape_source(s))).await;

        let mut outcome = CycleOutcome::default();
        for candidates in per_source {
            for candidate in candidates {
                match self.ingest_one(&candidate).await {
                    IngestOutcome::Accepted { .. } => {
                        debug!(title = %truncate_chars(&candidate.title, 50), "article accepted");
                        outcome.accepted.push(candidate);
                    }
                    IngestOutcome::Duplicate => outcome.duplicates += 1,
                    IngestOutcome::Rejected { detail } => {
                        debug!(%detail, "article rejected");
                        outcome.rejected += 1;
                    }
                }
            }
        }

        gauge!("scrape_last_cycle_ts").set(Utc::now().timestamp().max(0) as f64);
        info!(
            accepted = outcome.accepted.len(),
            duplicates = outcome.duplicates,
            rejected = outcome.rejected,
            "scrape cycle finished"
        );
        for (id, st) in self.source_stats() {
            debug!(source = %id, found = st.articles_found, errors = st.errors, "source stats");
        }
        outcome
    }
}

#[async_trait::async_trait]
impl ScrapeCycle for Scraper {
    async fn run_cycle(&self) -> Result<CycleOutcome> {
        Ok(Scraper::run_cycle(self).await)
    }
}
