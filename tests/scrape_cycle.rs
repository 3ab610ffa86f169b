// tests/scrape_cycle.rs
//
// Orchestrator behavior: concurrent fan-out, per-source error absorption,
// and sequential ingestion of surviving candidates.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use anyhow::{anyhow, Result};
use async_trait::async_trait;

use news_harvester::backend::{AggregateResponse, BackendApi};
use news_harvester::scrape::feed::FeedTransport;
use news_harvester::scrape::types::{Category, NormalizedArticle, SourceDescriptor};
use news_harvester::Scraper;

const FEED_A: &str = r#"<?xml version="1.0"?>
<rss version="2.0">
  <channel>
    <item>
      <title>Alpha ships a compiler</title>
      <link>https://alpha.example/1</link>
      <description>details</description>
      <pubDate>Wed, 01 Jan 2025 08:00:00 GMT</pubDate>
    </item>
    <item>
      <title>Alpha raises a round</title>
      <link>https://alpha.example/2</link>
      <description>more details</description>
    </item>
    <item>
      <title>Linkless entry that must be dropped</title>
      <description>no link</description>
    </item>
  </channel>
</rss>"#;

struct StaticTransport {
    feeds: HashMap<String, std::result::Result<String, String>>,
}

#[async_trait]
impl FeedTransport for StaticTransport {
    async fn fetch(&self, url: &str) -> Result<String> {
        match self.feeds.get(url) {
            Some(Ok(body)) => Ok(body.clone()),
            Some(Err(msg)) => Err(anyhow!("{msg}")),
            None => Err(anyhow!("unexpected fetch of {url}")),
        }
    }
}

/// Accepts everything; remembers what was submitted.
#[derive(Default)]
struct RecordingBackend {
    submitted: Mutex<Vec<NormalizedArticle>>,
}

#[async_trait]
impl BackendApi for RecordingBackend {
    async fn check_duplicate(&self, _: &str, _: &str, _: Option<&str>) -> Result<bool> {
        Ok(false)
    }

    async fn submit_article(&self, article: &NormalizedArticle) -> Result<AggregateResponse> {
        self.submitted.lock().unwrap().push(article.clone());
        Ok(AggregateResponse::default())
    }

    async fn update_status(&self, _: bool, _: Option<&str>) -> Result<()> {
        Ok(())
    }
}

fn sources() -> Vec<SourceDescriptor> {
    vec![
        SourceDescriptor::new(
            "alpha",
            Some("https://alpha.example/rss"),
            "https://alpha.example",
            Category::Innovation,
        ),
        SourceDescriptor::new(
            "broken",
            Some("https://broken.example/rss"),
            "https://broken.example",
            Category::Science,
        ),
        SourceDescriptor::new("dormant", None, "https://dormant.example", Category::Other),
    ]
}

fn scraper(backend: Arc<RecordingBackend>) -> Scraper {
    let mut feeds = HashMap::new();
    feeds.insert("https://alpha.example/rss".to_string(), Ok(FEED_A.to_string()));
    feeds.insert(
        "https://broken.example/rss".to_string(),
        Err("HTTP 500".to_string()),
    );
    Scraper::new(sources(), Arc::new(StaticTransport { feeds }), backend, true)
}

#[tokio::test]
async fn cycle_completes_despite_one_dead_source() {
    let backend = Arc::new(RecordingBackend::default());
    let scraper = scraper(backend.clone());

    let outcome = scraper.run_cycle().await;

    // Two valid candidates from alpha; the linkless entry never surfaces.
    assert_eq!(outcome.accepted.len(), 2);
    assert_eq!(outcome.duplicates, 0);
    assert_eq!(outcome.rejected, 0);
    assert_eq!(backend.submitted.lock().unwrap().len(), 2);

    let stats = scraper.source_stats();
    assert_eq!(stats["alpha"].articles_found, 2);
    assert!(stats["alpha"].last_scrape.is_some());
    assert_eq!(stats["broken"].errors, 1);
    assert!(stats["broken"].last_scrape.is_none());
    // Feedless sources are registered but never fetched.
    assert_eq!(stats["dormant"].errors, 0);
    assert!(stats["dormant"].last_scrape.is_none());
}

#[tokio::test]
async fn repeated_cycles_count_errors_per_attempt() {
    let backend = Arc::new(RecordingBackend::default());
    let scraper = scraper(backend);

    scraper.run_cycle().await;
    scraper.run_cycle().await;

    let stats = scraper.source_stats();
    assert_eq!(stats["broken"].errors, 2);
    // articlesFound is the latest count, not an accumulator.
    assert_eq!(stats["alpha"].articles_found, 2);
}

#[tokio::test]
async fn submitted_payloads_carry_aggregation_markers() {
    let backend = Arc::new(RecordingBackend::default());
    let scraper = scraper(backend.clone());

    scraper.run_cycle().await;

    let submitted = backend.submitted.lock().unwrap();
    let first = &submitted[0];
    assert!(first.is_aggregated);
    assert!(first.needs_attribution_display);
    assert_eq!(first.source, "alpha");
    assert_eq!(first.original_link, "https://alpha.example/1");
    assert!(first.rights.contains("alpha"));
    assert!(first.created_at.is_some());
    // Second item has no pubDate: null sentinel, candidate still submitted.
    assert!(submitted[1].created_at.is_none());
}

#[tokio::test]
async fn one_dead_source_still_counts_as_a_successful_run() {
    use news_harvester::{SchedulerCfg, ScraperScheduler};
    use std::time::Duration;

    let dir = tempfile::tempdir().unwrap();
    let backend = Arc::new(RecordingBackend::default());
    let scraper = Arc::new(scraper(backend.clone()));
    let scheduler = ScraperScheduler::new(
        scraper.clone(),
        backend,
        SchedulerCfg {
            interval: Duration::from_secs(3600),
            max_retries: 3,
            retry_delay: Duration::from_millis(10),
            state_path: dir.path().join("state.json"),
        },
    );

    scheduler.trigger_manual_scrape().await;

    let stats = scheduler.get_stats();
    assert_eq!(stats.successful_runs, 1, "cycle-level success despite one dead source");
    assert_eq!(stats.failed_runs, 0);
    assert_eq!(stats.articles_this_cycle, 2);
    assert_eq!(scraper.source_stats()["broken"].errors, 1);
}

#[tokio::test]
async fn rejected_submissions_do_not_abort_the_cycle() {
    struct RejectingBackend;

    #[async_trait]
    impl BackendApi for RejectingBackend {
        async fn check_duplicate(&self, _: &str, _: &str, _: Option<&str>) -> Result<bool> {
            Ok(false)
        }
        async fn submit_article(&self, _: &NormalizedArticle) -> Result<AggregateResponse> {
            Err(anyhow!("HTTP 503"))
        }
        async fn update_status(&self, _: bool, _: Option<&str>) -> Result<()> {
            Ok(())
        }
    }

    let mut feeds = HashMap::new();
    feeds.insert("https://alpha.example/rss".to_string(), Ok(FEED_A.to_string()));
    feeds.insert(
        "https://broken.example/rss".to_string(),
        Err("HTTP 500".to_string()),
    );
    let scraper = Scraper::new(
        sources(),
        Arc::new(StaticTransport { feeds }),
        Arc::new(RejectingBackend),
        true,
    );

    let outcome = scraper.run_cycle().await;
    assert!(outcome.accepted.is_empty());
    assert_eq!(outcome.rejected, 2);
}
