// tests/scrape_dedup.rs
//
// Deduplication semantics: the backend is the source of truth, repeated
// submissions of the same {title, source} pair are accepted at most once,
// and the failure bias of the duplicate check is configurable.

use std::collections::HashSet;
use std::sync::{Arc, Mutex};

use anyhow::{anyhow, Result};
use async_trait::async_trait;

use news_harvester::backend::{AggregateResponse, BackendApi};
use news_harvester::scrape::feed::FeedTransport;
use news_harvester::scrape::types::{Category, NormalizedArticle, SourceDescriptor};
use news_harvester::Scraper;

const FEED: &str = r#"<?xml version="1.0"?>
<rss version="2.0">
  <channel>
    <item>
      <title>Quantum widget benchmark</title>
      <link>https://nu.example/q</link>
      <description>numbers</description>
    </item>
    <item>
      <title>Compiler release notes</title>
      <link>https://nu.example/c</link>
      <description>changelog</description>
    </item>
  </channel>
</rss>"#;

struct OneFeed;

#[async_trait]
impl FeedTransport for OneFeed {
    async fn fetch(&self, _url: &str) -> Result<String> {
        Ok(FEED.to_string())
    }
}

/// Echoes prior submissions back through the duplicate check, like a backend
/// that actually persists what it accepts.
#[derive(Default)]
struct EchoBackend {
    seen: Mutex<HashSet<(String, String)>>,
}

#[async_trait]
impl BackendApi for EchoBackend {
    async fn check_duplicate(&self, title: &str, source: &str, _: Option<&str>) -> Result<bool> {
        Ok(self
            .seen
            .lock()
            .unwrap()
            .contains(&(title.to_string(), source.to_string())))
    }

    async fn submit_article(&self, article: &NormalizedArticle) -> Result<AggregateResponse> {
        self.seen
            .lock()
            .unwrap()
            .insert((article.title.clone(), article.source.clone()));
        Ok(AggregateResponse::default())
    }

    async fn update_status(&self, _: bool, _: Option<&str>) -> Result<()> {
        Ok(())
    }
}

/// Duplicate check endpoint is down; aggregate still works.
#[derive(Default)]
struct BlindBackend {
    submitted: Mutex<Vec<String>>,
}

#[async_trait]
impl BackendApi for BlindBackend {
    async fn check_duplicate(&self, _: &str, _: &str, _: Option<&str>) -> Result<bool> {
        Err(anyhow!("connection refused"))
    }

    async fn submit_article(&self, article: &NormalizedArticle) -> Result<AggregateResponse> {
        self.submitted.lock().unwrap().push(article.title.clone());
        Ok(AggregateResponse::default())
    }

    async fn update_status(&self, _: bool, _: Option<&str>) -> Result<()> {
        Ok(())
    }
}

fn source() -> Vec<SourceDescriptor> {
    vec![SourceDescriptor::new(
        "nu",
        Some("https://nu.example/rss"),
        "https://nu.example",
        Category::Science,
    )]
}

#[tokio::test]
async fn same_pair_is_accepted_at_most_once() {
    let backend = Arc::new(EchoBackend::default());
    let scraper = Scraper::new(source(), Arc::new(OneFeed), backend, true);

    let first = scraper.run_cycle().await;
    assert_eq!(first.accepted.len(), 2);
    assert_eq!(first.duplicates, 0);

    let second = scraper.run_cycle().await;
    assert_eq!(second.accepted.len(), 0);
    assert_eq!(second.duplicates, 2);
}

#[tokio::test]
async fn check_failure_fails_open_by_default_bias() {
    let backend = Arc::new(BlindBackend::default());
    let scraper = Scraper::new(source(), Arc::new(OneFeed), backend.clone(), true);

    let outcome = scraper.run_cycle().await;
    // Fail-open: the outage does not cost us articles.
    assert_eq!(outcome.accepted.len(), 2);
    assert_eq!(backend.submitted.lock().unwrap().len(), 2);
}

#[tokio::test]
async fn check_failure_can_be_configured_to_skip() {
    let backend = Arc::new(BlindBackend::default());
    let scraper = Scraper::new(source(), Arc::new(OneFeed), backend.clone(), false);

    let outcome = scraper.run_cycle().await;
    assert_eq!(outcome.accepted.len(), 0);
    assert_eq!(outcome.duplicates, 2);
    assert!(backend.submitted.lock().unwrap().is_empty());
}
