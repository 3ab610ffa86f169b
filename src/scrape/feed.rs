// src/scrape/feed.rs
use std::time::Duration;

use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use metrics::{counter, histogram};
use quick_xml::de::from_str;
use serde::Deserialize;
use time::format_description::well_known::{Rfc2822, Rfc3339};
use time::{OffsetDateTime, UtcOffset};

use crate::scrape::extract_image_url;
use crate::scrape::types::{CandidateArticle, SourceDescriptor};

#[derive(Debug, Deserialize)]
struct Rss {
    channel: Channel,
}

#[derive(Debug, Deserialize)]
struct Channel {
    #[serde(default, rename = "item")]
    item: Vec<Item>,
}

#[derive(Debug, Deserialize)]
struct Item {
    title: Option<String>,
    link: Option<String>,
    description: Option<String>,
    #[serde(rename = "pubDate")]
    pub_date: Option<String>,
    author: Option<String>,
    // quick-xml's serde deserializer exposes namespaced elements by their
    // local name, so `<dc:creator>` arrives here as `creator`.
    #[serde(rename = "creator")]
    creator: Option<String>,
}

/// Resolve a feed timestamp string. Feeds overwhelmingly ship RFC 2822;
/// a few ship RFC 3339.
pub fn parse_pub_date(ts: &str) -> Option<DateTime<Utc>> {
    OffsetDateTime::parse(ts, &Rfc2822)
        .or_else(|_| OffsetDateTime::parse(ts, &Rfc3339))
        .ok()
        .map(|dt| dt.to_offset(UtcOffset::UTC))
        .and_then(|dt| DateTime::<Utc>::from_timestamp(dt.unix_timestamp(), 0))
}

/// Fetches one feed body. Split from parsing so tests can feed canned XML
/// (or canned failures) through the same pipeline the HTTP path uses.
#[async_trait]
pub trait FeedTransport: Send + Sync {
    async fn fetch(&self, url: &str) -> Result<String>;
}

pub struct HttpTransport {
    client: reqwest::Client,
    timeout: Duration,
}

impl HttpTransport {
    pub fn new(timeout: Duration) -> Self {
        Self {
            client: reqwest::Client::new(),
            timeout,
        }
    }
}

#[async_trait]
impl FeedTransport for HttpTransport {
    async fn fetch(&self, url: &str) -> Result<String> {
        let resp = self
            .client
            .get(url)
            .header(reqwest::header::ACCEPT, "application/rss+xml")
            .timeout(self.timeout)
            .send()
            .await
            .with_context(|| format!("fetching feed {url}"))?;
        let resp = resp
            .error_for_status()
            .with_context(|| format!("feed {url} returned error status"))?;
        resp.text().await.context("reading feed body")
    }
}

/// Parse one feed body into candidates for `source`. Entries missing a title
/// or link are dropped here and never reach ingestion.
pub fn parse_feed(
    xml: &str,
    source: &SourceDescriptor,
    scraped_at: DateTime<Utc>,
) -> Result<Vec<CandidateArticle>> {
    let t0 = std::time::Instant::now();
    let xml_clean = scrub_html_entities_for_xml(xml);
    let rss: Rss =
        from_str(&xml_clean).with_context(|| format!("parsing rss xml for {}", source.id))?;

    let mut out = Vec::with_capacity(rss.channel.item.len());
    for it in rss.channel.item {
        // Feeds routinely double-encode titles ("&amp;amp;"); decode once more
        // past the XML layer.
        let title = html_escape::decode_html_entities(it.title.as_deref().unwrap_or_default())
            .trim()
            .to_string();
        let link = it.link.as_deref().unwrap_or_default().trim().to_string();
        if title.is_empty() || link.is_empty() {
            continue;
        }

        let description = it.description.unwrap_or_default();
        // `dc:creator` wins over plain `author` when both are present.
        let author = [it.creator, it.author]
            .into_iter()
            .flatten()
            .map(|a| a.trim().to_string())
            .find(|a| !a.is_empty());

        out.push(CandidateArticle {
            title,
            link,
            image_url: extract_image_url(&description),
            description,
            published_at: it.pub_date.filter(|d| !d.trim().is_empty()),
            author,
            source_id: source.id.clone(),
            site_url: source.site_url.clone(),
            category: source.category,
            scraped_at,
            rights: source.rights(),
        });
    }

    let ms = t0.elapsed().as_secs_f64() * 1_000.0;
    histogram!("scrape_parse_ms").record(ms);
    counter!("scrape_candidates_total").increment(out.len() as u64);
    Ok(out)
}

fn scrub_html_entities_for_xml(s: &str) -> String {
    s.replace("&nbsp;", " ")
        .replace("&ndash;", "-")
        .replace("&mdash;", "-")
        .replace("&ldquo;", "\"")
        .replace("&rdquo;", "\"")
        .replace("&lsquo;", "'")
        .replace("&rsquo;", "'")
}
