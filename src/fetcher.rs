use crate::types::{AggregatorError, FeedItem, FetchConfig, FetchedFeed, Result};
use async_trait::async_trait;
use chrono::Utc;
use feed_rs::parser;
use reqwest::Client;
use std::time::Duration;
use tracing::{debug, info};

/// Source of already-parsed feed items.
#[async_trait]
pub trait FeedSource: Send + Sync {
    async fn fetch(&self, feed_url: &str) -> Result<FetchedFeed>;
}

/// Fetches a feed over HTTP and parses it with feed-rs.
pub struct HttpFeedSource {
    client: Client,
}

impl HttpFeedSource {
    pub fn new(config: &FetchConfig) -> Result<Self> {
        let client = Client::builder()
            .user_agent(&config.user_agent)
            .timeout(Duration::from_secs(config.timeout_seconds))
            .gzip(true)
            .deflate(true)
            .brotli(true)
            .build()?;
        Ok(Self { client })
    }
}

#[async_trait]
impl FeedSource for HttpFeedSource {
    async fn fetch(&self, feed_url: &str) -> Result<FetchedFeed> {
        debug!("fetching feed: {}", feed_url);

        let response = self.client.get(feed_url).send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(AggregatorError::General(format!(
                "HTTP {}: {}",
                status,
                status.canonical_reason().unwrap_or("Unknown")
            )));
        }

        let body = response.text().await?;
        let feed = parser::parse(body.as_bytes())
            .map_err(|e| AggregatorError::Feed(format!("failed to parse feed: {}", e)))?;

        let fetched = map_feed(feed);
        info!(
            "fetched feed {:?} with {} items",
            fetched.title,
            fetched.items.len()
        );
        Ok(fetched)
    }
}

/// Maps a parsed feed-rs model onto the assembler's input shape. Entries
/// without any link are dropped; content is preferred over summary for the
/// HTML body.
pub(crate) fn map_feed(feed: feed_rs::model::Feed) -> FetchedFeed {
    let title = feed.title.map(|t| t.content).unwrap_or_default();
    let link = feed
        .links
        .first()
        .map(|l| l.href.clone())
        .unwrap_or_default();

    let mut items = Vec::new();
    for entry in feed.entries {
        let Some(entry_link) = entry.links.first() else {
            debug!("skipping entry without link: {}", entry.id);
            continue;
        };

        let summary = entry.summary.map(|s| s.content);
        let content = entry
            .content
            .and_then(|c| c.body)
            .or(summary)
            .unwrap_or_default();

        items.push(FeedItem {
            title: entry.title.map(|t| t.content).unwrap_or_default(),
            link: entry_link.href.clone(),
            content,
            date: entry
                .published
                .or(entry.updated)
                .map(|dt| dt.with_timezone(&Utc)),
        });
    }

    FetchedFeed { title, link, items }
}
