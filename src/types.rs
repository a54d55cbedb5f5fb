use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// An outbound hyperlink discovered inside an article's HTML body.
///
/// `queued`/`queued_at` are only ever set during reconciliation against the
/// state store; a freshly extracted link always has `queued == false`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Link {
    pub id: Uuid,
    pub url: String,
    /// Host component parsed from `url`. Empty when the URL has no host.
    pub domain: String,
    /// Flattened text content of the anchor, used for display.
    pub context: String,
    pub queued: bool,
    pub queued_at: Option<DateTime<Utc>>,
}

/// A feed item that passed the title filter and contained at least one
/// extractable link. Rebuilt on every refresh cycle.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Article {
    pub id: Uuid,
    pub title: String,
    pub url: String,
    /// Outbound links in first-occurrence document order, self-links removed.
    pub links: Vec<Link>,
    pub feed: String,
    pub date: DateTime<Utc>,
}

/// Persisted dismissal record, keyed by article URL. Append-only: a dismissal
/// is an insert, never an update.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ArticleState {
    pub id: i64,
    pub url: String,
    pub dismissed_at: Option<DateTime<Utc>>,
}

/// Persisted queue record, keyed by link URL. Append-only.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LinkState {
    pub id: i64,
    pub url: String,
    pub article_url: Option<String>,
    pub queued_at: DateTime<Utc>,
}

/// A single item from a fetched feed, before assembly.
#[derive(Debug, Clone)]
pub struct FeedItem {
    pub title: String,
    pub link: String,
    /// Raw HTML body the link extraction runs over.
    pub content: String,
    pub date: Option<DateTime<Utc>>,
}

/// A fully fetched and parsed feed.
#[derive(Debug, Clone)]
pub struct FetchedFeed {
    pub title: String,
    /// The feed's own site URL; its host drives self-link filtering.
    pub link: String,
    pub items: Vec<FeedItem>,
}

#[derive(Debug, Clone)]
pub struct FetchConfig {
    pub user_agent: String,
    pub timeout_seconds: u64,
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            user_agent: "link-aggregator/0.1".to_string(),
            timeout_seconds: 30,
        }
    }
}

#[derive(Debug, Clone)]
pub struct RefreshConfig {
    pub feed_url: String,
    /// Case-insensitive substring an item title must contain to be considered.
    pub title_filter: String,
}

impl Default for RefreshConfig {
    fn default() -> Self {
        Self {
            feed_url: "http://feeds.feedburner.com/marginalrevolution?fmt=xml".to_string(),
            title_filter: "link".to_string(),
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum AggregatorError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("feed parse error: {0}")]
    Feed(String),

    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    #[error("error while looking up state for {url}: {source}")]
    StateLookup {
        url: String,
        #[source]
        source: Box<AggregatorError>,
    },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("{0}")]
    General(String),
}

pub type Result<T> = std::result::Result<T, AggregatorError>;
