use async_trait::async_trait;
use chrono::{DateTime, TimeZone, Utc};
use link_aggregator::{
    reconcile, AggregatorError, Article, ArticleState, FeedSource, FetchedFeed, FeedItem, Link,
    LinkAggregator, LinkState, RefreshConfig, Result, StateStore,
};
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use uuid::Uuid;

/// In-memory state store that counts lookups.
#[derive(Default)]
struct MemoryStore {
    dismissed: Mutex<HashMap<String, ArticleState>>,
    queued: Mutex<HashMap<String, LinkState>>,
    article_lookups: AtomicUsize,
    link_lookups: AtomicUsize,
    fail_lookups: AtomicBool,
}

impl MemoryStore {
    fn dismiss(&self, url: &str, at: DateTime<Utc>) {
        let mut dismissed = self.dismissed.lock().unwrap();
        let id = dismissed.len() as i64 + 1;
        // append-only: keep the first insert, like the sqlite store's
        // ORDER BY id LIMIT 1 reads
        dismissed.entry(url.to_string()).or_insert(ArticleState {
            id,
            url: url.to_string(),
            dismissed_at: Some(at),
        });
    }

    fn queue(&self, url: &str, at: DateTime<Utc>) {
        let mut queued = self.queued.lock().unwrap();
        let id = queued.len() as i64 + 1;
        queued.entry(url.to_string()).or_insert(LinkState {
            id,
            url: url.to_string(),
            article_url: None,
            queued_at: at,
        });
    }

    fn total_lookups(&self) -> usize {
        self.article_lookups.load(Ordering::SeqCst) + self.link_lookups.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl StateStore for MemoryStore {
    async fn find_article_state(&self, url: &str) -> Result<Option<ArticleState>> {
        self.article_lookups.fetch_add(1, Ordering::SeqCst);
        if self.fail_lookups.load(Ordering::SeqCst) {
            return Err(AggregatorError::General("store offline".to_string()));
        }
        Ok(self.dismissed.lock().unwrap().get(url).cloned())
    }

    async fn mark_article_dismissed(&self, url: &str) -> Result<()> {
        self.dismiss(url, Utc::now());
        Ok(())
    }

    async fn find_link_state(&self, url: &str) -> Result<Option<LinkState>> {
        self.link_lookups.fetch_add(1, Ordering::SeqCst);
        if self.fail_lookups.load(Ordering::SeqCst) {
            return Err(AggregatorError::General("store offline".to_string()));
        }
        Ok(self.queued.lock().unwrap().get(url).cloned())
    }

    async fn mark_link_queued(&self, url: &str) -> Result<()> {
        self.queue(url, Utc::now());
        Ok(())
    }
}

/// Feed source returning a canned feed, optionally failing on demand.
struct MockFeedSource {
    feed: FetchedFeed,
    fail: AtomicBool,
}

impl MockFeedSource {
    fn new(feed: FetchedFeed) -> Self {
        Self {
            feed,
            fail: AtomicBool::new(false),
        }
    }
}

#[async_trait]
impl FeedSource for MockFeedSource {
    async fn fetch(&self, _feed_url: &str) -> Result<FetchedFeed> {
        if self.fail.load(Ordering::SeqCst) {
            return Err(AggregatorError::General("network down".to_string()));
        }
        Ok(self.feed.clone())
    }
}

fn link(url: &str) -> Link {
    Link {
        id: Uuid::new_v4(),
        url: url.to_string(),
        domain: url::Url::parse(url)
            .ok()
            .and_then(|u| u.host_str().map(str::to_string))
            .unwrap_or_default(),
        context: String::new(),
        queued: false,
        queued_at: None,
    }
}

fn article(url: &str, date: DateTime<Utc>, links: Vec<Link>) -> Article {
    Article {
        id: Uuid::new_v4(),
        title: format!("links from {}", url),
        url: url.to_string(),
        links,
        feed: "Example Feed".to_string(),
        date,
    }
}

fn day(d: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2021, 1, d, 12, 0, 0).unwrap()
}

#[tokio::test]
async fn dismissed_articles_never_appear() {
    let _ = tracing_subscriber::fmt().try_init();

    let store = MemoryStore::default();
    store.dismiss("https://example.com/a", day(5));

    let batch = vec![
        article("https://example.com/a", day(1), vec![]),
        article("https://example.com/b", day(2), vec![]),
    ];

    let result = reconcile(&batch, &store).await.unwrap();
    assert_eq!(result.len(), 1);
    assert_eq!(result[0].url, "https://example.com/b");
}

#[tokio::test]
async fn queued_links_are_annotated_from_the_store() {
    let store = MemoryStore::default();
    let queued_at = day(10);
    store.queue("https://other.example/x", queued_at);

    let batch = vec![article(
        "https://example.com/a",
        day(1),
        vec![link("https://other.example/x"), link("https://other.example/y")],
    )];

    let result = reconcile(&batch, &store).await.unwrap();
    let links = &result[0].links;
    assert!(links[0].queued);
    assert_eq!(links[0].queued_at, Some(queued_at));
    assert!(!links[1].queued);
    assert!(links[1].queued_at.is_none());
}

#[tokio::test]
async fn result_is_sorted_ascending_by_date() {
    let store = MemoryStore::default();
    let batch = vec![
        article("https://example.com/c", day(3), vec![]),
        article("https://example.com/a", day(1), vec![]),
        article("https://example.com/b", day(2), vec![]),
    ];

    let result = reconcile(&batch, &store).await.unwrap();
    let dates: Vec<_> = result.iter().map(|a| a.date).collect();
    assert_eq!(dates, vec![day(1), day(2), day(3)]);
}

#[tokio::test]
async fn equal_dates_keep_input_order() {
    let store = MemoryStore::default();
    let batch = vec![
        article("https://example.com/first", day(1), vec![]),
        article("https://example.com/second", day(1), vec![]),
    ];

    let result = reconcile(&batch, &store).await.unwrap();
    assert_eq!(result[0].url, "https://example.com/first");
    assert_eq!(result[1].url, "https://example.com/second");
}

#[tokio::test]
async fn empty_batch_makes_no_store_lookups() {
    let store = MemoryStore::default();
    let result = reconcile(&[], &store).await.unwrap();
    assert!(result.is_empty());
    assert_eq!(store.total_lookups(), 0);
}

#[tokio::test]
async fn lookup_failure_aborts_and_names_the_url() {
    let store = MemoryStore::default();
    store.fail_lookups.store(true, Ordering::SeqCst);

    let batch = vec![article("https://example.com/a", day(1), vec![])];
    let err = reconcile(&batch, &store).await.unwrap_err();
    match err {
        AggregatorError::StateLookup { url, .. } => {
            assert_eq!(url, "https://example.com/a");
        }
        other => panic!("expected StateLookup error, got {}", other),
    }
}

#[tokio::test]
async fn reconcile_does_not_mutate_the_published_batch() {
    let store = MemoryStore::default();
    store.queue("https://other.example/x", day(10));

    let batch = vec![article(
        "https://example.com/a",
        day(1),
        vec![link("https://other.example/x")],
    )];

    let result = reconcile(&batch, &store).await.unwrap();
    assert!(result[0].links[0].queued);
    assert!(!batch[0].links[0].queued, "snapshot must stay untouched");
}

fn sample_feed() -> FetchedFeed {
    FetchedFeed {
        title: "Example Feed".to_string(),
        link: "https://example.com".to_string(),
        items: vec![FeedItem {
            title: "Friday assorted links".to_string(),
            link: "https://example.com/friday".to_string(),
            content: r#"<a href="https://example.com/self">self</a>
                        <a href="https://other.example/story">a story</a>"#
                .to_string(),
            date: Some(day(8)),
        }],
    }
}

#[tokio::test]
async fn refresh_then_articles_runs_the_whole_pipeline() {
    let _ = tracing_subscriber::fmt().try_init();

    let source = Arc::new(MockFeedSource::new(sample_feed()));
    let store = Arc::new(MemoryStore::default());
    let aggregator = LinkAggregator::new(source, store.clone(), RefreshConfig::default());

    let count = aggregator.refresh().await.unwrap();
    assert_eq!(count, 1);

    let articles = aggregator.articles().await.unwrap();
    assert_eq!(articles.len(), 1);
    assert_eq!(articles[0].links.len(), 1, "self-link must be filtered");
    assert_eq!(articles[0].links[0].url, "https://other.example/story");
}

#[tokio::test]
async fn failed_refresh_keeps_the_previous_batch() {
    let source = Arc::new(MockFeedSource::new(sample_feed()));
    let store = Arc::new(MemoryStore::default());
    let aggregator = LinkAggregator::new(source.clone(), store, RefreshConfig::default());

    aggregator.refresh().await.unwrap();

    source.fail.store(true, Ordering::SeqCst);
    assert!(aggregator.refresh().await.is_err());

    let articles = aggregator.articles().await.unwrap();
    assert_eq!(articles.len(), 1, "old batch must remain visible");
}

#[tokio::test]
async fn dismiss_action_takes_effect_on_next_read() {
    let source = Arc::new(MockFeedSource::new(sample_feed()));
    let store = Arc::new(MemoryStore::default());
    let aggregator = LinkAggregator::new(source, store, RefreshConfig::default());

    aggregator.refresh().await.unwrap();
    aggregator.dismiss("https://example.com/friday").await.unwrap();

    let articles = aggregator.articles().await.unwrap();
    assert!(articles.is_empty());
}
