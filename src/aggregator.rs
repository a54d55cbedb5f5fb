use crate::assembler::assemble_articles;
use crate::fetcher::FeedSource;
use crate::reconciler::reconcile;
use crate::store::StateStore;
use crate::types::{Article, RefreshConfig, Result};
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::info;

/// Orchestrates refresh, reconciliation and the user actions.
///
/// The last fetched batch is an immutable snapshot behind an `Arc`; a refresh
/// builds the new batch fully and then swaps the `Arc`, so readers never see
/// a partially constructed batch and a failed refresh leaves the previous one
/// in place.
pub struct LinkAggregator {
    source: Arc<dyn FeedSource>,
    store: Arc<dyn StateStore>,
    config: RefreshConfig,
    last_fetch: RwLock<Arc<Vec<Article>>>,
}

impl LinkAggregator {
    pub fn new(
        source: Arc<dyn FeedSource>,
        store: Arc<dyn StateStore>,
        config: RefreshConfig,
    ) -> Self {
        Self {
            source,
            store,
            config,
            last_fetch: RwLock::new(Arc::new(Vec::new())),
        }
    }

    /// Fetches and assembles a new batch, replacing the published snapshot.
    /// Any failure propagates without touching the previous snapshot.
    pub async fn refresh(&self) -> Result<usize> {
        let feed = self.source.fetch(&self.config.feed_url).await?;
        let articles = assemble_articles(&feed, &self.config.title_filter)?;
        info!(
            "parsed {} articles from {}",
            articles.len(),
            self.config.feed_url
        );

        let batch = Arc::new(articles);
        let count = batch.len();
        *self.last_fetch.write().await = batch;
        Ok(count)
    }

    /// Reconciles the current snapshot against the state store.
    pub async fn articles(&self) -> Result<Vec<Article>> {
        let batch = self.last_fetch.read().await.clone();
        reconcile(&batch, self.store.as_ref()).await
    }

    pub async fn dismiss(&self, url: &str) -> Result<()> {
        self.store.mark_article_dismissed(url).await
    }

    pub async fn queue(&self, url: &str) -> Result<()> {
        self.store.mark_link_queued(url).await
    }
}
