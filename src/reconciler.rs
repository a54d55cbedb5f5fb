use crate::store::StateStore;
use crate::types::{AggregatorError, Article, Result};
use tracing::debug;

/// Merges a freshly assembled batch against persisted dismissal and queue
/// records.
///
/// Dismissed articles are excluded; retained articles have their links
/// annotated with queue state; the result is sorted ascending by date (the
/// sort is stable, so equal dates keep input order). The input batch is never
/// mutated: published batches are immutable snapshots.
pub async fn reconcile(batch: &[Article], store: &dyn StateStore) -> Result<Vec<Article>> {
    let mut retained = Vec::new();

    for article in batch {
        let state = store
            .find_article_state(&article.url)
            .await
            .map_err(|e| AggregatorError::StateLookup {
                url: article.url.clone(),
                source: Box::new(e),
            })?;

        if let Some(state) = &state {
            if state.dismissed_at.is_some() {
                debug!("{} is dismissed", article.title);
                continue;
            }
        }

        let mut article = article.clone();
        for link in &mut article.links {
            let link_state = store
                .find_link_state(&link.url)
                .await
                .map_err(|e| AggregatorError::StateLookup {
                    url: article.url.clone(),
                    source: Box::new(e),
                })?;

            if let Some(link_state) = link_state {
                link.queued = true;
                link.queued_at = Some(link_state.queued_at);
            }
        }
        retained.push(article);
    }

    retained.sort_by_key(|article| article.date);
    Ok(retained)
}
