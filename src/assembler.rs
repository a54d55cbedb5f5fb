use crate::extract::find_links;
use crate::types::{Article, FetchedFeed, Result};
use chrono::DateTime;
use tracing::{debug, warn};
use url::Url;
use uuid::Uuid;

/// Builds ordered articles from a fetched feed.
///
/// An item is considered only when its title contains `title_filter`
/// (case-insensitive). Links whose host matches the feed's own host are
/// dropped as self-links, but an item with at least one extracted link is
/// emitted even when filtering empties its link list.
pub fn assemble_articles(feed: &FetchedFeed, title_filter: &str) -> Result<Vec<Article>> {
    let feed_url = Url::parse(&feed.link)?;
    let feed_host = feed_url.host_str().unwrap_or("");
    let filter = title_filter.to_lowercase();

    let mut articles = Vec::new();
    for item in &feed.items {
        if !item.title.to_lowercase().contains(&filter) {
            continue;
        }

        let links = match find_links(&item.content) {
            Ok(links) => links,
            Err(e) => {
                warn!("{}: {}", item.title, e);
                Vec::new()
            }
        };

        let mut filtered = Vec::new();
        for link in &links {
            if link.domain == feed_host {
                debug!("ignoring self-link {}", link.url);
                continue;
            }
            filtered.push(link.clone());
        }

        if !links.is_empty() {
            articles.push(Article {
                id: Uuid::new_v4(),
                title: item.title.clone(),
                url: item.link.clone(),
                links: filtered,
                feed: feed.title.clone(),
                date: item.date.unwrap_or(DateTime::UNIX_EPOCH),
            });
        }
    }

    Ok(articles)
}
