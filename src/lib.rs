pub mod aggregator;
pub mod assembler;
pub mod extract;
pub mod fetcher;
pub mod reconciler;
pub mod store;
pub mod types;

pub use aggregator::LinkAggregator;
pub use assembler::assemble_articles;
pub use extract::{find_links, flatten, walk, DomVisitor, LinkExtractor};
pub use fetcher::{FeedSource, HttpFeedSource};
pub use reconciler::reconcile;
pub use store::{SqliteStore, StateStore};
pub use types::*;
