use anyhow::Context;
use clap::{Parser, Subcommand};
use link_aggregator::{
    FetchConfig, HttpFeedSource, LinkAggregator, RefreshConfig, SqliteStore,
};
use std::sync::Arc;
use tracing::info;

#[derive(Parser)]
#[command(about = "Extracts outbound links from a feed and tracks dismiss/queue state")]
struct Args {
    #[arg(long, default_value = "links.sqlite")]
    db: String,

    #[arg(long, default_value = "http://feeds.feedburner.com/marginalrevolution?fmt=xml")]
    feed: String,

    /// Case-insensitive substring an item title must contain.
    #[arg(long, default_value = "link")]
    title_filter: String,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Refresh the feed and print actionable links.
    List {
        #[arg(long)]
        json: bool,
    },
    /// Dismiss an article so it no longer appears.
    Dismiss { url: String },
    /// Mark a link as queued.
    Queue { url: String },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt::init();

    let args = Args::parse();

    let store = SqliteStore::new(&args.db)
        .await
        .with_context(|| format!("failed to open state store at {}", args.db))?;

    let source = HttpFeedSource::new(&FetchConfig::default())
        .context("failed to build feed source")?;

    let config = RefreshConfig {
        feed_url: args.feed,
        title_filter: args.title_filter,
    };
    let aggregator = LinkAggregator::new(Arc::new(source), Arc::new(store), config);

    match args.command {
        Command::List { json } => {
            let count = aggregator.refresh().await.context("refresh failed")?;
            info!("fetched {} articles", count);

            let articles = aggregator.articles().await.context("reconciliation failed")?;
            if json {
                println!("{}", serde_json::to_string_pretty(&articles)?);
            } else {
                for article in &articles {
                    println!("{} [{}] {}", article.date.format("%Y-%m-%d"), article.feed, article.title);
                    for link in &article.links {
                        let marker = if link.queued { "queued" } else { "      " };
                        println!("  {} {} ({})", marker, link.url, link.context.trim());
                    }
                }
            }
        }
        Command::Dismiss { url } => {
            aggregator.dismiss(&url).await.context("dismiss failed")?;
            info!("dismissed {}", url);
        }
        Command::Queue { url } => {
            aggregator.queue(&url).await.context("queue failed")?;
            info!("queued {}", url);
        }
    }

    Ok(())
}
