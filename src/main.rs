//! Readmark command line
//!
//! Opens an article from the remote store, prints its header and optionally
//! reports a page change: `readmark <username> <slug> [page total]`.

use std::sync::Arc;

use anyhow::{bail, Context};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use readmark::{CachedRemote, GraphqlRemote, ReaderConfig, ReadingSession};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| "readmark=debug".into()))
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Load configuration
    dotenvy::dotenv().ok();

    let args: Vec<String> = std::env::args().skip(1).collect();
    let (username, slug) = match args.as_slice() {
        [username, slug, ..] => (username.as_str(), slug.as_str()),
        _ => bail!("usage: readmark <username> <slug> [page total]"),
    };
    let page_change = match args.get(2..4) {
        Some([page, total]) => Some((
            page.parse::<usize>().context("page must be a number")?,
            total.parse::<usize>().context("total must be a number")?,
        )),
        _ => None,
    };

    let config = ReaderConfig::from_env().context("Failed to load configuration")?;

    tracing::info!("Starting readmark v{}", env!("CARGO_PKG_VERSION"));
    tracing::info!("Remote endpoint: {}", config.remote.endpoint);

    let remote = CachedRemote::new(
        GraphqlRemote::new(&config.remote)?,
        config.remote.cache_capacity,
    );
    let mut session = ReadingSession::open(Arc::new(remote), &config, username, slug).await?;

    println!("{}", session.article().title);
    println!("{}", session.byline());
    println!("{} blocks", session.document().blocks().len());

    if let Some((page, total)) = page_change {
        match session.navigate(page, total).await? {
            Some(progress) => println!(
                "Progress saved: {:.0}% (block {})",
                progress.percent * 100.0,
                progress.anchor_index
            ),
            None => println!("Progress not saved"),
        }
    }

    Ok(())
}
