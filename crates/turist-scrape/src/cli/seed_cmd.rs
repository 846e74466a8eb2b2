//! `turist-scrape seed`: crawl the listing index into the seed artifact.

use crate::console::Console;
use crate::seed;
use anyhow::Result;
use std::path::Path;

pub async fn run(url: &str, output: &Path, console: &Console) -> Result<()> {
    let listings = seed::run_seed(url, output, console).await?;
    if let Some(first) = listings.first() {
        console.line(format!("First listing: {} -> {}", first.name, first.details_url));
    }
    Ok(())
}
