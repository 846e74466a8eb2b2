//! `turist-scrape scrape`: the deep scrape over real Chromium.

use crate::audit::RunLog;
use crate::browser::chromium::ChromiumFactory;
use crate::config::ScrapeConfig;
use crate::console::Console;
use crate::pipeline;
use crate::progress;
use anyhow::{Context, Result};
use std::sync::Arc;

pub async fn run(config: ScrapeConfig, console: Arc<Console>) -> Result<()> {
    let factory = ChromiumFactory::locate(config.chromium.as_ref())
        .context("cannot start browser sessions; run `turist-scrape doctor`")?;
    tracing::info!(chromium = %factory.executable().display(), "using Chromium");

    let (tx, log_task) = match &config.run_log {
        Some(path) => {
            let log = RunLog::open(path)?;
            let (tx, rx) = progress::channel();
            (Some(tx), Some(tokio::spawn(log.follow(rx))))
        }
        None => (None, None),
    };

    let result = pipeline::run_scrape(&config, Arc::new(factory), console, tx).await;

    // The sender is dropped with the pool, which lets the log drain and stop.
    if let Some(task) = log_task {
        if let Err(e) = task.await {
            tracing::warn!("run log task failed: {e}");
        }
    }

    result?;
    Ok(())
}
