//! Whole-run orchestration: load targets, scrape them, write the artifact.

use crate::browser::SessionFactory;
use crate::config::ScrapeConfig;
use crate::console::Console;
use crate::error::ScrapeResult;
use crate::page::{PageScraper, PageSelectors};
use crate::pool::{self, RunReport};
use crate::progress::ProgressSender;
use crate::sink;
use std::sync::Arc;

/// Run a deep scrape described by `config` against sessions from `factory`.
///
/// Input and sink failures end the run; per-URL failures never do.
pub async fn run_scrape(
    config: &ScrapeConfig,
    factory: Arc<dyn SessionFactory>,
    console: Arc<Console>,
    progress: Option<ProgressSender>,
) -> ScrapeResult<RunReport> {
    console.line(format!("Loading URLs from {}...", config.input.display()));
    let targets = sink::load_targets(&config.input)?;
    console.line(format!(
        "Successfully loaded {} hotel URLs. Starting {} scrape...",
        targets.len(),
        config.mode
    ));

    let scraper = Arc::new(PageScraper::new(
        PageSelectors::default(),
        config.timings,
        Arc::clone(&console),
    ));
    let report = pool::run_all(factory, scraper, targets, config.mode, progress).await;

    console.always("\n--- Full Data Scraping Complete ---");
    console.always(format!(
        "Total time taken: {:.2} seconds.",
        report.elapsed.as_secs_f64()
    ));
    if report.lost > 0 {
        console.always(format!("{} URLs lost to worker failures.", report.lost));
    }
    console.always(format!(
        "Writing {} results to {}...",
        report.results.len(),
        config.output.display()
    ));

    sink::write_results(&report.results, &config.output)?;
    console.always(format!("Data saved successfully to {}", config.output.display()));
    Ok(report)
}
