//! Run configuration: defaults as constants, overridable from the CLI.

use std::path::PathBuf;
use std::time::Duration;

use crate::pool::Mode;

/// Seed artifact written by the listing crawl and read by the deep scrape.
pub const INPUT_FILE: &str = "hotels_for_deep_scrape.json";

/// Deep-scrape output artifact.
pub const OUTPUT_FILE: &str = "hotel_full_details.json";

/// Concurrent browser sessions in pooled mode.
pub const MAX_WORKERS: usize = 4;

/// Fixed wait after navigation before any field is read.
pub const SETTLE_WAIT: Duration = Duration::from_secs(1);

/// Bounded wait for the property name to appear.
pub const NAME_WAIT: Duration = Duration::from_secs(1);

/// Wait after clicking the description toggle.
pub const DESCRIPTION_SETTLE: Duration = Duration::from_millis(500);

/// Wait for the phone reveal control to become clickable.
pub const PHONE_BUTTON_WAIT: Duration = Duration::from_secs(1);

/// Wait for the masked phone number to be swapped for the real one.
pub const PHONE_REVEAL_WAIT: Duration = Duration::from_secs(2);

/// Poll interval for every bounded wait.
pub const POLL_INTERVAL: Duration = Duration::from_millis(250);

/// Upper bound on a single navigation.
pub const NAVIGATION_TIMEOUT: Duration = Duration::from_secs(30);

/// Client identity presented by every browser session.
pub const USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) \
                              AppleWebKit/537.36 (KHTML, like Gecko) \
                              Chrome/120.0.0.0 Safari/537.36";

/// Browser window size (width, height).
pub const WINDOW_SIZE: (u32, u32) = (1920, 1080);

/// Listing index crawled by `seed`.
pub const LISTING_URL: &str =
    "https://www.turistinfo.ro/brasov/cazare-hoteluri-vile-pensiuni-brasov.html";

/// Site root used to absolutize listing links.
pub const BASE_URL: &str = "https://www.turistinfo.ro";

/// Env var overriding the Chromium binary location.
pub const CHROMIUM_PATH_ENV: &str = "TURIST_CHROMIUM_PATH";

/// Every wait used while scraping one page.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Timings {
    pub settle: Duration,
    pub name_wait: Duration,
    pub description_settle: Duration,
    pub phone_button_wait: Duration,
    pub phone_reveal_wait: Duration,
    pub poll_interval: Duration,
    pub navigation_timeout: Duration,
}

impl Default for Timings {
    fn default() -> Self {
        Self {
            settle: SETTLE_WAIT,
            name_wait: NAME_WAIT,
            description_settle: DESCRIPTION_SETTLE,
            phone_button_wait: PHONE_BUTTON_WAIT,
            phone_reveal_wait: PHONE_REVEAL_WAIT,
            poll_interval: POLL_INTERVAL,
            navigation_timeout: NAVIGATION_TIMEOUT,
        }
    }
}

impl Timings {
    /// No settle delays and short polls. Used against in-memory pages.
    pub fn immediate() -> Self {
        Self {
            settle: Duration::ZERO,
            name_wait: Duration::from_millis(50),
            description_settle: Duration::ZERO,
            phone_button_wait: Duration::from_millis(50),
            phone_reveal_wait: Duration::from_millis(100),
            poll_interval: Duration::from_millis(5),
            navigation_timeout: Duration::from_secs(5),
        }
    }
}

/// Everything a `scrape` run needs.
#[derive(Debug, Clone)]
pub struct ScrapeConfig {
    pub input: PathBuf,
    pub output: PathBuf,
    pub mode: Mode,
    pub timings: Timings,
    /// JSONL run log; disabled when `None`.
    pub run_log: Option<PathBuf>,
    /// Explicit Chromium binary; otherwise resolved by lookup.
    pub chromium: Option<PathBuf>,
}

impl Default for ScrapeConfig {
    fn default() -> Self {
        Self {
            input: PathBuf::from(INPUT_FILE),
            output: PathBuf::from(OUTPUT_FILE),
            mode: Mode::Pooled {
                concurrency: MAX_WORKERS,
            },
            timings: Timings::default(),
            run_log: None,
            chromium: None,
        }
    }
}

/// Resolve the Chromium binary: explicit path, then env var.
///
/// Returns `None` when neither is set or the path does not exist; the
/// caller falls back to [`crate::browser::chromium::find_chromium`].
pub fn resolve_chromium_override(explicit: Option<&PathBuf>) -> Option<PathBuf> {
    if let Some(path) = explicit {
        if path.exists() {
            return Some(path.clone());
        }
    }

    std::env::var(CHROMIUM_PATH_ENV)
        .ok()
        .map(PathBuf::from)
        .filter(|p| p.exists())
}
