//! Chromium-backed sessions using chromiumoxide.
//!
//! Each session is its own headless Chromium process with a throwaway
//! profile directory, so concurrent sessions share nothing. Locators are
//! evaluated as page JavaScript.

use super::{Locator, NavigationResult, PageSession, SessionFactory};
use crate::config::{self, USER_AGENT, WINDOW_SIZE};
use anyhow::{bail, Context, Result};
use async_trait::async_trait;
use chromiumoxide::browser::{Browser, BrowserConfig};
use chromiumoxide::handler::viewport::Viewport;
use chromiumoxide::page::Page;
use futures::StreamExt;
use serde::de::DeserializeOwned;
use std::path::PathBuf;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tempfile::TempDir;
use tokio::task::JoinHandle;

/// Find the Chromium binary path.
pub fn find_chromium() -> Option<PathBuf> {
    // 1. TURIST_CHROMIUM_PATH env
    if let Some(path) = config::resolve_chromium_override(None) {
        return Some(path);
    }

    // 2. ~/.turist-scrape/chromium/
    if let Some(home) = dirs::home_dir() {
        let candidates = if cfg!(target_os = "macos") {
            vec![
                home.join(".turist-scrape/chromium/chrome-mac-arm64/Google Chrome for Testing.app/Contents/MacOS/Google Chrome for Testing"),
                home.join(".turist-scrape/chromium/chrome-mac-x64/Google Chrome for Testing.app/Contents/MacOS/Google Chrome for Testing"),
                home.join(".turist-scrape/chromium/chrome"),
            ]
        } else {
            vec![
                home.join(".turist-scrape/chromium/chrome-linux64/chrome"),
                home.join(".turist-scrape/chromium/chrome"),
            ]
        };
        for c in candidates {
            if c.exists() {
                return Some(c);
            }
        }
    }

    // 3. System PATH
    for name in ["google-chrome", "chromium", "chromium-browser"] {
        if let Ok(path) = which::which(name) {
            return Some(path);
        }
    }

    // 4. Common macOS location
    if cfg!(target_os = "macos") {
        let common =
            PathBuf::from("/Applications/Google Chrome.app/Contents/MacOS/Google Chrome");
        if common.exists() {
            return Some(common);
        }
    }

    None
}

/// Launches one headless Chromium process per session.
pub struct ChromiumFactory {
    executable: PathBuf,
    user_agent: String,
    window: (u32, u32),
    active_count: Arc<AtomicUsize>,
}

impl ChromiumFactory {
    pub fn new(executable: PathBuf) -> Self {
        Self {
            executable,
            user_agent: USER_AGENT.to_string(),
            window: WINDOW_SIZE,
            active_count: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// Resolve the binary from an explicit path, the env var, or lookup.
    pub fn locate(explicit: Option<&PathBuf>) -> Result<Self> {
        let path = config::resolve_chromium_override(explicit)
            .or_else(find_chromium)
            .context("Chromium not found. Set TURIST_CHROMIUM_PATH or pass --chromium.")?;
        Ok(Self::new(path))
    }

    pub fn executable(&self) -> &PathBuf {
        &self.executable
    }

    /// Number of sessions currently open.
    pub fn active_sessions(&self) -> usize {
        self.active_count.load(Ordering::Relaxed)
    }
}

#[async_trait]
impl SessionFactory for ChromiumFactory {
    async fn open(&self) -> Result<Box<dyn PageSession>> {
        let profile = tempfile::Builder::new()
            .prefix("turist-scrape-")
            .tempdir()
            .context("failed to create browser profile dir")?;

        let (width, height) = self.window;
        let config = BrowserConfig::builder()
            .chrome_executable(&self.executable)
            .user_data_dir(profile.path())
            .window_size(width, height)
            .viewport(Viewport {
                width,
                height,
                ..Viewport::default()
            })
            .arg("--headless=new")
            .arg("--disable-gpu")
            .arg("--no-sandbox")
            .arg("--disable-dev-shm-usage")
            .arg("--disable-extensions")
            .arg("--disable-blink-features=AutomationControlled")
            .arg(format!("--user-agent={}", self.user_agent))
            .build()
            .map_err(|e| anyhow::anyhow!("failed to build browser config: {e}"))?;

        let (browser, mut handler) = Browser::launch(config)
            .await
            .context("failed to launch Chromium")?;

        let handler = tokio::spawn(async move {
            while let Some(event) = handler.next().await {
                if let Err(e) = event {
                    tracing::debug!("browser handler event error: {e}");
                }
            }
        });

        let page = match browser.new_page("about:blank").await {
            Ok(page) => page,
            Err(e) => {
                let mut browser = browser;
                let _ = browser.close().await;
                let _ = browser.wait().await;
                handler.abort();
                bail!("failed to create new page: {e}");
            }
        };

        Ok(Box::new(ChromiumSession {
            browser,
            page,
            handler,
            _profile: profile,
            _active: ActiveSession::enter(&self.active_count),
        }))
    }
}

/// Counts a session as open until dropped, including drops during unwinding.
struct ActiveSession(Arc<AtomicUsize>);

impl ActiveSession {
    fn enter(count: &Arc<AtomicUsize>) -> Self {
        count.fetch_add(1, Ordering::Relaxed);
        Self(Arc::clone(count))
    }
}

impl Drop for ActiveSession {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::Relaxed);
    }
}

/// One Chromium process showing one page.
pub struct ChromiumSession {
    browser: Browser,
    page: Page,
    handler: JoinHandle<()>,
    _profile: TempDir,
    _active: ActiveSession,
}

impl ChromiumSession {
    async fn eval<T: DeserializeOwned>(&self, script: &str) -> Result<T> {
        let result = self
            .page
            .evaluate(script)
            .await
            .context("JS execution failed")?;

        result
            .into_value()
            .map_err(|e| anyhow::anyhow!("failed to convert JS result: {e:?}"))
    }
}

#[async_trait]
impl PageSession for ChromiumSession {
    async fn navigate(&mut self, url: &str, timeout: Duration) -> Result<NavigationResult> {
        let start = Instant::now();

        let result = tokio::time::timeout(timeout, self.page.goto(url)).await;

        match result {
            Ok(Ok(_)) => {
                let final_url = self
                    .page
                    .url()
                    .await
                    .unwrap_or_default()
                    .unwrap_or_else(|| url.to_string());

                Ok(NavigationResult {
                    final_url,
                    load_time_ms: start.elapsed().as_millis() as u64,
                })
            }
            Ok(Err(e)) => bail!("navigation failed: {e}"),
            Err(_) => bail!("navigation timed out after {}ms", timeout.as_millis()),
        }
    }

    async fn text(&self, locator: &Locator) -> Result<Option<String>> {
        self.eval(&text_script(locator)).await
    }

    async fn attribute_all(&self, locator: &Locator, name: &str) -> Result<Vec<String>> {
        self.eval(&attribute_script(locator, name)).await
    }

    async fn click(&self, locator: &Locator) -> Result<bool> {
        self.eval(&click_script(locator)).await
    }

    async fn current_url(&self) -> Result<String> {
        let url = self
            .page
            .url()
            .await
            .context("failed to get URL")?
            .unwrap_or_default();
        Ok(url)
    }

    async fn close(self: Box<Self>) -> Result<()> {
        let mut this = *self;
        let _ = this.page.close().await;
        let closed = this.browser.close().await;
        let _ = this.browser.wait().await;
        this.handler.abort();
        closed.context("failed to close Chromium")?;
        Ok(())
    }
}

/// Encode a value as a JS string literal.
fn js_str(s: &str) -> String {
    serde_json::to_string(s).unwrap_or_else(|_| "\"\"".to_string())
}

/// JS expression evaluating to the first matching element or `null`.
fn element_expr(locator: &Locator) -> String {
    let sel = js_str(locator.selector());
    match locator {
        Locator::XPath(_) => format!(
            "document.evaluate({sel}, document, null, XPathResult.FIRST_ORDERED_NODE_TYPE, null).singleNodeValue"
        ),
        Locator::ClassName(_) => format!("(document.getElementsByClassName({sel})[0] || null)"),
        Locator::Id(_) => format!("document.getElementById({sel})"),
        Locator::Css(_) => format!("document.querySelector({sel})"),
    }
}

/// JS expression evaluating to an array of all matching elements.
fn elements_expr(locator: &Locator) -> String {
    let sel = js_str(locator.selector());
    match locator {
        Locator::XPath(_) => format!(
            "(() => {{ const r = document.evaluate({sel}, document, null, XPathResult.ORDERED_NODE_SNAPSHOT_TYPE, null); \
             const out = []; for (let i = 0; i < r.snapshotLength; i++) out.push(r.snapshotItem(i)); return out; }})()"
        ),
        Locator::ClassName(_) => format!("Array.from(document.getElementsByClassName({sel}))"),
        Locator::Id(_) => format!("[document.getElementById({sel})].filter(Boolean)"),
        Locator::Css(_) => format!("Array.from(document.querySelectorAll({sel}))"),
    }
}

fn text_script(locator: &Locator) -> String {
    format!(
        "(() => {{ const el = {}; return el ? el.innerText : null; }})()",
        element_expr(locator)
    )
}

fn attribute_script(locator: &Locator, name: &str) -> String {
    format!(
        "(() => {}.map(el => el.getAttribute({}) || ''))()",
        elements_expr(locator),
        js_str(name)
    )
}

fn click_script(locator: &Locator) -> String {
    format!(
        "(() => {{ const el = {}; if (!el) return false; el.click(); return true; }})()",
        element_expr(locator)
    )
}
