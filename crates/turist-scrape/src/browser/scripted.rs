//! In-memory page double.
//!
//! A `ScriptedFactory` hands out sessions whose pages are described by
//! [`PageScript`]s: static elements, plus click handlers that swap an
//! element's text after a delay (the phone reveal). Every call is recorded
//! so tests can assert what the scraper did and did not touch.

use super::{Locator, NavigationResult, PageSession, SessionFactory};
use anyhow::{bail, Result};
use async_trait::async_trait;
use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

/// One element on a scripted page.
#[derive(Debug, Clone, Default)]
pub struct ScriptedElement {
    pub text: String,
    pub attributes: HashMap<String, String>,
}

#[derive(Debug, Clone)]
struct Reveal {
    target: Locator,
    text: String,
    after: Duration,
}

/// Static description of one page.
#[derive(Debug, Clone, Default)]
pub struct PageScript {
    elements: HashMap<Locator, Vec<ScriptedElement>>,
    reveals: HashMap<Locator, Reveal>,
    broken_controls: HashSet<Locator>,
    final_url: Option<String>,
}

impl PageScript {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a single element with `text`.
    pub fn text(mut self, locator: Locator, text: impl Into<String>) -> Self {
        self.elements.insert(
            locator,
            vec![ScriptedElement {
                text: text.into(),
                ..Default::default()
            }],
        );
        self
    }

    /// Add one anchor per href under `locator`.
    pub fn links(mut self, locator: Locator, hrefs: &[&str]) -> Self {
        let elements = hrefs
            .iter()
            .map(|href| ScriptedElement {
                text: String::new(),
                attributes: HashMap::from([("href".to_string(), href.to_string())]),
            })
            .collect();
        self.elements.insert(locator, elements);
        self
    }

    /// Clicking `control` replaces `target`'s text with `text` after `after`.
    ///
    /// Adds the control element if it is not already present.
    pub fn on_click(
        mut self,
        control: Locator,
        target: Locator,
        text: impl Into<String>,
        after: Duration,
    ) -> Self {
        self.elements
            .entry(control.clone())
            .or_insert_with(|| vec![ScriptedElement::default()]);
        self.reveals.insert(
            control,
            Reveal {
                target,
                text: text.into(),
                after,
            },
        );
        self
    }

    /// Clicking `control` raises a session error instead of acting.
    pub fn failing_click(mut self, control: Locator) -> Self {
        self.broken_controls.insert(control);
        self
    }

    /// Report `url` as the page's location after navigation.
    pub fn redirect_to(mut self, url: impl Into<String>) -> Self {
        self.final_url = Some(url.into());
        self
    }
}

/// Shared, ordered record of every session call.
#[derive(Clone, Default)]
pub struct CallLog(Arc<Mutex<Vec<String>>>);

impl CallLog {
    fn push(&self, entry: String) {
        if let Ok(mut log) = self.0.lock() {
            log.push(entry);
        }
    }

    pub fn entries(&self) -> Vec<String> {
        self.0.lock().map(|log| log.clone()).unwrap_or_default()
    }
}

#[derive(Clone, Default)]
struct ScriptBook {
    default_page: PageScript,
    pages: HashMap<String, PageScript>,
    failing_urls: HashSet<String>,
    navigation_delay: Duration,
}

/// Factory for scripted sessions.
pub struct ScriptedFactory {
    book: Arc<ScriptBook>,
    fail_open: bool,
    log: CallLog,
    opened: Arc<AtomicUsize>,
    closed: Arc<AtomicUsize>,
}

impl ScriptedFactory {
    /// Every URL renders `default_page` unless overridden.
    pub fn new(default_page: PageScript) -> Self {
        Self {
            book: Arc::new(ScriptBook {
                default_page,
                ..Default::default()
            }),
            fail_open: false,
            log: CallLog::default(),
            opened: Arc::new(AtomicUsize::new(0)),
            closed: Arc::new(AtomicUsize::new(0)),
        }
    }

    fn book_mut(&mut self) -> &mut ScriptBook {
        Arc::make_mut(&mut self.book)
    }

    pub fn with_page(mut self, url: impl Into<String>, page: PageScript) -> Self {
        self.book_mut().pages.insert(url.into(), page);
        self
    }

    /// Navigation to `url` fails.
    pub fn failing_navigation(mut self, url: impl Into<String>) -> Self {
        self.book_mut().failing_urls.insert(url.into());
        self
    }

    /// Every navigation takes `delay`.
    pub fn navigation_delay(mut self, delay: Duration) -> Self {
        self.book_mut().navigation_delay = delay;
        self
    }

    /// `open` always fails, as if the browser could not start.
    pub fn failing_open(mut self) -> Self {
        self.fail_open = true;
        self
    }

    pub fn calls(&self) -> Vec<String> {
        self.log.entries()
    }

    pub fn opened(&self) -> usize {
        self.opened.load(Ordering::SeqCst)
    }

    pub fn closed(&self) -> usize {
        self.closed.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl SessionFactory for ScriptedFactory {
    async fn open(&self) -> Result<Box<dyn PageSession>> {
        self.log.push("open".to_string());
        if self.fail_open {
            bail!("browser failed to start");
        }
        self.opened.fetch_add(1, Ordering::SeqCst);
        Ok(Box::new(ScriptedPage {
            book: Arc::clone(&self.book),
            log: self.log.clone(),
            closed: Arc::clone(&self.closed),
            current: None,
            revealed: Mutex::new(HashMap::new()),
        }))
    }
}

/// A scripted session.
pub struct ScriptedPage {
    book: Arc<ScriptBook>,
    log: CallLog,
    closed: Arc<AtomicUsize>,
    current: Option<(String, PageScript)>,
    revealed: Mutex<HashMap<Locator, (Instant, String)>>,
}

impl ScriptedPage {
    fn page(&self) -> Result<&PageScript> {
        match &self.current {
            Some((_, page)) => Ok(page),
            None => bail!("no page loaded"),
        }
    }
}

#[async_trait]
impl PageSession for ScriptedPage {
    async fn navigate(&mut self, url: &str, timeout: Duration) -> Result<NavigationResult> {
        self.log.push(format!("navigate {url}"));
        let start = Instant::now();

        let delay = self.book.navigation_delay;
        if tokio::time::timeout(timeout, tokio::time::sleep(delay))
            .await
            .is_err()
        {
            bail!("navigation timed out after {}ms", timeout.as_millis());
        }
        if self.book.failing_urls.contains(url) {
            bail!("net::ERR_NAME_NOT_RESOLVED");
        }

        let page = self
            .book
            .pages
            .get(url)
            .unwrap_or(&self.book.default_page)
            .clone();
        let final_url = page.final_url.clone().unwrap_or_else(|| url.to_string());

        if let Ok(mut revealed) = self.revealed.lock() {
            revealed.clear();
        }
        self.current = Some((final_url.clone(), page));

        Ok(NavigationResult {
            final_url,
            load_time_ms: start.elapsed().as_millis() as u64,
        })
    }

    async fn text(&self, locator: &Locator) -> Result<Option<String>> {
        self.log.push(format!("text {locator}"));
        let page = self.page()?;

        if let Ok(revealed) = self.revealed.lock() {
            if let Some((ready_at, text)) = revealed.get(locator) {
                if Instant::now() >= *ready_at {
                    return Ok(Some(text.clone()));
                }
            }
        }

        Ok(page
            .elements
            .get(locator)
            .and_then(|els| els.first())
            .map(|el| el.text.clone()))
    }

    async fn attribute_all(&self, locator: &Locator, name: &str) -> Result<Vec<String>> {
        self.log.push(format!("attrs {locator}"));
        let page = self.page()?;
        Ok(page
            .elements
            .get(locator)
            .map(|els| {
                els.iter()
                    .map(|el| el.attributes.get(name).cloned().unwrap_or_default())
                    .collect()
            })
            .unwrap_or_default())
    }

    async fn click(&self, locator: &Locator) -> Result<bool> {
        self.log.push(format!("click {locator}"));
        let page = self.page()?;

        if page.broken_controls.contains(locator) {
            bail!("element {locator} is not interactable");
        }
        if !page.elements.contains_key(locator) {
            return Ok(false);
        }
        if let Some(reveal) = page.reveals.get(locator) {
            if let Ok(mut revealed) = self.revealed.lock() {
                revealed.insert(
                    reveal.target.clone(),
                    (Instant::now() + reveal.after, reveal.text.clone()),
                );
            }
        }
        Ok(true)
    }

    async fn current_url(&self) -> Result<String> {
        Ok(self
            .current
            .as_ref()
            .map(|(url, _)| url.clone())
            .unwrap_or_else(|| "about:blank".to_string()))
    }

    async fn close(self: Box<Self>) -> Result<()> {
        self.log.push("close".to_string());
        self.closed.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}
