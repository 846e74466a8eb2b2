//! Browser capability abstraction.
//!
//! Defines the `SessionFactory` and `PageSession` traits that the scrape
//! core depends on. Production code drives headless Chromium via
//! chromiumoxide; tests drive the in-memory [`scripted`] page.

pub mod chromium;
pub mod scripted;

use anyhow::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;

/// Result of navigating to a URL.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NavigationResult {
    /// The final URL after any redirects.
    pub final_url: String,
    /// Time taken to load the page in milliseconds.
    pub load_time_ms: u64,
}

/// How to find one element on a page.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "by", content = "selector")]
pub enum Locator {
    XPath(String),
    ClassName(String),
    Id(String),
    Css(String),
}

impl Locator {
    pub fn xpath(s: impl Into<String>) -> Self {
        Self::XPath(s.into())
    }

    pub fn class(s: impl Into<String>) -> Self {
        Self::ClassName(s.into())
    }

    pub fn id(s: impl Into<String>) -> Self {
        Self::Id(s.into())
    }

    pub fn css(s: impl Into<String>) -> Self {
        Self::Css(s.into())
    }

    pub fn selector(&self) -> &str {
        match self {
            Self::XPath(s) | Self::ClassName(s) | Self::Id(s) | Self::Css(s) => s,
        }
    }
}

impl fmt::Display for Locator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::XPath(s) => write!(f, "xpath:{s}"),
            Self::ClassName(s) => write!(f, "class:{s}"),
            Self::Id(s) => write!(f, "id:{s}"),
            Self::Css(s) => write!(f, "css:{s}"),
        }
    }
}

/// Launches isolated browser sessions.
#[async_trait]
pub trait SessionFactory: Send + Sync {
    /// Create a fresh session positioned on a blank page.
    async fn open(&self) -> Result<Box<dyn PageSession>>;
}

/// One browser session showing one page at a time.
///
/// Lookups return `Ok(None)` / `Ok(false)` / an empty vec when the element
/// is absent; `Err` is reserved for session-level failures.
#[async_trait]
pub trait PageSession: Send + Sync {
    /// Navigate to a URL, bounded by `timeout`.
    async fn navigate(&mut self, url: &str, timeout: Duration) -> Result<NavigationResult>;
    /// Rendered text of the first element matching `locator`.
    async fn text(&self, locator: &Locator) -> Result<Option<String>>;
    /// Raw value of `name` on every element matching `locator`, in document order.
    async fn attribute_all(&self, locator: &Locator, name: &str) -> Result<Vec<String>>;
    /// Click the first element matching `locator`. `false` if absent.
    async fn click(&self, locator: &Locator) -> Result<bool>;
    /// The page's current URL.
    async fn current_url(&self) -> Result<String>;
    /// Release the session and everything it holds.
    async fn close(self: Box<Self>) -> Result<()>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_locator_display() {
        assert_eq!(
            Locator::xpath("//span[@itemprop='name']").to_string(),
            "xpath://span[@itemprop='name']"
        );
        assert_eq!(Locator::class("telnr").to_string(), "class:telnr");
        assert_eq!(Locator::id("sLongDesc").selector(), "sLongDesc");
    }

    #[test]
    fn test_locator_serde_shape() {
        let json = serde_json::to_string(&Locator::class("capacitate")).unwrap();
        assert_eq!(json, r#"{"by":"ClassName","selector":"capacitate"}"#);
    }
}
