//! Field extraction against a loaded page.
//!
//! Every extractor returns an [`Extracted`] value and never fails past its
//! boundary: a missing element, an empty string, a timeout, or a session
//! error all become [`Miss`]es that the caller collapses into the field's
//! default.

pub mod fields;

use crate::browser::{Locator, PageSession};
use crate::record::NOT_AVAILABLE;
use std::fmt;
use std::future::Future;
use std::time::Duration;

pub use fields::{description, images, phone, policy, text, PhoneControls};

/// Why a field fell back to its default.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Miss {
    /// No element matched.
    NotFound,
    /// The element's trimmed text was empty.
    Empty,
    /// A bounded wait expired.
    TimedOut,
    /// The session reported an error.
    Failed(String),
}

impl fmt::Display for Miss {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NotFound => write!(f, "not found"),
            Self::Empty => write!(f, "empty"),
            Self::TimedOut => write!(f, "timed out"),
            Self::Failed(reason) => write!(f, "failed: {reason}"),
        }
    }
}

/// Outcome of one extraction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Extracted<T> {
    Found(T),
    Missing(Miss),
}

impl<T> Extracted<T> {
    pub fn is_found(&self) -> bool {
        matches!(self, Self::Found(_))
    }

    /// The found value, or `default`.
    pub fn value_or(self, default: T) -> T {
        match self {
            Self::Found(v) => v,
            Self::Missing(_) => default,
        }
    }

    pub fn miss(&self) -> Option<&Miss> {
        match self {
            Self::Found(_) => None,
            Self::Missing(m) => Some(m),
        }
    }
}

impl Extracted<String> {
    /// Collapse into a record field, using the `"N/A"` sentinel.
    pub fn into_field(self) -> String {
        self.value_or(NOT_AVAILABLE.to_string())
    }
}

/// Normalize raw element text: trimmed, and empty counts as missing.
pub fn clean_text(raw: Option<String>) -> Extracted<String> {
    match raw {
        None => Extracted::Missing(Miss::NotFound),
        Some(s) => {
            let trimmed = s.trim();
            if trimmed.is_empty() {
                Extracted::Missing(Miss::Empty)
            } else {
                Extracted::Found(trimmed.to_string())
            }
        }
    }
}

/// Poll `check` until it yields `Some`, for at most `timeout`.
///
/// The check runs at least once, even with a zero timeout.
pub async fn wait_until<T, F, Fut>(timeout: Duration, poll: Duration, mut check: F) -> Option<T>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Option<T>>,
{
    let deadline = tokio::time::Instant::now() + timeout;
    loop {
        if let Some(v) = check().await {
            return Some(v);
        }
        let now = tokio::time::Instant::now();
        if now >= deadline {
            return None;
        }
        tokio::time::sleep(poll.min(deadline - now)).await;
    }
}

/// Wait for the element's cleaned text to satisfy `accept`.
///
/// Session errors during polling count as "not yet". Any wait that expires
/// is reported as [`Miss::TimedOut`].
pub async fn wait_for_text(
    session: &dyn PageSession,
    locator: &Locator,
    timeout: Duration,
    poll: Duration,
    accept: impl Fn(&str) -> bool,
) -> Extracted<String> {
    let accept = &accept;
    let found = wait_until(timeout, poll, move || async move {
        match session.text(locator).await {
            Ok(raw) => match clean_text(raw) {
                Extracted::Found(t) if accept(&t) => Some(t),
                _ => None,
            },
            Err(e) => {
                tracing::debug!("poll {locator}: {e:#}");
                None
            }
        }
    })
    .await;

    match found {
        Some(t) => Extracted::Found(t),
        None => Extracted::Missing(Miss::TimedOut),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Instant;

    #[test]
    fn test_clean_text() {
        assert_eq!(clean_text(None), Extracted::Missing(Miss::NotFound));
        assert_eq!(
            clean_text(Some("  \n\t ".into())),
            Extracted::Missing(Miss::Empty)
        );
        assert_eq!(
            clean_text(Some("  Str. Lungă 12, Brașov \n".into())),
            Extracted::Found("Str. Lungă 12, Brașov".into())
        );
    }

    #[test]
    fn test_into_field_uses_sentinel() {
        assert_eq!(Extracted::<String>::Missing(Miss::Empty).into_field(), "N/A");
        assert_eq!(Extracted::Found("x".to_string()).into_field(), "x");
    }

    #[test]
    fn test_value_or_for_sequences() {
        let missing: Extracted<Vec<String>> = Extracted::Missing(Miss::NotFound);
        assert!(missing.value_or(Vec::new()).is_empty());
    }

    #[tokio::test]
    async fn test_wait_until_returns_first_success() {
        let counter = AtomicUsize::new(0);
        let calls = &counter;
        let got = wait_until(Duration::from_secs(1), Duration::from_millis(1), move || async move {
            let n = calls.fetch_add(1, Ordering::SeqCst);
            (n >= 3).then_some(n)
        })
        .await;
        assert_eq!(got, Some(3));
    }

    #[tokio::test]
    async fn test_wait_until_gives_up() {
        let start = Instant::now();
        let got: Option<()> =
            wait_until(Duration::from_millis(40), Duration::from_millis(5), || async {
                None
            })
            .await;
        assert!(got.is_none());
        assert!(start.elapsed() >= Duration::from_millis(40));
        assert!(start.elapsed() < Duration::from_secs(2));
    }

    #[tokio::test]
    async fn test_wait_until_zero_timeout_checks_once() {
        let counter = AtomicUsize::new(0);
        let calls = &counter;
        let got = wait_until(Duration::ZERO, Duration::from_millis(5), move || async move {
            calls.fetch_add(1, Ordering::SeqCst);
            Some(())
        })
        .await;
        assert!(got.is_some());
        assert_eq!(counter.load(Ordering::SeqCst), 1);
    }
}
