//! Page Session Scraper: one detail page in, one record out.
//!
//! [`PageScraper::scrape_one`] owns the whole lifetime of a browser
//! session for a single URL. [`PageScraper::scrape_in`] runs the same
//! extraction sequence on a session the caller already holds, which is how
//! single-session mode reuses one browser across every URL.
//!
//! Neither function returns an error: session failures, navigation
//! failures and a missing property name all yield the default record.

use crate::browser::{Locator, NavigationResult, PageSession, SessionFactory};
use crate::config::Timings;
use crate::console::Console;
use crate::error::ScrapeError;
use crate::extract::{self, wait_for_text, Extracted, PhoneControls};
use crate::record::{is_known, ExtractionResult, Target};
use std::sync::Arc;

/// Descriptions at or below this length are reported as failures.
const FULL_DESCRIPTION_MIN_CHARS: usize = 100;

const OK: &str = "[OK]";
const FAIL: &str = "[--]";

/// Where each field lives on a detail page.
#[derive(Debug, Clone)]
pub struct PageSelectors {
    pub name: Locator,
    pub address: Locator,
    pub capacity: Locator,
    pub facilities: Locator,
    pub gallery: Locator,
    pub description_toggle: Locator,
    pub description: Locator,
    pub phone_reveal: Locator,
    pub phone_text: Locator,
    pub phone_mask: String,
    pub children_heading: String,
    pub meals_heading: String,
    pub reservation_heading: String,
    pub payment_heading: String,
}

impl Default for PageSelectors {
    fn default() -> Self {
        Self {
            name: Locator::xpath("//span[@itemprop='name']"),
            address: Locator::xpath("//span[@itemprop='address']"),
            capacity: Locator::class("capacitate"),
            facilities: Locator::class("facilitylist"),
            gallery: Locator::xpath("//div[contains(@class, 'picture')]//a[@rel='gallery-2']"),
            description_toggle: Locator::id("sLongDesc"),
            description: Locator::xpath("//div[@itemprop='description']"),
            phone_reveal: Locator::xpath(
                "//div[@class='phone vezitel']/a[@class='btn blue darken-1']",
            ),
            phone_text: Locator::class("telnr"),
            phone_mask: "XXX".to_string(),
            children_heading: "Copiii".to_string(),
            meals_heading: "Mesele".to_string(),
            reservation_heading: "Politica de rezervări".to_string(),
            payment_heading: "Plata".to_string(),
        }
    }
}

/// Scrapes detail pages with a fixed set of selectors and waits.
pub struct PageScraper {
    selectors: PageSelectors,
    timings: Timings,
    console: Arc<Console>,
}

impl PageScraper {
    pub fn new(selectors: PageSelectors, timings: Timings, console: Arc<Console>) -> Self {
        Self {
            selectors,
            timings,
            console,
        }
    }

    pub fn console(&self) -> &Arc<Console> {
        &self.console
    }

    /// Base URL for relative gallery links: where navigation landed, then
    /// where the page is now, then the target itself.
    async fn image_base(
        &self,
        page: &dyn PageSession,
        nav: &NavigationResult,
        target: &Target,
    ) -> String {
        if nav.final_url.starts_with("http") {
            return nav.final_url.clone();
        }
        match page.current_url().await {
            Ok(url) if url.starts_with("http") => url,
            _ => target.url.clone(),
        }
    }

    /// Open a fresh session, scrape `target`, and release the session.
    pub async fn scrape_one(
        &self,
        factory: &dyn SessionFactory,
        target: &Target,
    ) -> ExtractionResult {
        let mut session = match factory.open().await {
            Ok(session) => session,
            Err(e) => {
                let err = ScrapeError::Session(format!("{e:#}"));
                tracing::warn!(url = %target.url, "{err}");
                self.console
                    .line(format!("\n{} -> ERROR: {err}", target.tag()));
                return ExtractionResult::new(&target.url);
            }
        };

        let record = self.scrape_in(session.as_mut(), target).await;

        if let Err(e) = session.close().await {
            tracing::debug!(url = %target.url, "session close failed: {e:#}");
        }
        record
    }

    /// Scrape `target` on an already-open session. The session stays open.
    pub async fn scrape_in(
        &self,
        session: &mut dyn PageSession,
        target: &Target,
    ) -> ExtractionResult {
        let mut record = ExtractionResult::new(&target.url);
        let sel = &self.selectors;
        let t = &self.timings;

        self.console
            .line(format!("\n{} -> Processing: {}", target.tag(), target.url));

        let nav = match session.navigate(&target.url, t.navigation_timeout).await {
            Ok(nav) => nav,
            Err(e) => {
                let err = ScrapeError::Navigation {
                    url: target.url.clone(),
                    reason: format!("{e:#}"),
                };
                tracing::warn!("{err}");
                self.console.line(format!("  -> ERROR: {err}"));
                return record;
            }
        };
        tracing::debug!(
            url = %target.url,
            final_url = %nav.final_url,
            load_time_ms = nav.load_time_ms,
            "page loaded"
        );
        self.console.line(format!(
            "  -> Opened URL: {} | Waiting {}ms...",
            target.url,
            t.settle.as_millis()
        ));
        tokio::time::sleep(t.settle).await;

        let page: &dyn PageSession = &*session;

        match wait_for_text(page, &sel.name, t.name_wait, t.poll_interval, |_| true).await {
            Extracted::Found(name) => record.property_name = name,
            Extracted::Missing(miss) => {
                tracing::debug!(url = %target.url, locator = %sel.name, "property name {miss}");
                self.console
                    .line("  -> ERROR: Could not find property name. Skipping.");
                return record;
            }
        }

        record.address = self.field(target, "address", extract::text(page, &sel.address).await);
        record.capacity = self.field(target, "capacity", extract::text(page, &sel.capacity).await);
        record.facilities =
            self.field(target, "facilities", extract::text(page, &sel.facilities).await);

        let base = self.image_base(page, &nav, target).await;
        let images = extract::images(page, &sel.gallery, &base).await;
        if let Some(miss) = images.miss() {
            tracing::debug!(url = %target.url, locator = %sel.gallery, "images {miss}");
        }
        record.images = images.value_or(Vec::new());
        self.console.line(format!(
            "  -> Images: {} ({})",
            marker(!record.images.is_empty()),
            record.images.len()
        ));

        record.full_description = self.field(
            target,
            "full_description",
            extract::description(page, &sel.description_toggle, &sel.description, t).await,
        );
        let full = is_known(&record.full_description)
            && record.full_description.chars().count() > FULL_DESCRIPTION_MIN_CHARS;
        self.console
            .line(format!("  -> Description: {}", marker(full)));

        record.policy_children = self.field(
            target,
            "politici_copii",
            extract::policy(page, &sel.children_heading).await,
        );
        record.policy_meals = self.field(
            target,
            "politici_mese",
            extract::policy(page, &sel.meals_heading).await,
        );
        record.policy_reservation = self.field(
            target,
            "politici_rezervari",
            extract::policy(page, &sel.reservation_heading).await,
        );
        record.policy_payment = self.field(
            target,
            "politici_plata",
            extract::policy(page, &sel.payment_heading).await,
        );
        self.console.line(format!(
            "  -> Policies: Copii {} | Mese {} | Rezervari {} | Plata {}",
            marker(is_known(&record.policy_children)),
            marker(is_known(&record.policy_meals)),
            marker(is_known(&record.policy_reservation)),
            marker(is_known(&record.policy_payment)),
        ));

        let controls = PhoneControls {
            reveal: &sel.phone_reveal,
            number: &sel.phone_text,
            mask: &sel.phone_mask,
        };
        record.phone_number =
            self.field(target, "phone_number", extract::phone(page, controls, t).await);
        if is_known(&record.phone_number) {
            self.console.line(format!(
                "  -> Contact: {OK} {}: {}",
                record.property_name, record.phone_number
            ));
        } else {
            self.console
                .line(format!("  -> Contact: {FAIL} could not reveal phone number"));
        }

        record
    }

    /// Collapse one text extraction into its field value, logging misses.
    fn field(&self, target: &Target, name: &str, value: Extracted<String>) -> String {
        if let Some(miss) = value.miss() {
            tracing::debug!(url = %target.url, field = name, "{miss}");
        }
        value.into_field()
    }
}

fn marker(ok: bool) -> &'static str {
    if ok {
        OK
    } else {
        FAIL
    }
}
