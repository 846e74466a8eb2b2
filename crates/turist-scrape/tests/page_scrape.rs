//! Single-page scraping against scripted pages.

use anyhow::{bail, Result};
use async_trait::async_trait;
use std::sync::Arc;
use std::time::{Duration, Instant};
use turist_scrape::browser::scripted::{PageScript, ScriptedFactory};
use turist_scrape::browser::{Locator, NavigationResult, PageSession, SessionFactory};
use turist_scrape::config::Timings;
use turist_scrape::console::{CaptureBuffer, Console};
use turist_scrape::extract::fields::policy_locator;
use turist_scrape::page::{PageScraper, PageSelectors};
use turist_scrape::record::{ExtractionResult, Target, NOT_AVAILABLE};

const URL: &str = "https://www.turistinfo.ro/brasov/cazare-hotel-aro-palace.html";

const LONG_DESCRIPTION: &str = "Hotelul Aro Palace este situat în centrul istoric al \
    Brașovului, la câțiva pași de Piața Sfatului, și oferă camere spațioase, restaurant, \
    centru spa și parcare privată pentru oaspeți.";

fn scraper_with(timings: Timings) -> (PageScraper, CaptureBuffer) {
    let (console, buf) = Console::capture();
    (
        PageScraper::new(PageSelectors::default(), timings, Arc::new(console)),
        buf,
    )
}

fn full_page() -> PageScript {
    let sel = PageSelectors::default();
    PageScript::new()
        .text(sel.name.clone(), "Hotel Aro Palace")
        .text(sel.address.clone(), "Bd. Eroilor 27, Brașov")
        .text(sel.capacity.clone(), "  240 adulți, 30 copii ")
        .text(sel.facilities.clone(), "check WiFi gratuit check parcare")
        .links(
            sel.gallery.clone(),
            &["/poze/aro/1.jpg", "", "https://cdn.turistinfo.ro/aro/2.jpg"],
        )
        .text(sel.description_toggle.clone(), "mai mult")
        .text(sel.description.clone(), LONG_DESCRIPTION)
        .text(policy_locator("Copiii"), "Acceptăm copii de orice vârstă.")
        .text(policy_locator("Mesele"), "Micul dejun este inclus.")
        .text(policy_locator("Politica de rezervări"), "Avans 30%.")
        .text(policy_locator("Plata"), "Card sau numerar.")
        .text(sel.phone_text.clone(), "0268 XXX XXX")
        .on_click(
            sel.phone_reveal.clone(),
            sel.phone_text.clone(),
            "0268 478 800",
            Duration::from_millis(15),
        )
}

/// Sessions that cannot report their location after navigation.
struct NoLocation(Box<dyn PageSession>);

#[async_trait]
impl PageSession for NoLocation {
    async fn navigate(&mut self, url: &str, timeout: Duration) -> Result<NavigationResult> {
        self.0.navigate(url, timeout).await
    }
    async fn text(&self, locator: &Locator) -> Result<Option<String>> {
        self.0.text(locator).await
    }
    async fn attribute_all(&self, locator: &Locator, name: &str) -> Result<Vec<String>> {
        self.0.attribute_all(locator, name).await
    }
    async fn click(&self, locator: &Locator) -> Result<bool> {
        self.0.click(locator).await
    }
    async fn current_url(&self) -> Result<String> {
        bail!("target closed")
    }
    async fn close(self: Box<Self>) -> Result<()> {
        self.0.close().await
    }
}

struct NoLocationFactory(ScriptedFactory);

#[async_trait]
impl SessionFactory for NoLocationFactory {
    async fn open(&self) -> Result<Box<dyn PageSession>> {
        Ok(Box::new(NoLocation(self.0.open().await?)))
    }
}

fn assert_well_formed(r: &ExtractionResult) {
    for (name, value) in r.text_fields() {
        assert!(!value.is_empty(), "{name} is empty");
        assert!(
            value == NOT_AVAILABLE || value.trim() == value,
            "{name} is not trimmed: {value:?}"
        );
    }
    for image in &r.images {
        assert!(image.starts_with("https://"), "relative image {image:?}");
    }
}

#[tokio::test]
async fn test_full_record() {
    let (scraper, buf) = scraper_with(Timings::immediate());
    let factory = ScriptedFactory::new(full_page());

    let r = scraper.scrape_one(&factory, &Target::new(1, 1, URL)).await;

    assert_well_formed(&r);
    assert_eq!(r.url, URL);
    assert_eq!(r.property_name, "Hotel Aro Palace");
    assert_eq!(r.capacity, "240 adulți, 30 copii");
    assert_eq!(
        r.images,
        vec![
            "https://www.turistinfo.ro/poze/aro/1.jpg",
            "https://cdn.turistinfo.ro/aro/2.jpg",
        ]
    );
    assert_eq!(r.full_description, LONG_DESCRIPTION);
    assert_eq!(r.policy_children, "Acceptăm copii de orice vârstă.");
    assert_eq!(r.policy_reservation, "Avans 30%.");
    assert_eq!(r.phone_number, "0268 478 800");
    assert_eq!(r.fields_found(), 10);

    let out = buf.contents();
    assert!(out.contains("  -> Description: [OK]"));
    assert!(out.contains("Copii [OK] | Mese [OK] | Rezervari [OK] | Plata [OK]"));
}

#[tokio::test]
async fn test_missing_name_runs_no_other_extractor() {
    let sel = PageSelectors::default();
    let page = full_page().text(sel.name.clone(), "   ");
    let (scraper, _buf) = scraper_with(Timings::immediate());
    let factory = ScriptedFactory::new(page);

    let r = scraper.scrape_one(&factory, &Target::new(1, 1, URL)).await;

    assert_eq!(r, ExtractionResult::new(URL));
    let name_call = format!("text {}", sel.name);
    for call in factory.calls() {
        assert!(
            call == "open" || call == "close" || call.starts_with("navigate ") || call == name_call,
            "unexpected call after missing name: {call}"
        );
    }
    assert_eq!(factory.closed(), 1);
}

#[tokio::test]
async fn test_navigation_failure_gives_default_record() {
    let (scraper, buf) = scraper_with(Timings::immediate());
    let factory = ScriptedFactory::new(full_page()).failing_navigation(URL);

    let r = scraper.scrape_one(&factory, &Target::new(4, 9, URL)).await;

    assert!(r.is_default());
    assert_eq!(factory.closed(), 1);
    assert!(buf.contents().contains("Navigation to"));
}

#[tokio::test]
async fn test_navigation_timeout_gives_default_record() {
    let timings = Timings {
        navigation_timeout: Duration::from_millis(20),
        ..Timings::immediate()
    };
    let (scraper, _buf) = scraper_with(timings);
    let factory = ScriptedFactory::new(full_page()).navigation_delay(Duration::from_secs(5));

    let start = Instant::now();
    let r = scraper.scrape_one(&factory, &Target::new(1, 1, URL)).await;

    assert!(r.is_default());
    assert!(start.elapsed() < Duration::from_secs(2));
}

#[tokio::test]
async fn test_phone_mask_never_clears() {
    let sel = PageSelectors::default();
    let page = full_page().on_click(
        sel.phone_reveal.clone(),
        sel.phone_text.clone(),
        "0268 XXX XXX",
        Duration::ZERO,
    );
    let timings = Timings::immediate();
    let (scraper, buf) = scraper_with(timings);
    let factory = ScriptedFactory::new(page);

    let start = Instant::now();
    let r = scraper.scrape_one(&factory, &Target::new(1, 1, URL)).await;

    assert_eq!(r.phone_number, NOT_AVAILABLE);
    assert_eq!(r.property_name, "Hotel Aro Palace");
    assert!(start.elapsed() >= timings.phone_reveal_wait);
    assert!(start.elapsed() < Duration::from_secs(2));
    assert!(buf.contents().contains("  -> Contact: [--]"));
}

#[tokio::test]
async fn test_images_resolve_against_final_url() {
    let sel = PageSelectors::default();
    let page = PageScript::new()
        .text(sel.name.clone(), "Cabana Trei Brazi")
        .links(sel.gallery.clone(), &["poze/1.jpg"])
        .redirect_to("https://www.turistinfo.ro/predeal/cabana-trei-brazi.html");
    let (scraper, _buf) = scraper_with(Timings::immediate());
    let factory = ScriptedFactory::new(page);

    let r = scraper
        .scrape_one(&factory, &Target::new(1, 1, "https://www.turistinfo.ro/old-link.html"))
        .await;

    assert_eq!(r.images, vec!["https://www.turistinfo.ro/predeal/poze/1.jpg"]);
    assert_eq!(r.url, "https://www.turistinfo.ro/old-link.html");
}

#[tokio::test]
async fn test_blank_fields_become_sentinel() {
    let sel = PageSelectors::default();
    let page = PageScript::new()
        .text(sel.name.clone(), "Pensiunea Dor")
        .text(sel.address.clone(), "\n\t ")
        .text(policy_locator("Plata"), "");
    let (scraper, _buf) = scraper_with(Timings::immediate());
    let factory = ScriptedFactory::new(page);

    let r = scraper.scrape_one(&factory, &Target::new(1, 1, URL)).await;

    assert_well_formed(&r);
    assert_eq!(r.address, NOT_AVAILABLE);
    assert_eq!(r.policy_payment, NOT_AVAILABLE);
    assert!(r.images.is_empty());
}

#[tokio::test]
async fn test_images_use_navigation_landing_url() {
    let sel = PageSelectors::default();
    let page = PageScript::new()
        .text(sel.name.clone(), "Cabana Trei Brazi")
        .links(sel.gallery.clone(), &["poze/1.jpg"])
        .redirect_to("https://www.turistinfo.ro/predeal/cabana-trei-brazi.html");
    let (scraper, _buf) = scraper_with(Timings::immediate());
    let factory = NoLocationFactory(ScriptedFactory::new(page));

    let r = scraper
        .scrape_one(&factory, &Target::new(1, 1, "https://www.turistinfo.ro/old-link.html"))
        .await;

    assert_eq!(r.images, vec!["https://www.turistinfo.ro/predeal/poze/1.jpg"]);
}

#[tokio::test]
async fn test_broken_description_toggle_still_reads_description() {
    let sel = PageSelectors::default();
    let page = full_page().failing_click(sel.description_toggle.clone());
    let (scraper, buf) = scraper_with(Timings::immediate());
    let factory = ScriptedFactory::new(page);

    let r = scraper.scrape_one(&factory, &Target::new(1, 1, URL)).await;

    assert_eq!(r.full_description, LONG_DESCRIPTION);
    assert_eq!(r.phone_number, "0268 478 800");
    assert!(buf.contents().contains("  -> Description: [OK]"));
}
