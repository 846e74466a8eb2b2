//! Listing crawl: builds the seed artifact the deep scrape reads.
//!
//! One GET of the listing index page, parsed with `scraper`. Each
//! `li.liste-unitate` becomes a [`SeedListing`]; anything missing is `"N/A"`.

use crate::config::{BASE_URL, USER_AGENT};
use crate::console::Console;
use crate::error::{ScrapeError, ScrapeResult};
use crate::record::{SeedListing, NOT_AVAILABLE};
use crate::sink;
use scraper::{ElementRef, Html, Selector};
use std::path::Path;
use std::time::Duration;

/// Retries after a 5xx before giving up.
const MAX_RETRIES: u32 = 2;

const FETCH_TIMEOUT: Duration = Duration::from_secs(30);

/// HTTP client with the browser identity the site expects.
pub fn client() -> ScrapeResult<reqwest::Client> {
    reqwest::Client::builder()
        .user_agent(USER_AGENT)
        .timeout(FETCH_TIMEOUT)
        .redirect(reqwest::redirect::Policy::limited(5))
        .build()
        .map_err(|e| ScrapeError::Seed(format!("failed to build HTTP client: {e}")))
}

/// GET `url`, retrying on 5xx with exponential backoff.
pub async fn fetch_listing(client: &reqwest::Client, url: &str) -> ScrapeResult<String> {
    let mut retries = 0u32;
    loop {
        let resp = client
            .get(url)
            .send()
            .await
            .map_err(|e| ScrapeError::Seed(format!("GET {url} failed: {e}")))?;

        let status = resp.status();
        if status.is_server_error() && retries < MAX_RETRIES {
            retries += 1;
            let delay = Duration::from_millis(500 * 2u64.pow(retries - 1));
            tracing::debug!(%status, retries, "listing fetch retrying in {delay:?}");
            tokio::time::sleep(delay).await;
            continue;
        }
        if !status.is_success() {
            return Err(ScrapeError::Seed(format!("GET {url} returned {status}")));
        }

        return resp
            .text()
            .await
            .map_err(|e| ScrapeError::Seed(format!("reading body of {url} failed: {e}")));
    }
}

struct ListingSelectors {
    container: Selector,
    item: Selector,
    name: Selector,
    stars_box: Selector,
    star: Selector,
    address: Selector,
    reviews: Selector,
    capacity: Selector,
    description: Selector,
    price: Selector,
    image: Selector,
}

impl ListingSelectors {
    fn new() -> ScrapeResult<Self> {
        let parse = |s: &str| {
            Selector::parse(s).map_err(|e| ScrapeError::Seed(format!("bad selector {s:?}: {e}")))
        };
        Ok(Self {
            container: parse("ul.liste-cazare")?,
            item: parse("li.liste-unitate")?,
            name: parse(r#"span[itemprop="name"]"#)?,
            stars_box: parse(r#"span[style="white-space: nowrap;"]"#)?,
            star: parse("i.stars")?,
            address: parse(r#"span[itemprop="address"]"#)?,
            reviews: parse("div.ucrecenzii")?,
            capacity: parse("div.uclocuri")?,
            description: parse(r#"p[itemprop="description"]"#)?,
            price: parse(r#"div[itemprop="priceRange"]"#)?,
            image: parse(r#"img[itemprop="image"]"#)?,
        })
    }
}

/// Parse every listing on the index page.
pub fn parse_listings(html: &str, base: &str) -> ScrapeResult<Vec<SeedListing>> {
    let sel = ListingSelectors::new()?;
    let doc = Html::parse_document(html);

    let container = doc
        .select(&sel.container)
        .next()
        .ok_or_else(|| ScrapeError::Seed("could not find the listings container".into()))?;

    Ok(container
        .select(&sel.item)
        .map(|item| parse_item(item, &sel, base))
        .collect())
}

fn parse_item(item: ElementRef<'_>, sel: &ListingSelectors, base: &str) -> SeedListing {
    let mut listing = SeedListing::default();
    let first = |s: &Selector| item.select(s).next();

    if let Some(name) = first(&sel.name) {
        listing.name = or_na(name.text().collect::<String>().trim());
        if let Some(href) = parent_link(name) {
            listing.details_url = absolutize(base, href);
        }
    }

    if let Some(stars) = first(&sel.stars_box) {
        let n = stars.select(&sel.star).count();
        if n > 0 {
            listing.star_rating = format!("{n} stars");
        }
    }

    if let Some(address) = first(&sel.address) {
        listing.address = or_na(&joined_text(address, " "));
    }

    if let Some(reviews) = first(&sel.reviews) {
        let raw = joined_text(reviews, "").replace("question_answer", "");
        listing.reviews = or_na(&collapse_whitespace(&raw));
    }

    if let Some(capacity) = first(&sel.capacity) {
        let raw = joined_text(capacity, "").replace("supervisor_account", "");
        let text = collapse_whitespace(&raw).replace("spatiude cazare", "spatiu de cazare");
        listing.capacity = or_na(&text);
    }

    if let Some(description) = first(&sel.description) {
        listing.description = or_na(&joined_text(description, ""));
    }

    if let Some(price) = first(&sel.price) {
        listing.price = or_na(&joined_text(price, ""));
    }

    if let Some(src) = first(&sel.image).and_then(|img| img.value().attr("src")) {
        listing.image_url = format!("{base}{src}").replace(&format!("{base}{base}"), base);
    }

    listing
}

/// Href of the nearest enclosing anchor.
fn parent_link(el: ElementRef<'_>) -> Option<&str> {
    el.ancestors()
        .filter_map(ElementRef::wrap)
        .find(|a| a.value().name() == "a" && a.value().attr("href").is_some())
        .and_then(|a| a.value().attr("href"))
}

fn absolutize(base: &str, href: &str) -> String {
    if href.starts_with("http://") || href.starts_with("https://") {
        href.to_string()
    } else {
        format!("{base}{href}")
    }
}

/// Every text node trimmed, empties dropped, joined with `sep`.
fn joined_text(el: ElementRef<'_>, sep: &str) -> String {
    el.text()
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .collect::<Vec<_>>()
        .join(sep)
}

fn collapse_whitespace(s: &str) -> String {
    s.split_whitespace().collect::<Vec<_>>().join(" ")
}

fn or_na(s: &str) -> String {
    if s.is_empty() {
        NOT_AVAILABLE.to_string()
    } else {
        s.to_string()
    }
}

/// Fetch, parse and write the seed artifact.
pub async fn run_seed(url: &str, output: &Path, console: &Console) -> ScrapeResult<Vec<SeedListing>> {
    console.line(format!("Attempting to fetch {url}..."));
    let html = fetch_listing(&client()?, url).await?;
    console.line("Successfully fetched the page.");

    let listings = parse_listings(&html, BASE_URL)?;
    console.line(format!("Found {} hotel listings.", listings.len()));

    sink::write_pretty_atomic(&listings, output)?;
    console.always(format!(
        "Saved {} hotel entries to {}",
        listings.len(),
        output.display()
    ));
    Ok(listings)
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{header_exists, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    const PAGE: &str = r#"
        <html><body>
        <ul class="liste-cazare">
          <li class="liste-unitate">
            <a href="/brasov/cazare-pensiunea-ana.html"><span itemprop="name"> Pensiunea Ana </span></a>
            <span style="white-space: nowrap;"><i class="stars">★</i><i class="stars">★</i><i class="stars">★</i></span>
            <span itemprop="address">Str. Lungă 4,
               <b>Brașov</b></span>
            <div class="ucrecenzii"><i>question_answer</i>  12   recenzii</div>
            <div class="uclocuri"><i>supervisor_account</i> 1 spatiu<br>de cazare</div>
            <p itemprop="description">Pensiune familială.</p>
            <div itemprop="priceRange">de la 250 lei</div>
            <img itemprop="image" src="/poze/ana.jpg">
          </li>
          <li class="liste-unitate">
            <span itemprop="name">Cabana fără link</span>
            <img itemprop="image" src="https://www.turistinfo.ro/poze/c.jpg">
          </li>
        </ul>
        </body></html>
    "#;

    #[test]
    fn test_parse_listing_fields() {
        let listings = parse_listings(PAGE, BASE_URL).unwrap();
        assert_eq!(listings.len(), 2);

        let ana = &listings[0];
        assert_eq!(ana.name, "Pensiunea Ana");
        assert_eq!(
            ana.details_url,
            "https://www.turistinfo.ro/brasov/cazare-pensiunea-ana.html"
        );
        assert_eq!(ana.star_rating, "3 stars");
        assert_eq!(ana.address, "Str. Lungă 4, Brașov");
        assert_eq!(ana.reviews, "12 recenzii");
        assert_eq!(ana.capacity, "1 spatiu de cazare");
        assert_eq!(ana.description, "Pensiune familială.");
        assert_eq!(ana.price, "de la 250 lei");
        assert_eq!(ana.image_url, "https://www.turistinfo.ro/poze/ana.jpg");
    }

    #[test]
    fn test_missing_parts_are_sentinel() {
        let listings = parse_listings(PAGE, BASE_URL).unwrap();
        let cabana = &listings[1];
        assert_eq!(cabana.details_url, "N/A");
        assert_eq!(cabana.star_rating, "N/A");
        assert_eq!(cabana.price, "N/A");
        // Absolute src is not double-prefixed.
        assert_eq!(cabana.image_url, "https://www.turistinfo.ro/poze/c.jpg");
    }

    #[test]
    fn test_missing_container_is_error() {
        let err = parse_listings("<html><body><p>maintenance</p></body></html>", BASE_URL)
            .unwrap_err();
        assert!(matches!(err, ScrapeError::Seed(_)));
    }

    #[tokio::test]
    async fn test_fetch_retries_server_errors() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/brasov/listing.html"))
            .respond_with(ResponseTemplate::new(503))
            .up_to_n_times(1)
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/brasov/listing.html"))
            .and(header_exists("user-agent"))
            .respond_with(ResponseTemplate::new(200).set_body_string(PAGE))
            .mount(&server)
            .await;

        let url = format!("{}/brasov/listing.html", server.uri());
        let html = fetch_listing(&client().unwrap(), &url).await.unwrap();
        assert!(html.contains("liste-cazare"));
    }

    #[tokio::test]
    async fn test_run_seed_writes_artifact() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_string(PAGE))
            .mount(&server)
            .await;

        let dir = tempfile::tempdir().unwrap();
        let out = dir.path().join("hotels_for_deep_scrape.json");
        let (console, buf) = Console::capture();
        let listings = run_seed(&server.uri(), &out, &console).await.unwrap();

        assert_eq!(listings.len(), 2);
        assert!(buf.contents().contains("Found 2 hotel listings."));
        let targets = sink::load_targets(&out).unwrap();
        assert_eq!(targets.len(), 1);
        assert_eq!(targets[0].index, 1);
        assert_eq!(targets[0].total, 2);
    }

    #[tokio::test]
    async fn test_fetch_gives_up_on_client_error() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(404))
            .mount(&server)
            .await;
        let err = fetch_listing(&client().unwrap(), &server.uri())
            .await
            .unwrap_err();
        assert!(err.to_string().contains("404"));
    }
}
