//! The individual field extractors.

use super::{clean_text, wait_for_text, wait_until, Extracted, Miss};
use crate::browser::{Locator, PageSession};
use crate::config::Timings;
use url::Url;

/// Trimmed text of the first element matching `locator`.
pub async fn text(session: &dyn PageSession, locator: &Locator) -> Extracted<String> {
    match session.text(locator).await {
        Ok(raw) => clean_text(raw),
        Err(e) => Extracted::Missing(Miss::Failed(format!("{e:#}"))),
    }
}

/// Locator for the element right after the `h2.titlu` heading containing `heading`.
pub fn policy_locator(heading: &str) -> Locator {
    Locator::xpath(format!(
        "//h2[@class='titlu' and contains(text(), '{heading}')]/following-sibling::*[1]"
    ))
}

/// Text of a labeled policy section.
pub async fn policy(session: &dyn PageSession, heading: &str) -> Extracted<String> {
    text(session, &policy_locator(heading)).await
}

/// Gallery links resolved against `base_url`, in page order.
///
/// Empty hrefs and anything that does not resolve to an http(s) URL are
/// dropped. An empty gallery is reported as [`Miss::NotFound`].
pub async fn images(
    session: &dyn PageSession,
    gallery: &Locator,
    base_url: &str,
) -> Extracted<Vec<String>> {
    let hrefs = match session.attribute_all(gallery, "href").await {
        Ok(hrefs) => hrefs,
        Err(e) => return Extracted::Missing(Miss::Failed(format!("{e:#}"))),
    };

    let base = Url::parse(base_url).ok();
    let links: Vec<String> = hrefs
        .iter()
        .map(|h| h.trim())
        .filter(|h| !h.is_empty())
        .filter_map(|h| resolve(base.as_ref(), h))
        .collect();

    if links.is_empty() {
        Extracted::Missing(Miss::NotFound)
    } else {
        Extracted::Found(links)
    }
}

fn resolve(base: Option<&Url>, href: &str) -> Option<String> {
    let url = match base {
        Some(base) => base.join(href).ok()?,
        None => Url::parse(href).ok()?,
    };
    matches!(url.scheme(), "http" | "https").then(|| url.to_string())
}

/// Full description, expanding the lazy toggle first.
///
/// If the toggle cannot be clicked the element is read as-is.
pub async fn description(
    session: &dyn PageSession,
    toggle: &Locator,
    body: &Locator,
    timings: &Timings,
) -> Extracted<String> {
    match session.click(toggle).await {
        Ok(true) => {
            tokio::time::sleep(timings.description_settle).await;
            text(session, body).await
        }
        Ok(false) => {
            tracing::debug!("description toggle {toggle} not present, reading directly");
            text(session, body).await
        }
        Err(e) => {
            tracing::debug!("description toggle {toggle} click failed: {e:#}");
            text(session, body).await
        }
    }
}

/// Locators for the phone reveal interaction.
#[derive(Debug, Clone, Copy)]
pub struct PhoneControls<'a> {
    /// Control that triggers the reveal.
    pub reveal: &'a Locator,
    /// Element holding the (initially masked) number.
    pub number: &'a Locator,
    /// Placeholder token present while the number is masked.
    pub mask: &'a str,
}

/// Click the reveal control, then wait for the unmasked number.
pub async fn phone(
    session: &dyn PageSession,
    controls: PhoneControls<'_>,
    timings: &Timings,
) -> Extracted<String> {
    let reveal = controls.reveal;
    let clicked = wait_until(
        timings.phone_button_wait,
        timings.poll_interval,
        move || async move {
            match session.click(reveal).await {
                Ok(true) => Some(()),
                Ok(false) => None,
                Err(e) => {
                    tracing::debug!("phone reveal {reveal} click failed: {e:#}");
                    None
                }
            }
        },
    )
    .await;

    if clicked.is_none() {
        return Extracted::Missing(Miss::NotFound);
    }

    let mask = controls.mask;
    wait_for_text(
        session,
        controls.number,
        timings.phone_reveal_wait,
        timings.poll_interval,
        |t| !t.contains(mask),
    )
    .await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::browser::scripted::{PageScript, ScriptedFactory};
    use crate::browser::SessionFactory;
    use std::time::Duration;

    async fn loaded(page: PageScript) -> (ScriptedFactory, Box<dyn PageSession>) {
        let factory = ScriptedFactory::new(page);
        let mut session = factory.open().await.unwrap();
        session
            .navigate("https://www.turistinfo.ro/brasov/vila-x.html", Duration::from_secs(1))
            .await
            .unwrap();
        (factory, session)
    }

    #[tokio::test]
    async fn test_text_trims_and_rejects_blank() {
        let addr = Locator::xpath("//span[@itemprop='address']");
        let cap = Locator::class("capacitate");
        let (_f, s) = loaded(
            PageScript::new()
                .text(addr.clone(), "  Str. Republicii 5, Brașov  ")
                .text(cap.clone(), "   "),
        )
        .await;

        assert_eq!(
            text(s.as_ref(), &addr).await,
            Extracted::Found("Str. Republicii 5, Brașov".into())
        );
        assert_eq!(text(s.as_ref(), &cap).await.into_field(), "N/A");
        assert_eq!(
            text(s.as_ref(), &Locator::class("facilitylist")).await,
            Extracted::Missing(Miss::NotFound)
        );
    }

    #[tokio::test]
    async fn test_policy_reads_following_sibling() {
        let (_f, s) = loaded(
            PageScript::new().text(policy_locator("Plata"), "Acceptăm card și numerar."),
        )
        .await;
        assert_eq!(
            policy(s.as_ref(), "Plata").await.into_field(),
            "Acceptăm card și numerar."
        );
        assert_eq!(policy(s.as_ref(), "Mesele").await.into_field(), "N/A");
    }

    #[test]
    fn test_policy_locator_shape() {
        assert_eq!(
            policy_locator("Copiii").selector(),
            "//h2[@class='titlu' and contains(text(), 'Copiii')]/following-sibling::*[1]"
        );
    }

    #[tokio::test]
    async fn test_images_resolve_and_filter() {
        let gallery = Locator::css("a[rel=gallery-2]");
        let (_f, s) = loaded(PageScript::new().links(
            gallery.clone(),
            &[
                "/poze/1.jpg",
                "",
                "   ",
                "https://cdn.turistinfo.ro/2.jpg",
                "javascript:void(0)",
                "poze/3.jpg",
            ],
        ))
        .await;

        let got = images(s.as_ref(), &gallery, "https://www.turistinfo.ro/brasov/vila-x.html")
            .await
            .value_or(Vec::new());
        assert_eq!(
            got,
            vec![
                "https://www.turistinfo.ro/poze/1.jpg",
                "https://cdn.turistinfo.ro/2.jpg",
                "https://www.turistinfo.ro/brasov/poze/3.jpg",
            ]
        );
    }

    #[tokio::test]
    async fn test_images_empty_gallery() {
        let (_f, s) = loaded(PageScript::new()).await;
        let got = images(s.as_ref(), &Locator::css("a.g"), "https://www.turistinfo.ro/").await;
        assert_eq!(got, Extracted::Missing(Miss::NotFound));
    }

    #[tokio::test]
    async fn test_description_clicks_toggle_when_present() {
        let toggle = Locator::id("sLongDesc");
        let body = Locator::xpath("//div[@itemprop='description']");
        let (f, s) = loaded(
            PageScript::new()
                .text(toggle.clone(), "Citește mai mult")
                .text(body.clone(), "Descriere completă"),
        )
        .await;

        let got = description(s.as_ref(), &toggle, &body, &Timings::immediate()).await;
        assert_eq!(got.into_field(), "Descriere completă");
        assert!(f.calls().iter().any(|c| c == "click id:sLongDesc"));
    }

    #[tokio::test]
    async fn test_description_falls_back_without_toggle() {
        let toggle = Locator::id("sLongDesc");
        let body = Locator::xpath("//div[@itemprop='description']");
        let (_f, s) = loaded(PageScript::new().text(body.clone(), "Scurtă descriere")).await;

        let got = description(s.as_ref(), &toggle, &body, &Timings::immediate()).await;
        assert_eq!(got.into_field(), "Scurtă descriere");
    }

    #[tokio::test]
    async fn test_description_reads_directly_when_toggle_click_errors() {
        let toggle = Locator::id("sLongDesc");
        let body = Locator::xpath("//div[@itemprop='description']");
        let (f, s) = loaded(
            PageScript::new()
                .text(toggle.clone(), "Citește mai mult")
                .failing_click(toggle.clone())
                .text(body.clone(), "Descriere completă a vilei"),
        )
        .await;

        let got = description(s.as_ref(), &toggle, &body, &Timings::immediate()).await;
        assert_eq!(got, Extracted::Found("Descriere completă a vilei".into()));
        assert!(f.calls().iter().any(|c| c == "click id:sLongDesc"));
    }

    #[tokio::test]
    async fn test_phone_waits_for_unmasked_number() {
        let reveal = Locator::css("div.vezitel a");
        let number = Locator::class("telnr");
        let (_f, s) = loaded(
            PageScript::new().text(number.clone(), "0268 XXX XXX").on_click(
                reveal.clone(),
                number.clone(),
                "0268 412 345",
                Duration::from_millis(20),
            ),
        )
        .await;

        let controls = PhoneControls {
            reveal: &reveal,
            number: &number,
            mask: "XXX",
        };
        let got = phone(s.as_ref(), controls, &Timings::immediate()).await;
        assert_eq!(got, Extracted::Found("0268 412 345".into()));
    }

    #[tokio::test]
    async fn test_phone_without_reveal_control() {
        let reveal = Locator::css("div.vezitel a");
        let number = Locator::class("telnr");
        let (_f, s) = loaded(PageScript::new().text(number.clone(), "0268 XXX XXX")).await;

        let controls = PhoneControls {
            reveal: &reveal,
            number: &number,
            mask: "XXX",
        };
        let got = phone(s.as_ref(), controls, &Timings::immediate()).await;
        assert_eq!(got, Extracted::Missing(Miss::NotFound));
    }
}
