//! Text summary over a scraped Result Collection.

use crate::console::Console;
use crate::error::ScrapeResult;
use crate::record::{is_known, ExtractionResult, NOT_AVAILABLE};
use crate::sink;
use regex::Regex;
use serde::Serialize;
use std::collections::HashMap;
use std::path::Path;
use std::sync::OnceLock;

/// Properties listed in the photo ranking.
const TOP_PHOTOS: usize = 10;

/// Capacities outside `(0, 100)` are treated as parse noise.
const CAPACITY_CEILING: u64 = 100;

/// Locality: last word of the last comma-separated part of the address.
pub fn parse_locality(address: &str) -> String {
    if address == NOT_AVAILABLE {
        return "Unknown".to_string();
    }
    let last_part = address.rsplit(',').next().unwrap_or(address).trim();
    last_part
        .rsplit(' ')
        .next()
        .unwrap_or(last_part)
        .to_string()
}

fn capacity_regexes() -> &'static (Regex, Regex, Regex) {
    static RE: OnceLock<(Regex, Regex, Regex)> = OnceLock::new();
    RE.get_or_init(|| {
        (
            Regex::new(r"(?i)(\d+)\s+adulți").expect("adults regex is valid"),
            Regex::new(r"(?i)(\d+)\s+copii").expect("children regex is valid"),
            Regex::new(r"(\d+)").expect("number regex is valid"),
        )
    })
}

/// First captured number. Digit runs too long for `u64` saturate.
fn first_number(re: &Regex, text: &str) -> u64 {
    re.captures(text)
        .and_then(|c| c.get(1))
        .map(|m| m.as_str().parse().unwrap_or(u64::MAX))
        .unwrap_or(0)
}

/// Adults plus children, else the first number in the text, else 0.
pub fn parse_capacity(text: &str) -> u64 {
    let (adults_re, children_re, number_re) = capacity_regexes();
    let adults = first_number(adults_re, text);
    let children = first_number(children_re, text);
    if adults == 0 && children == 0 {
        return first_number(number_re, text);
    }
    adults.saturating_add(children)
}

pub fn parse_payment_method(text: &str) -> &'static str {
    let lower = text.to_lowercase();
    match (lower.contains("card"), lower.contains("numerar")) {
        (true, true) => "Card or Cash",
        (true, false) => "Card Only",
        (false, true) => "Cash Only",
        (false, false) => NOT_AVAILABLE,
    }
}

pub fn parse_children_policy(text: &str) -> &'static str {
    let lower = text.to_lowercase();
    if lower.contains("nu acceptăm copii") {
        "Children Not Accepted"
    } else if lower.contains("acceptăm copii") {
        "Children Accepted"
    } else {
        "Not specified"
    }
}

pub fn has_wifi(facilities: &str) -> bool {
    facilities.to_lowercase().contains("check wifi gratuit")
}

pub fn has_parking(facilities: &str) -> bool {
    facilities.to_lowercase().contains("check parcare")
}

/// count / mean / min / max over a sample.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Stats {
    pub count: usize,
    pub mean: f64,
    pub min: u64,
    pub max: u64,
}

impl Stats {
    fn of(values: &[u64]) -> Option<Self> {
        let min = *values.iter().min()?;
        let max = *values.iter().max()?;
        let sum = values.iter().fold(0u64, |acc, &v| acc.saturating_add(v));
        Some(Self {
            count: values.len(),
            mean: sum as f64 / values.len() as f64,
            min,
            max,
        })
    }
}

/// Share of listings with each amenity, in percent.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Amenities {
    pub phone: f64,
    pub wifi: f64,
    pub parking: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Summary {
    pub listings: usize,
    pub top_localities: Vec<(String, usize)>,
    pub payment_methods: Vec<(String, usize)>,
    pub children_policies: Vec<(String, usize)>,
    pub capacity: Option<Stats>,
    pub photos: Option<Stats>,
    pub top_photos: Vec<(String, usize)>,
    pub avg_capacity_by_locality: Vec<(String, f64)>,
    pub amenities: Amenities,
}

/// Counts sorted by frequency, ties broken by label.
fn ranked<'a>(labels: impl Iterator<Item = &'a str>) -> Vec<(String, usize)> {
    let mut counts: HashMap<&str, usize> = HashMap::new();
    for label in labels {
        *counts.entry(label).or_default() += 1;
    }
    let mut out: Vec<(String, usize)> = counts
        .into_iter()
        .map(|(k, v)| (k.to_string(), v))
        .collect();
    out.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
    out
}

fn percent(part: usize, whole: usize) -> f64 {
    if whole == 0 {
        0.0
    } else {
        part as f64 * 100.0 / whole as f64
    }
}

/// Summarize `records`, ranking the `top` most common localities.
pub fn summarize(records: &[ExtractionResult], top: usize) -> Summary {
    let localities: Vec<String> = records.iter().map(|r| parse_locality(&r.address)).collect();
    let capacities: Vec<u64> = records.iter().map(|r| parse_capacity(&r.capacity)).collect();

    let mut top_localities = ranked(localities.iter().map(String::as_str));
    top_localities.truncate(top);

    let plausible: Vec<u64> = capacities
        .iter()
        .copied()
        .filter(|&c| c > 0 && c < CAPACITY_CEILING)
        .collect();
    let photo_counts: Vec<u64> = records
        .iter()
        .map(|r| r.images.len() as u64)
        .filter(|&n| n > 0)
        .collect();

    let mut top_photos: Vec<(String, usize)> = records
        .iter()
        .map(|r| (r.property_name.clone(), r.images.len()))
        .collect();
    top_photos.sort_by(|a, b| b.1.cmp(&a.1));
    top_photos.truncate(TOP_PHOTOS);

    let mut avg_capacity_by_locality: Vec<(String, f64)> = top_localities
        .iter()
        .map(|(locality, count)| {
            let total: u64 = localities
                .iter()
                .zip(&capacities)
                .filter(|(l, _)| *l == locality)
                .fold(0u64, |acc, (_, &c)| acc.saturating_add(c));
            (locality.clone(), total as f64 / *count as f64)
        })
        .collect();
    avg_capacity_by_locality.sort_by(|a, b| b.1.total_cmp(&a.1));

    let n = records.len();
    Summary {
        listings: n,
        top_localities,
        payment_methods: ranked(records.iter().map(|r| parse_payment_method(&r.policy_payment))),
        children_policies: ranked(
            records
                .iter()
                .map(|r| parse_children_policy(&r.policy_children)),
        ),
        capacity: Stats::of(&plausible),
        photos: Stats::of(&photo_counts),
        top_photos,
        avg_capacity_by_locality,
        amenities: Amenities {
            phone: percent(records.iter().filter(|r| is_known(&r.phone_number)).count(), n),
            wifi: percent(records.iter().filter(|r| has_wifi(&r.facilities)).count(), n),
            parking: percent(records.iter().filter(|r| has_parking(&r.facilities)).count(), n),
        },
    }
}

/// Write the summary as plain text.
pub fn print_summary(summary: &Summary, console: &Console) {
    let out = |s: String| console.always(s);

    out(format!("Listings: {}", summary.listings));

    out(format!("\nTop {} localities:", summary.top_localities.len()));
    for (locality, count) in &summary.top_localities {
        out(format!("  {locality:<24} {count}"));
    }

    out("\nPayment methods:".to_string());
    for (method, count) in &summary.payment_methods {
        out(format!(
            "  {method:<24} {count} ({:.1}%)",
            percent(*count, summary.listings)
        ));
    }

    out("\nChildren policy:".to_string());
    for (policy, count) in &summary.children_policies {
        out(format!(
            "  {policy:<24} {count} ({:.1}%)",
            percent(*count, summary.listings)
        ));
    }

    match &summary.capacity {
        Some(s) => out(format!(
            "\nCapacity (1-99 persons): {} listings, mean {:.1}, min {}, max {}",
            s.count, s.mean, s.min, s.max
        )),
        None => out("\nCapacity: no parsable values".to_string()),
    }
    match &summary.photos {
        Some(s) => out(format!(
            "Photos: {} listings with photos, mean {:.1}, min {}, max {}",
            s.count, s.mean, s.min, s.max
        )),
        None => out("Photos: none".to_string()),
    }

    out("\nMost photos:".to_string());
    for (name, count) in &summary.top_photos {
        out(format!("  {count:>4}  {name}"));
    }

    out("\nAverage capacity by locality:".to_string());
    for (locality, avg) in &summary.avg_capacity_by_locality {
        out(format!("  {locality:<24} {avg:.1}"));
    }

    let a = &summary.amenities;
    out(format!(
        "\nAmenities: phone {:.1}% | free WiFi {:.1}% | parking {:.1}%",
        a.phone, a.wifi, a.parking
    ));
}

/// Load `input`, summarize, and print.
pub fn run_stats(input: &Path, top: usize, console: &Console) -> ScrapeResult<Summary> {
    let records = sink::read_results(input)?;
    let summary = summarize(&records, top);
    print_summary(&summary, console);
    Ok(summary)
}
