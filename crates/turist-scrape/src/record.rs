//! Fixed-shape records flowing through the pipeline.

use serde::{Deserialize, Serialize};

/// Canonical "no data available" marker for textual fields.
pub const NOT_AVAILABLE: &str = "N/A";

/// One listing's detail page, tagged with its position in the seed artifact.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Target {
    /// 1-based position in the seed artifact.
    pub index: usize,
    /// Number of entries in the seed artifact.
    pub total: usize,
    pub url: String,
}

impl Target {
    pub fn new(index: usize, total: usize, url: impl Into<String>) -> Self {
        Self {
            index,
            total,
            url: url.into(),
        }
    }

    /// `[3/120]` progress prefix.
    pub fn tag(&self) -> String {
        format!("[{}/{}]", self.index, self.total)
    }
}

/// Deep-scrape result for one property page.
///
/// Every textual field is either trimmed, non-empty text or exactly
/// [`NOT_AVAILABLE`]; `images` is empty when nothing was found.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExtractionResult {
    pub url: String,
    pub property_name: String,
    pub address: String,
    pub phone_number: String,
    pub full_description: String,
    pub capacity: String,
    pub images: Vec<String>,
    #[serde(rename = "politici_copii")]
    pub policy_children: String,
    #[serde(rename = "politici_mese")]
    pub policy_meals: String,
    #[serde(rename = "politici_rezervari")]
    pub policy_reservation: String,
    #[serde(rename = "politici_plata")]
    pub policy_payment: String,
    pub facilities: String,
}

impl ExtractionResult {
    /// The all-default record for `url`.
    pub fn new(url: impl Into<String>) -> Self {
        let na = || NOT_AVAILABLE.to_string();
        Self {
            url: url.into(),
            property_name: na(),
            address: na(),
            phone_number: na(),
            full_description: na(),
            capacity: na(),
            images: Vec::new(),
            policy_children: na(),
            policy_meals: na(),
            policy_reservation: na(),
            policy_payment: na(),
            facilities: na(),
        }
    }

    /// The sentinel-able text fields, `url` excluded.
    pub fn text_fields(&self) -> [(&'static str, &str); 10] {
        [
            ("property_name", &self.property_name),
            ("address", &self.address),
            ("phone_number", &self.phone_number),
            ("full_description", &self.full_description),
            ("capacity", &self.capacity),
            ("politici_copii", &self.policy_children),
            ("politici_mese", &self.policy_meals),
            ("politici_rezervari", &self.policy_reservation),
            ("politici_plata", &self.policy_payment),
            ("facilities", &self.facilities),
        ]
    }

    /// Number of text fields holding real data.
    pub fn fields_found(&self) -> usize {
        self.text_fields()
            .iter()
            .filter(|(_, v)| *v != NOT_AVAILABLE)
            .count()
    }

    /// Whether the critical name field was found.
    pub fn has_name(&self) -> bool {
        self.property_name != NOT_AVAILABLE
    }

    /// Whether every field is at its default.
    pub fn is_default(&self) -> bool {
        self.fields_found() == 0 && self.images.is_empty()
    }
}

/// Whether `value` is real data rather than the sentinel.
pub fn is_known(value: &str) -> bool {
    value != NOT_AVAILABLE
}

/// One entry of the seed artifact produced by the listing crawl.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SeedListing {
    pub name: String,
    pub star_rating: String,
    pub address: String,
    pub reviews: String,
    pub capacity: String,
    pub description: String,
    pub price: String,
    pub image_url: String,
    pub details_url: String,
}

impl Default for SeedListing {
    fn default() -> Self {
        let na = || NOT_AVAILABLE.to_string();
        Self {
            name: na(),
            star_rating: na(),
            address: na(),
            reviews: na(),
            capacity: na(),
            description: na(),
            price: na(),
            image_url: na(),
            details_url: na(),
        }
    }
}
