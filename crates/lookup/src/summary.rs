use crate::model::{LookupResult, PropertyRecord};
use crate::number::format_display;
use serde::{Deserialize, Serialize};

pub const NO_PROPERTIES: &str = "No properties";
pub const NO_LOCATION: &str = "Location not specified";
pub const NO_PRICE: &str = "Price on request";

const SUMMARY_LIMIT: usize = 2;

const CRORE: f64 = 10_000_000.0;
const LAKH: f64 = 100_000.0;
const THOUSAND: f64 = 1_000.0;

/// Display-ready view of a known caller.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CallerSummary {
    pub lead_id: String,
    pub name: String,
    pub phone_number: String,
    pub lead_type: String,
    pub status: String,
    pub property_count: usize,
    pub primary_property: String,
    pub locations: Vec<String>,
    pub prices: Vec<String>,
}

impl CallerSummary {
    #[must_use]
    pub fn location_summary(&self) -> String {
        if self.locations.is_empty() {
            NO_LOCATION.to_string()
        } else {
            self.locations.join(", ")
        }
    }

    #[must_use]
    pub fn price_summary(&self) -> String {
        if self.prices.is_empty() {
            NO_PRICE.to_string()
        } else {
            self.prices.join(", ")
        }
    }
}

/// Summary for a known caller, `None` for an unknown one.
#[must_use]
pub fn summarize(result: &LookupResult) -> Option<CallerSummary> {
    let lead = result.lead.as_ref()?;
    let properties = &result.properties;

    Some(CallerSummary {
        lead_id: lead.id.clone(),
        name: lead.name.clone(),
        phone_number: format_display(&lead.phone_number),
        lead_type: lead.lead_type.clone(),
        status: lead.status.to_string(),
        property_count: properties.len(),
        primary_property: properties
            .first()
            .map_or_else(|| NO_PROPERTIES.to_string(), |p| p.property_for.clone()),
        locations: distinct_limited(properties.iter().filter_map(location_token)),
        prices: distinct_limited(
            properties
                .iter()
                .filter_map(|p| p.asking_price.as_deref())
                .filter_map(price_bucket),
        ),
    })
}

/// Message shown when the caller is unknown or the lookup failed.
#[must_use]
pub fn fallback_message(number: &str) -> String {
    format!("Incoming call: {number}")
}

/// First word of the first comma-separated part of a listing's location.
fn location_token(property: &PropertyRecord) -> Option<String> {
    let location = property.location.as_deref()?;
    let first_part = location.split(',').next().unwrap_or_default().trim();
    let token = first_part.split(' ').next().unwrap_or_default();
    (!token.is_empty()).then(|| token.to_string())
}

fn distinct_limited(items: impl Iterator<Item = String>) -> Vec<String> {
    let mut out: Vec<String> = Vec::with_capacity(SUMMARY_LIMIT);
    for item in items {
        if out.len() == SUMMARY_LIMIT {
            break;
        }
        if !out.contains(&item) {
            out.push(item);
        }
    }
    out
}

/// Buckets an asking price into crore / lakh / thousand labels.
///
/// Everything except digits and `.` is stripped before parsing, and the bucket
/// value is truncated. Unparseable prices are returned verbatim; empty ones yield `None`.
#[must_use]
pub fn price_bucket(price: &str) -> Option<String> {
    if price.is_empty() {
        return None;
    }

    let numeric: String = price
        .chars()
        .filter(|c| c.is_ascii_digit() || *c == '.')
        .collect();
    let Ok(value) = numeric.parse::<f64>() else {
        return Some(price.to_string());
    };

    let label = if value >= CRORE {
        format!("₹{}Cr", truncate(value / CRORE))
    } else if value >= LAKH {
        format!("₹{}L", truncate(value / LAKH))
    } else if value >= THOUSAND {
        format!("₹{}K", truncate(value / THOUSAND))
    } else {
        format!("₹{}", truncate(value))
    };
    Some(label)
}

#[allow(clippy::cast_possible_truncation)]
fn truncate(value: f64) -> i64 {
    value.trunc() as i64
}
