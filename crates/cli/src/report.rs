use callscreen_lookup::{CallerSummary, LookupResult, ScreenUpdate};
use callscreen_protocol::ErrorEnvelope;
use serde::Serialize;

/// JSON payload of `callscreen lookup --json`.
#[derive(Debug, Serialize)]
pub struct LookupReport {
    pub status: &'static str,
    pub number: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<LookupResult>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub summary: Option<CallerSummary>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fallback: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<ErrorEnvelope>,
}

pub fn caller_card(summary: &CallerSummary) -> String {
    let mut lines = vec![format!("{} ({})", summary.name, summary.phone_number)];
    let mut tags: Vec<&str> = Vec::new();
    if !summary.lead_type.is_empty() {
        tags.push(&summary.lead_type);
    }
    if !summary.status.is_empty() {
        tags.push(&summary.status);
    }
    if !tags.is_empty() {
        lines.push(tags.join(" · "));
    }
    lines.push(format!(
        "{} propert{}: {}",
        summary.property_count,
        if summary.property_count == 1 { "y" } else { "ies" },
        summary.primary_property
    ));
    lines.push(format!("Location: {}", summary.location_summary()));
    lines.push(format!("Price: {}", summary.price_summary()));
    lines.join("\n")
}

pub fn screen_line(update: &ScreenUpdate) -> String {
    match update {
        ScreenUpdate::Loading { number } => format!("Looking up {number}..."),
        ScreenUpdate::Caller { summary, .. } => caller_card(summary),
        ScreenUpdate::Fallback { message, .. } => message.clone(),
        ScreenUpdate::Hidden => "(screen hidden)".to_string(),
    }
}
