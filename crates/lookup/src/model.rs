use callscreen_store::Document;
use serde::{Deserialize, Serialize};
use std::fmt;

pub const LEADS_COLLECTION: &str = "leads";
pub const LEAD_PHONE_FIELD: &str = "phoneNumber";
pub const PROPERTY_LEAD_FIELD: &str = "leadId";
pub const STATUS_FIELD: &str = "status";
pub const INACTIVE_STATUS: &str = "Inactive";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum LeadStatus {
    Active,
    Inactive,
    Other(String),
}

impl LeadStatus {
    #[must_use]
    pub fn as_str(&self) -> &str {
        match self {
            Self::Active => "Active",
            Self::Inactive => INACTIVE_STATUS,
            Self::Other(raw) => raw,
        }
    }
}

impl From<&str> for LeadStatus {
    fn from(raw: &str) -> Self {
        match raw {
            "Active" => Self::Active,
            INACTIVE_STATUS => Self::Inactive,
            other => Self::Other(other.to_string()),
        }
    }
}

impl From<String> for LeadStatus {
    fn from(raw: String) -> Self {
        Self::from(raw.as_str())
    }
}

impl From<LeadStatus> for String {
    fn from(status: LeadStatus) -> Self {
        status.as_str().to_string()
    }
}

impl fmt::Display for LeadStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A prospective client, keyed by phone number.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LeadRecord {
    pub id: String,
    pub name: String,
    pub lead_type: String,
    pub status: LeadStatus,
    pub phone_number: String,
    pub created_at: Option<i64>,
    pub updated_at: Option<i64>,
}

impl LeadRecord {
    /// Reads a lead document; missing string fields become empty.
    #[must_use]
    pub fn from_document(doc: &Document) -> Self {
        Self {
            id: doc.id.clone(),
            name: doc.string_or_default("name"),
            lead_type: doc.string_or_default("leadType"),
            status: LeadStatus::from(doc.str_field(STATUS_FIELD).unwrap_or_default()),
            phone_number: doc.string_or_default(LEAD_PHONE_FIELD),
            created_at: doc.i64_field("createdAt"),
            updated_at: doc.i64_field("updatedAt"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PropertyCategory {
    Residential,
    Commercial,
    Land,
}

impl PropertyCategory {
    /// Merge order of property sub-queries.
    pub const ALL: [Self; 3] = [Self::Residential, Self::Commercial, Self::Land];

    /// Store collection holding listings of this category.
    #[must_use]
    pub const fn collection(self) -> &'static str {
        match self {
            Self::Residential => "Residential",
            Self::Commercial => "Commercial",
            Self::Land => "Plots",
        }
    }

    /// Category-specific sub-type field.
    const fn sub_type_field(self) -> &'static str {
        match self {
            Self::Residential => "propertyType",
            Self::Commercial | Self::Land => "propertySubType",
        }
    }
}

impl fmt::Display for PropertyCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Residential => "Residential",
            Self::Commercial => "Commercial",
            Self::Land => "Land",
        })
    }
}

/// A real-estate listing attached to a lead.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PropertyRecord {
    pub id: String,
    pub lead_id: String,
    pub category: PropertyCategory,
    pub property_for: String,
    pub location: Option<String>,
    pub asking_price: Option<String>,
    pub status: String,
    pub sub_type: Option<String>,
}

impl PropertyRecord {
    #[must_use]
    pub fn from_document(doc: &Document, category: PropertyCategory) -> Self {
        Self {
            id: doc.id.clone(),
            lead_id: doc.string_or_default(PROPERTY_LEAD_FIELD),
            category,
            property_for: doc.string_or_default("propertyFor"),
            location: doc.str_field("location").map(str::to_string),
            asking_price: doc.str_field("askingPrice").map(str::to_string),
            status: doc.string_or_default(STATUS_FIELD),
            sub_type: doc
                .str_field(category.sub_type_field())
                .map(str::to_string),
        }
    }
}

/// Outcome of a caller lookup. No lead means the caller is unknown.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LookupResult {
    pub lead: Option<LeadRecord>,
    pub properties: Vec<PropertyRecord>,
}

impl LookupResult {
    #[must_use]
    pub fn unknown() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn is_unknown(&self) -> bool {
        self.lead.is_none()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    #[test]
    fn lead_reads_lenient_fields() {
        let doc = Document::from_value(
            "L1",
            json!({"name": "Asha", "status": "Active", "createdAt": 5, "leadType": 3}),
        )
        .unwrap();
        let lead = LeadRecord::from_document(&doc);
        assert_eq!(lead.id, "L1");
        assert_eq!(lead.name, "Asha");
        assert_eq!(lead.lead_type, "");
        assert_eq!(lead.status, LeadStatus::Active);
        assert_eq!(lead.phone_number, "");
        assert_eq!(lead.created_at, Some(5));
        assert_eq!(lead.updated_at, None);
    }

    #[test]
    fn status_keeps_unknown_values() {
        assert_eq!(LeadStatus::from("Hot"), LeadStatus::Other("Hot".to_string()));
        assert_eq!(LeadStatus::from("Inactive"), LeadStatus::Inactive);
        assert_eq!(
            serde_json::to_value(LeadStatus::Other("Hot".to_string())).unwrap(),
            json!("Hot")
        );
    }

    #[test]
    fn land_listings_live_in_plots() {
        assert_eq!(PropertyCategory::Land.collection(), "Plots");
        let doc = Document::from_value(
            "P1",
            json!({"leadId": "L1", "propertyFor": "Sale", "propertySubType": "Farm", "askingPrice": "500000"}),
        )
        .unwrap();
        let record = PropertyRecord::from_document(&doc, PropertyCategory::Land);
        assert_eq!(record.category, PropertyCategory::Land);
        assert_eq!(record.sub_type.as_deref(), Some("Farm"));
        assert_eq!(record.asking_price.as_deref(), Some("500000"));
        assert_eq!(record.location, None);
    }
}
