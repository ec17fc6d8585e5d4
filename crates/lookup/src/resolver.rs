use crate::access::AccessPolicy;
use crate::error::Result;
use crate::model::{
    LeadRecord, LookupResult, PropertyCategory, PropertyRecord, INACTIVE_STATUS,
    LEADS_COLLECTION, LEAD_PHONE_FIELD, PROPERTY_LEAD_FIELD, STATUS_FIELD,
};
use crate::number::{normalize, variants};
use callscreen_store::{DocumentStore, Filter};
use std::sync::Arc;

/// Resolves a phone number to a lead and the lead's active listings.
///
/// Only the lead query can fail the lookup. Property sub-queries that fail are
/// logged and contribute nothing, so partial results are normal.
#[derive(Clone)]
pub struct CallerLookup {
    store: Arc<dyn DocumentStore>,
    access: AccessPolicy,
}

impl CallerLookup {
    pub fn new(store: Arc<dyn DocumentStore>) -> Self {
        Self {
            store,
            access: AccessPolicy::Open,
        }
    }

    #[must_use]
    pub fn with_access(mut self, access: AccessPolicy) -> Self {
        self.access = access;
        self
    }

    pub async fn lookup(&self, raw: &str) -> Result<LookupResult> {
        self.access.check()?;

        let canonical = normalize(raw);
        log::debug!("Fetching lead data for phone number: {canonical}");

        let Some(lead) = self.find_lead(raw).await? else {
            log::debug!("No lead found for phone number: {canonical}");
            return Ok(LookupResult::unknown());
        };
        log::debug!("Found lead: {} (ID: {})", lead.name, lead.id);
        if let Some(uid) = self.access.principal_uid() {
            log::info!("User {uid} accessed lead data for phone: {canonical}");
        }

        let properties = self.fetch_properties(&lead.id).await;
        log::debug!(
            "Found {} properties for lead: {}",
            properties.len(),
            lead.name
        );

        Ok(LookupResult {
            lead: Some(lead),
            properties,
        })
    }

    async fn find_lead(&self, raw: &str) -> Result<Option<LeadRecord>> {
        let candidates = variants(raw);
        log::debug!("Searching for phone number variations: {candidates:?}");

        for candidate in &candidates {
            let found = self
                .store
                .find_one(LEADS_COLLECTION, LEAD_PHONE_FIELD, candidate)
                .await?;
            if let Some(doc) = found {
                return Ok(Some(LeadRecord::from_document(&doc)));
            }
        }
        Ok(None)
    }

    /// Queries the three listing collections concurrently and concatenates them
    /// in `PropertyCategory::ALL` order.
    async fn fetch_properties(&self, lead_id: &str) -> Vec<PropertyRecord> {
        let [residential, commercial, land] = PropertyCategory::ALL;
        let (residential, commercial, land) = tokio::join!(
            self.fetch_category(residential, lead_id),
            self.fetch_category(commercial, lead_id),
            self.fetch_category(land, lead_id),
        );

        let mut merged = residential;
        merged.extend(commercial);
        merged.extend(land);
        log::debug!(
            "Total properties fetched for leadId {lead_id}: {}",
            merged.len()
        );
        merged
    }

    async fn fetch_category(
        &self,
        category: PropertyCategory,
        lead_id: &str,
    ) -> Vec<PropertyRecord> {
        let filters = [
            Filter::eq(PROPERTY_LEAD_FIELD, lead_id),
            Filter::not_eq(STATUS_FIELD, INACTIVE_STATUS),
        ];
        match self.store.find_many(category.collection(), &filters).await {
            Ok(docs) => docs
                .iter()
                .map(|doc| PropertyRecord::from_document(doc, category))
                .collect(),
            Err(err) => {
                log::warn!("Error fetching {category} properties for lead {lead_id}: {err}");
                Vec::new()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::access::Principal;
    use crate::error::LookupError;
    use async_trait::async_trait;
    use callscreen_store::{Document, MemoryStore, StoreError};
    use pretty_assertions::assert_eq;
    use serde_json::json;
    use std::collections::HashSet;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Wraps a store and fails every query against the listed collections.
    struct FlakyStore {
        inner: MemoryStore,
        failing: HashSet<&'static str>,
        calls: AtomicUsize,
    }

    impl FlakyStore {
        fn new(inner: MemoryStore, failing: &[&'static str]) -> Self {
            Self {
                inner,
                failing: failing.iter().copied().collect(),
                calls: AtomicUsize::new(0),
            }
        }

        fn check(&self, collection: &str) -> callscreen_store::Result<()> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if self.failing.contains(collection) {
                return Err(StoreError::Unavailable(collection.to_string()));
            }
            Ok(())
        }
    }

    #[async_trait]
    impl DocumentStore for FlakyStore {
        fn name(&self) -> &str {
            "flaky"
        }

        async fn find_one(
            &self,
            collection: &str,
            field: &str,
            value: &str,
        ) -> callscreen_store::Result<Option<Document>> {
            self.check(collection)?;
            self.inner.find_one(collection, field, value).await
        }

        async fn find_many(
            &self,
            collection: &str,
            filters: &[Filter],
        ) -> callscreen_store::Result<Vec<Document>> {
            self.check(collection)?;
            self.inner.find_many(collection, filters).await
        }
    }

    fn doc(id: &str, value: serde_json::Value) -> Document {
        Document::from_value(id, value).unwrap()
    }

    fn fixture() -> MemoryStore {
        MemoryStore::new()
            .with_document(
                "leads",
                doc(
                    "L1",
                    json!({"name": "Asha", "phoneNumber": "9876543210", "status": "Active", "leadType": "Buyer"}),
                ),
            )
            .with_document(
                "leads",
                doc("L2", json!({"name": "Ravi", "phoneNumber": "(415) 555-1212"})),
            )
            .with_document(
                "Residential",
                doc("R1", json!({"leadId": "L1", "status": "Active", "propertyFor": "Sale"})),
            )
            .with_document(
                "Residential",
                doc("R0", json!({"leadId": "L1", "status": "Inactive", "propertyFor": "Rent"})),
            )
            .with_document(
                "Commercial",
                doc("C1", json!({"leadId": "L1", "status": "Active", "propertyFor": "Lease"})),
            )
            .with_document(
                "Plots",
                doc("P9", json!({"leadId": "L2", "status": "Active", "propertyFor": "Sale"})),
            )
    }

    fn ids(result: &LookupResult) -> Vec<&str> {
        result.properties.iter().map(|p| p.id.as_str()).collect()
    }

    #[tokio::test]
    async fn unknown_number_yields_no_lead() {
        let lookup = CallerLookup::new(Arc::new(fixture()));
        let result = lookup.lookup("+91 90000 00000").await.unwrap();
        assert!(result.is_unknown());
        assert!(result.properties.is_empty());
    }

    #[tokio::test]
    async fn merges_categories_in_fixed_order() {
        let lookup = CallerLookup::new(Arc::new(fixture()));
        let result = lookup.lookup("+91 98765 43210").await.unwrap();
        assert_eq!(result.lead.as_ref().map(|l| l.id.as_str()), Some("L1"));
        assert_eq!(ids(&result), vec!["R1", "C1"]);
        assert_eq!(result.properties[1].category, PropertyCategory::Commercial);
    }

    #[tokio::test]
    async fn matches_formatted_stored_numbers() {
        let lookup = CallerLookup::new(Arc::new(fixture()));
        let result = lookup.lookup("+1 415 555 1212").await.unwrap();
        assert_eq!(result.lead.as_ref().map(|l| l.name.as_str()), Some("Ravi"));
        assert_eq!(ids(&result), vec!["P9"]);
    }

    #[tokio::test]
    async fn failing_sub_store_does_not_hide_others() {
        let store = fixture().with_document(
            "Plots",
            doc("P1", json!({"leadId": "L1", "status": "Active"})),
        );
        let lookup = CallerLookup::new(Arc::new(FlakyStore::new(store, &["Commercial"])));
        let result = lookup.lookup("9876543210").await.unwrap();
        assert_eq!(ids(&result), vec!["R1", "P1"]);
    }

    #[tokio::test]
    async fn lead_store_failure_is_transient() {
        let lookup = CallerLookup::new(Arc::new(FlakyStore::new(fixture(), &["leads"])));
        let err = lookup.lookup("9876543210").await.unwrap_err();
        assert!(matches!(err, LookupError::Transient(_)));
    }

    #[tokio::test]
    async fn denied_access_never_touches_the_store() {
        let store = Arc::new(FlakyStore::new(fixture(), &[]));
        let lookup = CallerLookup::new(store.clone()).with_access(AccessPolicy::Principal(None));
        let err = lookup.lookup("9876543210").await.unwrap_err();
        assert!(matches!(err, LookupError::AccessDenied(_)));
        assert_eq!(store.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn permitted_principal_reads_leads() {
        let lookup = CallerLookup::new(Arc::new(fixture())).with_access(AccessPolicy::Principal(
            Some(Principal {
                uid: "agent-7".to_string(),
                permissions: vec!["read_leads".to_string()],
                ..Principal::default()
            }),
        ));
        let result = lookup.lookup("9876543210").await.unwrap();
        assert!(!result.is_unknown());
    }
}
