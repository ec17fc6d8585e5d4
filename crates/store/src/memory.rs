use crate::document::{Document, Filter};
use crate::error::{Result, StoreError};
use crate::store::DocumentStore;
use async_trait::async_trait;
use serde_json::Value;
use std::collections::HashMap;
use std::path::Path;

/// In-process collections, loadable from a JSON fixture of the form
/// `{ "<collection>": [ { "id": "...", ...fields } ] }`.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    collections: HashMap<String, Vec<Document>>,
}

impl MemoryStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, collection: impl Into<String>, doc: Document) {
        self.collections
            .entry(collection.into())
            .or_default()
            .push(doc);
    }

    #[must_use]
    pub fn with_document(mut self, collection: impl Into<String>, doc: Document) -> Self {
        self.insert(collection, doc);
        self
    }

    pub fn from_json_str(raw: &str) -> Result<Self> {
        let root: HashMap<String, Vec<Value>> = serde_json::from_str(raw)?;
        let mut store = Self::new();
        for (collection, items) in root {
            for (idx, item) in items.into_iter().enumerate() {
                let id = item
                    .get("id")
                    .and_then(Value::as_str)
                    .map(str::to_string)
                    .unwrap_or_else(|| format!("{collection}-{idx}"));
                let Some(mut doc) = Document::from_value(id, item) else {
                    return Err(StoreError::Decode(format!(
                        "fixture collection '{collection}' item {idx} is not an object"
                    )));
                };
                doc.fields.remove("id");
                store.insert(collection.clone(), doc);
            }
        }
        Ok(store)
    }

    /// Load a fixture from disk
    pub async fn load(path: impl AsRef<Path>) -> Result<Self> {
        log::info!("Loading MemoryStore fixture from {:?}", path.as_ref());
        let raw = tokio::fs::read_to_string(&path).await?;
        let store = Self::from_json_str(&raw)?;
        log::info!(
            "Loaded {} documents across {} collections",
            store.len(),
            store.collections.len()
        );
        Ok(store)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.collections.values().map(Vec::len).sum()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[async_trait]
impl DocumentStore for MemoryStore {
    fn name(&self) -> &str {
        "memory"
    }

    async fn find_one(
        &self,
        collection: &str,
        field: &str,
        value: &str,
    ) -> Result<Option<Document>> {
        let filter = Filter::eq(field, value);
        Ok(self
            .collections
            .get(collection)
            .and_then(|docs| docs.iter().find(|doc| filter.matches(doc)))
            .cloned())
    }

    async fn find_many(&self, collection: &str, filters: &[Filter]) -> Result<Vec<Document>> {
        Ok(self
            .collections
            .get(collection)
            .map(|docs| {
                docs.iter()
                    .filter(|doc| filters.iter().all(|f| f.matches(doc)))
                    .cloned()
                    .collect()
            })
            .unwrap_or_default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use tempfile::TempDir;

    const FIXTURE: &str = r#"{
        "leads": [
            {"id": "L1", "name": "Asha", "phoneNumber": "9876543210", "status": "Active"},
            {"name": "No Id", "phoneNumber": "1112223333"}
        ],
        "Residential": [
            {"id": "R1", "leadId": "L1", "status": "Active"},
            {"id": "R2", "leadId": "L1", "status": "Inactive"},
            {"id": "R3", "leadId": "L2", "status": "Active"}
        ]
    }"#;

    #[tokio::test]
    async fn find_one_returns_first_match() {
        let store = MemoryStore::from_json_str(FIXTURE).unwrap();
        let doc = store
            .find_one("leads", "phoneNumber", "9876543210")
            .await
            .unwrap()
            .expect("lead");
        assert_eq!(doc.id, "L1");
        assert!(doc.get("id").is_none());

        let missing = store
            .find_one("leads", "phoneNumber", "0000000000")
            .await
            .unwrap();
        assert!(missing.is_none());
    }

    #[tokio::test]
    async fn fixture_items_without_id_get_positional_ids() {
        let store = MemoryStore::from_json_str(FIXTURE).unwrap();
        let doc = store
            .find_one("leads", "phoneNumber", "1112223333")
            .await
            .unwrap()
            .expect("lead");
        assert_eq!(doc.id, "leads-1");
    }

    #[tokio::test]
    async fn find_many_applies_all_filters_in_store_order() {
        let store = MemoryStore::from_json_str(FIXTURE).unwrap();
        let docs = store
            .find_many(
                "Residential",
                &[Filter::eq("leadId", "L1"), Filter::not_eq("status", "Inactive")],
            )
            .await
            .unwrap();
        let ids: Vec<&str> = docs.iter().map(|d| d.id.as_str()).collect();
        assert_eq!(ids, vec!["R1"]);

        let none = store.find_many("Plots", &[]).await.unwrap();
        assert!(none.is_empty());
    }

    #[tokio::test]
    async fn load_reads_fixture_file() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("fixture.json");
        tokio::fs::write(&path, FIXTURE).await.unwrap();

        let store = MemoryStore::load(&path).await.unwrap();
        assert_eq!(store.len(), 5);
    }

    #[test]
    fn rejects_non_object_items() {
        let err = MemoryStore::from_json_str(r#"{"leads": [42]}"#).unwrap_err();
        assert!(matches!(err, StoreError::Decode(_)));
    }
}
