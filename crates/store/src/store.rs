use crate::document::{Document, Filter};
use crate::error::Result;
use async_trait::async_trait;
use std::sync::Arc;

/// Read-only query capability over named document collections.
#[async_trait]
pub trait DocumentStore: Send + Sync {
    /// Human-readable backend name, used in logs.
    fn name(&self) -> &str;

    /// First document in `collection` whose `field` equals `value`.
    async fn find_one(&self, collection: &str, field: &str, value: &str)
        -> Result<Option<Document>>;

    /// All documents in `collection` matching every filter, in store order.
    async fn find_many(&self, collection: &str, filters: &[Filter]) -> Result<Vec<Document>>;
}

#[async_trait]
impl<T: DocumentStore + ?Sized> DocumentStore for Arc<T> {
    fn name(&self) -> &str {
        (**self).name()
    }

    async fn find_one(
        &self,
        collection: &str,
        field: &str,
        value: &str,
    ) -> Result<Option<Document>> {
        (**self).find_one(collection, field, value).await
    }

    async fn find_many(&self, collection: &str, filters: &[Filter]) -> Result<Vec<Document>> {
        (**self).find_many(collection, filters).await
    }
}
