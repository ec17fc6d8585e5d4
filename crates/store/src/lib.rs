//! # Callscreen Store
//!
//! Read-only document access for caller lookups.
//!
//! ## Backends
//!
//! - **`MemoryStore`**: in-process collections, loadable from a JSON fixture
//! - **`FirestoreStore`**: Firestore REST `runQuery` with structured filters
//!
//! ## Example
//!
//! ```no_run
//! use callscreen_store::{DocumentStore, Filter, MemoryStore};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let store = MemoryStore::load("fixture.json").await?;
//!
//!     if let Some(lead) = store.find_one("leads", "phoneNumber", "9876543210").await? {
//!         let homes = store
//!             .find_many("Residential", &[Filter::eq("leadId", lead.id.as_str())])
//!             .await?;
//!         println!("{}: {} residential listings", lead.id, homes.len());
//!     }
//!
//!     Ok(())
//! }
//! ```

mod document;
mod error;
mod firestore;
mod memory;
mod store;

pub use document::{Document, Filter, FilterOp};
pub use error::{Result, StoreError};
pub use firestore::{
    decode_run_query_response, structured_query, FirestoreConfig, FirestoreStore,
    DEFAULT_BASE_URL, DEFAULT_DATABASE,
};
pub use memory::MemoryStore;
pub use store::DocumentStore;
