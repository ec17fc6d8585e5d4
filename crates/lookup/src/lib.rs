//! # Callscreen Lookup
//!
//! Resolves an incoming caller's phone number to a lead and its property listings.
//!
//! ## Architecture
//!
//! ```text
//! PhoneState (ringing / idle)
//!     │
//!     ├──> Number Normalizer
//!     │      ├─ strip punctuation and country code (91 / 1 / 44)
//!     │      └─ lookup variants (prefixed, dashed, spaced, parenthesised, raw)
//!     │
//!     ├──> CallerLookup
//!     │      ├─ leads: first variant match wins
//!     │      └─ Residential + Commercial + Plots, queried concurrently, merged in order
//!     │
//!     └──> ScreeningSession
//!            ├─ ScreenUpdate channel (loading / caller / fallback / hidden)
//!            └─ CompanionSink (call lifecycle and screen actions)
//! ```
//!
//! ## Example
//!
//! ```no_run
//! use callscreen_lookup::{summarize, CallerLookup};
//! use callscreen_store::MemoryStore;
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let store = MemoryStore::load("fixture.json").await?;
//!     let lookup = CallerLookup::new(Arc::new(store));
//!
//!     let result = lookup.lookup("+91 98765 43210").await?;
//!     match summarize(&result) {
//!         Some(summary) => println!("{} ({})", summary.name, summary.price_summary()),
//!         None => println!("Unknown caller"),
//!     }
//!
//!     Ok(())
//! }
//! ```

mod access;
mod error;
mod model;
mod number;
mod resolver;
mod session;
mod summary;

pub use access::{AccessPolicy, Principal, ADMIN_PERMISSION, READ_LEADS_PERMISSION};
pub use error::{LookupError, Result};
pub use model::{
    LeadRecord, LeadStatus, LookupResult, PropertyCategory, PropertyRecord, LEADS_COLLECTION,
};
pub use number::{format_dashed, format_display, normalize, variants, CanonicalNumber};
pub use resolver::CallerLookup;
pub use session::{
    ChannelSink, CompanionSink, NullSink, ScreenUpdate, ScreeningSession, SinkError,
};
pub use summary::{
    fallback_message, price_bucket, summarize, CallerSummary, NO_LOCATION, NO_PRICE,
    NO_PROPERTIES,
};
