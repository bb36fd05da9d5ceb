//! # GridRent API
//!
//! HTTP client for the GridRent marketplace backend, plus the `Marketplace`
//! facade that combines remote calls with the pure catalog and pricing logic
//! from `gridrent-core`.

pub mod client;
pub mod errors;
pub mod sdk;

// Re-export common types for convenience
pub use client::*;
pub use errors::*;
pub use sdk::*;

// Re-export core types that API consumers will need
pub use gridrent_core::{FilterCriteria, Job, JobRequest, Listing, Page, Result as CoreResult};
