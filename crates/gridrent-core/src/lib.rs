//! # GridRent Core
//!
//! Core domain logic for the GridRent GPU rental marketplace.
//!
//! This crate contains pure business logic with no I/O dependencies:
//! - Domain models (listings, job requests, jobs, provider stats)
//! - Error definitions
//! - Catalog filtering and sorting
//! - Tiered cost estimation and earnings projection
//! - Submission validation
//!
//! Every function here is synchronous and free of shared state, so it can be
//! called from any thread or task without coordination.

pub mod catalog;
pub mod errors;
pub mod models;
pub mod pricing;
pub mod validation;

// Re-export commonly used types
pub use catalog::{
    filter_listings, group_by_model, sort_listings, summarize_by_model, FilterCriteria,
    ModelSummary, SortDirection, SortKey,
};
pub use errors::{GridRentError, Result};
pub use models::{
    AvailabilityState, DataDescriptor, InputKind, Job, JobRequest, JobStatus, Listing,
    ListingDraft, ListingLocation, ListingSpecs, Owner, Page, PerformanceRecord, Pricing,
    ProviderStats, RentalWindow, ResourceRequirement,
};
pub use pricing::{
    calculate_earnings, estimate_cost, CostEstimate, EarningsProjection, RateTier, TierSchedule,
    DEFAULT_UTILIZATION_HOURS,
};
pub use validation::validate_docker_image;
