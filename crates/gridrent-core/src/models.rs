use crate::errors::{GridRentError, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Availability of a listing. Exactly one value at a time.
#[derive(Debug, Deserialize, Serialize, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[serde(rename_all = "lowercase")]
pub enum AvailabilityState {
    Online,
    Offline,
    Busy,
    Maintenance,
}

impl AvailabilityState {
    pub const ALL: [AvailabilityState; 4] = [
        AvailabilityState::Online,
        AvailabilityState::Offline,
        AvailabilityState::Busy,
        AvailabilityState::Maintenance,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            AvailabilityState::Online => "online",
            AvailabilityState::Offline => "offline",
            AvailabilityState::Busy => "busy",
            AvailabilityState::Maintenance => "maintenance",
        }
    }

    /// Whether a renter can book the listing right now
    pub fn is_rentable(&self) -> bool {
        matches!(self, AvailabilityState::Online)
    }
}

impl fmt::Display for AvailabilityState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AvailabilityState {
    type Err = GridRentError;

    fn from_str(s: &str) -> Result<Self> {
        let needle = s.trim().to_ascii_lowercase();
        AvailabilityState::ALL
            .into_iter()
            .find(|state| state.as_str() == needle)
            .ok_or_else(|| {
                GridRentError::InvalidInput(format!(
                    "Unknown availability state '{}'. Expected one of: online, offline, busy, maintenance",
                    s
                ))
            })
    }
}

#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct ListingSpecs {
    /// Hardware model label, e.g. "RTX 4090"
    pub model: String,
    #[serde(rename = "vram")]
    pub vram_gb: f64,
    pub cores: u32,
    #[serde(rename = "memory")]
    pub memory_gb: f64,
    #[serde(rename = "storage")]
    pub storage_gb: f64,
}

#[derive(Debug, Deserialize, Serialize, Clone, PartialEq, Default)]
pub struct ListingLocation {
    pub country: String,
    pub city: String,
    pub region: String,
}

impl ListingLocation {
    pub fn fields(&self) -> [&str; 3] {
        [&self.country, &self.city, &self.region]
    }
}

#[derive(Debug, Deserialize, Serialize, Clone, PartialEq, Default)]
#[serde(rename_all = "camelCase")]
pub struct PerformanceRecord {
    /// Uptime percentage in [0, 100]
    pub uptime: f64,
    /// Mean response latency in milliseconds
    pub avg_response_time: f64,
    pub completed_jobs: u64,
    /// Quality rating in [0, 5]
    pub rating: f64,
}

#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Pricing {
    pub price_per_hour: f64,
    #[serde(default = "default_currency")]
    pub currency: String,
}

pub fn default_currency() -> String {
    "USD".to_string()
}

#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Owner {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub wallet_address: String,
    #[serde(default)]
    pub reputation: f64,
}

/// Allowed rental duration, in hours
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct RentalWindow {
    pub max_duration: f64,
    pub min_duration: f64,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub scheduled_downtime: Vec<DateTime<Utc>>,
}

/// A provider's advertised rentable GPU
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct Listing {
    pub id: String,
    pub name: String,
    pub specs: ListingSpecs,
    pub location: ListingLocation,
    pub performance: PerformanceRecord,
    pub pricing: Pricing,
    pub status: AvailabilityState,
    #[serde(rename = "provider")]
    pub owner: Owner,
    #[serde(rename = "availability")]
    pub rental_window: RentalWindow,
}

impl Listing {
    pub fn price_per_hour(&self) -> f64 {
        self.pricing.price_per_hour
    }

    /// Check the listing invariants the marketplace relies on.
    pub fn validate(&self) -> Result<()> {
        if self.id.trim().is_empty() {
            return Err(GridRentError::ValidationFailed(
                "listing id cannot be empty".to_string(),
            ));
        }
        if !(self.pricing.price_per_hour >= 0.0) {
            return Err(GridRentError::ValidationFailed(format!(
                "listing {}: price per hour must be >= 0, got {}",
                self.id, self.pricing.price_per_hour
            )));
        }
        if !(self.specs.vram_gb > 0.0) {
            return Err(GridRentError::ValidationFailed(format!(
                "listing {}: vram must be > 0",
                self.id
            )));
        }
        if self.specs.cores == 0 {
            return Err(GridRentError::ValidationFailed(format!(
                "listing {}: core count must be > 0",
                self.id
            )));
        }
        if !(self.specs.storage_gb > 0.0) {
            return Err(GridRentError::ValidationFailed(format!(
                "listing {}: storage must be > 0",
                self.id
            )));
        }
        if self.rental_window.min_duration > self.rental_window.max_duration {
            return Err(GridRentError::ValidationFailed(format!(
                "listing {}: minimum duration {}h exceeds maximum {}h",
                self.id, self.rental_window.min_duration, self.rental_window.max_duration
            )));
        }
        if !(0.0..=5.0).contains(&self.performance.rating) {
            return Err(GridRentError::ValidationFailed(format!(
                "listing {}: rating must be within [0, 5]",
                self.id
            )));
        }
        if !(0.0..=100.0).contains(&self.performance.uptime) {
            return Err(GridRentError::ValidationFailed(format!(
                "listing {}: uptime must be within [0, 100]",
                self.id
            )));
        }
        Ok(())
    }
}

/// Node specification a provider submits when registering hardware
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ListingDraft {
    pub name: String,
    pub specs: ListingSpecs,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub location: Option<ListingLocation>,
    pub pricing: Pricing,
    #[serde(rename = "availability")]
    pub rental_window: RentalWindow,
}

#[derive(Debug, Deserialize, Serialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum InputKind {
    Ipfs,
    Url,
    Inline,
}

impl FromStr for InputKind {
    type Err = GridRentError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "ipfs" => Ok(InputKind::Ipfs),
            "url" => Ok(InputKind::Url),
            "inline" => Ok(InputKind::Inline),
            other => Err(GridRentError::InvalidInput(format!(
                "Unknown input data type '{}'. Expected ipfs, url or inline",
                other
            ))),
        }
    }
}

/// Where a job's data lives
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct DataDescriptor {
    #[serde(rename = "type")]
    pub kind: InputKind,
    pub source: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub size: Option<u64>,
}

#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ResourceRequirement {
    #[serde(rename = "minVRAM")]
    pub min_vram_gb: f64,
    /// Hours
    pub max_duration: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub gpu_model: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub region: Option<String>,
}

/// A renter's declared workload, as submitted to the marketplace
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct JobRequest {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(rename = "dockerImage")]
    pub image: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub input_data: Option<DataDescriptor>,
    pub requirements: ResourceRequirement,
    pub max_budget: f64,
}

impl JobRequest {
    pub fn new(
        name: impl Into<String>,
        image: impl Into<String>,
        requirements: ResourceRequirement,
        max_budget: f64,
    ) -> Self {
        Self {
            name: name.into(),
            description: None,
            image: image.into(),
            input_data: None,
            requirements,
            max_budget,
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn with_input(mut self, kind: InputKind, source: impl Into<String>) -> Self {
        self.input_data = Some(DataDescriptor {
            kind,
            source: source.into(),
            size: None,
        });
        self
    }
}

#[derive(Debug, Deserialize, Serialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum JobStatus {
    Pending,
    Queued,
    Running,
    Completed,
    Failed,
    Cancelled,
}

impl JobStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            JobStatus::Pending => "pending",
            JobStatus::Queued => "queued",
            JobStatus::Running => "running",
            JobStatus::Completed => "completed",
            JobStatus::Failed => "failed",
            JobStatus::Cancelled => "cancelled",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            JobStatus::Completed | JobStatus::Failed | JobStatus::Cancelled
        )
    }
}

impl fmt::Display for JobStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct JobPricing {
    pub max_budget: f64,
    #[serde(default)]
    pub actual_cost: Option<f64>,
    #[serde(default = "default_currency")]
    pub currency: String,
}

#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct JobTimestamps {
    pub created: DateTime<Utc>,
    #[serde(default)]
    pub started: Option<DateTime<Utc>>,
    #[serde(default)]
    pub completed: Option<DateTime<Utc>>,
    pub last_update: DateTime<Utc>,
}

#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct JobProgress {
    pub percentage: f64,
    pub stage: String,
    #[serde(default)]
    pub logs: Vec<String>,
}

/// The backend's record of a submitted job
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Job {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    pub status: JobStatus,
    #[serde(rename = "dockerImage")]
    pub image: String,
    #[serde(default)]
    pub input_data: Option<DataDescriptor>,
    #[serde(default)]
    pub output_data: Option<DataDescriptor>,
    pub requirements: ResourceRequirement,
    #[serde(default)]
    pub assigned_node: Option<Listing>,
    pub pricing: JobPricing,
    pub timestamps: JobTimestamps,
    #[serde(default)]
    pub progress: Option<JobProgress>,
}

#[derive(Debug, Deserialize, Serialize, Clone, PartialEq, Default)]
#[serde(rename_all = "camelCase")]
pub struct ProviderStats {
    pub total_earnings: f64,
    /// Hours
    pub total_runtime: f64,
    pub jobs_completed: u64,
    pub current_jobs: u64,
    pub uptime: f64,
    pub rating: f64,
    pub total_withdrawn: f64,
    pub pending_payments: f64,
}

/// Paginated collection returned by list endpoints
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Page<T> {
    pub items: Vec<T>,
    pub total: u64,
    pub page: u32,
    pub limit: u32,
    pub has_next: bool,
    pub has_prev: bool,
}

#[cfg(test)]
pub(crate) mod fixtures {
    use super::*;

    pub fn listing(
        id: &str,
        model: &str,
        price: f64,
        vram_gb: f64,
        status: AvailabilityState,
    ) -> Listing {
        Listing {
            id: id.to_string(),
            name: format!("node-{}", id),
            specs: ListingSpecs {
                model: model.to_string(),
                vram_gb,
                cores: 10_496,
                memory_gb: 64.0,
                storage_gb: 1000.0,
            },
            location: ListingLocation {
                country: "USA".to_string(),
                city: "New York".to_string(),
                region: "NA".to_string(),
            },
            performance: PerformanceRecord {
                uptime: 99.0,
                avg_response_time: 120.0,
                completed_jobs: 42,
                rating: 4.5,
            },
            pricing: Pricing {
                price_per_hour: price,
                currency: "USD".to_string(),
            },
            status,
            owner: Owner {
                id: format!("owner-{}", id),
                name: "TechMiner".to_string(),
                wallet_address: "0x0000000000000000000000000000000000000000".to_string(),
                reputation: 4.8,
            },
            rental_window: RentalWindow {
                max_duration: 168.0,
                min_duration: 1.0,
                scheduled_downtime: Vec::new(),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::fixtures::listing;
    use super::*;
    use serde_json::json;

    #[test]
    fn test_listing_deserializes_wire_shape() {
        let value = json!({
            "id": "gpu-3",
            "name": "asia-a100",
            "specs": {"model": "A100", "vram": 80, "cores": 6912, "memory": 256, "storage": 4000},
            "location": {"country": "Singapore", "city": "Singapore", "region": "APAC"},
            "performance": {"uptime": 99.9, "avgResponseTime": 80, "completedJobs": 1200, "rating": 4.9},
            "pricing": {"pricePerHour": 2.5, "currency": "USD"},
            "status": "online",
            "provider": {"id": "p-1", "name": "AsiaTech", "walletAddress": "0xabc", "reputation": 4.7},
            "availability": {"maxDuration": 720, "minDuration": 1}
        });

        let listing: Listing = serde_json::from_value(value).unwrap();
        assert_eq!(listing.specs.vram_gb, 80.0);
        assert_eq!(listing.owner.name, "AsiaTech");
        assert_eq!(listing.status, AvailabilityState::Online);
        assert_eq!(listing.rental_window.max_duration, 720.0);
        assert!(listing.validate().is_ok());
    }

    #[test]
    fn test_listing_invariants() {
        let mut bad_price = listing("1", "RTX 4090", 0.85, 24.0, AvailabilityState::Online);
        bad_price.pricing.price_per_hour = -0.01;
        assert!(bad_price.validate().is_err());

        let mut bad_window = listing("2", "RTX 4090", 0.85, 24.0, AvailabilityState::Online);
        bad_window.rental_window.min_duration = 200.0;
        assert!(bad_window.validate().is_err());

        let mut bad_vram = listing("3", "RTX 4090", 0.85, 24.0, AvailabilityState::Online);
        bad_vram.specs.vram_gb = 0.0;
        assert!(bad_vram.validate().is_err());

        let free = listing("4", "RTX 3060", 0.0, 12.0, AvailabilityState::Busy);
        assert!(free.validate().is_ok());
    }

    #[test]
    fn test_availability_state_parsing() {
        assert_eq!(
            "Online".parse::<AvailabilityState>().unwrap(),
            AvailabilityState::Online
        );
        assert_eq!(
            " maintenance ".parse::<AvailabilityState>().unwrap(),
            AvailabilityState::Maintenance
        );
        assert!("rented".parse::<AvailabilityState>().is_err());
    }

    #[test]
    fn test_job_request_wire_names() {
        let request = JobRequest::new(
            "train-llama",
            "pytorch/pytorch:2.1.0",
            ResourceRequirement {
                min_vram_gb: 24.0,
                max_duration: 72.0,
                gpu_model: None,
                region: Some("APAC".to_string()),
            },
            200.0,
        )
        .with_input(InputKind::Ipfs, "QmHash");

        let value = serde_json::to_value(&request).unwrap();
        assert_eq!(value["dockerImage"], "pytorch/pytorch:2.1.0");
        assert_eq!(value["requirements"]["minVRAM"], 24.0);
        assert_eq!(value["inputData"]["type"], "ipfs");
        assert_eq!(value["maxBudget"], 200.0);
        assert!(value["requirements"].get("gpuModel").is_none());
    }

    #[test]
    fn test_job_status_terminal() {
        assert!(JobStatus::Completed.is_terminal());
        assert!(JobStatus::Cancelled.is_terminal());
        assert!(!JobStatus::Running.is_terminal());
        assert!(!JobStatus::Queued.is_terminal());
    }
}
