use crate::client::GridRentApiClient;
use crate::errors::{ApiError, Result};
use gridrent_core::{
    filter_listings, CostEstimate, FilterCriteria, Job, JobRequest, Listing, TierSchedule,
};
use log::{debug, info, warn};

/// Renter-facing view of the marketplace: local catalog search, quotes and
/// budget-guarded job submission
pub struct Marketplace {
    api_client: GridRentApiClient,
    schedule: TierSchedule,
}

impl Marketplace {
    pub fn new(api_client: GridRentApiClient) -> Self {
        Self {
            api_client,
            schedule: TierSchedule::default(),
        }
    }

    /// Create from environment variables
    pub fn from_env() -> Result<Self> {
        Ok(Self::new(GridRentApiClient::from_env()?))
    }

    /// Quote with a custom rate card
    pub fn with_schedule(mut self, schedule: TierSchedule) -> Self {
        self.schedule = schedule;
        self
    }

    pub fn client(&self) -> &GridRentApiClient {
        &self.api_client
    }

    pub fn schedule(&self) -> &TierSchedule {
        &self.schedule
    }

    /// Fetch the catalog snapshot and filter it locally
    pub async fn search(&self, criteria: &FilterCriteria) -> Result<Vec<Listing>> {
        let catalog = self.api_client.fetch_catalog().await?;
        let results = filter_listings(&catalog, criteria);

        debug!(
            "Search kept {} of {} listings",
            results.len(),
            catalog.len()
        );
        Ok(results)
    }

    pub fn quote(&self, request: &JobRequest) -> Result<CostEstimate> {
        Ok(self.schedule.estimate_job(request)?)
    }

    /// Validate, quote and submit a job. Requests whose estimate exceeds
    /// their own budget never reach the backend.
    pub async fn submit(&self, request: &JobRequest) -> Result<Job> {
        request.validate()?;

        let quote = self.quote(request)?;
        if !quote.within_budget {
            warn!(
                "Refusing to submit '{}': estimate {} exceeds budget {}",
                request.name, quote.total, request.max_budget
            );
            return Err(ApiError::Validation(format!(
                "estimated cost {:.2} ({:.2}/h for {}h) exceeds the budget of {:.2}",
                quote.total, quote.hourly_rate, quote.hours, request.max_budget
            )));
        }

        let job = self.api_client.create_job(request).await?;
        info!("Submitted job {} (estimate {:.2})", job.id, quote.total);
        Ok(job)
    }

    pub async fn listing(&self, id: &str) -> Result<Listing> {
        self.api_client.get_listing(id).await
    }

    pub async fn job(&self, id: &str) -> Result<Job> {
        self.api_client.get_job(id).await
    }

    pub async fn cancel(&self, id: &str) -> Result<Job> {
        self.api_client.cancel_job(id).await
    }

    /// Test API connection
    pub async fn test_connection(&self) -> Result<bool> {
        self.api_client.test_connection().await
    }
}
