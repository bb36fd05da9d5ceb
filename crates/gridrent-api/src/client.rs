use crate::errors::{error_message, ApiError, Result};
use chrono::{DateTime, Utc};
use gridrent_core::{FilterCriteria, Job, JobRequest, Listing, ListingDraft, Page, ProviderStats};
use log::{debug, error, info, trace, warn};
use reqwest::{Client, Method, Response};
use serde::de::DeserializeOwned;
use serde_json::{json, Value};
use std::time::Duration;
use url::Url;

pub const DEFAULT_BASE_URL: &str = "http://localhost:8080/api";
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);

/// Page size used when walking the whole catalog
pub const CATALOG_PAGE_SIZE: u32 = 100;

/// Trait for providing configuration to the API client
/// This allows the main application to implement config without circular dependencies
pub trait ApiConfig {
    type Error;

    /// Bearer token, if the user has one. Catalog browsing works without it.
    fn get_api_token(&self) -> std::result::Result<Option<String>, Self::Error>;

    /// Get the base URL for the API (optional, defaults to the local backend)
    fn get_base_url(&self) -> std::result::Result<Option<String>, Self::Error> {
        Ok(None)
    }

    fn get_timeout(&self) -> std::result::Result<Option<Duration>, Self::Error> {
        Ok(None)
    }
}

fn mask(token: &str) -> String {
    if token.len() <= 8 || !token.is_ascii() {
        return "****".to_string();
    }
    format!("{}...{}", &token[..4], &token[token.len() - 4..])
}

/// HTTP client for the GridRent marketplace backend
#[derive(Debug, Clone)]
pub struct GridRentApiClient {
    client: Client,
    base_url: Url,
    token: Option<String>,
}

impl GridRentApiClient {
    /// Create a new API client
    pub fn new(base_url: Option<String>, token: Option<String>, timeout: Duration) -> Result<Self> {
        let raw = base_url.unwrap_or_else(|| DEFAULT_BASE_URL.to_string());
        let base_url = Url::parse(&raw)
            .map_err(|e| ApiError::Config(format!("invalid base URL '{}': {}", raw, e)))?;

        if !matches!(base_url.scheme(), "http" | "https") || base_url.cannot_be_a_base() {
            return Err(ApiError::Config(format!(
                "base URL '{}' must be an http(s) URL",
                raw
            )));
        }

        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| ApiError::Config(format!("failed to build HTTP client: {}", e)))?;

        debug!("Creating GridRentApiClient");
        debug!("  Base URL: {}", base_url);
        debug!("  Timeout: {:?}", timeout);
        match token.as_deref() {
            Some(t) => debug!("  Token: {}", mask(t)),
            None => debug!("  Token: none (anonymous)"),
        }

        Ok(Self {
            client,
            base_url,
            token,
        })
    }

    /// Anonymous client against a custom backend, default timeout
    pub fn with_base_url(base_url: impl Into<String>) -> Result<Self> {
        Self::new(Some(base_url.into()), None, DEFAULT_TIMEOUT)
    }

    /// Create API client from `GRIDRENT_API_URL` and `GRIDRENT_API_TOKEN`
    pub fn from_env() -> Result<Self> {
        debug!("Creating GridRentApiClient from environment");
        let base_url = std::env::var("GRIDRENT_API_URL").ok();
        let token = std::env::var("GRIDRENT_API_TOKEN")
            .ok()
            .filter(|t| !t.trim().is_empty());
        Self::new(base_url, token, DEFAULT_TIMEOUT)
    }

    /// Create API client from any configuration implementing ApiConfig trait
    pub fn from_config<C>(config: &C) -> std::result::Result<Self, C::Error>
    where
        C: ApiConfig,
        C::Error: From<ApiError>,
    {
        debug!("Creating GridRentApiClient from config");
        let token = config.get_api_token()?;
        let base_url = config.get_base_url()?;
        let timeout = config.get_timeout()?.unwrap_or(DEFAULT_TIMEOUT);

        if let Some(ref url) = base_url {
            debug!("Got custom base URL from config: {}", url);
        } else {
            debug!("Using default base URL");
        }

        Ok(Self::new(base_url, token, timeout)?)
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    pub fn has_token(&self) -> bool {
        self.token.is_some()
    }

    /// Join path segments onto the base URL, percent-encoding each one
    fn endpoint(&self, segments: &[&str]) -> Result<Url> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|_| ApiError::Config(format!("base URL '{}' cannot take a path", self.base_url)))?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    async fn send(
        &self,
        method: Method,
        segments: &[&str],
        query: &[(&str, String)],
        body: Option<Value>,
    ) -> Result<Response> {
        let url = self.endpoint(segments)?;

        debug!("HTTP {} request to: {}", method, url);
        if !query.is_empty() {
            trace!("Query: {:?}", query);
        }

        let mut request = self
            .client
            .request(method.clone(), url)
            .header("Content-Type", "application/json");

        if let Some(ref token) = self.token {
            trace!("  Authorization: Bearer {}", mask(token));
            request = request.bearer_auth(token);
        }
        if !query.is_empty() {
            request = request.query(query);
        }
        if let Some(body) = body {
            trace!(
                "Request body: {}",
                serde_json::to_string_pretty(&body).unwrap_or_else(|_| "Invalid JSON".to_string())
            );
            request = request.json(&body);
        }

        let response = request.send().await.map_err(|e| {
            error!("{} request failed: {:?}", method, e);
            ApiError::from_transport(e)
        })?;

        debug!("Response status: {}", response.status());

        self.handle_response(response).await
    }

    async fn get(&self, segments: &[&str], query: &[(&str, String)]) -> Result<Response> {
        self.send(Method::GET, segments, query, None).await
    }

    async fn post(&self, segments: &[&str], body: Option<Value>) -> Result<Response> {
        self.send(Method::POST, segments, &[], body).await
    }

    async fn put(&self, segments: &[&str], body: Value) -> Result<Response> {
        self.send(Method::PUT, segments, &[], Some(body)).await
    }

    /// Handle HTTP response and convert errors
    async fn handle_response(&self, response: Response) -> Result<Response> {
        let status = response.status();

        if status.is_success() {
            debug!("Request successful with status: {}", status);
            return Ok(response);
        }

        let body = response.text().await.unwrap_or_default();
        error!("Request failed with status: {}", status);
        debug!("Error response body: {}", body);

        Err(ApiError::from_status(status, error_message(status, &body)))
    }

    /// Decode a JSON body. An empty body decodes as `null`.
    async fn decode<T: DeserializeOwned>(response: Response) -> Result<T> {
        let text = response.text().await.map_err(ApiError::from_transport)?;
        let text = if text.trim().is_empty() { "null" } else { text.as_str() };
        serde_json::from_str(text).map_err(|e| {
            error!("Failed to decode response: {}", e);
            ApiError::Decode(e.to_string())
        })
    }

    // ---- Catalog ----

    /// Fetch one page of listings, optionally narrowed server-side
    pub async fn list_listings(
        &self,
        criteria: Option<&FilterCriteria>,
        page: u32,
        limit: u32,
    ) -> Result<Page<Listing>> {
        debug!("Fetching listings page {} (limit {})", page, limit);
        let mut query = criteria.map(FilterCriteria::to_query_pairs).unwrap_or_default();
        query.push(("page", page.to_string()));
        query.push(("limit", limit.to_string()));

        let response = self.get(&["gpus"], &query).await?;
        let page: Page<Listing> = Self::decode(response).await?;

        info!(
            "Successfully fetched {} listings ({} total)",
            page.items.len(),
            page.total
        );
        Ok(page)
    }

    /// Walk every page of the unfiltered catalog.
    ///
    /// Stops at the first page without `hasNext`, at an empty page, or once
    /// the `total` reported by the first page is in hand. Every page walked
    /// adds at least one listing, so the walk is bounded by that total.
    pub async fn fetch_catalog(&self) -> Result<Vec<Listing>> {
        let mut listings = Vec::new();
        let mut page_number = 1;
        let mut expected: Option<u64> = None;

        loop {
            let page = self
                .list_listings(None, page_number, CATALOG_PAGE_SIZE)
                .await?;
            let total = *expected.get_or_insert(page.total);
            let done = !page.has_next || page.items.is_empty();
            listings.extend(page.items);

            if done {
                break;
            }
            if listings.len() as u64 >= total {
                warn!(
                    "Backend still reports more pages after {} listings (total {}), stopping",
                    listings.len(),
                    total
                );
                break;
            }
            page_number += 1;
        }

        info!("Catalog snapshot holds {} listings", listings.len());
        Ok(listings)
    }

    pub async fn get_listing(&self, id: &str) -> Result<Listing> {
        debug!("Fetching listing {}", id);
        let response = self.get(&["gpus", id], &[]).await?;
        Self::decode(response).await
    }

    /// Availability calendar for a listing between two instants
    pub async fn get_availability(
        &self,
        id: &str,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<Value> {
        if end < start {
            return Err(ApiError::Validation(
                "availability window ends before it starts".to_string(),
            ));
        }

        debug!("Fetching availability for {} from {} to {}", id, start, end);
        let query = [("start", start.to_rfc3339()), ("end", end.to_rfc3339())];
        let response = self.get(&["gpus", id, "availability"], &query).await?;
        Self::decode(response).await
    }

    pub async fn reserve_listing(
        &self,
        id: &str,
        hours: f64,
        job_id: Option<&str>,
    ) -> Result<Value> {
        if !hours.is_finite() || hours <= 0.0 {
            return Err(ApiError::Validation(format!(
                "reservation length must be a positive number of hours, got {}",
                hours
            )));
        }

        debug!("Reserving listing {} for {}h", id, hours);
        let mut body = json!({ "duration": hours });
        if let Some(job_id) = job_id {
            body["jobId"] = Value::from(job_id);
        }

        let response = self.post(&["gpus", id, "reserve"], Some(body)).await?;
        let result = Self::decode(response).await?;

        info!("Successfully reserved listing {}", id);
        Ok(result)
    }

    // ---- Jobs ----

    pub async fn create_job(&self, request: &JobRequest) -> Result<Job> {
        debug!("Creating job '{}' with image {}", request.name, request.image);
        let body = serde_json::to_value(request).map_err(|e| ApiError::Decode(e.to_string()))?;

        let response = self.post(&["jobs"], Some(body)).await?;
        let job: Job = Self::decode(response).await?;

        info!("Successfully created job {}", job.id);
        Ok(job)
    }

    pub async fn get_job(&self, id: &str) -> Result<Job> {
        debug!("Fetching job {}", id);
        let response = self.get(&["jobs", id], &[]).await?;
        Self::decode(response).await
    }

    /// The authenticated user's jobs, newest first as ordered by the backend
    pub async fn list_jobs(&self, page: u32, limit: u32) -> Result<Page<Job>> {
        debug!("Fetching user jobs page {} (limit {})", page, limit);
        let query = [("page", page.to_string()), ("limit", limit.to_string())];
        let response = self.get(&["user", "jobs"], &query).await?;
        let jobs: Page<Job> = Self::decode(response).await?;

        info!("Successfully fetched {} jobs", jobs.items.len());
        Ok(jobs)
    }

    async fn job_action(&self, id: &str, action: &str, body: Option<Value>) -> Result<Job> {
        debug!("Job {}: {}", id, action);
        let response = self.post(&["jobs", id, action], body).await?;
        let job: Job = Self::decode(response).await?;

        info!("Job {} is now {}", job.id, job.status);
        Ok(job)
    }

    pub async fn cancel_job(&self, id: &str) -> Result<Job> {
        self.job_action(id, "cancel", None).await
    }

    /// Confirm completion so payment is released to the provider
    pub async fn confirm_job(&self, id: &str) -> Result<Job> {
        self.job_action(id, "confirm", None).await
    }

    pub async fn retry_job(&self, id: &str) -> Result<Job> {
        self.job_action(id, "retry", None).await
    }

    pub async fn dispute_job(&self, id: &str, reason: &str) -> Result<Job> {
        if reason.trim().is_empty() {
            return Err(ApiError::Validation(
                "a dispute needs a reason".to_string(),
            ));
        }
        self.job_action(id, "dispute", Some(json!({ "reason": reason })))
            .await
    }

    pub async fn job_logs(&self, id: &str) -> Result<Vec<String>> {
        debug!("Fetching logs for job {}", id);
        let response = self.get(&["jobs", id, "logs"], &[]).await?;
        let logs: Option<Vec<String>> = Self::decode(response).await?;
        Ok(logs.unwrap_or_default())
    }

    // ---- Provider ----

    pub async fn register_provider(&self, draft: &ListingDraft) -> Result<Listing> {
        draft.validate()?;
        debug!("Registering node '{}' ({})", draft.name, draft.specs.model);
        let body = serde_json::to_value(draft).map_err(|e| ApiError::Decode(e.to_string()))?;

        let response = self.post(&["provider", "register"], Some(body)).await?;
        let listing: Listing = Self::decode(response).await?;

        info!("Successfully registered node {}", listing.id);
        Ok(listing)
    }

    pub async fn provider_stats(&self) -> Result<ProviderStats> {
        debug!("Fetching provider stats");
        let response = self.get(&["provider", "stats"], &[]).await?;
        Self::decode(response).await
    }

    pub async fn provider_nodes(&self) -> Result<Vec<Listing>> {
        debug!("Fetching provider nodes");
        let response = self.get(&["provider", "nodes"], &[]).await?;
        let nodes: Vec<Listing> = Self::decode(response).await?;

        info!("Successfully fetched {} provider nodes", nodes.len());
        Ok(nodes)
    }

    pub async fn update_availability(&self, node_id: &str, is_available: bool) -> Result<Value> {
        debug!("Setting node {} available={}", node_id, is_available);
        let response = self
            .put(
                &["provider", "nodes", node_id, "availability"],
                json!({ "isAvailable": is_available }),
            )
            .await?;
        Self::decode(response).await
    }

    pub async fn update_pricing(&self, node_id: &str, price_per_hour: f64) -> Result<Value> {
        if !price_per_hour.is_finite() || price_per_hour < 0.0 {
            return Err(ApiError::Validation(format!(
                "price per hour must be non-negative, got {}",
                price_per_hour
            )));
        }

        debug!("Setting node {} price to {}/h", node_id, price_per_hour);
        let response = self
            .put(
                &["provider", "nodes", node_id, "pricing"],
                json!({ "pricePerHour": price_per_hour }),
            )
            .await?;
        Self::decode(response).await
    }

    /// Tell the backend a node is still online
    pub async fn heartbeat(&self, node_id: &str, system_stats: Option<Value>) -> Result<Value> {
        trace!("Heartbeat for node {}", node_id);
        let mut body = json!({
            "nodeId": node_id,
            "timestamp": Utc::now().to_rfc3339(),
        });
        if let Some(stats) = system_stats {
            body["systemStats"] = stats;
        }

        let response = self.post(&["provider", "heartbeat"], Some(body)).await?;
        Self::decode(response).await
    }

    pub async fn withdraw(&self, amount: f64, wallet_address: &str) -> Result<Value> {
        if !amount.is_finite() || amount <= 0.0 {
            return Err(ApiError::Validation(format!(
                "withdrawal amount must be positive, got {}",
                amount
            )));
        }
        if wallet_address.trim().is_empty() {
            return Err(ApiError::Validation(
                "wallet address is required".to_string(),
            ));
        }

        debug!("Withdrawing {} to {}", amount, wallet_address);
        let response = self
            .post(
                &["provider", "withdraw"],
                Some(json!({ "amount": amount, "walletAddress": wallet_address })),
            )
            .await?;
        let result = Self::decode(response).await?;

        info!("Withdrawal of {} requested", amount);
        Ok(result)
    }

    pub async fn withdrawals(&self) -> Result<Value> {
        debug!("Fetching withdrawal history");
        let response = self.get(&["provider", "withdrawals"], &[]).await?;
        Self::decode(response).await
    }

    /// Test connection to the API
    pub async fn test_connection(&self) -> Result<bool> {
        debug!("Testing API connection");
        match self.get(&["health"], &[]).await {
            Ok(_) => {
                info!("API connection successful");
                Ok(true)
            }
            Err(e) => {
                error!("API connection failed: {:?}", e);
                Ok(false)
            }
        }
    }
}
