//! Marketplace catalog filtering and ordering.
//!
//! Filtering is a pure function of a listing snapshot and a [`FilterCriteria`]
//! value. Every axis is optional and all axes are AND-combined.

use crate::errors::{GridRentError, Result};
use crate::models::{AvailabilityState, Listing};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

#[derive(Debug, Deserialize, Serialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum SortKey {
    Price,
    Rating,
    Uptime,
}

impl SortKey {
    pub fn as_str(&self) -> &'static str {
        match self {
            SortKey::Price => "price",
            SortKey::Rating => "rating",
            SortKey::Uptime => "uptime",
        }
    }

    fn value(&self, listing: &Listing) -> f64 {
        match self {
            SortKey::Price => listing.pricing.price_per_hour,
            SortKey::Rating => listing.performance.rating,
            SortKey::Uptime => listing.performance.uptime,
        }
    }
}

impl fmt::Display for SortKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SortKey {
    type Err = GridRentError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "price" => Ok(SortKey::Price),
            "rating" => Ok(SortKey::Rating),
            "uptime" => Ok(SortKey::Uptime),
            other => Err(GridRentError::InvalidInput(format!(
                "Unknown sort key '{}'. Expected price, rating or uptime",
                other
            ))),
        }
    }
}

#[derive(Debug, Deserialize, Serialize, Clone, Copy, PartialEq, Eq, Default)]
pub enum SortDirection {
    #[default]
    #[serde(rename = "asc")]
    Ascending,
    #[serde(rename = "desc")]
    Descending,
}

impl SortDirection {
    pub fn as_str(&self) -> &'static str {
        match self {
            SortDirection::Ascending => "asc",
            SortDirection::Descending => "desc",
        }
    }
}

/// Optional constraints and ordering applied to a listing snapshot.
///
/// An unset bound or an empty set places no constraint on its axis.
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq, Default)]
#[serde(rename_all = "camelCase")]
pub struct FilterCriteria {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub search: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub price_min: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub price_max: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub vram_min: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub vram_max: Option<f64>,
    #[serde(default, rename = "gpuModel", skip_serializing_if = "Vec::is_empty")]
    pub models: Vec<String>,
    #[serde(default, rename = "location", skip_serializing_if = "Vec::is_empty")]
    pub locations: Vec<String>,
    #[serde(default, rename = "status", skip_serializing_if = "Vec::is_empty")]
    pub statuses: Vec<AvailabilityState>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min_uptime: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sort_by: Option<SortKey>,
    #[serde(default)]
    pub sort_order: SortDirection,
}

impl FilterCriteria {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_search(mut self, query: impl Into<String>) -> Self {
        self.search = Some(query.into());
        self
    }

    pub fn with_price(mut self, min: Option<f64>, max: Option<f64>) -> Self {
        self.price_min = min;
        self.price_max = max;
        self
    }

    pub fn with_vram(mut self, min: Option<f64>, max: Option<f64>) -> Self {
        self.vram_min = min;
        self.vram_max = max;
        self
    }

    pub fn with_models<I, S>(mut self, models: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.models = models.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_locations<I, S>(mut self, locations: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.locations = locations.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_statuses(mut self, statuses: impl IntoIterator<Item = AvailabilityState>) -> Self {
        self.statuses = statuses.into_iter().collect();
        self
    }

    pub fn with_min_uptime(mut self, min_uptime: f64) -> Self {
        self.min_uptime = Some(min_uptime);
        self
    }

    pub fn sorted_by(mut self, key: SortKey, direction: SortDirection) -> Self {
        self.sort_by = Some(key);
        self.sort_order = direction;
        self
    }

    fn search_query(&self) -> Option<String> {
        self.search
            .as_deref()
            .map(str::trim)
            .filter(|q| !q.is_empty())
            .map(str::to_lowercase)
    }

    /// True when no axis constrains the result and no sort is requested.
    pub fn is_unconstrained(&self) -> bool {
        self.search_query().is_none()
            && self.price_min.is_none()
            && self.price_max.is_none()
            && self.vram_min.is_none()
            && self.vram_max.is_none()
            && self.models.is_empty()
            && self.locations.is_empty()
            && self.statuses.is_empty()
            && self.min_uptime.is_none()
            && self.sort_by.is_none()
    }

    /// Whether a single listing satisfies every specified constraint.
    pub fn matches(&self, listing: &Listing) -> bool {
        self.matches_search(listing)
            && within(listing.pricing.price_per_hour, self.price_min, self.price_max)
            && within(listing.specs.vram_gb, self.vram_min, self.vram_max)
            && self.matches_model(listing)
            && self.matches_location(listing)
            && (self.statuses.is_empty() || self.statuses.contains(&listing.status))
            && self
                .min_uptime
                .map_or(true, |min| listing.performance.uptime >= min)
    }

    fn matches_search(&self, listing: &Listing) -> bool {
        let Some(query) = self.search_query() else {
            return true;
        };

        let contains = |field: &str| field.to_lowercase().contains(&query);

        contains(listing.specs.model.as_str())
            || contains(listing.owner.name.as_str())
            || listing.location.fields().into_iter().any(contains)
    }

    fn matches_model(&self, listing: &Listing) -> bool {
        self.models.is_empty()
            || self
                .models
                .iter()
                .any(|m| m.trim().eq_ignore_ascii_case(&listing.specs.model))
    }

    fn matches_location(&self, listing: &Listing) -> bool {
        self.locations.is_empty()
            || self.locations.iter().any(|loc| {
                let loc = loc.trim();
                loc.eq_ignore_ascii_case(&listing.location.country)
                    || loc.eq_ignore_ascii_case(&listing.location.region)
            })
    }

    /// Reject bound pairs that can never match and values outside their domain.
    ///
    /// The filter itself does not call this; callers that accept user input do.
    pub fn validate(&self) -> Result<()> {
        check_bounds("price", self.price_min, self.price_max)?;
        check_bounds("vram", self.vram_min, self.vram_max)?;

        if let Some(uptime) = self.min_uptime {
            if !(0.0..=100.0).contains(&uptime) {
                return Err(GridRentError::InvalidInput(format!(
                    "minimum uptime must be within [0, 100], got {}",
                    uptime
                )));
            }
        }

        Ok(())
    }

    /// Flatten into query parameters, repeating keys for set-valued axes.
    pub fn to_query_pairs(&self) -> Vec<(&'static str, String)> {
        let mut pairs = Vec::new();

        if let Some(query) = self.search.as_deref().map(str::trim).filter(|q| !q.is_empty()) {
            pairs.push(("search", query.to_string()));
        }
        for (key, value) in [
            ("priceMin", self.price_min),
            ("priceMax", self.price_max),
            ("vramMin", self.vram_min),
            ("vramMax", self.vram_max),
            ("minUptime", self.min_uptime),
        ] {
            if let Some(v) = value {
                pairs.push((key, v.to_string()));
            }
        }
        pairs.extend(self.models.iter().map(|m| ("gpuModel", m.clone())));
        pairs.extend(self.locations.iter().map(|l| ("location", l.clone())));
        pairs.extend(self.statuses.iter().map(|s| ("status", s.to_string())));
        if let Some(key) = self.sort_by {
            pairs.push(("sortBy", key.to_string()));
            pairs.push(("sortOrder", self.sort_order.as_str().to_string()));
        }

        pairs
    }
}

fn within(value: f64, min: Option<f64>, max: Option<f64>) -> bool {
    min.map_or(true, |m| value >= m) && max.map_or(true, |m| value <= m)
}

fn check_bounds(axis: &str, min: Option<f64>, max: Option<f64>) -> Result<()> {
    for bound in [min, max].into_iter().flatten() {
        if !bound.is_finite() || bound < 0.0 {
            return Err(GridRentError::InvalidInput(format!(
                "{} bound must be a non-negative number, got {}",
                axis, bound
            )));
        }
    }

    if let (Some(min), Some(max)) = (min, max) {
        if min > max {
            return Err(GridRentError::InvalidInput(format!(
                "{} minimum {} is greater than maximum {}",
                axis, min, max
            )));
        }
    }

    Ok(())
}

/// Filter a listing snapshot and order the result.
///
/// Output is a subset of the input. Without a sort key the input order is kept;
/// with one, listings with equal keys keep their relative input order.
pub fn filter_listings(listings: &[Listing], criteria: &FilterCriteria) -> Vec<Listing> {
    let mut result: Vec<Listing> = listings
        .iter()
        .filter(|listing| criteria.matches(listing))
        .cloned()
        .collect();

    if let Some(key) = criteria.sort_by {
        sort_listings(&mut result, key, criteria.sort_order);
    }

    result
}

/// Stable sort by the given key. NaN keys always sort last.
pub fn sort_listings(listings: &mut [Listing], key: SortKey, direction: SortDirection) {
    listings.sort_by(|a, b| {
        let (x, y) = (key.value(a), key.value(b));
        let ordering = match (x.is_nan(), y.is_nan()) {
            (false, false) => x.partial_cmp(&y).unwrap_or(Ordering::Equal),
            (true, true) => Ordering::Equal,
            (true, false) => return Ordering::Greater,
            (false, true) => return Ordering::Less,
        };
        match direction {
            SortDirection::Ascending => ordering,
            SortDirection::Descending => ordering.reverse(),
        }
    });
}

/// Group listings by hardware model
pub fn group_by_model(listings: &[Listing]) -> BTreeMap<String, Vec<Listing>> {
    let mut groups: BTreeMap<String, Vec<Listing>> = BTreeMap::new();

    for listing in listings {
        groups
            .entry(listing.specs.model.clone())
            .or_default()
            .push(listing.clone());
    }

    groups
}

/// Aggregate statistics for one hardware model
#[derive(Debug, Clone, PartialEq)]
pub struct ModelSummary {
    pub model: String,
    pub count: usize,
    pub online: usize,
    pub min_price: f64,
    pub max_price: f64,
    pub avg_price: f64,
}

pub fn summarize_by_model(listings: &[Listing]) -> Vec<ModelSummary> {
    group_by_model(listings)
        .into_iter()
        .map(|(model, group)| {
            let prices: Vec<f64> = group.iter().map(Listing::price_per_hour).collect();
            let min_price = prices.iter().copied().fold(f64::INFINITY, f64::min);
            let max_price = prices.iter().copied().fold(f64::NEG_INFINITY, f64::max);
            let avg_price = prices.iter().sum::<f64>() / prices.len() as f64;

            ModelSummary {
                count: group.len(),
                online: group.iter().filter(|l| l.status.is_rentable()).count(),
                model,
                min_price,
                max_price,
                avg_price,
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::fixtures::listing;
    use crate::models::AvailabilityState::{Busy, Maintenance, Offline, Online};

    fn ids(listings: &[Listing]) -> Vec<&str> {
        listings.iter().map(|l| l.id.as_str()).collect()
    }

    fn sample_catalog() -> Vec<Listing> {
        let mut rtx4090 = listing("gpu-1", "RTX 4090", 0.85, 24.0, Online);
        rtx4090.owner.name = "TechMiner".to_string();
        rtx4090.performance.uptime = 99.8;
        rtx4090.performance.rating = 4.6;

        let mut rtx3090 = listing("gpu-2", "RTX 3090", 0.65, 24.0, Online);
        rtx3090.owner.name = "EuroCompute".to_string();
        rtx3090.location.country = "Germany".to_string();
        rtx3090.location.city = "Frankfurt".to_string();
        rtx3090.location.region = "EU".to_string();
        rtx3090.performance.uptime = 97.5;
        rtx3090.performance.rating = 4.2;

        let mut a100 = listing("gpu-3", "A100", 2.50, 80.0, Online);
        a100.owner.name = "AsiaTech".to_string();
        a100.location.country = "Singapore".to_string();
        a100.location.city = "Singapore".to_string();
        a100.location.region = "APAC".to_string();
        a100.performance.uptime = 99.9;
        a100.performance.rating = 4.9;

        let mut rtx4080 = listing("gpu-4", "RTX 4080", 0.75, 16.0, Busy);
        rtx4080.owner.name = "BritishGPU".to_string();
        rtx4080.location.country = "UK".to_string();
        rtx4080.location.city = "London".to_string();
        rtx4080.location.region = "EU".to_string();
        rtx4080.performance.uptime = 98.2;
        rtx4080.performance.rating = 4.2;

        let mut v100 = listing("gpu-5", "V100", 1.20, 32.0, Maintenance);
        v100.owner.name = "JapanCloud".to_string();
        v100.location.country = "Japan".to_string();
        v100.location.city = "Tokyo".to_string();
        v100.location.region = "APAC".to_string();
        v100.performance.uptime = 99.1;
        v100.performance.rating = 4.2;

        vec![rtx4090, rtx3090, a100, rtx4080, v100]
    }

    fn criteria_variants() -> Vec<FilterCriteria> {
        vec![
            FilterCriteria::new(),
            FilterCriteria::new().with_price(Some(0.7), Some(1.5)),
            FilterCriteria::new().with_vram(Some(24.0), None),
            FilterCriteria::new().with_search("eu"),
            FilterCriteria::new().with_models(["rtx 4090", "a100"]),
            FilterCriteria::new().with_locations(["apac"]),
            FilterCriteria::new().with_statuses([Online, Busy]),
            FilterCriteria::new().with_min_uptime(99.0),
            FilterCriteria::new()
                .with_price(None, Some(2.0))
                .with_statuses([Online])
                .sorted_by(SortKey::Rating, SortDirection::Descending),
        ]
    }

    #[test]
    fn test_result_is_subset_of_input() {
        let catalog = sample_catalog();
        for criteria in criteria_variants() {
            let result = filter_listings(&catalog, &criteria);
            assert!(result.len() <= catalog.len());
            assert!(result.iter().all(|l| catalog.contains(l)));
        }
    }

    #[test]
    fn test_every_result_satisfies_criteria() {
        let catalog = sample_catalog();
        for criteria in criteria_variants() {
            let result = filter_listings(&catalog, &criteria);
            assert!(result.iter().all(|l| criteria.matches(l)));

            // and nothing satisfying the criteria was dropped
            let expected = catalog.iter().filter(|l| criteria.matches(l)).count();
            assert_eq!(result.len(), expected);
        }
    }

    #[test]
    fn test_unconstrained_criteria_is_identity() {
        let catalog = sample_catalog();
        let criteria = FilterCriteria::new();
        assert!(criteria.is_unconstrained());
        assert_eq!(filter_listings(&catalog, &criteria), catalog);
    }

    #[test]
    fn test_filters_compose_across_disjoint_axes() {
        let catalog = sample_catalog();
        let by_price = FilterCriteria::new().with_price(None, Some(1.5));
        let by_status = FilterCriteria::new().with_statuses([Online]);
        let combined = FilterCriteria::new()
            .with_price(None, Some(1.5))
            .with_statuses([Online]);

        let chained = filter_listings(&filter_listings(&catalog, &by_price), &by_status);
        assert_eq!(chained, filter_listings(&catalog, &combined));
        assert_eq!(ids(&chained), vec!["gpu-1", "gpu-2"]);
    }

    #[test]
    fn test_sort_is_stable_for_equal_keys() {
        let catalog = sample_catalog();

        // gpu-2, gpu-4, gpu-5 share a 4.2 rating
        let ascending = filter_listings(
            &catalog,
            &FilterCriteria::new().sorted_by(SortKey::Rating, SortDirection::Ascending),
        );
        assert_eq!(
            ids(&ascending),
            vec!["gpu-2", "gpu-4", "gpu-5", "gpu-1", "gpu-3"]
        );

        let descending = filter_listings(
            &catalog,
            &FilterCriteria::new().sorted_by(SortKey::Rating, SortDirection::Descending),
        );
        assert_eq!(
            ids(&descending),
            vec!["gpu-3", "gpu-1", "gpu-2", "gpu-4", "gpu-5"]
        );
    }

    #[test]
    fn test_sort_by_price_and_uptime() {
        let catalog = sample_catalog();

        let by_price = filter_listings(
            &catalog,
            &FilterCriteria::new().sorted_by(SortKey::Price, SortDirection::Ascending),
        );
        assert_eq!(
            ids(&by_price),
            vec!["gpu-2", "gpu-4", "gpu-1", "gpu-5", "gpu-3"]
        );

        let by_uptime = filter_listings(
            &catalog,
            &FilterCriteria::new().sorted_by(SortKey::Uptime, SortDirection::Descending),
        );
        assert_eq!(ids(&by_uptime)[0], "gpu-3");
        assert_eq!(ids(&by_uptime)[4], "gpu-2");
    }

    #[test]
    fn test_nan_keys_sort_last_in_both_directions() {
        let prices = [3.0, f64::NAN, 1.0, 2.0, f64::NAN, 0.5];
        let mut catalog: Vec<Listing> = prices
            .iter()
            .enumerate()
            .map(|(i, &price)| listing(&format!("gpu-{}", i), "RTX 4090", price, 24.0, Online))
            .collect();

        sort_listings(&mut catalog, SortKey::Price, SortDirection::Ascending);
        assert_eq!(
            ids(&catalog),
            vec!["gpu-5", "gpu-2", "gpu-3", "gpu-0", "gpu-1", "gpu-4"]
        );

        sort_listings(&mut catalog, SortKey::Price, SortDirection::Descending);
        assert_eq!(
            ids(&catalog),
            vec!["gpu-0", "gpu-3", "gpu-2", "gpu-5", "gpu-1", "gpu-4"]
        );
    }

    #[test]
    fn test_price_max_scenario() {
        let mut rtx = listing("rtx", "RTX 4090", 0.85, 24.0, Online);
        rtx.location.region = "NA".to_string();
        let mut a100 = listing("a100", "A100", 4.99, 80.0, Online);
        a100.location.region = "APAC".to_string();

        let result = filter_listings(
            &[rtx, a100],
            &FilterCriteria::new().with_price(None, Some(1.0)),
        );
        assert_eq!(ids(&result), vec!["rtx"]);
    }

    #[test]
    fn test_search_is_case_insensitive_across_fields() {
        let catalog = sample_catalog();

        let by_city = filter_listings(&catalog, &FilterCriteria::new().with_search("singapore"));
        assert_eq!(ids(&by_city), vec!["gpu-3"]);

        let by_owner = filter_listings(&catalog, &FilterCriteria::new().with_search("EUROcompute"));
        assert_eq!(ids(&by_owner), vec!["gpu-2"]);

        let by_model = filter_listings(&catalog, &FilterCriteria::new().with_search("rtx"));
        assert_eq!(ids(&by_model), vec!["gpu-1", "gpu-2", "gpu-4"]);

        let blank = filter_listings(&catalog, &FilterCriteria::new().with_search("   "));
        assert_eq!(blank.len(), catalog.len());
    }

    #[test]
    fn test_bounds_are_inclusive() {
        let catalog = sample_catalog();
        let result = filter_listings(
            &catalog,
            &FilterCriteria::new()
                .with_price(Some(0.65), Some(0.85))
                .with_vram(Some(24.0), Some(24.0)),
        );
        assert_eq!(ids(&result), vec!["gpu-1", "gpu-2"]);
    }

    #[test]
    fn test_set_axes() {
        let catalog = sample_catalog();

        let models = filter_listings(&catalog, &FilterCriteria::new().with_models(["a100", "V100"]));
        assert_eq!(ids(&models), vec!["gpu-3", "gpu-5"]);

        let locations = filter_listings(&catalog, &FilterCriteria::new().with_locations(["uk", "NA"]));
        assert_eq!(ids(&locations), vec!["gpu-1", "gpu-4"]);

        let statuses = filter_listings(
            &catalog,
            &FilterCriteria::new().with_statuses([Maintenance, Offline]),
        );
        assert_eq!(ids(&statuses), vec!["gpu-5"]);
    }

    #[test]
    fn test_empty_inputs_and_empty_results() {
        assert!(filter_listings(&[], &FilterCriteria::new().with_search("a100")).is_empty());

        let catalog = sample_catalog();
        let nothing = filter_listings(&catalog, &FilterCriteria::new().with_price(Some(10.0), None));
        assert!(nothing.is_empty());

        // inverted bounds are not rejected by the filter, they just match nothing
        let inverted = FilterCriteria::new().with_price(Some(2.0), Some(1.0));
        assert!(filter_listings(&catalog, &inverted).is_empty());
        assert!(inverted.validate().is_err());
    }

    #[test]
    fn test_validate() {
        assert!(FilterCriteria::new().validate().is_ok());
        assert!(FilterCriteria::new()
            .with_price(Some(0.5), Some(0.5))
            .validate()
            .is_ok());
        assert!(FilterCriteria::new()
            .with_vram(Some(-1.0), None)
            .validate()
            .is_err());
        assert!(FilterCriteria::new().with_min_uptime(101.0).validate().is_err());
    }

    #[test]
    fn test_query_pairs() {
        let criteria = FilterCriteria::new()
            .with_search(" tokyo ")
            .with_price(None, Some(1.5))
            .with_models(["A100", "V100"])
            .with_statuses([Online])
            .sorted_by(SortKey::Price, SortDirection::Descending);

        let pairs = criteria.to_query_pairs();
        assert_eq!(
            pairs,
            vec![
                ("search", "tokyo".to_string()),
                ("priceMax", "1.5".to_string()),
                ("gpuModel", "A100".to_string()),
                ("gpuModel", "V100".to_string()),
                ("status", "online".to_string()),
                ("sortBy", "price".to_string()),
                ("sortOrder", "desc".to_string()),
            ]
        );
    }

    #[test]
    fn test_summarize_by_model() {
        let mut catalog = sample_catalog();
        catalog.push(listing("gpu-6", "RTX 4090", 1.05, 24.0, Offline));

        let summaries = summarize_by_model(&catalog);
        let rtx = summaries.iter().find(|s| s.model == "RTX 4090").unwrap();
        assert_eq!(rtx.count, 2);
        assert_eq!(rtx.online, 1);
        assert_eq!(rtx.min_price, 0.85);
        assert_eq!(rtx.max_price, 1.05);
        assert!((rtx.avg_price - 0.95).abs() < 1e-9);

        // BTreeMap keeps models ordered
        assert_eq!(summaries[0].model, "A100");
    }
}
