use crate::errors::{GridRentError, Result};
use crate::models::JobRequest;
use serde::{Deserialize, Serialize};

/// Hours per day a provider's GPU is assumed to be rented when projecting earnings
pub const DEFAULT_UTILIZATION_HOURS: f64 = 8.0;

/// One band of the step-function rate card
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RateTier {
    /// Requirements at or above this many GB of VRAM fall into the tier
    pub min_vram_gb: f64,
    /// Price per hour for the tier
    pub hourly_rate: f64,
}

impl RateTier {
    pub const fn new(min_vram_gb: f64, hourly_rate: f64) -> Self {
        Self {
            min_vram_gb,
            hourly_rate,
        }
    }
}

/// Memory-tiered hourly rates, evaluated highest threshold first.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TierSchedule {
    tiers: Vec<RateTier>,
    base_rate: f64,
}

impl Default for TierSchedule {
    fn default() -> Self {
        Self {
            tiers: vec![
                RateTier::new(40.0, 4.5),
                RateTier::new(24.0, 2.5),
                RateTier::new(16.0, 1.8),
            ],
            base_rate: 1.2,
        }
    }
}

impl TierSchedule {
    /// Build a schedule from tiers in any order.
    ///
    /// Rates must strictly increase with the threshold and the base rate must
    /// sit below the lowest tier, so a larger requirement never gets a cheaper rate.
    pub fn new(mut tiers: Vec<RateTier>, base_rate: f64) -> Result<Self> {
        let invalid = tiers
            .iter()
            .flat_map(|t| [t.min_vram_gb, t.hourly_rate])
            .chain(std::iter::once(base_rate))
            .find(|v| !v.is_finite() || *v < 0.0);
        if let Some(value) = invalid {
            return Err(GridRentError::ValidationFailed(format!(
                "tier thresholds and rates must be non-negative numbers, got {}",
                value
            )));
        }

        tiers.sort_by(|a, b| b.min_vram_gb.total_cmp(&a.min_vram_gb));

        for pair in tiers.windows(2) {
            let (higher, lower) = (pair[0], pair[1]);
            if higher.min_vram_gb == lower.min_vram_gb {
                return Err(GridRentError::ValidationFailed(format!(
                    "duplicate tier threshold {} GB",
                    higher.min_vram_gb
                )));
            }
            if higher.hourly_rate <= lower.hourly_rate {
                return Err(GridRentError::ValidationFailed(format!(
                    "tier at {} GB ({}/h) must cost more than tier at {} GB ({}/h)",
                    higher.min_vram_gb, higher.hourly_rate, lower.min_vram_gb, lower.hourly_rate
                )));
            }
        }

        if let Some(lowest) = tiers.last() {
            if base_rate >= lowest.hourly_rate {
                return Err(GridRentError::ValidationFailed(format!(
                    "base rate {}/h must be below the lowest tier rate {}/h",
                    base_rate, lowest.hourly_rate
                )));
            }
        }

        Ok(Self { tiers, base_rate })
    }

    /// Tiers ordered highest threshold first
    pub fn tiers(&self) -> &[RateTier] {
        &self.tiers
    }

    pub fn base_rate(&self) -> f64 {
        self.base_rate
    }

    /// Hourly rate for a VRAM requirement. First matching tier wins.
    pub fn rate_for(&self, min_vram_gb: f64) -> Result<f64> {
        ensure_non_negative("VRAM requirement", min_vram_gb)?;

        Ok(self
            .tiers
            .iter()
            .find(|tier| min_vram_gb >= tier.min_vram_gb)
            .map(|tier| tier.hourly_rate)
            .unwrap_or(self.base_rate))
    }

    /// Estimated total cost: `rate_for(min_vram_gb) * hours`.
    pub fn estimate(&self, min_vram_gb: f64, hours: f64) -> Result<f64> {
        ensure_non_negative("duration", hours)?;
        Ok(self.rate_for(min_vram_gb)? * hours)
    }

    /// Quote a job request against its own budget ceiling.
    pub fn estimate_job(&self, request: &JobRequest) -> Result<CostEstimate> {
        let hours = request.requirements.max_duration;
        let hourly_rate = self.rate_for(request.requirements.min_vram_gb)?;
        ensure_non_negative("duration", hours)?;

        let total = hourly_rate * hours;
        Ok(CostEstimate {
            hourly_rate,
            hours,
            total,
            within_budget: total <= request.max_budget,
        })
    }
}

fn ensure_non_negative(what: &str, value: f64) -> Result<()> {
    if !value.is_finite() || value < 0.0 {
        return Err(GridRentError::PreconditionViolation(format!(
            "{} must be a non-negative number, got {}",
            what, value
        )));
    }
    Ok(())
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct CostEstimate {
    pub hourly_rate: f64,
    pub hours: f64,
    pub total: f64,
    pub within_budget: bool,
}

/// Estimate with the default rate card
pub fn estimate_cost(min_vram_gb: f64, hours: f64) -> Result<f64> {
    TierSchedule::default().estimate(min_vram_gb, hours)
}

pub fn calculate_earnings(hours: f64, rate: f64) -> f64 {
    hours * rate
}

/// What a provider can expect to earn at a given hourly rate
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct EarningsProjection {
    pub hourly_rate: f64,
    pub hours_per_day: f64,
    pub daily: f64,
    pub monthly: f64,
    pub yearly: f64,
}

impl EarningsProjection {
    pub fn from_hourly_rate(hourly_rate: f64, hours_per_day: f64) -> Result<Self> {
        ensure_non_negative("hourly rate", hourly_rate)?;
        ensure_non_negative("hours per day", hours_per_day)?;
        if hours_per_day > 24.0 {
            return Err(GridRentError::PreconditionViolation(format!(
                "hours per day cannot exceed 24, got {}",
                hours_per_day
            )));
        }

        let daily = calculate_earnings(hours_per_day, hourly_rate);
        Ok(Self {
            hourly_rate,
            hours_per_day,
            daily,
            monthly: daily * 30.0,
            yearly: daily * 365.0,
        })
    }
}
