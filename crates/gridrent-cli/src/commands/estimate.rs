use crate::{
    config::Config,
    display::{display_estimate, Table},
    CliError, Result,
};
use clap::Args;
use gridrent_core::{CostEstimate, TierSchedule};
use gridrent_utils::{format_price_in, parse_memory_gb};
use log::debug;

/// Quote a job without submitting it.
///
/// ```bash
/// gridrent estimate --vram 24GB --hours 72
/// gridrent estimate --vram 40 --hours 10 --budget 40
/// gridrent estimate --tiers
/// ```
#[derive(Args, Debug, Default)]
pub struct EstimateArgs {
    /// Minimum VRAM the job needs, e.g. "24GB" or "16"
    #[arg(long, default_value = "16")]
    pub vram: String,

    /// Expected runtime in hours
    #[arg(long, default_value_t = 24.0)]
    pub hours: f64,

    /// Compare the estimate against this budget
    #[arg(long)]
    pub budget: Option<f64>,

    /// Print the rate card instead of a quote
    #[arg(long)]
    pub tiers: bool,
}

pub fn handle(args: EstimateArgs, config: &Config) -> Result<()> {
    let schedule = config.tier_schedule()?;
    let currency = config.currency();

    if args.tiers {
        display_tiers(&schedule, &currency);
        return Ok(());
    }

    let min_vram_gb = parse_memory_gb(&args.vram).map_err(|e| {
        CliError::InvalidInput(format!("Invalid VRAM '{}': {}", args.vram, e))
    })?;
    let estimate = quote(&schedule, min_vram_gb, args.hours, args.budget)?;
    debug!("Estimate: {:?}", estimate);

    display_estimate(&estimate, min_vram_gb, args.budget, &currency);
    Ok(())
}

/// Price `hours` at the tier matching `min_vram_gb`. Without a budget the
/// estimate counts as affordable.
pub fn quote(
    schedule: &TierSchedule,
    min_vram_gb: f64,
    hours: f64,
    budget: Option<f64>,
) -> Result<CostEstimate> {
    if let Some(budget) = budget {
        if !budget.is_finite() || budget < 0.0 {
            return Err(CliError::InvalidInput(format!(
                "Budget must be a non-negative number, got {}",
                budget
            )));
        }
    }

    let hourly_rate = schedule.rate_for(min_vram_gb)?;
    let total = schedule.estimate(min_vram_gb, hours)?;

    Ok(CostEstimate {
        hourly_rate,
        hours,
        total,
        within_budget: budget.map_or(true, |b| total <= b),
    })
}

fn display_tiers(schedule: &TierSchedule, currency: &str) {
    let mut table = Table::new(["Minimum VRAM", "Rate"]);
    for tier in schedule.tiers() {
        table.add_row(vec![
            format!("{}GB+", tier.min_vram_gb),
            format!("{}/hr", format_price_in(tier.hourly_rate, currency)),
        ]);
    }
    table.add_row(vec![
        "anything else".to_string(),
        format!("{}/hr", format_price_in(schedule.base_rate(), currency)),
    ]);
    table.print();
}
