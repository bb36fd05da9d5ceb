use crate::{
    config::Config,
    display::{
        display_earnings, display_json, display_listing_details, display_listings_table,
        display_provider_stats, print_info, print_success, prompt_confirm,
    },
    CliError, ProviderCommands, Result,
};
use clap::Args;
use gridrent_api::GridRentApiClient;
use gridrent_core::models::default_currency;
use gridrent_core::{
    EarningsProjection, ListingDraft, ListingLocation, ListingSpecs, Pricing, RentalWindow,
};
use gridrent_utils::{format_price_in, parse_memory_gb, truncate_address};
use log::{debug, info};

/// Arguments for `gridrent provider register`
#[derive(Args, Debug)]
pub struct RegisterArgs {
    /// Display name for the node
    #[arg(long)]
    pub name: String,

    /// GPU model, e.g. "RTX 4090"
    #[arg(long)]
    pub model: String,

    /// GPU memory, e.g. "24GB"
    #[arg(long)]
    pub vram: String,

    /// CUDA core count
    #[arg(long)]
    pub cores: u32,

    /// System memory, e.g. "64GB"
    #[arg(long)]
    pub memory: String,

    /// Disk space, e.g. "1TB"
    #[arg(long)]
    pub storage: String,

    /// Price per hour
    #[arg(long)]
    pub price: f64,

    /// Currency code (defaults to pricing.currency from config)
    #[arg(long)]
    pub currency: Option<String>,

    #[arg(long)]
    pub country: Option<String>,

    #[arg(long)]
    pub city: Option<String>,

    #[arg(long)]
    pub region: Option<String>,

    /// Shortest rental accepted, in hours
    #[arg(long, default_value_t = 1.0)]
    pub min_hours: f64,

    /// Longest rental accepted, in hours
    #[arg(long, default_value_t = 168.0)]
    pub max_hours: f64,
}

/// Handle `gridrent provider <action>`
pub async fn handle(action: ProviderCommands, config: &Config) -> Result<()> {
    let currency = config.currency();

    // Earnings projection is local; don't require a reachable backend for it
    if let ProviderCommands::Earnings {
        rate,
        hours_per_day,
    } = action
    {
        let projection = project_earnings(rate, hours_per_day, config)?;
        display_earnings(&projection, &currency);
        return Ok(());
    }

    let client = GridRentApiClient::from_config(config)?;

    match action {
        ProviderCommands::Register(args) => {
            let draft = build_draft(&args, &currency)?;
            draft.validate()?;
            debug!("Registering draft: {:?}", draft);

            let listing = client.register_provider(&draft).await?;
            print_success(&format!("Node registered as {}", listing.id));
            display_listing_details(&listing);
        }
        ProviderCommands::Stats => {
            let stats = client.provider_stats().await?;
            display_provider_stats(&stats, &currency);
        }
        ProviderCommands::Nodes => {
            let nodes = client.provider_nodes().await?;
            display_listings_table(&nodes);
        }
        ProviderCommands::Pricing { node, price } => {
            let response = client.update_pricing(&node, price).await?;
            print_success(&format!(
                "Node {} now rents at {}/hr",
                node,
                format_price_in(price, &currency)
            ));
            display_json(&response);
        }
        ProviderCommands::Availability { node, off } => {
            let response = client.update_availability(&node, !off).await?;
            if off {
                print_success(&format!("Node {} is off the market", node));
            } else {
                print_success(&format!("Node {} is available for rent", node));
            }
            display_json(&response);
        }
        ProviderCommands::Heartbeat { node } => {
            let response = client.heartbeat(&node, None).await?;
            info!("Heartbeat sent for node {}", node);
            display_json(&response);
        }
        ProviderCommands::Withdraw {
            amount,
            wallet,
            yes,
        } => {
            let wallet = wallet.or_else(|| config.wallet()).ok_or_else(|| {
                CliError::InvalidInput(
                    "No wallet address. Pass --wallet or run: gridrent config set provider.wallet <ADDRESS>"
                        .to_string(),
                )
            })?;

            let prompt = format!(
                "Withdraw {} to {}?",
                format_price_in(amount, &currency),
                truncate_address(&wallet, 6)
            );
            if !yes && !prompt_confirm(&prompt, false)? {
                print_info("Operation cancelled.");
                return Ok(());
            }

            let response = client.withdraw(amount, &wallet).await?;
            print_success("Withdrawal requested");
            display_json(&response);
        }
        ProviderCommands::Withdrawals => {
            let history = client.withdrawals().await?;
            display_json(&history);
        }
        ProviderCommands::Earnings { .. } => {}
    }

    Ok(())
}

/// Project earnings, falling back to `provider.hours_per_day` from config
pub fn project_earnings(
    rate: f64,
    hours_per_day: Option<f64>,
    config: &Config,
) -> Result<EarningsProjection> {
    let hours = hours_per_day.unwrap_or_else(|| config.hours_per_day());
    Ok(EarningsProjection::from_hourly_rate(rate, hours)?)
}

/// Build a registration draft from command-line arguments
pub fn build_draft(args: &RegisterArgs, configured_currency: &str) -> Result<ListingDraft> {
    let memory = |field: &str, value: &str| {
        parse_memory_gb(value).map_err(|e| {
            CliError::InvalidInput(format!("Invalid {} '{}': {}", field, value, e))
        })
    };

    let specs = ListingSpecs {
        model: args.model.trim().to_string(),
        vram_gb: memory("VRAM", &args.vram)?,
        cores: args.cores,
        memory_gb: memory("memory", &args.memory)?,
        storage_gb: memory("storage", &args.storage)?,
    };

    let location = match (&args.country, &args.city, &args.region) {
        (None, None, None) => None,
        (country, city, region) => Some(ListingLocation {
            country: country.clone().unwrap_or_default(),
            city: city.clone().unwrap_or_default(),
            region: region.clone().unwrap_or_default(),
        }),
    };

    let currency = match &args.currency {
        Some(code) => code.trim().to_ascii_uppercase(),
        None if configured_currency.is_empty() => default_currency(),
        None => configured_currency.to_string(),
    };

    Ok(ListingDraft {
        name: args.name.trim().to_string(),
        specs,
        location,
        pricing: Pricing {
            price_per_hour: args.price,
            currency,
        },
        rental_window: RentalWindow {
            max_duration: args.max_hours,
            min_duration: args.min_hours,
            scheduled_downtime: Vec::new(),
        },
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn register_args() -> RegisterArgs {
        RegisterArgs {
            name: "rig-01".to_string(),
            model: "RTX 4090".to_string(),
            vram: "24GB".to_string(),
            cores: 16384,
            memory: "64GB".to_string(),
            storage: "1TB".to_string(),
            price: 0.85,
            currency: None,
            country: Some("USA".to_string()),
            city: None,
            region: Some("NA".to_string()),
            min_hours: 1.0,
            max_hours: 168.0,
        }
    }

    #[test]
    fn test_build_draft_parses_sizes() {
        let draft = build_draft(&register_args(), "EUR").unwrap();

        assert_eq!(draft.specs.vram_gb, 24.0);
        assert_eq!(draft.specs.memory_gb, 64.0);
        assert_eq!(draft.specs.storage_gb, 1024.0);
        assert_eq!(draft.pricing.currency, "EUR");

        let location = draft.location.as_ref().unwrap();
        assert_eq!(location.country, "USA");
        assert_eq!(location.city, "");
        draft.validate().unwrap();
    }

    #[test]
    fn test_build_draft_without_location_and_explicit_currency() {
        let mut args = register_args();
        args.country = None;
        args.region = None;
        args.currency = Some("usd".to_string());

        let draft = build_draft(&args, "EUR").unwrap();
        assert!(draft.location.is_none());
        assert_eq!(draft.pricing.currency, "USD");
    }

    #[test]
    fn test_build_draft_rejects_bad_sizes_and_windows() {
        let mut args = register_args();
        args.vram = "huge".to_string();
        assert!(matches!(
            build_draft(&args, "USD"),
            Err(CliError::InvalidInput(_))
        ));

        let mut args = register_args();
        args.min_hours = 200.0;
        assert!(build_draft(&args, "USD").unwrap().validate().is_err());
    }

    #[test]
    fn test_project_earnings_uses_configured_hours() {
        let dir = TempDir::new().unwrap();
        let mut config = Config::load_from(dir.path().join("config.toml")).unwrap();

        let projection = project_earnings(2.0, None, &config).unwrap();
        assert_eq!(projection.daily, 16.0);
        assert_eq!(projection.monthly, 480.0);
        assert_eq!(projection.yearly, 5840.0);

        config.set_value("provider.hours_per_day", "12").unwrap();
        assert_eq!(project_earnings(2.0, None, &config).unwrap().daily, 24.0);
        assert_eq!(project_earnings(2.0, Some(24.0), &config).unwrap().daily, 48.0);
        assert!(project_earnings(2.0, Some(25.0), &config).is_err());
    }

    #[tokio::test]
    async fn test_earnings_needs_no_backend() {
        let dir = TempDir::new().unwrap();
        let config = Config::load_from(dir.path().join("config.toml")).unwrap();

        handle(
            ProviderCommands::Earnings {
                rate: 1.5,
                hours_per_day: Some(8.0),
            },
            &config,
        )
        .await
        .unwrap();
    }
}
