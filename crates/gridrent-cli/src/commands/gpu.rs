use crate::{
    config::Config,
    display::{display_json, display_listing_details, print_info, print_success, prompt_confirm},
    CliError, GpuCommands, Result,
};
use chrono::{Duration, Utc};
use gridrent_api::{GridRentApiClient, Marketplace};
use gridrent_core::Listing;
use gridrent_utils::{format_hours, format_price_in};

/// Handle `gridrent gpu <action>`
pub async fn handle(action: GpuCommands, config: &Config) -> Result<()> {
    let market = Marketplace::new(GridRentApiClient::from_config(config)?);

    match action {
        GpuCommands::Show { id } => {
            let listing = market.listing(&id).await?;
            display_listing_details(&listing);
        }
        GpuCommands::Availability { id, days } => {
            if days == 0 {
                return Err(CliError::InvalidInput(
                    "--days must be at least 1".to_string(),
                ));
            }
            let start = Utc::now();
            let end = start + Duration::days(i64::from(days));
            let calendar = market.client().get_availability(&id, start, end).await?;
            display_json(&calendar);
        }
        GpuCommands::Reserve {
            id,
            hours,
            job,
            yes,
        } => {
            let listing = market.listing(&id).await?;
            check_rental_window(&listing, hours)?;

            let prompt = format!(
                "Reserve {} ({}) for {} at about {}?",
                listing.name,
                listing.specs.model,
                format_hours(hours),
                format_price_in(listing.price_per_hour() * hours, &listing.pricing.currency)
            );
            if !yes && !prompt_confirm(&prompt, true)? {
                print_info("Operation cancelled.");
                return Ok(());
            }

            let response = market
                .client()
                .reserve_listing(&id, hours, job.as_deref())
                .await?;
            print_success(&format!("Reserved {} for {}", listing.name, format_hours(hours)));
            display_json(&response);
        }
    }

    Ok(())
}

/// Refuse durations outside the listing's rental window, including NaN
pub fn check_rental_window(listing: &Listing, hours: f64) -> Result<()> {
    let window = &listing.rental_window;
    if !(window.min_duration..=window.max_duration).contains(&hours) {
        return Err(CliError::InvalidInput(format!(
            "{} rents for {} to {}, not {}",
            listing.name,
            format_hours(window.min_duration),
            format_hours(window.max_duration),
            format_hours(hours)
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn listing() -> Listing {
        serde_json::from_value(json!({
            "id": "gpu-1",
            "name": "rig-01",
            "specs": {"model": "RTX 4090", "vram": 24, "cores": 16384, "memory": 64, "storage": 1000},
            "location": {"country": "USA", "city": "Austin", "region": "NA"},
            "performance": {"uptime": 99.0, "avgResponseTime": 50, "completedJobs": 10, "rating": 4.5},
            "pricing": {"pricePerHour": 0.85, "currency": "USD"},
            "status": "online",
            "provider": {"id": "p-1", "name": "TechMiner", "walletAddress": "0xabc", "reputation": 4.8},
            "availability": {"maxDuration": 72, "minDuration": 2}
        }))
        .unwrap()
    }

    #[test]
    fn test_rental_window_bounds_are_inclusive() {
        let listing = listing();
        assert!(check_rental_window(&listing, 2.0).is_ok());
        assert!(check_rental_window(&listing, 72.0).is_ok());
        assert!(check_rental_window(&listing, 1.5).is_err());
        assert!(check_rental_window(&listing, 73.0).is_err());
    }

    #[test]
    fn test_rental_window_rejects_nan() {
        match check_rental_window(&listing(), f64::NAN) {
            Err(CliError::InvalidInput(message)) => assert!(message.contains("rig-01")),
            other => panic!("unexpected result: {:?}", other),
        }
    }
}
