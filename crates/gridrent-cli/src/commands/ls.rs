use crate::{
    config::Config,
    display::{
        display_listings_compact, display_listings_table, display_model_summary, print_info,
        print_success,
    },
    CliError, Result,
};
use clap::Args;
use gridrent_api::{GridRentApiClient, Marketplace};
use gridrent_core::{
    filter_listings, summarize_by_model, FilterCriteria, Listing, Page, SortDirection, SortKey,
};
use gridrent_utils::{parse_price_range, parse_statuses, parse_vram_range};
use log::{debug, warn};
use std::fs;
use std::path::{Path, PathBuf};

/// Command-line arguments for the `ls` command that lists and filters GPU listings.
///
/// # Examples
/// ```bash
/// # Everything on the marketplace
/// gridrent ls
///
/// # Free-text search across model, provider and location
/// gridrent ls singapore
///
/// # Online A100s or H100s under $3/hr, cheapest first
/// gridrent ls --model A100 --model H100 --price -3 --status online --sort price
///
/// # Work offline against a saved snapshot and export the result
/// gridrent ls --catalog snapshot.json --vram 24GB- --export picks.csv
/// ```
///
/// All filters are AND-combined; a filter left out does not constrain.
#[derive(Args, Debug, Default)]
pub struct LsArgs {
    /// Case-insensitive text matched against GPU model, provider name and location
    #[arg(value_name = "SEARCH")]
    pub search: Option<String>,

    /// Price range per hour, inclusive: "0.5-2.0", "0.5-" or "-2.0"
    #[arg(short, long, allow_hyphen_values = true)]
    pub price: Option<String>,

    /// VRAM range, inclusive: "24-80", "24GB-" or "-16GB"
    #[arg(long, allow_hyphen_values = true)]
    pub vram: Option<String>,

    /// Allowed GPU model (repeatable)
    #[arg(short, long = "model")]
    pub models: Vec<String>,

    /// Allowed country or region code (repeatable)
    #[arg(short, long = "location")]
    pub locations: Vec<String>,

    /// Allowed status: online, offline, busy, maintenance (repeatable)
    #[arg(short, long = "status")]
    pub statuses: Vec<String>,

    /// Minimum uptime percentage
    #[arg(long)]
    pub min_uptime: Option<f64>,

    /// Sort results by this key
    #[arg(long, value_enum)]
    pub sort: Option<SortBy>,

    /// Sort descending instead of ascending
    #[arg(long)]
    pub desc: bool,

    /// Show at most this many results, after sorting
    #[arg(long)]
    pub limit: Option<usize>,

    /// Display format for the results
    #[arg(long, value_enum, default_value = "table")]
    pub format: DisplayFormat,

    /// Read listings from a JSON file instead of the marketplace API
    #[arg(long, value_name = "FILE")]
    pub catalog: Option<PathBuf>,

    /// Export results to a .json or .csv file
    #[arg(long, value_name = "FILE")]
    pub export: Option<PathBuf>,
}

/// Display format options for listings
#[derive(clap::ValueEnum, Clone, Copy, Debug, Default, PartialEq)]
pub enum DisplayFormat {
    /// Structured table with all key columns
    #[default]
    Table,
    /// One line per listing
    Compact,
    /// Counts and price ranges per GPU model
    Summary,
}

#[derive(clap::ValueEnum, Clone, Copy, Debug, PartialEq)]
pub enum SortBy {
    Price,
    Rating,
    Uptime,
}

impl From<SortBy> for SortKey {
    fn from(sort: SortBy) -> Self {
        match sort {
            SortBy::Price => SortKey::Price,
            SortBy::Rating => SortKey::Rating,
            SortBy::Uptime => SortKey::Uptime,
        }
    }
}

/// Handles the `ls` command.
///
/// Builds a `FilterCriteria` from the arguments, refuses inverted ranges,
/// loads the catalog (API snapshot or `--catalog` file), filters and sorts it
/// locally, then exports and displays the result.
pub async fn handle(args: LsArgs, config: &Config) -> Result<()> {
    let criteria = build_criteria(&args)?;
    criteria.validate()?;
    debug!("Filter criteria: {:?}", criteria);

    let mut listings = match &args.catalog {
        Some(path) => {
            let catalog = read_catalog(path)?;
            debug!("Loaded {} listings from {}", catalog.len(), path.display());
            filter_listings(&catalog, &criteria)
        }
        None => {
            let client = GridRentApiClient::from_config(config)?;
            Marketplace::new(client).search(&criteria).await?
        }
    };
    debug!("{} listings after filtering", listings.len());

    if let Some(limit) = args.limit {
        debug!("Limiting results to {} listings", limit);
        listings.truncate(limit);
    }

    if let Some(export_path) = &args.export {
        export_results(&listings, export_path)?;
        print_success(&format!("Results exported to: {}", export_path.display()));
    }

    match args.format {
        DisplayFormat::Table => display_listings_table(&listings),
        DisplayFormat::Compact => display_listings_compact(&listings),
        DisplayFormat::Summary => {
            display_model_summary(&summarize_by_model(&listings), &config.currency())
        }
    }

    show_filter_summary(&args, listings.len());

    Ok(())
}

/// Translate command-line arguments into filter criteria
pub fn build_criteria(args: &LsArgs) -> Result<FilterCriteria> {
    let mut criteria = FilterCriteria::new();

    if let Some(search) = &args.search {
        criteria = criteria.with_search(search.as_str());
    }

    if let Some(price) = &args.price {
        let (min, max) = parse_price_range(price).map_err(|e| {
            CliError::InvalidInput(format!(
                "Invalid price range '{}'. Use format like '0.5-2.0': {}",
                price, e
            ))
        })?;
        criteria = criteria.with_price(min, max);
    }

    if let Some(vram) = &args.vram {
        let (min, max) = parse_vram_range(vram).map_err(|e| {
            CliError::InvalidInput(format!(
                "Invalid VRAM range '{}'. Use format like '24-80': {}",
                vram, e
            ))
        })?;
        criteria = criteria.with_vram(min, max);
    }

    criteria = criteria
        .with_models(args.models.iter().cloned())
        .with_locations(args.locations.iter().cloned())
        .with_statuses(parse_statuses(args.statuses.as_slice())?);

    if let Some(uptime) = args.min_uptime {
        criteria = criteria.with_min_uptime(uptime);
    }

    if let Some(sort) = args.sort {
        let direction = if args.desc {
            SortDirection::Descending
        } else {
            SortDirection::Ascending
        };
        criteria = criteria.sorted_by(sort.into(), direction);
    } else if args.desc {
        warn!("--desc has no effect without --sort");
    }

    Ok(criteria)
}

/// Read a listing snapshot: either a bare JSON array or a paginated response.
/// Listings that break the marketplace invariants are skipped with a warning.
pub fn read_catalog(path: &Path) -> Result<Vec<Listing>> {
    let content = fs::read_to_string(path)?;
    let value: serde_json::Value = serde_json::from_str(&content)?;

    let listings: Vec<Listing> = if value.is_array() {
        serde_json::from_value(value)?
    } else {
        serde_json::from_value::<Page<Listing>>(value)?.items
    };

    let total = listings.len();
    let valid: Vec<Listing> = listings
        .into_iter()
        .filter(|listing| match listing.validate() {
            Ok(()) => true,
            Err(e) => {
                warn!("Skipping listing from {}: {}", path.display(), e);
                false
            }
        })
        .collect();

    if valid.len() < total {
        print_info(&format!(
            "Skipped {} invalid listing(s) in {}",
            total - valid.len(),
            path.display()
        ));
    }

    Ok(valid)
}

fn csv_field(value: &str) -> String {
    if value.contains(&[',', '"', '\n'][..]) {
        format!("\"{}\"", value.replace('"', "\"\""))
    } else {
        value.to_string()
    }
}

pub fn export_results(listings: &[Listing], export_path: &Path) -> Result<()> {
    let extension = export_path
        .extension()
        .and_then(|ext| ext.to_str())
        .map(str::to_ascii_lowercase);

    let content = match extension.as_deref() {
        Some("json") => serde_json::to_string_pretty(listings)?,
        Some("csv") => {
            let mut csv = String::from(
                "ID,Name,GPU Model,VRAM GB,Price per Hour,Currency,Country,City,Region,Uptime,Rating,Provider,Status\n",
            );
            for listing in listings {
                let row = [
                    csv_field(&listing.id),
                    csv_field(&listing.name),
                    csv_field(&listing.specs.model),
                    listing.specs.vram_gb.to_string(),
                    listing.price_per_hour().to_string(),
                    csv_field(&listing.pricing.currency),
                    csv_field(&listing.location.country),
                    csv_field(&listing.location.city),
                    csv_field(&listing.location.region),
                    listing.performance.uptime.to_string(),
                    listing.performance.rating.to_string(),
                    csv_field(&listing.owner.name),
                    listing.status.to_string(),
                ];
                csv.push_str(&row.join(","));
                csv.push('\n');
            }
            csv
        }
        _ => {
            return Err(CliError::InvalidInput(
                "Export format must be .json or .csv".to_string(),
            ))
        }
    };

    fs::write(export_path, content)
        .map_err(|e| CliError::OperationFailed(format!("Failed to write export file: {}", e)))?;
    Ok(())
}

fn show_filter_summary(args: &LsArgs, shown: usize) {
    let mut filters = Vec::new();

    if let Some(search) = &args.search {
        filters.push(format!("Search: \"{}\"", search));
    }
    if let Some(price) = &args.price {
        filters.push(format!("Price: {}/hr", price));
    }
    if let Some(vram) = &args.vram {
        filters.push(format!("VRAM: {}", vram));
    }
    if !args.models.is_empty() {
        filters.push(format!("GPU: {}", args.models.join("|")));
    }
    if !args.locations.is_empty() {
        filters.push(format!("Location: {}", args.locations.join("|")));
    }
    if !args.statuses.is_empty() {
        filters.push(format!("Status: {}", args.statuses.join("|")));
    }
    if let Some(uptime) = args.min_uptime {
        filters.push(format!("Uptime >= {}%", uptime));
    }
    if let Some(limit) = args.limit {
        filters.push(format!("Limit: {}", limit));
    }

    if !filters.is_empty() {
        println!();
        println!("Filters applied: {}", filters.join(", "));
    }
    if let Some(sort) = args.sort {
        println!(
            "Sort: {:?} ({})",
            sort,
            if args.desc { "descending" } else { "ascending" }
        );
    }
    debug!("Displayed {} listings", shown);
}
