//! # GridRent CLI
//!
//! Command-line interface for the GridRent GPU marketplace.
//! This crate provides the CLI structure, argument parsing, and command routing.

pub mod commands;
pub mod config;
pub mod display;

// Re-export common types
pub use config::Config;

use clap::{Parser, Subcommand};
use thiserror::Error;

/// Application-level errors for the CLI
#[derive(Error, Debug)]
pub enum CliError {
    #[error("Core domain error: {0}")]
    Core(#[from] gridrent_core::GridRentError),

    #[error("API error: {0}")]
    Api(#[from] gridrent_api::ApiError),

    #[error("Utils error: {0}")]
    Utils(#[from] gridrent_utils::UtilsError),

    #[error("Config error: {0}")]
    Config(#[from] crate::config::ConfigError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serde(#[from] serde_json::Error),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Operation failed: {0}")]
    OperationFailed(String),
}

impl From<dialoguer::Error> for CliError {
    fn from(err: dialoguer::Error) -> Self {
        CliError::OperationFailed(format!("Input error: {}", err))
    }
}

pub type Result<T> = std::result::Result<T, CliError>;

/// Main CLI struct
#[derive(Parser)]
#[command(name = "gridrent")]
#[command(about = "Browse, price and rent GPUs on the GridRent marketplace")]
#[command(version)]
pub struct Cli {
    /// Increase log verbosity (-v debug, -vv trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    #[command(subcommand)]
    pub command: Commands,
}

/// All available CLI commands
#[derive(Subcommand)]
pub enum Commands {
    /// List and filter GPU listings
    Ls(commands::ls::LsArgs),
    /// Inspect or reserve a single GPU listing
    Gpu {
        #[command(subcommand)]
        action: GpuCommands,
    },
    /// Estimate the cost of a workload
    Estimate(commands::estimate::EstimateArgs),
    /// Submit a job to the marketplace
    Submit(commands::submit::SubmitArgs),
    /// Manage your jobs
    Jobs {
        #[command(subcommand)]
        action: JobCommands,
    },
    /// Provider operations for GPU owners
    Provider {
        #[command(subcommand)]
        action: ProviderCommands,
    },
    /// Configuration management
    Config {
        #[command(subcommand)]
        action: ConfigCommands,
    },
    /// Check that the marketplace API is reachable
    Ping,
}

#[derive(Subcommand)]
pub enum GpuCommands {
    /// Show full details of a listing
    Show {
        /// Listing ID
        id: String,
    },
    /// Show a listing's availability calendar
    Availability {
        /// Listing ID
        id: String,
        /// Days ahead to look
        #[arg(long, default_value_t = 7)]
        days: u32,
    },
    /// Reserve a listing
    Reserve {
        /// Listing ID
        id: String,
        /// Rental duration in hours
        #[arg(long)]
        hours: f64,
        /// Attach the reservation to an existing job
        #[arg(long)]
        job: Option<String>,
        /// Skip confirmation
        #[arg(short, long)]
        yes: bool,
    },
}

#[derive(Subcommand)]
pub enum JobCommands {
    /// List your jobs
    List {
        /// Page number, starting at 1
        #[arg(long, default_value_t = 1)]
        page: u32,
        /// Jobs per page
        #[arg(long, default_value_t = 10)]
        limit: u32,
    },
    /// Show job details
    Show {
        /// Job ID
        id: String,
    },
    /// Cancel a job
    Cancel {
        /// Job ID
        id: String,
        /// Skip confirmation
        #[arg(short, long)]
        yes: bool,
    },
    /// Print job logs
    Logs {
        /// Job ID
        id: String,
    },
    /// Confirm completion and release payment
    Confirm {
        /// Job ID
        id: String,
        /// Skip confirmation
        #[arg(short, long)]
        yes: bool,
    },
    /// Dispute a job's outcome
    Dispute {
        /// Job ID
        id: String,
        /// Reason for the dispute
        #[arg(short, long)]
        reason: String,
    },
    /// Retry a failed job
    Retry {
        /// Job ID
        id: String,
    },
}

#[derive(Subcommand)]
pub enum ProviderCommands {
    /// Register a GPU node
    Register(commands::provider::RegisterArgs),
    /// Show provider statistics
    Stats,
    /// List your registered nodes
    Nodes,
    /// Change a node's hourly price
    Pricing {
        /// Node ID
        node: String,
        /// New price per hour
        price: f64,
    },
    /// Mark a node available or unavailable
    Availability {
        /// Node ID
        node: String,
        /// Take the node off the market
        #[arg(long)]
        off: bool,
    },
    /// Report a node as alive
    Heartbeat {
        /// Node ID
        node: String,
    },
    /// Withdraw earnings to a wallet
    Withdraw {
        /// Amount to withdraw
        amount: f64,
        /// Wallet address (defaults to provider.wallet from config)
        #[arg(short, long)]
        wallet: Option<String>,
        /// Skip confirmation
        #[arg(short, long)]
        yes: bool,
    },
    /// Show withdrawal history
    Withdrawals,
    /// Project earnings for an hourly rate
    Earnings {
        /// Price per hour
        #[arg(long)]
        rate: f64,
        /// Rented hours per day
        #[arg(long)]
        hours_per_day: Option<f64>,
    },
}

#[derive(Subcommand)]
pub enum ConfigCommands {
    /// Show current configuration
    Show,
    /// Get configuration value
    Get {
        /// Configuration key, e.g. api.base_url
        key: String,
    },
    /// Set configuration value
    Set {
        /// Configuration key
        key: String,
        /// Configuration value
        value: String,
    },
    /// Remove a configuration value
    Unset {
        /// Configuration key
        key: String,
    },
    /// Print the configuration file path
    Path,
}

/// Main CLI runner
pub async fn run(cli: Cli) -> Result<()> {
    let mut config = Config::new()?;

    match cli.command {
        Commands::Ls(args) => commands::ls::handle(args, &config).await,
        Commands::Gpu { action } => commands::gpu::handle(action, &config).await,
        Commands::Estimate(args) => commands::estimate::handle(args, &config),
        Commands::Submit(args) => commands::submit::handle(args, &config).await,
        Commands::Jobs { action } => commands::jobs::handle(action, &config).await,
        Commands::Provider { action } => commands::provider::handle(action, &config).await,
        Commands::Config { action } => commands::config::handle(action, &mut config),
        Commands::Ping => {
            let client = gridrent_api::GridRentApiClient::from_config(&config)?;
            let url = client.base_url().to_string();
            if gridrent_api::Marketplace::new(client).test_connection().await? {
                display::print_success(&format!("Connected to {}", url));
                Ok(())
            } else {
                Err(CliError::OperationFailed(format!("{} is not reachable", url)))
            }
        }
    }
}
