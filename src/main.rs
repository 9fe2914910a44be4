//! fixazurerm - Azure Resource Manager provider bootstrap
//!
//! This is the main entry point for the fixazurerm CLI.

mod cli;

use anyhow::{Context, Result};
use cli::{Cli, Commands};
use fixazurerm::config::ProviderConfig;
use fixazurerm::logging::{LogLevel, LoggingBuilder};

#[tokio::main]
async fn main() -> Result<()> {
    // Parse command line arguments
    let cli = Cli::parse_args();

    // Load configuration, filling gaps from ARM_* variables
    let config = match ProviderConfig::load(cli.config.as_deref()) {
        Ok(config) => config,
        Err(e) => {
            init_logging(&cli, &ProviderConfig::default())?;
            eprintln!("Error: {}", e);
            std::process::exit(e.exit_code());
        }
    };

    init_logging(&cli, &config)?;

    let exit_code = match &cli.command {
        Commands::Validate => cli::run_validate(&config),
        Commands::Configure => cli::run_configure(&config).await,
        Commands::Catalog => cli::run_catalog(),
    };

    std::process::exit(exit_code);
}

/// Initialize logging from the config file, letting command line flags win
fn init_logging(cli: &Cli, config: &ProviderConfig) -> Result<()> {
    let mut builder = LoggingBuilder::from_config(config.logging.clone());

    if cli.verbosity() > 0 {
        builder = builder.with_level(LogLevel::from_verbosity(cli.verbosity()));
    }
    if let Some(format) = cli.log_format {
        builder = builder.with_format(format);
    }

    builder.init().context("failed to initialize logging")
}
