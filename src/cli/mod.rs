//! CLI module for fixazurerm
//!
//! Argument parsing and subcommand dispatch for the `fixazurerm` binary.

use clap::{Parser, Subcommand};
use std::path::PathBuf;

use fixazurerm::client::ArmClient;
use fixazurerm::config::ProviderConfig;
use fixazurerm::error::Error;
use fixazurerm::logging::LogFormat;
use fixazurerm::provider::ConfiguredProvider;
use fixazurerm::registration::RegistrationCatalog;
use fixazurerm::validate::validate;

/// fixazurerm - Azure Resource Manager provider bootstrap
///
/// Validates service principal credentials, authenticates against Azure and
/// registers the resource providers the subscription needs.
#[derive(Parser, Debug, Clone)]
#[command(name = "fixazurerm")]
#[command(version)]
#[command(about = "Azure Resource Manager provider bootstrap", long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Commands,

    /// Verbosity level (-v, -vv, -vvv)
    #[arg(short = 'v', long, global = true, action = clap::ArgAction::Count)]
    pub verbose: u8,

    /// Log output format (pretty, compact, json)
    #[arg(long, global = true)]
    pub log_format: Option<LogFormat>,

    /// Path to configuration file
    #[arg(short = 'c', long, global = true, env = "FIXAZURERM_CONFIG")]
    pub config: Option<PathBuf>,
}

/// Available subcommands
#[derive(Subcommand, Debug, Clone)]
pub enum Commands {
    /// Check that every required credential is present
    Validate,

    /// Authenticate and register resource providers
    Configure,

    /// List the resource provider namespaces that get registered
    Catalog,
}

impl Cli {
    /// Parse command line arguments
    pub fn parse_args() -> Self {
        Self::parse()
    }

    /// Get the verbosity level
    pub fn verbosity(&self) -> u8 {
        self.verbose
    }
}

/// Print every credential violation. Returns the process exit code.
pub fn run_validate(config: &ProviderConfig) -> i32 {
    let result = validate(&config.credentials());
    if result.is_valid() {
        println!("Configuration is valid");
        return 0;
    }

    eprintln!("{}", result);
    Error::Configuration(result).exit_code()
}

/// Run the full bootstrap. Returns the process exit code.
pub async fn run_configure(config: &ProviderConfig) -> i32 {
    match fixazurerm::provider::configure(config).await {
        Ok(provider) => {
            print_configured(&provider);
            0
        }
        Err(e) => {
            eprintln!("Error: {}", e);
            e.exit_code()
        }
    }
}

fn print_configured(provider: &ConfiguredProvider<ArmClient>) {
    let client = provider.client();
    println!(
        "Provider configured for subscription {} ({} resource providers registered)",
        client.subscription_id(),
        RegistrationCatalog::standard().len()
    );
}

/// Print the registration catalog, one namespace per line.
pub fn run_catalog() -> i32 {
    for namespace in RegistrationCatalog::standard().iter() {
        println!("{}", namespace);
    }
    0
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_global_flags_after_subcommand() {
        let cli = Cli::try_parse_from([
            "fixazurerm",
            "configure",
            "-vv",
            "--log-format",
            "json",
            "-c",
            "provider.toml",
        ])
        .unwrap();

        assert!(matches!(cli.command, Commands::Configure));
        assert_eq!(cli.verbosity(), 2);
        assert_eq!(cli.log_format, Some(LogFormat::Json));
        assert_eq!(cli.config, Some(PathBuf::from("provider.toml")));
    }

    #[test]
    fn test_unknown_log_format_is_rejected() {
        let result = Cli::try_parse_from(["fixazurerm", "catalog", "--log-format", "xml"]);
        assert!(result.is_err());
    }
}
