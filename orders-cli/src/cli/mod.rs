//! Command-line interface

pub mod commands;
pub mod output;

use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};

use crate::config::{Config, LoadedConfig};
use crate::district::{DistrictResolver, load_resolver};
use crate::session::Session;
use crate::storage::open_storage;
use commands::config::ConfigCommands;
use commands::districts::{MapArgs, ResolveArgs};
use commands::records::{AddArgs, DeleteArgs, EditArgs, ListArgs, SearchArgs};

#[derive(Parser)]
#[command(name = "orders-cli")]
#[command(about = "Manage parasite test orders and map cases by district (powiat)")]
#[command(version)]
pub struct Cli {
    /// Configuration file (default: $ORDERS_CLI_CONFIG, then the user config dir)
    #[arg(long, global = true, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// More log output (-v info, -vv debug)
    #[arg(long, short = 'v', global = true, action = clap::ArgAction::Count)]
    pub verbose: u8,

    /// Disable colored output
    #[arg(long, global = true)]
    pub no_color: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Show all records
    List(ListArgs),
    /// Find records by order number (case-insensitive substring)
    Search(SearchArgs),
    /// Add a record
    Add(AddArgs),
    /// Change fields of the record with the given test number
    Edit(EditArgs),
    /// Delete records by test number or order number
    Delete(DeleteArgs),
    /// Fill blank districts from postal codes and save
    Backfill,
    /// Look up the district of one or more postal codes
    Resolve(ResolveArgs),
    /// Case counts per district, with coordinates for plotting
    Map(MapArgs),
    /// Inspect the configuration
    #[command(subcommand)]
    Config(ConfigCommands),
}

/// Everything a command needs, built once per invocation
pub struct AppContext {
    pub config: Config,
    pub config_source: Option<PathBuf>,
    pub http: reqwest::Client,
}

impl AppContext {
    pub fn new(loaded: LoadedConfig) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(loaded.config.http.timeout_secs))
            .user_agent(concat!("orders-cli/", env!("CARGO_PKG_VERSION")))
            .build()
            .context("Failed to build HTTP client")?;
        Ok(Self {
            config: loaded.config,
            config_source: loaded.source,
            http,
        })
    }

    /// Connect to the configured storage
    pub async fn open_session(&self) -> Result<Session> {
        let storage = open_storage(&self.config.storage, &self.http)
            .await
            .context("Failed to open storage")?;
        log::debug!("Storage: {}", storage.describe());
        Ok(Session::new(storage, self.config.ingest.clone()))
    }

    pub async fn resolver(&self) -> DistrictResolver {
        load_resolver(&self.config.geocoder, &self.http).await
    }
}

pub async fn run(cli: Cli) -> Result<()> {
    let loaded = Config::load(cli.config.as_deref())?;
    if let Some(ref source) = loaded.source {
        log::info!("Using config {}", source.display());
    }
    let ctx = AppContext::new(loaded)?;

    match cli.command {
        Commands::List(args) => commands::records::handle_list(&ctx, args).await,
        Commands::Search(args) => commands::records::handle_search(&ctx, args).await,
        Commands::Add(args) => commands::records::handle_add(&ctx, args).await,
        Commands::Edit(args) => commands::records::handle_edit(&ctx, args).await,
        Commands::Delete(args) => commands::records::handle_delete(&ctx, args).await,
        Commands::Backfill => commands::districts::handle_backfill(&ctx).await,
        Commands::Resolve(args) => commands::districts::handle_resolve(&ctx, args).await,
        Commands::Map(args) => commands::districts::handle_map(&ctx, args).await,
        Commands::Config(command) => commands::config::handle_config_command(&ctx, command),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::records::{DeleteKey, Parasite};
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_add_with_flags() {
        let cli = Cli::try_parse_from([
            "orders-cli",
            "-vv",
            "add",
            "--test-number",
            "B-7",
            "--postal-code",
            "31042",
            "--oxyuris",
            "1",
        ])
        .unwrap();
        assert_eq!(cli.verbose, 2);
        let Commands::Add(args) = cli.command else {
            panic!("expected add");
        };
        assert_eq!(args.test_number, "B-7");
        assert_eq!(args.fields.flags(), [None, Some(1), None, None]);
    }

    #[test]
    fn test_flag_values_are_restricted() {
        assert!(
            Cli::try_parse_from(["orders-cli", "add", "--test-number", "B", "--oxyuris", "2"])
                .is_err()
        );
    }

    #[test]
    fn test_parse_delete_and_map() {
        let cli = Cli::try_parse_from(["orders-cli", "delete", "Z-1", "--by", "order-number", "-y"])
            .unwrap();
        let Commands::Delete(args) = cli.command else {
            panic!("expected delete");
        };
        assert_eq!(args.by, DeleteKey::OrderNumber);
        assert!(args.yes);

        let cli = Cli::try_parse_from(["orders-cli", "map", "--parasite", "strongyloides"]).unwrap();
        let Commands::Map(args) = cli.command else {
            panic!("expected map");
        };
        assert_eq!(args.parasite, Parasite::Strongyloides);
        assert!(!args.keep_zero);
    }
}
