mod handler;

use clap::Subcommand;

pub use handler::handle_config_command;

#[derive(Subcommand)]
pub enum ConfigCommands {
    /// Print the effective configuration as TOML
    Show,
    /// Print the configuration file location
    Path,
}
