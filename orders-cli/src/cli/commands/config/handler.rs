use anyhow::Result;
use colored::*;

use super::ConfigCommands;
use crate::cli::AppContext;
use crate::config::default_config_path;

pub fn handle_config_command(ctx: &AppContext, command: ConfigCommands) -> Result<()> {
    match command {
        ConfigCommands::Show => {
            match ctx.config_source {
                Some(ref source) => println!("# {}", source.display()),
                None => println!("# defaults (no config file)"),
            }
            print!("{}", ctx.config.to_toml()?);
        }
        ConfigCommands::Path => match ctx.config_source {
            Some(ref source) => println!("{}", source.display()),
            None => println!(
                "{} {}",
                default_config_path().display(),
                "(not created)".dimmed()
            ),
        },
    }
    Ok(())
}
