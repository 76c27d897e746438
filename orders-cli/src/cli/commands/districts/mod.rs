//! backfill / resolve / map

mod handler;

use clap::Args;

use crate::cli::output::{MapFormat, OutputFormat};
use crate::records::Parasite;

pub use handler::{handle_backfill, handle_map, handle_resolve};

#[derive(Args)]
pub struct ResolveArgs {
    /// Postal codes, with or without the dash
    #[arg(required = true)]
    pub codes: Vec<String>,

    #[arg(long, short = 'f', value_enum, default_value_t = OutputFormat::Table)]
    pub format: OutputFormat,
}

#[derive(Args)]
pub struct MapArgs {
    /// Parasite whose positive results are counted
    #[arg(long, short = 'p', value_enum, default_value_t = Parasite::Anoplocephala)]
    pub parasite: Parasite,

    /// Keep districts with zero cases
    #[arg(long)]
    pub keep_zero: bool,

    #[arg(long, short = 'f', value_enum, default_value_t = MapFormat::Table)]
    pub format: MapFormat,
}
