mod cli;
mod config;
mod district;
mod ingest;
mod records;
mod session;
mod storage;

use std::process::ExitCode;

use clap::Parser;
use colored::*;
use is_terminal::IsTerminal;

use cli::Cli;
use records::RecordError;

#[tokio::main(flavor = "current_thread")]
async fn main() -> ExitCode {
    dotenvy::dotenv().ok();

    let cli = Cli::parse();
    init_logging(cli.verbose);

    if cli.no_color || !std::io::stdout().is_terminal() {
        colored::control::set_override(false);
    }

    match cli::run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            if let Some(rejection) = err.downcast_ref::<RecordError>() {
                if rejection.is_informational() {
                    println!("{}", rejection.to_string().yellow());
                    return ExitCode::SUCCESS;
                }
                eprintln!("{} {}", "Rejected:".yellow().bold(), rejection);
                return ExitCode::FAILURE;
            }
            log::debug!("{:?}", err);
            eprintln!("{} {:#}", "Error:".red().bold(), err);
            ExitCode::FAILURE
        }
    }
}

fn init_logging(verbosity: u8) {
    let default_filter = match verbosity {
        0 => "warn",
        1 => "info",
        _ => "debug",
    };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_filter))
        .format_timestamp(None)
        .init();
}
