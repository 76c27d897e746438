//! District command handlers

use anyhow::{Context, Result};
use colored::*;
use serde::Serialize;

use super::{MapArgs, ResolveArgs};
use crate::cli::AppContext;
use crate::cli::commands::backfill_with;
use crate::cli::output::{OutputFormat, format_cases, render_table};
use crate::district::{aggregate_cases, normalize_postal_code};

pub async fn handle_backfill(ctx: &AppContext) -> Result<()> {
    let mut session = ctx.open_session().await?;
    let resolver = ctx.resolver().await;
    let outcome = session.backfill_districts(&resolver).await?;

    let Some(source) = outcome.source else {
        println!("{}", "No postal code column, nothing to fill".yellow());
        return Ok(());
    };

    if outcome.filled == 0 {
        println!("All districts already filled");
    } else {
        println!(
            "{} {} of {} blank district(s) from '{}'",
            "Filled".green().bold(),
            outcome.resolved,
            outcome.filled,
            source
        );
        let unresolved = outcome.filled - outcome.resolved;
        if unresolved > 0 {
            println!(
                "{}",
                format!("{} postal code(s) not found in the reference", unresolved).yellow()
            );
        }
    }
    Ok(())
}

#[derive(Serialize)]
struct Resolution {
    postal_code: String,
    normalized: String,
    district: String,
    place: String,
    voivodeship: String,
}

pub async fn handle_resolve(ctx: &AppContext, args: ResolveArgs) -> Result<()> {
    let resolver = ctx.resolver().await;
    let results: Vec<Resolution> = args
        .codes
        .iter()
        .map(|code| {
            let normalized = normalize_postal_code(code);
            let place = resolver
                .geocoder()
                .lookup(&normalized)
                .ok()
                .flatten()
                .unwrap_or_default();
            Resolution {
                postal_code: code.clone(),
                district: resolver.resolve(code),
                normalized,
                place: place.place_name,
                voivodeship: place.state_name,
            }
        })
        .collect();

    let output = match args.format {
        OutputFormat::Json => {
            serde_json::to_string_pretty(&results).context("Failed to format JSON output")?
        }
        OutputFormat::Csv => {
            let mut writer = csv::Writer::from_writer(Vec::new());
            for result in &results {
                writer.serialize(result)?;
            }
            String::from_utf8(writer.into_inner().context("Failed to finish CSV output")?)
                .context("CSV output is not valid UTF-8")?
        }
        OutputFormat::Table => {
            let rows: Vec<Vec<String>> = results
                .iter()
                .map(|r| {
                    let district = if r.district.is_empty() {
                        "-".to_string()
                    } else {
                        r.district.clone()
                    };
                    vec![
                        r.postal_code.clone(),
                        r.normalized.clone(),
                        district,
                        r.voivodeship.clone(),
                        r.place.clone(),
                    ]
                })
                .collect();
            render_table(
                &["postal code", "normalized", "Powiat", "voivodeship", "places"],
                &rows,
            )
        }
    };
    println!("{}", output);
    Ok(())
}

pub async fn handle_map(ctx: &AppContext, args: MapArgs) -> Result<()> {
    let mut session = ctx.open_session().await?;
    let resolver = ctx.resolver().await;
    backfill_with(&mut session, &resolver).await?;

    let table = session.table().await?;
    let points = aggregate_cases(table, args.parasite, resolver.geocoder(), !args.keep_zero);

    let total: u64 = points.iter().map(|p| p.cases).sum();
    eprintln!(
        "{}",
        format!(
            "{} case(s) of {} across {} district(s)",
            total,
            args.parasite,
            points.len()
        )
        .dimmed()
    );
    println!("{}", format_cases(&points, args.parasite, args.format)?);
    Ok(())
}
