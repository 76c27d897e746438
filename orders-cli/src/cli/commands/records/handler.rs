//! Record command handlers

use anyhow::{Result, bail};
use colored::*;
use is_terminal::IsTerminal;

use super::{AddArgs, DeleteArgs, EditArgs, ListArgs, SearchArgs};
use crate::cli::AppContext;
use crate::cli::commands::backfill_on_load;
use crate::cli::output::format_records;
use crate::district::{DistrictResolver, UnavailableGeocoder};
use crate::records::{
    Column, Record, RecordError, add_record, delete_records, edit_record, is_blank,
    normalize_text, search_by_order_number,
};

pub async fn handle_list(ctx: &AppContext, args: ListArgs) -> Result<()> {
    let mut session = ctx.open_session().await?;
    if !args.no_backfill {
        backfill_on_load(ctx, &mut session).await?;
    }

    let table = session.table().await?;
    let records: Vec<&Record> = table.records.iter().collect();
    println!("{}", format_records(&records, args.format)?);
    Ok(())
}

pub async fn handle_search(ctx: &AppContext, args: SearchArgs) -> Result<()> {
    if args.query.trim().is_empty() {
        println!("{}", format_records(&[], args.format)?);
        return Ok(());
    }

    let mut session = ctx.open_session().await?;
    if !args.no_backfill {
        backfill_on_load(ctx, &mut session).await?;
    }

    let table = session.table().await?;
    let found = search_by_order_number(table, &args.query);
    eprintln!(
        "{}",
        format!("{} of {} record(s) match '{}'", found.len(), table.len(), args.query.trim())
            .dimmed()
    );
    println!("{}", format_records(&found, args.format)?);
    Ok(())
}

pub async fn handle_add(ctx: &AppContext, args: AddArgs) -> Result<()> {
    let needs_lookup = args
        .fields
        .postal_code
        .as_deref()
        .is_some_and(|code| !is_blank(code));
    let resolver = if needs_lookup {
        ctx.resolver().await
    } else {
        DistrictResolver::new(UnavailableGeocoder::new("no postal code given"))
    };

    let mut session = ctx.open_session().await?;
    let mut table = session.table().await?.clone();
    add_record(&mut table, args.into_new_record(), &resolver)?;

    let added = table.records.last().cloned().unwrap_or_default();
    session.commit(table).await?;

    println!(
        "{} record '{}'{}",
        "Added".green().bold(),
        added.test_number,
        district_note(&added)
    );
    Ok(())
}

pub async fn handle_edit(ctx: &AppContext, args: EditArgs) -> Result<()> {
    let changes = args.changes();
    if changes.is_empty() {
        bail!("Nothing to change: pass at least one field option");
    }

    let mut session = ctx.open_session().await?;
    let mut table = session.table().await?.clone();

    // Fail on a missing target before paying for the reference dataset
    let wanted = args.test_number.trim();
    if !table.records.iter().any(|r| r.test_number.trim() == wanted) {
        return Err(RecordError::NotFound {
            column: Column::TestNumber,
            value: wanted.to_string(),
        }
        .into());
    }

    let resolver = ctx.resolver().await;
    edit_record(&mut table, &args.test_number, changes, &resolver)?;

    let final_number =
        normalize_text(args.new_test_number.as_deref().unwrap_or(&args.test_number));
    let edited = table
        .records
        .iter()
        .find(|r| r.test_number == final_number)
        .cloned()
        .unwrap_or_default();
    session.commit(table).await?;

    println!(
        "{} record '{}'{}",
        "Updated".green().bold(),
        final_number,
        district_note(&edited)
    );
    Ok(())
}

pub async fn handle_delete(ctx: &AppContext, args: DeleteArgs) -> Result<()> {
    let mut session = ctx.open_session().await?;
    let mut table = session.table().await?.clone();

    let column = args.by.column();
    let removed = delete_records(&mut table, args.by, &args.value)?;
    if removed == 0 {
        println!(
            "{}",
            format!("No record with '{}' = '{}', nothing deleted", column, args.value.trim())
                .yellow()
        );
        return Ok(());
    }

    if !args.yes {
        if !std::io::stdin().is_terminal() {
            bail!("Refusing to delete without confirmation; pass --yes");
        }
        let confirmed = dialoguer::Confirm::new()
            .with_prompt(format!(
                "Delete {} record(s) where '{}' = '{}'?",
                removed,
                column,
                args.value.trim()
            ))
            .default(false)
            .interact()?;
        if !confirmed {
            println!("Cancelled");
            return Ok(());
        }
    }

    session.commit(table).await?;
    println!("{} {} record(s)", "Deleted".green().bold(), removed);
    Ok(())
}

fn district_note(record: &Record) -> String {
    if record.district.is_empty() {
        if record.postal_code.is_empty() {
            String::new()
        } else {
            format!(" {}", "(district not found)".yellow())
        }
    } else {
        format!(" in {}", record.district.cyan())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cli::commands::records::RecordFields;
    use crate::cli::output::OutputFormat;
    use crate::config::{Config, LoadedConfig, StorageConfig};

    fn context(dir: &tempfile::TempDir) -> AppContext {
        let config = Config {
            storage: StorageConfig::Local {
                path: dir.path().join("orders.csv"),
                sheet: None,
            },
            ..Config::default()
        };
        AppContext::new(LoadedConfig {
            config,
            source: None,
        })
        .unwrap()
    }

    #[tokio::test]
    async fn test_blank_search_is_an_empty_result() {
        let dir = tempfile::tempdir().unwrap();
        let args = SearchArgs {
            query: "  ".into(),
            format: OutputFormat::Json,
            no_backfill: true,
        };
        handle_search(&context(&dir), args).await.unwrap();
    }

    #[tokio::test]
    async fn test_add_with_blank_token_saves_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let args = AddArgs {
            test_number: "None".into(),
            fields: RecordFields::default(),
        };
        let err = handle_add(&context(&dir), args).await.unwrap_err();
        assert_eq!(
            err.downcast_ref::<RecordError>(),
            Some(&RecordError::MissingField(Column::TestNumber))
        );
        assert!(!dir.path().join("orders.csv").exists());
    }
}
