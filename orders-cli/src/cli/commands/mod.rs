pub mod config;
pub mod districts;
pub mod records;

use anyhow::Result;
use colored::*;

use super::AppContext;
use crate::district::DistrictResolver;
use crate::records::is_blank;
use crate::session::Session;

/// Fill blank districts right after loading, as every view does.
/// The reference dataset is only loaded when some row needs it.
pub(crate) async fn backfill_on_load(ctx: &AppContext, session: &mut Session) -> Result<()> {
    let pending = session
        .table()
        .await?
        .records
        .iter()
        .filter(|r| is_blank(&r.district) && !is_blank(&r.postal_code))
        .count();
    if pending == 0 {
        return Ok(());
    }

    log::debug!("{} record(s) without a district", pending);
    let resolver = ctx.resolver().await;
    backfill_with(session, &resolver).await
}

pub(crate) async fn backfill_with(session: &mut Session, resolver: &DistrictResolver) -> Result<()> {
    let outcome = session.backfill_districts(resolver).await?;
    if outcome.resolved > 0 {
        eprintln!(
            "{}",
            format!("Filled {} district(s) from postal codes", outcome.resolved).dimmed()
        );
    }
    Ok(())
}
