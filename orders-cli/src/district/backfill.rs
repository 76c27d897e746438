//! Fill blank districts from postal codes

use super::resolver::DistrictResolver;
use crate::records::{Column, Table, is_blank};

/// Postal code columns tried by default, in order
pub const DEFAULT_POSTAL_CANDIDATES: &[&str] = &["Kod-pocztowy", "Kod-pocztowy "];

/// What a back-fill pass did
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct BackfillOutcome {
    /// Rows whose district column was written
    pub filled: usize,
    /// Of those, rows that received a non-empty district
    pub resolved: usize,
    /// Postal code column used for the whole pass
    pub source: Option<Column>,
}

impl BackfillOutcome {
    /// A save is only worth it when some district actually changed
    pub fn needs_save(&self) -> bool {
        self.resolved > 0
    }
}

/// Write `resolver.resolve(code)` into `district_column` for every row whose
/// district is blank and whose postal code is not.
///
/// The postal code column is the first of `postal_candidates` that exists in
/// the table schema, and the same column is used for every row.
pub fn backfill(
    table: &mut Table,
    district_column: Column,
    postal_candidates: &[&str],
    resolver: &DistrictResolver,
) -> BackfillOutcome {
    let Some(source) = postal_candidates
        .iter()
        .find_map(|name| Column::from_name(name))
    else {
        log::warn!(
            "None of the postal code columns {:?} exist, skipping district back-fill",
            postal_candidates
        );
        return BackfillOutcome::default();
    };

    let mut outcome = BackfillOutcome {
        source: Some(source),
        ..BackfillOutcome::default()
    };

    for record in table.records.iter_mut() {
        if !is_blank(&record.get(district_column)) {
            continue;
        }
        let code = record.get(source);
        if is_blank(&code) {
            continue;
        }

        let district = resolver.resolve(code.trim());
        if !district.is_empty() {
            outcome.resolved += 1;
        }
        record.set(district_column, district);
        outcome.filled += 1;
    }

    log::info!(
        "Back-filled '{}' in {} row(s) from '{}' ({} resolved)",
        district_column,
        outcome.filled,
        source,
        outcome.resolved
    );
    outcome
}
