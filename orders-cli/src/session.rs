//! The loaded orders table and the storage it came from
//!
//! A session reads the table once and serves it from memory until a write.
//! Every write goes through `commit`, which stores the new table and then
//! reloads it from storage.

use anyhow::Result;

use crate::district::{BackfillOutcome, DEFAULT_POSTAL_CANDIDATES, DistrictResolver, backfill};
use crate::ingest::{IngestOptions, normalize_grid};
use crate::records::{Column, Table};
use crate::storage::Storage;

pub struct Session {
    storage: Box<dyn Storage>,
    ingest: IngestOptions,
    table: Option<Table>,
}

impl Session {
    pub fn new(storage: Box<dyn Storage>, ingest: IngestOptions) -> Self {
        Self {
            storage,
            ingest,
            table: None,
        }
    }

    pub fn describe(&self) -> String {
        self.storage.describe()
    }

    async fn load(&self) -> Result<Table> {
        let grid = self.storage.read_grid().await?;
        let table = normalize_grid(&grid, &self.ingest);
        log::debug!("Loaded {} record(s) from {}", table.len(), self.describe());
        Ok(table)
    }

    /// The current table, read from storage on first use
    pub async fn table(&mut self) -> Result<&Table> {
        if self.table.is_none() {
            let loaded = self.load().await?;
            self.table = Some(loaded);
        }
        Ok(self.table.get_or_insert_default())
    }

    /// Drop the cached table and read it again
    pub async fn reload(&mut self) -> Result<&Table> {
        self.table = None;
        self.table().await
    }

    /// Store `table` and reload. On a failed write the cached table is kept.
    pub async fn commit(&mut self, table: Table) -> Result<&Table> {
        self.storage.write_table(&table).await?;
        self.reload().await
    }

    /// Fill blank districts in the loaded table and save when any were found.
    ///
    /// A failed save is logged and the filled table is still served, so a
    /// read-only command keeps working against a read-only backend.
    pub async fn backfill_districts(&mut self, resolver: &DistrictResolver) -> Result<BackfillOutcome> {
        let mut table = self.table().await?.clone();
        let outcome = backfill(
            &mut table,
            Column::District,
            DEFAULT_POSTAL_CANDIDATES,
            resolver,
        );

        if outcome.needs_save() {
            log::info!(
                "Filled {} district(s) from '{}', saving",
                outcome.resolved,
                outcome.source.map(|c| c.name()).unwrap_or_default()
            );
            if let Err(e) = self.commit(table.clone()).await {
                log::warn!("Could not save back-filled districts: {:#}", e);
                self.table = Some(table);
            }
        }
        Ok(outcome)
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::district::testing::StubGeocoder;
    use crate::records::{NewRecord, add_record};
    use crate::storage::memory::MemoryStorage;

    fn session_over(storage: &Arc<MemoryStorage>) -> Session {
        Session::new(Box::new(Arc::clone(storage)), IngestOptions::default())
    }

    #[tokio::test]
    async fn test_table_is_read_once_until_reload() {
        let storage = Arc::new(MemoryStorage::with_grid(&[
            &["nr badania", "Miasto"],
            &["B-1", "Kraków"],
        ]));
        let mut session = session_over(&storage);

        assert_eq!(session.table().await.unwrap().len(), 1);
        assert_eq!(session.table().await.unwrap().len(), 1);
        assert_eq!(storage.reads(), 1);

        session.reload().await.unwrap();
        assert_eq!(storage.reads(), 2);
    }

    #[tokio::test]
    async fn test_commit_writes_and_reloads() {
        let storage = Arc::new(MemoryStorage::default());
        let mut session = session_over(&storage);
        let resolver = DistrictResolver::new(StubGeocoder::with_districts(&[("31-042", "Kraków")]));

        let mut table = session.table().await.unwrap().clone();
        assert!(table.is_empty());
        add_record(
            &mut table,
            NewRecord {
                test_number: "B-9".into(),
                postal_code: "31042".into(),
                ..NewRecord::default()
            },
            &resolver,
        )
        .unwrap();

        let reloaded = session.commit(table).await.unwrap();
        assert_eq!(reloaded.records[0].district, "Kraków");
        assert_eq!(storage.writes(), 1);
        assert_eq!(storage.reads(), 2);
        assert_eq!(storage.grid()[0][7], "Kod-pocztowy");
    }

    #[tokio::test]
    async fn test_failed_commit_keeps_cached_table() {
        let storage = Arc::new(MemoryStorage::with_grid(&[&["nr badania"], &["B-1"]]));
        let mut session = session_over(&storage);
        let mut table = session.table().await.unwrap().clone();
        table.records.clear();

        storage.fail_writes(true);
        assert!(session.commit(table).await.is_err());
        assert_eq!(session.table().await.unwrap().len(), 1);
        assert_eq!(storage.grid().len(), 2);
    }

    #[tokio::test]
    async fn test_alias_header_backfilled_and_saved() {
        let storage = Arc::new(MemoryStorage::with_grid(&[
            &["nr badania", "kod pocztowy", "Powiat"],
            &["B-1", "31042", ""],
        ]));
        let mut session = session_over(&storage);
        let resolver = DistrictResolver::new(StubGeocoder::with_districts(&[("31-042", "Kraków")]));

        let outcome = session.backfill_districts(&resolver).await.unwrap();
        assert_eq!(outcome.filled, 1);
        assert_eq!(outcome.source, Some(Column::PostalCode));
        assert_eq!(storage.writes(), 1);

        let table = session.table().await.unwrap();
        assert_eq!(table.records[0].postal_code, "31042");
        assert_eq!(table.records[0].district, "Kraków");
    }

    #[tokio::test]
    async fn test_backfill_without_results_does_not_save() {
        let storage = Arc::new(MemoryStorage::with_grid(&[
            &["nr badania", "Kod-pocztowy"],
            &["B-1", "99-999"],
        ]));
        let mut session = session_over(&storage);
        let resolver = DistrictResolver::new(StubGeocoder::with_districts(&[]));

        let outcome = session.backfill_districts(&resolver).await.unwrap();
        assert_eq!(outcome.resolved, 0);
        assert_eq!(storage.writes(), 0);
    }

    #[tokio::test]
    async fn test_backfill_survives_read_only_storage() {
        let storage = Arc::new(MemoryStorage::with_grid(&[
            &["nr badania", "Kod-pocztowy"],
            &["B-1", "00-950"],
        ]));
        storage.fail_writes(true);
        let mut session = session_over(&storage);
        let resolver = DistrictResolver::new(StubGeocoder::with_districts(&[("00-950", "Warszawa")]));

        session.backfill_districts(&resolver).await.unwrap();
        assert_eq!(session.table().await.unwrap().records[0].district, "Warszawa");
    }
}
