//! Local CSV storage

use std::path::PathBuf;

use anyhow::{Context, Result};
use async_trait::async_trait;

use super::Storage;
use crate::records::Table;

#[derive(Debug, Clone)]
pub struct CsvStorage {
    path: PathBuf,
}

impl CsvStorage {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

#[async_trait]
impl Storage for CsvStorage {
    fn describe(&self) -> String {
        format!("CSV {}", self.path.display())
    }

    async fn read_grid(&self) -> Result<Vec<Vec<String>>> {
        if !self.path.exists() {
            log::info!(
                "{} does not exist yet, starting with an empty table",
                self.path.display()
            );
            return Ok(Vec::new());
        }

        let mut reader = csv::ReaderBuilder::new()
            .has_headers(false)
            .flexible(true)
            .from_path(&self.path)
            .with_context(|| format!("Failed to open CSV file: {}", self.path.display()))?;

        let mut grid = Vec::new();
        for (idx, result) in reader.records().enumerate() {
            let record = result.with_context(|| {
                format!("Failed to read row {} of {}", idx + 1, self.path.display())
            })?;
            grid.push(record.iter().map(str::to_string).collect::<Vec<_>>());
        }

        // Spreadsheet exports often start with a byte order mark
        if let Some(first) = grid.first_mut().and_then(|row| row.first_mut()) {
            if let Some(stripped) = first.strip_prefix('\u{feff}') {
                *first = stripped.to_string();
            }
        }

        log::debug!("Read {} row(s) from {}", grid.len(), self.path.display());
        Ok(grid)
    }

    async fn write_table(&self, table: &Table) -> Result<()> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create directory: {}", parent.display()))?;
        }

        let mut writer = csv::Writer::from_path(&self.path)
            .with_context(|| format!("Failed to create CSV file: {}", self.path.display()))?;
        for row in table.to_grid() {
            writer
                .write_record(&row)
                .with_context(|| format!("Failed to write {}", self.path.display()))?;
        }
        writer
            .flush()
            .with_context(|| format!("Failed to flush {}", self.path.display()))?;

        log::info!("Wrote {} record(s) to {}", table.len(), self.path.display());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ingest::{IngestOptions, normalize_grid};
    use crate::records::Record;

    #[tokio::test]
    async fn test_reads_ragged_rows_and_strips_bom() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("orders.csv");
        std::fs::write(
            &path,
            "\u{feff}nr badania,kod pocztowy,Miasto\nB-1,31042\nB-2,00-950,Warszawa,extra\n",
        )
        .unwrap();

        let grid = CsvStorage::new(&path).read_grid().await.unwrap();
        assert_eq!(grid[0][0], "nr badania");
        assert_eq!(grid[1].len(), 2);
        assert_eq!(grid[2].len(), 4);

        let table = normalize_grid(&grid, &IngestOptions::default());
        assert_eq!(table.records[0].postal_code, "31042");
        assert_eq!(table.records[1].city, "Warszawa");
    }

    #[tokio::test]
    async fn test_write_overwrites_with_header() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("orders.csv");
        std::fs::write(&path, "old,content\n1,2\n3,4\n").unwrap();

        let storage = CsvStorage::new(&path);
        let table = Table::new(vec![Record {
            test_number: "B-1".into(),
            horse_name: "Siwy, \"Mały\"".into(),
            ..Record::default()
        }]);
        storage.write_table(&table).await.unwrap();

        let grid = storage.read_grid().await.unwrap();
        assert_eq!(grid.len(), 2);
        assert_eq!(grid[0][1], "nr badania");
        assert_eq!(normalize_grid(&grid, &IngestOptions::default()), table);
    }
}
