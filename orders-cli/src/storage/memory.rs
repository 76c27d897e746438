//! In-memory storage for tests

use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

use anyhow::{Result, bail};
use async_trait::async_trait;

use super::Storage;
use crate::records::Table;

#[derive(Debug, Default)]
pub struct MemoryStorage {
    grid: Mutex<Vec<Vec<String>>>,
    reads: AtomicUsize,
    writes: AtomicUsize,
    fail_writes: AtomicBool,
}

impl MemoryStorage {
    pub fn with_grid(rows: &[&[&str]]) -> Self {
        let grid = rows
            .iter()
            .map(|row| row.iter().map(|c| c.to_string()).collect())
            .collect();
        Self {
            grid: Mutex::new(grid),
            ..Self::default()
        }
    }

    pub fn grid(&self) -> Vec<Vec<String>> {
        self.grid.lock().unwrap().clone()
    }

    pub fn reads(&self) -> usize {
        self.reads.load(Ordering::SeqCst)
    }

    pub fn writes(&self) -> usize {
        self.writes.load(Ordering::SeqCst)
    }

    pub fn fail_writes(&self, fail: bool) {
        self.fail_writes.store(fail, Ordering::SeqCst);
    }
}

#[async_trait]
impl Storage for MemoryStorage {
    fn describe(&self) -> String {
        "memory".to_string()
    }

    async fn read_grid(&self) -> Result<Vec<Vec<String>>> {
        self.reads.fetch_add(1, Ordering::SeqCst);
        Ok(self.grid())
    }

    async fn write_table(&self, table: &Table) -> Result<()> {
        if self.fail_writes.load(Ordering::SeqCst) {
            bail!("storage unavailable");
        }
        self.writes.fetch_add(1, Ordering::SeqCst);
        *self.grid.lock().unwrap() = table.to_grid();
        Ok(())
    }
}

/// Lets a test keep a handle on the storage it hands to a session
#[async_trait]
impl Storage for std::sync::Arc<MemoryStorage> {
    fn describe(&self) -> String {
        self.as_ref().describe()
    }

    async fn read_grid(&self) -> Result<Vec<Vec<String>>> {
        self.as_ref().read_grid().await
    }

    async fn write_table(&self, table: &Table) -> Result<()> {
        self.as_ref().write_table(table).await
    }
}
