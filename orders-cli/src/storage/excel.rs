//! Local Excel workbook storage

use std::path::PathBuf;

use anyhow::{Context, Result};
use async_trait::async_trait;
use calamine::{Data, Reader, open_workbook_auto};
use rust_xlsxwriter::{Format, Workbook};

use super::Storage;
use crate::records::{Column, Table};

const DEFAULT_SHEET_NAME: &str = "Sheet1";

/// Workbook on disk. Writing replaces the whole file with a single sheet.
#[derive(Debug, Clone)]
pub struct ExcelStorage {
    path: PathBuf,
    sheet: Option<String>,
}

impl ExcelStorage {
    pub fn new(path: impl Into<PathBuf>, sheet: Option<String>) -> Self {
        Self {
            path: path.into(),
            sheet,
        }
    }

    fn read_sync(&self) -> Result<Vec<Vec<String>>> {
        if !self.path.exists() {
            log::info!(
                "{} does not exist yet, starting with an empty table",
                self.path.display()
            );
            return Ok(Vec::new());
        }

        let mut workbook = open_workbook_auto(&self.path)
            .with_context(|| format!("Failed to open Excel file: {}", self.path.display()))?;

        let sheet_name = match self.sheet {
            Some(ref name) => name.clone(),
            None => workbook
                .sheet_names()
                .first()
                .cloned()
                .context("Excel file has no sheets")?,
        };

        let range = workbook
            .worksheet_range(&sheet_name)
            .with_context(|| format!("Failed to read sheet: {}", sheet_name))?;

        let grid: Vec<Vec<String>> = range
            .rows()
            .map(|row| row.iter().map(cell_to_string).collect())
            .collect();

        log::debug!(
            "Read {} row(s) from sheet '{}' of {}",
            grid.len(),
            sheet_name,
            self.path.display()
        );
        Ok(grid)
    }

    fn write_sync(&self, table: &Table) -> Result<()> {
        let mut workbook = Workbook::new();
        let worksheet = workbook.add_worksheet();
        worksheet.set_name(self.sheet.as_deref().unwrap_or(DEFAULT_SHEET_NAME))?;

        let bold = Format::new().set_bold();
        for column in Column::ALL {
            worksheet.write_string_with_format(0, column.index() as u16, column.name(), &bold)?;
        }

        for (row_idx, record) in table.records.iter().enumerate() {
            let row = (row_idx + 1) as u32;
            for column in Column::ALL {
                let col = column.index() as u16;
                match column.parasite() {
                    Some(parasite) => {
                        worksheet.write_number(row, col, f64::from(record.flag(parasite)))?;
                    }
                    None => {
                        let value = record.text(column).unwrap_or("");
                        if !value.is_empty() {
                            worksheet.write_string(row, col, value)?;
                        }
                    }
                }
            }
        }

        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create directory: {}", parent.display()))?;
        }
        workbook
            .save(&self.path)
            .with_context(|| format!("Failed to save Excel file: {}", self.path.display()))?;

        log::info!("Wrote {} record(s) to {}", table.len(), self.path.display());
        Ok(())
    }
}

#[async_trait]
impl Storage for ExcelStorage {
    fn describe(&self) -> String {
        match self.sheet {
            Some(ref sheet) => format!("Excel {} [{}]", self.path.display(), sheet),
            None => format!("Excel {}", self.path.display()),
        }
    }

    async fn read_grid(&self) -> Result<Vec<Vec<String>>> {
        self.read_sync()
    }

    async fn write_table(&self, table: &Table) -> Result<()> {
        self.write_sync(table)
    }
}

/// Cell text as a spreadsheet user would read it
fn cell_to_string(cell: &Data) -> String {
    match cell {
        Data::Empty => String::new(),
        Data::String(s) => s.clone(),
        Data::Int(i) => i.to_string(),
        Data::Float(f) => {
            // Whole numbers come back as floats; "1.0" must read as "1"
            if f.fract() == 0.0 && f.abs() < 1e15 {
                format!("{}", *f as i64)
            } else {
                f.to_string()
            }
        }
        Data::Bool(b) => b.to_string(),
        other => other.to_string(),
    }
}
