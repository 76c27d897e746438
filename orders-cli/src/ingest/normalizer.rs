//! Raw string grid -> canonical `Table`
//!
//! Sheets maintained by hand drift: title rows above the header, headers
//! typed without diacritics, "None" typed into empty cells, junk rows at the
//! bottom. `normalize_grid` absorbs all of that and always returns a table
//! with the full canonical schema. Malformed cells never fail the load.

use serde::{Deserialize, Serialize};

use crate::records::{Column, Record, Table, is_blank, parse_flag};

/// How the header row is located
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct IngestOptions {
    /// Fixed 0-based header row; auto-detected when unset
    #[serde(skip_serializing_if = "Option::is_none")]
    pub header_row: Option<usize>,
    /// Number of leading rows scanned during detection
    pub scan_rows: usize,
    /// Canonical names a row must contain to count as the header
    pub min_header_matches: usize,
}

impl Default for IngestOptions {
    fn default() -> Self {
        Self {
            header_row: None,
            scan_rows: 20,
            min_header_matches: 3,
        }
    }
}

/// Find the header row: the first of the leading `scan_rows` rows whose
/// trimmed cells match at least `min_header_matches` canonical column names
/// (case-insensitive). Falls back to row 0.
pub fn detect_header_row(grid: &[Vec<String>], options: &IngestOptions) -> usize {
    let wanted: Vec<String> = Column::ALL.iter().map(|c| c.name().to_lowercase()).collect();

    grid.iter()
        .take(options.scan_rows)
        .position(|row| {
            let score = row
                .iter()
                .filter(|cell| wanted.contains(&cell.trim().to_lowercase()))
                .count();
            score >= options.min_header_matches
        })
        .unwrap_or(0)
}

/// Normalize a raw grid into a canonical table
pub fn normalize_grid(grid: &[Vec<String>], options: &IngestOptions) -> Table {
    // Drop blank rows from the end
    let mut end = grid.len();
    while end > 0 && grid[end - 1].iter().all(|c| c.trim().is_empty()) {
        end -= 1;
    }
    let grid = &grid[..end];
    if grid.is_empty() {
        log::debug!("Source grid is empty, returning empty table");
        return Table::default();
    }

    let header_idx = match options.header_row {
        Some(row) if row < grid.len() => row,
        Some(row) => {
            log::warn!(
                "Configured header row {} is past the end of the sheet ({} rows), using row 0",
                row,
                grid.len()
            );
            0
        }
        None => detect_header_row(grid, options),
    };
    log::debug!("Using row {} as header", header_idx);

    let headers = &grid[header_idx];
    let width = headers.len();

    // Source column index for each canonical column; the first alias hit wins
    let mut positions: [Option<usize>; 10] = [None; 10];
    for (idx, header) in headers.iter().enumerate() {
        match Column::from_alias(header) {
            Some(column) => {
                let slot = &mut positions[column.index()];
                if slot.is_none() {
                    *slot = Some(idx);
                } else {
                    log::warn!(
                        "Duplicate column '{}' at position {} ignored",
                        header.trim(),
                        idx + 1
                    );
                }
            }
            None if !header.trim().is_empty() => {
                log::debug!("Dropping unknown column '{}'", header.trim());
            }
            None => {}
        }
    }

    for column in Column::ALL {
        if positions[column.index()].is_none() {
            log::debug!("Column '{}' missing from source, filling with blanks", column);
        }
    }

    let records = grid[header_idx + 1..]
        .iter()
        .filter_map(|row| {
            // Only cells under the header count; the rest is truncated away
            let cells = &row[..row.len().min(width)];
            if cells.iter().all(|c| is_blank(c)) {
                return None;
            }

            let mut record = Record::default();
            for column in Column::ALL {
                let value = positions[column.index()]
                    .and_then(|idx| cells.get(idx))
                    .filter(|v| !is_blank(v))
                    .map(String::as_str)
                    .unwrap_or("");

                if let Some(parasite) = column.parasite() {
                    record.set_flag(parasite, parse_flag(value));
                } else {
                    record.set(column, value);
                }
            }
            Some(record)
        })
        .collect::<Vec<_>>();

    log::info!(
        "Normalized {} record(s) from {} source row(s)",
        records.len(),
        grid.len() - header_idx - 1
    );
    Table::new(records)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::records::Parasite;

    fn grid(rows: &[&[&str]]) -> Vec<Vec<String>> {
        rows.iter()
            .map(|r| r.iter().map(|c| c.to_string()).collect())
            .collect()
    }

    fn canonical_header() -> Vec<&'static str> {
        Column::ALL.iter().map(|c| c.name()).collect()
    }

    #[test]
    fn test_empty_grid_yields_empty_table() {
        let table = normalize_grid(&[], &IngestOptions::default());
        assert!(table.is_empty());
        assert_eq!(table.columns().len(), 10);

        let blanks = grid(&[&["", " "], &["  "]]);
        assert!(normalize_grid(&blanks, &IngestOptions::default()).is_empty());
    }

    #[test]
    fn test_detects_header_below_title_rows() {
        let rows = grid(&[
            &["", "", ""],
            &["Zestawienie badań 2024", "", ""],
            &["nr badania", "Imię konia", "POWIAT", "Miasto"],
            &["B-1", "Iskra", "", "Kraków"],
        ]);
        let options = IngestOptions::default();
        assert_eq!(detect_header_row(&rows, &options), 2);

        let table = normalize_grid(&rows, &options);
        assert_eq!(table.len(), 1);
        assert_eq!(table.records[0].test_number, "B-1");
        assert_eq!(table.records[0].horse_name, "Iskra");
        assert_eq!(table.records[0].city, "Kraków");
    }

    #[test]
    fn test_detection_defaults_to_first_row() {
        let rows = grid(&[&["a", "b"], &["nr badania", "x"], &["1", "2"]]);
        assert_eq!(detect_header_row(&rows, &IngestOptions::default()), 0);
    }

    #[test]
    fn test_explicit_header_row_skips_detection() {
        let rows = grid(&[
            &["nr badania", "imię konia", "Miasto"],
            &["kod pocztowy", "nr badania", "x"],
            &["00-950", "B-7", "y"],
        ]);
        let options = IngestOptions {
            header_row: Some(1),
            ..IngestOptions::default()
        };
        let table = normalize_grid(&rows, &options);
        assert_eq!(table.len(), 1);
        assert_eq!(table.records[0].postal_code, "00-950");
        assert_eq!(table.records[0].test_number, "B-7");
    }

    #[test]
    fn test_alias_header_files_under_canonical_column() {
        let rows = grid(&[&["nr badania", "kod pocztowy"], &["B-1", "31-042"]]);
        let table = normalize_grid(&rows, &IngestOptions::default());
        assert_eq!(table.records[0].postal_code, "31-042");
        assert_eq!(table.records[0].get(Column::PostalCode), "31-042");
    }

    #[test]
    fn test_blank_equivalents_and_blank_rows() {
        let rows = grid(&[
            &["nr badania", "Miasto", "uwagi"],
            &["B-1", "None", ""],
            &[" ", "null", "NULL"],
            &["", "", "tylko uwaga"],
            &["", "", ""],
        ]);
        let table = normalize_grid(&rows, &IngestOptions::default());

        // The row carrying only an unknown column survives as an empty record
        assert_eq!(table.len(), 2);
        assert_eq!(table.records[0].city, "");
        assert_eq!(table.records[1], Record::default());
    }

    #[test]
    fn test_rows_are_padded_and_truncated() {
        let rows = grid(&[
            &["nr badania", "Miasto"],
            &["B-1"],
            &["B-2", "Gdańsk", "overflow"],
        ]);
        let table = normalize_grid(&rows, &IngestOptions::default());
        assert_eq!(table.len(), 2);
        assert_eq!(table.records[0].city, "");
        assert_eq!(table.records[1].city, "Gdańsk");
    }

    #[test]
    fn test_flags_are_coerced_to_zero_or_one() {
        let rows = grid(&[
            &[
                "nr badania",
                "Anoplocephala perfoliata",
                "Oxyuris equi",
                "Parascaris equorum",
                "Strongyloides spp",
            ],
            &["B-1", "1", "yes", "", "1.0"],
            &["B-2", "2", "0", "none", "abc"],
        ]);
        let table = normalize_grid(&rows, &IngestOptions::default());
        let first = &table.records[0];
        assert_eq!(first.flag(Parasite::Anoplocephala), 1);
        assert_eq!(first.flag(Parasite::Oxyuris), 0);
        assert_eq!(first.flag(Parasite::Parascaris), 0);
        assert_eq!(first.flag(Parasite::Strongyloides), 1);
        assert!(table.records[1].flags.iter().all(|f| *f == 0));
    }

    #[test]
    fn test_first_duplicate_column_wins() {
        let rows = grid(&[
            &["Kod-pocztowy", "kod pocztowy", "nr badania"],
            &["00-001", "99-999", "B-1"],
        ]);
        let table = normalize_grid(&rows, &IngestOptions::default());
        assert_eq!(table.records[0].postal_code, "00-001");
    }

    #[test]
    fn test_normalizing_canonical_grid_is_idempotent() {
        let mut header = canonical_header();
        header.reverse();
        let row = vec![
            "Warszawa", "Warszawa", "00-950", "1", "0", "0", "1", "Iskra", "B-1", "Z-1",
        ];
        let rows = grid(&[header.as_slice(), row.as_slice()]);

        let once = normalize_grid(&rows, &IngestOptions::default());
        let twice = normalize_grid(&once.to_grid(), &IngestOptions::default());
        assert_eq!(once, twice);
        assert_eq!(once.records[0].test_number, "B-1");
        assert_eq!(once.records[0].order_number, "Z-1");
        assert_eq!(once.records[0].flag(Parasite::Strongyloides), 1);
        assert_eq!(once.records[0].flag(Parasite::Anoplocephala), 1);
        assert_eq!(once.records[0].flag(Parasite::Oxyuris), 0);
    }
}
