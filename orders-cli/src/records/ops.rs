//! Add / edit / delete / search over a loaded table
//!
//! Every operation works on the in-memory copy; the caller persists the
//! table afterwards. A rejected operation leaves the table unmodified.

use super::columns::{Column, Parasite, is_blank};
use super::table::{Record, Table};
use crate::district::DistrictResolver;

/// User-facing rejection of a record operation
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RecordError {
    /// A required field was left empty
    MissingField(Column),
    /// Another record already uses this test number
    Duplicate { test_number: String },
    /// No record matched the lookup
    NotFound { column: Column, value: String },
    /// Several records share the test number, so the edit target is unclear
    Ambiguous { test_number: String, count: usize },
}

impl RecordError {
    /// Informational outcomes are reported without a failing exit status
    pub fn is_informational(&self) -> bool {
        matches!(self, RecordError::NotFound { .. })
    }
}

impl std::fmt::Display for RecordError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RecordError::MissingField(column) => {
                write!(f, "'{}' is required - fill in this field", column)
            }
            RecordError::Duplicate { test_number } => write!(
                f,
                "A record with '{}' = '{}' already exists - nothing was saved",
                Column::TestNumber,
                test_number
            ),
            RecordError::NotFound { column, value } => {
                write!(f, "No record with '{}' = '{}'", column, value)
            }
            RecordError::Ambiguous { test_number, count } => write!(
                f,
                "{} records share '{}' = '{}' - edit refused",
                count,
                Column::TestNumber,
                test_number
            ),
        }
    }
}

impl std::error::Error for RecordError {}

/// Collapse inner whitespace runs and trim
pub fn normalize_text(value: &str) -> String {
    value.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Input of the add operation
#[derive(Debug, Clone, Default)]
pub struct NewRecord {
    pub order_number: String,
    pub test_number: String,
    pub horse_name: String,
    pub flags: [u8; 4],
    pub postal_code: String,
    pub city: String,
}

/// Fields to change in an edit; `None` keeps the current value
#[derive(Debug, Clone, Default)]
pub struct RecordChanges {
    pub order_number: Option<String>,
    pub test_number: Option<String>,
    pub horse_name: Option<String>,
    pub flags: [Option<u8>; 4],
    pub postal_code: Option<String>,
    pub city: Option<String>,
}

impl RecordChanges {
    pub fn is_empty(&self) -> bool {
        self.order_number.is_none()
            && self.test_number.is_none()
            && self.horse_name.is_none()
            && self.flags.iter().all(Option::is_none)
            && self.postal_code.is_none()
            && self.city.is_none()
    }
}

/// Column used to pick records for deletion
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, clap::ValueEnum)]
pub enum DeleteKey {
    #[default]
    TestNumber,
    OrderNumber,
}

impl DeleteKey {
    pub fn column(&self) -> Column {
        match self {
            DeleteKey::TestNumber => Column::TestNumber,
            DeleteKey::OrderNumber => Column::OrderNumber,
        }
    }
}

fn test_number_taken(table: &Table, test_number: &str, skip: Option<usize>) -> bool {
    table
        .records
        .iter()
        .enumerate()
        .filter(|(idx, _)| Some(*idx) != skip)
        .any(|(_, r)| normalize_text(&r.test_number) == test_number)
}

/// Append a record. Test numbers are required and unique.
pub fn add_record(
    table: &mut Table,
    input: NewRecord,
    resolver: &DistrictResolver,
) -> Result<(), RecordError> {
    let test_number = normalize_text(&input.test_number);
    if is_blank(&test_number) {
        return Err(RecordError::MissingField(Column::TestNumber));
    }
    if test_number_taken(table, &test_number, None) {
        return Err(RecordError::Duplicate { test_number });
    }

    let mut record = Record {
        order_number: normalize_text(&input.order_number),
        test_number,
        horse_name: normalize_text(&input.horse_name),
        postal_code: normalize_text(&input.postal_code),
        city: normalize_text(&input.city),
        ..Record::default()
    };
    for parasite in Parasite::ALL {
        record.set_flag(parasite, input.flags[parasite.slot()]);
    }
    if !record.postal_code.is_empty() {
        record.district = resolver.resolve(&record.postal_code);
    }

    log::info!(
        "Adding record '{}' (district: '{}')",
        record.test_number,
        record.district
    );
    table.records.push(record);
    Ok(())
}

/// Edit the single record with the given test number
pub fn edit_record(
    table: &mut Table,
    test_number: &str,
    changes: RecordChanges,
    resolver: &DistrictResolver,
) -> Result<(), RecordError> {
    let wanted = test_number.trim();
    let matches: Vec<usize> = table
        .records
        .iter()
        .enumerate()
        .filter(|(_, r)| r.test_number.trim() == wanted)
        .map(|(idx, _)| idx)
        .collect();

    let idx = match matches.as_slice() {
        [] => {
            return Err(RecordError::NotFound {
                column: Column::TestNumber,
                value: wanted.to_string(),
            });
        }
        [idx] => *idx,
        _ => {
            return Err(RecordError::Ambiguous {
                test_number: wanted.to_string(),
                count: matches.len(),
            });
        }
    };

    let new_number = changes.test_number.as_deref().map(normalize_text);
    if let Some(ref new_number) = new_number {
        if is_blank(new_number) {
            return Err(RecordError::MissingField(Column::TestNumber));
        }
        if test_number_taken(table, new_number, Some(idx)) {
            return Err(RecordError::Duplicate {
                test_number: new_number.clone(),
            });
        }
    }

    let record = &mut table.records[idx];
    if let Some(v) = changes.order_number {
        record.order_number = normalize_text(&v);
    }
    if let Some(v) = new_number {
        record.test_number = v;
    }
    if let Some(v) = changes.horse_name {
        record.horse_name = normalize_text(&v);
    }
    if let Some(v) = changes.postal_code {
        record.postal_code = normalize_text(&v);
    }
    if let Some(v) = changes.city {
        record.city = normalize_text(&v);
    }
    for parasite in Parasite::ALL {
        if let Some(flag) = changes.flags[parasite.slot()] {
            record.set_flag(parasite, flag);
        }
    }

    if !is_blank(&record.postal_code) {
        record.district = resolver.resolve(&record.postal_code);
    }

    log::info!("Edited record '{}'", record.test_number);
    Ok(())
}

/// Remove every record whose key column equals `value` (trimmed).
/// Returns the number of removed records; zero matches leaves the table as is.
pub fn delete_records(table: &mut Table, key: DeleteKey, value: &str) -> Result<usize, RecordError> {
    let wanted = value.trim();
    if wanted.is_empty() {
        return Err(RecordError::MissingField(key.column()));
    }

    let column = key.column();
    let before = table.records.len();
    table
        .records
        .retain(|r| r.text(column).map(str::trim) != Some(wanted));
    let removed = before - table.records.len();

    log::info!("Deleted {} record(s) where '{}' = '{}'", removed, column, wanted);
    Ok(removed)
}

/// Case-insensitive substring search over the order number
pub fn search_by_order_number<'a>(table: &'a Table, query: &str) -> Vec<&'a Record> {
    let needle = query.trim().to_lowercase();
    if needle.is_empty() {
        return Vec::new();
    }
    table
        .records
        .iter()
        .filter(|r| r.order_number.to_lowercase().contains(&needle))
        .collect()
}
