//! Test-order records: canonical schema, table type and CRUD operations

pub mod columns;
pub mod ops;
pub mod table;

pub use columns::{Column, Parasite, is_blank, parse_flag};
pub use ops::{
    DeleteKey, NewRecord, RecordChanges, RecordError, add_record, delete_records, edit_record,
    normalize_text, search_by_order_number,
};
pub use table::{Record, Table};
