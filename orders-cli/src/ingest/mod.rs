//! Spreadsheet ingestion: header detection, alias mapping and type coercion

mod normalizer;

pub use normalizer::{IngestOptions, detect_header_row, normalize_grid};
