//! Record and Table types

use serde::Serialize;
use serde::ser::SerializeMap;

use super::columns::{Column, Parasite, parse_flag};

/// One test order. Text fields use the empty string for "no value".
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Record {
    pub order_number: String,
    pub test_number: String,
    pub horse_name: String,
    /// Parasite flags indexed by `Parasite::slot`, always 0 or 1
    pub flags: [u8; 4],
    pub postal_code: String,
    pub district: String,
    pub city: String,
}

impl Record {
    /// Cell value as text (flags render as "0"/"1")
    pub fn get(&self, column: Column) -> String {
        match column {
            Column::OrderNumber => self.order_number.clone(),
            Column::TestNumber => self.test_number.clone(),
            Column::HorseName => self.horse_name.clone(),
            Column::PostalCode => self.postal_code.clone(),
            Column::District => self.district.clone(),
            Column::City => self.city.clone(),
            flag => match flag.parasite() {
                Some(p) => self.flag(p).to_string(),
                None => String::new(),
            },
        }
    }

    /// Borrow a text column; `None` for flag columns
    pub fn text(&self, column: Column) -> Option<&str> {
        match column {
            Column::OrderNumber => Some(&self.order_number),
            Column::TestNumber => Some(&self.test_number),
            Column::HorseName => Some(&self.horse_name),
            Column::PostalCode => Some(&self.postal_code),
            Column::District => Some(&self.district),
            Column::City => Some(&self.city),
            _ => None,
        }
    }

    /// Set a cell from text. Flag columns are coerced to 0/1.
    pub fn set(&mut self, column: Column, value: impl Into<String>) {
        let value = value.into();
        match column {
            Column::OrderNumber => self.order_number = value,
            Column::TestNumber => self.test_number = value,
            Column::HorseName => self.horse_name = value,
            Column::PostalCode => self.postal_code = value,
            Column::District => self.district = value,
            Column::City => self.city = value,
            flag => {
                if let Some(p) = flag.parasite() {
                    self.set_flag(p, parse_flag(&value));
                }
            }
        }
    }

    pub fn flag(&self, parasite: Parasite) -> u8 {
        self.flags[parasite.slot()]
    }

    pub fn set_flag(&mut self, parasite: Parasite, value: u8) {
        self.flags[parasite.slot()] = u8::from(value == 1);
    }

    /// Row in canonical column order
    pub fn to_row(&self) -> Vec<String> {
        Column::ALL.iter().map(|c| self.get(*c)).collect()
    }
}

impl Serialize for Record {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(Column::ALL.len()))?;
        for column in Column::ALL {
            match column.parasite() {
                Some(p) => map.serialize_entry(column.name(), &self.flag(p))?,
                None => map.serialize_entry(column.name(), self.text(column).unwrap_or(""))?,
            }
        }
        map.end()
    }
}

/// Ordered sequence of records with the canonical column set
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Table {
    pub records: Vec<Record>,
}

impl Table {
    pub fn new(records: Vec<Record>) -> Self {
        Table { records }
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Column names of the schema, in canonical order
    pub fn columns(&self) -> Vec<&'static str> {
        Column::ALL.iter().map(|c| c.name()).collect()
    }

    /// Header row followed by one row per record
    pub fn to_grid(&self) -> Vec<Vec<String>> {
        let mut grid = Vec::with_capacity(self.records.len() + 1);
        grid.push(self.columns().into_iter().map(String::from).collect());
        grid.extend(self.records.iter().map(Record::to_row));
        grid
    }
}
