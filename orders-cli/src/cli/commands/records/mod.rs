//! list / search / add / edit / delete

mod handler;

use clap::Args;

use crate::cli::output::OutputFormat;
use crate::records::{DeleteKey, NewRecord, Parasite, RecordChanges};

pub use handler::{handle_add, handle_delete, handle_edit, handle_list, handle_search};

#[derive(Args)]
pub struct ListArgs {
    /// Output format
    #[arg(long, short = 'f', value_enum, default_value_t = OutputFormat::Table)]
    pub format: OutputFormat,

    /// Do not fill blank districts before showing the table
    #[arg(long)]
    pub no_backfill: bool,
}

#[derive(Args)]
pub struct SearchArgs {
    /// Part of an order number
    pub query: String,

    #[arg(long, short = 'f', value_enum, default_value_t = OutputFormat::Table)]
    pub format: OutputFormat,

    #[arg(long)]
    pub no_backfill: bool,
}

/// Record fields shared by add and edit
#[derive(Args, Debug, Default)]
pub struct RecordFields {
    #[arg(long)]
    pub order_number: Option<String>,

    #[arg(long = "horse")]
    pub horse_name: Option<String>,

    /// Postal code; the district is looked up from it
    #[arg(long)]
    pub postal_code: Option<String>,

    #[arg(long)]
    pub city: Option<String>,

    #[arg(long, value_parser = clap::value_parser!(u8).range(0..=1))]
    pub anoplocephala: Option<u8>,

    #[arg(long, value_parser = clap::value_parser!(u8).range(0..=1))]
    pub oxyuris: Option<u8>,

    #[arg(long, value_parser = clap::value_parser!(u8).range(0..=1))]
    pub parascaris: Option<u8>,

    #[arg(long, value_parser = clap::value_parser!(u8).range(0..=1))]
    pub strongyloides: Option<u8>,
}

impl RecordFields {
    /// Flag options indexed by parasite slot
    pub fn flags(&self) -> [Option<u8>; 4] {
        let mut flags = [None; 4];
        for parasite in Parasite::ALL {
            flags[parasite.slot()] = match parasite {
                Parasite::Anoplocephala => self.anoplocephala,
                Parasite::Oxyuris => self.oxyuris,
                Parasite::Parascaris => self.parascaris,
                Parasite::Strongyloides => self.strongyloides,
            };
        }
        flags
    }
}

#[derive(Args)]
pub struct AddArgs {
    #[arg(long)]
    pub test_number: String,

    #[command(flatten)]
    pub fields: RecordFields,
}

impl AddArgs {
    pub fn into_new_record(self) -> NewRecord {
        let flags = self.fields.flags().map(|f| f.unwrap_or(0));
        NewRecord {
            order_number: self.fields.order_number.unwrap_or_default(),
            test_number: self.test_number,
            horse_name: self.fields.horse_name.unwrap_or_default(),
            flags,
            postal_code: self.fields.postal_code.unwrap_or_default(),
            city: self.fields.city.unwrap_or_default(),
        }
    }
}

#[derive(Args)]
pub struct EditArgs {
    /// Test number of the record to edit
    pub test_number: String,

    #[arg(long)]
    pub new_test_number: Option<String>,

    #[command(flatten)]
    pub fields: RecordFields,
}

impl EditArgs {
    pub fn changes(&self) -> RecordChanges {
        RecordChanges {
            order_number: self.fields.order_number.clone(),
            test_number: self.new_test_number.clone(),
            horse_name: self.fields.horse_name.clone(),
            flags: self.fields.flags(),
            postal_code: self.fields.postal_code.clone(),
            city: self.fields.city.clone(),
        }
    }
}

#[derive(Args)]
pub struct DeleteArgs {
    /// Value of the key column to match
    pub value: String,

    /// Key column
    #[arg(long, value_enum, default_value_t = DeleteKey::TestNumber)]
    pub by: DeleteKey,

    /// Skip the confirmation prompt
    #[arg(long, short = 'y')]
    pub yes: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_add_args_default_flags_to_zero() {
        let args = AddArgs {
            test_number: "B-1".into(),
            fields: RecordFields {
                parascaris: Some(1),
                city: Some("Kraków".into()),
                ..RecordFields::default()
            },
        };
        let record = args.into_new_record();
        assert_eq!(record.flags, [0, 0, 1, 0]);
        assert_eq!(record.city, "Kraków");
        assert!(record.order_number.is_empty());
    }

    #[test]
    fn test_edit_args_only_carry_given_fields() {
        let args = EditArgs {
            test_number: "B-1".into(),
            new_test_number: None,
            fields: RecordFields::default(),
        };
        assert!(args.changes().is_empty());

        let args = EditArgs {
            test_number: "B-1".into(),
            new_test_number: Some("B-2".into()),
            fields: RecordFields {
                strongyloides: Some(0),
                ..RecordFields::default()
            },
        };
        let changes = args.changes();
        assert_eq!(changes.test_number.as_deref(), Some("B-2"));
        assert_eq!(changes.flags, [None, None, None, Some(0)]);
    }
}
