//! Canonical column set, header aliases and blank-equivalence

/// One of the ten fixed columns of an orders table, in canonical order
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Column {
    OrderNumber,
    TestNumber,
    HorseName,
    Anoplocephala,
    Oxyuris,
    Parascaris,
    Strongyloides,
    PostalCode,
    District,
    City,
}

impl Column {
    /// All columns in canonical order
    pub const ALL: [Column; 10] = [
        Column::OrderNumber,
        Column::TestNumber,
        Column::HorseName,
        Column::Anoplocephala,
        Column::Oxyuris,
        Column::Parascaris,
        Column::Strongyloides,
        Column::PostalCode,
        Column::District,
        Column::City,
    ];

    /// Header name as stored in the sheet
    pub fn name(&self) -> &'static str {
        match self {
            Column::OrderNumber => "nr zamówienia",
            Column::TestNumber => "nr badania",
            Column::HorseName => "imię konia",
            Column::Anoplocephala => "Anoplocephala perfoliata",
            Column::Oxyuris => "Oxyuris equi",
            Column::Parascaris => "Parascaris equorum",
            Column::Strongyloides => "Strongyloides spp",
            Column::PostalCode => "Kod-pocztowy",
            Column::District => "Powiat",
            Column::City => "Miasto",
        }
    }

    /// Position in canonical order
    pub fn index(&self) -> usize {
        *self as usize
    }

    /// Exact lookup by canonical header name
    pub fn from_name(name: &str) -> Option<Column> {
        Column::ALL.into_iter().find(|c| c.name() == name)
    }

    /// Resolve a raw source header through the alias table (case-insensitive,
    /// surrounding whitespace ignored)
    pub fn from_alias(header: &str) -> Option<Column> {
        let key = header.trim().to_lowercase();
        ALIASES
            .iter()
            .find(|(alias, _)| *alias == key)
            .map(|(_, col)| *col)
    }

    /// The parasite this column flags, if it is a flag column
    pub fn parasite(&self) -> Option<Parasite> {
        match self {
            Column::Anoplocephala => Some(Parasite::Anoplocephala),
            Column::Oxyuris => Some(Parasite::Oxyuris),
            Column::Parascaris => Some(Parasite::Parascaris),
            Column::Strongyloides => Some(Parasite::Strongyloides),
            _ => None,
        }
    }
}

impl std::fmt::Display for Column {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name())
    }
}

/// Lowercased source header -> canonical column
const ALIASES: &[(&str, Column)] = &[
    ("nr zamówienia", Column::OrderNumber),
    ("nr zamowienia", Column::OrderNumber),
    ("nr. zamówienia", Column::OrderNumber),
    ("nr. zamowienia", Column::OrderNumber),
    ("numer zamówienia", Column::OrderNumber),
    ("numer zamowienia", Column::OrderNumber),
    ("nr badania", Column::TestNumber),
    ("nr. badania", Column::TestNumber),
    ("numer badania", Column::TestNumber),
    ("imię konia", Column::HorseName),
    ("imie konia", Column::HorseName),
    ("anoplocephala perfoliata", Column::Anoplocephala),
    ("oxyuris equi", Column::Oxyuris),
    ("parascaris equorum", Column::Parascaris),
    ("strongyloides spp", Column::Strongyloides),
    ("strongyloides spp.", Column::Strongyloides),
    ("kod-pocztowy", Column::PostalCode),
    ("kod pocztowy", Column::PostalCode),
    ("kod_pocztowy", Column::PostalCode),
    ("powiat", Column::District),
    ("miasto", Column::City),
];

/// The four parasites a test order screens for
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, clap::ValueEnum)]
pub enum Parasite {
    Anoplocephala,
    Oxyuris,
    Parascaris,
    Strongyloides,
}

impl Parasite {
    pub const ALL: [Parasite; 4] = [
        Parasite::Anoplocephala,
        Parasite::Oxyuris,
        Parasite::Parascaris,
        Parasite::Strongyloides,
    ];

    pub fn column(&self) -> Column {
        match self {
            Parasite::Anoplocephala => Column::Anoplocephala,
            Parasite::Oxyuris => Column::Oxyuris,
            Parasite::Parascaris => Column::Parascaris,
            Parasite::Strongyloides => Column::Strongyloides,
        }
    }

    /// Slot in `Record::flags`
    pub fn slot(&self) -> usize {
        *self as usize
    }
}

impl std::fmt::Display for Parasite {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.column().name())
    }
}

/// Empty, whitespace-only, or "none"/"null" in any case
pub fn is_blank(value: &str) -> bool {
    let trimmed = value.trim();
    trimmed.is_empty()
        || trimmed.eq_ignore_ascii_case("none")
        || trimmed.eq_ignore_ascii_case("null")
}

/// Parse a flag cell: the number 1 is set, everything else is clear
pub fn parse_flag(value: &str) -> u8 {
    match value.trim().parse::<f64>() {
        Ok(n) if n == 1.0 => 1,
        _ => 0,
    }
}
