//! Polish postal code normalization

/// Canonicalize a postal code. Exactly five digits (ignoring everything
/// else) become `DD-DDD`; any other input is returned trimmed.
pub fn normalize_postal_code(code: &str) -> String {
    let digits: String = code.chars().filter(|c| c.is_ascii_digit()).collect();
    if digits.len() == 5 {
        format!("{}-{}", &digits[..2], &digits[2..])
    } else {
        code.trim().to_string()
    }
}

/// Strict form: `Some("DD-DDD")` for five-digit codes, `None` otherwise
pub fn canonical_postal_code(code: &str) -> Option<String> {
    let digits: String = code.chars().filter(|c| c.is_ascii_digit()).collect();
    (digits.len() == 5).then(|| format!("{}-{}", &digits[..2], &digits[2..]))
}

/// Codes that mean "nothing here" and must never reach the geocoder
pub fn is_missing_code(code: &str) -> bool {
    let trimmed = code.trim();
    trimmed.is_empty()
        || ["nan", "none", "null"]
            .iter()
            .any(|token| trimmed.eq_ignore_ascii_case(token))
}
