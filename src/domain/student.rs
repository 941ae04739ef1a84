use rust_decimal::Decimal;
use std::collections::BTreeMap;
use std::str::FromStr;

/// Calendar months in order, used as keys for the monthly payment grid.
///
/// The ledger stores one indicator cell per month; keys are the lowercase
/// Spanish month names in calendar order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Month {
    Enero,
    Febrero,
    Marzo,
    Abril,
    Mayo,
    Junio,
    Julio,
    Agosto,
    Septiembre,
    Octubre,
    Noviembre,
    Diciembre,
}

impl Month {
    pub const ALL: [Month; 12] = [
        Month::Enero,
        Month::Febrero,
        Month::Marzo,
        Month::Abril,
        Month::Mayo,
        Month::Junio,
        Month::Julio,
        Month::Agosto,
        Month::Septiembre,
        Month::Octubre,
        Month::Noviembre,
        Month::Diciembre,
    ];

    /// 1-based calendar number (enero = 1).
    pub fn number(self) -> u32 {
        self as u32 + 1
    }

    pub fn key(self) -> &'static str {
        match self {
            Month::Enero => "enero",
            Month::Febrero => "febrero",
            Month::Marzo => "marzo",
            Month::Abril => "abril",
            Month::Mayo => "mayo",
            Month::Junio => "junio",
            Month::Julio => "julio",
            Month::Agosto => "agosto",
            Month::Septiembre => "septiembre",
            Month::Octubre => "octubre",
            Month::Noviembre => "noviembre",
            Month::Diciembre => "diciembre",
        }
    }
}

/// One student row from the tuition ledger.
///
/// `monthly_fee` is always non-negative; when the fee cell cannot be parsed
/// it falls back to zero, and `raw_fee` keeps the original cell text so a
/// legitimate zero can be told apart from a parse fallback.
#[derive(Debug, Clone, PartialEq)]
pub struct StudentRecord {
    pub id: String,
    pub name: String,
    pub grade: String,
    pub monthly_fee: Decimal,
    /// Raw indicator cells keyed by month; non-blank after trimming = paid.
    pub months: BTreeMap<Month, String>,
    /// Original fee cell text, retained for diagnostics.
    pub raw_fee: String,
}

impl StudentRecord {
    pub fn is_paid(&self, month: Month) -> bool {
        self.months
            .get(&month)
            .map(|cell| !cell.trim().is_empty())
            .unwrap_or(false)
    }
}

/// Classified fee cell, one normalization rule per representation.
///
/// Ledger fee cells arrive as plain numbers, currency-formatted text
/// ("L.1,200.00"), or arbitrary text around a number.
#[derive(Debug, Clone, PartialEq)]
pub enum FeeCell {
    Empty,
    Number(Decimal),
    Text(String),
}

impl FeeCell {
    pub fn classify(raw: &str) -> Self {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return FeeCell::Empty;
        }
        match Decimal::from_str(trimmed) {
            Ok(value) => FeeCell::Number(value),
            Err(_) => FeeCell::Text(raw.to_string()),
        }
    }

    /// Normalizes the cell to a monetary value; unrecoverable cells are zero.
    pub fn normalize(&self) -> Decimal {
        match self {
            FeeCell::Empty => Decimal::ZERO,
            FeeCell::Number(value) => *value,
            FeeCell::Text(text) => {
                if text.contains(',') {
                    // Currency-formatted value with a thousands separator:
                    // drop the currency marker and the separator before
                    // parsing so no digits are lost.
                    let cleaned: String = text
                        .replacen("L.", "", 1)
                        .replacen('L', "", 1)
                        .chars()
                        .filter(|c| !c.is_whitespace())
                        .collect();
                    parse_decimal_prefix(&cleaned.replacen(',', "", 1)).unwrap_or(Decimal::ZERO)
                } else {
                    let digits: String =
                        text.chars().filter(|c| c.is_ascii_digit() || *c == '.').collect();
                    parse_decimal_prefix(&digits).unwrap_or(Decimal::ZERO)
                }
            }
        }
    }
}

/// Parses the longest leading `digits[.digits]` run of `s`, if any.
///
/// Matches the permissive number parsing the ledger's producers rely on:
/// trailing garbage is ignored and a second decimal point ends the number.
fn parse_decimal_prefix(s: &str) -> Option<Decimal> {
    let mut end = 0;
    let mut seen_dot = false;
    let mut seen_digit = false;
    for (i, c) in s.char_indices() {
        if c.is_ascii_digit() {
            seen_digit = true;
            end = i + c.len_utf8();
        } else if c == '.' && !seen_dot {
            seen_dot = true;
            end = i + c.len_utf8();
        } else {
            break;
        }
    }
    if !seen_digit {
        return None;
    }
    let prefix = s[..end].trim_end_matches('.');
    let padded;
    let candidate = if prefix.starts_with('.') {
        padded = format!("0{prefix}");
        &padded
    } else {
        prefix
    };
    Decimal::from_str(candidate).ok()
}
