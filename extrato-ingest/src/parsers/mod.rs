//! Line parsers for Brazilian bank/credit-card statements.
//!
//! Each parser recognizes one fixed line shape and silently skips every
//! other line.

pub mod debit;
pub mod pix;

/// Trailing BRL amount token: optional minus, digits with `.` groups, `,` and cents.
pub(crate) const AMOUNT_TOKEN: &str = r"(?P<amount>-?\d[\d.]*,\d{2})";
