//! Amount normalizers for Brazilian-formatted money strings.
//!
//! Two flavours exist because statement parsing and CSV ingestion disagree on
//! what to do with garbage: statements coerce to `0.0`, CSV cells become `NaN`.

use tracing::debug;

/// Round to two decimal places.
pub fn round2(v: f64) -> f64 {
    (v * 100.0).round() / 100.0
}

/// Convert a BRL amount (`1.234,56`) matched out of a statement line.
///
/// Missing, empty or unparsable input yields `0.0`.
pub fn valor_br_para_float(raw: Option<&str>) -> f64 {
    let Some(raw) = raw else {
        return 0.0;
    };

    let s = raw.trim().replace('.', "").replace(',', ".");
    match s.parse::<f64>() {
        Ok(v) => round2(v),
        Err(_) => {
            debug!(raw, "unparsable statement amount, using 0.0");
            0.0
        }
    }
}

/// Convert a CSV cell in mixed currency notation to a number.
///
/// Handles `R$ 1.234,56`, `-1.234,56`, `(1.234,56)` and `1234.56`.
/// Missing or unparsable cells yield `NaN`.
pub fn parse_val_to_float(raw: Option<&str>) -> f64 {
    let Some(raw) = raw else {
        return f64::NAN;
    };

    let mut s = raw
        .trim()
        .replace("R$", "")
        .replace("r$", "")
        .replace('\u{a0}', "")
        .trim()
        .to_string();

    if s.len() >= 2 && s.starts_with('(') && s.ends_with(')') {
        s = format!("-{}", &s[1..s.len() - 1]);
    }

    s = s.replace('+', "");

    let has_dot = s.contains('.');
    let has_comma = s.contains(',');
    if has_dot && has_comma {
        s = s.replace('.', "").replace(',', ".");
    } else if has_comma {
        s = s.replace(',', ".");
    }

    s = s.replace(' ', "");

    if let Ok(v) = s.parse::<f64>() {
        return v;
    }

    let cleaned: String = s
        .chars()
        .filter(|c| c.is_ascii_digit() || *c == '.' || *c == '-')
        .collect();
    if matches!(cleaned.as_str(), "" | "-" | ".") {
        return f64::NAN;
    }
    cleaned.parse::<f64>().unwrap_or(f64::NAN)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_valor_br_basic() {
        assert_eq!(valor_br_para_float(Some("1.234,56")), 1234.56);
        assert_eq!(valor_br_para_float(Some("0,5")), 0.5);
        assert_eq!(valor_br_para_float(Some("  123,45 ")), 123.45);
        assert_eq!(valor_br_para_float(Some("-1.000,00")), -1000.0);
    }

    #[test]
    fn test_valor_br_lenient_zero() {
        assert_eq!(valor_br_para_float(None), 0.0);
        assert_eq!(valor_br_para_float(Some("")), 0.0);
        assert_eq!(valor_br_para_float(Some("abc")), 0.0);
    }

    #[test]
    fn test_valor_br_rounds_to_cents() {
        assert_eq!(valor_br_para_float(Some("1,999")), 2.0);
        assert_eq!(valor_br_para_float(Some("3,14159")), 3.14);
    }

    #[test]
    fn test_parse_val_currency_and_parens() {
        assert_eq!(parse_val_to_float(Some("R$ 1.234,56")), 1234.56);
        assert_eq!(parse_val_to_float(Some("r$\u{a0}10,00")), 10.0);
        assert_eq!(parse_val_to_float(Some("(1.234,56)")), -1234.56);
        assert_eq!(parse_val_to_float(Some("-R$ 50,25")), -50.25);
    }

    #[test]
    fn test_parse_val_locale_disambiguation() {
        assert_eq!(parse_val_to_float(Some("1234.56")), 1234.56);
        assert_eq!(parse_val_to_float(Some("12,5")), 12.5);
        assert_eq!(parse_val_to_float(Some("+7,00")), 7.0);
        assert_eq!(parse_val_to_float(Some("-3")), -3.0);
    }

    #[test]
    fn test_parse_val_fallback_filter() {
        // trailing text is stripped on the second attempt
        assert_eq!(parse_val_to_float(Some("-45,90 BRL")), -45.9);
        assert_eq!(parse_val_to_float(Some("USD 12.00")), 12.0);
    }

    #[test]
    fn test_parse_val_unparsable_is_nan() {
        assert!(parse_val_to_float(Some("")).is_nan());
        assert!(parse_val_to_float(None).is_nan());
        assert!(parse_val_to_float(Some("abc")).is_nan());
        assert!(parse_val_to_float(Some("R$ -")).is_nan());
        assert!(parse_val_to_float(Some("1-2-3")).is_nan());
    }
}
