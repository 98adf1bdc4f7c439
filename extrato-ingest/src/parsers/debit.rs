//! Debit/purchase lines.
//!
//! Expected extracted-text rows:
//!   12/09 4532 SUPERMERCADO ABC 123,45
//!   13/09 0001 POSTO SHELL   1.020,00
//!
//! The numeric token after the date (card or sequence number) is discarded.

use anyhow::Result;
use extrato_core::{TransactionRow, valor_br_para_float};
use regex::Regex;

use super::AMOUNT_TOKEN;

pub struct DebitParser {
    line_re: Regex,
}

impl DebitParser {
    pub fn new() -> Result<Self> {
        let line_re = Regex::new(&format!(
            concat!(
                r"^\s*(?P<date>\d{{2}}/\d{{2}})\s+",
                r"(?P<seq>\d+)\s+",
                r"(?P<desc>.+?)\s+",
                "{amount}",
                r"\s*$"
            ),
            amount = AMOUNT_TOKEN
        ))?;
        Ok(Self { line_re })
    }

    /// Parse one line; `None` when it does not have the debit shape.
    pub fn parse_line(&self, line: &str) -> Option<TransactionRow> {
        let caps = self.line_re.captures(line)?;
        Some(TransactionRow {
            date: caps["date"].to_string(),
            description: caps["desc"].trim().to_string(),
            amount: valor_br_para_float(caps.name("amount").map(|m| m.as_str())),
        })
    }

    pub fn parse_text(&self, text: &str) -> Vec<TransactionRow> {
        text.lines().filter_map(|l| self.parse_line(l)).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_debit_basic() {
        let p = DebitParser::new().unwrap();
        let row = p.parse_line("12/09 4532 SUPERMERCADO ABC 123,45").unwrap();
        assert_eq!(row.date, "12/09");
        assert_eq!(row.description, "SUPERMERCADO ABC");
        assert_eq!(row.amount, 123.45);
    }

    #[test]
    fn test_parse_debit_thousands_and_spacing() {
        let p = DebitParser::new().unwrap();
        let row = p.parse_line("  13/09   0001   POSTO SHELL   1.020,00  ").unwrap();
        assert_eq!(row.description, "POSTO SHELL");
        assert_eq!(row.amount, 1020.0);

        let refund = p.parse_line("14/09 77 ESTORNO LOJA X -59,90").unwrap();
        assert_eq!(refund.amount, -59.9);
    }

    #[test]
    fn test_description_keeps_inner_numbers() {
        let p = DebitParser::new().unwrap();
        let row = p.parse_line("02/10 9911 UBER *TRIP 3 PARC 02/03 45,10").unwrap();
        assert_eq!(row.description, "UBER *TRIP 3 PARC 02/03");
        assert_eq!(row.amount, 45.1);
    }

    #[test]
    fn test_non_matching_lines_are_skipped() {
        let p = DebitParser::new().unwrap();
        let text = "\
FATURA CARTAO SETEMBRO
DATA  DESCRICAO  VALOR
12/09 4532 SUPERMERCADO ABC 123,45
12/09 SEM NUMERO 10,00
continuação da descrição
15/09 1234 FARMACIA 12.5
";
        let rows = p.parse_text(text);
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].description, "SUPERMERCADO ABC");
    }
}
