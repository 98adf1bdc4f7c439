//! Beneficiary (PIX/transfer) lines.
//!
//! Expected extracted-text rows:
//!   05/09 PIX ENVIO JOÃO DA SILVA 18236120 0001 12345-6 1.500,00
//!   DATE  CHANNEL TYPE BENEFICIARY ISPB(8) AGENCY(3-5) ACCOUNT AMOUNT
//!
//! ISPB, agency and account only gate the match; they are not returned.

use anyhow::Result;
use extrato_core::{BeneficiaryRow, valor_br_para_float};
use regex::Regex;

use super::AMOUNT_TOKEN;

pub struct PixParser {
    line_re: Regex,
}

impl PixParser {
    pub fn new() -> Result<Self> {
        let line_re = Regex::new(&format!(
            concat!(
                r"^\s*(?P<date>\d{{2}}/\d{{2}})\s+",
                r"(?P<channel>\S+)\s+",
                r"(?P<kind>[A-Za-z0-9 ]+?)\s+",
                r"(?P<beneficiary>[\p{{L}}\d .,&'/()*-]+?)\s+",
                r"(?P<ispb>\d{{8}})\s+",
                r"(?P<agency>\d{{3,5}})\s+",
                r"(?P<account>[\d-]+)\s+",
                "{amount}",
                r"\s*$"
            ),
            amount = AMOUNT_TOKEN
        ))?;
        Ok(Self { line_re })
    }

    pub fn parse_line(&self, line: &str) -> Option<BeneficiaryRow> {
        let caps = self.line_re.captures(line)?;
        Some(BeneficiaryRow {
            date: caps["date"].to_string(),
            channel: caps["channel"].to_string(),
            kind: caps["kind"].trim().to_string(),
            beneficiary: caps["beneficiary"].trim().to_string(),
            amount: valor_br_para_float(caps.name("amount").map(|m| m.as_str())),
        })
    }

    pub fn parse_text(&self, text: &str) -> Vec<BeneficiaryRow> {
        text.lines().filter_map(|l| self.parse_line(l)).collect()
    }
}
