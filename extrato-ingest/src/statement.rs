//! Per-page statement parsing.

use anyhow::Result;
use extrato_core::StatementTables;
use tracing::debug;

use crate::parsers::{debit::DebitParser, pix::PixParser};

/// Both line parsers, compiled once per statement.
pub struct StatementParser {
    debit: DebitParser,
    pix: PixParser,
}

impl StatementParser {
    pub fn new() -> Result<Self> {
        Ok(Self {
            debit: DebitParser::new()?,
            pix: PixParser::new()?,
        })
    }

    /// Tables recognized in a single page of text. Either side may be empty.
    pub fn parse_page(&self, text: &str) -> StatementTables {
        StatementTables {
            transactions: self.debit.parse_text(text),
            beneficiaries: self.pix.parse_text(text),
        }
    }

    /// Parse every page and concatenate the results in page order.
    pub fn parse_pages<S: AsRef<str>>(&self, pages: &[S]) -> StatementTables {
        let mut out = StatementTables::default();
        for (i, page) in pages.iter().enumerate() {
            let tables = self.parse_page(page.as_ref());
            debug!(
                page = i + 1,
                transactions = tables.transactions.len(),
                beneficiaries = tables.beneficiaries.len(),
                "parsed page"
            );
            out.extend(tables);
        }
        out
    }
}

/// Convenience wrapper: compile the parsers and parse all pages.
pub fn parse_statement_pages<S: AsRef<str>>(pages: &[S]) -> Result<StatementTables> {
    Ok(StatementParser::new()?.parse_pages(pages))
}
