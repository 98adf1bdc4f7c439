//! extrato-ingest: statement text extraction (PDF/OCR) and line parsers.

pub mod parsers;
pub mod pdf;
pub mod statement;

pub use pdf::{PageOcr, extract_pages, statement_pages};
pub use statement::{StatementParser, parse_statement_pages};
