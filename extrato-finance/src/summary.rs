//! Summary records pushed to the remote list after a statement is reviewed.

use anyhow::{Context, Result};
use chrono::NaiveDate;
use extrato_core::StatementTables;
use serde::Serialize;

pub const DEBIT_TOTAL_LABEL: &str = "Total Débitos";
pub const PIX_TOTAL_LABEL: &str = "Total PIX";

/// The `fields` object of one list item.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SummaryRecord {
    #[serde(rename = "Title")]
    pub title: String,
    #[serde(rename = "Despesa")]
    pub expense: String,
    #[serde(rename = "Valor")]
    pub amount: f64,
    #[serde(rename = "Vencimento", skip_serializing_if = "Option::is_none")]
    pub due: Option<String>,
    #[serde(rename = "QuemPagou", skip_serializing_if = "Option::is_none")]
    pub paid_by: Option<String>,
    #[serde(rename = "pago", skip_serializing_if = "Option::is_none")]
    pub paid: Option<bool>,
}

/// Metadata the user attaches to a statement push.
#[derive(Debug, Clone, Default)]
pub struct SummaryMeta {
    pub title: String,
    pub due: Option<NaiveDate>,
    pub paid_by: Option<String>,
    pub paid: bool,
}

/// Parse a `DD/MM/YYYY` due date.
pub fn parse_due_date(s: &str) -> Result<NaiveDate> {
    NaiveDate::parse_from_str(s.trim(), "%d/%m/%Y")
        .with_context(|| format!("invalid due date {s:?} (expected DD/MM/YYYY)"))
}

/// One record per non-empty table: debit total and PIX total.
pub fn statement_summary(tables: &StatementTables, meta: &SummaryMeta) -> Vec<SummaryRecord> {
    let mut out = Vec::new();
    let make = |expense: &str, amount: f64| SummaryRecord {
        title: meta.title.clone(),
        expense: expense.to_string(),
        amount,
        due: meta.due.map(|d| d.format("%Y-%m-%d").to_string()),
        paid_by: meta.paid_by.clone(),
        paid: Some(meta.paid),
    };

    if !tables.transactions.is_empty() {
        out.push(make(DEBIT_TOTAL_LABEL, tables.total_transactions()));
    }
    if !tables.beneficiaries.is_empty() {
        out.push(make(PIX_TOTAL_LABEL, tables.total_beneficiaries()));
    }
    out
}

/// Fixed item used to check credentials and list permissions end to end.
pub fn test_item() -> SummaryRecord {
    SummaryRecord {
        title: "Teste Python".to_string(),
        expense: DEBIT_TOTAL_LABEL.to_string(),
        amount: 123.45,
        due: None,
        paid_by: None,
        paid: None,
    }
}
