//! Row types extracted from statements.

use serde::{Deserialize, Serialize};

/// A debit/purchase line: `DD/MM <seq> <description> <amount>`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TransactionRow {
    #[serde(rename = "Data")]
    pub date: String,
    #[serde(rename = "Estabelecimento")]
    pub description: String,
    #[serde(rename = "Valor")]
    pub amount: f64,
}

/// An outbound PIX/transfer line.
///
/// Routing fields (ISPB, agency, account) are only used to validate the line
/// and are not kept.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BeneficiaryRow {
    #[serde(rename = "Data")]
    pub date: String,
    #[serde(skip)]
    pub channel: String,
    #[serde(skip)]
    pub kind: String,
    #[serde(rename = "Beneficiário")]
    pub beneficiary: String,
    #[serde(rename = "Valor")]
    pub amount: f64,
}

/// Everything recognized in one statement, in page order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct StatementTables {
    pub transactions: Vec<TransactionRow>,
    pub beneficiaries: Vec<BeneficiaryRow>,
}

impl StatementTables {
    /// True when neither pattern matched on any page.
    pub fn is_empty(&self) -> bool {
        self.transactions.is_empty() && self.beneficiaries.is_empty()
    }

    pub fn extend(&mut self, other: StatementTables) {
        self.transactions.extend(other.transactions);
        self.beneficiaries.extend(other.beneficiaries);
    }

    pub fn total_transactions(&self) -> f64 {
        crate::round2(self.transactions.iter().map(|t| t.amount).sum())
    }

    pub fn total_beneficiaries(&self) -> f64 {
        crate::round2(self.beneficiaries.iter().map(|b| b.amount).sum())
    }
}
