//! extrato-core: row types, BRL amount normalization and the session work table

pub mod amount;
pub mod error;
pub mod rows;
pub mod work_table;

pub use amount::{parse_val_to_float, round2, valor_br_para_float};
pub use error::ExtratoError;
pub use rows::{BeneficiaryRow, StatementTables, TransactionRow};
pub use work_table::WorkTable;
