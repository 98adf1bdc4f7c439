//! extrato-finance: CSV amount normalization, spreadsheet export and the
//! remote list-store client.

pub mod csv_table;
pub mod list_store;
pub mod oauth;
pub mod summary;
pub mod workbook;

pub use csv_table::{ConversionSummary, CsvRow, CsvTable, find_valor_column, load_csv};
pub use list_store::ListStore;
pub use oauth::{AccessToken, ClientCredentials};
pub use summary::SummaryRecord;
pub use workbook::ExportOptions;
