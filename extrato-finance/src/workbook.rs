//! Spreadsheet export (rust_xlsxwriter) and read-back (calamine).

use anyhow::{Context, Result, anyhow};
use calamine::{Data, Reader, Xlsx, open_workbook};
use extrato_core::{StatementTables, round2};
use rust_xlsxwriter::{Format, Table, TableColumn, TableStyle, Workbook, Worksheet};
use std::path::Path;
use tracing::info;

use crate::csv_table::{CsvTable, cell_to_json};

pub const TRANSACTIONS_SHEET: &str = "Transacoes";
pub const BENEFICIARIES_SHEET: &str = "Beneficiarios";
pub const CSV_SHEET: &str = "Dados";
pub const TOTAL_LABEL: &str = "TOTAL";

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ExportOptions {
    /// Wrap the data range in an Excel table.
    pub styled_table: bool,
    /// Append a `TOTAL` row with the amount column sum.
    pub total_row: bool,
}

/// One sheet's worth of rows, amounts in `amount_col`.
struct SheetData<'a> {
    name: &'a str,
    headers: Vec<String>,
    rows: Vec<Vec<Cell>>,
    amount_col: u16,
}

enum Cell {
    Text(String),
    Number(f64),
    Blank,
}

/// Write the statement tables, one sheet per non-empty table.
pub fn write_statement_workbook(
    path: impl AsRef<Path>,
    tables: &StatementTables,
    opts: ExportOptions,
) -> Result<()> {
    let mut sheets = Vec::new();

    if !tables.transactions.is_empty() {
        sheets.push(SheetData {
            name: TRANSACTIONS_SHEET,
            headers: vec!["Data".into(), "Estabelecimento".into(), "Valor".into()],
            rows: tables
                .transactions
                .iter()
                .map(|t| {
                    vec![
                        Cell::Text(t.date.clone()),
                        Cell::Text(t.description.clone()),
                        Cell::Number(t.amount),
                    ]
                })
                .collect(),
            amount_col: 2,
        });
    }

    if !tables.beneficiaries.is_empty() {
        sheets.push(SheetData {
            name: BENEFICIARIES_SHEET,
            headers: vec!["Data".into(), "Beneficiário".into(), "Valor".into()],
            rows: tables
                .beneficiaries
                .iter()
                .map(|b| {
                    vec![
                        Cell::Text(b.date.clone()),
                        Cell::Text(b.beneficiary.clone()),
                        Cell::Number(b.amount),
                    ]
                })
                .collect(),
            amount_col: 2,
        });
    }

    if sheets.is_empty() {
        return Err(anyhow!("nothing to export: statement has no rows"));
    }

    save(path.as_ref(), &sheets, opts)
}

/// Write the (already filtered) CSV table. The `valor` column carries the
/// derived number; the remaining columns keep their original text.
pub fn write_csv_workbook(path: impl AsRef<Path>, table: &CsvTable, opts: ExportOptions) -> Result<()> {
    let rows = table
        .rows
        .iter()
        .map(|row| {
            row.cells
                .iter()
                .enumerate()
                .map(|(i, cell)| {
                    if i == table.valor_column && !row.valor.is_nan() {
                        return Cell::Number(row.valor);
                    }
                    match cell_to_json(cell.as_deref()) {
                        serde_json::Value::Null => Cell::Blank,
                        serde_json::Value::Number(n) => {
                            n.as_f64().map(Cell::Number).unwrap_or(Cell::Blank)
                        }
                        _ => Cell::Text(cell.clone().unwrap_or_default()),
                    }
                })
                .collect()
        })
        .collect();

    let sheet = SheetData {
        name: CSV_SHEET,
        headers: table.headers.clone(),
        rows,
        amount_col: table.valor_column as u16,
    };

    save(path.as_ref(), &[sheet], opts)
}

fn save(path: &Path, sheets: &[SheetData<'_>], opts: ExportOptions) -> Result<()> {
    let mut workbook = Workbook::new();
    let bold = Format::new().set_bold();
    let money = Format::new().set_num_format("#,##0.00");

    for sheet in sheets {
        let ws = workbook.add_worksheet();
        ws.set_name(sheet.name)?;
        write_sheet(ws, sheet, opts, &bold, &money)
            .with_context(|| format!("writing sheet {}", sheet.name))?;
    }

    workbook
        .save(path)
        .with_context(|| format!("saving {}", path.display()))?;
    info!(path = %path.display(), sheets = sheets.len(), "wrote workbook");
    Ok(())
}

fn write_sheet(
    ws: &mut Worksheet,
    sheet: &SheetData<'_>,
    opts: ExportOptions,
    bold: &Format,
    money: &Format,
) -> Result<()> {
    for (col, header) in sheet.headers.iter().enumerate() {
        ws.write_string_with_format(0, col as u16, header, bold)?;
        ws.set_column_width(col as u16, 18)?;
    }

    let mut total = 0.0;
    for (i, row) in sheet.rows.iter().enumerate() {
        let r = (i + 1) as u32;
        for (col, cell) in row.iter().enumerate() {
            let c = col as u16;
            match cell {
                Cell::Text(s) => {
                    ws.write_string(r, c, s)?;
                }
                Cell::Number(n) if c == sheet.amount_col => {
                    ws.write_number_with_format(r, c, *n, money)?;
                    total += *n;
                }
                Cell::Number(n) => {
                    ws.write_number(r, c, *n)?;
                }
                Cell::Blank => {}
            }
        }
    }

    let last_row = sheet.rows.len() as u32;
    let last_col = (sheet.headers.len().max(1) - 1) as u16;

    if opts.styled_table && !sheet.rows.is_empty() {
        let columns: Vec<TableColumn> = sheet
            .headers
            .iter()
            .map(|h| TableColumn::new().set_header(h))
            .collect();
        let table = Table::new()
            .set_style(TableStyle::Medium9)
            .set_columns(&columns);
        ws.add_table(0, 0, last_row, last_col, &table)?;
    }

    if opts.total_row {
        let r = last_row + 1;
        let label_col = if sheet.amount_col == 0 { 1 } else { 0 };
        ws.write_string_with_format(r, label_col, TOTAL_LABEL, bold)?;
        ws.write_number_with_format(r, sheet.amount_col, round2(total), money)?;
    }

    Ok(())
}

/// Every numeric value under `header` in `sheet`, excluding the `TOTAL` row.
pub fn read_amount_column(path: impl AsRef<Path>, sheet: &str, header: &str) -> Result<Vec<f64>> {
    Ok(read_amounts(path.as_ref(), sheet, header)?.0)
}

/// The `TOTAL` row amount under `header`, if one was written.
pub fn read_total(path: impl AsRef<Path>, sheet: &str, header: &str) -> Result<Option<f64>> {
    Ok(read_amounts(path.as_ref(), sheet, header)?.1)
}

fn read_amounts(path: &Path, sheet: &str, header: &str) -> Result<(Vec<f64>, Option<f64>)> {
    let mut wb: Xlsx<_> = open_workbook(path).with_context(|| format!("opening {}", path.display()))?;
    let range = wb
        .worksheet_range(sheet)
        .with_context(|| format!("reading sheet {sheet}"))?;

    let mut rows = range.rows();
    let header_row = rows.next().ok_or_else(|| anyhow!("sheet {sheet} is empty"))?;
    let col = header_row
        .iter()
        .position(|c| matches!(c, Data::String(s) if s == header))
        .ok_or_else(|| anyhow!("column {header} not found in sheet {sheet}"))?;

    let mut data: Vec<&[Data]> = rows.collect();
    let total_row = match data.last() {
        Some(last) if is_total_row(last, col) => data.pop(),
        _ => None,
    };

    let amounts = data.iter().filter_map(|row| cell_number(row.get(col))).collect();
    let total = total_row.and_then(|row| cell_number(row.get(col)));
    Ok((amounts, total))
}

/// The row `write_sheet` appends: `TOTAL` in the label column, the sum in the
/// amount column and nothing else. Only the last row can be one.
fn is_total_row(row: &[Data], amount_col: usize) -> bool {
    let label_col = if amount_col == 0 { 1 } else { 0 };
    row.iter().enumerate().all(|(i, c)| {
        if i == label_col {
            matches!(c, Data::String(s) if s == TOTAL_LABEL)
        } else if i == amount_col {
            true
        } else {
            matches!(c, Data::Empty)
        }
    }) && matches!(row.get(label_col), Some(Data::String(_)))
}

fn cell_number(cell: Option<&Data>) -> Option<f64> {
    match cell {
        Some(Data::Float(f)) => Some(*f),
        Some(Data::Int(i)) => Some(*i as f64),
        _ => None,
    }
}

pub fn sheet_names(path: impl AsRef<Path>) -> Result<Vec<String>> {
    let wb: Xlsx<_> = open_workbook(path.as_ref())
        .with_context(|| format!("opening {}", path.as_ref().display()))?;
    Ok(wb.sheet_names())
}
