//! Load a CSV with a `valor` column and normalize it to numbers.
//!
//! The column lookup is case-insensitive and the first match wins. Each row
//! keeps its original cells next to the derived value.

use anyhow::{Context, Result};
use extrato_core::{ExtratoError, parse_val_to_float};
use serde_json::{Map, Number, Value};
use std::fmt;
use std::io::Read;
use std::path::Path;
use tracing::info;

#[derive(Debug, Clone, PartialEq)]
pub struct CsvRow {
    /// Original cells in header order; `None` for empty/missing cells.
    pub cells: Vec<Option<String>>,
    /// Number parsed from the `valor` column, `NaN` when unparsable.
    pub valor: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct CsvTable {
    pub headers: Vec<String>,
    pub valor_column: usize,
    pub rows: Vec<CsvRow>,
}

/// Counts reported after conversion.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ConversionSummary {
    pub total: usize,
    pub negative: usize,
    pub positive: usize,
    pub zero: usize,
    pub unparsable: usize,
}

impl fmt::Display for ConversionSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Linhas: {} • Negativos: {} • Positivos: {} • Zeros: {} • Não convertidos (NaN): {}",
            self.total, self.negative, self.positive, self.zero, self.unparsable
        )
    }
}

pub fn find_valor_column(headers: &[String]) -> Option<usize> {
    headers.iter().position(|h| h.eq_ignore_ascii_case("valor"))
}

pub fn load_csv(path: impl AsRef<Path>) -> Result<CsvTable> {
    let file = std::fs::File::open(path.as_ref())
        .with_context(|| format!("opening {}", path.as_ref().display()))?;
    let table = read_csv(file).with_context(|| format!("parsing {}", path.as_ref().display()))?;
    info!(
        rows = table.rows.len(),
        valor_column = %table.headers[table.valor_column],
        "loaded CSV"
    );
    Ok(table)
}

/// Read a CSV from any reader. Fails before touching rows when no `valor`
/// column exists.
pub fn read_csv<R: Read>(reader: R) -> Result<CsvTable> {
    let mut rdr = csv::ReaderBuilder::new()
        .flexible(true)
        .has_headers(true)
        .from_reader(reader);

    let headers: Vec<String> = rdr.headers()?.iter().map(|h| h.to_string()).collect();
    let valor_column = find_valor_column(&headers)
        .ok_or_else(|| ExtratoError::MissingValorColumn(headers.join(", ")))?;

    let mut rows = Vec::new();
    for result in rdr.records() {
        let record = result?;
        let cells: Vec<Option<String>> = (0..headers.len())
            .map(|i| {
                record
                    .get(i)
                    .filter(|s| !s.trim().is_empty())
                    .map(|s| s.to_string())
            })
            .collect();
        let valor = parse_val_to_float(cells[valor_column].as_deref());
        rows.push(CsvRow { cells, valor });
    }

    Ok(CsvTable {
        headers,
        valor_column,
        rows,
    })
}

impl CsvTable {
    pub fn valor_header(&self) -> &str {
        &self.headers[self.valor_column]
    }

    pub fn summary(&self) -> ConversionSummary {
        let mut s = ConversionSummary {
            total: self.rows.len(),
            ..Default::default()
        };
        for row in &self.rows {
            let v = row.valor;
            if v.is_nan() {
                s.unparsable += 1;
            } else if v < 0.0 {
                s.negative += 1;
            } else if v > 0.0 {
                s.positive += 1;
            } else {
                s.zero += 1;
            }
        }
        s
    }

    /// Up to `limit` rows whose `valor` could not be converted.
    pub fn unparsable_sample(&self, limit: usize) -> Vec<&CsvRow> {
        self.rows.iter().filter(|r| r.valor.is_nan()).take(limit).collect()
    }

    /// Keep only rows with a strictly negative value, in original order.
    /// Unparsable rows are dropped.
    pub fn retain_negative(mut self) -> Self {
        self.rows.retain(|r| r.valor < 0.0);
        self
    }

    pub fn total_valor(&self) -> f64 {
        extrato_core::round2(
            self.rows
                .iter()
                .map(|r| r.valor)
                .filter(|v| !v.is_nan())
                .sum(),
        )
    }
}

impl CsvRow {
    /// Original columns as a JSON object for the remote list.
    ///
    /// Numbers and booleans keep their type, empty cells become `null`.
    pub fn to_fields(&self, headers: &[String]) -> Map<String, Value> {
        headers
            .iter()
            .zip(&self.cells)
            .map(|(h, c)| (h.clone(), cell_to_json(c.as_deref())))
            .collect()
    }
}

pub fn cell_to_json(cell: Option<&str>) -> Value {
    let Some(raw) = cell else {
        return Value::Null;
    };
    let s = raw.trim();
    if let Ok(i) = s.parse::<i64>() {
        return Value::Number(i.into());
    }
    if let Ok(f) = s.parse::<f64>() {
        if let Some(n) = Number::from_f64(f) {
            return Value::Number(n);
        }
    }
    match s {
        "True" | "true" => Value::Bool(true),
        "False" | "false" => Value::Bool(false),
        _ => Value::String(raw.to_string()),
    }
}
