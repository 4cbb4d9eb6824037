//! Parsing trade ledgers exported as CSV.
//!
//! Expected header: `date,kind,shares,cash_amount,fee,id`. `shares`, `fee`
//! and `id` may be empty; rows keep their file order.

use crate::domain::{Decimal, TradeDate, TradeEvent, TradeKind};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum LedgerCsvError {
    #[error("csv parse error: {0}")]
    Csv(String),
    #[error("row {row}: {message}")]
    Row { row: usize, message: String },
}

#[derive(Debug, serde::Deserialize)]
struct Row {
    date: String,
    kind: String,
    #[serde(default)]
    shares: Option<String>,
    cash_amount: String,
    #[serde(default)]
    fee: Option<String>,
    #[serde(default)]
    id: Option<i64>,
}

fn parse_amount(value: Option<&str>, row: usize, field: &str) -> Result<Decimal, LedgerCsvError> {
    match value.map(str::trim).filter(|s| !s.is_empty()) {
        None => Ok(Decimal::ZERO),
        Some(s) => Decimal::from_str_canonical(s).map_err(|e| LedgerCsvError::Row {
            row,
            message: format!("invalid {}: {}", field, e),
        }),
    }
}

/// Parse CSV bytes into ledger entries, 1-based row numbers in errors.
pub fn parse_ledger_csv(csv_bytes: &[u8]) -> Result<Vec<TradeEvent>, LedgerCsvError> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .trim(csv::Trim::All)
        .from_reader(csv_bytes);

    let mut trades = Vec::new();
    for (i, record) in reader.deserialize::<Row>().enumerate() {
        let row_no = i + 1;
        let row = record.map_err(|e| LedgerCsvError::Csv(e.to_string()))?;

        let date = TradeDate::parse_from_str(&row.date, "%Y-%m-%d").map_err(|e| {
            LedgerCsvError::Row {
                row: row_no,
                message: format!("invalid date {}: {}", row.date, e),
            }
        })?;
        let kind: TradeKind = row.kind.parse().map_err(|message| LedgerCsvError::Row {
            row: row_no,
            message,
        })?;
        let shares = parse_amount(row.shares.as_deref(), row_no, "shares")?;
        let cash_amount = parse_amount(Some(&row.cash_amount), row_no, "cash_amount")?;
        let fee = parse_amount(row.fee.as_deref(), row_no, "fee")?;

        trades.push(TradeEvent::new(date, kind, shares, cash_amount, fee, row.id));
    }

    Ok(trades)
}
