//! Adapters that turn upstream trade-record exports into ledger entries.

pub mod ledger_csv;

pub use ledger_csv::{parse_ledger_csv, LedgerCsvError};
