//! Ledger integrity violations that abort computation for a holding.

use crate::domain::{Decimal, TradeDate};
use thiserror::Error;

/// A malformed ledger. Every variant names the offending event by its
/// position in the input and its trade key.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LedgerIntegrityError {
    #[error(
        "sell of {requested} shares at event {index} ({trade_key}, {date}) exceeds holding of {held}; short by {shortfall}"
    )]
    Oversell {
        index: usize,
        trade_key: String,
        date: TradeDate,
        requested: Decimal,
        held: Decimal,
        shortfall: Decimal,
    },
    #[error("event {index} ({trade_key}) dated {date} precedes previous event dated {previous}")]
    OutOfOrder {
        index: usize,
        trade_key: String,
        date: TradeDate,
        previous: TradeDate,
    },
    #[error("cash dividend at event {index} ({trade_key}, {date}) has no holding to attach to")]
    OrphanDividend {
        index: usize,
        trade_key: String,
        date: TradeDate,
    },
    #[error("event {index} ({trade_key}) is invalid: {reason}")]
    InvalidEvent {
        index: usize,
        trade_key: String,
        reason: String,
    },
    /// A derived figure left the representable decimal range. `index` is the
    /// last event that fed into it.
    #[error("{quantity} overflows the decimal range at event {index} ({trade_key})")]
    Overflow {
        index: usize,
        trade_key: String,
        quantity: &'static str,
    },
}

impl LedgerIntegrityError {
    /// Index of the offending event in the input ledger.
    pub fn index(&self) -> usize {
        match self {
            LedgerIntegrityError::Oversell { index, .. }
            | LedgerIntegrityError::OutOfOrder { index, .. }
            | LedgerIntegrityError::OrphanDividend { index, .. }
            | LedgerIntegrityError::InvalidEvent { index, .. }
            | LedgerIntegrityError::Overflow { index, .. } => *index,
        }
    }

    pub fn trade_key(&self) -> &str {
        match self {
            LedgerIntegrityError::Oversell { trade_key, .. }
            | LedgerIntegrityError::OutOfOrder { trade_key, .. }
            | LedgerIntegrityError::OrphanDividend { trade_key, .. }
            | LedgerIntegrityError::InvalidEvent { trade_key, .. }
            | LedgerIntegrityError::Overflow { trade_key, .. } => trade_key,
        }
    }
}
