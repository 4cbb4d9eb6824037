//! Ledger ordering checks.
//!
//! The engine never re-sorts a ledger: entries on the same date keep their
//! input order, and an entry dated before its predecessor is a data error.

use crate::domain::{LedgerIntegrityError, TradeEvent};

/// Validate every entry and require non-decreasing dates.
pub fn check_ledger(trades: &[TradeEvent]) -> Result<(), LedgerIntegrityError> {
    let mut previous = None;
    for (index, trade) in trades.iter().enumerate() {
        trade.validate(index)?;
        if let Some(prev) = previous {
            if trade.date < prev {
                return Err(LedgerIntegrityError::OutOfOrder {
                    index,
                    trade_key: trade.trade_key.clone(),
                    date: trade.date,
                    previous: prev,
                });
            }
        }
        previous = Some(trade.date);
    }
    Ok(())
}
