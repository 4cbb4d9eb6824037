//! Compile pipeline turning a holding's trade ledger into rounds and global
//! statistics.
//!
//! The pipeline is a pure function: the same ledger, costing method, rate,
//! price and as-of date always produce identical output. Callers recompute
//! from scratch whenever the ledger changes, since a back-dated correction
//! can move round boundaries anywhere after it.

use crate::domain::{CostingMethod, Decimal, LedgerIntegrityError, TradeDate, TradeEvent};
use crate::engine::{aggregate, GlobalStats, HoldingSnapshot, Round, RoundSegmenter};
use serde::Serialize;

/// Rounds of one holding plus their aggregate.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HoldingRounds {
    pub rounds: Vec<Round>,
    /// `None` iff there are no rounds.
    pub global_stats: Option<GlobalStats>,
}

impl HoldingRounds {
    pub fn empty() -> Self {
        Self {
            rounds: Vec::new(),
            global_stats: None,
        }
    }

    /// The open round, if the holding is still held.
    pub fn open_round(&self) -> Option<&Round> {
        self.rounds.last().filter(|r| !r.is_cleared)
    }
}

/// Compute rounds and global statistics for one holding.
///
/// # Arguments
/// * `trades` - Ledger entries, oldest first; same-date entries keep their order
/// * `costing_method` - Lot accounting convention
/// * `annual_expense_rate` - Yearly holding-cost fraction (e.g. `0.015`)
/// * `current_valuation_price` - Price for unrealized P&L; `None` leaves those fields null
/// * `as_of` - The "now" used for open rounds and holding days
/// * `snapshot` - Authoritative valuation fields that override ledger values
///
/// # Errors
/// Returns a `LedgerIntegrityError` if the ledger is malformed or a derived
/// figure overflows the decimal range; no partial result is produced.
pub fn compute_holding_rounds(
    trades: &[TradeEvent],
    costing_method: CostingMethod,
    annual_expense_rate: Decimal,
    current_valuation_price: Option<Decimal>,
    as_of: TradeDate,
    snapshot: Option<&HoldingSnapshot>,
) -> Result<HoldingRounds, LedgerIntegrityError> {
    if trades.is_empty() {
        return Ok(HoldingRounds::empty());
    }

    let segmenter = RoundSegmenter::new(
        costing_method,
        annual_expense_rate,
        current_valuation_price,
        as_of,
    );

    let rounds = segmenter.segment(trades).map_err(log_violation)?;
    let global_stats = aggregate(&rounds, as_of, snapshot).map_err(log_violation)?;

    tracing::debug!(
        trades = trades.len(),
        rounds = rounds.len(),
        method = %costing_method,
        holding = global_stats.as_ref().map(|g| g.is_holding).unwrap_or(false),
        "Computed holding rounds"
    );

    Ok(HoldingRounds {
        rounds,
        global_stats,
    })
}

fn log_violation(e: LedgerIntegrityError) -> LedgerIntegrityError {
    tracing::warn!(
        index = e.index(),
        trade_key = %e.trade_key(),
        error = %e,
        "Ledger integrity violation"
    );
    e
}

#[cfg(test)]
mod tests {
    use super::*;

    fn d(s: &str) -> Decimal {
        Decimal::from_str_canonical(s).unwrap()
    }

    fn day(n: u32) -> TradeDate {
        TradeDate::from_ymd_opt(2023, 1, n).unwrap()
    }

    #[test]
    fn test_empty_ledger() {
        let result = compute_holding_rounds(
            &[],
            CostingMethod::Fifo,
            Decimal::ZERO,
            None,
            day(1),
            None,
        )
        .unwrap();
        assert!(result.rounds.is_empty());
        assert!(result.global_stats.is_none());
        assert!(result.open_round().is_none());
    }

    #[test]
    fn test_open_round_accessor() {
        let trades = vec![TradeEvent::buy(day(1), d("1"), d("10"), d("0"))];
        let result = compute_holding_rounds(
            &trades,
            CostingMethod::Fifo,
            Decimal::ZERO,
            Some(d("11")),
            day(2),
            None,
        )
        .unwrap();
        assert_eq!(result.open_round().map(|r| r.index), Some(0));
    }

    #[test]
    fn test_integrity_error_yields_no_result() {
        let trades = vec![
            TradeEvent::buy(day(1), d("100"), d("1000"), d("0")),
            TradeEvent::sell(day(2), d("150"), d("1800"), d("0")),
        ];
        let err = compute_holding_rounds(
            &trades,
            CostingMethod::MovingAverage,
            Decimal::ZERO,
            None,
            day(3),
            None,
        )
        .unwrap_err();
        assert_eq!(err.index(), 1);
    }
}
