//! Folds per-round figures into holding-wide statistics, preferring an
//! authoritative snapshot field by field.

use super::Round;
use crate::domain::{days_between, Decimal, LedgerIntegrityError, TradeDate};
use serde::{Deserialize, Serialize};

/// Externally persisted valuation for a holding. Any field may be absent.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct HoldingSnapshot {
    pub current_shares: Option<Decimal>,
    pub current_cost: Option<Decimal>,
    pub market_value: Option<Decimal>,
    pub unrealized_pnl: Option<Decimal>,
    pub total_profit: Option<Decimal>,
    pub cumulative_return_rate: Option<Decimal>,
}

impl HoldingSnapshot {
    /// Every field, in declaration order.
    pub fn values(&self) -> [Option<Decimal>; 6] {
        [
            self.current_shares,
            self.current_cost,
            self.market_value,
            self.unrealized_pnl,
            self.total_profit,
            self.cumulative_return_rate,
        ]
    }
}

/// Statistics over every round of one holding.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GlobalStats {
    pub total_rounds: usize,
    /// True iff the last round is still open.
    pub is_holding: bool,
    pub current_shares: Decimal,
    pub current_cost: Decimal,
    pub market_value: Option<Decimal>,
    pub realized_pnl: Decimal,
    pub unrealized_pnl: Option<Decimal>,
    pub total_expense_cost: Decimal,
    pub total_dividend_income: Decimal,
    pub total_buy_cost: Decimal,
    pub total_profit: Option<Decimal>,
    pub cumulative_return_rate: Option<Decimal>,
    pub first_trade_date: TradeDate,
    /// Days from the first trade to the as-of date.
    pub total_holding_days: i64,
}

/// Snapshot value if present, otherwise the ledger-computed one.
fn coalesce(field: &'static str, snapshot: Option<Decimal>, computed: Option<Decimal>) -> Option<Decimal> {
    if let (Some(s), Some(c)) = (snapshot, computed) {
        if s != c {
            tracing::debug!(field, snapshot = %s, ledger = %c, "snapshot overrides ledger value");
        }
    }
    snapshot.or(computed)
}

fn coalesce_required(field: &'static str, snapshot: Option<Decimal>, computed: Decimal) -> Decimal {
    coalesce(field, snapshot, Some(computed)).unwrap_or(computed)
}

/// Aggregate `rounds` into global statistics; `None` when there are no rounds.
///
/// # Errors
/// Returns `LedgerIntegrityError::Overflow` if the holding's total profit
/// leaves the decimal range.
pub fn aggregate(
    rounds: &[Round],
    as_of: TradeDate,
    snapshot: Option<&HoldingSnapshot>,
) -> Result<Option<GlobalStats>, LedgerIntegrityError> {
    let (Some(first), Some(last)) = (rounds.first(), rounds.last()) else {
        return Ok(None);
    };
    let snapshot = snapshot.cloned().unwrap_or_default();

    let realized_pnl: Decimal = rounds.iter().map(|r| r.stats.realized_pnl).sum();
    let total_expense_cost: Decimal = rounds.iter().map(|r| r.stats.expense_cost).sum();
    let total_dividend_income: Decimal = rounds.iter().map(|r| r.stats.dividend_income).sum();
    let total_buy_cost: Decimal = rounds.iter().map(|r| r.stats.total_buy_cost).sum();

    // Only the last round can be open, so its valuation is the holding's.
    let current_shares =
        coalesce_required("currentShares", snapshot.current_shares, last.stats.current_shares);
    let current_cost =
        coalesce_required("currentCost", snapshot.current_cost, last.stats.current_cost);
    let market_value = coalesce("marketValue", snapshot.market_value, last.stats.market_value);
    let unrealized_pnl =
        coalesce("unrealizedPnl", snapshot.unrealized_pnl, last.stats.unrealized_pnl);

    let computed_profit = unrealized_pnl
        .map(|u| {
            realized_pnl
                .checked_add(u)
                .and_then(|p| p.checked_sub(total_expense_cost))
                .ok_or_else(|| overflow(rounds, "total profit"))
        })
        .transpose()?;
    let total_profit = coalesce("totalProfit", snapshot.total_profit, computed_profit);
    let computed_rate = total_profit.and_then(|p| p.checked_ratio(total_buy_cost));
    let cumulative_return_rate = coalesce(
        "cumulativeReturnRate",
        snapshot.cumulative_return_rate,
        computed_rate,
    );

    Ok(Some(GlobalStats {
        total_rounds: rounds.len(),
        is_holding: !last.is_cleared,
        current_shares,
        current_cost,
        market_value,
        realized_pnl,
        unrealized_pnl,
        total_expense_cost,
        total_dividend_income,
        total_buy_cost,
        total_profit,
        cumulative_return_rate,
        first_trade_date: first.start_date,
        total_holding_days: days_between(first.start_date, as_of).max(0),
    }))
}

/// Every ledger entry lands in exactly one round, so the last entry of the
/// last round is the last entry of the ledger.
fn overflow(rounds: &[Round], quantity: &'static str) -> LedgerIntegrityError {
    let entries: usize = rounds.iter().map(|r| r.trades.len()).sum();
    LedgerIntegrityError::Overflow {
        index: entries.saturating_sub(1),
        trade_key: rounds
            .last()
            .and_then(|r| r.trades.last())
            .map(|t| t.trade_key.clone())
            .unwrap_or_default(),
        quantity,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{CostingMethod, TradeEvent};
    use crate::engine::RoundSegmenter;

    fn d(s: &str) -> Decimal {
        Decimal::from_str_canonical(s).unwrap()
    }

    fn day(n: u32) -> TradeDate {
        TradeDate::from_ymd_opt(2023, 1, n).unwrap()
    }

    fn two_rounds(price: Option<Decimal>) -> Vec<Round> {
        let trades = vec![
            TradeEvent::buy(day(1), d("100"), d("1000"), d("0")),
            TradeEvent::sell(day(5), d("100"), d("1100"), d("0")),
            TradeEvent::buy(day(10), d("50"), d("500"), d("0")),
        ];
        RoundSegmenter::new(CostingMethod::MovingAverage, Decimal::ZERO, price, day(20))
            .segment(&trades)
            .unwrap()
    }

    fn global(rounds: &[Round], snapshot: Option<&HoldingSnapshot>) -> GlobalStats {
        aggregate(rounds, day(20), snapshot).unwrap().unwrap()
    }

    #[test]
    fn test_empty_rounds_have_no_stats() {
        assert_eq!(aggregate(&[], day(1), None), Ok(None));
    }

    #[test]
    fn test_sums_realized_and_takes_last_unrealized() {
        let rounds = two_rounds(Some(d("12")));
        let stats = global(&rounds, None);
        assert_eq!(stats.total_rounds, 2);
        assert!(stats.is_holding);
        assert_eq!(stats.realized_pnl, d("100"));
        assert_eq!(stats.unrealized_pnl, Some(d("100")));
        assert_eq!(stats.total_profit, Some(d("200")));
        assert_eq!(stats.total_buy_cost, d("1500"));
        assert_eq!(stats.current_shares, d("50"));
        assert_eq!(stats.current_cost, d("500"));
        assert_eq!(stats.total_holding_days, 19);
        assert_eq!(stats.first_trade_date, day(1));
    }

    #[test]
    fn test_missing_price_nulls_profit() {
        let rounds = two_rounds(None);
        let stats = global(&rounds, None);
        assert_eq!(stats.unrealized_pnl, None);
        assert_eq!(stats.total_profit, None);
        assert_eq!(stats.cumulative_return_rate, None);
        assert_eq!(stats.realized_pnl, d("100"));
    }

    #[test]
    fn test_snapshot_fills_missing_valuation_per_field() {
        let rounds = two_rounds(None);
        let snapshot = HoldingSnapshot {
            unrealized_pnl: Some(d("40")),
            ..Default::default()
        };
        let stats = global(&rounds, Some(&snapshot));
        assert_eq!(stats.unrealized_pnl, Some(d("40")));
        assert_eq!(stats.total_profit, Some(d("140")));
        assert_eq!(stats.current_shares, d("50"));
        assert_eq!(stats.market_value, None);
    }

    #[test]
    fn test_snapshot_overrides_only_present_fields() {
        let rounds = two_rounds(Some(d("12")));
        let snapshot = HoldingSnapshot {
            current_shares: Some(d("50.5")),
            total_profit: Some(d("999")),
            ..Default::default()
        };
        let stats = global(&rounds, Some(&snapshot));
        assert_eq!(stats.current_shares, d("50.5"));
        assert_eq!(stats.current_cost, d("500"));
        assert_eq!(stats.unrealized_pnl, Some(d("100")));
        assert_eq!(stats.total_profit, Some(d("999")));
        assert_eq!(stats.cumulative_return_rate, Some(d("0.666")));
    }

    #[test]
    fn test_snapshot_deserializes_with_missing_fields() {
        let snapshot: HoldingSnapshot = serde_json::from_str(r#"{"marketValue": 10}"#).unwrap();
        assert_eq!(snapshot.market_value, Some(d("10")));
        assert_eq!(snapshot.total_profit, None);
    }

    #[test]
    fn test_oversized_snapshot_valuation_is_overflow() {
        let rounds = two_rounds(None);
        let snapshot = HoldingSnapshot {
            unrealized_pnl: Some(d("79228162514264337593543950335")),
            ..Default::default()
        };
        match aggregate(&rounds, day(20), Some(&snapshot)) {
            Err(LedgerIntegrityError::Overflow {
                index, quantity, ..
            }) => {
                assert_eq!(index, 2);
                assert_eq!(quantity, "total profit");
            }
            other => panic!("Expected Overflow, got {:?}", other),
        }
    }
}
