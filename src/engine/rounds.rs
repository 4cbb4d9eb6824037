//! Splits a holding's ledger into rounds: open-to-flat cycles, each priced
//! by its own position state.

use super::expense;
use super::position::{PositionEngine, PositionState};
use super::{Round, RoundStats};
use crate::domain::{
    check_ledger, days_between, CostingMethod, Decimal, LedgerIntegrityError, TradeDate,
    TradeEvent, TradeKind,
};

/// A round closes once a sell leaves at most this many shares.
pub const ROUND_CLOSE_EPSILON: Decimal = Decimal::from_parts(1, 2);

/// A round under construction.
#[derive(Debug, Clone)]
struct Segment {
    start_date: TradeDate,
    end_date: Option<TradeDate>,
    trades: Vec<TradeEvent>,
    /// Ledger index of the most recent entry in `trades`.
    last_index: usize,
    state: PositionState,
    buy_count: usize,
    sell_count: usize,
}

impl Segment {
    fn open(start_date: TradeDate, index: usize) -> Self {
        Self {
            start_date,
            end_date: None,
            trades: Vec::new(),
            last_index: index,
            state: PositionState::new(),
            buy_count: 0,
            sell_count: 0,
        }
    }

    fn push(&mut self, index: usize, trade: &TradeEvent) {
        self.trades.push(trade.clone());
        self.last_index = index;
    }

    fn is_cleared(&self) -> bool {
        self.end_date.is_some()
    }

    fn overflow(&self, quantity: &'static str) -> LedgerIntegrityError {
        LedgerIntegrityError::Overflow {
            index: self.last_index,
            trade_key: self
                .trades
                .last()
                .map(|t| t.trade_key.clone())
                .unwrap_or_default(),
            quantity,
        }
    }
}

/// Drives a fresh position state per round over a chronological ledger.
#[derive(Debug, Clone, Copy)]
pub struct RoundSegmenter {
    engine: PositionEngine,
    annual_expense_rate: Decimal,
    current_price: Option<Decimal>,
    as_of: TradeDate,
}

impl RoundSegmenter {
    pub fn new(
        costing_method: CostingMethod,
        annual_expense_rate: Decimal,
        current_price: Option<Decimal>,
        as_of: TradeDate,
    ) -> Self {
        Self {
            engine: PositionEngine::new(costing_method),
            annual_expense_rate,
            current_price,
            as_of,
        }
    }

    /// Segment `trades` into rounds.
    ///
    /// # Errors
    /// Returns a `LedgerIntegrityError` for invalid or out-of-order entries,
    /// sells exceeding the holding, cash dividends before any acquisition, and
    /// round figures that overflow the decimal range.
    pub fn segment(&self, trades: &[TradeEvent]) -> Result<Vec<Round>, LedgerIntegrityError> {
        check_ledger(trades)?;

        let mut closed: Vec<Segment> = Vec::new();
        let mut open: Option<Segment> = None;

        for (index, trade) in trades.iter().enumerate() {
            match trade.kind {
                TradeKind::Buy => {
                    let segment = open.get_or_insert_with(|| Segment::open(trade.date, index));
                    segment.state = self.engine.buy(
                        &segment.state,
                        trade.shares,
                        trade.cash_amount,
                        trade.fee,
                        trade.date,
                    );
                    segment.buy_count += 1;
                    segment.push(index, trade);
                }
                TradeKind::DividendReinvest => {
                    let segment = open.get_or_insert_with(|| Segment::open(trade.date, index));
                    segment.state =
                        self.engine
                            .reinvest(&segment.state, trade.shares, trade.fee, trade.date);
                    segment.push(index, trade);
                }
                TradeKind::Sell => {
                    let Some(mut segment) = open.take() else {
                        return Err(oversell(index, trade, Decimal::ZERO));
                    };
                    let (state, _realized) = self
                        .engine
                        .sell(&segment.state, trade.shares, trade.cash_amount, trade.fee)
                        .map_err(|e| oversell(index, trade, e.held))?;
                    segment.state = state;
                    segment.sell_count += 1;
                    segment.push(index, trade);

                    if segment.state.total_shares <= ROUND_CLOSE_EPSILON {
                        segment.state = self.engine.write_off(&segment.state);
                        segment.end_date = Some(trade.date);
                        closed.push(segment);
                    } else {
                        open = Some(segment);
                    }
                }
                TradeKind::DividendCash => {
                    // Payouts after clearance belong to the round that earned them.
                    let segment = match open.as_mut() {
                        Some(segment) => segment,
                        None => closed.last_mut().ok_or_else(|| {
                            LedgerIntegrityError::OrphanDividend {
                                index,
                                trade_key: trade.trade_key.clone(),
                                date: trade.date,
                            }
                        })?,
                    };
                    segment.state =
                        self.engine
                            .dividend(&segment.state, trade.cash_amount, trade.fee);
                    segment.push(index, trade);
                }
            }
        }

        if let Some(mut segment) = open.take() {
            // A ledger that ends holding only dust counts as cleared.
            if segment.state.total_shares <= ROUND_CLOSE_EPSILON {
                segment.state = self.engine.write_off(&segment.state);
                segment.end_date = segment.trades.last().map(|t| t.date);
            }
            closed.push(segment);
        }

        closed
            .into_iter()
            .enumerate()
            .map(|(index, segment)| self.finalize(index, segment))
            .collect()
    }

    fn finalize(&self, index: usize, segment: Segment) -> Result<Round, LedgerIntegrityError> {
        let is_cleared = segment.is_cleared();
        let state = &segment.state;
        let end = segment.end_date.unwrap_or(self.as_of);
        let days_held = days_between(segment.start_date, end).max(0);
        let expense_cost = expense::expense_cost(&segment.trades, end, self.annual_expense_rate)
            .ok_or_else(|| segment.overflow("expense cost"))?;

        let (unrealized_pnl, market_value) = if is_cleared {
            (Some(Decimal::ZERO), Some(Decimal::ZERO))
        } else {
            match self.current_price {
                Some(price) => {
                    let u = self
                        .engine
                        .unrealized_pnl(state, price)
                        .ok_or_else(|| segment.overflow("market value"))?;
                    (Some(u.unrealized), Some(u.market_value))
                }
                None => (None, None),
            }
        };

        let total_profit = unrealized_pnl
            .map(|u| {
                state
                    .realized_pnl
                    .checked_add(u)
                    .and_then(|p| p.checked_sub(expense_cost))
                    .ok_or_else(|| segment.overflow("total profit"))
            })
            .transpose()?;
        let return_rate = if segment.buy_count > 0 {
            total_profit.and_then(|p| p.checked_ratio(state.total_buy_cost))
        } else {
            None
        };

        let avg_cost = if is_cleared {
            state.total_buy_cost.ratio_or_zero(state.total_shares_acquired)
        } else {
            state.avg_cost()
        };

        let stats = RoundStats {
            realized_pnl: state.realized_pnl,
            unrealized_pnl,
            market_value,
            expense_cost,
            total_profit,
            return_rate,
            avg_cost,
            max_shares_held: state.max_shares_held,
            current_shares: state.total_shares,
            current_cost: state.total_cost,
            days_held,
            dividend_income: state.dividend_income,
            total_buy_cost: state.total_buy_cost,
            total_sell_proceeds: state.total_sell_proceeds,
            buy_count: segment.buy_count,
            sell_count: segment.sell_count,
        };

        Ok(Round {
            index,
            start_date: segment.start_date,
            end_date: segment.end_date,
            is_cleared,
            trades: segment.trades,
            stats,
        })
    }
}

fn oversell(index: usize, trade: &TradeEvent, held: Decimal) -> LedgerIntegrityError {
    LedgerIntegrityError::Oversell {
        index,
        trade_key: trade.trade_key.clone(),
        date: trade.date,
        requested: trade.shares,
        held,
        shortfall: trade.shares - held,
    }
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

    fn segmenter() -> RoundSegmenter {
        RoundSegmenter::new(CostingMethod::MovingAverage, Decimal::ZERO, None, day(31))
    }

    #[test]
    fn test_dust_after_sell_closes_round() {
        let trades = vec![
            TradeEvent::buy(day(1), d("100"), d("1000"), d("0")),
            TradeEvent::sell(day(2), d("99.995"), d("1100"), d("0")),
        ];
        let rounds = segmenter().segment(&trades).unwrap();
        assert_eq!(rounds.len(), 1);
        assert!(rounds[0].is_cleared);
        assert_eq!(rounds[0].stats.current_shares, Decimal::ZERO);
        assert_eq!(rounds[0].stats.current_cost, Decimal::ZERO);
        assert_eq!(rounds[0].stats.realized_pnl, d("100"));
    }

    #[test]
    fn test_sell_before_buy_is_oversell() {
        let trades = vec![TradeEvent::sell(day(1), d("10"), d("100"), d("0"))];
        match segmenter().segment(&trades) {
            Err(LedgerIntegrityError::Oversell {
                index,
                held,
                shortfall,
                ..
            }) => {
                assert_eq!(index, 0);
                assert_eq!(held, Decimal::ZERO);
                assert_eq!(shortfall, d("10"));
            }
            other => panic!("Expected Oversell, got {:?}", other),
        }
    }

    #[test]
    fn test_leading_cash_dividend_is_orphan() {
        let trades = vec![
            TradeEvent::dividend_cash(day(1), d("5")),
            TradeEvent::buy(day(2), d("10"), d("100"), d("0")),
        ];
        assert!(matches!(
            segmenter().segment(&trades),
            Err(LedgerIntegrityError::OrphanDividend { index: 0, .. })
        ));
    }

    #[test]
    fn test_open_round_without_price_has_no_profit() {
        let trades = vec![TradeEvent::buy(day(1), d("10"), d("100"), d("0"))];
        let rounds = segmenter().segment(&trades).unwrap();
        let stats = &rounds[0].stats;
        assert!(!rounds[0].is_cleared);
        assert_eq!(rounds[0].end_date, None);
        assert_eq!(stats.unrealized_pnl, None);
        assert_eq!(stats.total_profit, None);
        assert_eq!(stats.return_rate, None);
        assert_eq!(stats.days_held, 30);
    }

    #[test]
    fn test_reinvest_only_round_has_no_return_rate() {
        let trades = vec![
            TradeEvent::buy(day(1), d("10"), d("100"), d("0")),
            TradeEvent::sell(day(2), d("10"), d("110"), d("0")),
            TradeEvent::dividend_reinvest(day(3), d("1")),
        ];
        let seg = RoundSegmenter::new(CostingMethod::Fifo, Decimal::ZERO, Some(d("11")), day(10));
        let rounds = seg.segment(&trades).unwrap();
        assert_eq!(rounds.len(), 2);
        assert_eq!(rounds[1].start_date, day(3));
        assert_eq!(rounds[1].stats.unrealized_pnl, Some(d("11")));
        assert_eq!(rounds[1].stats.return_rate, None);
    }

    #[test]
    fn test_round_indices_are_sequential() {
        let trades = vec![
            TradeEvent::buy(day(1), d("10"), d("100"), d("0")),
            TradeEvent::sell(day(2), d("10"), d("110"), d("0")),
            TradeEvent::buy(day(3), d("10"), d("100"), d("0")),
            TradeEvent::sell(day(4), d("10"), d("90"), d("0")),
            TradeEvent::buy(day(5), d("10"), d("100"), d("0")),
        ];
        let rounds = segmenter().segment(&trades).unwrap();
        let indices: Vec<usize> = rounds.iter().map(|r| r.index).collect();
        assert_eq!(indices, vec![0, 1, 2]);
        assert!(rounds[0].is_cleared && rounds[1].is_cleared && !rounds[2].is_cleared);
    }

    #[test]
    fn test_late_dividend_does_not_inflate_expense() {
        let trades = vec![
            TradeEvent::buy(day(1), d("100"), d("1000"), d("0")),
            TradeEvent::sell(day(11), d("100"), d("800"), d("0")),
            TradeEvent::dividend_cash(day(21), d("5")),
        ];
        let seg = RoundSegmenter::new(CostingMethod::Fifo, d("0.365"), None, day(31));
        let rounds = seg.segment(&trades).unwrap();
        assert_eq!(rounds.len(), 1);
        assert_eq!(rounds[0].end_date, Some(day(11)));
        assert_eq!(rounds[0].stats.expense_cost, d("10"));
        assert_eq!(rounds[0].stats.realized_pnl, d("-195"));
        assert_eq!(rounds[0].stats.total_profit, Some(d("-205")));
    }

    #[test]
    fn test_unpriceable_holding_reports_overflow() {
        let trades = vec![
            TradeEvent::buy(day(1), d("1000000000000000"), d("1"), d("0")),
            TradeEvent::buy(day(2), d("1"), d("1"), d("0")),
        ];
        let seg = RoundSegmenter::new(
            CostingMethod::MovingAverage,
            Decimal::ZERO,
            Some(d("100000000000000")),
            day(31),
        );
        match seg.segment(&trades) {
            Err(LedgerIntegrityError::Overflow {
                index, quantity, ..
            }) => {
                assert_eq!(index, 1);
                assert_eq!(quantity, "market value");
            }
            other => panic!("Expected Overflow, got {:?}", other),
        }
    }
}
