//! Pure computation engine for deterministic cost-basis accounting.

use crate::domain::{Decimal, TradeDate, TradeEvent};
use serde::Serialize;

pub mod aggregate;
pub mod costing;
pub mod expense;
pub mod lots;
pub mod position;
pub mod rounds;

pub use aggregate::{aggregate, GlobalStats, HoldingSnapshot};
pub use costing::{strategy_for, CostingStrategy, Fifo, Lifo, MovingAverage, SellAllocation};
pub use lots::{Lot, LotLedger};
pub use position::{HoldingView, PositionEngine, PositionState, UnrealizedPnl};
pub use rounds::{RoundSegmenter, ROUND_CLOSE_EPSILON};

/// A holding period from first acquisition to full clearance, or to the
/// as-of date if still open.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Round {
    /// Position in the segmentation, starting at 0.
    pub index: usize,
    pub start_date: TradeDate,
    pub end_date: Option<TradeDate>, // None if still open
    pub is_cleared: bool,
    pub trades: Vec<TradeEvent>,
    pub stats: RoundStats,
}

/// Profit and holding figures for one round.
///
/// Fields that depend on a valuation price are `None` for an open round when
/// no price is available.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RoundStats {
    /// Includes cash dividends.
    pub realized_pnl: Decimal,
    pub unrealized_pnl: Option<Decimal>,
    pub market_value: Option<Decimal>,
    pub expense_cost: Decimal,
    /// `realized + unrealized - expense_cost`.
    pub total_profit: Option<Decimal>,
    /// `total_profit / total_buy_cost`; `None` when the round has no buy.
    pub return_rate: Option<Decimal>,
    pub avg_cost: Decimal,
    pub max_shares_held: Decimal,
    pub current_shares: Decimal,
    pub current_cost: Decimal,
    pub days_held: i64,
    pub dividend_income: Decimal,
    pub total_buy_cost: Decimal,
    pub total_sell_proceeds: Decimal,
    pub buy_count: usize,
    pub sell_count: usize,
}
