use super::costing::{strategy_for, CostingStrategy};
use super::lots::{Lot, LotLedger};
use crate::domain::{CostingMethod, Decimal, TradeDate};
use serde::Serialize;

/// Running position summary. Each engine operation returns a new value.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct PositionState {
    pub lots: LotLedger,
    pub total_shares: Decimal,
    /// Cost basis of the shares currently held; always equals the sum of lot costs.
    pub total_cost: Decimal,
    /// Cumulative realized P&L, including cash dividends.
    pub realized_pnl: Decimal,
    pub dividend_income: Decimal,
    /// Cash plus fees of every buy.
    pub total_buy_cost: Decimal,
    /// Shares from buys and reinvested dividends.
    pub total_shares_acquired: Decimal,
    /// Sell cash net of fees.
    pub total_sell_proceeds: Decimal,
    pub max_shares_held: Decimal,
}

impl PositionState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_flat(&self) -> bool {
        !self.total_shares.is_positive()
    }

    /// Average cost per held share, zero when flat.
    pub fn avg_cost(&self) -> Decimal {
        self.total_cost.ratio_or_zero(self.total_shares)
    }
}

/// Valuation of the held shares at a given price.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UnrealizedPnl {
    pub market_value: Decimal,
    pub unrealized: Decimal,
    /// `unrealized / total_cost`, zero when nothing is invested.
    pub return_rate: Decimal,
}

/// Shares, cost basis and average cost of the current holding.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HoldingView {
    pub shares: Decimal,
    pub cost: Decimal,
    pub avg_cost: Decimal,
}

/// A sell that exceeds the holding.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InsufficientShares {
    pub requested: Decimal,
    pub held: Decimal,
}

/// Applies buys, sells and dividends under one costing method.
#[derive(Clone, Copy)]
pub struct PositionEngine {
    strategy: &'static dyn CostingStrategy,
}

impl std::fmt::Debug for PositionEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PositionEngine")
            .field("method", &self.strategy.method())
            .finish()
    }
}

impl PositionEngine {
    pub fn new(method: CostingMethod) -> Self {
        Self {
            strategy: strategy_for(method),
        }
    }

    pub fn method(&self) -> CostingMethod {
        self.strategy.method()
    }

    /// Add a lot costing `cash_amount + fee`.
    pub fn buy(
        &self,
        state: &PositionState,
        shares: Decimal,
        cash_amount: Decimal,
        fee: Decimal,
        date: TradeDate,
    ) -> PositionState {
        let cost = cash_amount + fee;
        let mut next = self.acquire(state, shares, cost, date);
        next.total_buy_cost += cost;
        next
    }

    /// Reinvested dividend: a buy with no incremental cash, so it lowers the
    /// average cost.
    pub fn reinvest(
        &self,
        state: &PositionState,
        shares: Decimal,
        fee: Decimal,
        date: TradeDate,
    ) -> PositionState {
        self.acquire(state, shares, fee, date)
    }

    fn acquire(
        &self,
        state: &PositionState,
        shares: Decimal,
        cost: Decimal,
        date: TradeDate,
    ) -> PositionState {
        let mut next = state.clone();
        next.lots = state.lots.with_lot(Lot::new(shares, cost, date));
        next.total_shares += shares;
        next.total_cost += cost;
        next.total_shares_acquired += shares;
        next.max_shares_held = next.max_shares_held.max(next.total_shares);
        next
    }

    /// Remove `shares` at proceeds `cash_amount - fee`. Returns the new state
    /// and its cumulative realized P&L.
    pub fn sell(
        &self,
        state: &PositionState,
        shares: Decimal,
        cash_amount: Decimal,
        fee: Decimal,
    ) -> Result<(PositionState, Decimal), InsufficientShares> {
        let allocation = self
            .strategy
            .apply_sell(&state.lots, shares)
            .map_err(|s| InsufficientShares {
                requested: s.requested,
                held: s.held,
            })?;

        let proceeds = cash_amount - fee;
        let mut next = state.clone();
        next.lots = allocation.ledger;
        next.realized_pnl += proceeds - allocation.consumed_cost;
        next.total_shares -= allocation.sold_shares;
        next.total_cost -= allocation.consumed_cost;
        next.total_sell_proceeds += proceeds;

        let realized = next.realized_pnl;
        Ok((next, realized))
    }

    /// Cash dividend: income net of fee, no change to shares or cost.
    pub fn dividend(&self, state: &PositionState, cash_amount: Decimal, fee: Decimal) -> PositionState {
        let income = cash_amount - fee;
        let mut next = state.clone();
        next.realized_pnl += income;
        next.dividend_income += income;
        next
    }

    /// Drop residual dust shares, charging their remaining cost to realized P&L.
    pub fn write_off(&self, state: &PositionState) -> PositionState {
        let mut next = state.clone();
        next.realized_pnl -= state.total_cost;
        next.lots = LotLedger::new();
        next.total_shares = Decimal::ZERO;
        next.total_cost = Decimal::ZERO;
        next
    }

    /// Value the holding at `current_price`; `None` if the market value
    /// overflows.
    pub fn unrealized_pnl(
        &self,
        state: &PositionState,
        current_price: Decimal,
    ) -> Option<UnrealizedPnl> {
        let market_value = state.total_shares.checked_mul(current_price)?;
        let unrealized = market_value.checked_sub(state.total_cost)?;
        Some(UnrealizedPnl {
            market_value,
            unrealized,
            return_rate: unrealized.ratio_or_zero(state.total_cost),
        })
    }

    pub fn holding_snapshot(&self, state: &PositionState) -> HoldingView {
        HoldingView {
            shares: state.total_shares,
            cost: state.total_cost,
            avg_cost: state.avg_cost(),
        }
    }
}
