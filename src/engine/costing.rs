//! Costing strategies: which lots a sell consumes and at what cost basis.

use super::lots::{Lot, LotLedger};
use crate::domain::{CostingMethod, Decimal};

/// Sells may exceed the holding by at most this many shares; the excess is
/// treated as rounding in the upstream ledger and the whole holding is sold.
pub const OVERSELL_TOLERANCE: Decimal = Decimal::from_parts(1, 3);

/// Result of allocating a sell against a lot ledger.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SellAllocation {
    /// Cost basis removed from the ledger.
    pub consumed_cost: Decimal,
    /// Shares actually removed (clamped to the holding within tolerance).
    pub sold_shares: Decimal,
    /// Ledger after the sell.
    pub ledger: LotLedger,
}

/// A sell larger than the holding plus tolerance.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Shortfall {
    pub requested: Decimal,
    pub held: Decimal,
}

impl Shortfall {
    pub fn amount(&self) -> Decimal {
        self.requested - self.held
    }
}

pub trait CostingStrategy: Send + Sync {
    fn method(&self) -> CostingMethod;

    /// Allocate `sell_shares` against `ledger` without mutating it.
    fn apply_sell(
        &self,
        ledger: &LotLedger,
        sell_shares: Decimal,
    ) -> Result<SellAllocation, Shortfall>;
}

pub struct Fifo;
pub struct Lifo;
pub struct MovingAverage;

static FIFO: Fifo = Fifo;
static LIFO: Lifo = Lifo;
static MOVING_AVERAGE: MovingAverage = MovingAverage;

/// Strategy implementing `method`.
pub fn strategy_for(method: CostingMethod) -> &'static dyn CostingStrategy {
    match method {
        CostingMethod::Fifo => &FIFO,
        CostingMethod::Lifo => &LIFO,
        CostingMethod::MovingAverage => &MOVING_AVERAGE,
    }
}

/// Shares to remove for a requested sell, or the shortfall if it cannot be covered.
fn covered_shares(held: Decimal, requested: Decimal) -> Result<Decimal, Shortfall> {
    if requested > held + OVERSELL_TOLERANCE {
        return Err(Shortfall { requested, held });
    }
    Ok(requested.min(held))
}

/// Consume lots in the order given by `order` (indices into `lots`), then
/// rebuild the ledger in its original acquisition order.
fn consume_in_order(lots: &[Lot], order: &[usize], sell_shares: Decimal) -> (Decimal, LotLedger) {
    let mut remaining = sell_shares;
    let mut consumed_cost = Decimal::ZERO;
    let mut residuals: Vec<Option<Lot>> = lots.iter().cloned().map(Some).collect();

    for &idx in order {
        if !remaining.is_positive() {
            break;
        }
        let lot = &lots[idx];
        let take = remaining.min(lot.shares);
        let (cost, residual) = lot.split(take);
        consumed_cost += cost;
        remaining -= take;
        residuals[idx] = residual;
    }

    (consumed_cost, LotLedger::from_lots(residuals.into_iter().flatten().collect()))
}

/// `total * part / whole` for `part < whole`. Multiplies first so small
/// ledgers divide exactly; when the product overflows, divides first, which
/// cannot overflow because the ratio is below one.
fn prorate(total: Decimal, part: Decimal, whole: Decimal) -> Decimal {
    match total.checked_mul(part) {
        Some(product) => product.ratio_or_zero(whole),
        None => total * part.ratio_or_zero(whole),
    }
}

impl CostingStrategy for Fifo {
    fn method(&self) -> CostingMethod {
        CostingMethod::Fifo
    }

    fn apply_sell(
        &self,
        ledger: &LotLedger,
        sell_shares: Decimal,
    ) -> Result<SellAllocation, Shortfall> {
        let sold_shares = covered_shares(ledger.total_shares(), sell_shares)?;
        let lots = ledger.lots();
        let mut order: Vec<usize> = (0..lots.len()).collect();
        order.sort_by(|&a, &b| lots[a].acquired_at.cmp(&lots[b].acquired_at).then(a.cmp(&b)));

        let (consumed_cost, ledger) = consume_in_order(lots, &order, sold_shares);
        Ok(SellAllocation {
            consumed_cost,
            sold_shares,
            ledger,
        })
    }
}

impl CostingStrategy for Lifo {
    fn method(&self) -> CostingMethod {
        CostingMethod::Lifo
    }

    fn apply_sell(
        &self,
        ledger: &LotLedger,
        sell_shares: Decimal,
    ) -> Result<SellAllocation, Shortfall> {
        let sold_shares = covered_shares(ledger.total_shares(), sell_shares)?;
        let lots = ledger.lots();
        let mut order: Vec<usize> = (0..lots.len()).collect();
        order.sort_by(|&a, &b| lots[b].acquired_at.cmp(&lots[a].acquired_at).then(b.cmp(&a)));

        let (consumed_cost, ledger) = consume_in_order(lots, &order, sold_shares);
        Ok(SellAllocation {
            consumed_cost,
            sold_shares,
            ledger,
        })
    }
}

impl CostingStrategy for MovingAverage {
    fn method(&self) -> CostingMethod {
        CostingMethod::MovingAverage
    }

    /// Consumes `total_cost * sell / total_shares` and merges what is left
    /// into a single lot dated at the earliest acquisition.
    fn apply_sell(
        &self,
        ledger: &LotLedger,
        sell_shares: Decimal,
    ) -> Result<SellAllocation, Shortfall> {
        let held = ledger.total_shares();
        let sold_shares = covered_shares(held, sell_shares)?;
        let total_cost = ledger.total_cost();

        let consumed_cost = if sold_shares >= held {
            total_cost
        } else {
            prorate(total_cost, sold_shares, held)
        };

        let merged = match ledger.earliest_acquisition() {
            Some(acquired_at) if sold_shares < held => LotLedger::from_lots(vec![Lot::new(
                held - sold_shares,
                total_cost - consumed_cost,
                acquired_at,
            )]),
            _ => LotLedger::new(),
        };

        Ok(SellAllocation {
            consumed_cost,
            sold_shares,
            ledger: merged,
        })
    }
}
