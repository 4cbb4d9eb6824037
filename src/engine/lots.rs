use crate::domain::{Decimal, TradeDate};
use serde::{Deserialize, Serialize};

/// A slice of acquired shares with its own cost basis.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Lot {
    pub shares: Decimal,
    /// Total cost allocated to this lot, not per share.
    pub cost: Decimal,
    pub acquired_at: TradeDate,
}

impl Lot {
    pub fn new(shares: Decimal, cost: Decimal, acquired_at: TradeDate) -> Self {
        Self {
            shares,
            cost,
            acquired_at,
        }
    }

    /// Holds shares or carries cost.
    pub fn is_material(&self) -> bool {
        self.shares.is_positive() || !self.cost.is_zero()
    }

    /// Split off `take` shares. Returns `(consumed_cost, residual)`; the
    /// residual keeps `cost * residual_shares / shares` and the consumed part
    /// is the exact remainder, so the two always sum to `cost`.
    pub fn split(&self, take: Decimal) -> (Decimal, Option<Lot>) {
        if take >= self.shares {
            return (self.cost, None);
        }
        let residual_shares = self.shares - take;
        let residual_cost = self.cost * residual_shares.ratio_or_zero(self.shares);
        let residual = Lot::new(residual_shares, residual_cost, self.acquired_at);
        (self.cost - residual_cost, Some(residual))
    }
}

/// Lots in acquisition order.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct LotLedger {
    lots: Vec<Lot>,
}

impl LotLedger {
    pub fn new() -> Self {
        Self { lots: Vec::new() }
    }

    pub fn from_lots(lots: Vec<Lot>) -> Self {
        Self {
            lots: lots.into_iter().filter(Lot::is_material).collect(),
        }
    }

    /// Return a new ledger with `lot` appended. Zero-share lots are kept only
    /// if they carry cost, so fees on empty acquisitions stay in the basis.
    pub fn with_lot(&self, lot: Lot) -> Self {
        let mut lots = self.lots.clone();
        if lot.is_material() {
            lots.push(lot);
        }
        Self { lots }
    }

    pub fn lots(&self) -> &[Lot] {
        &self.lots
    }

    pub fn is_empty(&self) -> bool {
        self.lots.is_empty()
    }

    pub fn len(&self) -> usize {
        self.lots.len()
    }

    pub fn total_shares(&self) -> Decimal {
        self.lots.iter().map(|l| l.shares).sum()
    }

    pub fn total_cost(&self) -> Decimal {
        self.lots.iter().map(|l| l.cost).sum()
    }

    pub fn earliest_acquisition(&self) -> Option<TradeDate> {
        self.lots.iter().map(|l| l.acquired_at).min()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn d(s: &str) -> Decimal {
        Decimal::from_str_canonical(s).unwrap()
    }

    fn day(n: u32) -> TradeDate {
        TradeDate::from_ymd_opt(2024, 2, n).unwrap()
    }

    #[test]
    fn test_split_partial_keeps_proportional_residual() {
        let lot = Lot::new(d("100"), d("1000"), day(1));
        let (consumed, residual) = lot.split(d("30"));
        let residual = residual.unwrap();
        assert_eq!(residual.shares, d("70"));
        assert_eq!(residual.cost, d("700"));
        assert_eq!(consumed, d("300"));
        assert_eq!(residual.acquired_at, day(1));
    }

    #[test]
    fn test_split_conserves_cost_on_repeating_fractions() {
        let lot = Lot::new(d("3"), d("10"), day(1));
        let (consumed, residual) = lot.split(d("1"));
        assert_eq!(consumed + residual.unwrap().cost, d("10"));
    }

    #[test]
    fn test_split_whole_lot() {
        let lot = Lot::new(d("5"), d("55"), day(1));
        let (consumed, residual) = lot.split(d("5"));
        assert_eq!(consumed, d("55"));
        assert!(residual.is_none());
    }

    #[test]
    fn test_ledger_totals() {
        let ledger = LotLedger::new()
            .with_lot(Lot::new(d("10"), d("100"), day(3)))
            .with_lot(Lot::new(d("5"), d("60"), day(1)));
        assert_eq!(ledger.len(), 2);
        assert_eq!(ledger.total_shares(), d("15"));
        assert_eq!(ledger.total_cost(), d("160"));
        assert_eq!(ledger.earliest_acquisition(), Some(day(1)));
    }
}
