//! TradeEvent: one settled ledger entry for a single holding.

use crate::domain::{Decimal, LedgerIntegrityError, TradeDate, TradeKind};
use serde::{Deserialize, Serialize};

/// Largest share count or cash amount a ledger entry may carry. Keeps every
/// sum over a ledger far from the 96-bit decimal limit.
pub const MAX_QUANTITY: Decimal = Decimal::from_parts(1_000_000_000_000_000, 0);

/// A settled buy, sell or dividend entry. Immutable once handed to the engine.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TradeEvent {
    /// Stable identifier for this entry.
    pub trade_key: String,
    pub date: TradeDate,
    pub kind: TradeKind,
    /// Share quantity. Ignored for cash dividends.
    pub shares: Decimal,
    /// Gross cash moved: buy cost before fees, sell proceeds before fees,
    /// or dividend cash received.
    pub cash_amount: Decimal,
    /// Added to cost basis on buys, subtracted from proceeds on sells.
    pub fee: Decimal,
}

impl TradeEvent {
    /// Create a new entry. `id` is the upstream ledger's identifier, if any.
    pub fn new(
        date: TradeDate,
        kind: TradeKind,
        shares: Decimal,
        cash_amount: Decimal,
        fee: Decimal,
        id: Option<i64>,
    ) -> Self {
        let trade_key = Self::compute_trade_key(date, kind, &shares, &cash_amount, &fee, id);
        TradeEvent {
            trade_key,
            date,
            kind,
            shares,
            cash_amount,
            fee,
        }
    }

    pub fn buy(date: TradeDate, shares: Decimal, cash_amount: Decimal, fee: Decimal) -> Self {
        Self::new(date, TradeKind::Buy, shares, cash_amount, fee, None)
    }

    pub fn sell(date: TradeDate, shares: Decimal, cash_amount: Decimal, fee: Decimal) -> Self {
        Self::new(date, TradeKind::Sell, shares, cash_amount, fee, None)
    }

    pub fn dividend_cash(date: TradeDate, cash_amount: Decimal) -> Self {
        Self::new(
            date,
            TradeKind::DividendCash,
            Decimal::ZERO,
            cash_amount,
            Decimal::ZERO,
            None,
        )
    }

    pub fn dividend_reinvest(date: TradeDate, shares: Decimal) -> Self {
        Self::new(
            date,
            TradeKind::DividendReinvest,
            shares,
            Decimal::ZERO,
            Decimal::ZERO,
            None,
        )
    }

    /// Generate a stable key for an entry.
    ///
    /// Priority: upstream `id` (if present) > hash of the entry's fields.
    /// Two identical entries without ids share a key; keys are labels, not
    /// uniqueness constraints.
    pub fn compute_trade_key(
        date: TradeDate,
        kind: TradeKind,
        shares: &Decimal,
        cash_amount: &Decimal,
        fee: &Decimal,
        id: Option<i64>,
    ) -> String {
        if let Some(id) = id {
            return format!("tid:{}", id);
        }

        use sha2::{Digest, Sha256};

        let mut hasher = Sha256::new();
        hasher.update(date.format("%Y-%m-%d").to_string());
        hasher.update(kind.as_str());
        hasher.update(shares.to_canonical_string());
        hasher.update(b"|");
        hasher.update(cash_amount.to_canonical_string());
        hasher.update(b"|");
        hasher.update(fee.to_canonical_string());
        let hash = hasher.finalize();
        format!("hash:{}", hex::encode(&hash[..16]))
    }

    pub fn trade_key(&self) -> &str {
        &self.trade_key
    }

    /// Reject negative or oversized quantities. `index` is the entry's
    /// ledger position.
    pub fn validate(&self, index: usize) -> Result<(), LedgerIntegrityError> {
        let invalid = |reason: &str| LedgerIntegrityError::InvalidEvent {
            index,
            trade_key: self.trade_key.clone(),
            reason: reason.to_string(),
        };

        if self.shares.is_negative() {
            return Err(invalid("shares must be non-negative"));
        }
        if self.fee.is_negative() {
            return Err(invalid("fee must be non-negative"));
        }
        if self.cash_amount.is_negative() {
            return Err(invalid("cash amount must be non-negative"));
        }
        if [self.shares, self.cash_amount, self.fee]
            .iter()
            .any(|v| *v > MAX_QUANTITY)
        {
            return Err(invalid("quantity exceeds 1e15"));
        }
        Ok(())
    }
}
