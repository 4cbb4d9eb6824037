//! Domain primitives: TradeDate, TradeKind, CostingMethod.

use serde::{Deserialize, Serialize};
use std::str::FromStr;

/// Calendar date of a settled ledger entry. Time of day carries no meaning.
pub type TradeDate = chrono::NaiveDate;

/// Whole calendar days from `from` to `to` (negative if `to` is earlier).
pub fn days_between(from: TradeDate, to: TradeDate) -> i64 {
    (to - from).num_days()
}

/// Kind of ledger entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TradeKind {
    Buy,
    Sell,
    /// Cash paid out; shares are ignored.
    DividendCash,
    /// Dividend paid in additional shares at zero incremental cash cost.
    DividendReinvest,
}

impl TradeKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            TradeKind::Buy => "buy",
            TradeKind::Sell => "sell",
            TradeKind::DividendCash => "dividend_cash",
            TradeKind::DividendReinvest => "dividend_reinvest",
        }
    }
}

impl std::fmt::Display for TradeKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TradeKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "buy" | "b" => Ok(TradeKind::Buy),
            "sell" | "s" => Ok(TradeKind::Sell),
            "dividend_cash" | "dividend" | "div_cash" => Ok(TradeKind::DividendCash),
            "dividend_reinvest" | "reinvest" | "div_reinvest" => Ok(TradeKind::DividendReinvest),
            other => Err(format!("unknown trade kind: {}", other)),
        }
    }
}

/// Cost-basis accounting convention.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CostingMethod {
    Fifo,
    Lifo,
    #[default]
    MovingAverage,
}

impl CostingMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            CostingMethod::Fifo => "fifo",
            CostingMethod::Lifo => "lifo",
            CostingMethod::MovingAverage => "moving_average",
        }
    }
}

impl std::fmt::Display for CostingMethod {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for CostingMethod {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "fifo" => Ok(CostingMethod::Fifo),
            "lifo" => Ok(CostingMethod::Lifo),
            "moving_average" | "average" | "avg" => Ok(CostingMethod::MovingAverage),
            other => Err(format!("unknown costing method: {}", other)),
        }
    }
}
