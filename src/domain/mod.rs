//! Domain types for the cost-basis engine.
//!
//! This module provides:
//! - Lossless numeric handling via the Decimal wrapper
//! - Ledger primitives: TradeDate, TradeKind, CostingMethod
//! - TradeEvent with stable trade keys
//! - Ledger ordering and integrity checks

pub mod decimal;
pub mod integrity;
pub mod ordering;
pub mod primitives;
pub mod trade;

pub use decimal::Decimal;
pub use integrity::LedgerIntegrityError;
pub use ordering::check_ledger;
pub use primitives::{days_between, CostingMethod, TradeDate, TradeKind};
pub use trade::{TradeEvent, MAX_QUANTITY};
