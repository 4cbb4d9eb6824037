pub mod api;
pub mod compile;
pub mod config;
pub mod datasource;
pub mod domain;
pub mod engine;
pub mod error;

pub use compile::{compute_holding_rounds, HoldingRounds};
pub use config::Config;
pub use domain::{CostingMethod, Decimal, LedgerIntegrityError, TradeDate, TradeEvent, TradeKind};
pub use engine::{GlobalStats, HoldingSnapshot, Round, RoundStats};
pub use error::AppError;
