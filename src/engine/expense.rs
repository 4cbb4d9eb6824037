//! Holding-cost accrual against time-weighted invested capital.

use crate::domain::{days_between, Decimal, TradeDate, TradeEvent, TradeKind};

pub const DAYS_PER_YEAR: i64 = 365;

/// Average capital tied up in a round, weighted by how long each amount was held.
///
/// Capital grows by each buy's cash amount and shrinks on each sell by the
/// fraction `min(sell_cash / capital, 1)`. The last interval runs from the
/// final trade to `end_date`; entries dated after `end_date` (a dividend paid
/// once the round cleared) accrue nothing. If the round spans zero days the
/// last capital value is returned. `None` if the weighted sum overflows.
pub fn time_weighted_capital(trades: &[TradeEvent], end_date: TradeDate) -> Option<Decimal> {
    let Some(first) = trades.first() else {
        return Some(Decimal::ZERO);
    };

    let mut capital = Decimal::ZERO;
    let mut weighted = Decimal::ZERO;
    let mut prev_date = first.date;

    for trade in trades {
        let at = trade.date.min(end_date);
        weighted = weighted.checked_add(capital_days(capital, prev_date, at)?)?;
        prev_date = prev_date.max(at);

        match trade.kind {
            TradeKind::Buy => capital = capital.checked_add(trade.cash_amount)?,
            TradeKind::Sell => {
                if capital.is_positive() {
                    let fraction = trade.cash_amount.ratio_or_zero(capital).min(Decimal::ONE);
                    capital = capital * (Decimal::ONE - fraction);
                }
            }
            TradeKind::DividendCash | TradeKind::DividendReinvest => {}
        }
    }

    weighted = weighted.checked_add(capital_days(capital, prev_date, end_date)?)?;

    let total_days = days_between(first.date, end_date);
    if total_days <= 0 {
        return Some(capital);
    }
    weighted.checked_ratio(Decimal::from_i64(total_days))
}

fn capital_days(capital: Decimal, from: TradeDate, to: TradeDate) -> Option<Decimal> {
    capital.checked_mul(Decimal::from_i64(days_between(from, to).max(0)))
}

/// `time_weighted_capital * annual_rate * days / 365` over the round's span.
/// `None` if the charge overflows.
pub fn expense_cost(
    trades: &[TradeEvent],
    end_date: TradeDate,
    annual_rate: Decimal,
) -> Option<Decimal> {
    let Some(first) = trades.first() else {
        return Some(Decimal::ZERO);
    };
    let days = days_between(first.date, end_date).max(0);
    if days == 0 || annual_rate.is_zero() {
        return Some(Decimal::ZERO);
    }

    time_weighted_capital(trades, end_date)?
        .checked_mul(annual_rate)?
        .checked_mul(Decimal::from_i64(days))?
        .checked_ratio(Decimal::from_i64(DAYS_PER_YEAR))
}
