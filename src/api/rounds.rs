use axum::body::Bytes;
use axum::extract::{Query, State};
use axum::Json;
use serde::Deserialize;

use crate::api::AppState;
use crate::compile::{compute_holding_rounds, HoldingRounds};
use crate::datasource::parse_ledger_csv;
use crate::domain::{CostingMethod, Decimal, TradeDate, TradeEvent, TradeKind, MAX_QUANTITY};
use crate::engine::HoldingSnapshot;
use crate::error::AppError;

/// One ledger entry as supplied by the trade-record source.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TradeInput {
    pub date: TradeDate,
    pub kind: TradeKind,
    #[serde(default)]
    pub shares: Decimal,
    pub cash_amount: Decimal,
    #[serde(default)]
    pub fee: Decimal,
    pub id: Option<i64>,
}

impl From<TradeInput> for TradeEvent {
    fn from(input: TradeInput) -> Self {
        TradeEvent::new(
            input.date,
            input.kind,
            input.shares,
            input.cash_amount,
            input.fee,
            input.id,
        )
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RoundsRequest {
    pub trades: Vec<TradeInput>,
    pub costing_method: Option<CostingMethod>,
    pub annual_expense_rate: Option<Decimal>,
    pub current_price: Option<Decimal>,
    pub as_of: Option<TradeDate>,
    pub snapshot: Option<HoldingSnapshot>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RoundsQuery {
    pub costing_method: Option<String>,
    pub annual_expense_rate: Option<String>,
    pub current_price: Option<String>,
    pub as_of: Option<String>,
}

/// Parameters resolved against the service defaults.
struct Resolved {
    costing_method: CostingMethod,
    annual_expense_rate: Decimal,
    current_price: Option<Decimal>,
    as_of: TradeDate,
}

fn resolve(
    state: &AppState,
    costing_method: Option<CostingMethod>,
    annual_expense_rate: Option<Decimal>,
    current_price: Option<Decimal>,
    as_of: Option<TradeDate>,
) -> Result<Resolved, AppError> {
    let annual_expense_rate =
        annual_expense_rate.unwrap_or(state.config.default_annual_expense_rate);
    if annual_expense_rate.is_negative() {
        return Err(AppError::BadRequest(
            "annualExpenseRate must be non-negative".to_string(),
        ));
    }
    if current_price.is_some_and(|p| p.is_negative()) {
        return Err(AppError::BadRequest(
            "currentPrice must be non-negative".to_string(),
        ));
    }
    if annual_expense_rate > MAX_QUANTITY || current_price.is_some_and(|p| p > MAX_QUANTITY) {
        return Err(AppError::BadRequest(
            "annualExpenseRate and currentPrice must not exceed 1e15".to_string(),
        ));
    }

    Ok(Resolved {
        costing_method: costing_method.unwrap_or(state.config.default_costing_method),
        annual_expense_rate,
        current_price,
        as_of: as_of.unwrap_or_else(|| chrono::Utc::now().date_naive()),
    })
}

fn parse_decimal_param(name: &str, value: Option<&str>) -> Result<Option<Decimal>, AppError> {
    value
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(Decimal::from_str_canonical)
        .transpose()
        .map_err(|_| AppError::BadRequest(format!("Invalid {}", name)))
}

fn run(
    trades: &[TradeEvent],
    params: &Resolved,
    snapshot: Option<&HoldingSnapshot>,
) -> Result<HoldingRounds, AppError> {
    Ok(compute_holding_rounds(
        trades,
        params.costing_method,
        params.annual_expense_rate,
        params.current_price,
        params.as_of,
        snapshot,
    )?)
}

pub async fn post_rounds(
    State(state): State<AppState>,
    Json(request): Json<RoundsRequest>,
) -> Result<Json<HoldingRounds>, AppError> {
    let params = resolve(
        &state,
        request.costing_method,
        request.annual_expense_rate,
        request.current_price,
        request.as_of,
    )?;

    if let Some(snapshot) = &request.snapshot {
        if snapshot.values().iter().flatten().any(|v| v.abs() > MAX_QUANTITY) {
            return Err(AppError::BadRequest(
                "snapshot values must not exceed 1e15 in magnitude".to_string(),
            ));
        }
    }

    let trades: Vec<TradeEvent> = request.trades.into_iter().map(TradeEvent::from).collect();
    let result = run(&trades, &params, request.snapshot.as_ref())?;
    Ok(Json(result))
}

pub async fn post_rounds_csv(
    Query(params): Query<RoundsQuery>,
    State(state): State<AppState>,
    body: Bytes,
) -> Result<Json<HoldingRounds>, AppError> {
    let costing_method = params
        .costing_method
        .as_deref()
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::parse::<CostingMethod>)
        .transpose()
        .map_err(AppError::BadRequest)?;
    let annual_expense_rate =
        parse_decimal_param("annualExpenseRate", params.annual_expense_rate.as_deref())?;
    let current_price = parse_decimal_param("currentPrice", params.current_price.as_deref())?;
    let as_of = params
        .as_of
        .as_deref()
        .map(|s| TradeDate::parse_from_str(s.trim(), "%Y-%m-%d"))
        .transpose()
        .map_err(|_| AppError::BadRequest("Invalid asOf".to_string()))?;

    let resolved = resolve(&state, costing_method, annual_expense_rate, current_price, as_of)?;
    let trades = parse_ledger_csv(&body)?;
    let result = run(&trades, &resolved, None)?;
    Ok(Json(result))
}
