use axum::extract::State;
use axum::Json;

use crate::api::AppState;

pub async fn health() -> Json<serde_json::Value> {
    Json(serde_json::json!({
        "status": "ok",
        "version": env!("CARGO_PKG_VERSION"),
    }))
}

/// Reports the defaults applied to requests that omit them.
pub async fn ready(State(state): State<AppState>) -> Json<serde_json::Value> {
    Json(serde_json::json!({
        "status": "ready",
        "defaultCostingMethod": state.config.default_costing_method,
        "defaultAnnualExpenseRate": state.config.default_annual_expense_rate,
    }))
}
