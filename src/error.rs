use crate::datasource::LedgerCsvError;
use crate::domain::LedgerIntegrityError;
use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum AppError {
    #[error("Bad request: {0}")]
    BadRequest(String),
    #[error(transparent)]
    Ledger(#[from] LedgerIntegrityError),
}

impl From<LedgerCsvError> for AppError {
    fn from(err: LedgerCsvError) -> Self {
        AppError::BadRequest(err.to_string())
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, body) = match self {
            AppError::BadRequest(msg) => (StatusCode::BAD_REQUEST, json!({ "error": msg })),
            AppError::Ledger(err) => (
                StatusCode::UNPROCESSABLE_ENTITY,
                json!({
                    "error": err.to_string(),
                    "index": err.index(),
                    "tradeKey": err.trade_key(),
                }),
            ),
        };

        (status, Json(body)).into_response()
    }
}
