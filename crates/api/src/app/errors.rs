use axum::Json;
use axum::extract::rejection::JsonRejection;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde_json::json;

use botica_core::ItemId;
use botica_infra::{LedgerError, RestockError};
use botica_pricing::PricingError;

pub fn json_error(status: StatusCode, code: &'static str, message: impl Into<String>) -> Response {
    (
        status,
        Json(json!({
            "error": code,
            "message": message.into(),
        })),
    )
        .into_response()
}

pub fn ledger_error_to_response(err: LedgerError) -> Response {
    let message = err.to_string();
    match err {
        LedgerError::Validation(_) => json_error(StatusCode::BAD_REQUEST, "validation_error", message),
        LedgerError::NotFound => json_error(StatusCode::NOT_FOUND, "not_found", message),
        LedgerError::InsufficientStock { .. } => {
            json_error(StatusCode::CONFLICT, "insufficient_stock", message)
        }
        LedgerError::Conflict(_) => json_error(StatusCode::CONFLICT, "conflict", message),
        LedgerError::InvariantViolation(_) => {
            json_error(StatusCode::UNPROCESSABLE_ENTITY, "invariant_violation", message)
        }
        LedgerError::Storage(_) => {
            tracing::error!(error = %message, "ledger storage failure");
            json_error(StatusCode::INTERNAL_SERVER_ERROR, "storage_error", message)
        }
    }
}

pub fn restock_error_to_response(err: RestockError) -> Response {
    match err {
        RestockError::Invalid(msg) => json_error(StatusCode::UNPROCESSABLE_ENTITY, "invalid_restock", msg),
        RestockError::Ledger(e) => ledger_error_to_response(e),
    }
}

pub fn pricing_error_to_response(err: PricingError) -> Response {
    json_error(StatusCode::BAD_REQUEST, "validation_error", err.to_string())
}

pub fn body_rejection(rejection: JsonRejection) -> Response {
    json_error(StatusCode::BAD_REQUEST, "invalid_body", rejection.body_text())
}

pub fn parse_item_id(raw: &str) -> Result<ItemId, Response> {
    raw.parse()
        .map_err(|_| json_error(StatusCode::BAD_REQUEST, "invalid_id", "invalid item id"))
}
