use std::sync::Arc;

use axum::extract::rejection::JsonRejection;
use axum::extract::Extension;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;

use crate::app::AppServices;
use crate::app::{dto, errors};

/// Unreadable restock bodies are reported like invalid ones.
fn unreadable(rejection: JsonRejection) -> Response {
    errors::json_error(
        StatusCode::UNPROCESSABLE_ENTITY,
        "invalid_restock",
        rejection.body_text(),
    )
}

pub async fn restock(
    Extension(services): Extension<Arc<AppServices>>,
    body: Result<Json<dto::RestockBody>, JsonRejection>,
) -> Response {
    let Json(body) = match body {
        Ok(b) => b,
        Err(e) => return unreadable(e),
    };

    match services.restock().restock(body.request, body.suggestion).await {
        Ok(outcome) => Json(outcome).into_response(),
        Err(e) => errors::restock_error_to_response(e),
    }
}

pub async fn preview(
    Extension(services): Extension<Arc<AppServices>>,
    body: Result<Json<dto::RestockBody>, JsonRejection>,
) -> Response {
    let Json(body) = match body {
        Ok(b) => b,
        Err(e) => return unreadable(e),
    };

    match services.restock().preview(body.request, body.suggestion).await {
        Ok(preview) => Json(preview).into_response(),
        Err(e) => errors::restock_error_to_response(e),
    }
}
