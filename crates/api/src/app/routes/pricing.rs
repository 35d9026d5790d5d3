use std::sync::Arc;

use axum::extract::rejection::JsonRejection;
use axum::response::{IntoResponse, Response};
use axum::{Extension, Json};

use botica_pricing::{QuoteInput, quote as price};

use crate::app::AppServices;
use crate::app::errors;

pub async fn list_scales(Extension(services): Extension<Arc<AppServices>>) -> Response {
    Json(services.ledger().scales().plans().to_vec()).into_response()
}

pub async fn quote(
    Extension(services): Extension<Arc<AppServices>>,
    body: Result<Json<QuoteInput>, JsonRejection>,
) -> Response {
    let Json(input) = match body {
        Ok(b) => b,
        Err(e) => return errors::body_rejection(e),
    };

    match price(services.ledger().scales(), &input) {
        Ok(breakdown) => Json(breakdown).into_response(),
        Err(e) => errors::pricing_error_to_response(e),
    }
}
