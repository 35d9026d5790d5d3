use std::sync::Arc;

use axum::extract::rejection::JsonRejection;
use axum::extract::{Extension, Path, Query};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post, put};
use axum::{Json, Router};

use botica_infra::ledger::{DetailsPatch, NewItem, TermsUpdate};

use crate::app::AppServices;
use crate::app::{dto, errors};

pub fn router() -> Router {
    Router::new()
        .route("/", post(create_item).get(list_items))
        .route("/:id", get(get_item).patch(update_details))
        .route("/:id/terms", put(update_terms))
        .route("/:id/adjust", post(adjust_stock))
        .route("/:id/reprice", post(reprice))
}

pub async fn create_item(
    Extension(services): Extension<Arc<AppServices>>,
    body: Result<Json<NewItem>, JsonRejection>,
) -> Response {
    let Json(body) = match body {
        Ok(b) => b,
        Err(e) => return errors::body_rejection(e),
    };

    match services.ledger().register(body) {
        Ok(item) => (StatusCode::CREATED, Json(item)).into_response(),
        Err(e) => errors::ledger_error_to_response(e),
    }
}

/// Every item, or with `?query=` those whose name or category matches.
pub async fn list_items(
    Extension(services): Extension<Arc<AppServices>>,
    Query(query): Query<dto::ItemsQuery>,
) -> Response {
    let ledger = services.ledger();
    let items = match query.query.as_deref() {
        Some(q) => ledger.search(q),
        None => ledger.list(),
    };
    Json(items).into_response()
}

pub async fn get_item(
    Extension(services): Extension<Arc<AppServices>>,
    Path(id): Path<String>,
) -> Response {
    let item_id = match errors::parse_item_id(&id) {
        Ok(v) => v,
        Err(resp) => return resp,
    };

    match services.ledger().get(item_id) {
        Ok(item) => Json(item).into_response(),
        Err(e) => errors::ledger_error_to_response(e),
    }
}

pub async fn update_terms(
    Extension(services): Extension<Arc<AppServices>>,
    Path(id): Path<String>,
    body: Result<Json<TermsUpdate>, JsonRejection>,
) -> Response {
    let item_id = match errors::parse_item_id(&id) {
        Ok(v) => v,
        Err(resp) => return resp,
    };
    let Json(body) = match body {
        Ok(b) => b,
        Err(e) => return errors::body_rejection(e),
    };

    match services.ledger().update_terms(item_id, body) {
        Ok(item) => Json(item).into_response(),
        Err(e) => errors::ledger_error_to_response(e),
    }
}

pub async fn update_details(
    Extension(services): Extension<Arc<AppServices>>,
    Path(id): Path<String>,
    body: Result<Json<DetailsPatch>, JsonRejection>,
) -> Response {
    let item_id = match errors::parse_item_id(&id) {
        Ok(v) => v,
        Err(resp) => return resp,
    };
    let Json(body) = match body {
        Ok(b) => b,
        Err(e) => return errors::body_rejection(e),
    };

    match services.ledger().update_details(item_id, body) {
        Ok(item) => Json(item).into_response(),
        Err(e) => errors::ledger_error_to_response(e),
    }
}

pub async fn adjust_stock(
    Extension(services): Extension<Arc<AppServices>>,
    Path(id): Path<String>,
    body: Result<Json<dto::AdjustStockRequest>, JsonRejection>,
) -> Response {
    let item_id = match errors::parse_item_id(&id) {
        Ok(v) => v,
        Err(resp) => return resp,
    };
    let Json(body) = match body {
        Ok(b) => b,
        Err(e) => return errors::body_rejection(e),
    };

    match services.ledger().adjust(item_id, body.delta, body.reason) {
        Ok(item) => Json(item).into_response(),
        Err(e) => errors::ledger_error_to_response(e),
    }
}

pub async fn reprice(
    Extension(services): Extension<Arc<AppServices>>,
    Path(id): Path<String>,
) -> Response {
    let item_id = match errors::parse_item_id(&id) {
        Ok(v) => v,
        Err(resp) => return resp,
    };

    match services.ledger().recompute_prices(item_id) {
        Ok(item) => Json(item).into_response(),
        Err(e) => errors::ledger_error_to_response(e),
    }
}
