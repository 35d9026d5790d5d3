use std::sync::Arc;

use axum::extract::rejection::JsonRejection;
use axum::extract::{Extension, Query};
use axum::response::{IntoResponse, Response};
use axum::Json;
use chrono::Utc;

use botica_infra::ledger::SaleRequest;

use crate::app::AppServices;
use crate::app::{dto, errors};

pub async fn sell(
    Extension(services): Extension<Arc<AppServices>>,
    body: Result<Json<SaleRequest>, JsonRejection>,
) -> Response {
    let Json(body) = match body {
        Ok(b) => b,
        Err(e) => return errors::body_rejection(e),
    };

    match services.ledger().sell(body) {
        Ok(result) => Json(result).into_response(),
        Err(e) => errors::ledger_error_to_response(e),
    }
}

/// Totals for one UTC day (today by default).
pub async fn daily(
    Extension(services): Extension<Arc<AppServices>>,
    Query(query): Query<dto::DailyQuery>,
) -> Response {
    let date = query.date.unwrap_or_else(|| Utc::now().date_naive());
    match services.ledger().daily_summary(date) {
        Ok(summary) => Json(summary).into_response(),
        Err(e) => errors::ledger_error_to_response(e),
    }
}

pub async fn monthly(
    Extension(services): Extension<Arc<AppServices>>,
    Query(query): Query<dto::MonthlyQuery>,
) -> Response {
    match services.ledger().monthly_report(query.year, query.month) {
        Ok(report) => Json(report).into_response(),
        Err(e) => errors::ledger_error_to_response(e),
    }
}
