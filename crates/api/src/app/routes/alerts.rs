use std::sync::Arc;

use axum::extract::{Extension, Query};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use chrono::Utc;

use botica_alerts::{AlertSummary, scan};

use crate::app::AppServices;
use crate::app::{dto, errors};

pub async fn list_alerts(
    Extension(services): Extension<Arc<AppServices>>,
    Query(query): Query<dto::AlertsQuery>,
) -> Response {
    let as_of = match query.as_of.as_deref() {
        None => Utc::now(),
        Some(raw) => match dto::parse_as_of(raw) {
            Some(ts) => ts,
            None => {
                return errors::json_error(
                    StatusCode::BAD_REQUEST,
                    "validation_error",
                    "as_of must be an RFC 3339 timestamp or YYYY-MM-DD",
                );
            }
        },
    };

    let alerts = scan(&services.ledger().snapshot(), as_of);
    let summary = AlertSummary::from_alerts(&alerts);

    Json(dto::AlertsResponse {
        as_of,
        alerts,
        summary,
    })
    .into_response()
}
