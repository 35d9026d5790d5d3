use axum::Router;
use axum::routing::{get, post};

pub mod alerts;
pub mod items;
pub mod pricing;
pub mod restock;
pub mod sales;
pub mod system;

pub fn router() -> Router {
    Router::new()
        .route("/health", get(system::health))
        .route("/pricing/scales", get(pricing::list_scales))
        .route("/pricing/quote", post(pricing::quote))
        .nest("/items", items::router())
        .route("/sell", post(sales::sell))
        .route("/sales/daily", get(sales::daily))
        .route("/sales/monthly", get(sales::monthly))
        .route("/restock", post(restock::restock))
        .route("/restock/preview", post(restock::preview))
        .route("/alerts", get(alerts::list_alerts))
}
