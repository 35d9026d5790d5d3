use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::StatusCode;
use rust_decimal::Decimal;
use serde_json::{Value, json};

use botica_ai::{AiError, MatchCandidate, MatchSuggester};
use botica_api::app::{self, AppServices};
use botica_api::config::Config;
use botica_infra::StockLedger;

struct TestServer {
    base_url: String,
    client: reqwest::Client,
    handle: tokio::task::JoinHandle<()>,
}

impl TestServer {
    /// Same router as prod, bound to an ephemeral port.
    async fn spawn() -> Self {
        let router = app::build_app(&Config::default()).expect("default config is valid");
        Self::serve(router).await
    }

    async fn spawn_with_suggester(config: Config, suggester: Arc<dyn MatchSuggester>) -> Self {
        let ledger = Arc::new(StockLedger::in_memory(config.scale_table().unwrap()));
        let services = Arc::new(AppServices::new(ledger, suggester, &config));
        Self::serve(app::router(services)).await
    }

    async fn serve(router: axum::Router) -> Self {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .expect("failed to bind ephemeral port");
        let addr = listener.local_addr().unwrap();

        let handle = tokio::spawn(async move {
            axum::serve(listener, router).await.unwrap();
        });

        Self {
            base_url: format!("http://{addr}"),
            client: reqwest::Client::new(),
            handle,
        }
    }

    async fn get(&self, path: &str) -> (StatusCode, Value) {
        let res = self
            .client
            .get(format!("{}{}", self.base_url, path))
            .send()
            .await
            .unwrap();
        let status = res.status();
        (status, res.json().await.unwrap_or(Value::Null))
    }

    async fn send(&self, method: reqwest::Method, path: &str, body: Value) -> (StatusCode, Value) {
        let res = self
            .client
            .request(method, format!("{}{}", self.base_url, path))
            .json(&body)
            .send()
            .await
            .unwrap();
        let status = res.status();
        (status, res.json().await.unwrap_or(Value::Null))
    }

    async fn post(&self, path: &str, body: Value) -> (StatusCode, Value) {
        self.send(reqwest::Method::POST, path, body).await
    }

    async fn create_item(&self, name: &str, stock: i64, cost: &str, minimum: i64) -> Value {
        let (status, body) = self
            .post(
                "/items",
                json!({
                    "name": name,
                    "category": "antibioticos",
                    "stock": stock,
                    "stock_minimum": minimum,
                    "lot": "L-2024-01",
                    "cost_base": cost,
                    "tax_rate": "0",
                    "scale_code": "sin_escala",
                    "discount_rate": "0",
                }),
            )
            .await;
        assert_eq!(status, StatusCode::CREATED, "create failed: {body}");
        body
    }
}

impl Drop for TestServer {
    fn drop(&mut self) {
        self.handle.abort();
    }
}

fn dec(v: &Value) -> Decimal {
    match v {
        Value::String(s) => s.parse().unwrap(),
        Value::Number(n) => n.to_string().parse().unwrap(),
        other => panic!("not a decimal: {other}"),
    }
}

fn close(a: Decimal, b: &str) -> bool {
    let b: Decimal = b.parse().unwrap();
    (a - b).abs() < Decimal::new(1, 3)
}

#[tokio::test]
async fn health_reports_ok() {
    let srv = TestServer::spawn().await;
    let (status, body) = srv.get("/health").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ok");
}

#[tokio::test]
async fn quote_reports_broken_margin_guarantee() {
    let srv = TestServer::spawn().await;

    let (status, body) = srv
        .post(
            "/pricing/quote",
            json!({ "cost_base": "100", "tax_rate": "15", "scale_code": "10+3", "discount_rate": "10" }),
        )
        .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["total_units"], 13);
    assert!(close(dec(&body["unit_cost_effective"]), "88.4615"));
    assert!(close(dec(&body["price_list"]), "117.949"));
    assert!(close(dec(&body["price_public"]), "106.154"));
    assert_eq!(body["margin_guaranteed"], false);
    assert!(body["verification"].is_string());
}

#[tokio::test]
async fn quote_rejects_bad_input() {
    let srv = TestServer::spawn().await;

    let (status, body) = srv
        .post("/pricing/quote", json!({ "cost_base": "10", "scale_code": "7+7" }))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "validation_error");

    let (status, _) = srv
        .post("/pricing/quote", json!({ "cost_base": "0", "scale_code": "sin_escala" }))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, scales) = srv.get("/pricing/scales").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(scales.as_array().unwrap().len(), 5);
}

#[tokio::test]
async fn item_lifecycle_sell_oversell_adjust() {
    let srv = TestServer::spawn().await;
    let created = srv.create_item("Paracetamol 500mg", 10, "3", 5).await;
    let id = created["item_id"].as_str().unwrap().to_string();
    assert!(close(dec(&created["pricing"]["price_list"]), "4"));

    let (status, sold) = srv.post("/sell", json!({ "item_id": id, "quantity": 4 })).await;
    assert_eq!(status, StatusCode::OK, "sell failed: {sold}");
    assert_eq!(sold["item"]["stock"], 6);
    assert_eq!(sold["sale"]["quantity"], 4);
    assert!(close(dec(&sold["profit"]), "4"));

    let (status, body) = srv.post("/sell", json!({ "item_id": id, "quantity": 7 })).await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["error"], "insufficient_stock");

    let (status, body) = srv
        .post(&format!("/items/{id}/adjust"), json!({ "delta": -7, "reason": "merma" }))
        .await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(body["error"], "invariant_violation");

    let (status, item) = srv.get(&format!("/items/{id}")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(item["stock"], 6);

    let (status, list) = srv.get("/items").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(list.as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn terms_details_and_reprice() {
    let srv = TestServer::spawn().await;
    let created = srv.create_item("Ibuprofeno 400mg", 20, "100", 5).await;
    let id = created["item_id"].as_str().unwrap().to_string();

    let (status, item) = srv
        .send(
            reqwest::Method::PUT,
            &format!("/items/{id}/terms"),
            json!({ "cost_base": "100", "tax_rate": "15", "scale_code": "10+3", "discount_rate": "10" }),
        )
        .await;
    assert_eq!(status, StatusCode::OK, "terms failed: {item}");
    assert_eq!(item["scale_code"], "10+3");
    assert_eq!(item["pricing"]["margin_guaranteed"], false);

    let (status, item) = srv
        .send(
            reqwest::Method::PATCH,
            &format!("/items/{id}"),
            json!({ "stock_minimum": 2, "lot": "L-2024-09" }),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(item["stock_minimum"], 2);
    assert_eq!(item["lot"], "L-2024-09");

    let (status, item) = srv
        .send(
            reqwest::Method::PATCH,
            &format!("/items/{id}"),
            json!({ "supplier": "Droguería Central", "expiry_date": "2026-01-31" }),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(item["expiry_date"], "2026-01-31");

    let (status, item) = srv
        .send(
            reqwest::Method::PATCH,
            &format!("/items/{id}"),
            json!({ "supplier": null, "expiry_date": null }),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert!(item["supplier"].is_null());
    assert!(item["expiry_date"].is_null());
    assert_eq!(item["lot"], "L-2024-09");

    let (status, item) = srv.post(&format!("/items/{id}/reprice"), json!({})).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(item["version"], 6);
}

#[tokio::test]
async fn bad_and_unknown_ids() {
    let srv = TestServer::spawn().await;

    let (status, body) = srv.get("/items/not-a-uuid").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "invalid_id");

    let (status, body) = srv
        .get("/items/018f3a2e-5b7c-7d1e-9a4b-2c6d8e0f1a3b")
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"], "not_found");
}

#[tokio::test]
async fn restock_merges_a_known_product() {
    let srv = TestServer::spawn().await;
    let created = srv.create_item("Amoxicilina 500mg", 5, "80", 10).await;
    let id = created["item_id"].as_str().unwrap().to_string();

    let batch = json!({
        "candidate_name": "AMOXICILINA 500 mg",
        "lot": "L-2024-07",
        "expiry_date": "2026-03-31",
        "stock_incoming": 20,
        "cost_unit_incoming": "100",
        "tax_rate": "0",
        "scale_code": "sin_escala",
        "discount_rate": "0",
    });

    let (status, preview) = srv.post("/restock/preview", batch.clone()).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(preview["decision"]["decision"], "merge_into");
    let (_, unchanged) = srv.get(&format!("/items/{id}")).await;
    assert_eq!(unchanged["stock"], 5);

    let (status, outcome) = srv.post("/restock", batch).await;
    assert_eq!(status, StatusCode::OK, "restock failed: {outcome}");
    assert_eq!(outcome["degraded"], false);
    assert_eq!(outcome["decision"]["decision"], "merge_into");
    assert_eq!(outcome["item"]["item_id"], id.as_str());
    assert_eq!(outcome["item"]["stock"], 25);
    assert!(close(dec(&outcome["item"]["cost_base"]), "96"));
    assert_eq!(outcome["item"]["lot"], "L-2024-07");
}

#[tokio::test]
async fn restock_of_a_new_product_creates_it() {
    let srv = TestServer::spawn().await;
    srv.create_item("Amoxicilina 500mg", 5, "80", 10).await;

    let (status, outcome) = srv
        .post(
            "/restock",
            json!({
                "candidate_name": "Loratadina jarabe 120ml",
                "stock_incoming": 12,
                "cost_unit_incoming": "6.5",
                "scale_code": "5+1",
            }),
        )
        .await;

    assert_eq!(status, StatusCode::OK, "restock failed: {outcome}");
    assert_eq!(outcome["decision"]["decision"], "create_new");
    assert_eq!(outcome["item"]["stock"], 12);
    assert_eq!(outcome["item"]["scale_code"], "5+1");

    let (_, list) = srv.get("/items").await;
    assert_eq!(list.as_array().unwrap().len(), 2);
}

#[tokio::test]
async fn invalid_restock_is_unprocessable() {
    let srv = TestServer::spawn().await;

    let (status, body) = srv
        .post(
            "/restock",
            json!({
                "candidate_name": "Amoxicilina",
                "stock_incoming": 0,
                "cost_unit_incoming": "10",
                "scale_code": "sin_escala",
            }),
        )
        .await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(body["error"], "invalid_restock");

    let (status, _) = srv.post("/restock", json!({ "candidate_name": 3 })).await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
}

struct SlowSuggester;

#[async_trait]
impl MatchSuggester for SlowSuggester {
    async fn suggest(&self, _candidate_name: &str) -> Result<MatchCandidate, AiError> {
        tokio::time::sleep(Duration::from_secs(10)).await;
        Err(AiError::Unavailable("never answers".to_string()))
    }
}

#[tokio::test]
async fn slow_matcher_degrades_restock_to_create_new() {
    let mut config = Config::default();
    config.restock.suggester_timeout_ms = 50;
    let srv = TestServer::spawn_with_suggester(config, Arc::new(SlowSuggester)).await;
    srv.create_item("Amoxicilina 500mg", 5, "80", 10).await;

    let (status, outcome) = srv
        .post(
            "/restock",
            json!({
                "candidate_name": "Amoxicilina 500mg",
                "stock_incoming": 20,
                "cost_unit_incoming": "100",
                "scale_code": "sin_escala",
            }),
        )
        .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(outcome["degraded"], true);
    assert_eq!(outcome["decision"]["decision"], "create_new");
    assert_eq!(outcome["decision"]["confidence"], 0.0);
}

#[tokio::test]
async fn alerts_reflect_stock_and_expiry() {
    let srv = TestServer::spawn().await;
    srv.create_item("Omeprazol 20mg", 0, "2", 5).await;
    let (status, _) = srv
        .post(
            "/items",
            json!({
                "name": "Vitamina C",
                "stock": 100,
                "stock_minimum": 10,
                "expiry_date": "2024-06-20",
                "cost_base": "1",
                "scale_code": "sin_escala",
            }),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED);

    let (status, body) = srv.get("/alerts?as_of=2024-06-10").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["summary"]["total"], 2);

    let alerts = body["alerts"].as_array().unwrap();
    assert_eq!(alerts[0]["type"], "stock_bajo");
    assert_eq!(alerts[0]["priority"], "alta");
    assert_eq!(alerts[1]["type"], "vencimiento_cercano");
    assert_eq!(alerts[1]["priority"], "media");
    assert_eq!(alerts[1]["days_remaining"], 10);
    assert!(alerts[0].get("days_remaining").is_none());

    let (status, body) = srv.get("/alerts?as_of=yesterday").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "validation_error");
}

#[tokio::test]
async fn sales_reports_cover_the_day_of_the_sale() {
    let srv = TestServer::spawn().await;
    let created = srv.create_item("Suero oral", 30, "2", 5).await;
    let id = created["item_id"].as_str().unwrap().to_string();
    srv.create_item("Jarabe para la tos", 8, "4", 2).await;

    let mut sold_at = None;
    for qty in [2, 3] {
        let (status, sold) = srv.post("/sell", json!({ "item_id": id, "quantity": qty })).await;
        assert_eq!(status, StatusCode::OK);
        sold_at = sold["sale"]["timestamp"].as_str().map(str::to_string);
    }

    let sold_at = chrono::DateTime::parse_from_rfc3339(&sold_at.unwrap()).unwrap();
    let day = sold_at.with_timezone(&chrono::Utc).date_naive();

    let (status, daily) = srv.get(&format!("/sales/daily?date={day}")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(daily["sale_count"], 2);
    assert_eq!(daily["units_sold"], 5);

    let (status, monthly) = srv
        .get(&format!(
            "/sales/monthly?year={}&month={}",
            chrono::Datelike::year(&day),
            chrono::Datelike::month(&day)
        ))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(monthly["items"][0]["item_name"], "Suero oral");
    assert_eq!(monthly["least_sold"][0]["units_sold"], 5);
    assert_eq!(monthly["unsold"].as_array().unwrap().len(), 1);
    assert_eq!(monthly["unsold"][0]["item_name"], "Jarabe para la tos");

    let (status, body) = srv.get("/sales/monthly?year=2024&month=13").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "validation_error");
}

#[tokio::test]
async fn items_can_be_searched_by_name_or_category() {
    let srv = TestServer::spawn().await;
    srv.create_item("Amoxicilina 500mg", 5, "80", 10).await;
    srv.create_item("Azitromicina 250mg", 5, "60", 10).await;
    let (status, _) = srv
        .post(
            "/items",
            json!({
                "name": "Loratadina 10mg",
                "category": "Antialergicos",
                "stock": 12,
                "cost_base": "3",
                "scale_code": "sin_escala",
            }),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED);

    let (status, found) = srv.get("/items?query=AMOXI").await;
    assert_eq!(status, StatusCode::OK);
    let found = found.as_array().unwrap();
    assert_eq!(found.len(), 1);
    assert_eq!(found[0]["name"], "Amoxicilina 500mg");

    let (_, found) = srv.get("/items?query=antibio").await;
    assert_eq!(found.as_array().unwrap().len(), 2);

    let (_, found) = srv.get("/items?query=antialergicos").await;
    assert_eq!(found[0]["name"], "Loratadina 10mg");

    let (_, found) = srv.get("/items?query=insulina").await;
    assert!(found.as_array().unwrap().is_empty());
}
