use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use serde::{Deserialize, Serialize};

use botica_alerts::{Alert, AlertSummary};
use botica_restock::{MatchSuggestion, RestockRequest};

#[derive(Debug, Deserialize)]
pub struct AdjustStockRequest {
    pub delta: i64,
    pub reason: String,
}

/// Restock body: the batch plus, optionally, a suggestion the caller already
/// has (which then replaces the matcher).
#[derive(Debug, Deserialize)]
pub struct RestockBody {
    #[serde(flatten)]
    pub request: RestockRequest,
    #[serde(default)]
    pub suggestion: Option<MatchSuggestion>,
}

#[derive(Debug, Deserialize)]
pub struct ItemsQuery {
    pub query: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct AlertsQuery {
    /// RFC 3339 timestamp or a plain `YYYY-MM-DD` date (midnight UTC).
    pub as_of: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct AlertsResponse {
    pub as_of: DateTime<Utc>,
    pub alerts: Vec<Alert>,
    pub summary: AlertSummary,
}

#[derive(Debug, Deserialize)]
pub struct DailyQuery {
    pub date: Option<NaiveDate>,
}

#[derive(Debug, Deserialize)]
pub struct MonthlyQuery {
    pub year: i32,
    pub month: u32,
}

pub fn parse_as_of(raw: &str) -> Option<DateTime<Utc>> {
    if let Ok(ts) = DateTime::parse_from_rfc3339(raw) {
        return Some(ts.with_timezone(&Utc));
    }
    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .ok()
        .map(|d| d.and_time(NaiveTime::MIN).and_utc())
}
