use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use botica_core::ItemId;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AlertType {
    StockBajo,
    VencimientoCercano,
}

impl AlertType {
    pub fn as_str(&self) -> &'static str {
        match self {
            AlertType::StockBajo => "stock_bajo",
            AlertType::VencimientoCercano => "vencimiento_cercano",
        }
    }
}

/// Alert urgency. Declaration order is the display order (most urgent first).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Priority {
    Alta,
    Media,
    Baja,
}

impl Priority {
    pub fn as_str(&self) -> &'static str {
        match self {
            Priority::Alta => "alta",
            Priority::Media => "media",
            Priority::Baja => "baja",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Alert {
    #[serde(rename = "type")]
    pub alert_type: AlertType,
    pub item_id: ItemId,
    pub item_name: String,
    pub message: String,
    pub priority: Priority,
    pub generated_at: DateTime<Utc>,
    /// Days until expiry; set on expiry alerts only.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub days_remaining: Option<i64>,
}

/// Totals over one scan.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AlertSummary {
    pub total: usize,
    pub by_type: BTreeMap<String, usize>,
    pub by_priority: BTreeMap<String, usize>,
}

impl AlertSummary {
    pub fn from_alerts(alerts: &[Alert]) -> Self {
        let mut summary = Self {
            total: alerts.len(),
            ..Self::default()
        };
        for alert in alerts {
            *summary
                .by_type
                .entry(alert.alert_type.as_str().to_string())
                .or_default() += 1;
            *summary
                .by_priority
                .entry(alert.priority.as_str().to_string())
                .or_default() += 1;
        }
        summary
    }
}
