use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use botica_core::ItemId;

use crate::alert::{Alert, AlertType, Priority};

/// Items expiring within this many days (exclusive of today) raise an alert.
pub const EXPIRY_WINDOW_DAYS: i64 = 28;

const EXPIRY_ALTA_DAYS: i64 = 7;
const EXPIRY_MEDIA_DAYS: i64 = 14;

/// The fields of an inventory item the alert scan needs.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StockSnapshot {
    pub item_id: ItemId,
    pub name: String,
    pub stock: i64,
    pub stock_minimum: i64,
    pub expiry_date: Option<NaiveDate>,
}

/// Produce every alert for `items` as of `now`.
///
/// Ordered by priority (alta first), then item name, then alert type.
pub fn scan(items: &[StockSnapshot], now: DateTime<Utc>) -> Vec<Alert> {
    let today = now.date_naive();
    let mut alerts = Vec::new();

    for item in items {
        if let Some(priority) = stock_priority(item.stock, item.stock_minimum) {
            alerts.push(Alert {
                alert_type: AlertType::StockBajo,
                item_id: item.item_id,
                item_name: item.name.clone(),
                message: stock_message(item),
                priority,
                generated_at: now,
                days_remaining: None,
            });
        }

        if let Some(expiry) = item.expiry_date {
            let days = (expiry - today).num_days();
            if let Some(priority) = expiry_priority(days) {
                alerts.push(Alert {
                    alert_type: AlertType::VencimientoCercano,
                    item_id: item.item_id,
                    item_name: item.name.clone(),
                    message: expiry_message(&item.name, expiry, days),
                    priority,
                    generated_at: now,
                    days_remaining: Some(days),
                });
            }
        }
    }

    alerts.sort_by(|a, b| {
        a.priority
            .cmp(&b.priority)
            .then_with(|| a.item_name.cmp(&b.item_name))
            .then_with(|| a.alert_type.cmp(&b.alert_type))
            .then_with(|| a.item_id.cmp(&b.item_id))
    });
    alerts
}

fn stock_priority(stock: i64, minimum: i64) -> Option<Priority> {
    if stock > minimum {
        return None;
    }
    // `stock <= minimum * 0.5`, kept in integers.
    Some(if stock <= 0 {
        Priority::Alta
    } else if stock.saturating_mul(2) <= minimum {
        Priority::Media
    } else {
        Priority::Baja
    })
}

fn expiry_priority(days: i64) -> Option<Priority> {
    match days {
        d if d <= 0 || d > EXPIRY_WINDOW_DAYS => None,
        d if d <= EXPIRY_ALTA_DAYS => Some(Priority::Alta),
        d if d <= EXPIRY_MEDIA_DAYS => Some(Priority::Media),
        _ => Some(Priority::Baja),
    }
}

fn stock_message(item: &StockSnapshot) -> String {
    if item.stock <= 0 {
        format!("Sin stock: {} (mínimo {})", item.name, item.stock_minimum)
    } else {
        format!(
            "Stock bajo: {} ({} de mínimo {})",
            item.name, item.stock, item.stock_minimum
        )
    }
}

fn expiry_message(name: &str, expiry: NaiveDate, days: i64) -> String {
    let unit = if days == 1 { "día" } else { "días" };
    format!(
        "Vencimiento cercano: {} vence el {} (en {} {})",
        name,
        expiry.format("%d/%m/%Y"),
        days,
        unit
    )
}
