//! Low-stock and near-expiry alerts.
//!
//! Alerts are recomputed from an inventory snapshot on every scan and never
//! stored. See [`scan`].

pub mod alert;
pub mod scan;

pub use alert::{Alert, AlertSummary, AlertType, Priority};
pub use scan::{EXPIRY_WINDOW_DAYS, StockSnapshot, scan};
