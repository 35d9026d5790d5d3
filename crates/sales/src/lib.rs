//! Sales records and reporting.
//!
//! A [`SaleRecord`] is written once by the stock ledger and never changed.
//! The report types here are pure folds over a slice of records (no IO, no
//! storage).

pub mod record;
pub mod report;

pub use record::SaleRecord;
pub use report::{DailySummary, ItemRef, ItemSales, LEAST_SOLD_LIMIT, MonthlyReport};
