//! HTTP binding for the pricing, ledger, restock and alert operations.

pub mod app;
pub mod config;
