//! Infrastructure layer: event store, command dispatch, read models and the
//! services that compose the domain crates.
//!
//! - [`ledger::StockLedger`] owns every inventory mutation.
//! - [`restock::RestockService`] reconciles incoming batches, calling the
//!   name matcher under a timeout.

pub mod command_dispatcher;
pub mod event_store;
pub mod ledger;
pub mod projections;
pub mod read_model;
pub mod restock;

pub use ledger::{LedgerError, StockLedger};
pub use restock::{RestockError, RestockOutcome, RestockPreview, RestockService};
