//! Domain event primitives shared by the ledger aggregates and projections.

pub mod envelope;
pub mod event;

pub use envelope::EventEnvelope;
pub use event::Event;
