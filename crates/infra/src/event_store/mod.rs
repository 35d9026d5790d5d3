//! Append-only event store boundary.
//!
//! One stream per inventory item. The abstraction makes no storage
//! assumptions; [`InMemoryEventStore`] backs tests and the default binary.

pub mod in_memory;
pub mod r#trait;

pub use in_memory::InMemoryEventStore;
pub use r#trait::{EventStore, EventStoreError, StoredEvent, UncommittedEvent};
