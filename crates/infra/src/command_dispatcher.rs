//! Command execution pipeline for event-sourced aggregates.
//!
//! ```text
//! Command
//!   ↓
//! 1. Load the item's stream
//!   ↓
//! 2. Rehydrate the aggregate (apply history in sequence order)
//!   ↓
//! 3. Handle the command (pure decision, produces events)
//!   ↓
//! 4. Append with ExpectedVersion::Exact(loaded version)
//!   ↓   └─ version moved? reload and go back to 1 (bounded)
//! 5. Apply the new events to the in-memory aggregate and return it
//! ```
//!
//! Per-item serialization is optimistic: nothing changes unless the append
//! sees the exact version the decision was based on. A stale decision is
//! thrown away and made again against fresh state, so two concurrent sales can
//! never both take the last unit.

use serde::Serialize;
use serde::de::DeserializeOwned;
use thiserror::Error;

use botica_core::{Aggregate, DomainError, EventId, ExpectedVersion, ItemId};

use crate::event_store::{EventStore, EventStoreError, StoredEvent, UncommittedEvent};

/// Default bound on reload-and-retry after a version conflict.
pub const DEFAULT_MAX_CONFLICT_RETRIES: u32 = 8;

#[derive(Debug, Error)]
pub enum DispatchError {
    /// Version conflicts persisted through every retry.
    #[error("concurrent modification of item {item_id}: gave up after {attempts} attempts")]
    Concurrency { item_id: ItemId, attempts: u32 },

    #[error("validation failed: {0}")]
    Validation(String),

    #[error("invariant violated: {0}")]
    InvariantViolation(String),

    #[error("not found")]
    NotFound,

    /// Domain-level conflict (e.g. registering an id twice). Not retried.
    #[error("conflict: {0}")]
    Conflict(String),

    #[error("insufficient stock: available {available}, requested {requested}")]
    InsufficientStock { available: i64, requested: i64 },

    /// Stored history could not be read back into the aggregate's event type.
    #[error("failed to deserialize stored event: {0}")]
    Deserialize(String),

    #[error(transparent)]
    Store(EventStoreError),
}

impl From<EventStoreError> for DispatchError {
    fn from(value: EventStoreError) -> Self {
        DispatchError::Store(value)
    }
}

impl From<DomainError> for DispatchError {
    fn from(value: DomainError) -> Self {
        match value {
            DomainError::Validation(msg) => DispatchError::Validation(msg),
            DomainError::InvalidId(msg) => DispatchError::Validation(msg),
            DomainError::InvariantViolation(msg) => DispatchError::InvariantViolation(msg),
            DomainError::NotFound => DispatchError::NotFound,
            DomainError::Conflict(msg) => DispatchError::Conflict(msg),
            DomainError::InsufficientStock {
                available,
                requested,
            } => DispatchError::InsufficientStock {
                available,
                requested,
            },
        }
    }
}

/// Result of a successful dispatch.
#[derive(Debug, Clone)]
pub struct Committed<A: Aggregate> {
    /// Aggregate state after the new events.
    pub aggregate: A,
    /// The events this command produced, in order.
    pub events: Vec<A::Event>,
    /// The whole stream as of this commit (history followed by the new events).
    pub stream: Vec<StoredEvent>,
}

#[derive(Debug)]
pub struct CommandDispatcher<S> {
    store: S,
    max_conflict_retries: u32,
}

impl<S> CommandDispatcher<S> {
    pub fn new(store: S) -> Self {
        Self {
            store,
            max_conflict_retries: DEFAULT_MAX_CONFLICT_RETRIES,
        }
    }

    pub fn with_max_conflict_retries(mut self, retries: u32) -> Self {
        self.max_conflict_retries = retries;
        self
    }

    pub fn store(&self) -> &S {
        &self.store
    }
}

impl<S> CommandDispatcher<S>
where
    S: EventStore,
{
    /// Dispatch `command` to the aggregate stored under `stream_id`.
    ///
    /// `make_aggregate` builds the empty aggregate that history is replayed
    /// onto; it is called again on every retry.
    pub fn dispatch<A>(
        &self,
        stream_id: ItemId,
        stream_type: &str,
        command: &A::Command,
        make_aggregate: impl Fn(ItemId) -> A,
    ) -> Result<Committed<A>, DispatchError>
    where
        A: Aggregate<Id = ItemId, Error = DomainError>,
        A::Event: botica_events::Event + Serialize + DeserializeOwned,
    {
        let attempts = self.max_conflict_retries.saturating_add(1);

        for attempt in 1..=attempts {
            let history = self.store.load_stream(stream_id)?;
            validate_loaded_stream(stream_id, &history)?;
            let expected = ExpectedVersion::Exact(stream_version(&history));

            let mut aggregate = make_aggregate(stream_id);
            apply_history(&mut aggregate, &history)?;

            let decided = aggregate.handle(command)?;
            if decided.is_empty() {
                return Ok(Committed {
                    aggregate,
                    events: decided,
                    stream: history,
                });
            }

            let uncommitted = decided
                .iter()
                .map(|ev| UncommittedEvent::from_typed(stream_id, stream_type, EventId::new(), ev))
                .collect::<Result<Vec<_>, _>>()?;

            match self.store.append(uncommitted, expected) {
                Ok(committed) => {
                    for ev in &decided {
                        aggregate.apply(ev);
                    }
                    let mut stream = history;
                    stream.extend(committed);
                    tracing::debug!(
                        item_id = %stream_id,
                        version = aggregate.version(),
                        attempt,
                        "command committed"
                    );
                    return Ok(Committed {
                        aggregate,
                        events: decided,
                        stream,
                    });
                }
                Err(EventStoreError::Concurrency(reason)) => {
                    tracing::debug!(item_id = %stream_id, attempt, %reason, "version conflict, retrying");
                }
                Err(other) => return Err(other.into()),
            }
        }

        tracing::warn!(item_id = %stream_id, attempts, "version conflicts exhausted retries");
        Err(DispatchError::Concurrency {
            item_id: stream_id,
            attempts,
        })
    }

    /// Rebuild an aggregate from its stream without dispatching anything.
    pub fn load<A>(
        &self,
        stream_id: ItemId,
        make_aggregate: impl Fn(ItemId) -> A,
    ) -> Result<A, DispatchError>
    where
        A: Aggregate<Id = ItemId>,
        A::Event: DeserializeOwned,
    {
        let history = self.store.load_stream(stream_id)?;
        validate_loaded_stream(stream_id, &history)?;
        let mut aggregate = make_aggregate(stream_id);
        apply_history(&mut aggregate, &history)?;
        Ok(aggregate)
    }
}

fn stream_version(stream: &[StoredEvent]) -> u64 {
    stream.last().map(|e| e.sequence_number).unwrap_or(0)
}

fn validate_loaded_stream(stream_id: ItemId, stream: &[StoredEvent]) -> Result<(), DispatchError> {
    let mut last = 0u64;
    for (idx, e) in stream.iter().enumerate() {
        if e.stream_id != stream_id {
            return Err(DispatchError::Store(EventStoreError::InvalidAppend(format!(
                "loaded stream contains wrong stream id at index {idx}"
            ))));
        }
        if e.sequence_number != last + 1 {
            return Err(DispatchError::Store(EventStoreError::InvalidAppend(format!(
                "non-contiguous sequence_number in loaded stream (last={last}, found={})",
                e.sequence_number
            ))));
        }
        last = e.sequence_number;
    }
    Ok(())
}

fn apply_history<A>(aggregate: &mut A, history: &[StoredEvent]) -> Result<(), DispatchError>
where
    A: Aggregate,
    A::Event: DeserializeOwned,
{
    for stored in history {
        let ev: A::Event = serde_json::from_value(stored.payload.clone())
            .map_err(|e| DispatchError::Deserialize(e.to_string()))?;
        aggregate.apply(&ev);
    }
    Ok(())
}
