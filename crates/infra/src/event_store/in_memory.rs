use std::collections::HashMap;
use std::sync::RwLock;

use botica_core::{ExpectedVersion, ItemId};

use super::r#trait::{EventStore, EventStoreError, StoredEvent, UncommittedEvent};

/// In-memory append-only event store.
///
/// The whole map sits behind one lock, so the version check and the append
/// happen atomically.
#[derive(Debug, Default)]
pub struct InMemoryEventStore {
    streams: RwLock<HashMap<ItemId, Vec<StoredEvent>>>,
}

impl InMemoryEventStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn current_version(stream: &[StoredEvent]) -> u64 {
        stream.last().map(|e| e.sequence_number).unwrap_or(0)
    }
}

impl EventStore for InMemoryEventStore {
    fn append(
        &self,
        events: Vec<UncommittedEvent>,
        expected_version: ExpectedVersion,
    ) -> Result<Vec<StoredEvent>, EventStoreError> {
        let Some(first) = events.first() else {
            return Ok(vec![]);
        };

        let stream_id = first.stream_id;
        let stream_type = first.stream_type.clone();

        for (idx, e) in events.iter().enumerate() {
            if e.stream_id != stream_id {
                return Err(EventStoreError::InvalidAppend(format!(
                    "batch contains multiple stream ids (index {idx})"
                )));
            }
            if e.stream_type != stream_type {
                return Err(EventStoreError::StreamTypeMismatch(format!(
                    "batch contains multiple stream types (index {idx})"
                )));
            }
        }

        let mut streams = self
            .streams
            .write()
            .map_err(|_| EventStoreError::Storage("lock poisoned".to_string()))?;

        let stream = streams.entry(stream_id).or_default();
        let current = Self::current_version(stream);

        if !expected_version.matches(current) {
            return Err(EventStoreError::Concurrency(format!(
                "expected {expected_version:?}, found {current}"
            )));
        }

        if let Some(existing) = stream.first() {
            if existing.stream_type != stream_type {
                return Err(EventStoreError::StreamTypeMismatch(format!(
                    "stream type is '{}', attempted append with '{}'",
                    existing.stream_type, stream_type
                )));
            }
        }

        let mut committed = Vec::with_capacity(events.len());
        for (offset, e) in events.into_iter().enumerate() {
            let stored = StoredEvent {
                event_id: e.event_id,
                stream_id: e.stream_id,
                stream_type: e.stream_type,
                sequence_number: current + 1 + offset as u64,
                event_type: e.event_type,
                event_version: e.event_version,
                occurred_at: e.occurred_at,
                payload: e.payload,
            };
            stream.push(stored.clone());
            committed.push(stored);
        }

        Ok(committed)
    }

    fn load_stream(&self, stream_id: ItemId) -> Result<Vec<StoredEvent>, EventStoreError> {
        let streams = self
            .streams
            .read()
            .map_err(|_| EventStoreError::Storage("lock poisoned".to_string()))?;

        Ok(streams.get(&stream_id).cloned().unwrap_or_default())
    }
}
