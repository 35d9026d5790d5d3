use serde::{Deserialize, Serialize};

use botica_core::{EventId, ItemId};

/// Envelope for a committed event, carrying stream metadata.
///
/// Projections consume envelopes rather than raw events so they can enforce
/// per-stream ordering and skip replays.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventEnvelope<E> {
    event_id: EventId,
    stream_id: ItemId,
    stream_type: String,

    /// Monotonically increasing position in the stream (starts at 1).
    sequence_number: u64,

    payload: E,
}

impl<E> EventEnvelope<E> {
    pub fn new(
        event_id: EventId,
        stream_id: ItemId,
        stream_type: impl Into<String>,
        sequence_number: u64,
        payload: E,
    ) -> Self {
        Self {
            event_id,
            stream_id,
            stream_type: stream_type.into(),
            sequence_number,
            payload,
        }
    }

    pub fn stream_id(&self) -> ItemId {
        self.stream_id
    }

    pub fn sequence_number(&self) -> u64 {
        self.sequence_number
    }

    pub fn payload(&self) -> &E {
        &self.payload
    }
}
