//! Read models derived from the inventory event streams.
//!
//! Every projection is:
//! - **Rebuildable**: it can be reconstructed by replaying the streams
//! - **Idempotent**: envelopes at or below the per-stream cursor are skipped
//! - **Ordered**: envelopes past the cursor must continue the stream without gaps
//!
//! The ledger hands each projection the whole stream after every commit, so a
//! writer that commits later but syncs first simply brings the projection up
//! to date for both.

pub mod catalog;
pub mod sales_journal;

use serde_json::Value as JsonValue;
use thiserror::Error;

use botica_core::ItemId;
use botica_events::EventEnvelope;
use botica_inventory::InventoryEvent;

pub use catalog::{CatalogProjection, ItemView};
pub use sales_journal::SalesJournalProjection;

#[derive(Debug, Error)]
pub enum ProjectionError {
    #[error("failed to deserialize inventory event: {0}")]
    Deserialize(String),

    #[error("envelope for stream {found} delivered with stream {expected}")]
    StreamMismatch { expected: ItemId, found: ItemId },

    #[error("non-contiguous sequence number (last={last}, found={found})")]
    NonContiguousSequence { last: u64, found: u64 },

    #[error("projection state unavailable (lock poisoned)")]
    Poisoned,
}

/// Envelopes of one stream that lie past `cursor`, decoded, in order.
fn unseen(
    cursor: u64,
    envelopes: &[EventEnvelope<JsonValue>],
) -> Result<Vec<(u64, InventoryEvent)>, ProjectionError> {
    let Some(first) = envelopes.first() else {
        return Ok(vec![]);
    };
    let stream_id = first.stream_id();

    let mut last = cursor;
    let mut out = Vec::new();
    for env in envelopes {
        if env.stream_id() != stream_id {
            return Err(ProjectionError::StreamMismatch {
                expected: stream_id,
                found: env.stream_id(),
            });
        }
        let seq = env.sequence_number();
        if seq <= last {
            continue;
        }
        if seq != last + 1 {
            return Err(ProjectionError::NonContiguousSequence { last, found: seq });
        }
        let event: InventoryEvent = serde_json::from_value(env.payload().clone())
            .map_err(|e| ProjectionError::Deserialize(e.to_string()))?;
        out.push((seq, event));
        last = seq;
    }
    Ok(out)
}
