use std::collections::HashMap;
use std::sync::RwLock;

use chrono::{DateTime, Utc};
use serde_json::Value as JsonValue;

use botica_core::{ItemId, SaleId};
use botica_events::EventEnvelope;
use botica_inventory::InventoryEvent;
use botica_sales::SaleRecord;

use super::{ProjectionError, unseen};
use crate::read_model::KeyedStore;

/// Append-only journal of every sale, across items.
#[derive(Debug)]
pub struct SalesJournalProjection<S>
where
    S: KeyedStore<SaleId, SaleRecord>,
{
    store: S,
    cursors: RwLock<HashMap<ItemId, u64>>,
}

impl<S> SalesJournalProjection<S>
where
    S: KeyedStore<SaleId, SaleRecord>,
{
    pub fn new(store: S) -> Self {
        Self {
            store,
            cursors: RwLock::new(HashMap::new()),
        }
    }

    pub fn sync(&self, envelopes: &[EventEnvelope<JsonValue>]) -> Result<(), ProjectionError> {
        let Some(first) = envelopes.first() else {
            return Ok(());
        };
        let item_id = first.stream_id();

        let mut cursors = self.cursors.write().map_err(|_| ProjectionError::Poisoned)?;
        let cursor = cursors.get(&item_id).copied().unwrap_or(0);
        let pending = unseen(cursor, envelopes)?;

        for (seq, event) in pending {
            if let InventoryEvent::StockSold(e) = event {
                self.store.upsert(e.sale.sale_id, e.sale);
            }
            cursors.insert(item_id, seq);
        }
        Ok(())
    }

    /// Every recorded sale, oldest first.
    pub fn all(&self) -> Vec<SaleRecord> {
        let mut sales = self.store.list();
        sales.sort_by(|a, b| {
            a.timestamp
                .cmp(&b.timestamp)
                .then_with(|| a.sale_id.cmp(&b.sale_id))
        });
        sales
    }

    /// Sales with `from <= timestamp < to`, oldest first.
    pub fn between(&self, from: DateTime<Utc>, to: DateTime<Utc>) -> Vec<SaleRecord> {
        self.all()
            .into_iter()
            .filter(|s| s.timestamp >= from && s.timestamp < to)
            .collect()
    }
}
