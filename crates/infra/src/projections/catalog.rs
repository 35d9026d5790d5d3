use std::collections::HashMap;
use std::sync::RwLock;

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;

use botica_ai::{CatalogEntry, CatalogSource};
use botica_alerts::StockSnapshot;
use botica_core::{Aggregate, AggregateRoot, ItemId};
use botica_events::EventEnvelope;
use botica_inventory::InventoryItem;
use botica_pricing::PriceBreakdown;
use botica_restock::ExistingItem;

use super::{ProjectionError, unseen};
use crate::read_model::KeyedStore;

/// Queryable state of one registered item.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ItemView {
    pub item_id: ItemId,
    pub name: String,
    pub category: String,
    pub description: String,
    pub supplier: Option<String>,
    pub stock: i64,
    pub stock_minimum: i64,
    pub lot: String,
    pub expiry_date: Option<NaiveDate>,

    pub cost_base: Decimal,
    pub tax_rate: Decimal,
    pub scale_code: String,
    pub discount_rate: Decimal,
    pub pricing: PriceBreakdown,

    pub version: u64,
    pub created_at: Option<DateTime<Utc>>,
    pub updated_at: Option<DateTime<Utc>>,
}

impl ItemView {
    /// `None` until the item has been registered.
    pub fn from_item(item: &InventoryItem) -> Option<Self> {
        if !item.is_registered() {
            return None;
        }
        let terms = item.terms()?;
        let pricing = item.pricing()?;

        Some(Self {
            item_id: item.id_typed(),
            name: item.name().to_string(),
            category: item.category().to_string(),
            description: item.description().to_string(),
            supplier: item.supplier().map(str::to_string),
            stock: item.stock(),
            stock_minimum: item.stock_minimum(),
            lot: item.lot().to_string(),
            expiry_date: item.expiry_date(),
            cost_base: terms.cost_base,
            tax_rate: terms.tax_rate,
            scale_code: terms.scale.code.clone(),
            discount_rate: terms.discount_rate,
            pricing: pricing.clone(),
            version: item.version(),
            created_at: item.created_at(),
            updated_at: item.updated_at(),
        })
    }

    pub fn snapshot(&self) -> StockSnapshot {
        StockSnapshot {
            item_id: self.item_id,
            name: self.name.clone(),
            stock: self.stock,
            stock_minimum: self.stock_minimum,
            expiry_date: self.expiry_date,
        }
    }

    pub fn as_existing(&self) -> ExistingItem {
        ExistingItem {
            item_id: self.item_id,
            name: self.name.clone(),
            stock: self.stock,
            cost_base: self.cost_base,
        }
    }
}

/// Catalog projection: folds each item stream with the aggregate's own
/// `apply`, so the read model can never disagree with command handling.
#[derive(Debug)]
pub struct CatalogProjection<S>
where
    S: KeyedStore<ItemId, InventoryItem>,
{
    store: S,
    cursors: RwLock<HashMap<ItemId, u64>>,
}

impl<S> CatalogProjection<S>
where
    S: KeyedStore<ItemId, InventoryItem>,
{
    pub fn new(store: S) -> Self {
        Self {
            store,
            cursors: RwLock::new(HashMap::new()),
        }
    }

    pub fn get(&self, item_id: &ItemId) -> Option<ItemView> {
        self.store.get(item_id).as_ref().and_then(ItemView::from_item)
    }

    /// All registered items, by name then id.
    pub fn list(&self) -> Vec<ItemView> {
        let mut items: Vec<ItemView> = self
            .store
            .list()
            .iter()
            .filter_map(ItemView::from_item)
            .collect();
        items.sort_by(|a, b| a.name.cmp(&b.name).then_with(|| a.item_id.cmp(&b.item_id)));
        items
    }

    /// Bring one item up to date with its stream.
    pub fn sync(&self, envelopes: &[EventEnvelope<JsonValue>]) -> Result<(), ProjectionError> {
        let Some(first) = envelopes.first() else {
            return Ok(());
        };
        let item_id = first.stream_id();

        let mut cursors = self.cursors.write().map_err(|_| ProjectionError::Poisoned)?;
        let cursor = cursors.get(&item_id).copied().unwrap_or(0);
        let pending = unseen(cursor, envelopes)?;
        let Some((last, _)) = pending.last() else {
            return Ok(());
        };
        let last = *last;

        let mut item = self
            .store
            .get(&item_id)
            .unwrap_or_else(|| InventoryItem::empty(item_id));
        for (_, event) in &pending {
            item.apply(event);
        }

        self.store.upsert(item_id, item);
        cursors.insert(item_id, last);
        Ok(())
    }
}

impl<S> CatalogSource for CatalogProjection<S>
where
    S: KeyedStore<ItemId, InventoryItem> + 'static,
{
    fn entries(&self) -> Vec<CatalogEntry> {
        self.list()
            .into_iter()
            .map(|view| CatalogEntry {
                item_id: view.item_id,
                name: view.name,
            })
            .collect()
    }
}
