//! Stock ledger: the only writer of inventory state.
//!
//! Each operation builds one inventory command and sends it through the
//! [`CommandDispatcher`], which serializes writers per item with a
//! version-checked append. Once the append lands, the committed stream is
//! pushed into the catalog and sales projections before the call returns.

use std::sync::Arc;

use chrono::{DateTime, Days, NaiveDate, NaiveTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value as JsonValue;
use thiserror::Error;

use botica_ai::{CatalogEntry, CatalogSource};
use botica_alerts::StockSnapshot;
use botica_core::{DomainError, ItemId, SaleId};
use botica_events::EventEnvelope;
use botica_inventory::{
    AdjustStock, DEFAULT_STOCK_MINIMUM, InventoryCommand, InventoryEvent, InventoryItem,
    MergeRestock, RecomputePrices, RegisterItem, SellStock, UpdateDetails, UpdateTerms,
};
use botica_pricing::{PriceBreakdown, PricingError, PricingTerms, ScaleTable};
use botica_restock::{ExistingItem, ValidRestock};
use botica_sales::{DailySummary, ItemRef, MonthlyReport, SaleRecord};

use crate::command_dispatcher::{CommandDispatcher, Committed, DispatchError};
use crate::event_store::{EventStore, InMemoryEventStore, StoredEvent};
use crate::projections::{CatalogProjection, ItemView, ProjectionError, SalesJournalProjection};
use crate::read_model::InMemoryKeyedStore;

/// Stream type of every inventory item stream.
pub const ITEM_STREAM_TYPE: &str = "inventory.item";

/// Maximum number of items returned by [`StockLedger::search`].
pub const SEARCH_LIMIT: usize = 50;

#[derive(Debug, Error)]
pub enum LedgerError {
    #[error("validation failed: {0}")]
    Validation(String),

    #[error("item not found")]
    NotFound,

    #[error("insufficient stock: available {available}, requested {requested}")]
    InsufficientStock { available: i64, requested: i64 },

    #[error("invariant violated: {0}")]
    InvariantViolation(String),

    /// Concurrent writers kept winning, or the item already exists.
    #[error("conflict: {0}")]
    Conflict(String),

    #[error("storage failure: {0}")]
    Storage(String),
}

impl From<DispatchError> for LedgerError {
    fn from(value: DispatchError) -> Self {
        match value {
            DispatchError::Validation(msg) => LedgerError::Validation(msg),
            DispatchError::InvariantViolation(msg) => LedgerError::InvariantViolation(msg),
            DispatchError::NotFound => LedgerError::NotFound,
            DispatchError::Conflict(msg) => LedgerError::Conflict(msg),
            e @ DispatchError::Concurrency { .. } => LedgerError::Conflict(e.to_string()),
            DispatchError::InsufficientStock {
                available,
                requested,
            } => LedgerError::InsufficientStock {
                available,
                requested,
            },
            e @ (DispatchError::Deserialize(_) | DispatchError::Store(_)) => {
                LedgerError::Storage(e.to_string())
            }
        }
    }
}

impl From<ProjectionError> for LedgerError {
    fn from(value: ProjectionError) -> Self {
        LedgerError::Storage(value.to_string())
    }
}

impl From<DomainError> for LedgerError {
    fn from(value: DomainError) -> Self {
        DispatchError::from(value).into()
    }
}

impl From<PricingError> for LedgerError {
    fn from(value: PricingError) -> Self {
        LedgerError::Validation(value.to_string())
    }
}

/// First intake of a product outside the restock flow.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewItem {
    pub name: String,
    #[serde(default)]
    pub category: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub supplier: Option<String>,
    pub stock: i64,
    #[serde(default)]
    pub stock_minimum: Option<i64>,
    #[serde(default)]
    pub lot: String,
    #[serde(default)]
    pub expiry_date: Option<NaiveDate>,
    pub cost_base: Decimal,
    #[serde(default)]
    pub tax_rate: Decimal,
    pub scale_code: String,
    #[serde(default)]
    pub discount_rate: Decimal,
}

/// Replacement purchase terms; prices are always recomputed from them.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TermsUpdate {
    pub cost_base: Decimal,
    #[serde(default)]
    pub tax_rate: Decimal,
    pub scale_code: String,
    #[serde(default)]
    pub discount_rate: Decimal,
}

/// Metadata edit. Absent fields are left as they are; an explicit `null`
/// clears `supplier` or `expiry_date`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DetailsPatch {
    pub name: Option<String>,
    pub category: Option<String>,
    pub description: Option<String>,
    #[serde(default, deserialize_with = "present")]
    pub supplier: Option<Option<String>>,
    pub stock_minimum: Option<i64>,
    pub lot: Option<String>,
    #[serde(default, deserialize_with = "present")]
    pub expiry_date: Option<Option<NaiveDate>>,
}

/// A field that is present in the body, possibly as `null`.
fn present<'de, D, T>(deserializer: D) -> Result<Option<Option<T>>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    Option::<T>::deserialize(deserializer).map(Some)
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SaleRequest {
    pub item_id: ItemId,
    pub quantity: i64,
    /// Defaults to the item's list price.
    #[serde(default)]
    pub unit_price: Option<Decimal>,
    /// Defaults to the item's configured discount.
    #[serde(default)]
    pub discount: Option<Decimal>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SaleResult {
    pub item: ItemView,
    pub sale: SaleRecord,
    pub stock_after: i64,
    pub profit: Decimal,
}

type Catalog = CatalogProjection<InMemoryKeyedStore<ItemId, InventoryItem>>;
type Journal = SalesJournalProjection<InMemoryKeyedStore<SaleId, SaleRecord>>;

pub struct StockLedger<S = InMemoryEventStore> {
    dispatcher: CommandDispatcher<S>,
    catalog: Catalog,
    journal: Journal,
    scales: ScaleTable,
}

impl StockLedger<InMemoryEventStore> {
    pub fn in_memory(scales: ScaleTable) -> Self {
        Self::new(InMemoryEventStore::new(), scales)
    }
}

impl<S> StockLedger<S>
where
    S: EventStore,
{
    pub fn new(store: S, scales: ScaleTable) -> Self {
        Self {
            dispatcher: CommandDispatcher::new(store),
            catalog: CatalogProjection::new(InMemoryKeyedStore::new()),
            journal: SalesJournalProjection::new(InMemoryKeyedStore::new()),
            scales,
        }
    }

    pub fn with_max_conflict_retries(mut self, retries: u32) -> Self {
        self.dispatcher = self.dispatcher.with_max_conflict_retries(retries);
        self
    }

    pub fn scales(&self) -> &ScaleTable {
        &self.scales
    }

    // ---- writes ----

    pub fn register(&self, item: NewItem) -> Result<ItemView, LedgerError> {
        let scale = self.scales.resolve(item.scale_code.trim())?;
        let item_id = ItemId::new();
        let command = InventoryCommand::RegisterItem(RegisterItem {
            item_id,
            name: item.name,
            category: item.category,
            description: item.description,
            supplier: item.supplier,
            stock: item.stock,
            stock_minimum: item.stock_minimum.unwrap_or(DEFAULT_STOCK_MINIMUM),
            lot: item.lot,
            expiry_date: item.expiry_date,
            terms: PricingTerms {
                cost_base: item.cost_base,
                tax_rate: item.tax_rate,
                scale,
                discount_rate: item.discount_rate,
            },
            occurred_at: Utc::now(),
        });
        self.execute(item_id, &command)
    }

    /// Register a restock batch that did not match any existing item.
    pub fn register_from_restock(&self, restock: &ValidRestock) -> Result<ItemView, LedgerError> {
        let request = restock.request();
        let item_id = ItemId::new();
        let command = InventoryCommand::RegisterItem(RegisterItem {
            item_id,
            name: restock.name().to_string(),
            category: request.category.clone(),
            description: String::new(),
            supplier: request.supplier.clone(),
            stock: request.stock_incoming,
            stock_minimum: request.stock_minimum.unwrap_or(DEFAULT_STOCK_MINIMUM),
            lot: request.lot.clone(),
            expiry_date: request.expiry_date,
            terms: restock.terms().clone(),
            occurred_at: Utc::now(),
        });
        self.execute(item_id, &command)
    }

    /// Fold a restock batch into `item_id`. The blend is computed against the
    /// stock and cost at commit time, not against any earlier preview.
    pub fn merge_restock(
        &self,
        item_id: ItemId,
        restock: &ValidRestock,
    ) -> Result<ItemView, LedgerError> {
        let request = restock.request();
        let command = InventoryCommand::MergeRestock(MergeRestock {
            item_id,
            stock_incoming: request.stock_incoming,
            cost_unit_incoming: request.cost_unit_incoming,
            tax_rate: request.tax_rate,
            scale: restock.scale().clone(),
            discount_rate: request.discount_rate,
            lot: request.lot.clone(),
            expiry_date: request.expiry_date,
            occurred_at: Utc::now(),
        });
        self.execute(item_id, &command)
    }

    pub fn sell(&self, request: SaleRequest) -> Result<SaleResult, LedgerError> {
        let command = InventoryCommand::SellStock(SellStock {
            item_id: request.item_id,
            sale_id: SaleId::new(),
            quantity: request.quantity,
            unit_price: request.unit_price,
            discount: request.discount,
            occurred_at: Utc::now(),
        });
        let committed = self.commit(request.item_id, &command)?;

        let sold = committed.events.iter().find_map(|e| match e {
            InventoryEvent::StockSold(sold) => Some(sold.clone()),
            _ => None,
        });
        let Some(sold) = sold else {
            return Err(LedgerError::Storage(
                "sale committed without a stock_sold event".to_string(),
            ));
        };
        let item = view_of(&committed.aggregate)?;

        let profit = sold.sale.profit().ok_or_else(|| {
            LedgerError::Storage("committed sale has unrepresentable profit".to_string())
        })?;

        Ok(SaleResult {
            item,
            profit,
            stock_after: sold.stock_after,
            sale: sold.sale,
        })
    }

    pub fn adjust(
        &self,
        item_id: ItemId,
        delta: i64,
        reason: impl Into<String>,
    ) -> Result<ItemView, LedgerError> {
        let command = InventoryCommand::AdjustStock(AdjustStock {
            item_id,
            delta,
            reason: reason.into(),
            occurred_at: Utc::now(),
        });
        self.execute(item_id, &command)
    }

    pub fn update_terms(
        &self,
        item_id: ItemId,
        update: TermsUpdate,
    ) -> Result<ItemView, LedgerError> {
        let scale = self.scales.resolve(update.scale_code.trim())?;
        let command = InventoryCommand::UpdateTerms(UpdateTerms {
            item_id,
            terms: PricingTerms {
                cost_base: update.cost_base,
                tax_rate: update.tax_rate,
                scale,
                discount_rate: update.discount_rate,
            },
            occurred_at: Utc::now(),
        });
        self.execute(item_id, &command)
    }

    pub fn update_details(
        &self,
        item_id: ItemId,
        patch: DetailsPatch,
    ) -> Result<ItemView, LedgerError> {
        let command = InventoryCommand::UpdateDetails(UpdateDetails {
            item_id,
            name: patch.name,
            category: patch.category,
            description: patch.description,
            supplier: patch.supplier,
            stock_minimum: patch.stock_minimum,
            lot: patch.lot,
            expiry_date: patch.expiry_date,
            occurred_at: Utc::now(),
        });
        self.execute(item_id, &command)
    }

    pub fn recompute_prices(&self, item_id: ItemId) -> Result<ItemView, LedgerError> {
        let command = InventoryCommand::RecomputePrices(RecomputePrices {
            item_id,
            occurred_at: Utc::now(),
        });
        self.execute(item_id, &command)
    }

    // ---- reads ----

    pub fn get(&self, item_id: ItemId) -> Result<ItemView, LedgerError> {
        self.catalog.get(&item_id).ok_or(LedgerError::NotFound)
    }

    pub fn list(&self) -> Vec<ItemView> {
        self.catalog.list()
    }

    /// Case-insensitive substring match on name or category, at most
    /// [`SEARCH_LIMIT`] items. A blank query matches everything.
    pub fn search(&self, query: &str) -> Vec<ItemView> {
        let needle = query.trim().to_lowercase();
        self.catalog
            .list()
            .into_iter()
            .filter(|v| {
                needle.is_empty()
                    || v.name.to_lowercase().contains(&needle)
                    || v.category.to_lowercase().contains(&needle)
            })
            .take(SEARCH_LIMIT)
            .collect()
    }

    /// Current stock levels for the alert scan.
    pub fn snapshot(&self) -> Vec<StockSnapshot> {
        self.catalog.list().iter().map(ItemView::snapshot).collect()
    }

    pub fn existing(&self, item_id: ItemId) -> Option<ExistingItem> {
        self.catalog.get(&item_id).map(|v| v.as_existing())
    }

    pub fn sales(&self) -> Vec<SaleRecord> {
        self.journal.all()
    }

    pub fn sales_between(&self, from: DateTime<Utc>, to: DateTime<Utc>) -> Vec<SaleRecord> {
        self.journal.between(from, to)
    }

    /// Totals for one UTC day.
    pub fn daily_summary(&self, date: NaiveDate) -> Result<DailySummary, LedgerError> {
        let next = date
            .checked_add_days(Days::new(1))
            .ok_or_else(|| LedgerError::Validation("date out of range".to_string()))?;
        let from = date.and_time(NaiveTime::MIN).and_utc();
        let to = next.and_time(NaiveTime::MIN).and_utc();

        Ok(DailySummary::for_day(&self.sales_between(from, to), date)?)
    }

    /// Month report; every catalog item without a sale that month is listed
    /// as unsold.
    pub fn monthly_report(&self, year: i32, month: u32) -> Result<MonthlyReport, LedgerError> {
        let catalog: Vec<ItemRef> = self
            .catalog
            .list()
            .into_iter()
            .map(|v| ItemRef {
                item_id: v.item_id,
                item_name: v.name,
            })
            .collect();

        Ok(MonthlyReport::for_month(&self.sales(), &catalog, year, month)?)
    }

    // ---- internals ----

    fn execute(
        &self,
        item_id: ItemId,
        command: &InventoryCommand,
    ) -> Result<ItemView, LedgerError> {
        let committed = self.commit(item_id, command)?;
        view_of(&committed.aggregate)
    }

    fn commit(
        &self,
        item_id: ItemId,
        command: &InventoryCommand,
    ) -> Result<Committed<InventoryItem>, LedgerError> {
        let committed = self.dispatcher.dispatch(
            item_id,
            ITEM_STREAM_TYPE,
            command,
            InventoryItem::empty,
        )?;

        let envelopes: Vec<EventEnvelope<JsonValue>> =
            committed.stream.iter().map(StoredEvent::to_envelope).collect();
        self.catalog.sync(&envelopes)?;
        self.journal.sync(&envelopes)?;

        for event in &committed.events {
            if let Some(pricing) = event.pricing() {
                log_margin_break(item_id, committed.aggregate.name(), pricing);
            }
        }
        Ok(committed)
    }
}

impl<S> CatalogSource for StockLedger<S>
where
    S: EventStore + 'static,
{
    fn entries(&self) -> Vec<CatalogEntry> {
        self.catalog.entries()
    }
}

impl<S> std::fmt::Debug for StockLedger<S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StockLedger")
            .field("scales", &self.scales)
            .finish_non_exhaustive()
    }
}

/// Expose a shared ledger as the matcher's catalog.
pub fn catalog_source<S>(ledger: &Arc<StockLedger<S>>) -> Arc<dyn CatalogSource>
where
    S: EventStore + 'static,
{
    ledger.clone()
}

fn view_of(item: &InventoryItem) -> Result<ItemView, LedgerError> {
    ItemView::from_item(item)
        .ok_or_else(|| LedgerError::Storage("committed item has no pricing".to_string()))
}

fn log_margin_break(item_id: ItemId, name: &str, pricing: &PriceBreakdown) {
    if !pricing.margin_guaranteed {
        tracing::info!(
            item_id = %item_id,
            item_name = name,
            margin_actual = %pricing.margin_actual,
            price_public = %pricing.price_public,
            "discount breaks the margin guarantee"
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread;

    use botica_pricing::blend_cost;
    use botica_restock::RestockRequest;
    use chrono::Duration;

    fn ledger() -> StockLedger {
        StockLedger::in_memory(ScaleTable::default())
    }

    fn new_item(name: &str, stock: i64, cost: i64) -> NewItem {
        NewItem {
            name: name.to_string(),
            category: "analgesicos".to_string(),
            description: String::new(),
            supplier: Some("Droguería Central".to_string()),
            stock,
            stock_minimum: None,
            lot: "L-01".to_string(),
            expiry_date: None,
            cost_base: Decimal::from(cost),
            tax_rate: Decimal::ZERO,
            scale_code: "sin_escala".to_string(),
            discount_rate: Decimal::ZERO,
        }
    }

    fn restock(stock: i64, cost: i64) -> ValidRestock {
        RestockRequest {
            candidate_name: "Amoxicilina 500mg".to_string(),
            category: String::new(),
            lot: "L-02".to_string(),
            expiry_date: NaiveDate::from_ymd_opt(2026, 1, 31),
            stock_incoming: stock,
            cost_unit_incoming: Decimal::from(cost),
            tax_rate: Decimal::ZERO,
            scale_code: "sin_escala".to_string(),
            discount_rate: Decimal::ZERO,
            stock_minimum: None,
            supplier: None,
        }
        .validate(&ScaleTable::default())
        .unwrap()
    }

    #[test]
    fn register_prices_the_item_and_lists_it() {
        let ledger = ledger();
        let view = ledger.register(new_item("Paracetamol 500mg", 20, 3)).unwrap();

        assert_eq!(view.stock, 20);
        assert_eq!(view.stock_minimum, DEFAULT_STOCK_MINIMUM);
        assert_eq!(view.pricing.price_list, Decimal::from(4));
        assert!(view.pricing.margin_guaranteed);
        assert_eq!(ledger.get(view.item_id).unwrap(), view);
        assert_eq!(ledger.list().len(), 1);
    }

    #[test]
    fn unknown_scale_is_a_validation_error() {
        let ledger = ledger();
        let mut item = new_item("Paracetamol", 1, 3);
        item.scale_code = "7+7".to_string();
        assert!(matches!(ledger.register(item), Err(LedgerError::Validation(_))));
    }

    #[test]
    fn sell_records_the_sale_and_profit() {
        let ledger = ledger();
        let item = ledger.register(new_item("Paracetamol", 10, 3)).unwrap();

        let result = ledger
            .sell(SaleRequest {
                item_id: item.item_id,
                quantity: 4,
                unit_price: None,
                discount: None,
            })
            .unwrap();

        assert_eq!(result.stock_after, 6);
        assert_eq!(result.item.stock, 6);
        // (4 - 3) * 4
        assert_eq!(result.profit, Decimal::from(4));
        assert_eq!(ledger.sales(), vec![result.sale]);
    }

    #[test]
    fn overselling_leaves_stock_unchanged() {
        let ledger = ledger();
        let item = ledger.register(new_item("Loratadina", 3, 2)).unwrap();

        let err = ledger
            .sell(SaleRequest {
                item_id: item.item_id,
                quantity: 4,
                unit_price: None,
                discount: None,
            })
            .unwrap_err();

        assert!(matches!(
            err,
            LedgerError::InsufficientStock {
                available: 3,
                requested: 4
            }
        ));
        assert_eq!(ledger.get(item.item_id).unwrap().stock, 3);
        assert!(ledger.sales().is_empty());
    }

    #[test]
    fn adjust_cannot_drive_stock_negative() {
        let ledger = ledger();
        let item = ledger.register(new_item("Omeprazol", 2, 5)).unwrap();

        let err = ledger.adjust(item.item_id, -3, "merma").unwrap_err();
        assert!(matches!(err, LedgerError::InvariantViolation(_)));

        let view = ledger.adjust(item.item_id, 5, "conteo físico").unwrap();
        assert_eq!(view.stock, 7);
    }

    #[test]
    fn unknown_item_is_not_found() {
        let ledger = ledger();
        assert!(matches!(ledger.get(ItemId::new()), Err(LedgerError::NotFound)));
        assert!(matches!(
            ledger.recompute_prices(ItemId::new()),
            Err(LedgerError::NotFound)
        ));
    }

    #[test]
    fn update_terms_reprices_with_the_new_scale() {
        let ledger = ledger();
        let item = ledger.register(new_item("Ibuprofeno", 5, 100)).unwrap();

        let view = ledger
            .update_terms(
                item.item_id,
                TermsUpdate {
                    cost_base: Decimal::from(100),
                    tax_rate: Decimal::from(15),
                    scale_code: "10+3".to_string(),
                    discount_rate: Decimal::from(10),
                },
            )
            .unwrap();

        assert_eq!(view.scale_code, "10+3");
        assert_eq!(view.pricing.total_units, 13);
        assert!(!view.pricing.margin_guaranteed);
        assert_eq!(view.version, 2);
    }

    #[test]
    fn update_details_keeps_prices() {
        let ledger = ledger();
        let item = ledger.register(new_item("Ibuprofeno", 5, 10)).unwrap();

        let view = ledger
            .update_details(
                item.item_id,
                DetailsPatch {
                    stock_minimum: Some(2),
                    lot: Some("L-99".to_string()),
                    ..DetailsPatch::default()
                },
            )
            .unwrap();

        assert_eq!(view.stock_minimum, 2);
        assert_eq!(view.lot, "L-99");
        assert_eq!(view.pricing, item.pricing);
    }

    #[test]
    fn merge_restock_blends_cost_by_stock() {
        let ledger = ledger();
        let item = ledger.register(new_item("Amoxicilina 500mg", 5, 80)).unwrap();

        let view = ledger.merge_restock(item.item_id, &restock(20, 100)).unwrap();

        assert_eq!(view.stock, 25);
        assert_eq!(view.cost_base, Decimal::from(96));
        assert_eq!(view.lot, "L-02");
        assert_eq!(view.expiry_date, NaiveDate::from_ymd_opt(2026, 1, 31));
        assert_eq!(view.pricing.unit_cost_effective, Decimal::from(96));
    }

    #[test]
    fn register_from_restock_uses_the_batch_as_is() {
        let ledger = ledger();
        let view = ledger.register_from_restock(&restock(12, 7)).unwrap();

        assert_eq!(view.name, "Amoxicilina 500mg");
        assert_eq!(view.stock, 12);
        assert_eq!(view.cost_base, Decimal::from(7));
        assert_eq!(ledger.entries().len(), 1);
    }

    #[test]
    fn sales_between_filters_by_timestamp() {
        let ledger = ledger();
        let item = ledger.register(new_item("Suero oral", 10, 2)).unwrap();
        let before = Utc::now() - Duration::seconds(1);
        ledger
            .sell(SaleRequest {
                item_id: item.item_id,
                quantity: 1,
                unit_price: None,
                discount: None,
            })
            .unwrap();
        let after = Utc::now() + Duration::seconds(1);

        assert_eq!(ledger.sales_between(before, after).len(), 1);
        assert!(ledger.sales_between(after, after + Duration::hours(1)).is_empty());
    }

    #[test]
    fn concurrent_sellers_never_oversell() {
        const STOCK: i64 = 50;
        const THREADS: usize = 10;
        const ATTEMPTS_PER_THREAD: usize = 10;

        let ledger = Arc::new(ledger().with_max_conflict_retries(10_000));
        let item = ledger.register(new_item("Cetirizina", STOCK, 4)).unwrap();

        let handles: Vec<_> = (0..THREADS)
            .map(|_| {
                let ledger = Arc::clone(&ledger);
                thread::spawn(move || {
                    let mut sold = 0i64;
                    for _ in 0..ATTEMPTS_PER_THREAD {
                        match ledger.sell(SaleRequest {
                            item_id: item.item_id,
                            quantity: 1,
                            unit_price: None,
                            discount: None,
                        }) {
                            Ok(_) => sold += 1,
                            Err(LedgerError::InsufficientStock { .. }) => {}
                            Err(other) => panic!("unexpected error: {other}"),
                        }
                    }
                    sold
                })
            })
            .collect();

        let sold: i64 = handles.into_iter().map(|h| h.join().unwrap()).sum();
        let view = ledger.get(item.item_id).unwrap();

        assert_eq!(sold, STOCK);
        assert_eq!(view.stock, 0);
        assert_eq!(ledger.sales().len() as i64, sold);
        assert_eq!(view.version, 1 + STOCK as u64);
    }

    #[test]
    fn restock_merge_racing_sellers_blends_at_commit_time() {
        const STOCK: i64 = 100;
        const INCOMING: i64 = 20;
        const THREADS: usize = 8;
        const SALES_PER_THREAD: usize = 10;

        let ledger = Arc::new(ledger().with_max_conflict_retries(10_000));
        let item = ledger.register(new_item("Amoxicilina 500mg", STOCK, 80)).unwrap();
        let batch = restock(INCOMING, 100);

        let sellers: Vec<_> = (0..THREADS)
            .map(|_| {
                let ledger = Arc::clone(&ledger);
                thread::spawn(move || {
                    for _ in 0..SALES_PER_THREAD {
                        ledger
                            .sell(SaleRequest {
                                item_id: item.item_id,
                                quantity: 1,
                                unit_price: None,
                                discount: None,
                            })
                            .unwrap();
                    }
                })
            })
            .collect();
        let merger = {
            let ledger = Arc::clone(&ledger);
            thread::spawn(move || ledger.merge_restock(item.item_id, &batch).unwrap())
        };

        for handle in sellers {
            handle.join().unwrap();
        }
        merger.join().unwrap();

        let sold = (THREADS * SALES_PER_THREAD) as i64;
        let view = ledger.get(item.item_id).unwrap();
        assert_eq!(view.stock, STOCK + INCOMING - sold);
        assert_eq!(view.version, 1 + sold as u64 + 1);
        assert_eq!(ledger.sales().len() as i64, sold);

        // Replay the stream to find the stock the merge actually saw.
        let stream = ledger.dispatcher.store().load_stream(item.item_id).unwrap();
        let mut stock = 0;
        let mut blended = None;
        for stored in &stream {
            match serde_json::from_value::<InventoryEvent>(stored.payload.clone()).unwrap() {
                InventoryEvent::ItemRegistered(e) => stock = e.stock,
                InventoryEvent::StockSold(e) => stock = e.stock_after,
                InventoryEvent::RestockMerged(e) => {
                    let expected =
                        blend_cost(stock, Decimal::from(80), INCOMING, Decimal::from(100))
                            .unwrap();
                    assert_eq!(e.new_stock, stock + INCOMING);
                    assert_eq!(e.blended_cost, expected);
                    stock = e.new_stock;
                    blended = Some(expected);
                }
                other => panic!("unexpected event {other:?}"),
            }
        }
        assert_eq!(stock, view.stock);
        assert_eq!(Some(view.cost_base), blended);
    }

    #[test]
    fn oversized_sale_is_rejected_before_commit() {
        let ledger = ledger();
        let item = ledger.register(new_item("Omeprazol 20mg", 10, 2)).unwrap();

        let err = ledger
            .sell(SaleRequest {
                item_id: item.item_id,
                quantity: 2,
                unit_price: Some(Decimal::from_i128_with_scale(5 * 10i128.pow(28), 0)),
                discount: Some(Decimal::ZERO),
            })
            .unwrap_err();

        assert!(matches!(err, LedgerError::Validation(_)));
        assert_eq!(ledger.get(item.item_id).unwrap().stock, 10);
        assert!(ledger.sales().is_empty());
        let today = Utc::now().date_naive();
        assert_eq!(ledger.daily_summary(today).unwrap().sale_count, 0);
    }

    #[test]
    fn search_matches_name_or_category_ignoring_case() {
        let ledger = ledger();
        ledger.register(new_item("Paracetamol 500mg", 5, 3)).unwrap();
        let mut amoxi = new_item("Amoxicilina 500mg", 5, 8);
        amoxi.category = "Antibioticos".to_string();
        ledger.register(amoxi).unwrap();

        let names = |q: &str| -> Vec<String> {
            ledger.search(q).into_iter().map(|v| v.name).collect()
        };

        assert_eq!(names("PARACET"), vec!["Paracetamol 500mg"]);
        assert_eq!(names("antibiot"), vec!["Amoxicilina 500mg"]);
        assert_eq!(names("500").len(), 2);
        assert_eq!(names("  ").len(), 2);
        assert!(names("loratadina").is_empty());
    }

    #[test]
    fn reports_cover_the_journal_and_unsold_items() {
        let ledger = ledger();
        let sold = ledger.register(new_item("Paracetamol 500mg", 20, 3)).unwrap();
        let idle = ledger.register(new_item("Vitamina C", 20, 1)).unwrap();
        let sale = ledger
            .sell(SaleRequest {
                item_id: sold.item_id,
                quantity: 3,
                unit_price: None,
                discount: None,
            })
            .unwrap();

        let day = sale.sale.timestamp.date_naive();
        let daily = ledger.daily_summary(day).unwrap();
        assert_eq!(daily.sale_count, 1);
        assert_eq!(daily.units_sold, 3);
        assert_eq!(daily.gross_profit, Decimal::from(3));

        let month = ledger
            .monthly_report(chrono::Datelike::year(&day), chrono::Datelike::month(&day))
            .unwrap();
        assert_eq!(month.items.len(), 1);
        assert_eq!(month.least_sold[0].item_id, sold.item_id);
        assert_eq!(month.unsold.len(), 1);
        assert_eq!(month.unsold[0].item_id, idle.item_id);

        assert!(matches!(
            ledger.monthly_report(2024, 0),
            Err(LedgerError::Validation(_))
        ));
    }

    #[test]
    fn details_patch_null_clears_and_absent_keeps() {
        let ledger = ledger();
        let mut item = new_item("Loratadina", 5, 2);
        item.expiry_date = NaiveDate::from_ymd_opt(2026, 5, 1);
        let item = ledger.register(item).unwrap();

        let keep: DetailsPatch = serde_json::from_str(r#"{"lot": "L-77"}"#).unwrap();
        assert_eq!(keep.expiry_date, None);
        let view = ledger.update_details(item.item_id, keep).unwrap();
        assert_eq!(view.expiry_date, NaiveDate::from_ymd_opt(2026, 5, 1));
        assert!(view.supplier.is_some());

        let clear: DetailsPatch =
            serde_json::from_str(r#"{"expiry_date": null, "supplier": null}"#).unwrap();
        assert_eq!(clear.expiry_date, Some(None));
        let view = ledger.update_details(item.item_id, clear).unwrap();
        assert_eq!(view.expiry_date, None);
        assert_eq!(view.supplier, None);
        assert_eq!(view.lot, "L-77");
    }
}
