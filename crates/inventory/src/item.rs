use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use botica_core::{Aggregate, AggregateRoot, DomainError, ItemId, SaleId};
use botica_events::Event;
use botica_pricing::{PriceBreakdown, PricingTerms, ScalePlan, blend_cost, quote_with_plan};
use botica_sales::SaleRecord;

/// Reorder threshold used when an item is registered without one.
pub const DEFAULT_STOCK_MINIMUM: i64 = 10;

/// Aggregate root: InventoryItem.
///
/// Holds a single lot: a restock overwrites `lot` and `expiry_date` and blends
/// the cost of what is on the shelf with the incoming batch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InventoryItem {
    id: ItemId,
    name: String,
    category: String,
    description: String,
    supplier: Option<String>,
    stock: i64,
    stock_minimum: i64,
    lot: String,
    expiry_date: Option<NaiveDate>,
    terms: Option<PricingTerms>,
    pricing: Option<PriceBreakdown>,
    created_at: Option<DateTime<Utc>>,
    updated_at: Option<DateTime<Utc>>,
    version: u64,
    registered: bool,
}

impl InventoryItem {
    /// Create an empty, not-yet-registered aggregate instance for rehydration.
    pub fn empty(id: ItemId) -> Self {
        Self {
            id,
            name: String::new(),
            category: String::new(),
            description: String::new(),
            supplier: None,
            stock: 0,
            stock_minimum: DEFAULT_STOCK_MINIMUM,
            lot: String::new(),
            expiry_date: None,
            terms: None,
            pricing: None,
            created_at: None,
            updated_at: None,
            version: 0,
            registered: false,
        }
    }

    pub fn id_typed(&self) -> ItemId {
        self.id
    }

    pub fn is_registered(&self) -> bool {
        self.registered
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn category(&self) -> &str {
        &self.category
    }

    pub fn description(&self) -> &str {
        &self.description
    }

    pub fn supplier(&self) -> Option<&str> {
        self.supplier.as_deref()
    }

    pub fn stock(&self) -> i64 {
        self.stock
    }

    pub fn stock_minimum(&self) -> i64 {
        self.stock_minimum
    }

    pub fn lot(&self) -> &str {
        &self.lot
    }

    pub fn expiry_date(&self) -> Option<NaiveDate> {
        self.expiry_date
    }

    /// Current purchase/resale terms. `None` until registered.
    pub fn terms(&self) -> Option<&PricingTerms> {
        self.terms.as_ref()
    }

    /// Derived prices for the current terms. `None` until registered.
    pub fn pricing(&self) -> Option<&PriceBreakdown> {
        self.pricing.as_ref()
    }

    pub fn created_at(&self) -> Option<DateTime<Utc>> {
        self.created_at
    }

    pub fn updated_at(&self) -> Option<DateTime<Utc>> {
        self.updated_at
    }
}

impl AggregateRoot for InventoryItem {
    type Id = ItemId;

    fn id(&self) -> &Self::Id {
        &self.id
    }

    fn version(&self) -> u64 {
        self.version
    }
}

// ---- Commands ----

/// Command: RegisterItem (first intake of a product).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegisterItem {
    pub item_id: ItemId,
    pub name: String,
    pub category: String,
    pub description: String,
    pub supplier: Option<String>,
    pub stock: i64,
    pub stock_minimum: i64,
    pub lot: String,
    pub expiry_date: Option<NaiveDate>,
    pub terms: PricingTerms,
    pub occurred_at: DateTime<Utc>,
}

/// Command: SellStock.
///
/// `unit_price` defaults to the item's list price and `discount` to its
/// configured discount rate, so an empty sale charges the public price.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SellStock {
    pub item_id: ItemId,
    pub sale_id: SaleId,
    pub quantity: i64,
    pub unit_price: Option<Decimal>,
    pub discount: Option<Decimal>,
    pub occurred_at: DateTime<Utc>,
}

/// Command: AdjustStock (manual correction).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AdjustStock {
    pub item_id: ItemId,
    pub delta: i64,
    pub reason: String,
    pub occurred_at: DateTime<Utc>,
}

/// Command: UpdateTerms (edit cost, tax, scale or discount; always reprices).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UpdateTerms {
    pub item_id: ItemId,
    pub terms: PricingTerms,
    pub occurred_at: DateTime<Utc>,
}

/// Command: RecomputePrices against the current terms.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecomputePrices {
    pub item_id: ItemId,
    pub occurred_at: DateTime<Utc>,
}

/// Command: UpdateDetails. `None` leaves a field unchanged; for the optional
/// fields `Some(None)` clears the value.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UpdateDetails {
    pub item_id: ItemId,
    pub name: Option<String>,
    pub category: Option<String>,
    pub description: Option<String>,
    pub supplier: Option<Option<String>>,
    pub stock_minimum: Option<i64>,
    pub lot: Option<String>,
    pub expiry_date: Option<Option<NaiveDate>>,
    pub occurred_at: DateTime<Utc>,
}

/// Command: MergeRestock (incoming batch joins this item).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MergeRestock {
    pub item_id: ItemId,
    pub stock_incoming: i64,
    pub cost_unit_incoming: Decimal,
    pub tax_rate: Decimal,
    pub scale: ScalePlan,
    pub discount_rate: Decimal,
    pub lot: String,
    pub expiry_date: Option<NaiveDate>,
    pub occurred_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum InventoryCommand {
    RegisterItem(RegisterItem),
    SellStock(SellStock),
    AdjustStock(AdjustStock),
    UpdateTerms(UpdateTerms),
    RecomputePrices(RecomputePrices),
    UpdateDetails(UpdateDetails),
    MergeRestock(MergeRestock),
}

impl InventoryCommand {
    pub fn item_id(&self) -> ItemId {
        match self {
            InventoryCommand::RegisterItem(c) => c.item_id,
            InventoryCommand::SellStock(c) => c.item_id,
            InventoryCommand::AdjustStock(c) => c.item_id,
            InventoryCommand::UpdateTerms(c) => c.item_id,
            InventoryCommand::RecomputePrices(c) => c.item_id,
            InventoryCommand::UpdateDetails(c) => c.item_id,
            InventoryCommand::MergeRestock(c) => c.item_id,
        }
    }
}

// ---- Events ----

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ItemRegistered {
    pub item_id: ItemId,
    pub name: String,
    pub category: String,
    pub description: String,
    pub supplier: Option<String>,
    pub stock: i64,
    pub stock_minimum: i64,
    pub lot: String,
    pub expiry_date: Option<NaiveDate>,
    pub terms: PricingTerms,
    pub pricing: PriceBreakdown,
    pub occurred_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StockSold {
    pub item_id: ItemId,
    pub sale: SaleRecord,
    pub stock_after: i64,
    pub occurred_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StockAdjusted {
    pub item_id: ItemId,
    pub delta: i64,
    pub reason: String,
    pub stock_after: i64,
    pub occurred_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PricesRecomputed {
    pub item_id: ItemId,
    pub terms: PricingTerms,
    pub pricing: PriceBreakdown,
    pub occurred_at: DateTime<Utc>,
}

/// Event: DetailsUpdated. Carries the full resulting metadata.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DetailsUpdated {
    pub item_id: ItemId,
    pub name: String,
    pub category: String,
    pub description: String,
    pub supplier: Option<String>,
    pub stock_minimum: i64,
    pub lot: String,
    pub expiry_date: Option<NaiveDate>,
    pub occurred_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RestockMerged {
    pub item_id: ItemId,
    pub stock_incoming: i64,
    pub new_stock: i64,
    pub blended_cost: Decimal,
    pub terms: PricingTerms,
    pub pricing: PriceBreakdown,
    pub lot: String,
    pub expiry_date: Option<NaiveDate>,
    pub occurred_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum InventoryEvent {
    ItemRegistered(ItemRegistered),
    StockSold(StockSold),
    StockAdjusted(StockAdjusted),
    PricesRecomputed(PricesRecomputed),
    DetailsUpdated(DetailsUpdated),
    RestockMerged(RestockMerged),
}

impl InventoryEvent {
    /// Pricing carried by this event, if it replaced the derived fields.
    pub fn pricing(&self) -> Option<&PriceBreakdown> {
        match self {
            InventoryEvent::ItemRegistered(e) => Some(&e.pricing),
            InventoryEvent::PricesRecomputed(e) => Some(&e.pricing),
            InventoryEvent::RestockMerged(e) => Some(&e.pricing),
            _ => None,
        }
    }
}

impl Event for InventoryEvent {
    fn event_type(&self) -> &'static str {
        match self {
            InventoryEvent::ItemRegistered(_) => "inventory.item.registered",
            InventoryEvent::StockSold(_) => "inventory.item.stock_sold",
            InventoryEvent::StockAdjusted(_) => "inventory.item.stock_adjusted",
            InventoryEvent::PricesRecomputed(_) => "inventory.item.prices_recomputed",
            InventoryEvent::DetailsUpdated(_) => "inventory.item.details_updated",
            InventoryEvent::RestockMerged(_) => "inventory.item.restock_merged",
        }
    }

    fn version(&self) -> u32 {
        1
    }

    fn occurred_at(&self) -> DateTime<Utc> {
        match self {
            InventoryEvent::ItemRegistered(e) => e.occurred_at,
            InventoryEvent::StockSold(e) => e.occurred_at,
            InventoryEvent::StockAdjusted(e) => e.occurred_at,
            InventoryEvent::PricesRecomputed(e) => e.occurred_at,
            InventoryEvent::DetailsUpdated(e) => e.occurred_at,
            InventoryEvent::RestockMerged(e) => e.occurred_at,
        }
    }
}

impl Aggregate for InventoryItem {
    type Command = InventoryCommand;
    type Event = InventoryEvent;
    type Error = DomainError;

    fn apply(&mut self, event: &Self::Event) {
        match event {
            InventoryEvent::ItemRegistered(e) => {
                self.id = e.item_id;
                self.name = e.name.clone();
                self.category = e.category.clone();
                self.description = e.description.clone();
                self.supplier = e.supplier.clone();
                self.stock = e.stock;
                self.stock_minimum = e.stock_minimum;
                self.lot = e.lot.clone();
                self.expiry_date = e.expiry_date;
                self.terms = Some(e.terms.clone());
                self.pricing = Some(e.pricing.clone());
                self.created_at = Some(e.occurred_at);
                self.registered = true;
            }
            InventoryEvent::StockSold(e) => {
                self.stock = e.stock_after;
            }
            InventoryEvent::StockAdjusted(e) => {
                self.stock = e.stock_after;
            }
            InventoryEvent::PricesRecomputed(e) => {
                self.terms = Some(e.terms.clone());
                self.pricing = Some(e.pricing.clone());
            }
            InventoryEvent::DetailsUpdated(e) => {
                self.name = e.name.clone();
                self.category = e.category.clone();
                self.description = e.description.clone();
                self.supplier = e.supplier.clone();
                self.stock_minimum = e.stock_minimum;
                self.lot = e.lot.clone();
                self.expiry_date = e.expiry_date;
            }
            InventoryEvent::RestockMerged(e) => {
                self.stock = e.new_stock;
                self.terms = Some(e.terms.clone());
                self.pricing = Some(e.pricing.clone());
                self.lot = e.lot.clone();
                self.expiry_date = e.expiry_date;
            }
        }

        self.updated_at = Some(event.occurred_at());
        // Deterministic version tracking: +1 per applied event.
        self.version += 1;
    }

    fn handle(&self, command: &Self::Command) -> Result<Vec<Self::Event>, Self::Error> {
        match command {
            InventoryCommand::RegisterItem(cmd) => self.handle_register(cmd),
            InventoryCommand::SellStock(cmd) => self.handle_sell(cmd),
            InventoryCommand::AdjustStock(cmd) => self.handle_adjust(cmd),
            InventoryCommand::UpdateTerms(cmd) => self.handle_update_terms(cmd),
            InventoryCommand::RecomputePrices(cmd) => self.handle_recompute(cmd),
            InventoryCommand::UpdateDetails(cmd) => self.handle_update_details(cmd),
            InventoryCommand::MergeRestock(cmd) => self.handle_merge(cmd),
        }
    }
}

impl InventoryItem {
    fn ensure_registered(&self, item_id: ItemId) -> Result<&PricingTerms, DomainError> {
        if !self.registered {
            return Err(DomainError::not_found());
        }
        if self.id != item_id {
            return Err(DomainError::invariant("item_id mismatch"));
        }
        self.terms
            .as_ref()
            .ok_or_else(|| DomainError::invariant("registered item has no pricing terms"))
    }

    fn current_pricing(&self) -> Result<&PriceBreakdown, DomainError> {
        self.pricing
            .as_ref()
            .ok_or_else(|| DomainError::invariant("registered item has no pricing"))
    }

    fn handle_register(&self, cmd: &RegisterItem) -> Result<Vec<InventoryEvent>, DomainError> {
        if self.registered {
            return Err(DomainError::conflict("item already exists"));
        }
        if cmd.name.trim().is_empty() {
            return Err(DomainError::validation("name cannot be empty"));
        }
        if cmd.stock < 0 {
            return Err(DomainError::validation("stock cannot be negative"));
        }
        if cmd.stock_minimum < 0 {
            return Err(DomainError::validation("stock_minimum cannot be negative"));
        }

        let pricing = quote_with_plan(&cmd.terms)?;

        Ok(vec![InventoryEvent::ItemRegistered(ItemRegistered {
            item_id: cmd.item_id,
            name: cmd.name.trim().to_string(),
            category: cmd.category.clone(),
            description: cmd.description.clone(),
            supplier: cmd.supplier.clone(),
            stock: cmd.stock,
            stock_minimum: cmd.stock_minimum,
            lot: cmd.lot.clone(),
            expiry_date: cmd.expiry_date,
            terms: cmd.terms.clone(),
            pricing,
            occurred_at: cmd.occurred_at,
        })])
    }

    fn handle_sell(&self, cmd: &SellStock) -> Result<Vec<InventoryEvent>, DomainError> {
        let terms = self.ensure_registered(cmd.item_id)?;
        let pricing = self.current_pricing()?;

        if cmd.quantity <= 0 {
            return Err(DomainError::validation("quantity must be greater than zero"));
        }
        let unit_price = cmd.unit_price.unwrap_or(pricing.price_list);
        if unit_price < Decimal::ZERO {
            return Err(DomainError::validation("unit_price cannot be negative"));
        }
        let discount = cmd.discount.unwrap_or(terms.discount_rate);
        if discount < Decimal::ZERO || discount > Decimal::ONE_HUNDRED {
            return Err(DomainError::validation("discount must be between 0 and 100"));
        }
        if cmd.quantity > self.stock {
            return Err(DomainError::insufficient_stock(self.stock, cmd.quantity));
        }

        let sale = SaleRecord {
            sale_id: cmd.sale_id,
            item_id: cmd.item_id,
            item_name: self.name.clone(),
            quantity: cmd.quantity,
            unit_price,
            discount_applied: discount,
            unit_cost_at_sale: pricing.unit_cost_effective,
            timestamp: cmd.occurred_at,
        };
        if !sale.amounts_fit() {
            return Err(DomainError::validation(
                "sale amount is too large to record",
            ));
        }

        Ok(vec![InventoryEvent::StockSold(StockSold {
            item_id: cmd.item_id,
            sale,
            stock_after: self.stock - cmd.quantity,
            occurred_at: cmd.occurred_at,
        })])
    }

    fn handle_adjust(&self, cmd: &AdjustStock) -> Result<Vec<InventoryEvent>, DomainError> {
        self.ensure_registered(cmd.item_id)?;

        if cmd.delta == 0 {
            return Err(DomainError::validation("delta cannot be zero"));
        }
        if cmd.reason.trim().is_empty() {
            return Err(DomainError::validation("reason cannot be empty"));
        }

        let new_stock = self
            .stock
            .checked_add(cmd.delta)
            .ok_or_else(|| DomainError::validation("delta out of range"))?;
        if new_stock < 0 {
            return Err(DomainError::invariant("stock cannot go negative"));
        }

        Ok(vec![InventoryEvent::StockAdjusted(StockAdjusted {
            item_id: cmd.item_id,
            delta: cmd.delta,
            reason: cmd.reason.trim().to_string(),
            stock_after: new_stock,
            occurred_at: cmd.occurred_at,
        })])
    }

    fn handle_update_terms(&self, cmd: &UpdateTerms) -> Result<Vec<InventoryEvent>, DomainError> {
        self.ensure_registered(cmd.item_id)?;
        let pricing = quote_with_plan(&cmd.terms)?;

        Ok(vec![InventoryEvent::PricesRecomputed(PricesRecomputed {
            item_id: cmd.item_id,
            terms: cmd.terms.clone(),
            pricing,
            occurred_at: cmd.occurred_at,
        })])
    }

    fn handle_recompute(&self, cmd: &RecomputePrices) -> Result<Vec<InventoryEvent>, DomainError> {
        let terms = self.ensure_registered(cmd.item_id)?;
        let pricing = quote_with_plan(terms)?;

        Ok(vec![InventoryEvent::PricesRecomputed(PricesRecomputed {
            item_id: cmd.item_id,
            terms: terms.clone(),
            pricing,
            occurred_at: cmd.occurred_at,
        })])
    }

    fn handle_update_details(
        &self,
        cmd: &UpdateDetails,
    ) -> Result<Vec<InventoryEvent>, DomainError> {
        self.ensure_registered(cmd.item_id)?;

        let name = match &cmd.name {
            Some(n) if n.trim().is_empty() => {
                return Err(DomainError::validation("name cannot be empty"));
            }
            Some(n) => n.trim().to_string(),
            None => self.name.clone(),
        };
        let stock_minimum = cmd.stock_minimum.unwrap_or(self.stock_minimum);
        if stock_minimum < 0 {
            return Err(DomainError::validation("stock_minimum cannot be negative"));
        }

        Ok(vec![InventoryEvent::DetailsUpdated(DetailsUpdated {
            item_id: cmd.item_id,
            name,
            category: cmd.category.clone().unwrap_or_else(|| self.category.clone()),
            description: cmd
                .description
                .clone()
                .unwrap_or_else(|| self.description.clone()),
            supplier: cmd.supplier.clone().unwrap_or_else(|| self.supplier.clone()),
            stock_minimum,
            lot: cmd.lot.clone().unwrap_or_else(|| self.lot.clone()),
            expiry_date: cmd.expiry_date.unwrap_or(self.expiry_date),
            occurred_at: cmd.occurred_at,
        })])
    }

    fn handle_merge(&self, cmd: &MergeRestock) -> Result<Vec<InventoryEvent>, DomainError> {
        let terms = self.ensure_registered(cmd.item_id)?;

        if cmd.stock_incoming <= 0 {
            return Err(DomainError::validation(
                "stock_incoming must be greater than zero",
            ));
        }
        if cmd.cost_unit_incoming <= Decimal::ZERO {
            return Err(DomainError::validation(
                "cost_unit_incoming must be greater than zero",
            ));
        }

        let new_stock = self
            .stock
            .checked_add(cmd.stock_incoming)
            .ok_or_else(|| DomainError::validation("stock_incoming out of range"))?;
        let blended_cost = blend_cost(
            self.stock,
            terms.cost_base,
            cmd.stock_incoming,
            cmd.cost_unit_incoming,
        )?;

        let new_terms = PricingTerms {
            cost_base: blended_cost,
            tax_rate: cmd.tax_rate,
            scale: cmd.scale.clone(),
            discount_rate: cmd.discount_rate,
        };
        let pricing = quote_with_plan(&new_terms)?;

        Ok(vec![InventoryEvent::RestockMerged(RestockMerged {
            item_id: cmd.item_id,
            stock_incoming: cmd.stock_incoming,
            new_stock,
            blended_cost,
            terms: new_terms,
            pricing,
            lot: cmd.lot.clone(),
            expiry_date: cmd.expiry_date,
            occurred_at: cmd.occurred_at,
        })])
    }
}
