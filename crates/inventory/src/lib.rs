//! Inventory domain module (event-sourced).
//!
//! Business rules for a pharmacy inventory item, implemented purely as
//! deterministic domain logic (no IO, no HTTP, no storage). Every stock or
//! price mutation is a command handled against the current state; derived
//! prices travel inside the resulting event so they are never stale relative
//! to the terms that produced them.

pub mod item;

pub use item::{
    AdjustStock, DEFAULT_STOCK_MINIMUM, DetailsUpdated, InventoryCommand, InventoryEvent,
    InventoryItem, ItemRegistered, MergeRestock, PricesRecomputed, RecomputePrices, RegisterItem,
    RestockMerged, SellStock, StockAdjusted, StockSold, UpdateDetails, UpdateTerms,
};
