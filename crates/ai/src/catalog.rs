use serde::{Deserialize, Serialize};

use botica_core::ItemId;

/// Minimal view of an inventory item for name matching.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CatalogEntry {
    pub item_id: ItemId,
    pub name: String,
}

/// Read access to the current catalog.
///
/// Implemented by the infra catalog projection; kept here so this crate does
/// not depend on storage.
pub trait CatalogSource: Send + Sync + 'static {
    fn entries(&self) -> Vec<CatalogEntry>;
}

impl CatalogSource for Vec<CatalogEntry> {
    fn entries(&self) -> Vec<CatalogEntry> {
        self.clone()
    }
}
