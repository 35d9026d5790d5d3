//! Day and month aggregates over sale records.

use std::collections::{HashMap, HashSet};

use chrono::{Datelike, NaiveDate};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use botica_core::{DomainError, DomainResult, ItemId};

use crate::record::SaleRecord;

/// Number of entries in [`MonthlyReport::least_sold`].
pub const LEAST_SOLD_LIMIT: usize = 5;

#[derive(Debug, Clone, Default)]
struct Totals {
    sale_count: u64,
    units_sold: i64,
    total_revenue: Decimal,
    total_cost: Decimal,
}

impl Totals {
    fn add(&mut self, record: &SaleRecord) -> DomainResult<()> {
        let overflow = || DomainError::invariant(format!("amounts of sale {} overflow", record.sale_id));

        let revenue = record.revenue().ok_or_else(overflow)?;
        let cost = record.cost().ok_or_else(overflow)?;

        self.total_revenue = self.total_revenue.checked_add(revenue).ok_or_else(overflow)?;
        self.total_cost = self.total_cost.checked_add(cost).ok_or_else(overflow)?;
        self.units_sold = self.units_sold.checked_add(record.quantity).ok_or_else(overflow)?;
        self.sale_count += 1;
        Ok(())
    }

    fn gross_profit(&self) -> DomainResult<Decimal> {
        self.total_revenue
            .checked_sub(self.total_cost)
            .ok_or_else(|| DomainError::invariant("gross profit overflows"))
    }
}

/// Totals for a single calendar day (UTC).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DailySummary {
    pub date: NaiveDate,
    pub sale_count: u64,
    pub units_sold: i64,
    pub total_revenue: Decimal,
    pub total_cost: Decimal,
    pub gross_profit: Decimal,
}

impl DailySummary {
    pub fn for_day(records: &[SaleRecord], date: NaiveDate) -> DomainResult<Self> {
        let mut totals = Totals::default();
        for record in records.iter().filter(|r| r.timestamp.date_naive() == date) {
            totals.add(record)?;
        }

        Ok(Self {
            date,
            sale_count: totals.sale_count,
            units_sold: totals.units_sold,
            total_revenue: totals.total_revenue,
            total_cost: totals.total_cost,
            gross_profit: totals.gross_profit()?,
        })
    }
}

/// A catalog item as it appears in reports.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ItemRef {
    pub item_id: ItemId,
    pub item_name: String,
}

/// Per-item line of a [`MonthlyReport`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ItemSales {
    pub item_id: ItemId,
    pub item_name: String,
    pub sale_count: u64,
    pub units_sold: i64,
    pub total_revenue: Decimal,
    pub gross_profit: Decimal,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MonthlyReport {
    pub year: i32,
    pub month: u32,
    pub sale_count: u64,
    pub units_sold: i64,
    pub total_revenue: Decimal,
    pub total_cost: Decimal,
    pub gross_profit: Decimal,
    /// Ordered by revenue, highest first; ties broken by item id.
    pub items: Vec<ItemSales>,
    /// Items that sold, fewest units first; at most [`LEAST_SOLD_LIMIT`].
    pub least_sold: Vec<ItemSales>,
    /// Catalog items with no sale in the month, by name.
    pub unsold: Vec<ItemRef>,
}

impl MonthlyReport {
    /// Aggregate the month's sales. `catalog` is the set of items that could
    /// have sold; those absent from the month end up in `unsold`.
    pub fn for_month(
        records: &[SaleRecord],
        catalog: &[ItemRef],
        year: i32,
        month: u32,
    ) -> DomainResult<Self> {
        if NaiveDate::from_ymd_opt(year, month, 1).is_none() {
            return Err(DomainError::validation(format!(
                "invalid month: {year}-{month:02}"
            )));
        }

        let mut totals = Totals::default();
        let mut per_item: HashMap<ItemId, (String, Totals)> = HashMap::new();

        let in_month = records.iter().filter(|r| {
            let d = r.timestamp.date_naive();
            d.year() == year && d.month() == month
        });
        for record in in_month {
            totals.add(record)?;
            let entry = per_item
                .entry(record.item_id)
                .or_insert_with(|| (record.item_name.clone(), Totals::default()));
            // Latest name wins if the item was renamed mid-month.
            if !record.item_name.is_empty() {
                entry.0 = record.item_name.clone();
            }
            entry.1.add(record)?;
        }

        let sold: HashSet<ItemId> = per_item.keys().copied().collect();

        let mut items = per_item
            .into_iter()
            .map(|(item_id, (item_name, t))| {
                Ok(ItemSales {
                    item_id,
                    item_name,
                    sale_count: t.sale_count,
                    units_sold: t.units_sold,
                    total_revenue: t.total_revenue,
                    gross_profit: t.gross_profit()?,
                })
            })
            .collect::<DomainResult<Vec<_>>>()?;
        items.sort_by(|a, b| {
            b.total_revenue
                .cmp(&a.total_revenue)
                .then_with(|| a.item_id.cmp(&b.item_id))
        });

        let mut least_sold = items.clone();
        least_sold.sort_by(|a, b| {
            a.units_sold
                .cmp(&b.units_sold)
                .then_with(|| a.item_id.cmp(&b.item_id))
        });
        least_sold.truncate(LEAST_SOLD_LIMIT);

        let mut unsold: Vec<ItemRef> = catalog
            .iter()
            .filter(|i| !sold.contains(&i.item_id))
            .cloned()
            .collect();
        unsold.sort_by(|a, b| {
            a.item_name
                .cmp(&b.item_name)
                .then_with(|| a.item_id.cmp(&b.item_id))
        });
        unsold.dedup_by_key(|i| i.item_id);

        Ok(Self {
            year,
            month,
            sale_count: totals.sale_count,
            units_sold: totals.units_sold,
            total_revenue: totals.total_revenue,
            total_cost: totals.total_cost,
            gross_profit: totals.gross_profit()?,
            items,
            least_sold,
            unsold,
        })
    }
}
