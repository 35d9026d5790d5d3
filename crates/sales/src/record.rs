use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use botica_core::{ItemId, SaleId};

/// Append-only record of a single sale.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SaleRecord {
    pub sale_id: SaleId,
    pub item_id: ItemId,
    /// Item name at the time of sale, kept for reports.
    #[serde(default)]
    pub item_name: String,
    pub quantity: i64,
    pub unit_price: Decimal,
    /// Discount percentage applied to `unit_price`.
    pub discount_applied: Decimal,
    pub unit_cost_at_sale: Decimal,
    pub timestamp: DateTime<Utc>,
}

impl SaleRecord {
    /// Price actually charged per unit after the discount.
    ///
    /// Every amount helper returns `None` when the figure does not fit in a
    /// `Decimal`.
    pub fn unit_price_net(&self) -> Option<Decimal> {
        let kept = Decimal::ONE
            .checked_sub(self.discount_applied.checked_div(Decimal::ONE_HUNDRED)?)?;
        self.unit_price.checked_mul(kept)
    }

    pub fn revenue(&self) -> Option<Decimal> {
        self.unit_price_net()?
            .checked_mul(Decimal::from(self.quantity))
    }

    pub fn cost(&self) -> Option<Decimal> {
        self.unit_cost_at_sale
            .checked_mul(Decimal::from(self.quantity))
    }

    /// Realized profit: `(net unit price - unit cost) * quantity`.
    pub fn profit(&self) -> Option<Decimal> {
        self.unit_price_net()?
            .checked_sub(self.unit_cost_at_sale)?
            .checked_mul(Decimal::from(self.quantity))
    }

    /// Revenue, cost and profit are all representable.
    pub fn amounts_fit(&self) -> bool {
        self.revenue().is_some() && self.cost().is_some() && self.profit().is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(quantity: i64, unit_price: i64, discount: i64, cost: i64) -> SaleRecord {
        SaleRecord {
            sale_id: SaleId::new(),
            item_id: ItemId::new(),
            item_name: "Paracetamol 500mg".to_string(),
            quantity,
            unit_price: Decimal::from(unit_price),
            discount_applied: Decimal::from(discount),
            unit_cost_at_sale: Decimal::from(cost),
            timestamp: Utc::now(),
        }
    }

    #[test]
    fn profit_uses_discounted_price() {
        let r = record(3, 200, 10, 120);
        assert_eq!(r.unit_price_net(), Some(Decimal::from(180)));
        assert_eq!(r.revenue(), Some(Decimal::from(540)));
        assert_eq!(r.cost(), Some(Decimal::from(360)));
        assert_eq!(r.profit(), Some(Decimal::from(180)));
        assert!(r.amounts_fit());
    }

    #[test]
    fn selling_below_cost_yields_negative_profit() {
        let r = record(2, 100, 50, 80);
        assert_eq!(r.profit(), Some(Decimal::from(-60)));
    }

    #[test]
    fn oversized_amounts_are_reported_not_panicked() {
        let mut r = record(2, 0, 0, 1);
        r.unit_price = Decimal::MAX;
        assert_eq!(r.unit_price_net(), Some(Decimal::MAX));
        assert_eq!(r.revenue(), None);
        assert_eq!(r.profit(), None);
        assert!(!r.amounts_fit());
    }
}
