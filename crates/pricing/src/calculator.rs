//! Cost-to-price derivation.
//!
//! Margin is measured on the selling price: a 25% margin means a quarter of the
//! list price is profit, so `price_list = unit_cost_effective / (1 - 0.25)`.
//! Discounts are applied after the list price is fixed and may erode the
//! realized margin; that outcome is reported in the breakdown, never corrected.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::error::PricingError;
use crate::scale::{ScalePlan, ScaleTable};

/// Minimum margin over landed cost, applied to the list price.
pub const TARGET_MARGIN: Decimal = Decimal::from_parts(25, 0, 0, false, 2);

/// Tolerance for the margin comparison (1e-6).
pub const MARGIN_EPSILON: Decimal = Decimal::from_parts(1, 0, 0, false, 6);

/// Raw quoting request, scale given by code.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuoteInput {
    pub cost_base: Decimal,
    #[serde(default)]
    pub tax_rate: Decimal,
    pub scale_code: String,
    #[serde(default)]
    pub discount_rate: Decimal,
}

/// Purchase and resale terms with the scale already resolved.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PricingTerms {
    /// Cost per paid unit before tax.
    pub cost_base: Decimal,
    /// Tax percentage charged on the cost (>= 0).
    pub tax_rate: Decimal,
    pub scale: ScalePlan,
    /// Resale discount percentage in `[0, 100)`.
    pub discount_rate: Decimal,
}

/// Every figure derived from a set of [`PricingTerms`], computed together.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PriceBreakdown {
    pub scale_code: String,
    pub total_units: u32,
    pub cost_taxed: Decimal,
    pub unit_cost_effective: Decimal,
    pub price_list: Decimal,
    pub price_public: Decimal,
    pub unit_profit: Decimal,
    pub margin_actual: Decimal,
    pub margin_guaranteed: bool,
    /// Present only when the discount pushed the margin below the target.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub verification: Option<String>,
}

/// Resolve `input.scale_code` against `scales`, then price.
pub fn quote(scales: &ScaleTable, input: &QuoteInput) -> Result<PriceBreakdown, PricingError> {
    let scale = scales.resolve(&input.scale_code)?;
    quote_with_plan(&PricingTerms {
        cost_base: input.cost_base,
        tax_rate: input.tax_rate,
        scale,
        discount_rate: input.discount_rate,
    })
}

/// Price a set of terms whose scale is already resolved.
pub fn quote_with_plan(terms: &PricingTerms) -> Result<PriceBreakdown, PricingError> {
    validate_terms(terms)?;

    let hundred = Decimal::ONE_HUNDRED;
    let paid = Decimal::from(terms.scale.paid_units);
    let total_units = terms.scale.total_units();
    let total = Decimal::from(total_units);

    let cost_taxed = Decimal::ONE
        .checked_add(terms.tax_rate / hundred)
        .and_then(|factor| terms.cost_base.checked_mul(factor))
        .ok_or_else(|| overflow("cost_base"))?;

    // Pay for `paid` units, spread the payment over everything received.
    let unit_cost_effective = cost_taxed
        .checked_mul(paid)
        .and_then(|paid_total| paid_total.checked_div(total))
        .ok_or_else(|| overflow("cost_base"))?;

    let price_list = unit_cost_effective
        .checked_div(Decimal::ONE - TARGET_MARGIN)
        .ok_or_else(|| overflow("cost_base"))?;

    let price_public = price_list * (Decimal::ONE - terms.discount_rate / hundred);
    if price_public <= Decimal::ZERO {
        return Err(PricingError::validation(
            "discount_rate",
            "public price must be greater than zero",
        ));
    }

    let unit_profit = price_public - unit_cost_effective;
    let margin_actual = unit_profit / price_public;
    let margin_guaranteed = margin_actual >= TARGET_MARGIN - MARGIN_EPSILON;

    let verification = (!margin_guaranteed).then(|| {
        format!(
            "el descuento de {}% reduce el margen a {}%, por debajo del {}% garantizado",
            terms.discount_rate.normalize(),
            (margin_actual * hundred).round_dp(2).normalize(),
            (TARGET_MARGIN * hundred).normalize(),
        )
    });

    Ok(PriceBreakdown {
        scale_code: terms.scale.code.clone(),
        total_units,
        cost_taxed,
        unit_cost_effective,
        price_list,
        price_public,
        unit_profit,
        margin_actual,
        margin_guaranteed,
        verification,
    })
}

/// Stock-weighted average cost of two batches.
///
/// With no stock on hand the incoming cost is taken as is.
pub fn blend_cost(
    old_stock: i64,
    old_cost: Decimal,
    incoming_stock: i64,
    incoming_cost: Decimal,
) -> Result<Decimal, PricingError> {
    if old_stock < 0 {
        return Err(PricingError::validation("stock", "must not be negative"));
    }
    if incoming_stock <= 0 {
        return Err(PricingError::validation(
            "stock_incoming",
            "must be greater than zero",
        ));
    }
    if old_stock == 0 {
        return Ok(incoming_cost);
    }

    let old_qty = Decimal::from(old_stock);
    let new_qty = Decimal::from(incoming_stock);
    let value = old_qty
        .checked_mul(old_cost)
        .zip(new_qty.checked_mul(incoming_cost))
        .and_then(|(a, b)| a.checked_add(b))
        .ok_or_else(|| overflow("cost_unit_incoming"))?;

    value
        .checked_div(old_qty + new_qty)
        .ok_or_else(|| overflow("cost_unit_incoming"))
}

fn validate_terms(terms: &PricingTerms) -> Result<(), PricingError> {
    if terms.cost_base <= Decimal::ZERO {
        return Err(PricingError::validation(
            "cost_base",
            "must be greater than zero",
        ));
    }
    if terms.tax_rate < Decimal::ZERO {
        return Err(PricingError::validation("tax_rate", "must not be negative"));
    }
    if terms.discount_rate < Decimal::ZERO || terms.discount_rate > Decimal::ONE_HUNDRED {
        return Err(PricingError::validation(
            "discount_rate",
            "must be between 0 and 100",
        ));
    }
    if terms.discount_rate == Decimal::ONE_HUNDRED {
        return Err(PricingError::validation(
            "discount_rate",
            "a 100% discount leaves no public price",
        ));
    }
    if terms.scale.paid_units == 0 {
        return Err(PricingError::InvalidScale {
            code: terms.scale.code.clone(),
            reason: "paid units must be at least 1".to_string(),
        });
    }
    Ok(())
}

fn overflow(field: &'static str) -> PricingError {
    PricingError::validation(field, "value too large to price")
}
