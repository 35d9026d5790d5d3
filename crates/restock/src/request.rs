use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use botica_core::{DomainError, DomainResult};
use botica_pricing::{PriceBreakdown, PricingTerms, ScalePlan, ScaleTable, quote_with_plan};

/// An incoming stock batch as described by the person receiving it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RestockRequest {
    pub candidate_name: String,
    #[serde(default)]
    pub category: String,
    #[serde(default)]
    pub lot: String,
    #[serde(default)]
    pub expiry_date: Option<NaiveDate>,
    pub stock_incoming: i64,
    pub cost_unit_incoming: Decimal,
    #[serde(default)]
    pub tax_rate: Decimal,
    pub scale_code: String,
    #[serde(default)]
    pub discount_rate: Decimal,
    /// Only used when the batch becomes a new item.
    #[serde(default)]
    pub stock_minimum: Option<i64>,
    #[serde(default)]
    pub supplier: Option<String>,
}

impl RestockRequest {
    /// Check the request and resolve its scale.
    ///
    /// A request is valid only if it could be priced as a new item on its own.
    pub fn validate(self, scales: &ScaleTable) -> DomainResult<ValidRestock> {
        if self.candidate_name.trim().is_empty() {
            return Err(DomainError::validation("candidate_name cannot be empty"));
        }
        if self.stock_incoming <= 0 {
            return Err(DomainError::validation(
                "stock_incoming must be greater than zero",
            ));
        }
        if self.stock_minimum.is_some_and(|m| m < 0) {
            return Err(DomainError::validation("stock_minimum cannot be negative"));
        }

        let scale = scales.resolve(&self.scale_code)?;
        let terms = PricingTerms {
            cost_base: self.cost_unit_incoming,
            tax_rate: self.tax_rate,
            scale,
            discount_rate: self.discount_rate,
        };
        let pricing = quote_with_plan(&terms).map_err(|e| match e {
            botica_pricing::PricingError::Validation { field: "cost_base", reason } => {
                DomainError::validation(format!("cost_unit_incoming: {reason}"))
            }
            other => other.into(),
        })?;

        Ok(ValidRestock {
            request: self,
            terms,
            pricing,
        })
    }
}

/// A [`RestockRequest`] that passed validation, with its terms resolved.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidRestock {
    request: RestockRequest,
    terms: PricingTerms,
    pricing: PriceBreakdown,
}

impl ValidRestock {
    pub fn request(&self) -> &RestockRequest {
        &self.request
    }

    pub fn scale(&self) -> &ScalePlan {
        &self.terms.scale
    }

    /// Terms the batch would have as a stand-alone item.
    pub fn terms(&self) -> &PricingTerms {
        &self.terms
    }

    /// Prices the batch would have as a stand-alone item.
    pub fn pricing(&self) -> &PriceBreakdown {
        &self.pricing
    }

    pub fn name(&self) -> &str {
        self.request.candidate_name.trim()
    }
}
