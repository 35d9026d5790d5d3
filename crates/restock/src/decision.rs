use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use botica_core::{DomainError, DomainResult, ItemId};
use botica_pricing::{PriceBreakdown, PricingTerms, blend_cost, quote_with_plan};

use crate::request::ValidRestock;

/// Confidence at or above which a suggestion is trusted.
pub const DEFAULT_MATCH_THRESHOLD: f64 = 0.75;

/// Output of the name matcher: the best candidate, if any, and how sure it is.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MatchSuggestion {
    pub item_id: Option<ItemId>,
    pub confidence: f64,
}

impl MatchSuggestion {
    /// "No match", used whenever the matcher cannot be consulted.
    pub fn none() -> Self {
        Self {
            item_id: None,
            confidence: 0.0,
        }
    }

    pub fn candidate(item_id: ItemId, confidence: f64) -> Self {
        Self {
            item_id: Some(item_id),
            confidence,
        }
    }

    /// Confidence clamped to `[0, 1]`; NaN counts as zero.
    pub fn normalized_confidence(&self) -> f64 {
        if self.confidence.is_nan() {
            0.0
        } else {
            self.confidence.clamp(0.0, 1.0)
        }
    }
}

/// State of the suggested item that the merge preview is computed from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExistingItem {
    pub item_id: ItemId,
    pub name: String,
    pub stock: i64,
    pub cost_base: Decimal,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CreateReason {
    NoCandidate,
    UnknownCandidate,
    LowConfidence,
}

/// What a merge would do to the existing item, computed from its state when
/// the decision was taken. The ledger recomputes it at commit time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MergePreview {
    pub existing_name: String,
    pub old_stock: i64,
    pub new_stock: i64,
    pub old_cost: Decimal,
    pub blended_cost: Decimal,
    pub terms: PricingTerms,
    pub pricing: PriceBreakdown,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "decision", rename_all = "snake_case")]
pub enum RestockDecision {
    CreateNew {
        confidence: f64,
        reason: CreateReason,
        pricing: PriceBreakdown,
    },
    MergeInto {
        item_id: ItemId,
        confidence: f64,
        preview: MergePreview,
    },
}

impl RestockDecision {
    pub fn confidence(&self) -> f64 {
        match self {
            RestockDecision::CreateNew { confidence, .. } => *confidence,
            RestockDecision::MergeInto { confidence, .. } => *confidence,
        }
    }

    pub fn is_merge(&self) -> bool {
        matches!(self, RestockDecision::MergeInto { .. })
    }

    /// Short explanation for the person receiving the batch.
    pub fn message(&self) -> String {
        match self {
            RestockDecision::CreateNew { reason, confidence, .. } => match reason {
                CreateReason::NoCandidate => {
                    "No se encontró un producto similar; se registrará como nuevo".to_string()
                }
                CreateReason::UnknownCandidate => {
                    "El producto sugerido no existe en el inventario; se registrará como nuevo"
                        .to_string()
                }
                CreateReason::LowConfidence => format!(
                    "Coincidencia insuficiente ({:.0}%); se registrará como nuevo",
                    confidence * 100.0
                ),
            },
            RestockDecision::MergeInto { preview, confidence, .. } => format!(
                "Reabastecimiento de {} ({:.0}%): stock {} -> {}",
                preview.existing_name,
                confidence * 100.0,
                preview.old_stock,
                preview.new_stock
            ),
        }
    }
}

/// Decide between creating a new item and merging into the suggested one.
///
/// `existing` is the current state of the suggested item, or `None` if it is
/// not in the inventory. Only the blend arithmetic can fail here; the request
/// itself was validated when `restock` was built.
pub fn reconcile(
    restock: &ValidRestock,
    suggestion: &MatchSuggestion,
    threshold: f64,
    existing: Option<&ExistingItem>,
) -> DomainResult<RestockDecision> {
    let confidence = suggestion.normalized_confidence();
    let create = |reason| RestockDecision::CreateNew {
        confidence,
        reason,
        pricing: restock.pricing().clone(),
    };

    let Some(candidate) = suggestion.item_id else {
        return Ok(create(CreateReason::NoCandidate));
    };
    if confidence < threshold {
        return Ok(create(CreateReason::LowConfidence));
    }
    let Some(existing) = existing.filter(|e| e.item_id == candidate) else {
        return Ok(create(CreateReason::UnknownCandidate));
    };

    let request = restock.request();
    let new_stock = existing
        .stock
        .checked_add(request.stock_incoming)
        .ok_or_else(|| DomainError::validation("stock_incoming out of range"))?;
    let blended_cost = blend_cost(
        existing.stock,
        existing.cost_base,
        request.stock_incoming,
        request.cost_unit_incoming,
    )?;
    let terms = PricingTerms {
        cost_base: blended_cost,
        ..restock.terms().clone()
    };
    let pricing = quote_with_plan(&terms)?;

    Ok(RestockDecision::MergeInto {
        item_id: candidate,
        confidence,
        preview: MergePreview {
            existing_name: existing.name.clone(),
            old_stock: existing.stock,
            new_stock,
            old_cost: existing.cost_base,
            blended_cost,
            terms,
            pricing,
        },
    })
}
