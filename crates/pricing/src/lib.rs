//! Pharmacy pricing rules (pure, deterministic).
//!
//! - [`scale`]: supplier bonus schemes ("pay 10, receive 13") and the startup-validated table.
//! - [`calculator`]: landed unit cost, list price at the guaranteed margin, public price after
//!   discount, and the margin verification.
//!
//! No IO, no shared state: every function here may run concurrently without coordination.

pub mod calculator;
pub mod error;
pub mod scale;

pub use calculator::{
    MARGIN_EPSILON, PriceBreakdown, PricingTerms, QuoteInput, TARGET_MARGIN, blend_cost, quote,
    quote_with_plan,
};
pub use error::PricingError;
pub use scale::{DEFAULT_SCALE_CODES, NO_SCALE_CODE, ScalePlan, ScaleTable};
