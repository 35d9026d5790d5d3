//! `botica-ai`
//!
//! **Responsibility:** boundary for the product-name matcher used by restock
//! reconciliation.
//!
//! This crate is **not** part of the domain model:
//! - It must not depend on inventory aggregates or the ledger.
//! - It must not mutate domain state.
//! - It returns a **suggestion with a confidence**, never a decision.
//!
//! Callers must treat every [`MatchSuggester`] as unreliable: slow, failing or
//! simply wrong. The ledger bounds each call with a timeout.

pub mod catalog;
pub mod name_match;
pub mod result;
pub mod suggester;

pub use catalog::{CatalogEntry, CatalogSource};
pub use name_match::{NameSimilaritySuggester, normalize_name, similarity};
pub use result::{AiError, MatchCandidate};
pub use suggester::MatchSuggester;
