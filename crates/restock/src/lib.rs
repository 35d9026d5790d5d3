//! Restock reconciliation.
//!
//! Decides whether an incoming stock batch extends an existing inventory item
//! or becomes a new one. The decision is a pure function of the request, the
//! match suggestion and the candidate's current state; applying it is the
//! ledger's job.

pub mod decision;
pub mod request;

pub use decision::{
    CreateReason, DEFAULT_MATCH_THRESHOLD, ExistingItem, MatchSuggestion, MergePreview,
    RestockDecision, reconcile,
};
pub use request::{RestockRequest, ValidRestock};
