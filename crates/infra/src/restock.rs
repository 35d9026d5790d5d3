//! Restock reconciliation service.
//!
//! Validates an incoming batch, asks the name matcher for a candidate (bounded
//! by a timeout), decides between a new item and a merge, and applies the
//! decision through the ledger.

use std::sync::Arc;
use std::time::Duration;

use serde::Serialize;
use thiserror::Error;

use botica_ai::MatchSuggester;
use botica_core::DomainError;
use botica_restock::{
    DEFAULT_MATCH_THRESHOLD, MatchSuggestion, RestockDecision, RestockRequest, ValidRestock,
    reconcile,
};

use crate::event_store::EventStore;
use crate::ledger::{LedgerError, StockLedger};
use crate::projections::ItemView;

pub const DEFAULT_SUGGESTER_TIMEOUT: Duration = Duration::from_millis(500);

#[derive(Debug, Error)]
pub enum RestockError {
    /// The request itself is malformed; nothing was applied.
    #[error("invalid restock request: {0}")]
    Invalid(String),

    #[error(transparent)]
    Ledger(#[from] LedgerError),
}

impl From<DomainError> for RestockError {
    fn from(value: DomainError) -> Self {
        RestockError::Invalid(match value {
            DomainError::Validation(msg) | DomainError::InvalidId(msg) => msg,
            other => other.to_string(),
        })
    }
}

/// Decision taken for a batch, without applying it.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RestockPreview {
    pub decision: RestockDecision,
    pub message: String,
    /// The matcher timed out or failed and "no match" was assumed.
    pub degraded: bool,
}

/// Decision taken for a batch and the item it produced or updated.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RestockOutcome {
    pub decision: RestockDecision,
    pub item: ItemView,
    pub message: String,
    pub degraded: bool,
}

pub struct RestockService<S> {
    ledger: Arc<StockLedger<S>>,
    suggester: Arc<dyn MatchSuggester>,
    threshold: f64,
    timeout: Duration,
}

impl<S> RestockService<S>
where
    S: EventStore,
{
    pub fn new(ledger: Arc<StockLedger<S>>, suggester: Arc<dyn MatchSuggester>) -> Self {
        Self {
            ledger,
            suggester,
            threshold: DEFAULT_MATCH_THRESHOLD,
            timeout: DEFAULT_SUGGESTER_TIMEOUT,
        }
    }

    pub fn with_threshold(mut self, threshold: f64) -> Self {
        self.threshold = threshold;
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Decide what a batch would do, without touching the inventory.
    ///
    /// `supplied` overrides the matcher (e.g. a suggestion the caller already
    /// confirmed).
    pub async fn preview(
        &self,
        request: RestockRequest,
        supplied: Option<MatchSuggestion>,
    ) -> Result<RestockPreview, RestockError> {
        let (_, decision, degraded) = self.decide(request, supplied).await?;
        Ok(RestockPreview {
            message: decision.message(),
            decision,
            degraded,
        })
    }

    /// Decide and apply.
    pub async fn restock(
        &self,
        request: RestockRequest,
        supplied: Option<MatchSuggestion>,
    ) -> Result<RestockOutcome, RestockError> {
        let (valid, decision, degraded) = self.decide(request, supplied).await?;

        let applied = match &decision {
            RestockDecision::CreateNew { .. } => self.ledger.register_from_restock(&valid),
            RestockDecision::MergeInto { item_id, .. } => self.ledger.merge_restock(*item_id, &valid),
        };
        let item = applied.map_err(rejected_batch)?;

        tracing::debug!(
            item_id = %item.item_id,
            merged = decision.is_merge(),
            confidence = decision.confidence(),
            degraded,
            "restock applied"
        );

        Ok(RestockOutcome {
            message: decision.message(),
            decision,
            item,
            degraded,
        })
    }

    async fn decide(
        &self,
        request: RestockRequest,
        supplied: Option<MatchSuggestion>,
    ) -> Result<(ValidRestock, RestockDecision, bool), RestockError> {
        let valid = request.validate(self.ledger.scales())?;

        let (suggestion, degraded) = match supplied {
            Some(s) => (s, false),
            None => self.suggest(valid.name()).await,
        };

        let existing = suggestion
            .item_id
            .and_then(|item_id| self.ledger.existing(item_id));
        let decision = reconcile(&valid, &suggestion, self.threshold, existing.as_ref())?;
        Ok((valid, decision, degraded))
    }

    /// Consult the matcher; any failure degrades to "no match".
    async fn suggest(&self, name: &str) -> (MatchSuggestion, bool) {
        match tokio::time::timeout(self.timeout, self.suggester.suggest(name)).await {
            Ok(Ok(candidate)) => (
                MatchSuggestion {
                    item_id: candidate.item_id,
                    confidence: candidate.confidence,
                },
                false,
            ),
            Ok(Err(err)) => {
                tracing::warn!(candidate = name, error = %err, "match suggester failed; assuming no match");
                (MatchSuggestion::none(), true)
            }
            Err(_) => {
                tracing::warn!(
                    candidate = name,
                    timeout_ms = self.timeout.as_millis() as u64,
                    "match suggester timed out; assuming no match"
                );
                (MatchSuggestion::none(), true)
            }
        }
    }
}

/// The ledger refusing the batch's own figures (e.g. a merge that would
/// overflow the stock) is still an invalid batch.
fn rejected_batch(err: LedgerError) -> RestockError {
    match err {
        LedgerError::Validation(msg) => RestockError::Invalid(msg),
        other => RestockError::Ledger(other),
    }
}
