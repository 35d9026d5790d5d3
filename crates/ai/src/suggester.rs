use async_trait::async_trait;

use crate::result::{AiError, MatchCandidate};

/// "Is this incoming product one we already stock?"
///
/// Implementations may call out to a model or a remote service. They must not
/// mutate inventory; the caller owns the decision and the timeout.
#[async_trait]
pub trait MatchSuggester: Send + Sync + 'static {
    async fn suggest(&self, candidate_name: &str) -> Result<MatchCandidate, AiError>;
}
