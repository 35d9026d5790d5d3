use std::sync::Arc;

use botica_ai::{MatchSuggester, NameSimilaritySuggester};
use botica_infra::event_store::InMemoryEventStore;
use botica_infra::ledger::{StockLedger, catalog_source};
use botica_infra::restock::RestockService;

use crate::config::{Config, ConfigError};

/// Everything the handlers need, shared behind one `Arc`.
pub struct AppServices {
    ledger: Arc<StockLedger<InMemoryEventStore>>,
    restock: RestockService<InMemoryEventStore>,
}

impl AppServices {
    /// Wire the in-memory ledger with the name-similarity matcher reading
    /// the ledger's own catalog.
    pub fn from_config(config: &Config) -> Result<Self, ConfigError> {
        config.validate()?;

        let ledger = Arc::new(
            StockLedger::in_memory(config.scale_table()?)
                .with_max_conflict_retries(config.ledger.max_conflict_retries),
        );
        let suggester: Arc<dyn MatchSuggester> =
            Arc::new(NameSimilaritySuggester::new(catalog_source(&ledger)));

        Ok(Self::new(ledger, suggester, config))
    }

    /// Wire with a caller-provided matcher.
    pub fn new(
        ledger: Arc<StockLedger<InMemoryEventStore>>,
        suggester: Arc<dyn MatchSuggester>,
        config: &Config,
    ) -> Self {
        let restock = RestockService::new(ledger.clone(), suggester)
            .with_threshold(config.restock.match_threshold)
            .with_timeout(config.suggester_timeout());
        Self { ledger, restock }
    }

    pub fn ledger(&self) -> &StockLedger<InMemoryEventStore> {
        &self.ledger
    }

    pub fn restock(&self) -> &RestockService<InMemoryEventStore> {
        &self.restock
    }
}
