use crate::config::AppConfig;
use crate::provider::MarketDataProvider;
use crate::shape::search::SearchCache;
use std::sync::{Arc, Mutex};

/// Shared request-handler state. The provider is the only IO collaborator;
/// the search memo is the only mutable piece and sits behind its own lock.
pub struct AppState {
    pub config: AppConfig,
    pub provider: Arc<dyn MarketDataProvider>,
    pub search_cache: Mutex<SearchCache>,
}

impl AppState {
    pub fn new(config: AppConfig, provider: Arc<dyn MarketDataProvider>) -> Arc<Self> {
        let cache = SearchCache::new(config.search_cache_capacity);
        Arc::new(Self {
            config,
            provider,
            search_cache: Mutex::new(cache),
        })
    }
}
