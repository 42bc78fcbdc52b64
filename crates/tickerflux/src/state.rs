use std::sync::Arc;

use tickerflux_core::bucket::BucketStore;
use tickerflux_core::config::Settings;
use tickerflux_core::provider::ReportProvider;

/// Shared by every request; jobs never mutate it.
#[derive(Clone)]
pub struct AppState {
    pub settings: Arc<Settings>,
    pub provider: Arc<dyn ReportProvider>,
    pub store: Arc<dyn BucketStore>,
}

impl AppState {
    pub fn new(
        settings: Settings,
        provider: Arc<dyn ReportProvider>,
        store: Arc<dyn BucketStore>,
    ) -> Self {
        Self {
            settings: Arc::new(settings),
            provider,
            store,
        }
    }
}
