use std::sync::Arc;

use crate::config::Config;
use fanshop_facebook::TokenValidator;
use fanshop_persist::Persistence;
use fanshop_reports::Calendar;

/// Shared application state passed to all handlers
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub persist: Arc<dyn Persistence>,
    pub tokens: Arc<dyn TokenValidator>,
    /// Day boundaries for reports, from `reporting.utc_offset_hours`
    pub calendar: Calendar,
}

impl AppState {
    pub fn new(config: Config, persist: Arc<dyn Persistence>, tokens: Arc<dyn TokenValidator>) -> Self {
        let calendar = Calendar::from_utc_offset_hours(config.reporting.utc_offset_hours)
            .unwrap_or_else(|| {
                tracing::warn!(
                    offset = config.reporting.utc_offset_hours,
                    "Invalid reporting UTC offset, using the default"
                );
                Calendar::default()
            });

        Self {
            config: Arc::new(config),
            persist,
            tokens,
            calendar,
        }
    }
}
