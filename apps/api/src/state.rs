use std::sync::Arc;

use crate::config::Config;
use crate::llm_client::LlmClient;
use crate::premium::PurchaseLookup;
use crate::retry::{AbortSignal, RetryPolicy};

/// Shared application state injected into all route handlers via Axum extractors.
#[derive(Clone)]
pub struct AppState {
    pub llm: LlmClient,
    pub config: Config,
    /// Pluggable purchase lookup. Default: PgPurchaseLookup.
    pub purchases: Arc<dyn PurchaseLookup>,
    /// Policy for every outbound call, built once from config.
    pub retry: RetryPolicy,
    /// Cancelled on shutdown; the abort signal for every request-scoped retry.
    pub shutdown: AbortSignal,
}

impl AppState {
    pub fn new(llm: LlmClient, config: Config, purchases: Arc<dyn PurchaseLookup>) -> Self {
        let retry = config.retry_policy();
        Self {
            llm,
            config,
            purchases,
            retry,
            shutdown: AbortSignal::new(),
        }
    }
}
