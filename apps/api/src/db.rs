use anyhow::{Context, Result};
use sqlx::postgres::PgPoolOptions;
use sqlx::PgPool;
use tracing::{info, warn};

use crate::retry::{AbortSignal, Retry, RetryPolicy};

/// Creates and returns a PostgreSQL connection pool.
/// Serverless Postgres may be cold on boot, so the initial connect is retried.
pub async fn create_pool(
    database_url: &str,
    policy: &RetryPolicy,
    shutdown: &AbortSignal,
) -> Result<PgPool> {
    info!("Connecting to PostgreSQL...");

    let outcome = Retry::new(policy)
        .abort_on(shutdown)
        .on_retry(|error, attempt, delay| {
            warn!(
                "PostgreSQL connect attempt {attempt} failed: {error}; retrying in {}ms",
                delay.as_millis()
            );
        })
        .run(move || PgPoolOptions::new().max_connections(10).connect(database_url))
        .await
        .context("Could not connect to PostgreSQL")?;

    info!(
        "PostgreSQL connection pool established after {} attempt(s)",
        outcome.attempts
    );
    Ok(outcome.into_inner())
}
