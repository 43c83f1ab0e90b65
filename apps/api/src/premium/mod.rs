//! Premium access: decides whether an email may use a template.
//!
//! Free templates never touch the database. Paid templates need a `paid`
//! row in `premium_purchases` for the email and either the template id or
//! the `*` wildcard. The lookup runs through `retry` so a cold serverless
//! Postgres does not turn into a "not purchased" answer.
//!
//! `AppState` holds an `Arc<dyn PurchaseLookup>`, so handlers never see sqlx.

pub mod handlers;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Serialize;
use sqlx::PgPool;
use tracing::{debug, info};

use crate::errors::AppError;
use crate::models::purchase::{PremiumPurchaseRow, ALL_TEMPLATES};
use crate::retry::{AbortSignal, Retry, RetryPolicy};
use crate::templates::catalog::Template;

// ────────────────────────────────────────────────────────────────────────────
// Lookup backends
// ────────────────────────────────────────────────────────────────────────────

/// Storage seam for purchase lookups.
#[async_trait]
pub trait PurchaseLookup: Send + Sync {
    /// The most recent paid purchase covering `template_id` for `email`, if any.
    async fn find_paid_purchase(
        &self,
        email: &str,
        template_id: &str,
    ) -> Result<Option<PremiumPurchaseRow>, sqlx::Error>;
}

pub struct PgPurchaseLookup {
    pool: PgPool,
}

impl PgPurchaseLookup {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl PurchaseLookup for PgPurchaseLookup {
    async fn find_paid_purchase(
        &self,
        email: &str,
        template_id: &str,
    ) -> Result<Option<PremiumPurchaseRow>, sqlx::Error> {
        sqlx::query_as::<_, PremiumPurchaseRow>(
            r#"
            SELECT id, email, template_id, status, created_at
            FROM premium_purchases
            WHERE lower(email) = $1
              AND (template_id = $2 OR template_id = $3)
              AND status = 'paid'
            ORDER BY created_at DESC
            LIMIT 1
            "#,
        )
        .bind(email)
        .bind(template_id)
        .bind(ALL_TEMPLATES)
        .fetch_optional(&self.pool)
        .await
    }
}

/// Connection-level failures are worth retrying; query errors are not.
pub fn is_transient_db_error(error: &sqlx::Error) -> bool {
    matches!(
        error,
        sqlx::Error::Io(_) | sqlx::Error::PoolTimedOut | sqlx::Error::Tls(_) | sqlx::Error::WorkerCrashed
    )
}

// ────────────────────────────────────────────────────────────────────────────
// Access decision
// ────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum AccessReason {
    FreeTemplate,
    Purchased,
    NotPurchased,
}

#[derive(Debug, Clone, Serialize)]
pub struct AccessDecision {
    pub template_id: &'static str,
    pub has_access: bool,
    pub reason: AccessReason,
    pub purchased_at: Option<DateTime<Utc>>,
}

/// Normalizes and sanity-checks an email address. Not an RFC 5322 parser.
pub fn normalize_email(raw: &str) -> Result<String, AppError> {
    let email = raw.trim().to_lowercase();
    let valid = match email.split_once('@') {
        Some((local, domain)) => {
            !local.is_empty()
                && domain.contains('.')
                && !domain.starts_with('.')
                && !domain.ends_with('.')
                && !domain.contains('@')
                && !email.contains(char::is_whitespace)
        }
        None => false,
    };

    if valid {
        Ok(email)
    } else {
        Err(AppError::Validation(format!("'{}' is not a valid email", raw.trim())))
    }
}

/// Decides access for an already-normalized email.
pub async fn check_access(
    lookup: &dyn PurchaseLookup,
    template: &'static Template,
    email: &str,
    policy: &RetryPolicy,
    abort: &AbortSignal,
) -> Result<AccessDecision, AppError> {
    if template.is_free() {
        return Ok(AccessDecision {
            template_id: template.id,
            has_access: true,
            reason: AccessReason::FreeTemplate,
            purchased_at: None,
        });
    }

    let outcome = Retry::new(policy)
        .abort_on(abort)
        .retry_if(is_transient_db_error)
        .on_retry(|error, attempt, delay| {
            debug!(
                "Premium lookup attempt {attempt} failed: {error}; next try in {}ms",
                delay.as_millis()
            );
        })
        .run(move || lookup.find_paid_purchase(email, template.id))
        .await?;

    let decision = match outcome.data {
        Some(purchase) => AccessDecision {
            template_id: template.id,
            has_access: true,
            reason: AccessReason::Purchased,
            purchased_at: Some(purchase.created_at),
        },
        None => AccessDecision {
            template_id: template.id,
            has_access: false,
            reason: AccessReason::NotPurchased,
            purchased_at: None,
        },
    };

    info!(
        template = template.id,
        has_access = decision.has_access,
        attempts = outcome.attempts,
        "Premium access checked"
    );
    Ok(decision)
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::templates::catalog;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::sync::Mutex;
    use std::time::Duration;
    use uuid::Uuid;

    /// In-memory lookup: fails the first `failures` calls, then answers from `paid`.
    pub(crate) struct FakeLookup {
        pub paid: Vec<(String, String)>,
        pub failures: AtomicU32,
        pub calls: AtomicU32,
        pub queries: Mutex<Vec<(String, String)>>,
    }

    impl FakeLookup {
        pub fn with_purchases(paid: &[(&str, &str)]) -> Self {
            Self {
                paid: paid
                    .iter()
                    .map(|(e, t)| (e.to_string(), t.to_string()))
                    .collect(),
                failures: AtomicU32::new(0),
                calls: AtomicU32::new(0),
                queries: Mutex::new(Vec::new()),
            }
        }

        pub fn failing_first(self, n: u32) -> Self {
            self.failures.store(n, Ordering::SeqCst);
            self
        }
    }

    #[async_trait]
    impl PurchaseLookup for FakeLookup {
        async fn find_paid_purchase(
            &self,
            email: &str,
            template_id: &str,
        ) -> Result<Option<PremiumPurchaseRow>, sqlx::Error> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.queries
                .lock()
                .unwrap()
                .push((email.to_string(), template_id.to_string()));

            if self
                .failures
                .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
                .is_ok()
            {
                return Err(sqlx::Error::PoolTimedOut);
            }

            let hit = self
                .paid
                .iter()
                .find(|(e, t)| e == email && (t == template_id || t == ALL_TEMPLATES));
            Ok(hit.map(|(e, t)| PremiumPurchaseRow {
                id: Uuid::new_v4(),
                email: e.clone(),
                template_id: t.clone(),
                status: "paid".to_string(),
                created_at: Utc::now(),
            }))
        }
    }

    fn fast_policy() -> RetryPolicy {
        RetryPolicy::new(3, Duration::from_millis(10), Duration::from_millis(10))
    }

    fn template(id: &str) -> &'static Template {
        catalog::find(id).unwrap()
    }

    #[tokio::test]
    async fn test_free_template_skips_lookup() {
        let lookup = FakeLookup::with_purchases(&[]);
        let decision = check_access(
            &lookup,
            template("classic"),
            "ana@example.com",
            &fast_policy(),
            &AbortSignal::new(),
        )
        .await
        .unwrap();

        assert!(decision.has_access);
        assert_eq!(decision.reason, AccessReason::FreeTemplate);
        assert_eq!(lookup.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_paid_template_with_purchase() {
        let lookup = FakeLookup::with_purchases(&[("ana@example.com", "executive")]);
        let decision = check_access(
            &lookup,
            template("executive"),
            "ana@example.com",
            &fast_policy(),
            &AbortSignal::new(),
        )
        .await
        .unwrap();

        assert!(decision.has_access);
        assert_eq!(decision.reason, AccessReason::Purchased);
        assert!(decision.purchased_at.is_some());
    }

    #[tokio::test]
    async fn test_wildcard_purchase_unlocks_everything() {
        let lookup = FakeLookup::with_purchases(&[("ana@example.com", ALL_TEMPLATES)]);
        let decision = check_access(
            &lookup,
            template("creative"),
            "ana@example.com",
            &fast_policy(),
            &AbortSignal::new(),
        )
        .await
        .unwrap();
        assert!(decision.has_access);
    }

    #[tokio::test]
    async fn test_paid_template_without_purchase() {
        let lookup = FakeLookup::with_purchases(&[("someone@else.com", "executive")]);
        let decision = check_access(
            &lookup,
            template("executive"),
            "ana@example.com",
            &fast_policy(),
            &AbortSignal::new(),
        )
        .await
        .unwrap();

        assert!(!decision.has_access);
        assert_eq!(decision.reason, AccessReason::NotPurchased);
    }

    #[tokio::test(start_paused = true)]
    async fn test_transient_failures_are_retried() {
        let lookup = FakeLookup::with_purchases(&[("ana@example.com", "technical")]).failing_first(2);
        let decision = check_access(
            &lookup,
            template("technical"),
            "ana@example.com",
            &fast_policy(),
            &AbortSignal::new(),
        )
        .await
        .unwrap();

        assert!(decision.has_access);
        assert_eq!(lookup.calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_persistent_failure_is_unavailable_not_denied() {
        let lookup = FakeLookup::with_purchases(&[]).failing_first(10);
        let err = check_access(
            &lookup,
            template("technical"),
            "ana@example.com",
            &fast_policy(),
            &AbortSignal::new(),
        )
        .await
        .unwrap_err();

        assert!(matches!(err, AppError::UpstreamUnavailable { attempts: 3, .. }));
    }

    #[test]
    fn test_transient_error_classification() {
        assert!(is_transient_db_error(&sqlx::Error::PoolTimedOut));
        assert!(!is_transient_db_error(&sqlx::Error::RowNotFound));
        assert!(!is_transient_db_error(&sqlx::Error::PoolClosed));
    }

    #[test]
    fn test_normalize_email() {
        assert_eq!(normalize_email("  Ana@Example.COM ").unwrap(), "ana@example.com");
        assert!(normalize_email("ana").is_err());
        assert!(normalize_email("@example.com").is_err());
        assert!(normalize_email("ana@example").is_err());
        assert!(normalize_email("ana@@example.com").is_err());
        assert!(normalize_email("a na@example.com").is_err());
    }
}
