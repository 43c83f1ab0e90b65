use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

/// Wildcard `template_id` granting access to every premium template.
pub const ALL_TEMPLATES: &str = "*";

/// A row of `premium_purchases`, written by the checkout webhook.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct PremiumPurchaseRow {
    pub id: Uuid,
    pub email: String,
    pub template_id: String,
    pub status: String,
    pub created_at: DateTime<Utc>,
}
