use axum::{
    extract::{Query, State},
    Json,
};
use serde::Deserialize;

use crate::errors::AppError;
use crate::premium::{check_access, normalize_email, AccessDecision};
use crate::state::AppState;
use crate::templates::catalog;

#[derive(Debug, Deserialize)]
pub struct AccessQuery {
    pub email: String,
    pub template_id: String,
}

/// GET /api/v1/premium/access?email=&template_id=
pub async fn handle_check_access(
    State(state): State<AppState>,
    Query(query): Query<AccessQuery>,
) -> Result<Json<AccessDecision>, AppError> {
    let template = catalog::find(query.template_id.trim()).ok_or_else(|| {
        AppError::NotFound(format!("Template '{}' not found", query.template_id))
    })?;
    let email = normalize_email(&query.email)?;

    let decision = check_access(
        state.purchases.as_ref(),
        template,
        &email,
        &state.retry,
        &state.shutdown,
    )
    .await?;

    Ok(Json(decision))
}
