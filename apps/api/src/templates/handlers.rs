use axum::{
    extract::{Path, Query},
    Json,
};
use serde::Deserialize;

use crate::errors::AppError;
use crate::templates::catalog::{self, Template};

#[derive(Debug, Deserialize)]
pub struct TemplateFilter {
    pub premium: Option<bool>,
}

/// GET /api/v1/templates
pub async fn handle_list_templates(
    Query(filter): Query<TemplateFilter>,
) -> Json<Vec<&'static Template>> {
    let templates = match filter.premium {
        Some(premium) => catalog::by_premium(premium).collect(),
        None => catalog::all().iter().collect(),
    };
    Json(templates)
}

/// GET /api/v1/templates/:id
pub async fn handle_get_template(
    Path(id): Path<String>,
) -> Result<Json<&'static Template>, AppError> {
    catalog::find(&id)
        .map(Json)
        .ok_or_else(|| AppError::NotFound(format!("Template '{id}' not found")))
}
