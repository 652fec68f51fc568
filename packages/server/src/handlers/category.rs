use axum::Json;
use axum::extract::State;
use sea_orm::*;
use tracing::instrument;

use crate::entity::category;
use crate::error::AppError;
use crate::models::category::{CategoryListResponse, CategoryResponse};
use crate::state::AppState;

#[utoipa::path(
    get,
    path = "",
    tag = "Categories",
    operation_id = "listCategories",
    summary = "List story categories",
    responses(
        (status = 200, description = "All categories, alphabetical", body = CategoryListResponse),
    ),
)]
#[instrument(skip(state))]
pub async fn list_categories(
    State(state): State<AppState>,
) -> Result<Json<CategoryListResponse>, AppError> {
    let categories = category::Entity::find()
        .order_by_asc(category::Column::Name)
        .all(&state.db)
        .await?;

    let total = categories.len() as u64;
    Ok(Json(CategoryListResponse {
        categories: categories.into_iter().map(CategoryResponse::from).collect(),
        total,
    }))
}
