/// Category endpoints
use crate::{categories::Category, context::AppContext, error::ModerationResult};
use axum::{
    extract::{rejection::JsonRejection, Path, State},
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};

/// Build category routes
pub fn routes() -> Router<AppContext> {
    Router::new()
        .route(
            "/api/networks/:network_id/categories",
            get(list_categories).post(create_category),
        )
        .route(
            "/api/networks/:network_id/categories/reorder",
            post(reorder_categories),
        )
}

#[derive(Debug, Serialize)]
struct CategoriesResponse {
    categories: Vec<Category>,
}

async fn list_categories(
    State(ctx): State<AppContext>,
    Path(network_id): Path<String>,
) -> ModerationResult<Json<CategoriesResponse>> {
    let categories = ctx.category_manager.list_categories(&network_id).await?;
    Ok(Json(CategoriesResponse { categories }))
}

#[derive(Debug, Deserialize)]
struct CreateCategoryRequest {
    name: String,
    #[serde(default)]
    slug: Option<String>,
}

#[derive(Debug, Serialize)]
struct CreateCategoryResponse {
    success: bool,
    message: String,
    category: Category,
}

async fn create_category(
    State(ctx): State<AppContext>,
    Path(network_id): Path<String>,
    payload: Result<Json<CreateCategoryRequest>, JsonRejection>,
) -> ModerationResult<Json<CreateCategoryResponse>> {
    let Json(req) = payload?;
    let category = ctx
        .category_manager
        .create_category(&network_id, &req.name, req.slug.as_deref())
        .await?;

    Ok(Json(CreateCategoryResponse {
        success: true,
        message: format!("Category '{}' created", category.name),
        category,
    }))
}

#[derive(Debug, Deserialize)]
struct ReorderRequest {
    ordered_ids: Vec<String>,
}

#[derive(Debug, Serialize)]
struct ReorderResponse {
    success: bool,
    message: String,
    categories: Vec<Category>,
}

async fn reorder_categories(
    State(ctx): State<AppContext>,
    Path(network_id): Path<String>,
    payload: Result<Json<ReorderRequest>, JsonRejection>,
) -> ModerationResult<Json<ReorderResponse>> {
    let Json(req) = payload?;
    let categories = ctx
        .category_manager
        .reorder_categories(&network_id, &req.ordered_ids)
        .await?;

    Ok(Json(ReorderResponse {
        success: true,
        message: "Categories reordered".to_string(),
        categories,
    }))
}
