use axum::{
    Json,
    extract::{Path, Query, State},
    http::StatusCode,
    response::Response,
};

use super::{ValidatedJson, created, ensure_same_id};
use crate::{
    AppState,
    error::{AppError, AppResult},
    models::{Category, CategoryPage, CategorySearch},
    query::PageRequest,
};

/// list_categories
///
/// [Authenticated Route] Every category, unpaged. Feeds the category picker of the admin
/// panel.
#[utoipa::path(
    get,
    path = "/api/category",
    responses((status = 200, description = "All categories", body = [Category])),
    security(("bearer_auth" = [])),
    tag = "categories"
)]
pub async fn list_categories(State(state): State<AppState>) -> AppResult<Json<Vec<Category>>> {
    Ok(Json(state.repo.list_categories().await?))
}

/// search_categories
///
/// [Authenticated Route] Paged category listing filtered by name and description.
#[utoipa::path(
    get,
    path = "/api/category/search",
    params(CategorySearch),
    responses(
        (status = 200, description = "One page of categories", body = CategoryPage),
        (status = 400, description = "Invalid paging parameters")
    ),
    security(("bearer_auth" = [])),
    tag = "categories"
)]
pub async fn search_categories(
    State(state): State<AppState>,
    Query(search): Query<CategorySearch>,
) -> AppResult<Json<CategoryPage>> {
    let page = PageRequest::new(search.page_number, search.page_size)?;
    let result = state.repo.search_categories(&search, page).await?;

    Ok(Json(CategoryPage {
        total_items: result.total,
        page_number: page.page_number,
        page_size: page.page_size,
        categories: result.rows,
    }))
}

#[utoipa::path(
    get,
    path = "/api/category/{id}",
    params(("id" = i32, Path, description = "Category ID")),
    responses(
        (status = 200, description = "Found", body = Category),
        (status = 404, description = "Not Found")
    ),
    security(("bearer_auth" = [])),
    tag = "categories"
)]
pub async fn get_category(
    State(state): State<AppState>,
    Path(id): Path<i32>,
) -> AppResult<Json<Category>> {
    state
        .repo
        .get_category(id)
        .await?
        .map(Json)
        .ok_or(AppError::NotFound)
}

#[utoipa::path(
    post,
    path = "/api/category",
    request_body = Category,
    responses(
        (status = 201, description = "Created", body = Category),
        (status = 400, description = "Invalid category data")
    ),
    security(("bearer_auth" = [])),
    tag = "categories"
)]
pub async fn create_category(
    State(state): State<AppState>,
    ValidatedJson(payload): ValidatedJson<Category>,
) -> AppResult<Response> {
    let stored = state.repo.create_category(payload).await?;
    tracing::info!("created category {}", stored.id);
    Ok(created(format!("/api/category/{}", stored.id), stored))
}

/// update_category
///
/// [Authenticated Route] Full replace. The path id must equal the body id; otherwise nothing
/// is written.
#[utoipa::path(
    put,
    path = "/api/category/{id}",
    params(("id" = i32, Path, description = "Category ID")),
    request_body = Category,
    responses(
        (status = 204, description = "Updated"),
        (status = 400, description = "Id mismatch or invalid data"),
        (status = 404, description = "Not Found")
    ),
    security(("bearer_auth" = [])),
    tag = "categories"
)]
pub async fn update_category(
    State(state): State<AppState>,
    Path(id): Path<i32>,
    ValidatedJson(payload): ValidatedJson<Category>,
) -> AppResult<StatusCode> {
    ensure_same_id(id, payload.id)?;

    if state.repo.update_category(payload).await? {
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(AppError::NotFound)
    }
}

/// delete_category
///
/// [Authenticated Route] Removes the category together with all of its items.
#[utoipa::path(
    delete,
    path = "/api/category/{id}",
    params(("id" = i32, Path, description = "Category ID")),
    responses(
        (status = 204, description = "Deleted"),
        (status = 404, description = "Not Found")
    ),
    security(("bearer_auth" = [])),
    tag = "categories"
)]
pub async fn delete_category(
    State(state): State<AppState>,
    Path(id): Path<i32>,
) -> AppResult<StatusCode> {
    if state.repo.delete_category(id).await? {
        tracing::info!("deleted category {} and its items", id);
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(AppError::NotFound)
    }
}
