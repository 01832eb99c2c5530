use axum::{
    Json,
    extract::{Path, Query, State},
    http::StatusCode,
    response::Response,
};

use super::{ValidatedJson, created, ensure_same_id};
use crate::{
    AppState,
    auth::AuthUser,
    error::{AppError, AppResult},
    models::{Item, ItemDetails, ItemPage, ItemSearch},
    query::PageRequest,
};

/// list_items
///
/// [Authenticated Route] Every item with its owner and category summaries.
#[utoipa::path(
    get,
    path = "/api/item",
    responses((status = 200, description = "All items", body = [ItemDetails])),
    security(("bearer_auth" = [])),
    tag = "items"
)]
pub async fn list_items(State(state): State<AppState>) -> AppResult<Json<Vec<ItemDetails>>> {
    Ok(Json(state.repo.list_items().await?))
}

/// search_items
///
/// [Authenticated Route] Paged item listing filtered by name and location. Defaults to the
/// oldest `dateFoundOrLost` first.
#[utoipa::path(
    get,
    path = "/api/item/search",
    params(ItemSearch),
    responses(
        (status = 200, description = "One page of items", body = ItemPage),
        (status = 400, description = "Invalid paging parameters")
    ),
    security(("bearer_auth" = [])),
    tag = "items"
)]
pub async fn search_items(
    State(state): State<AppState>,
    Query(search): Query<ItemSearch>,
) -> AppResult<Json<ItemPage>> {
    let page = PageRequest::new(search.page_number, search.page_size)?;
    let result = state.repo.search_items(&search, page).await?;

    Ok(Json(ItemPage {
        items: result.rows,
        total_items: result.total,
        page_number: page.page_number,
        page_size: page.page_size,
    }))
}

#[utoipa::path(
    get,
    path = "/api/item/{id}",
    params(("id" = i32, Path, description = "Item ID")),
    responses(
        (status = 200, description = "Found", body = ItemDetails),
        (status = 404, description = "Not Found")
    ),
    security(("bearer_auth" = [])),
    tag = "items"
)]
pub async fn get_item(
    State(state): State<AppState>,
    Path(id): Path<i32>,
) -> AppResult<Json<ItemDetails>> {
    state
        .repo
        .get_item(id)
        .await?
        .map(Json)
        .ok_or(AppError::NotFound)
}

/// create_item
///
/// [Authenticated Route] Reports a found or lost item.
///
/// *Note*: When the body names no `userId`, the item is attributed to the caller resolved by
/// `AuthUser`.
#[utoipa::path(
    post,
    path = "/api/item",
    request_body = Item,
    responses(
        (status = 201, description = "Created", body = Item),
        (status = 400, description = "Invalid item data or unknown category/user")
    ),
    security(("bearer_auth" = [])),
    tag = "items"
)]
pub async fn create_item(
    AuthUser { id: caller_id, .. }: AuthUser,
    State(state): State<AppState>,
    ValidatedJson(mut payload): ValidatedJson<Item>,
) -> AppResult<Response> {
    payload.user_id = payload.user_id.or(Some(caller_id));

    let stored = state.repo.create_item(payload).await?;
    tracing::info!("created item {} in category {}", stored.id, stored.category_id);
    Ok(created(format!("/api/item/{}", stored.id), stored))
}

#[utoipa::path(
    put,
    path = "/api/item/{id}",
    params(("id" = i32, Path, description = "Item ID")),
    request_body = Item,
    responses(
        (status = 204, description = "Updated"),
        (status = 400, description = "Id mismatch, invalid data or unknown category/user"),
        (status = 404, description = "Not Found")
    ),
    security(("bearer_auth" = [])),
    tag = "items"
)]
pub async fn update_item(
    State(state): State<AppState>,
    Path(id): Path<i32>,
    ValidatedJson(payload): ValidatedJson<Item>,
) -> AppResult<StatusCode> {
    ensure_same_id(id, payload.id)?;

    if state.repo.update_item(payload).await? {
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(AppError::NotFound)
    }
}

#[utoipa::path(
    delete,
    path = "/api/item/{id}",
    params(("id" = i32, Path, description = "Item ID")),
    responses(
        (status = 204, description = "Deleted"),
        (status = 404, description = "Not Found")
    ),
    security(("bearer_auth" = [])),
    tag = "items"
)]
pub async fn delete_item(
    State(state): State<AppState>,
    Path(id): Path<i32>,
) -> AppResult<StatusCode> {
    if state.repo.delete_item(id).await? {
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(AppError::NotFound)
    }
}
