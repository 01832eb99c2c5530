use axum::{
    Json,
    extract::{Path, Query, State},
    http::StatusCode,
    response::Response,
};
use chrono::Utc;

use super::{ValidatedJson, created, ensure_same_id};
use crate::{
    AppState,
    error::{AppError, AppResult},
    hashing::hash_blocking,
    models::{User, UserPage, UserPayload, UserSearch, UserView},
    query::PageRequest,
};

/// search_users
///
/// [Authenticated Route] Paged user listing filtered by first/last name.
#[utoipa::path(
    get,
    path = "/api/user",
    params(UserSearch),
    responses(
        (status = 200, description = "One page of users", body = UserPage),
        (status = 400, description = "Invalid paging parameters")
    ),
    security(("bearer_auth" = [])),
    tag = "users"
)]
pub async fn search_users(
    State(state): State<AppState>,
    Query(search): Query<UserSearch>,
) -> AppResult<Json<UserPage>> {
    let page = PageRequest::new(search.page_number, search.page_size)?;
    let result = state.repo.search_users(&search, page).await?;

    Ok(Json(UserPage {
        total_items: result.total,
        page_number: page.page_number,
        page_size: page.page_size,
        users: result.rows.into_iter().map(UserView::from).collect(),
    }))
}

#[utoipa::path(
    get,
    path = "/api/user/{id}",
    params(("id" = i32, Path, description = "User ID")),
    responses(
        (status = 200, description = "Found", body = UserView),
        (status = 404, description = "Not Found")
    ),
    security(("bearer_auth" = [])),
    tag = "users"
)]
pub async fn get_user(
    State(state): State<AppState>,
    Path(id): Path<i32>,
) -> AppResult<Json<UserView>> {
    match state.repo.get_user(id).await? {
        Some(user) => Ok(Json(UserView::from(user))),
        None => Err(AppError::NotFound),
    }
}

/// create_user
///
/// [Authenticated Route] Administrative account creation. The plaintext password, when
/// given, is hashed before storage; without one the account exists but cannot log in.
#[utoipa::path(
    post,
    path = "/api/user",
    request_body = UserPayload,
    responses(
        (status = 201, description = "Created", body = UserView),
        (status = 400, description = "Invalid user data"),
        (status = 409, description = "Email or username already taken")
    ),
    security(("bearer_auth" = [])),
    tag = "users"
)]
pub async fn create_user(
    State(state): State<AppState>,
    ValidatedJson(payload): ValidatedJson<UserPayload>,
) -> AppResult<Response> {
    let password_hash = match payload.password {
        Some(password) => hash_blocking(state.hasher.clone(), password).await?,
        None => String::new(),
    };

    let user = User {
        id: 0,
        first_name: payload.first_name,
        last_name: payload.last_name,
        email: payload.email,
        username: payload.username,
        password_hash,
        phone_number: payload.phone_number,
        date_registered: Utc::now(),
        is_active: payload.is_active,
        profile_picture_url: payload.profile_picture_url,
    };

    let stored = state.repo.create_user(user).await?;
    tracing::info!("created user {}", stored.id);
    Ok(created(
        format!("/api/user/{}", stored.id),
        UserView::from(stored),
    ))
}

/// update_user
///
/// [Authenticated Route] Full replace of a user. `dateRegistered` is preserved, as is the
/// stored password hash when the body carries no password.
#[utoipa::path(
    put,
    path = "/api/user/{id}",
    params(("id" = i32, Path, description = "User ID")),
    request_body = UserPayload,
    responses(
        (status = 204, description = "Updated"),
        (status = 400, description = "Id mismatch or invalid data"),
        (status = 404, description = "Not Found"),
        (status = 409, description = "Email or username already taken")
    ),
    security(("bearer_auth" = [])),
    tag = "users"
)]
pub async fn update_user(
    State(state): State<AppState>,
    Path(id): Path<i32>,
    ValidatedJson(payload): ValidatedJson<UserPayload>,
) -> AppResult<StatusCode> {
    ensure_same_id(id, payload.id)?;

    let current = state.repo.get_user(id).await?.ok_or(AppError::NotFound)?;

    let password_hash = match payload.password {
        Some(password) => hash_blocking(state.hasher.clone(), password).await?,
        None => current.password_hash,
    };

    let user = User {
        id,
        first_name: payload.first_name,
        last_name: payload.last_name,
        email: payload.email,
        username: payload.username,
        password_hash,
        phone_number: payload.phone_number,
        date_registered: current.date_registered,
        is_active: payload.is_active,
        profile_picture_url: payload.profile_picture_url,
    };

    if state.repo.update_user(user).await? {
        Ok(StatusCode::NO_CONTENT)
    } else {
        // Deleted between the read above and the write.
        Err(AppError::NotFound)
    }
}

/// delete_user
///
/// [Authenticated Route] Items reported by the user are kept and become ownerless.
#[utoipa::path(
    delete,
    path = "/api/user/{id}",
    params(("id" = i32, Path, description = "User ID")),
    responses(
        (status = 204, description = "Deleted"),
        (status = 404, description = "Not Found")
    ),
    security(("bearer_auth" = [])),
    tag = "users"
)]
pub async fn delete_user(
    State(state): State<AppState>,
    Path(id): Path<i32>,
) -> AppResult<StatusCode> {
    if state.repo.delete_user(id).await? {
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(AppError::NotFound)
    }
}
