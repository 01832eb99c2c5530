use axum::{Json, extract::State};
use chrono::Utc;

use super::ValidatedJson;
use crate::{
    AppState,
    auth::issue_token,
    error::{AppError, AppResult},
    hashing::{hash_blocking, verify_blocking},
    models::{LoginRequest, LoginResponse, RegisterRequest, RegisteredUser, User},
    repository::{DUPLICATE_EMAIL, DUPLICATE_USERNAME},
};

const INVALID_CREDENTIALS: &str = "Invalid email or password";

/// login
///
/// [Public Route] Exchanges an email/password pair for a one-hour bearer token.
///
/// An unknown email, an account without a password and a wrong password all produce the
/// same 401, so the response never reveals which accounts exist.
#[utoipa::path(
    post,
    path = "/api/auth/login",
    request_body = LoginRequest,
    responses(
        (status = 200, description = "Token issued", body = LoginResponse),
        (status = 400, description = "Email or password missing"),
        (status = 401, description = "Invalid email or password")
    ),
    tag = "auth"
)]
pub async fn login(
    State(state): State<AppState>,
    ValidatedJson(payload): ValidatedJson<LoginRequest>,
) -> AppResult<Json<LoginResponse>> {
    if payload.email.trim().is_empty() || payload.password.trim().is_empty() {
        return Err(AppError::Validation(
            "Email and password are required.".to_string(),
        ));
    }

    let user = match state.repo.find_user_by_email(&payload.email).await? {
        Some(user) if !user.password_hash.is_empty() => user,
        _ => {
            tracing::warn!("login rejected: no usable account for {}", payload.email);
            return Err(AppError::Unauthorized(INVALID_CREDENTIALS.to_string()));
        }
    };

    let matches = verify_blocking(
        state.hasher.clone(),
        payload.password,
        user.password_hash.clone(),
    )
    .await;
    if !matches {
        tracing::warn!("login rejected: wrong password for user {}", user.id);
        return Err(AppError::Unauthorized(INVALID_CREDENTIALS.to_string()));
    }

    let token = issue_token(&state.config, &user)?;
    tracing::info!("issued token for user {}", user.id);
    Ok(Json(LoginResponse { token }))
}

/// register
///
/// [Public Route] Self-service account creation.
///
/// Email and username uniqueness are checked in that order, each with its own 409 message.
/// Faults while hashing or persisting are reported with full diagnostics (`AppError::Unexpected`).
#[utoipa::path(
    post,
    path = "/api/auth/register",
    request_body = RegisterRequest,
    responses(
        (status = 200, description = "Registered", body = RegisteredUser),
        (status = 400, description = "Invalid registration data"),
        (status = 409, description = "Email or username already taken"),
        (status = 500, description = "Persistence failure with diagnostics")
    ),
    tag = "auth"
)]
pub async fn register(
    State(state): State<AppState>,
    ValidatedJson(payload): ValidatedJson<RegisterRequest>,
) -> AppResult<Json<RegisteredUser>> {
    if state.repo.email_exists(&payload.email).await? {
        tracing::info!("registration refused: email already in use");
        return Err(AppError::Conflict(DUPLICATE_EMAIL.to_string()));
    }
    if state.repo.username_exists(&payload.username).await? {
        tracing::info!("registration refused: username already in use");
        return Err(AppError::Conflict(DUPLICATE_USERNAME.to_string()));
    }

    // Hashing and persistence faults both carry diagnostics.
    let password_hash = hash_blocking(state.hasher.clone(), payload.password)
        .await
        .map_err(diagnostic)?;

    let user = User {
        id: 0,
        first_name: payload.first_name,
        last_name: payload.last_name,
        email: payload.email,
        username: payload.username,
        password_hash,
        phone_number: None,
        date_registered: Utc::now(),
        is_active: true,
        profile_picture_url: None,
    };

    let stored = state.repo.create_user(user).await.map_err(diagnostic)?;

    tracing::info!("registered user {}", stored.id);
    Ok(Json(RegisteredUser {
        id: stored.id,
        username: stored.username,
        email: stored.email,
    }))
}

/// Store and hashing faults become `AppError::Unexpected`; client errors pass through.
fn diagnostic(error: AppError) -> AppError {
    match error {
        AppError::Database(inner) => AppError::unexpected(&inner),
        AppError::Hashing(_) => AppError::unexpected(&error),
        other => other,
    }
}
