use axum::{
    extract::{FromRef, FromRequestParts},
    http::{header, request::Parts},
};
use chrono::Utc;
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation, decode, encode};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{
    config::AppConfig,
    error::{AppError, AppResult},
    models::User,
};

/// Lifetime of an issued token, in seconds.
pub const TOKEN_TTL_SECS: i64 = 60 * 60;

/// Claims
///
/// The payload of every bearer token issued by `/api/auth/login`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Claims {
    /// Subject (sub): the user's email.
    pub sub: String,
    /// The numeric user id, string-encoded.
    pub id: String,
    /// Token id (jti): a random UUID, unique per issuance.
    pub jti: String,
    /// Issued At (iat), seconds since the epoch.
    pub iat: i64,
    /// Expiration Time (exp): always `iat + TOKEN_TTL_SECS`.
    pub exp: i64,
    pub iss: String,
    pub aud: String,
}

/// Fails unless signing key, issuer and audience are all configured.
fn require_token_settings(config: &AppConfig) -> AppResult<()> {
    if config.jwt_secret.is_empty() {
        return Err(AppError::TokenSettings("signing key"));
    }
    if config.jwt_issuer.is_empty() {
        return Err(AppError::TokenSettings("issuer"));
    }
    if config.jwt_audience.is_empty() {
        return Err(AppError::TokenSettings("audience"));
    }
    Ok(())
}

/// issue_token
///
/// Signs an HS256 token for `user`, valid for one hour from now.
pub fn issue_token(config: &AppConfig, user: &User) -> AppResult<String> {
    issue_token_at(config, user, Utc::now().timestamp())
}

/// Same as `issue_token` with an explicit issuance instant (seconds since the epoch).
pub fn issue_token_at(config: &AppConfig, user: &User, issued_at: i64) -> AppResult<String> {
    require_token_settings(config)?;

    let claims = Claims {
        sub: user.email.clone(),
        id: user.id.to_string(),
        jti: Uuid::new_v4().to_string(),
        iat: issued_at,
        exp: issued_at + TOKEN_TTL_SECS,
        iss: config.jwt_issuer.clone(),
        aud: config.jwt_audience.clone(),
    };

    let key = EncodingKey::from_secret(config.jwt_secret.as_bytes());
    Ok(encode(&Header::new(Algorithm::HS256), &claims, &key)?)
}

/// validate_token
///
/// Checks signature, expiry (no leeway), issuer and audience. Every failure is reported
/// as `Unauthorized`; the precise reason only reaches the log.
pub fn validate_token(config: &AppConfig, token: &str) -> AppResult<Claims> {
    let key = DecodingKey::from_secret(config.jwt_secret.as_bytes());

    let mut validation = Validation::new(Algorithm::HS256);
    validation.leeway = 0;
    validation.validate_exp = true;
    validation.set_issuer(&[config.jwt_issuer.as_str()]);
    validation.set_audience(&[config.jwt_audience.as_str()]);

    decode::<Claims>(token, &key, &validation)
        .map(|data| data.claims)
        .map_err(|e| {
            tracing::debug!("bearer token rejected: {:?}", e.kind());
            AppError::Unauthorized("Invalid or expired token.".to_string())
        })
}

/// AuthUser
///
/// The identity resolved from a valid bearer token. Resolution is purely cryptographic:
/// no session table and no database lookup.
#[derive(Debug, Clone, PartialEq)]
pub struct AuthUser {
    pub id: i32,
    pub email: String,
}

impl<S> FromRequestParts<S> for AuthUser
where
    S: Send + Sync,
    AppConfig: FromRef<S>,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let config = AppConfig::from_ref(state);

        let token = parts
            .headers
            .get(header::AUTHORIZATION)
            .and_then(|value| value.to_str().ok())
            .and_then(|value| value.split_once(' '))
            // Auth schemes are case-insensitive.
            .filter(|(scheme, _)| scheme.eq_ignore_ascii_case("Bearer"))
            .map(|(_, token)| token.trim())
            .filter(|token| !token.is_empty())
            .ok_or_else(|| AppError::Unauthorized("Missing bearer token.".to_string()))?;

        let claims = validate_token(&config, token)?;

        let id = claims
            .id
            .parse::<i32>()
            .map_err(|_| AppError::Unauthorized("Invalid or expired token.".to_string()))?;

        Ok(AuthUser {
            id,
            email: claims.sub,
        })
    }
}
