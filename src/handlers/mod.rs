use axum::{
    Json,
    extract::{FromRequest, Request},
    http::{StatusCode, header},
    response::{IntoResponse, Response},
};
use serde::{Serialize, de::DeserializeOwned};
use validator::Validate;

use crate::error::AppError;

pub mod auth;
pub mod categories;
pub mod items;
pub mod users;

/// ValidatedJson
///
/// A JSON body extractor that runs `validator` rules before the handler sees the value.
/// Malformed bodies and rule violations are both rejected as `AppError::Validation` (400),
/// replacing axum's default 415/422 rejections.
#[derive(Debug, Clone)]
pub struct ValidatedJson<T>(pub T);

impl<T, S> FromRequest<S> for ValidatedJson<T>
where
    T: DeserializeOwned + Validate,
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let Json(value) = Json::<T>::from_request(req, state)
            .await
            .map_err(|rejection| AppError::Validation(rejection.body_text()))?;
        value.validate()?;
        Ok(ValidatedJson(value))
    }
}

/// 201 Created with a `Location` header pointing at the new resource.
pub(crate) fn created<T: Serialize>(location: String, body: T) -> Response {
    (
        StatusCode::CREATED,
        [(header::LOCATION, location)],
        Json(body),
    )
        .into_response()
}

/// Rejects an update whose path id disagrees with the body id.
pub(crate) fn ensure_same_id(path_id: i32, body_id: i32) -> Result<(), AppError> {
    if path_id == body_id {
        Ok(())
    } else {
        Err(AppError::Validation(format!(
            "Route id {} does not match body id {}.",
            path_id, body_id
        )))
    }
}
