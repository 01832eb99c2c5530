use std::{fmt::Display, str::FromStr};

use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use sqlx::FromRow;
use ts_rs::TS;
use utoipa::{IntoParams, ToSchema};
use validator::Validate;

// --- Core Entities (Mapped to Database) ---

/// User
///
/// A row of the `users` table. Carries the password hash, so it is never serialized
/// directly; handlers project it into `UserView` or `UserSummary`.
#[derive(Debug, Clone, FromRow, Default)]
pub struct User {
    pub id: i32,
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub username: String,
    /// Argon2 PHC string. Empty means the account cannot log in.
    #[sqlx(rename = "password")]
    pub password_hash: String,
    pub phone_number: Option<String>,
    pub date_registered: DateTime<Utc>,
    pub is_active: bool,
    pub profile_picture_url: Option<String>,
}

/// Category
///
/// A row of the `categories` table. Also used as the create/update body, since it holds
/// no secrets and no back-references.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, FromRow, Validate, Default, PartialEq)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct Category {
    #[serde(default)]
    pub id: i32,
    #[validate(length(min = 1, max = 100))]
    pub name: String,
    #[serde(default)]
    #[validate(length(max = 250))]
    pub description: Option<String>,
    #[serde(default, deserialize_with = "number_or_string")]
    #[validate(range(min = 1, max = 5))]
    pub priority_level: i32,
    #[serde(default)]
    pub is_active: bool,
    #[serde(default, deserialize_with = "number_or_string")]
    #[validate(range(min = 0.0, max = 100000.0))]
    pub average_value: f64,
    #[serde(default, deserialize_with = "number_or_string")]
    pub total_items_found: i64,
}

/// Item
///
/// A row of the `items` table, also used as the create/update body.
/// `user_id` is nullable: rows outlive the user that reported them.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, FromRow, Validate, PartialEq)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct Item {
    #[serde(default)]
    pub id: i32,
    #[validate(length(min = 1, max = 150))]
    pub name: String,
    #[serde(default)]
    #[validate(length(max = 500))]
    pub description: Option<String>,
    #[serde(deserialize_with = "flexible_datetime")]
    #[ts(type = "string")]
    pub date_found_or_lost: DateTime<Utc>,
    #[serde(default)]
    #[validate(length(max = 200))]
    pub location: Option<String>,
    #[serde(default, deserialize_with = "number_or_string")]
    #[validate(range(min = 0.0, max = 100000.0))]
    pub estimated_value: f64,
    #[serde(default)]
    pub is_claimed: bool,
    #[serde(default, deserialize_with = "optional_number_or_string")]
    pub user_id: Option<i32>,
    #[serde(deserialize_with = "number_or_string")]
    pub category_id: i32,
}

/// Form inputs post numbers as text (`"12.5"`), so both shapes are accepted.
#[derive(Deserialize)]
#[serde(untagged)]
enum NumberOrString<T> {
    Number(T),
    Text(String),
}

fn number_or_string<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de> + FromStr,
    T::Err: Display,
{
    match NumberOrString::<T>::deserialize(deserializer)? {
        NumberOrString::Number(value) => Ok(value),
        NumberOrString::Text(text) => text.trim().parse().map_err(|e| {
            serde::de::Error::custom(format!("invalid number `{}`: {}", text, e))
        }),
    }
}

/// Like `number_or_string`, with `null` and blank text read as `None`.
fn optional_number_or_string<'de, D, T>(deserializer: D) -> Result<Option<T>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de> + FromStr,
    T::Err: Display,
{
    match Option::<NumberOrString<T>>::deserialize(deserializer)? {
        None => Ok(None),
        Some(NumberOrString::Number(value)) => Ok(Some(value)),
        Some(NumberOrString::Text(text)) if text.trim().is_empty() => Ok(None),
        Some(NumberOrString::Text(text)) => text.trim().parse().map(Some).map_err(|e| {
            serde::de::Error::custom(format!("invalid number `{}`: {}", text, e))
        }),
    }
}

/// Accepts RFC 3339, a naive `YYYY-MM-DDTHH:MM:SS` timestamp, or a bare `YYYY-MM-DD` date.
/// Naive values are taken as UTC.
fn flexible_datetime<'de, D>(deserializer: D) -> Result<DateTime<Utc>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = String::deserialize(deserializer)?;
    parse_flexible_datetime(&raw).ok_or_else(|| {
        serde::de::Error::custom(format!("invalid date `{}`", raw))
    })
}

pub fn parse_flexible_datetime(raw: &str) -> Option<DateTime<Utc>> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Some(dt.with_timezone(&Utc));
    }
    if let Ok(naive) = NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S%.f") {
        return Some(naive.and_utc());
    }
    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .ok()
        .and_then(|date| date.and_hms_opt(0, 0, 0))
        .map(|naive| naive.and_utc())
}

// --- Projections (Output Schemas) ---

/// UserView
///
/// Everything about a user except the password hash.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, PartialEq)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct UserView {
    pub id: i32,
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub username: String,
    pub phone_number: Option<String>,
    #[ts(type = "string")]
    pub date_registered: DateTime<Utc>,
    pub is_active: bool,
    pub profile_picture_url: Option<String>,
}

impl From<User> for UserView {
    fn from(user: User) -> Self {
        Self {
            id: user.id,
            first_name: user.first_name,
            last_name: user.last_name,
            email: user.email,
            username: user.username,
            phone_number: user.phone_number,
            date_registered: user.date_registered,
            is_active: user.is_active,
            profile_picture_url: user.profile_picture_url,
        }
    }
}

/// UserSummary
///
/// The user fragment embedded into item listings.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, PartialEq)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct UserSummary {
    pub id: i32,
    pub username: String,
    pub first_name: String,
    pub last_name: String,
    pub email: String,
}

impl From<&User> for UserSummary {
    fn from(user: &User) -> Self {
        Self {
            id: user.id,
            username: user.username.clone(),
            first_name: user.first_name.clone(),
            last_name: user.last_name.clone(),
            email: user.email.clone(),
        }
    }
}

/// CategorySummary
///
/// The category fragment embedded into item listings.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, PartialEq)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct CategorySummary {
    pub id: i32,
    pub name: String,
    pub description: Option<String>,
    pub priority_level: i32,
    pub is_active: bool,
}

impl From<&Category> for CategorySummary {
    fn from(category: &Category) -> Self {
        Self {
            id: category.id,
            name: category.name.clone(),
            description: category.description.clone(),
            priority_level: category.priority_level,
            is_active: category.is_active,
        }
    }
}

/// ItemDetails
///
/// An item joined with its owner and category. The embedded fragments hold no
/// back-references, so the JSON graph is a tree.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, PartialEq)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct ItemDetails {
    #[serde(flatten)]
    pub item: Item,
    pub user: Option<UserSummary>,
    pub category: Option<CategorySummary>,
}

/// ItemDetailsRow
///
/// Flat result row of the items/users/categories LEFT JOIN used by the Postgres repository.
#[derive(Debug, FromRow)]
pub struct ItemDetailsRow {
    pub id: i32,
    pub name: String,
    pub description: Option<String>,
    pub date_found_or_lost: DateTime<Utc>,
    pub location: Option<String>,
    pub estimated_value: f64,
    pub is_claimed: bool,
    pub user_id: Option<i32>,
    pub category_id: i32,
    pub u_username: Option<String>,
    pub u_first_name: Option<String>,
    pub u_last_name: Option<String>,
    pub u_email: Option<String>,
    pub c_name: Option<String>,
    pub c_description: Option<String>,
    pub c_priority_level: Option<i32>,
    pub c_is_active: Option<bool>,
}

impl From<ItemDetailsRow> for ItemDetails {
    fn from(row: ItemDetailsRow) -> Self {
        let user = match (row.user_id, row.u_username) {
            (Some(id), Some(username)) => Some(UserSummary {
                id,
                username,
                first_name: row.u_first_name.unwrap_or_default(),
                last_name: row.u_last_name.unwrap_or_default(),
                email: row.u_email.unwrap_or_default(),
            }),
            _ => None,
        };
        let category = row.c_name.map(|name| CategorySummary {
            id: row.category_id,
            name,
            description: row.c_description,
            priority_level: row.c_priority_level.unwrap_or_default(),
            is_active: row.c_is_active.unwrap_or_default(),
        });
        ItemDetails {
            item: Item {
                id: row.id,
                name: row.name,
                description: row.description,
                date_found_or_lost: row.date_found_or_lost,
                location: row.location,
                estimated_value: row.estimated_value,
                is_claimed: row.is_claimed,
                user_id: row.user_id,
                category_id: row.category_id,
            },
            user,
            category,
        }
    }
}

// --- Request Payloads (Input Schemas) ---

/// LoginRequest
///
/// Fields default to empty so that a missing field and an empty one get the same 400.
/// Presence is checked by the handler, so there are no field rules here.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Validate, Default)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct LoginRequest {
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub password: String,
}

/// LoginResponse
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema)]
#[ts(export)]
pub struct LoginResponse {
    pub token: String,
}

/// RegisterRequest
///
/// Input payload for the public registration endpoint (POST /api/auth/register).
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Validate)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct RegisterRequest {
    #[validate(length(min = 1, max = 50))]
    pub username: String,
    #[validate(length(min = 1, max = 50))]
    pub first_name: String,
    #[validate(length(min = 1, max = 50))]
    pub last_name: String,
    #[validate(email, length(max = 100))]
    pub email: String,
    #[validate(length(min = 6, max = 100))]
    pub password: String,
}

/// RegisteredUser
///
/// The reduced projection returned after registration.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, PartialEq)]
#[ts(export)]
pub struct RegisteredUser {
    pub id: i32,
    pub username: String,
    pub email: String,
}

/// UserPayload
///
/// Create/update body for the user resource. `password` is plaintext on the wire and is
/// hashed before it reaches the store. On update an absent or empty password keeps the
/// current hash.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Validate, Default)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct UserPayload {
    #[serde(default)]
    pub id: i32,
    #[validate(length(min = 1, max = 50))]
    pub first_name: String,
    #[validate(length(min = 1, max = 50))]
    pub last_name: String,
    #[validate(email, length(max = 100))]
    pub email: String,
    #[validate(length(min = 1, max = 50))]
    pub username: String,
    #[serde(default, deserialize_with = "blank_as_none")]
    #[validate(length(min = 6, max = 100))]
    pub password: Option<String>,
    #[serde(default)]
    #[validate(length(max = 15))]
    pub phone_number: Option<String>,
    #[serde(default)]
    pub is_active: bool,
    #[serde(default)]
    #[validate(url, length(max = 250))]
    pub profile_picture_url: Option<String>,
}

/// Maps `""` and whitespace-only strings to `None`.
fn blank_as_none<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = Option::<String>::deserialize(deserializer)?;
    Ok(raw.filter(|value| !value.trim().is_empty()))
}

// --- Search Parameters ---

fn default_page_number() -> i64 {
    1
}

fn default_page_size() -> i64 {
    10
}

/// UserSearch
///
/// Query parameters of GET /api/user.
#[derive(Debug, Clone, Deserialize, IntoParams, Default)]
#[serde(rename_all = "camelCase")]
#[into_params(parameter_in = Query)]
pub struct UserSearch {
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    #[serde(default = "default_page_number")]
    pub page_number: i64,
    #[serde(default = "default_page_size")]
    pub page_size: i64,
    pub sort_by: Option<String>,
    #[serde(default)]
    pub is_descending: bool,
}

/// CategorySearch
///
/// Query parameters of GET /api/category/search.
#[derive(Debug, Clone, Deserialize, IntoParams, Default)]
#[serde(rename_all = "camelCase")]
#[into_params(parameter_in = Query)]
pub struct CategorySearch {
    pub name: Option<String>,
    pub description: Option<String>,
    pub sort_by: Option<String>,
    #[serde(default)]
    pub is_descending: bool,
    #[serde(default = "default_page_number")]
    pub page_number: i64,
    #[serde(default = "default_page_size")]
    pub page_size: i64,
}

/// ItemSearch
///
/// Query parameters of GET /api/item/search.
#[derive(Debug, Clone, Deserialize, IntoParams, Default)]
#[serde(rename_all = "camelCase")]
#[into_params(parameter_in = Query)]
pub struct ItemSearch {
    pub name: Option<String>,
    pub location: Option<String>,
    pub sort_by: Option<String>,
    #[serde(default)]
    pub is_descending: bool,
    #[serde(default = "default_page_number")]
    pub page_number: i64,
    #[serde(default = "default_page_size")]
    pub page_size: i64,
}

// --- Paged Responses ---

#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct UserPage {
    pub total_items: i64,
    pub page_number: i64,
    pub page_size: i64,
    pub users: Vec<UserView>,
}

#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct CategoryPage {
    pub total_items: i64,
    pub page_number: i64,
    pub page_size: i64,
    pub categories: Vec<Category>,
}

#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct ItemPage {
    pub items: Vec<ItemDetails>,
    pub total_items: i64,
    pub page_number: i64,
    pub page_size: i64,
}
