use crate::{
    AppState,
    handlers::{categories, items, users},
};
use axum::{Router, routing::get};

/// Authenticated Router Module
///
/// The administrative REST surface over users, categories and items. The router is wrapped
/// in the auth middleware by `create_router`, so every handler here only runs for a request
/// carrying a valid bearer token.
pub fn authenticated_routes() -> Router<AppState> {
    Router::<AppState>::new()
        // --- Users ---
        // GET /api/user?firstName&lastName&pageNumber&pageSize&sortBy&isDescending
        // POST /api/user
        .route(
            "/api/user",
            get(users::search_users).post(users::create_user),
        )
        .route(
            "/api/user/{id}",
            get(users::get_user)
                .put(users::update_user)
                .delete(users::delete_user),
        )
        // --- Categories ---
        // GET /api/category returns everything unpaged (category picker).
        .route(
            "/api/category",
            get(categories::list_categories).post(categories::create_category),
        )
        // GET /api/category/search?name&description&sortBy&isDescending&pageNumber&pageSize
        .route("/api/category/search", get(categories::search_categories))
        .route(
            "/api/category/{id}",
            get(categories::get_category)
                .put(categories::update_category)
                .delete(categories::delete_category),
        )
        // --- Items ---
        .route("/api/item", get(items::list_items).post(items::create_item))
        // GET /api/item/search?name&location&sortBy&isDescending&pageNumber&pageSize
        .route("/api/item/search", get(items::search_items))
        .route(
            "/api/item/{id}",
            get(items::get_item)
                .put(items::update_item)
                .delete(items::delete_item),
        )
}
