use async_trait::async_trait;
use std::sync::Arc;

use crate::{
    error::AppResult,
    models::{Category, CategorySearch, Item, ItemDetails, ItemSearch, User, UserSearch},
    query::{Page, PageRequest},
};

mod memory;
mod postgres;

pub use memory::InMemoryRepository;
pub use postgres::PostgresRepository;

pub const DUPLICATE_EMAIL: &str = "User with this email already exists.";
pub const DUPLICATE_USERNAME: &str = "User with this username already exists.";
pub const MISSING_REFERENCE: &str = "Referenced category or user does not exist.";

/// Repository Trait
///
/// The persistence contract behind every controller. Handlers only see this trait, so the
/// Postgres store and the in-memory store are interchangeable.
///
/// Conventions shared by all implementations:
/// - `get_*` return `Ok(None)` for a missing id.
/// - `update_*` and `delete_*` return `Ok(false)` when no row carried the id, including a
///   row that vanished between the caller's read and this write.
/// - Unique email/username collisions surface as `AppError::Conflict`, dangling category
///   or user references as `AppError::Validation`.
/// - Search filters are case-sensitive substring matches; sorting follows the static
///   tables in `crate::query`.
#[async_trait]
pub trait Repository: Send + Sync {
    // --- Users ---
    async fn search_users(&self, search: &UserSearch, page: PageRequest) -> AppResult<Page<User>>;
    async fn get_user(&self, id: i32) -> AppResult<Option<User>>;
    async fn find_user_by_email(&self, email: &str) -> AppResult<Option<User>>;
    async fn email_exists(&self, email: &str) -> AppResult<bool>;
    async fn username_exists(&self, username: &str) -> AppResult<bool>;
    /// Inserts `user`, ignoring its `id`, and returns the stored row.
    async fn create_user(&self, user: User) -> AppResult<User>;
    async fn update_user(&self, user: User) -> AppResult<bool>;
    async fn delete_user(&self, id: i32) -> AppResult<bool>;

    // --- Categories ---
    async fn search_categories(
        &self,
        search: &CategorySearch,
        page: PageRequest,
    ) -> AppResult<Page<Category>>;
    async fn list_categories(&self) -> AppResult<Vec<Category>>;
    async fn get_category(&self, id: i32) -> AppResult<Option<Category>>;
    async fn create_category(&self, category: Category) -> AppResult<Category>;
    async fn update_category(&self, category: Category) -> AppResult<bool>;
    /// Deleting a category also deletes its items.
    async fn delete_category(&self, id: i32) -> AppResult<bool>;

    // --- Items ---
    async fn search_items(
        &self,
        search: &ItemSearch,
        page: PageRequest,
    ) -> AppResult<Page<ItemDetails>>;
    async fn list_items(&self) -> AppResult<Vec<ItemDetails>>;
    async fn get_item(&self, id: i32) -> AppResult<Option<ItemDetails>>;
    async fn create_item(&self, item: Item) -> AppResult<Item>;
    async fn update_item(&self, item: Item) -> AppResult<bool>;
    async fn delete_item(&self, id: i32) -> AppResult<bool>;
}

/// RepositoryState
///
/// The concrete type used to share the persistence layer across the application state.
pub type RepositoryState = Arc<dyn Repository>;
