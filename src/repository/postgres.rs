use async_trait::async_trait;
use sqlx::{PgPool, Postgres, QueryBuilder};

use super::{DUPLICATE_EMAIL, DUPLICATE_USERNAME, MISSING_REFERENCE, Repository};
use crate::{
    error::{AppError, AppResult},
    models::{
        Category, CategorySearch, Item, ItemDetails, ItemDetailsRow, ItemSearch, User, UserSearch,
    },
    query::{
        CATEGORY_SORT, ITEM_SORT, Page, PageRequest, USER_SORT, active_filter, push_contains,
        push_page,
    },
};

const USER_SELECT: &str = r#"
    SELECT id, first_name, last_name, email, username, password, phone_number,
           date_registered, is_active, profile_picture_url
    FROM users
    WHERE TRUE"#;

const CATEGORY_SELECT: &str = r#"
    SELECT id, name, description, priority_level, is_active, average_value, total_items_found
    FROM categories
    WHERE TRUE"#;

/// Items LEFT JOINed to their owner and category; `u_*`/`c_*` columns feed `ItemDetailsRow`.
const ITEM_DETAILS_SELECT: &str = r#"
    SELECT i.id, i.name, i.description, i.date_found_or_lost, i.location,
           i.estimated_value, i.is_claimed, i.user_id, i.category_id,
           u.username AS u_username, u.first_name AS u_first_name,
           u.last_name AS u_last_name, u.email AS u_email,
           c.name AS c_name, c.description AS c_description,
           c.priority_level AS c_priority_level, c.is_active AS c_is_active
    FROM items i
    LEFT JOIN users u ON u.id = i.user_id
    LEFT JOIN categories c ON c.id = i.category_id
    WHERE TRUE"#;

/// Translates constraint violations raised by writes into the shared taxonomy.
fn map_write_error(e: sqlx::Error) -> AppError {
    if let Some(db) = e.as_database_error() {
        if db.is_unique_violation() {
            let message = match db.constraint() {
                Some("users_username_key") => DUPLICATE_USERNAME,
                _ => DUPLICATE_EMAIL,
            };
            return AppError::Conflict(message.to_string());
        }
        if db.is_foreign_key_violation() {
            return AppError::Validation(MISSING_REFERENCE.to_string());
        }
    }
    AppError::Database(e)
}

fn push_user_filters(builder: &mut QueryBuilder<'_, Postgres>, search: &UserSearch) {
    push_contains(builder, "first_name", active_filter(&search.first_name));
    push_contains(builder, "last_name", active_filter(&search.last_name));
}

fn push_category_filters(builder: &mut QueryBuilder<'_, Postgres>, search: &CategorySearch) {
    push_contains(builder, "name", active_filter(&search.name));
    push_contains(builder, "description", active_filter(&search.description));
}

fn push_item_filters(builder: &mut QueryBuilder<'_, Postgres>, search: &ItemSearch) {
    push_contains(builder, "i.name", active_filter(&search.name));
    push_contains(builder, "i.location", active_filter(&search.location));
}

/// PostgresRepository
///
/// The production implementation of `Repository`, backed by a pooled Postgres connection.
/// Dynamic searches go through `QueryBuilder` so every user-supplied value is a bind
/// parameter.
pub struct PostgresRepository {
    pool: PgPool,
}

impl PostgresRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl Repository for PostgresRepository {
    // --- USERS ---

    /// Counts with the filters alone, then fetches the ordered page with the same filters.
    async fn search_users(&self, search: &UserSearch, page: PageRequest) -> AppResult<Page<User>> {
        let mut count: QueryBuilder<Postgres> =
            QueryBuilder::new("SELECT COUNT(*) FROM users WHERE TRUE");
        push_user_filters(&mut count, search);
        let total: i64 = count.build_query_scalar().fetch_one(&self.pool).await?;

        let mut select: QueryBuilder<Postgres> = QueryBuilder::new(USER_SELECT);
        push_user_filters(&mut select, search);
        USER_SORT
            .order(search.sort_by.as_deref(), search.is_descending)
            .push_order_by(&mut select);
        push_page(&mut select, page);
        let rows = select.build_query_as::<User>().fetch_all(&self.pool).await?;

        Ok(Page { rows, total })
    }

    async fn get_user(&self, id: i32) -> AppResult<Option<User>> {
        let mut select: QueryBuilder<Postgres> = QueryBuilder::new(USER_SELECT);
        select.push(" AND id = ").push_bind(id);
        Ok(select.build_query_as::<User>().fetch_optional(&self.pool).await?)
    }

    async fn find_user_by_email(&self, email: &str) -> AppResult<Option<User>> {
        let mut select: QueryBuilder<Postgres> = QueryBuilder::new(USER_SELECT);
        select.push(" AND email = ").push_bind(email.to_string());
        Ok(select.build_query_as::<User>().fetch_optional(&self.pool).await?)
    }

    async fn email_exists(&self, email: &str) -> AppResult<bool> {
        Ok(
            sqlx::query_scalar::<_, bool>("SELECT EXISTS(SELECT 1 FROM users WHERE email = $1)")
                .bind(email)
                .fetch_one(&self.pool)
                .await?,
        )
    }

    async fn username_exists(&self, username: &str) -> AppResult<bool> {
        Ok(
            sqlx::query_scalar::<_, bool>("SELECT EXISTS(SELECT 1 FROM users WHERE username = $1)")
                .bind(username)
                .fetch_one(&self.pool)
                .await?,
        )
    }

    async fn create_user(&self, user: User) -> AppResult<User> {
        sqlx::query_as::<_, User>(
            r#"
            INSERT INTO users (first_name, last_name, email, username, password, phone_number,
                               date_registered, is_active, profile_picture_url)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
            RETURNING id, first_name, last_name, email, username, password, phone_number,
                      date_registered, is_active, profile_picture_url
            "#,
        )
        .bind(user.first_name)
        .bind(user.last_name)
        .bind(user.email)
        .bind(user.username)
        .bind(user.password_hash)
        .bind(user.phone_number)
        .bind(user.date_registered)
        .bind(user.is_active)
        .bind(user.profile_picture_url)
        .fetch_one(&self.pool)
        .await
        .map_err(map_write_error)
    }

    /// Full-row replace. Zero affected rows means the id is gone.
    async fn update_user(&self, user: User) -> AppResult<bool> {
        let result = sqlx::query(
            r#"
            UPDATE users
            SET first_name = $2, last_name = $3, email = $4, username = $5, password = $6,
                phone_number = $7, date_registered = $8, is_active = $9,
                profile_picture_url = $10
            WHERE id = $1
            "#,
        )
        .bind(user.id)
        .bind(user.first_name)
        .bind(user.last_name)
        .bind(user.email)
        .bind(user.username)
        .bind(user.password_hash)
        .bind(user.phone_number)
        .bind(user.date_registered)
        .bind(user.is_active)
        .bind(user.profile_picture_url)
        .execute(&self.pool)
        .await
        .map_err(map_write_error)?;
        Ok(result.rows_affected() > 0)
    }

    /// Items owned by the user are detached (`ON DELETE SET NULL`).
    async fn delete_user(&self, id: i32) -> AppResult<bool> {
        let result = sqlx::query("DELETE FROM users WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    // --- CATEGORIES ---

    async fn search_categories(
        &self,
        search: &CategorySearch,
        page: PageRequest,
    ) -> AppResult<Page<Category>> {
        let mut count: QueryBuilder<Postgres> =
            QueryBuilder::new("SELECT COUNT(*) FROM categories WHERE TRUE");
        push_category_filters(&mut count, search);
        let total: i64 = count.build_query_scalar().fetch_one(&self.pool).await?;

        let mut select: QueryBuilder<Postgres> = QueryBuilder::new(CATEGORY_SELECT);
        push_category_filters(&mut select, search);
        CATEGORY_SORT
            .order(search.sort_by.as_deref(), search.is_descending)
            .push_order_by(&mut select);
        push_page(&mut select, page);
        let rows = select
            .build_query_as::<Category>()
            .fetch_all(&self.pool)
            .await?;

        Ok(Page { rows, total })
    }

    async fn list_categories(&self) -> AppResult<Vec<Category>> {
        let mut select: QueryBuilder<Postgres> = QueryBuilder::new(CATEGORY_SELECT);
        select.push(" ORDER BY id");
        Ok(select
            .build_query_as::<Category>()
            .fetch_all(&self.pool)
            .await?)
    }

    async fn get_category(&self, id: i32) -> AppResult<Option<Category>> {
        let mut select: QueryBuilder<Postgres> = QueryBuilder::new(CATEGORY_SELECT);
        select.push(" AND id = ").push_bind(id);
        Ok(select
            .build_query_as::<Category>()
            .fetch_optional(&self.pool)
            .await?)
    }

    async fn create_category(&self, category: Category) -> AppResult<Category> {
        sqlx::query_as::<_, Category>(
            r#"
            INSERT INTO categories (name, description, priority_level, is_active,
                                    average_value, total_items_found)
            VALUES ($1, $2, $3, $4, $5, $6)
            RETURNING id, name, description, priority_level, is_active, average_value,
                      total_items_found
            "#,
        )
        .bind(category.name)
        .bind(category.description)
        .bind(category.priority_level)
        .bind(category.is_active)
        .bind(category.average_value)
        .bind(category.total_items_found)
        .fetch_one(&self.pool)
        .await
        .map_err(map_write_error)
    }

    async fn update_category(&self, category: Category) -> AppResult<bool> {
        let result = sqlx::query(
            r#"
            UPDATE categories
            SET name = $2, description = $3, priority_level = $4, is_active = $5,
                average_value = $6, total_items_found = $7
            WHERE id = $1
            "#,
        )
        .bind(category.id)
        .bind(category.name)
        .bind(category.description)
        .bind(category.priority_level)
        .bind(category.is_active)
        .bind(category.average_value)
        .bind(category.total_items_found)
        .execute(&self.pool)
        .await
        .map_err(map_write_error)?;
        Ok(result.rows_affected() > 0)
    }

    /// Items in the category go with it (`ON DELETE CASCADE`).
    async fn delete_category(&self, id: i32) -> AppResult<bool> {
        let result = sqlx::query("DELETE FROM categories WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    // --- ITEMS ---

    async fn search_items(
        &self,
        search: &ItemSearch,
        page: PageRequest,
    ) -> AppResult<Page<ItemDetails>> {
        let mut count: QueryBuilder<Postgres> =
            QueryBuilder::new("SELECT COUNT(*) FROM items i WHERE TRUE");
        push_item_filters(&mut count, search);
        let total: i64 = count.build_query_scalar().fetch_one(&self.pool).await?;

        let mut select: QueryBuilder<Postgres> = QueryBuilder::new(ITEM_DETAILS_SELECT);
        push_item_filters(&mut select, search);
        ITEM_SORT
            .order(search.sort_by.as_deref(), search.is_descending)
            .push_order_by(&mut select);
        push_page(&mut select, page);
        let rows = select
            .build_query_as::<ItemDetailsRow>()
            .fetch_all(&self.pool)
            .await?;

        Ok(Page {
            rows: rows.into_iter().map(ItemDetails::from).collect(),
            total,
        })
    }

    async fn list_items(&self) -> AppResult<Vec<ItemDetails>> {
        let mut select: QueryBuilder<Postgres> = QueryBuilder::new(ITEM_DETAILS_SELECT);
        select.push(" ORDER BY i.id");
        let rows = select
            .build_query_as::<ItemDetailsRow>()
            .fetch_all(&self.pool)
            .await?;
        Ok(rows.into_iter().map(ItemDetails::from).collect())
    }

    async fn get_item(&self, id: i32) -> AppResult<Option<ItemDetails>> {
        let mut select: QueryBuilder<Postgres> = QueryBuilder::new(ITEM_DETAILS_SELECT);
        select.push(" AND i.id = ").push_bind(id);
        let row = select
            .build_query_as::<ItemDetailsRow>()
            .fetch_optional(&self.pool)
            .await?;
        Ok(row.map(ItemDetails::from))
    }

    async fn create_item(&self, item: Item) -> AppResult<Item> {
        sqlx::query_as::<_, Item>(
            r#"
            INSERT INTO items (name, description, date_found_or_lost, location,
                               estimated_value, is_claimed, user_id, category_id)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            RETURNING id, name, description, date_found_or_lost, location, estimated_value,
                      is_claimed, user_id, category_id
            "#,
        )
        .bind(item.name)
        .bind(item.description)
        .bind(item.date_found_or_lost)
        .bind(item.location)
        .bind(item.estimated_value)
        .bind(item.is_claimed)
        .bind(item.user_id)
        .bind(item.category_id)
        .fetch_one(&self.pool)
        .await
        .map_err(map_write_error)
    }

    async fn update_item(&self, item: Item) -> AppResult<bool> {
        let result = sqlx::query(
            r#"
            UPDATE items
            SET name = $2, description = $3, date_found_or_lost = $4, location = $5,
                estimated_value = $6, is_claimed = $7, user_id = $8, category_id = $9
            WHERE id = $1
            "#,
        )
        .bind(item.id)
        .bind(item.name)
        .bind(item.description)
        .bind(item.date_found_or_lost)
        .bind(item.location)
        .bind(item.estimated_value)
        .bind(item.is_claimed)
        .bind(item.user_id)
        .bind(item.category_id)
        .execute(&self.pool)
        .await
        .map_err(map_write_error)?;
        Ok(result.rows_affected() > 0)
    }

    async fn delete_item(&self, id: i32) -> AppResult<bool> {
        let result = sqlx::query("DELETE FROM items WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }
}
