use std::collections::BTreeMap;

use async_trait::async_trait;
use tokio::sync::RwLock;

use super::{DUPLICATE_EMAIL, DUPLICATE_USERNAME, MISSING_REFERENCE, Repository};
use crate::{
    error::{AppError, AppResult},
    models::{
        Category, CategorySearch, CategorySummary, Item, ItemDetails, ItemSearch, User,
        UserSearch, UserSummary,
    },
    query::{
        CATEGORY_SORT, ITEM_SORT, Page, PageRequest, USER_SORT, active_filter, contains,
    },
};

#[derive(Default)]
struct Store {
    users: BTreeMap<i32, User>,
    categories: BTreeMap<i32, Category>,
    items: BTreeMap<i32, Item>,
    // Identity counters never move backwards, like SERIAL columns.
    last_user_id: i32,
    last_category_id: i32,
    last_item_id: i32,
}

impl Store {
    /// Rejects an email or username already held by a different user.
    fn check_user_unique(&self, user: &User) -> AppResult<()> {
        let mut others = self.users.values().filter(|other| other.id != user.id);
        if others.clone().any(|other| other.email == user.email) {
            return Err(AppError::Conflict(DUPLICATE_EMAIL.to_string()));
        }
        if others.any(|other| other.username == user.username) {
            return Err(AppError::Conflict(DUPLICATE_USERNAME.to_string()));
        }
        Ok(())
    }

    fn check_item_references(&self, item: &Item) -> AppResult<()> {
        let category_ok = self.categories.contains_key(&item.category_id);
        let user_ok = item.user_id.is_none_or(|id| self.users.contains_key(&id));
        if category_ok && user_ok {
            Ok(())
        } else {
            Err(AppError::Validation(MISSING_REFERENCE.to_string()))
        }
    }

    fn details(&self, item: &Item) -> ItemDetails {
        ItemDetails {
            item: item.clone(),
            user: item
                .user_id
                .and_then(|id| self.users.get(&id))
                .map(UserSummary::from),
            category: self
                .categories
                .get(&item.category_id)
                .map(CategorySummary::from),
        }
    }
}

/// Filters, sorts, then pages. `total` is counted before paging.
fn paged<T: Clone>(mut rows: Vec<T>, sort: impl FnOnce(&mut [T]), page: PageRequest) -> Page<T> {
    sort(&mut rows);
    Page {
        total: rows.len() as i64,
        rows: page.slice(&rows),
    }
}

/// InMemoryRepository
///
/// A process-local implementation of `Repository` with the same observable semantics as
/// the Postgres store: SERIAL-style ids, unique email/username, referential checks on items,
/// cascade on category delete and detach on user delete. Used by the test suites and for
/// running the API without a database.
#[derive(Default)]
pub struct InMemoryRepository {
    store: RwLock<Store>,
}

impl InMemoryRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl Repository for InMemoryRepository {
    // --- USERS ---

    async fn search_users(&self, search: &UserSearch, page: PageRequest) -> AppResult<Page<User>> {
        let store = self.store.read().await;
        let first_name = active_filter(&search.first_name);
        let last_name = active_filter(&search.last_name);

        let rows: Vec<User> = store
            .users
            .values()
            .filter(|user| contains(Some(user.first_name.as_str()), first_name))
            .filter(|user| contains(Some(user.last_name.as_str()), last_name))
            .cloned()
            .collect();

        let order = USER_SORT.order(search.sort_by.as_deref(), search.is_descending);
        Ok(paged(rows, |rows| order.sort(rows), page))
    }

    async fn get_user(&self, id: i32) -> AppResult<Option<User>> {
        Ok(self.store.read().await.users.get(&id).cloned())
    }

    async fn find_user_by_email(&self, email: &str) -> AppResult<Option<User>> {
        let store = self.store.read().await;
        Ok(store.users.values().find(|user| user.email == email).cloned())
    }

    async fn email_exists(&self, email: &str) -> AppResult<bool> {
        let store = self.store.read().await;
        Ok(store.users.values().any(|user| user.email == email))
    }

    async fn username_exists(&self, username: &str) -> AppResult<bool> {
        let store = self.store.read().await;
        Ok(store.users.values().any(|user| user.username == username))
    }

    async fn create_user(&self, mut user: User) -> AppResult<User> {
        let mut store = self.store.write().await;
        user.id = 0;
        store.check_user_unique(&user)?;

        store.last_user_id += 1;
        user.id = store.last_user_id;
        store.users.insert(user.id, user.clone());
        Ok(user)
    }

    async fn update_user(&self, user: User) -> AppResult<bool> {
        let mut store = self.store.write().await;
        if !store.users.contains_key(&user.id) {
            return Ok(false);
        }
        store.check_user_unique(&user)?;
        store.users.insert(user.id, user);
        Ok(true)
    }

    async fn delete_user(&self, id: i32) -> AppResult<bool> {
        let mut store = self.store.write().await;
        if store.users.remove(&id).is_none() {
            return Ok(false);
        }
        for item in store.items.values_mut() {
            if item.user_id == Some(id) {
                item.user_id = None;
            }
        }
        Ok(true)
    }

    // --- CATEGORIES ---

    async fn search_categories(
        &self,
        search: &CategorySearch,
        page: PageRequest,
    ) -> AppResult<Page<Category>> {
        let store = self.store.read().await;
        let name = active_filter(&search.name);
        let description = active_filter(&search.description);

        let rows: Vec<Category> = store
            .categories
            .values()
            .filter(|category| contains(Some(category.name.as_str()), name))
            .filter(|category| contains(category.description.as_deref(), description))
            .cloned()
            .collect();

        let order = CATEGORY_SORT.order(search.sort_by.as_deref(), search.is_descending);
        Ok(paged(rows, |rows| order.sort(rows), page))
    }

    async fn list_categories(&self) -> AppResult<Vec<Category>> {
        Ok(self.store.read().await.categories.values().cloned().collect())
    }

    async fn get_category(&self, id: i32) -> AppResult<Option<Category>> {
        Ok(self.store.read().await.categories.get(&id).cloned())
    }

    async fn create_category(&self, mut category: Category) -> AppResult<Category> {
        let mut store = self.store.write().await;
        store.last_category_id += 1;
        category.id = store.last_category_id;
        store.categories.insert(category.id, category.clone());
        Ok(category)
    }

    async fn update_category(&self, category: Category) -> AppResult<bool> {
        let mut store = self.store.write().await;
        match store.categories.get_mut(&category.id) {
            Some(slot) => {
                *slot = category;
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn delete_category(&self, id: i32) -> AppResult<bool> {
        let mut store = self.store.write().await;
        if store.categories.remove(&id).is_none() {
            return Ok(false);
        }
        store.items.retain(|_, item| item.category_id != id);
        Ok(true)
    }

    // --- ITEMS ---

    async fn search_items(
        &self,
        search: &ItemSearch,
        page: PageRequest,
    ) -> AppResult<Page<ItemDetails>> {
        let store = self.store.read().await;
        let name = active_filter(&search.name);
        let location = active_filter(&search.location);

        let rows: Vec<ItemDetails> = store
            .items
            .values()
            .filter(|item| contains(Some(item.name.as_str()), name))
            .filter(|item| contains(item.location.as_deref(), location))
            .map(|item| store.details(item))
            .collect();

        let order = ITEM_SORT.order(search.sort_by.as_deref(), search.is_descending);
        Ok(paged(rows, |rows| order.sort(rows), page))
    }

    async fn list_items(&self) -> AppResult<Vec<ItemDetails>> {
        let store = self.store.read().await;
        Ok(store.items.values().map(|item| store.details(item)).collect())
    }

    async fn get_item(&self, id: i32) -> AppResult<Option<ItemDetails>> {
        let store = self.store.read().await;
        Ok(store.items.get(&id).map(|item| store.details(item)))
    }

    async fn create_item(&self, mut item: Item) -> AppResult<Item> {
        let mut store = self.store.write().await;
        store.check_item_references(&item)?;

        store.last_item_id += 1;
        item.id = store.last_item_id;
        store.items.insert(item.id, item.clone());
        Ok(item)
    }

    async fn update_item(&self, item: Item) -> AppResult<bool> {
        let mut store = self.store.write().await;
        if !store.items.contains_key(&item.id) {
            return Ok(false);
        }
        store.check_item_references(&item)?;
        store.items.insert(item.id, item);
        Ok(true)
    }

    async fn delete_item(&self, id: i32) -> AppResult<bool> {
        Ok(self.store.write().await.items.remove(&id).is_some())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};

    fn user(email: &str, username: &str) -> User {
        User {
            email: email.to_string(),
            username: username.to_string(),
            first_name: "Ada".to_string(),
            last_name: "Lovelace".to_string(),
            ..User::default()
        }
    }

    fn item(name: &str, category_id: i32, user_id: Option<i32>) -> Item {
        Item {
            id: 0,
            name: name.to_string(),
            description: None,
            date_found_or_lost: Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap(),
            location: Some("Library".to_string()),
            estimated_value: 10.0,
            is_claimed: false,
            user_id,
            category_id,
        }
    }

    #[tokio::test]
    async fn test_ids_are_not_reused_after_delete() {
        let repo = InMemoryRepository::new();
        let first = repo
            .create_category(Category {
                name: "Keys".to_string(),
                ..Category::default()
            })
            .await
            .unwrap();
        assert!(repo.delete_category(first.id).await.unwrap());

        let second = repo
            .create_category(Category {
                name: "Bags".to_string(),
                ..Category::default()
            })
            .await
            .unwrap();
        assert_eq!(second.id, first.id + 1);
    }

    #[tokio::test]
    async fn test_user_uniqueness_excludes_self() {
        let repo = InMemoryRepository::new();
        let ada = repo.create_user(user("ada@example.com", "ada")).await.unwrap();
        repo.create_user(user("bob@example.com", "bob")).await.unwrap();

        let mut renamed = ada.clone();
        renamed.first_name = "Augusta".to_string();
        assert!(repo.update_user(renamed).await.unwrap());

        let mut clash = ada.clone();
        clash.username = "bob".to_string();
        assert!(matches!(
            repo.update_user(clash).await,
            Err(AppError::Conflict(msg)) if msg == DUPLICATE_USERNAME
        ));

        assert!(matches!(
            repo.create_user(user("ada@example.com", "other")).await,
            Err(AppError::Conflict(msg)) if msg == DUPLICATE_EMAIL
        ));
    }

    #[tokio::test]
    async fn test_category_delete_cascades_and_user_delete_detaches() {
        let repo = InMemoryRepository::new();
        let owner = repo.create_user(user("o@example.com", "owner")).await.unwrap();
        let keys = repo
            .create_category(Category {
                name: "Keys".to_string(),
                ..Category::default()
            })
            .await
            .unwrap();
        let bags = repo
            .create_category(Category {
                name: "Bags".to_string(),
                ..Category::default()
            })
            .await
            .unwrap();
        let key = repo.create_item(item("Key", keys.id, Some(owner.id))).await.unwrap();
        let bag = repo.create_item(item("Bag", bags.id, Some(owner.id))).await.unwrap();

        assert!(repo.delete_user(owner.id).await.unwrap());
        let detached = repo.get_item(bag.id).await.unwrap().unwrap();
        assert_eq!(detached.item.user_id, None);
        assert!(detached.user.is_none());

        assert!(repo.delete_category(keys.id).await.unwrap());
        assert!(repo.get_item(key.id).await.unwrap().is_none());
        assert!(repo.get_item(bag.id).await.unwrap().is_some());
    }

    #[tokio::test]
    async fn test_item_references_are_checked() {
        let repo = InMemoryRepository::new();
        assert!(matches!(
            repo.create_item(item("Orphan", 99, None)).await,
            Err(AppError::Validation(_))
        ));

        let category = repo
            .create_category(Category {
                name: "Misc".to_string(),
                ..Category::default()
            })
            .await
            .unwrap();
        assert!(matches!(
            repo.create_item(item("Ghost owner", category.id, Some(7))).await,
            Err(AppError::Validation(_))
        ));
    }

    #[tokio::test]
    async fn test_missing_rows_report_false() {
        let repo = InMemoryRepository::new();
        assert!(!repo.delete_item(1).await.unwrap());
        assert!(!repo.delete_user(1).await.unwrap());
        assert!(
            !repo
                .update_category(Category {
                    id: 5,
                    name: "Nope".to_string(),
                    ..Category::default()
                })
                .await
                .unwrap()
        );
    }
}
