use chrono::{TimeZone, Utc};
use lost_and_found::{
    AppError,
    models::{Category, CategorySearch, Item, ItemSearch, User},
    query::PageRequest,
    repository::{DUPLICATE_EMAIL, DUPLICATE_USERNAME, PostgresRepository, Repository},
};
use sqlx::PgPool;
use uuid::Uuid;

// --- Test Context and Setup ---

/// Holds the pool for a test run against a real database.
struct DbTestContext {
    pool: PgPool,
}

impl DbTestContext {
    /// Connects and migrates, or returns None when no database is configured so the suite
    /// can run without Postgres.
    async fn setup() -> Option<Self> {
        dotenv::dotenv().ok();

        let Ok(db_url) = std::env::var("DATABASE_URL") else {
            eprintln!("DATABASE_URL not set; skipping Postgres repository tests");
            return None;
        };

        let pool = PgPool::connect(&db_url)
            .await
            .expect("Failed to connect to database for integration tests.");

        sqlx::migrate!("./migrations")
            .run(&pool)
            .await
            .expect("Failed to run database migrations.");

        Some(DbTestContext { pool })
    }

    fn repository(&self) -> PostgresRepository {
        PostgresRepository::new(self.pool.clone())
    }
}

// --- Test Data Helpers ---

/// A short random tag that keeps rows from different runs apart.
fn tag() -> String {
    Uuid::new_v4().simple().to_string()[..8].to_string()
}

fn new_user(tag: &str) -> User {
    User {
        first_name: "Repo".to_string(),
        last_name: format!("Tester{}", tag),
        email: format!("{}@repo.test", tag),
        username: format!("user_{}", tag),
        password_hash: "$argon2id$placeholder".to_string(),
        date_registered: Utc::now(),
        is_active: true,
        ..User::default()
    }
}

fn new_category(name: &str) -> Category {
    Category {
        name: name.to_string(),
        priority_level: 2,
        is_active: true,
        ..Category::default()
    }
}

fn new_item(name: &str, category_id: i32, user_id: Option<i32>, day: u32) -> Item {
    Item {
        id: 0,
        name: name.to_string(),
        description: None,
        date_found_or_lost: Utc.with_ymd_and_hms(2024, 1, day, 9, 0, 0).unwrap(),
        location: Some("Library".to_string()),
        estimated_value: f64::from(day),
        is_claimed: false,
        user_id,
        category_id,
    }
}

// --- Tests ---

#[tokio::test]
async fn test_user_round_trip_and_uniqueness() {
    let Some(ctx) = DbTestContext::setup().await else {
        return;
    };
    let repo = ctx.repository();
    let tag = tag();

    let created = repo.create_user(new_user(&tag)).await.unwrap();
    assert!(created.id > 0);

    let found = repo
        .find_user_by_email(&created.email)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(found.id, created.id);
    assert_eq!(found.password_hash, "$argon2id$placeholder");
    assert!(repo.email_exists(&created.email).await.unwrap());
    assert!(repo.username_exists(&created.username).await.unwrap());

    let mut same_email = new_user(&crate::tag());
    same_email.email = created.email.clone();
    assert!(matches!(
        repo.create_user(same_email).await,
        Err(AppError::Conflict(msg)) if msg == DUPLICATE_EMAIL
    ));

    let mut same_username = new_user(&crate::tag());
    same_username.username = created.username.clone();
    assert!(matches!(
        repo.create_user(same_username).await,
        Err(AppError::Conflict(msg)) if msg == DUPLICATE_USERNAME
    ));

    assert!(repo.delete_user(created.id).await.unwrap());
    assert!(repo.get_user(created.id).await.unwrap().is_none());
    assert!(!repo.delete_user(created.id).await.unwrap());
}

#[tokio::test]
async fn test_item_search_joins_filters_and_pages() {
    let Some(ctx) = DbTestContext::setup().await else {
        return;
    };
    let repo = ctx.repository();
    let tag = tag();

    let owner = repo.create_user(new_user(&tag)).await.unwrap();
    let category = repo
        .create_category(new_category(&format!("Electronics {}", tag)))
        .await
        .unwrap();
    for day in 1..=3 {
        repo.create_item(new_item(
            &format!("Phone {} #{}", tag, day),
            category.id,
            Some(owner.id),
            day,
        ))
        .await
        .unwrap();
    }

    let search = ItemSearch {
        name: Some(format!("Phone {}", tag)),
        sort_by: Some("estimatedValue".to_string()),
        is_descending: true,
        ..ItemSearch::default()
    };
    let page = repo
        .search_items(&search, PageRequest::new(1, 2).unwrap())
        .await
        .unwrap();

    assert_eq!(page.total, 3);
    assert_eq!(page.rows.len(), 2);
    assert_eq!(page.rows[0].item.estimated_value, 3.0);
    assert_eq!(
        page.rows[0].category.as_ref().unwrap().name,
        format!("Electronics {}", tag)
    );
    assert_eq!(page.rows[0].user.as_ref().unwrap().id, owner.id);

    // Case-sensitive
    let upper = ItemSearch {
        name: Some(format!("PHONE {}", tag)),
        ..ItemSearch::default()
    };
    let none = repo
        .search_items(&upper, PageRequest::new(1, 10).unwrap())
        .await
        .unwrap();
    assert_eq!(none.total, 0);

    // User deletion detaches, category deletion cascades.
    assert!(repo.delete_user(owner.id).await.unwrap());
    let detached = repo
        .search_items(&search, PageRequest::new(1, 10).unwrap())
        .await
        .unwrap();
    assert!(detached.rows.iter().all(|row| row.user.is_none()));

    assert!(repo.delete_category(category.id).await.unwrap());
    let gone = repo
        .search_items(&search, PageRequest::new(1, 10).unwrap())
        .await
        .unwrap();
    assert_eq!(gone.total, 0);
}

#[tokio::test]
async fn test_like_metacharacters_match_literally() {
    let Some(ctx) = DbTestContext::setup().await else {
        return;
    };
    let repo = ctx.repository();
    let tag = tag();

    repo.create_category(new_category(&format!("100% wool {}", tag)))
        .await
        .unwrap();
    repo.create_category(new_category(&format!("100 wool {}", tag)))
        .await
        .unwrap();

    let search = CategorySearch {
        name: Some(format!("100% wool {}", tag)),
        ..CategorySearch::default()
    };
    let page = repo
        .search_categories(&search, PageRequest::new(1, 10).unwrap())
        .await
        .unwrap();
    assert_eq!(page.total, 1);
}

#[tokio::test]
async fn test_item_with_unknown_category_is_validation_error() {
    let Some(ctx) = DbTestContext::setup().await else {
        return;
    };
    let repo = ctx.repository();

    let result = repo.create_item(new_item("Orphan", i32::MAX, None, 1)).await;
    assert!(matches!(result, Err(AppError::Validation(_))));
}

#[tokio::test]
async fn test_update_missing_rows_report_false() {
    let Some(ctx) = DbTestContext::setup().await else {
        return;
    };
    let repo = ctx.repository();

    let mut ghost = new_category("Ghost");
    ghost.id = i32::MAX;
    assert!(!repo.update_category(ghost).await.unwrap());
    assert!(!repo.delete_item(i32::MAX).await.unwrap());
}
