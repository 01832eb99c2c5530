use std::cmp::Ordering;

use sqlx::{Postgres, QueryBuilder};

use crate::{
    error::{AppError, AppResult},
    models::{Category, ItemDetails, User},
};

// --- Paging ---

/// PageRequest
///
/// A validated 1-based page. Both bounds are checked up front so that skip/take never
/// sees a negative or zero value.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageRequest {
    pub page_number: i64,
    pub page_size: i64,
}

impl PageRequest {
    pub fn new(page_number: i64, page_size: i64) -> AppResult<Self> {
        if page_number < 1 {
            return Err(AppError::Validation(
                "pageNumber must be at least 1.".to_string(),
            ));
        }
        if page_size < 1 {
            return Err(AppError::Validation(
                "pageSize must be at least 1.".to_string(),
            ));
        }
        Ok(Self {
            page_number,
            page_size,
        })
    }

    /// Rows to skip: `(pageNumber - 1) * pageSize`, saturating on absurd inputs.
    pub fn offset(&self) -> i64 {
        (self.page_number - 1).saturating_mul(self.page_size)
    }

    pub fn limit(&self) -> i64 {
        self.page_size
    }

    /// Applies skip/take to an already filtered and sorted slice.
    pub fn slice<T: Clone>(&self, rows: &[T]) -> Vec<T> {
        let skip = usize::try_from(self.offset()).unwrap_or(usize::MAX);
        let take = usize::try_from(self.limit()).unwrap_or(usize::MAX);
        rows.iter().skip(skip).take(take).cloned().collect()
    }
}

/// Page
///
/// One page of rows plus the number of rows that matched before paging.
#[derive(Debug, Clone)]
pub struct Page<T> {
    pub rows: Vec<T>,
    pub total: i64,
}

// --- Sorting ---

/// SortKey
///
/// One entry of a sort table: the canonical lower-case key accepted in `sortBy`, the SQL
/// column it orders by, and the equivalent comparator for in-memory rows.
pub struct SortKey<T: 'static> {
    pub name: &'static str,
    pub column: &'static str,
    pub compare: fn(&T, &T) -> Ordering,
}

/// SortTable
///
/// The fixed allow-list of sort keys for one resource. `default` indexes the entry used
/// when `sortBy` is absent or unrecognized.
pub struct SortTable<T: 'static> {
    pub keys: &'static [SortKey<T>],
    pub default: usize,
    /// Tie breaker column, always applied last in the same direction.
    pub id_column: &'static str,
    pub id_of: fn(&T) -> i32,
}

impl<T> SortTable<T> {
    /// Case-insensitive lookup with fallback to the default entry.
    pub fn resolve(&self, requested: Option<&str>) -> &'static SortKey<T> {
        requested
            .map(str::to_lowercase)
            .and_then(|wanted| self.keys.iter().find(|key| key.name == wanted))
            .unwrap_or(&self.keys[self.default])
    }

    pub fn order(&'static self, requested: Option<&str>, descending: bool) -> SortOrder<T> {
        SortOrder {
            table: self,
            key: self.resolve(requested),
            descending,
        }
    }
}

/// SortOrder
///
/// A resolved key plus direction, applicable either as SQL or to a slice.
pub struct SortOrder<T: 'static> {
    table: &'static SortTable<T>,
    pub key: &'static SortKey<T>,
    pub descending: bool,
}

impl<T> SortOrder<T> {
    fn direction(&self) -> &'static str {
        if self.descending { "DESC" } else { "ASC" }
    }

    /// Appends ` ORDER BY <column> <dir>, <id> <dir>`. Columns come from the static table,
    /// never from the request.
    pub fn push_order_by(&self, builder: &mut QueryBuilder<'_, Postgres>) {
        let dir = self.direction();
        builder.push(format!(
            " ORDER BY {} {}, {} {}",
            self.key.column, dir, self.table.id_column, dir
        ));
    }

    pub fn sort(&self, rows: &mut [T]) {
        let id_of = self.table.id_of;
        rows.sort_by(|a, b| {
            let ordering = (self.key.compare)(a, b).then_with(|| id_of(a).cmp(&id_of(b)));
            if self.descending { ordering.reverse() } else { ordering }
        });
    }
}

pub static USER_SORT: SortTable<User> = SortTable {
    keys: &[
        SortKey {
            name: "firstname",
            column: "first_name",
            compare: |a, b| a.first_name.cmp(&b.first_name),
        },
        SortKey {
            name: "lastname",
            column: "last_name",
            compare: |a, b| a.last_name.cmp(&b.last_name),
        },
        SortKey {
            name: "dateregistered",
            column: "date_registered",
            compare: |a, b| a.date_registered.cmp(&b.date_registered),
        },
    ],
    default: 0,
    id_column: "id",
    id_of: |user| user.id,
};

pub static CATEGORY_SORT: SortTable<Category> = SortTable {
    keys: &[
        SortKey {
            name: "name",
            column: "name",
            compare: |a, b| a.name.cmp(&b.name),
        },
        SortKey {
            name: "prioritylevel",
            column: "priority_level",
            compare: |a, b| a.priority_level.cmp(&b.priority_level),
        },
        SortKey {
            name: "averagevalue",
            column: "average_value",
            compare: |a, b| a.average_value.total_cmp(&b.average_value),
        },
    ],
    default: 0,
    id_column: "id",
    id_of: |category| category.id,
};

pub static ITEM_SORT: SortTable<ItemDetails> = SortTable {
    keys: &[
        SortKey {
            name: "name",
            column: "i.name",
            compare: |a, b| a.item.name.cmp(&b.item.name),
        },
        SortKey {
            name: "estimatedvalue",
            column: "i.estimated_value",
            compare: |a, b| a.item.estimated_value.total_cmp(&b.item.estimated_value),
        },
        SortKey {
            name: "datefoundorlost",
            column: "i.date_found_or_lost",
            compare: |a, b| a.item.date_found_or_lost.cmp(&b.item.date_found_or_lost),
        },
    ],
    default: 2,
    id_column: "i.id",
    id_of: |details| details.item.id,
};

// --- Filtering ---

/// Treats absent, empty and whitespace-only filters alike: no restriction.
pub fn active_filter(filter: &Option<String>) -> Option<&str> {
    filter.as_deref().filter(|text| !text.trim().is_empty())
}

/// Case-sensitive substring test used by the in-memory store. A NULL column never matches.
pub fn contains(column: Option<&str>, filter: Option<&str>) -> bool {
    match filter {
        None => true,
        Some(needle) => column.is_some_and(|haystack| haystack.contains(needle)),
    }
}

/// Escapes LIKE metacharacters so the filter text is matched literally.
pub fn like_pattern(filter: &str) -> String {
    let mut pattern = String::with_capacity(filter.len() + 2);
    pattern.push('%');
    for ch in filter.chars() {
        if matches!(ch, '\\' | '%' | '_') {
            pattern.push('\\');
        }
        pattern.push(ch);
    }
    pattern.push('%');
    pattern
}

/// Appends ` AND <column> LIKE '%filter%'` when the filter is active.
pub fn push_contains<'a>(
    builder: &mut QueryBuilder<'a, Postgres>,
    column: &'static str,
    filter: Option<&str>,
) {
    if let Some(text) = filter {
        builder.push(format!(" AND {} LIKE ", column));
        builder.push_bind(like_pattern(text));
        builder.push(" ESCAPE '\\'");
    }
}

/// Appends ` LIMIT <take> OFFSET <skip>`.
pub fn push_page<'a>(builder: &mut QueryBuilder<'a, Postgres>, page: PageRequest) {
    builder.push(" LIMIT ");
    builder.push_bind(page.limit());
    builder.push(" OFFSET ");
    builder.push_bind(page.offset());
}

#[cfg(test)]
mod tests {
    use super::*;

    fn category(id: i32, name: &str, priority: i32, value: f64) -> Category {
        Category {
            id,
            name: name.to_string(),
            priority_level: priority,
            average_value: value,
            ..Category::default()
        }
    }

    #[test]
    fn test_page_request_rejects_non_positive_bounds() {
        assert!(PageRequest::new(0, 10).is_err());
        assert!(PageRequest::new(1, 0).is_err());
        assert!(PageRequest::new(-3, 5).is_err());
        assert!(PageRequest::new(1, 1).is_ok());
    }

    #[test]
    fn test_offset_and_slice() {
        let rows: Vec<i32> = (1..=23).collect();
        let page = PageRequest::new(3, 10).unwrap();
        assert_eq!(page.offset(), 20);
        assert_eq!(page.slice(&rows), vec![21, 22, 23]);

        let beyond = PageRequest::new(4, 10).unwrap();
        assert!(beyond.slice(&rows).is_empty());
    }

    #[test]
    fn test_offset_saturates() {
        let page = PageRequest::new(i64::MAX, i64::MAX).unwrap();
        assert_eq!(page.offset(), i64::MAX);
        assert!(page.slice(&[1, 2, 3]).is_empty());
    }

    #[test]
    fn test_sort_key_resolution_is_case_insensitive() {
        assert_eq!(CATEGORY_SORT.resolve(Some("PriorityLevel")).name, "prioritylevel");
        assert_eq!(USER_SORT.resolve(Some("LASTNAME")).name, "lastname");
        assert_eq!(ITEM_SORT.resolve(Some("estimatedValue")).name, "estimatedvalue");
    }

    #[test]
    fn test_unknown_sort_key_falls_back_to_default() {
        assert_eq!(CATEGORY_SORT.resolve(Some("bogus")).name, "name");
        assert_eq!(USER_SORT.resolve(None).name, "firstname");
        assert_eq!(ITEM_SORT.resolve(Some("")).name, "datefoundorlost");
    }

    #[test]
    fn test_sort_uses_id_as_tie_breaker() {
        let mut rows = vec![
            category(3, "Keys", 2, 5.0),
            category(1, "Bags", 2, 50.0),
            category(2, "Wallets", 1, 20.0),
        ];
        CATEGORY_SORT.order(Some("prioritylevel"), false).sort(&mut rows);
        let ids: Vec<i32> = rows.iter().map(|c| c.id).collect();
        assert_eq!(ids, vec![2, 1, 3]);

        CATEGORY_SORT.order(Some("averagevalue"), true).sort(&mut rows);
        let ids: Vec<i32> = rows.iter().map(|c| c.id).collect();
        assert_eq!(ids, vec![1, 2, 3]);
    }

    #[test]
    fn test_order_by_sql_uses_table_columns() {
        let mut builder: QueryBuilder<Postgres> = QueryBuilder::new("SELECT * FROM items i");
        ITEM_SORT.order(Some("DROP TABLE"), true).push_order_by(&mut builder);
        assert_eq!(
            builder.sql(),
            "SELECT * FROM items i ORDER BY i.date_found_or_lost DESC, i.id DESC"
        );
    }

    #[test]
    fn test_filters() {
        assert_eq!(active_filter(&Some("  ".to_string())), None);
        assert_eq!(active_filter(&Some("Pho".to_string())), Some("Pho"));
        assert!(contains(Some("Phone"), Some("hon")));
        assert!(!contains(Some("Phone"), Some("PHONE")));
        assert!(!contains(None, Some("x")));
        assert!(contains(None, None));
    }

    #[test]
    fn test_like_pattern_escapes_metacharacters() {
        assert_eq!(like_pattern("50%_off"), "%50\\%\\_off%");
        assert_eq!(like_pattern("a\\b"), "%a\\\\b%");
    }
}
