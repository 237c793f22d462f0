use std::sync::Arc;

use async_trait::async_trait;
use chrono::NaiveDate;

use crate::error::AppResult;
use crate::models::{
    AdminDashboardStats, Comrade, Law, LawInput, NewComrade, NewStoredFile, News, NewsInput,
    StoredFile, User,
};

mod memory;
mod postgres;

pub use memory::InMemoryRepository;
pub use postgres::PostgresRepository;

pub const DEFAULT_COMRADE_LIMIT: i64 = 50;
pub const DEFAULT_LAW_LIMIT: i64 = 50;
pub const DEFAULT_NEWS_LIMIT: i64 = 20;
pub const DEFAULT_FILE_LIMIT: i64 = 50;

/// ComradeFilter
///
/// Roster search. Text filters are case-insensitive substring matches; `name`
/// matches first, last or middle name. `year_to` also admits comrades whose
/// service end year is unknown.
#[derive(Debug, Clone, PartialEq)]
pub struct ComradeFilter {
    pub name: Option<String>,
    pub unit: Option<String>,
    pub region: Option<String>,
    pub rank: Option<String>,
    pub year_from: Option<i64>,
    pub year_to: Option<i64>,
    pub limit: i64,
    pub offset: i64,
}

impl Default for ComradeFilter {
    fn default() -> Self {
        Self {
            name: None,
            unit: None,
            region: None,
            rank: None,
            year_from: None,
            year_to: None,
            limit: DEFAULT_COMRADE_LIMIT,
            offset: 0,
        }
    }
}

/// LawFilter
///
/// `category` matches the category text in any language, `search` the title or
/// description in any language.
#[derive(Debug, Clone, PartialEq)]
pub struct LawFilter {
    pub category: Option<String>,
    pub search: Option<String>,
    pub limit: i64,
    pub offset: i64,
}

impl Default for LawFilter {
    fn default() -> Self {
        Self {
            category: None,
            search: None,
            limit: DEFAULT_LAW_LIMIT,
            offset: 0,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum NewsSortField {
    #[default]
    Date,
    // Sorts on the Russian title.
    Title,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SortOrder {
    Asc,
    #[default]
    Desc,
}

#[derive(Debug, Clone, PartialEq)]
pub struct NewsFilter {
    pub search: Option<String>,
    pub date_from: Option<NaiveDate>,
    pub date_to: Option<NaiveDate>,
    pub sort_by: NewsSortField,
    pub sort_order: SortOrder,
    pub limit: i64,
    pub offset: i64,
}

impl Default for NewsFilter {
    fn default() -> Self {
        Self {
            search: None,
            date_from: None,
            date_to: None,
            sort_by: NewsSortField::default(),
            sort_order: SortOrder::default(),
            limit: DEFAULT_NEWS_LIMIT,
            offset: 0,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct FileFilter {
    pub file_type: Option<String>,
    pub category: Option<String>,
    pub limit: i64,
    pub offset: i64,
}

impl Default for FileFilter {
    fn default() -> Self {
        Self {
            file_type: None,
            category: None,
            limit: DEFAULT_FILE_LIMIT,
            offset: 0,
        }
    }
}

/// Page
///
/// One page of a filtered listing plus the total number of matches.
#[derive(Debug, Clone, PartialEq)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub total: i64,
}

/// Repository Trait
///
/// Abstract contract for every persistence operation, so handlers never know whether
/// they talk to Postgres or to the in-memory store used by tests.
///
/// Unlike a best-effort store, every method reports failures as [`AppError`](crate::error::AppError):
/// a database outage must surface as a 500, not as an empty list.
#[async_trait]
pub trait Repository: Send + Sync {
    // --- Comrades ---
    async fn list_comrades(&self, filter: &ComradeFilter) -> AppResult<Page<Comrade>>;
    async fn get_comrade(&self, id: i64) -> AppResult<Option<Comrade>>;
    async fn create_comrade(&self, comrade: NewComrade) -> AppResult<Comrade>;
    // Full replacement. `None` when the id does not exist.
    async fn update_comrade(&self, id: i64, comrade: NewComrade) -> AppResult<Option<Comrade>>;
    async fn delete_comrade(&self, id: i64) -> AppResult<bool>;
    /// Id of an existing comrade with exactly this first name, last name and unit.
    async fn find_comrade_duplicate(
        &self,
        first_name: &str,
        last_name: &str,
        unit: &str,
    ) -> AppResult<Option<i64>>;

    // --- Laws ---
    async fn list_laws(&self, filter: &LawFilter) -> AppResult<Page<Law>>;
    async fn get_law(&self, id: i64) -> AppResult<Option<Law>>;
    async fn create_law(&self, law: LawInput) -> AppResult<Law>;
    async fn update_law(&self, id: i64, law: LawInput) -> AppResult<Option<Law>>;
    async fn delete_law(&self, id: i64) -> AppResult<bool>;

    // --- News ---
    async fn list_news(&self, filter: &NewsFilter) -> AppResult<Page<News>>;
    async fn get_news(&self, id: i64) -> AppResult<Option<News>>;
    async fn create_news(&self, news: NewsInput) -> AppResult<News>;
    async fn update_news(&self, id: i64, news: NewsInput) -> AppResult<Option<News>>;
    async fn delete_news(&self, id: i64) -> AppResult<bool>;

    // --- Files ---
    async fn create_file(&self, file: NewStoredFile) -> AppResult<StoredFile>;
    async fn get_file(&self, id: &str) -> AppResult<Option<StoredFile>>;
    async fn list_files(&self, filter: &FileFilter) -> AppResult<Page<StoredFile>>;
    async fn delete_file(&self, id: &str) -> AppResult<bool>;

    // --- Users ---
    async fn get_user(&self, id: i64) -> AppResult<Option<User>>;
    async fn get_user_by_username(&self, username: &str) -> AppResult<Option<User>>;
    async fn create_user(&self, username: &str, password_hash: &str, role: &str) -> AppResult<User>;

    /// Row counts for the admin dashboard.
    async fn get_stats(&self) -> AppResult<AdminDashboardStats>;
}

/// RepositoryState
///
/// The concrete type used to share the persistence layer across the application state.
pub type RepositoryState = Arc<dyn Repository>;

/// `%needle%` for ILIKE. `%`, `_` and `\` in user input match literally.
pub(crate) fn like_pattern(needle: &str) -> String {
    let mut escaped = String::with_capacity(needle.len() + 2);
    escaped.push('%');
    for c in needle.chars() {
        if matches!(c, '%' | '_' | '\\') {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped.push('%');
    escaped
}
