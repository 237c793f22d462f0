use std::cmp::Ordering;
use std::collections::BTreeMap;

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::RwLock;
use uuid::Uuid;

use super::{
    ComradeFilter, FileFilter, LawFilter, NewsFilter, NewsSortField, Page, Repository, SortOrder,
};
use crate::error::{AppError, AppResult};
use crate::models::{
    AdminDashboardStats, Comrade, Law, LawInput, NewComrade, NewStoredFile, News, NewsInput,
    StoredFile, User,
};

#[derive(Default)]
struct Tables {
    comrades: BTreeMap<i64, Comrade>,
    laws: BTreeMap<i64, Law>,
    news: BTreeMap<i64, News>,
    files: Vec<StoredFile>,
    users: BTreeMap<i64, User>,
    next_id: i64,
}

impl Tables {
    fn next_id(&mut self) -> i64 {
        self.next_id += 1;
        self.next_id
    }
}

/// InMemoryRepository
///
/// A `Repository` over process memory, used by the integration tests and for running
/// the router without Postgres. Filtering and ordering follow the SQL implementation.
#[derive(Default)]
pub struct InMemoryRepository {
    tables: RwLock<Tables>,
}

fn contains_ci(haystack: &str, needle: &str) -> bool {
    haystack.to_lowercase().contains(&needle.to_lowercase())
}

fn page<T: Clone>(items: Vec<&T>, limit: i64, offset: i64) -> Page<T> {
    let total = items.len() as i64;
    let offset = usize::try_from(offset.max(0)).unwrap_or(usize::MAX);
    let limit = usize::try_from(limit.max(0)).unwrap_or(usize::MAX);
    Page {
        items: items.into_iter().skip(offset).take(limit).cloned().collect(),
        total,
    }
}

impl InMemoryRepository {
    pub fn new() -> Self {
        Self::default()
    }

    /// Test fixture: inserts a user with an already-hashed password.
    pub async fn insert_user(&self, username: &str, password_hash: &str, role: &str) -> User {
        let mut tables = self.tables.write().await;
        let id = tables.next_id();
        let user = User {
            id,
            username: username.to_string(),
            password_hash: password_hash.to_string(),
            role: role.to_string(),
            created_at: Utc::now(),
        };
        tables.users.insert(id, user.clone());
        user
    }
}

fn comrade_matches(comrade: &Comrade, filter: &ComradeFilter) -> bool {
    if let Some(name) = &filter.name {
        let in_name = contains_ci(&comrade.first_name, name)
            || contains_ci(&comrade.last_name, name)
            || comrade
                .middle_name
                .as_deref()
                .is_some_and(|m| contains_ci(m, name));
        if !in_name {
            return false;
        }
    }
    if filter.unit.as_deref().is_some_and(|u| !contains_ci(&comrade.unit, u)) {
        return false;
    }
    if filter
        .region
        .as_deref()
        .is_some_and(|r| !contains_ci(&comrade.region, r))
    {
        return false;
    }
    if let Some(rank) = &filter.rank {
        if !comrade.rank.as_deref().is_some_and(|r| contains_ci(r, rank)) {
            return false;
        }
    }
    if filter
        .year_from
        .is_some_and(|from| comrade.year_of_service_from < from)
    {
        return false;
    }
    if let (Some(to), Some(served_to)) = (filter.year_to, comrade.year_of_service_to) {
        if served_to > to {
            return false;
        }
    }
    true
}

fn comrade_from(id: i64, new: NewComrade, existing: Option<&Comrade>) -> Comrade {
    let now = Utc::now();
    Comrade {
        id,
        first_name: new.first_name,
        last_name: new.last_name,
        middle_name: new.middle_name,
        unit: new.unit,
        region: new.region,
        year_of_service_from: new.year_of_service_from,
        year_of_service_to: new.year_of_service_to,
        rank: new.rank,
        photo_url: new.photo_url,
        contact_info: new.contact_info.unwrap_or_default(),
        additional_info: new.additional_info,
        is_verified: existing.is_some_and(|c| c.is_verified),
        created_at: existing.map_or(now, |c| c.created_at),
        updated_at: now,
    }
}

fn law_from(id: i64, input: LawInput, existing: Option<&Law>) -> Law {
    let now = Utc::now();
    Law {
        id,
        title: input.title,
        description: input.description,
        category: input.category,
        date: input.date,
        pdf_url: input.pdf_url,
        created_at: existing.map_or(now, |l| l.created_at),
        updated_at: now,
    }
}

fn news_from(id: i64, input: NewsInput, existing: Option<&News>) -> News {
    let now = Utc::now();
    News {
        id,
        title: input.title,
        content: input.content,
        summary: input.summary,
        date: input.date,
        image_url: input.image_url,
        created_at: existing.map_or(now, |n| n.created_at),
        updated_at: now,
    }
}

#[async_trait]
impl Repository for InMemoryRepository {
    async fn list_comrades(&self, filter: &ComradeFilter) -> AppResult<Page<Comrade>> {
        let tables = self.tables.read().await;
        let mut matches: Vec<&Comrade> = tables
            .comrades
            .values()
            .filter(|c| comrade_matches(c, filter))
            .collect();
        matches.sort_by(|a, b| {
            a.last_name
                .cmp(&b.last_name)
                .then_with(|| a.first_name.cmp(&b.first_name))
                .then_with(|| a.id.cmp(&b.id))
        });
        Ok(page(matches, filter.limit, filter.offset))
    }

    async fn get_comrade(&self, id: i64) -> AppResult<Option<Comrade>> {
        Ok(self.tables.read().await.comrades.get(&id).cloned())
    }

    async fn create_comrade(&self, comrade: NewComrade) -> AppResult<Comrade> {
        let mut tables = self.tables.write().await;
        let id = tables.next_id();
        let created = comrade_from(id, comrade, None);
        tables.comrades.insert(id, created.clone());
        Ok(created)
    }

    async fn update_comrade(&self, id: i64, comrade: NewComrade) -> AppResult<Option<Comrade>> {
        let mut tables = self.tables.write().await;
        let Some(existing) = tables.comrades.get(&id) else {
            return Ok(None);
        };
        let updated = comrade_from(id, comrade, Some(existing));
        tables.comrades.insert(id, updated.clone());
        Ok(Some(updated))
    }

    async fn delete_comrade(&self, id: i64) -> AppResult<bool> {
        Ok(self.tables.write().await.comrades.remove(&id).is_some())
    }

    async fn find_comrade_duplicate(
        &self,
        first_name: &str,
        last_name: &str,
        unit: &str,
    ) -> AppResult<Option<i64>> {
        let tables = self.tables.read().await;
        Ok(tables
            .comrades
            .values()
            .find(|c| c.first_name == first_name && c.last_name == last_name && c.unit == unit)
            .map(|c| c.id))
    }

    async fn list_laws(&self, filter: &LawFilter) -> AppResult<Page<Law>> {
        let tables = self.tables.read().await;
        let mut matches: Vec<&Law> = tables
            .laws
            .values()
            .filter(|law| {
                filter
                    .category
                    .as_deref()
                    .is_none_or(|c| law.category.contains_ci(c))
            })
            .filter(|law| {
                filter
                    .search
                    .as_deref()
                    .is_none_or(|s| law.title.contains_ci(s) || law.description.contains_ci(s))
            })
            .collect();
        matches.sort_by(|a, b| b.date.cmp(&a.date).then_with(|| b.id.cmp(&a.id)));
        Ok(page(matches, filter.limit, filter.offset))
    }

    async fn get_law(&self, id: i64) -> AppResult<Option<Law>> {
        Ok(self.tables.read().await.laws.get(&id).cloned())
    }

    async fn create_law(&self, law: LawInput) -> AppResult<Law> {
        let mut tables = self.tables.write().await;
        let id = tables.next_id();
        let created = law_from(id, law, None);
        tables.laws.insert(id, created.clone());
        Ok(created)
    }

    async fn update_law(&self, id: i64, law: LawInput) -> AppResult<Option<Law>> {
        let mut tables = self.tables.write().await;
        let Some(existing) = tables.laws.get(&id) else {
            return Ok(None);
        };
        let updated = law_from(id, law, Some(existing));
        tables.laws.insert(id, updated.clone());
        Ok(Some(updated))
    }

    async fn delete_law(&self, id: i64) -> AppResult<bool> {
        Ok(self.tables.write().await.laws.remove(&id).is_some())
    }

    async fn list_news(&self, filter: &NewsFilter) -> AppResult<Page<News>> {
        let tables = self.tables.read().await;
        let mut matches: Vec<&News> = tables
            .news
            .values()
            .filter(|n| {
                filter
                    .search
                    .as_deref()
                    .is_none_or(|s| n.title.contains_ci(s) || n.content.contains_ci(s))
            })
            .filter(|n| filter.date_from.is_none_or(|from| n.date >= from))
            .filter(|n| filter.date_to.is_none_or(|to| n.date <= to))
            .collect();

        matches.sort_by(|a, b| {
            let ordering: Ordering = match filter.sort_by {
                NewsSortField::Date => a.date.cmp(&b.date),
                NewsSortField::Title => a.title.ru.cmp(&b.title.ru),
            }
            .then_with(|| a.id.cmp(&b.id));
            match filter.sort_order {
                SortOrder::Asc => ordering,
                SortOrder::Desc => ordering.reverse(),
            }
        });
        Ok(page(matches, filter.limit, filter.offset))
    }

    async fn get_news(&self, id: i64) -> AppResult<Option<News>> {
        Ok(self.tables.read().await.news.get(&id).cloned())
    }

    async fn create_news(&self, news: NewsInput) -> AppResult<News> {
        let mut tables = self.tables.write().await;
        let id = tables.next_id();
        let created = news_from(id, news, None);
        tables.news.insert(id, created.clone());
        Ok(created)
    }

    async fn update_news(&self, id: i64, news: NewsInput) -> AppResult<Option<News>> {
        let mut tables = self.tables.write().await;
        let Some(existing) = tables.news.get(&id) else {
            return Ok(None);
        };
        let updated = news_from(id, news, Some(existing));
        tables.news.insert(id, updated.clone());
        Ok(Some(updated))
    }

    async fn delete_news(&self, id: i64) -> AppResult<bool> {
        Ok(self.tables.write().await.news.remove(&id).is_some())
    }

    async fn create_file(&self, file: NewStoredFile) -> AppResult<StoredFile> {
        let mut tables = self.tables.write().await;
        if tables.files.iter().any(|f| f.filename == file.filename) {
            return Err(AppError::Database(format!(
                "duplicate stored filename '{}'",
                file.filename
            )));
        }
        let stored = StoredFile {
            id: Uuid::new_v4().to_string(),
            filename: file.filename,
            original_name: file.original_name,
            url: file.url,
            file_type: file.file_type,
            category: file.category,
            size: file.size,
            uploaded_at: Utc::now(),
        };
        tables.files.push(stored.clone());
        Ok(stored)
    }

    async fn get_file(&self, id: &str) -> AppResult<Option<StoredFile>> {
        let tables = self.tables.read().await;
        Ok(tables.files.iter().find(|f| f.id == id).cloned())
    }

    async fn list_files(&self, filter: &FileFilter) -> AppResult<Page<StoredFile>> {
        let tables = self.tables.read().await;
        // Newest first: later pushes win ties on equal timestamps.
        let mut matches: Vec<&StoredFile> = tables
            .files
            .iter()
            .rev()
            .filter(|f| filter.file_type.as_deref().is_none_or(|t| f.file_type == t))
            .filter(|f| filter.category.as_deref().is_none_or(|c| f.category == c))
            .collect();
        matches.sort_by(|a, b| b.uploaded_at.cmp(&a.uploaded_at));
        Ok(page(matches, filter.limit, filter.offset))
    }

    async fn delete_file(&self, id: &str) -> AppResult<bool> {
        let mut tables = self.tables.write().await;
        let before = tables.files.len();
        tables.files.retain(|f| f.id != id);
        Ok(tables.files.len() < before)
    }

    async fn get_user(&self, id: i64) -> AppResult<Option<User>> {
        Ok(self.tables.read().await.users.get(&id).cloned())
    }

    async fn get_user_by_username(&self, username: &str) -> AppResult<Option<User>> {
        let tables = self.tables.read().await;
        Ok(tables.users.values().find(|u| u.username == username).cloned())
    }

    async fn create_user(&self, username: &str, password_hash: &str, role: &str) -> AppResult<User> {
        if self.get_user_by_username(username).await?.is_some() {
            return Err(AppError::bad_request(
                "Invalid request",
                format!("Username '{username}' already exists"),
            ));
        }
        Ok(self.insert_user(username, password_hash, role).await)
    }

    async fn get_stats(&self) -> AppResult<AdminDashboardStats> {
        let tables = self.tables.read().await;
        Ok(AdminDashboardStats {
            total_comrades: tables.comrades.len() as i64,
            total_laws: tables.laws.len() as i64,
            total_news: tables.news.len() as i64,
            total_files: tables.files.len() as i64,
            total_users: tables.users.len() as i64,
        })
    }
}
