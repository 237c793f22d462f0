use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use sqlx::{FromRow, PgPool, Postgres, QueryBuilder, types::Json};
use uuid::Uuid;

use super::{
    ComradeFilter, FileFilter, LawFilter, NewsFilter, NewsSortField, Page, Repository, SortOrder,
    like_pattern,
};
use crate::error::{AppError, AppResult};
use crate::models::{
    AdminDashboardStats, Comrade, ContactInfo, Law, LawInput, MultilingualText, NewComrade,
    NewStoredFile, News, NewsInput, StoredFile, User,
};

// --- Row types ---
//
// Multilingual attributes are stored as `<field>_ru/_uz/_en` columns; these rows are
// the only place that knows it.

const COMRADE_COLUMNS: &str = "id, first_name, last_name, middle_name, unit, region, \
     year_of_service_from, year_of_service_to, rank, photo_url, contact_info, \
     additional_info, is_verified, created_at, updated_at";

const LAW_COLUMNS: &str = "id, title_ru, title_uz, title_en, description_ru, description_uz, \
     description_en, category_ru, category_uz, category_en, date, pdf_url, created_at, updated_at";

const NEWS_COLUMNS: &str = "id, title_ru, title_uz, title_en, content_ru, content_uz, content_en, \
     summary_ru, summary_uz, summary_en, date, image_url, created_at, updated_at";

const FILE_COLUMNS: &str =
    "id, filename, original_name, url, file_type, category, size, uploaded_at";

#[derive(FromRow)]
struct ComradeRow {
    id: i64,
    first_name: String,
    last_name: String,
    middle_name: Option<String>,
    unit: String,
    region: String,
    year_of_service_from: i32,
    year_of_service_to: Option<i32>,
    rank: Option<String>,
    photo_url: Option<String>,
    contact_info: Json<ContactInfo>,
    additional_info: Option<String>,
    is_verified: bool,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl From<ComradeRow> for Comrade {
    fn from(row: ComradeRow) -> Self {
        Comrade {
            id: row.id,
            first_name: row.first_name,
            last_name: row.last_name,
            middle_name: row.middle_name,
            unit: row.unit,
            region: row.region,
            year_of_service_from: i64::from(row.year_of_service_from),
            year_of_service_to: row.year_of_service_to.map(i64::from),
            rank: row.rank,
            photo_url: row.photo_url,
            contact_info: row.contact_info.0,
            additional_info: row.additional_info,
            is_verified: row.is_verified,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

#[derive(FromRow)]
struct LawRow {
    id: i64,
    title_ru: String,
    title_uz: String,
    title_en: String,
    description_ru: String,
    description_uz: String,
    description_en: String,
    category_ru: String,
    category_uz: String,
    category_en: String,
    date: NaiveDate,
    pdf_url: Option<String>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl From<LawRow> for Law {
    fn from(row: LawRow) -> Self {
        Law {
            id: row.id,
            title: MultilingualText::new(row.title_ru, row.title_uz, row.title_en),
            description: MultilingualText::new(
                row.description_ru,
                row.description_uz,
                row.description_en,
            ),
            category: MultilingualText::new(row.category_ru, row.category_uz, row.category_en),
            date: row.date,
            pdf_url: row.pdf_url,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

#[derive(FromRow)]
struct NewsRow {
    id: i64,
    title_ru: String,
    title_uz: String,
    title_en: String,
    content_ru: String,
    content_uz: String,
    content_en: String,
    summary_ru: String,
    summary_uz: String,
    summary_en: String,
    date: NaiveDate,
    image_url: Option<String>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl From<NewsRow> for News {
    fn from(row: NewsRow) -> Self {
        News {
            id: row.id,
            title: MultilingualText::new(row.title_ru, row.title_uz, row.title_en),
            content: MultilingualText::new(row.content_ru, row.content_uz, row.content_en),
            summary: MultilingualText::new(row.summary_ru, row.summary_uz, row.summary_en),
            date: row.date,
            image_url: row.image_url,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

/// Service years are INTEGER columns; validated years always fit.
fn year_param(year: i64) -> AppResult<i32> {
    i32::try_from(year)
        .map_err(|_| AppError::bad_request("Invalid parameter", format!("Year out of range: {year}")))
}

fn push_comrade_filters(builder: &mut QueryBuilder<'_, Postgres>, filter: &ComradeFilter) -> AppResult<()> {
    if let Some(name) = &filter.name {
        push_any_ilike(
            builder,
            &["first_name", "last_name", "middle_name"],
            &like_pattern(name),
        );
    }
    if let Some(unit) = &filter.unit {
        builder.push(" AND unit ILIKE ");
        builder.push_bind(like_pattern(unit));
    }
    if let Some(region) = &filter.region {
        builder.push(" AND region ILIKE ");
        builder.push_bind(like_pattern(region));
    }
    if let Some(rank) = &filter.rank {
        builder.push(" AND rank ILIKE ");
        builder.push_bind(like_pattern(rank));
    }
    if let Some(year_from) = filter.year_from {
        builder.push(" AND year_of_service_from >= ");
        builder.push_bind(year_param(year_from)?);
    }
    if let Some(year_to) = filter.year_to {
        builder.push(" AND (year_of_service_to IS NULL OR year_of_service_to <= ");
        builder.push_bind(year_param(year_to)?);
        builder.push(")");
    }
    Ok(())
}

/// ` AND (c1 ILIKE $n OR c2 ILIKE $m ...)` with the same pattern for every column.
fn push_any_ilike(builder: &mut QueryBuilder<'_, Postgres>, columns: &[&str], pattern: &str) {
    builder.push(" AND (");
    for (i, column) in columns.iter().enumerate() {
        if i > 0 {
            builder.push(" OR ");
        }
        builder.push(format!("{column} ILIKE "));
        builder.push_bind(pattern.to_string());
    }
    builder.push(")");
}

fn push_law_filters(builder: &mut QueryBuilder<'_, Postgres>, filter: &LawFilter) {
    if let Some(category) = &filter.category {
        push_any_ilike(
            builder,
            &["category_ru", "category_uz", "category_en"],
            &like_pattern(category),
        );
    }
    if let Some(search) = &filter.search {
        let pattern = like_pattern(search);
        push_any_ilike(
            builder,
            &[
                "title_ru",
                "title_uz",
                "title_en",
                "description_ru",
                "description_uz",
                "description_en",
            ],
            &pattern,
        );
    }
}

fn push_news_filters(builder: &mut QueryBuilder<'_, Postgres>, filter: &NewsFilter) {
    if let Some(search) = &filter.search {
        let pattern = like_pattern(search);
        push_any_ilike(
            builder,
            &[
                "title_ru",
                "title_uz",
                "title_en",
                "content_ru",
                "content_uz",
                "content_en",
            ],
            &pattern,
        );
    }
    if let Some(date_from) = filter.date_from {
        builder.push(" AND date >= ");
        builder.push_bind(date_from);
    }
    if let Some(date_to) = filter.date_to {
        builder.push(" AND date <= ");
        builder.push_bind(date_to);
    }
}

fn push_file_filters(builder: &mut QueryBuilder<'_, Postgres>, filter: &FileFilter) {
    if let Some(file_type) = &filter.file_type {
        builder.push(" AND file_type = ");
        builder.push_bind(file_type.clone());
    }
    if let Some(category) = &filter.category {
        builder.push(" AND category = ");
        builder.push_bind(category.clone());
    }
}

fn push_page(builder: &mut QueryBuilder<'_, Postgres>, limit: i64, offset: i64) {
    builder.push(" LIMIT ");
    builder.push_bind(limit);
    builder.push(" OFFSET ");
    builder.push_bind(offset);
}

/// PostgresRepository
///
/// The concrete implementation of the `Repository` trait, backed by PostgreSQL.
/// Queries are built at runtime (`query_as` + `FromRow`), so the crate compiles
/// without a reachable database.
pub struct PostgresRepository {
    pool: PgPool,
}

impl PostgresRepository {
    /// Creates a new repository instance using the initialized connection pool.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    async fn count(&self, table: &str) -> AppResult<i64> {
        let total = sqlx::query_scalar::<_, i64>(&format!("SELECT COUNT(*) FROM {table}"))
            .fetch_one(&self.pool)
            .await?;
        Ok(total)
    }
}

#[async_trait]
impl Repository for PostgresRepository {
    // --- COMRADES ---

    /// list_comrades
    ///
    /// Filtered roster search with QueryBuilder parameterization. The same filter is
    /// applied to the count and to the page query, ordered by last then first name.
    async fn list_comrades(&self, filter: &ComradeFilter) -> AppResult<Page<Comrade>> {
        let mut count: QueryBuilder<Postgres> =
            QueryBuilder::new("SELECT COUNT(*) FROM comrades WHERE 1 = 1");
        push_comrade_filters(&mut count, filter)?;
        let total = count.build_query_scalar::<i64>().fetch_one(&self.pool).await?;

        let mut select: QueryBuilder<Postgres> =
            QueryBuilder::new(format!("SELECT {COMRADE_COLUMNS} FROM comrades WHERE 1 = 1"));
        push_comrade_filters(&mut select, filter)?;
        select.push(" ORDER BY last_name, first_name, id");
        push_page(&mut select, filter.limit, filter.offset);

        let rows = select
            .build_query_as::<ComradeRow>()
            .fetch_all(&self.pool)
            .await?;

        Ok(Page {
            items: rows.into_iter().map(Comrade::from).collect(),
            total,
        })
    }

    async fn get_comrade(&self, id: i64) -> AppResult<Option<Comrade>> {
        let row = sqlx::query_as::<_, ComradeRow>(&format!(
            "SELECT {COMRADE_COLUMNS} FROM comrades WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row.map(Comrade::from))
    }

    /// create_comrade
    ///
    /// New roster entries start unverified.
    async fn create_comrade(&self, comrade: NewComrade) -> AppResult<Comrade> {
        let row = sqlx::query_as::<_, ComradeRow>(&format!(
            r#"
            INSERT INTO comrades (first_name, last_name, middle_name, unit, region,
                                  year_of_service_from, year_of_service_to, rank, photo_url,
                                  contact_info, additional_info, is_verified, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, false, NOW(), NOW())
            RETURNING {COMRADE_COLUMNS}
            "#
        ))
        .bind(comrade.first_name)
        .bind(comrade.last_name)
        .bind(comrade.middle_name)
        .bind(comrade.unit)
        .bind(comrade.region)
        .bind(year_param(comrade.year_of_service_from)?)
        .bind(comrade.year_of_service_to.map(year_param).transpose()?)
        .bind(comrade.rank)
        .bind(comrade.photo_url)
        .bind(Json(comrade.contact_info.unwrap_or_default()))
        .bind(comrade.additional_info)
        .fetch_one(&self.pool)
        .await?;
        Ok(row.into())
    }

    /// update_comrade
    ///
    /// Replaces every editable column. Omitted contact info is cleared, not kept.
    async fn update_comrade(&self, id: i64, comrade: NewComrade) -> AppResult<Option<Comrade>> {
        let row = sqlx::query_as::<_, ComradeRow>(&format!(
            r#"
            UPDATE comrades
            SET first_name = $2, last_name = $3, middle_name = $4, unit = $5, region = $6,
                year_of_service_from = $7, year_of_service_to = $8, rank = $9, photo_url = $10,
                contact_info = $11, additional_info = $12, updated_at = NOW()
            WHERE id = $1
            RETURNING {COMRADE_COLUMNS}
            "#
        ))
        .bind(id)
        .bind(comrade.first_name)
        .bind(comrade.last_name)
        .bind(comrade.middle_name)
        .bind(comrade.unit)
        .bind(comrade.region)
        .bind(year_param(comrade.year_of_service_from)?)
        .bind(comrade.year_of_service_to.map(year_param).transpose()?)
        .bind(comrade.rank)
        .bind(comrade.photo_url)
        .bind(Json(comrade.contact_info.unwrap_or_default()))
        .bind(comrade.additional_info)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row.map(Comrade::from))
    }

    async fn delete_comrade(&self, id: i64) -> AppResult<bool> {
        let result = sqlx::query("DELETE FROM comrades WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn find_comrade_duplicate(
        &self,
        first_name: &str,
        last_name: &str,
        unit: &str,
    ) -> AppResult<Option<i64>> {
        let id = sqlx::query_scalar::<_, i64>(
            "SELECT id FROM comrades WHERE first_name = $1 AND last_name = $2 AND unit = $3 LIMIT 1",
        )
        .bind(first_name)
        .bind(last_name)
        .bind(unit)
        .fetch_optional(&self.pool)
        .await?;
        Ok(id)
    }

    // --- LAWS ---

    /// list_laws
    ///
    /// Newest first.
    async fn list_laws(&self, filter: &LawFilter) -> AppResult<Page<Law>> {
        let mut count: QueryBuilder<Postgres> =
            QueryBuilder::new("SELECT COUNT(*) FROM laws WHERE 1 = 1");
        push_law_filters(&mut count, filter);
        let total = count.build_query_scalar::<i64>().fetch_one(&self.pool).await?;

        let mut select: QueryBuilder<Postgres> =
            QueryBuilder::new(format!("SELECT {LAW_COLUMNS} FROM laws WHERE 1 = 1"));
        push_law_filters(&mut select, filter);
        select.push(" ORDER BY date DESC, id DESC");
        push_page(&mut select, filter.limit, filter.offset);

        let rows = select.build_query_as::<LawRow>().fetch_all(&self.pool).await?;
        Ok(Page {
            items: rows.into_iter().map(Law::from).collect(),
            total,
        })
    }

    async fn get_law(&self, id: i64) -> AppResult<Option<Law>> {
        let row = sqlx::query_as::<_, LawRow>(&format!("SELECT {LAW_COLUMNS} FROM laws WHERE id = $1"))
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row.map(Law::from))
    }

    async fn create_law(&self, law: LawInput) -> AppResult<Law> {
        let row = sqlx::query_as::<_, LawRow>(&format!(
            r#"
            INSERT INTO laws (title_ru, title_uz, title_en, description_ru, description_uz,
                              description_en, category_ru, category_uz, category_en, date, pdf_url,
                              created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, NOW(), NOW())
            RETURNING {LAW_COLUMNS}
            "#
        ))
        .bind(law.title.ru)
        .bind(law.title.uz)
        .bind(law.title.en)
        .bind(law.description.ru)
        .bind(law.description.uz)
        .bind(law.description.en)
        .bind(law.category.ru)
        .bind(law.category.uz)
        .bind(law.category.en)
        .bind(law.date)
        .bind(law.pdf_url)
        .fetch_one(&self.pool)
        .await?;
        Ok(row.into())
    }

    async fn update_law(&self, id: i64, law: LawInput) -> AppResult<Option<Law>> {
        let row = sqlx::query_as::<_, LawRow>(&format!(
            r#"
            UPDATE laws
            SET title_ru = $2, title_uz = $3, title_en = $4,
                description_ru = $5, description_uz = $6, description_en = $7,
                category_ru = $8, category_uz = $9, category_en = $10,
                date = $11, pdf_url = $12, updated_at = NOW()
            WHERE id = $1
            RETURNING {LAW_COLUMNS}
            "#
        ))
        .bind(id)
        .bind(law.title.ru)
        .bind(law.title.uz)
        .bind(law.title.en)
        .bind(law.description.ru)
        .bind(law.description.uz)
        .bind(law.description.en)
        .bind(law.category.ru)
        .bind(law.category.uz)
        .bind(law.category.en)
        .bind(law.date)
        .bind(law.pdf_url)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row.map(Law::from))
    }

    async fn delete_law(&self, id: i64) -> AppResult<bool> {
        let result = sqlx::query("DELETE FROM laws WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    // --- NEWS ---

    async fn list_news(&self, filter: &NewsFilter) -> AppResult<Page<News>> {
        let mut count: QueryBuilder<Postgres> =
            QueryBuilder::new("SELECT COUNT(*) FROM news WHERE 1 = 1");
        push_news_filters(&mut count, filter);
        let total = count.build_query_scalar::<i64>().fetch_one(&self.pool).await?;

        let mut select: QueryBuilder<Postgres> =
            QueryBuilder::new(format!("SELECT {NEWS_COLUMNS} FROM news WHERE 1 = 1"));
        push_news_filters(&mut select, filter);

        // Sort keys come from closed enums, never from user text.
        let column = match filter.sort_by {
            NewsSortField::Date => "date",
            NewsSortField::Title => "title_ru",
        };
        let direction = match filter.sort_order {
            SortOrder::Asc => "ASC",
            SortOrder::Desc => "DESC",
        };
        select.push(format!(" ORDER BY {column} {direction}, id {direction}"));
        push_page(&mut select, filter.limit, filter.offset);

        let rows = select.build_query_as::<NewsRow>().fetch_all(&self.pool).await?;
        Ok(Page {
            items: rows.into_iter().map(News::from).collect(),
            total,
        })
    }

    async fn get_news(&self, id: i64) -> AppResult<Option<News>> {
        let row = sqlx::query_as::<_, NewsRow>(&format!("SELECT {NEWS_COLUMNS} FROM news WHERE id = $1"))
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row.map(News::from))
    }

    async fn create_news(&self, news: NewsInput) -> AppResult<News> {
        let row = sqlx::query_as::<_, NewsRow>(&format!(
            r#"
            INSERT INTO news (title_ru, title_uz, title_en, content_ru, content_uz, content_en,
                              summary_ru, summary_uz, summary_en, date, image_url,
                              created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, NOW(), NOW())
            RETURNING {NEWS_COLUMNS}
            "#
        ))
        .bind(news.title.ru)
        .bind(news.title.uz)
        .bind(news.title.en)
        .bind(news.content.ru)
        .bind(news.content.uz)
        .bind(news.content.en)
        .bind(news.summary.ru)
        .bind(news.summary.uz)
        .bind(news.summary.en)
        .bind(news.date)
        .bind(news.image_url)
        .fetch_one(&self.pool)
        .await?;
        Ok(row.into())
    }

    async fn update_news(&self, id: i64, news: NewsInput) -> AppResult<Option<News>> {
        let row = sqlx::query_as::<_, NewsRow>(&format!(
            r#"
            UPDATE news
            SET title_ru = $2, title_uz = $3, title_en = $4,
                content_ru = $5, content_uz = $6, content_en = $7,
                summary_ru = $8, summary_uz = $9, summary_en = $10,
                date = $11, image_url = $12, updated_at = NOW()
            WHERE id = $1
            RETURNING {NEWS_COLUMNS}
            "#
        ))
        .bind(id)
        .bind(news.title.ru)
        .bind(news.title.uz)
        .bind(news.title.en)
        .bind(news.content.ru)
        .bind(news.content.uz)
        .bind(news.content.en)
        .bind(news.summary.ru)
        .bind(news.summary.uz)
        .bind(news.summary.en)
        .bind(news.date)
        .bind(news.image_url)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row.map(News::from))
    }

    async fn delete_news(&self, id: i64) -> AppResult<bool> {
        let result = sqlx::query("DELETE FROM news WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    // --- FILES ---

    async fn create_file(&self, file: NewStoredFile) -> AppResult<StoredFile> {
        let stored = sqlx::query_as::<_, StoredFile>(&format!(
            r#"
            INSERT INTO files (id, filename, original_name, url, file_type, category, size, uploaded_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, NOW())
            RETURNING {FILE_COLUMNS}
            "#
        ))
        .bind(Uuid::new_v4().to_string())
        .bind(file.filename)
        .bind(file.original_name)
        .bind(file.url)
        .bind(file.file_type)
        .bind(file.category)
        .bind(file.size)
        .fetch_one(&self.pool)
        .await?;
        Ok(stored)
    }

    async fn get_file(&self, id: &str) -> AppResult<Option<StoredFile>> {
        let file = sqlx::query_as::<_, StoredFile>(&format!("SELECT {FILE_COLUMNS} FROM files WHERE id = $1"))
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(file)
    }

    /// list_files
    ///
    /// Most recent upload first.
    async fn list_files(&self, filter: &FileFilter) -> AppResult<Page<StoredFile>> {
        let mut count: QueryBuilder<Postgres> =
            QueryBuilder::new("SELECT COUNT(*) FROM files WHERE 1 = 1");
        push_file_filters(&mut count, filter);
        let total = count.build_query_scalar::<i64>().fetch_one(&self.pool).await?;

        let mut select: QueryBuilder<Postgres> =
            QueryBuilder::new(format!("SELECT {FILE_COLUMNS} FROM files WHERE 1 = 1"));
        push_file_filters(&mut select, filter);
        select.push(" ORDER BY uploaded_at DESC");
        push_page(&mut select, filter.limit, filter.offset);

        let items = select
            .build_query_as::<StoredFile>()
            .fetch_all(&self.pool)
            .await?;
        Ok(Page { items, total })
    }

    async fn delete_file(&self, id: &str) -> AppResult<bool> {
        let result = sqlx::query("DELETE FROM files WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    // --- USERS ---

    async fn get_user(&self, id: i64) -> AppResult<Option<User>> {
        let user = sqlx::query_as::<_, User>(
            "SELECT id, username, password_hash, role, created_at FROM users WHERE id = $1",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(user)
    }

    async fn get_user_by_username(&self, username: &str) -> AppResult<Option<User>> {
        let user = sqlx::query_as::<_, User>(
            "SELECT id, username, password_hash, role, created_at FROM users WHERE username = $1",
        )
        .bind(username)
        .fetch_optional(&self.pool)
        .await?;
        Ok(user)
    }

    async fn create_user(&self, username: &str, password_hash: &str, role: &str) -> AppResult<User> {
        let user = sqlx::query_as::<_, User>(
            r#"
            INSERT INTO users (username, password_hash, role, created_at)
            VALUES ($1, $2, $3, NOW())
            RETURNING id, username, password_hash, role, created_at
            "#,
        )
        .bind(username)
        .bind(password_hash)
        .bind(role)
        .fetch_one(&self.pool)
        .await?;
        Ok(user)
    }

    /// get_stats
    ///
    /// Compiles the dashboard counters. Table names are fixed literals.
    async fn get_stats(&self) -> AppResult<AdminDashboardStats> {
        Ok(AdminDashboardStats {
            total_comrades: self.count("comrades").await?,
            total_laws: self.count("laws").await?,
            total_news: self.count("news").await?,
            total_files: self.count("files").await?,
            total_users: self.count("users").await?,
        })
    }
}
