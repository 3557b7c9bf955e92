//! Movie catalog repository

use anyhow::{Context, Result};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use sqlx::PgPool;
use sqlx::types::Json;
use uuid::Uuid;

/// One download option shown on the public site
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct DownloadLink {
    pub quality: String,
    pub url: String,
    pub size: String,
}

/// Catalog record from the database
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct MovieRecord {
    pub id: Uuid,
    pub title: String,
    pub media_type: String,
    pub tmdb_id: Option<i64>,
    pub overview: Option<String>,
    /// Empty when TMDB has no poster for the match
    pub poster_url: String,
    pub release_date: Option<String>,
    pub rating: Option<f64>,
    pub genres: Vec<String>,
    pub watch_link: String,
    pub download_links: Json<Vec<DownloadLink>>,
    pub is_trending: bool,
    pub is_coming_soon: bool,
    pub poster_badge: String,
    /// Dedup key: exactly one record per distinct source filename
    pub original_filename: String,
    pub created_at: chrono::DateTime<chrono::Utc>,
}

/// Input for creating a catalog record
#[derive(Debug, Clone)]
pub struct CreateMovie {
    pub title: String,
    pub media_type: String,
    pub tmdb_id: Option<i64>,
    pub overview: Option<String>,
    pub poster_url: String,
    pub release_date: Option<String>,
    pub rating: Option<f64>,
    pub genres: Vec<String>,
    pub watch_link: String,
    pub download_links: Vec<DownloadLink>,
    pub is_trending: bool,
    pub is_coming_soon: bool,
    pub poster_badge: String,
    pub original_filename: String,
}

/// Persistence contract the ingest pipeline runs against.
///
/// `insert` returns `None` when the original filename is already catalogued;
/// the conflict itself is the dedup signal, so two concurrent ingestions of
/// the same file cannot both create a record.
#[async_trait]
pub trait CatalogStore: Send + Sync {
    async fn insert(&self, movie: CreateMovie) -> Result<Option<Uuid>>;
    async fn find_by_original_filename(&self, name: &str) -> Result<Option<MovieRecord>>;
}

pub struct MovieRepository {
    pool: PgPool,
}

impl MovieRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl CatalogStore for MovieRepository {
    /// Insert a record, treating a filename conflict as "already catalogued"
    async fn insert(&self, movie: CreateMovie) -> Result<Option<Uuid>> {
        let row: Option<(Uuid,)> = sqlx::query_as(
            r#"
            INSERT INTO movies (
                title, media_type, tmdb_id, overview, poster_url,
                release_date, rating, genres, watch_link, download_links,
                is_trending, is_coming_soon, poster_badge, original_filename
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14)
            ON CONFLICT (original_filename) DO NOTHING
            RETURNING id
            "#,
        )
        .bind(&movie.title)
        .bind(&movie.media_type)
        .bind(movie.tmdb_id)
        .bind(&movie.overview)
        .bind(&movie.poster_url)
        .bind(&movie.release_date)
        .bind(movie.rating)
        .bind(&movie.genres)
        .bind(&movie.watch_link)
        .bind(Json(&movie.download_links))
        .bind(movie.is_trending)
        .bind(movie.is_coming_soon)
        .bind(&movie.poster_badge)
        .bind(&movie.original_filename)
        .fetch_optional(&self.pool)
        .await
        .context("Failed to insert movie")?;

        Ok(row.map(|(id,)| id))
    }

    /// Look up a record by its exact source filename
    async fn find_by_original_filename(&self, name: &str) -> Result<Option<MovieRecord>> {
        let record = sqlx::query_as::<_, MovieRecord>(
            r#"
            SELECT id, title, media_type, tmdb_id, overview, poster_url,
                   release_date, rating, genres, watch_link, download_links,
                   is_trending, is_coming_soon, poster_badge, original_filename,
                   created_at
            FROM movies
            WHERE original_filename = $1
            "#,
        )
        .bind(name)
        .fetch_optional(&self.pool)
        .await
        .context("Failed to look up movie by filename")?;

        Ok(record)
    }
}
