//! Database connection and operations

pub mod movies;

use anyhow::{Context, Result};
use sqlx::PgPool;
use sqlx::postgres::{PgConnectOptions, PgPoolOptions};

pub use movies::{CatalogStore, CreateMovie, DownloadLink, MovieRecord, MovieRepository};

/// Database wrapper providing connection pool access
#[derive(Clone)]
pub struct Database {
    pool: PgPool,
}

impl Database {
    /// Get the maximum connection pool size from environment or default
    fn get_max_connections() -> u32 {
        std::env::var("DATABASE_MAX_CONNECTIONS")
            .ok()
            .and_then(|s| s.parse().ok())
            .unwrap_or(10)
    }

    /// Create a lazily-connecting pool. Nothing dials out until the first
    /// query, which keeps startup alive when the database is misconfigured
    /// or briefly unreachable.
    pub fn connect(url: &str) -> Self {
        let options: PgConnectOptions = url.parse().unwrap_or_else(|e| {
            tracing::error!(error = %e, "DATABASE_URL is not a valid Postgres URL - using defaults");
            PgConnectOptions::new()
        });

        let pool = PgPoolOptions::new()
            .max_connections(Self::get_max_connections())
            .connect_lazy_with(options);

        Self { pool }
    }

    /// Create the movies table and its uniqueness constraint if absent.
    ///
    /// The UNIQUE original_filename index is what makes concurrent ingestion
    /// of the same file safe: the second insert conflicts instead of
    /// producing a second record.
    pub async fn ensure_schema(&self) -> Result<()> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS movies (
                id UUID PRIMARY KEY DEFAULT gen_random_uuid(),
                title TEXT NOT NULL,
                media_type TEXT NOT NULL DEFAULT 'movie',
                tmdb_id BIGINT,
                overview TEXT,
                poster_url TEXT NOT NULL DEFAULT '',
                release_date TEXT,
                rating DOUBLE PRECISION,
                genres TEXT[] NOT NULL DEFAULT '{}',
                watch_link TEXT NOT NULL,
                download_links JSONB NOT NULL DEFAULT '[]',
                is_trending BOOLEAN NOT NULL DEFAULT FALSE,
                is_coming_soon BOOLEAN NOT NULL DEFAULT FALSE,
                poster_badge TEXT NOT NULL DEFAULT '',
                original_filename TEXT NOT NULL UNIQUE,
                created_at TIMESTAMPTZ NOT NULL DEFAULT now()
            )
            "#,
        )
        .execute(&self.pool)
        .await
        .context("Failed to create movies table")?;

        Ok(())
    }

    /// Get the underlying connection pool
    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// Get the movies repository
    pub fn movies(&self) -> MovieRepository {
        MovieRepository::new(self.pool.clone())
    }
}
