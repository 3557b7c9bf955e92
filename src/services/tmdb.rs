//! TMDB API client for movie metadata
//!
//! Search and detail lookups against https://api.themoviedb.org/3,
//! authenticated with an API key. Every call carries a fixed 10 second
//! timeout; there is no retry.

use std::time::Duration;

use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

/// Image service base for poster paths returned by TMDB
pub const IMAGE_BASE: &str = "https://image.tmdb.org/t/p/w500";

const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

/// TMDB API client
pub struct TmdbClient {
    client: Client,
    base_url: String,
    api_key: String,
}

#[derive(Debug, Deserialize)]
struct SearchResponse {
    #[serde(default)]
    results: Vec<TmdbSearchMovie>,
}

/// One ranked entry from a TMDB search
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TmdbSearchMovie {
    pub id: i64,
    pub title: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TmdbGenre {
    pub id: i64,
    pub name: String,
}

/// Full detail record for one movie
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TmdbMovieDetails {
    pub id: i64,
    pub title: Option<String>,
    pub overview: Option<String>,
    pub poster_path: Option<String>,
    pub release_date: Option<String>,
    pub vote_average: Option<f64>,
    #[serde(default)]
    pub genres: Vec<TmdbGenre>,
}

impl TmdbMovieDetails {
    /// Full poster URL, or empty when TMDB has no poster path
    pub fn poster_url(&self) -> String {
        match &self.poster_path {
            Some(path) => format!("{IMAGE_BASE}{path}"),
            None => String::new(),
        }
    }

    /// Genre names exactly as TMDB returns them
    pub fn genre_names(&self) -> Vec<String> {
        self.genres.iter().map(|g| g.name.clone()).collect()
    }
}

/// Surface of the TMDB API the resolver depends on
#[async_trait]
pub trait TmdbApi: Send + Sync {
    /// Search for movies by title, optionally scoped to a release year
    async fn search_movie(&self, title: &str, year: Option<&str>) -> Result<Vec<TmdbSearchMovie>>;

    /// Get the full detail record for a movie by TMDB ID
    async fn movie_details(&self, tmdb_id: i64) -> Result<TmdbMovieDetails>;
}

impl TmdbClient {
    pub fn new(api_key: String) -> Self {
        Self {
            client: Client::new(),
            base_url: "https://api.themoviedb.org/3".to_string(),
            api_key,
        }
    }
}

#[async_trait]
impl TmdbApi for TmdbClient {
    async fn search_movie(&self, title: &str, year: Option<&str>) -> Result<Vec<TmdbSearchMovie>> {
        info!(title = %title, year = ?year, "Searching TMDB for movies");

        let url = format!("{}/search/movie", self.base_url);
        let mut params = vec![("api_key", self.api_key.as_str()), ("query", title)];
        if let Some(year) = year {
            params.push(("primary_release_year", year));
        }

        let response = self
            .client
            .get(&url)
            .query(&params)
            .timeout(REQUEST_TIMEOUT)
            .send()
            .await
            .context("Failed to search TMDB")?;

        if !response.status().is_success() {
            anyhow::bail!("TMDB search failed with status: {}", response.status());
        }

        let body: SearchResponse = response
            .json()
            .await
            .context("Failed to parse TMDB search results")?;

        debug!(count = body.results.len(), "TMDB search returned results");
        Ok(body.results)
    }

    async fn movie_details(&self, tmdb_id: i64) -> Result<TmdbMovieDetails> {
        info!(tmdb_id = tmdb_id, "Fetching movie details from TMDB");

        let url = format!("{}/movie/{}", self.base_url, tmdb_id);
        let response = self
            .client
            .get(&url)
            .query(&[("api_key", self.api_key.as_str())])
            .timeout(REQUEST_TIMEOUT)
            .send()
            .await
            .context("Failed to fetch movie details from TMDB")?;

        if !response.status().is_success() {
            anyhow::bail!(
                "TMDB movie details failed with status: {}",
                response.status()
            );
        }

        let details: TmdbMovieDetails = response
            .json()
            .await
            .context("Failed to parse TMDB movie details")?;

        Ok(details)
    }
}
