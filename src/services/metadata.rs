//! Metadata resolution against TMDB
//!
//! One year-scoped search, at most one year-unscoped fallback, first-ranked
//! result authoritative, then a single detail fetch. A transport error or
//! timeout anywhere ends the attempt; nothing is retried.

use anyhow::Result;
use async_trait::async_trait;
use tracing::{debug, info};

use super::tmdb::{TmdbApi, TmdbClient};

/// Catalog-ready metadata for one resolved movie
#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedMovie {
    pub title: String,
    pub tmdb_id: i64,
    pub overview: Option<String>,
    /// Empty when TMDB has no poster for the match
    pub poster_url: String,
    pub release_date: Option<String>,
    pub rating: Option<f64>,
    pub genres: Vec<String>,
}

/// Metadata lookup contract the ingest pipeline runs against.
///
/// Ok(None) means the service answered but had no match; Err means the
/// lookup itself failed. The pipeline treats both as resolution failure.
#[async_trait]
pub trait MovieMetadata: Send + Sync {
    async fn resolve(&self, title: &str, year: Option<&str>) -> Result<Option<ResolvedMovie>>;
}

/// TMDB-backed resolver
pub struct TmdbResolver<C: TmdbApi = TmdbClient> {
    tmdb: C,
}

impl<C: TmdbApi> TmdbResolver<C> {
    pub fn new(tmdb: C) -> Self {
        Self { tmdb }
    }
}

#[async_trait]
impl<C: TmdbApi> MovieMetadata for TmdbResolver<C> {
    async fn resolve(&self, title: &str, year: Option<&str>) -> Result<Option<ResolvedMovie>> {
        info!(title = %title, year = ?year, "Resolving movie metadata");

        let mut results = self.tmdb.search_movie(title, year).await?;

        // One fallback without the year scope, and only one.
        if results.is_empty() && year.is_some() {
            debug!(title = %title, "Year-scoped search empty, retrying without year");
            results = self.tmdb.search_movie(title, None).await?;
        }

        let Some(first) = results.into_iter().next() else {
            info!(title = %title, "No TMDB match found");
            return Ok(None);
        };

        // The first-ranked entry is authoritative; no local re-ranking.
        let details = self.tmdb.movie_details(first.id).await?;

        Ok(Some(ResolvedMovie {
            title: details
                .title
                .clone()
                .or(first.title)
                .unwrap_or_else(|| title.to_string()),
            tmdb_id: details.id,
            overview: details.overview.clone(),
            poster_url: details.poster_url(),
            release_date: details.release_date.clone(),
            rating: details.vote_average,
            genres: details.genre_names(),
        }))
    }
}
