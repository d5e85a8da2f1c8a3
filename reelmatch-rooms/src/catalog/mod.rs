//! Movie catalog seam. The room core only needs paged candidates and per-movie
//! detail; the browsing routes use the rest.

mod tmdb;
mod types;

pub use tmdb::{TmdbClient, TmdbSettings};
pub use types::*;

use async_trait::async_trait;
use reelmatch_shared::errors::{AppError, BackendFailure, ErrorCode};

use crate::room::filters::MergedQuery;

#[derive(Debug, thiserror::Error)]
pub enum CatalogError {
    #[error("catalog not configured: {0}")]
    Misconfigured(String),

    #[error("catalog request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("catalog API error: {status} {body}")]
    Status { status: u16, body: String },

    #[error("catalog response decode failed: {0}")]
    Decode(#[from] serde_json::Error),
}

impl From<CatalogError> for AppError {
    fn from(err: CatalogError) -> Self {
        let failure = match &err {
            CatalogError::Status { status: 404, .. } => {
                return AppError::new(ErrorCode::MovieNotFound, "movie not found");
            }
            CatalogError::Misconfigured(_) | CatalogError::Status { status: 401, .. } => {
                BackendFailure::Misconfigured
            }
            CatalogError::Http(e) if e.is_timeout() || e.is_connect() => BackendFailure::Down,
            _ => return AppError::unavailable(&err),
        };
        AppError::backend(failure, err)
    }
}

#[async_trait]
pub trait CatalogProvider: Send + Sync {
    /// One page of candidates matching `query`, most popular first.
    async fn discover(&self, query: &MergedQuery, page: u32) -> Result<MoviePage, CatalogError>;

    async fn popular(&self, page: u32) -> Result<MoviePage, CatalogError>;

    async fn movie_detail(&self, movie_id: i64) -> Result<MovieDetail, CatalogError>;

    async fn movie_videos(&self, movie_id: i64) -> Result<Vec<Video>, CatalogError>;

    /// Providers for the configured watch region, `None` when the movie is not offered there.
    async fn watch_providers(&self, movie_id: i64) -> Result<Option<WatchProviders>, CatalogError>;

    async fn genres(&self) -> Result<Vec<Genre>, CatalogError>;

    async fn available_providers(&self) -> Result<Vec<WatchProvider>, CatalogError>;
}

/// Picks the YouTube key to embed: an official trailer, then any trailer, then any YouTube video.
pub fn trailer_key(videos: &[Video]) -> Option<String> {
    let youtube = |v: &&Video| v.site == "YouTube";
    let trailer = |v: &&Video| v.kind == "Trailer";

    videos
        .iter()
        .filter(youtube)
        .find(|v| trailer(v) && v.official)
        .or_else(|| videos.iter().filter(youtube).find(trailer))
        .or_else(|| videos.iter().find(youtube))
        .map(|v| v.key.clone())
}
