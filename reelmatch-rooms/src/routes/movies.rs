use std::sync::Arc;

use axum::extract::{Path, Query, State};
use axum::Json;
use serde::{Deserialize, Serialize};

use reelmatch_shared::errors::{AppError, AppResult};

use crate::catalog::{self, Genre, MovieDetail, MoviePage, WatchProvider, WatchProviders};
use crate::room::filters::MergedQuery;
use crate::AppState;

/// Browse filters, named as the client sends them.
#[derive(Debug, Default, Deserialize)]
pub struct MovieListQuery {
    pub page: Option<u32>,
    pub genre: Option<String>,
    pub providers: Option<String>,
    pub runtime_gte: Option<u32>,
    pub runtime_lte: Option<u32>,
    pub vote_gte: Option<f64>,
}

impl MovieListQuery {
    fn merged(&self) -> MergedQuery {
        let non_empty = |s: &Option<String>| s.clone().filter(|s| !s.trim().is_empty()).unwrap_or_default();
        MergedQuery {
            genres: non_empty(&self.genre),
            providers: non_empty(&self.providers),
            runtime_gte: self.runtime_gte,
            runtime_lte: self.runtime_lte,
            vote_gte: self.vote_gte,
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MovieDetailResponse {
    #[serde(flatten)]
    pub detail: MovieDetail,
    pub trailer_key: Option<String>,
    pub watch_providers: Option<WatchProviders>,
}

/// Popular movies, or a discover query when any filter is set.
pub async fn list_movies(
    State(state): State<Arc<AppState>>,
    Query(query): Query<MovieListQuery>,
) -> AppResult<Json<MoviePage>> {
    let page = query.page.unwrap_or(1).max(1);
    let merged = query.merged();

    let movies = if merged.is_empty() {
        state.catalog.popular(page).await?
    } else {
        state.catalog.discover(&merged, page).await?
    };
    Ok(Json(movies))
}

pub async fn movie_detail(
    State(state): State<Arc<AppState>>,
    Path(movie_id): Path<i64>,
) -> AppResult<Json<MovieDetailResponse>> {
    if movie_id <= 0 {
        return Err(AppError::validation("movie id must be positive"));
    }

    let (detail, videos, watch_providers) = tokio::try_join!(
        state.catalog.movie_detail(movie_id),
        state.catalog.movie_videos(movie_id),
        state.catalog.watch_providers(movie_id),
    )?;

    Ok(Json(MovieDetailResponse {
        detail,
        trailer_key: catalog::trailer_key(&videos),
        watch_providers,
    }))
}

pub async fn genres(State(state): State<Arc<AppState>>) -> AppResult<Json<Vec<Genre>>> {
    Ok(Json(state.catalog.genres().await?))
}

pub async fn providers(State(state): State<Arc<AppState>>) -> AppResult<Json<Vec<WatchProvider>>> {
    Ok(Json(state.catalog.available_providers().await?))
}
