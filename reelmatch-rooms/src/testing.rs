//! Test doubles shared by the unit tests.

use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use axum::body::Body;
use axum::http::{header, Request, StatusCode};
use axum::Router;
use metrics_exporter_prometheus::PrometheusBuilder;
use serde_json::Value;
use tower::ServiceExt;

use crate::catalog::{
    CatalogError, CatalogProvider, Genre, MovieDetail, MoviePage, MovieSummary, Video,
    WatchProvider, WatchProviders,
};
use crate::config::AppConfig;
use crate::room::filters::MergedQuery;
use crate::store::MemoryStore;
use crate::AppState;

/// Scripted catalog: page `n` of any query returns `pages[n - 1]`.
#[derive(Default)]
pub struct MockCatalog {
    pages: Vec<Vec<i64>>,
    fail_from_page: Mutex<Option<u32>>,
    titles: HashMap<i64, String>,
    failing_details: HashSet<i64>,
    discover_calls: Mutex<Vec<(MergedQuery, u32)>>,
}

impl MockCatalog {
    pub fn with_pages(pages: Vec<Vec<i64>>) -> Self {
        Self {
            pages,
            ..Self::default()
        }
    }

    pub fn failing_from_page(self, page: u32) -> Self {
        *self.fail_from_page.lock().unwrap() = Some(page);
        self
    }

    /// Ends a scripted outage; later pages are served normally.
    pub fn recover(&self) {
        *self.fail_from_page.lock().unwrap() = None;
    }

    pub fn with_title(mut self, movie_id: i64, title: &str) -> Self {
        self.titles.insert(movie_id, title.to_string());
        self
    }

    pub fn failing_detail(mut self, movie_id: i64) -> Self {
        self.failing_details.insert(movie_id);
        self
    }

    pub fn discover_pages(&self) -> Vec<u32> {
        self.calls().into_iter().map(|(_, page)| page).collect()
    }

    pub fn discover_queries(&self) -> Vec<MergedQuery> {
        self.calls().into_iter().map(|(query, _)| query).collect()
    }

    fn calls(&self) -> Vec<(MergedQuery, u32)> {
        self.discover_calls.lock().unwrap().clone()
    }

    fn page(&self, page: u32) -> Result<MoviePage, CatalogError> {
        if self.fail_from_page.lock().unwrap().is_some_and(|from| page >= from) {
            return Err(CatalogError::Status {
                status: 500,
                body: "scripted failure".into(),
            });
        }

        let results = self
            .pages
            .get(page as usize - 1)
            .map(|ids| ids.iter().map(|&id| summary(id)).collect())
            .unwrap_or_default();

        Ok(MoviePage {
            page,
            results,
            total_pages: self.pages.len() as u32,
            total_results: self.pages.iter().map(Vec::len).sum::<usize>() as u32,
        })
    }
}

fn summary(id: i64) -> MovieSummary {
    MovieSummary {
        id,
        title: format!("Movie {id}"),
        original_title: format!("Movie {id}"),
        overview: String::new(),
        poster_path: Some(format!("/poster-{id}.jpg")),
        backdrop_path: None,
        release_date: "2024-01-01".into(),
        vote_average: 7.0,
        vote_count: 100,
        popularity: 10.0,
        genre_ids: vec![18],
        adult: false,
        original_language: "en".into(),
    }
}

#[async_trait]
impl CatalogProvider for MockCatalog {
    async fn discover(&self, query: &MergedQuery, page: u32) -> Result<MoviePage, CatalogError> {
        self.discover_calls
            .lock()
            .unwrap()
            .push((query.clone(), page));
        // lets concurrent callers interleave between reading the room and writing it
        tokio::task::yield_now().await;
        self.page(page)
    }

    async fn popular(&self, page: u32) -> Result<MoviePage, CatalogError> {
        self.page(page)
    }

    async fn movie_detail(&self, movie_id: i64) -> Result<MovieDetail, CatalogError> {
        if self.failing_details.contains(&movie_id) {
            return Err(CatalogError::Status {
                status: 500,
                body: "scripted failure".into(),
            });
        }

        let base = summary(movie_id);
        Ok(MovieDetail {
            id: movie_id,
            title: self.titles.get(&movie_id).cloned().unwrap_or(base.title),
            original_title: base.original_title,
            overview: base.overview,
            poster_path: base.poster_path,
            backdrop_path: None,
            release_date: base.release_date,
            vote_average: base.vote_average,
            vote_count: base.vote_count,
            popularity: base.popularity,
            genres: vec![Genre {
                id: 18,
                name: "Drama".into(),
            }],
            runtime: Some(120),
            status: "Released".into(),
            tagline: None,
            homepage: None,
            imdb_id: None,
            original_language: base.original_language,
            production_companies: vec![],
        })
    }

    async fn movie_videos(&self, _movie_id: i64) -> Result<Vec<Video>, CatalogError> {
        Ok(vec![Video {
            id: "v1".into(),
            key: "trailer-key".into(),
            name: "Official Trailer".into(),
            site: "YouTube".into(),
            size: 1080,
            kind: "Trailer".into(),
            official: true,
        }])
    }

    async fn watch_providers(&self, _movie_id: i64) -> Result<Option<WatchProviders>, CatalogError> {
        Ok(None)
    }

    async fn genres(&self) -> Result<Vec<Genre>, CatalogError> {
        Ok(vec![
            Genre {
                id: 18,
                name: "Drama".into(),
            },
            Genre {
                id: 35,
                name: "Comedy".into(),
            },
        ])
    }

    async fn available_providers(&self) -> Result<Vec<WatchProvider>, CatalogError> {
        Ok(vec![WatchProvider {
            provider_id: 8,
            provider_name: "Netflix".into(),
            logo_path: None,
            display_priority: 1,
        }])
    }
}

/// Router over a fresh `MemoryStore` and the given catalog.
pub fn app(catalog: MockCatalog) -> Router {
    let state = AppState::new(
        AppConfig::default(),
        Arc::new(MemoryStore::new()),
        Arc::new(catalog),
        None,
        PrometheusBuilder::new().build_recorder().handle(),
    );
    crate::router(Arc::new(state))
}

/// Sends one request through `app` and decodes the JSON body.
pub async fn send(
    app: &Router,
    method: &str,
    uri: &str,
    body: Option<Value>,
) -> (StatusCode, Value) {
    let mut request = Request::builder().method(method).uri(uri);
    let body = match body {
        Some(json) => {
            request = request.header(header::CONTENT_TYPE, "application/json");
            Body::from(json.to_string())
        }
        None => Body::empty(),
    };

    let response = app.clone().oneshot(request.body(body).unwrap()).await.unwrap();
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let json = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
    (status, json)
}
