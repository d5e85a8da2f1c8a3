use std::collections::HashMap;
use std::time::Duration;

use async_trait::async_trait;
use reelmatch_shared::clients::redis::RedisClient;
use reqwest::Client;
use serde::de::DeserializeOwned;
use serde::Deserialize;

use super::{
    CatalogError, CatalogProvider, Genre, MovieDetail, MoviePage, Video, WatchProvider,
    WatchProviders,
};
use crate::room::filters::MergedQuery;

const CACHE_PREFIX: &str = "catalog:tmdb";

#[derive(Debug, Clone)]
pub struct TmdbSettings {
    pub api_key: Option<String>,
    pub base_url: String,
    pub language: String,
    pub watch_region: String,
    pub cache_ttl_secs: u64,
    pub timeout_secs: u64,
}

#[derive(Deserialize)]
struct Results<T> {
    results: T,
}

#[derive(Deserialize)]
struct GenreList {
    genres: Vec<Genre>,
}

/// TMDB v3 client with an optional Redis read-through cache.
#[derive(Clone)]
pub struct TmdbClient {
    client: Client,
    settings: TmdbSettings,
    cache: Option<RedisClient>,
}

impl TmdbClient {
    pub fn new(settings: TmdbSettings, cache: Option<RedisClient>) -> Result<Self, CatalogError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(settings.timeout_secs))
            .build()?;

        if settings.api_key.as_deref().map_or(true, str::is_empty) {
            tracing::warn!("TMDB api key is not set, catalog calls will fail");
        }

        Ok(Self {
            client,
            settings,
            cache,
        })
    }

    async fn fetch<T: DeserializeOwned>(
        &self,
        endpoint: &str,
        params: Vec<(&'static str, String)>,
    ) -> Result<T, CatalogError> {
        let api_key = self
            .settings
            .api_key
            .as_deref()
            .filter(|k| !k.is_empty())
            .ok_or_else(|| CatalogError::Misconfigured("TMDB api key is not set".into()))?;

        let mut query = vec![("language", self.settings.language.clone())];
        query.extend(params);

        let key = cache_key(endpoint, &query);
        if let Some(body) = self.cached(&key).await {
            match serde_json::from_str(&body) {
                Ok(value) => return Ok(value),
                Err(e) => tracing::warn!(key = %key, error = %e, "discarding undecodable cache entry"),
            }
        }

        let url = format!("{}{}", self.settings.base_url.trim_end_matches('/'), endpoint);
        let response = self
            .client
            .get(&url)
            .query(&[("api_key", api_key)])
            .query(&query)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(CatalogError::Status {
                status: status.as_u16(),
                body,
            });
        }

        let body = response.text().await?;
        let value = serde_json::from_str(&body)?;
        self.store(&key, &body).await;

        tracing::debug!(endpoint = %endpoint, "catalog fetch");
        Ok(value)
    }

    async fn cached(&self, key: &str) -> Option<String> {
        let cache = self.cache.as_ref()?;
        match cache.get(key).await {
            Ok(hit) => hit,
            Err(e) => {
                tracing::warn!(error = %e, "catalog cache read failed");
                None
            }
        }
    }

    async fn store(&self, key: &str, body: &str) {
        if let Some(cache) = &self.cache {
            if let Err(e) = cache.set(key, body, self.settings.cache_ttl_secs).await {
                tracing::warn!(error = %e, "catalog cache write failed");
            }
        }
    }
}

fn cache_key(endpoint: &str, query: &[(&str, String)]) -> String {
    let params = query
        .iter()
        .map(|(k, v)| format!("{k}={v}"))
        .collect::<Vec<_>>()
        .join("&");
    format!("{CACHE_PREFIX}:{endpoint}?{params}")
}

/// Discover parameters for a merged room query; empty parts are left out.
fn discover_params(query: &MergedQuery, page: u32, watch_region: &str) -> Vec<(&'static str, String)> {
    let mut params = vec![
        ("sort_by", "popularity.desc".to_string()),
        ("page", page.to_string()),
        ("watch_region", watch_region.to_string()),
    ];

    if !query.genres.is_empty() {
        params.push(("with_genres", query.genres.clone()));
    }
    if !query.providers.is_empty() {
        params.push(("with_watch_providers", query.providers.clone()));
    }
    if let Some(gte) = query.runtime_gte {
        params.push(("with_runtime.gte", gte.to_string()));
    }
    if let Some(lte) = query.runtime_lte {
        params.push(("with_runtime.lte", lte.to_string()));
    }
    if let Some(vote) = query.vote_gte {
        params.push(("vote_average.gte", vote.to_string()));
    }

    params
}

#[async_trait]
impl CatalogProvider for TmdbClient {
    async fn discover(&self, query: &MergedQuery, page: u32) -> Result<MoviePage, CatalogError> {
        let params = discover_params(query, page, &self.settings.watch_region);
        self.fetch("/discover/movie", params).await
    }

    async fn popular(&self, page: u32) -> Result<MoviePage, CatalogError> {
        self.fetch("/movie/popular", vec![("page", page.to_string())]).await
    }

    async fn movie_detail(&self, movie_id: i64) -> Result<MovieDetail, CatalogError> {
        self.fetch(&format!("/movie/{movie_id}"), vec![]).await
    }

    async fn movie_videos(&self, movie_id: i64) -> Result<Vec<Video>, CatalogError> {
        let videos: Results<Vec<Video>> =
            self.fetch(&format!("/movie/{movie_id}/videos"), vec![]).await?;
        Ok(videos.results)
    }

    async fn watch_providers(&self, movie_id: i64) -> Result<Option<WatchProviders>, CatalogError> {
        let mut by_region: Results<HashMap<String, WatchProviders>> = self
            .fetch(&format!("/movie/{movie_id}/watch/providers"), vec![])
            .await?;
        Ok(by_region.results.remove(&self.settings.watch_region))
    }

    async fn genres(&self) -> Result<Vec<Genre>, CatalogError> {
        let list: GenreList = self.fetch("/genre/movie/list", vec![]).await?;
        Ok(list.genres)
    }

    async fn available_providers(&self) -> Result<Vec<WatchProvider>, CatalogError> {
        let providers: Results<Vec<WatchProvider>> = self
            .fetch(
                "/watch/providers/movie",
                vec![("watch_region", self.settings.watch_region.clone())],
            )
            .await?;
        Ok(providers.results)
    }
}
