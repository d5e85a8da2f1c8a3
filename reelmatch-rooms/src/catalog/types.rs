use serde::{Deserialize, Serialize};

// --- Paging ---

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MoviePage {
    pub page: u32,
    pub results: Vec<MovieSummary>,
    pub total_pages: u32,
    pub total_results: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MovieSummary {
    pub id: i64,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub original_title: String,
    #[serde(default)]
    pub overview: String,
    pub poster_path: Option<String>,
    pub backdrop_path: Option<String>,
    #[serde(default)]
    pub release_date: String,
    #[serde(default)]
    pub vote_average: f64,
    #[serde(default)]
    pub vote_count: i64,
    #[serde(default)]
    pub popularity: f64,
    #[serde(default)]
    pub genre_ids: Vec<i64>,
    #[serde(default)]
    pub adult: bool,
    #[serde(default)]
    pub original_language: String,
}

// --- Detail ---

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MovieDetail {
    pub id: i64,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub original_title: String,
    #[serde(default)]
    pub overview: String,
    pub poster_path: Option<String>,
    pub backdrop_path: Option<String>,
    #[serde(default)]
    pub release_date: String,
    #[serde(default)]
    pub vote_average: f64,
    #[serde(default)]
    pub vote_count: i64,
    #[serde(default)]
    pub popularity: f64,
    #[serde(default)]
    pub genres: Vec<Genre>,
    pub runtime: Option<i32>,
    #[serde(default)]
    pub status: String,
    pub tagline: Option<String>,
    pub homepage: Option<String>,
    pub imdb_id: Option<String>,
    #[serde(default)]
    pub original_language: String,
    #[serde(default)]
    pub production_companies: Vec<ProductionCompany>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Genre {
    pub id: i64,
    pub name: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProductionCompany {
    pub id: i64,
    pub name: String,
    pub logo_path: Option<String>,
    #[serde(default)]
    pub origin_country: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Video {
    pub id: String,
    pub key: String,
    #[serde(default)]
    pub name: String,
    pub site: String,
    #[serde(default)]
    pub size: i32,
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default)]
    pub official: bool,
}

// --- Watch providers ---

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WatchProvider {
    pub provider_id: i64,
    pub provider_name: String,
    #[serde(default)]
    pub logo_path: Option<String>,
    #[serde(default)]
    pub display_priority: i32,
}

/// Where a movie can be watched in one region.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct WatchProviders {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub link: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub flatrate: Option<Vec<WatchProvider>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rent: Option<Vec<WatchProvider>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub buy: Option<Vec<WatchProvider>>,
}
