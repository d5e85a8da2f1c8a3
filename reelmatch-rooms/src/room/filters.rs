use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};
use validator::{Validate, ValidationError};

pub const DURATION_MIN: u32 = 0;
pub const DURATION_MAX: u32 = 240;
pub const RATING_MAX: f64 = 10.0;

/// Coarse mood tag; each one expands to a fixed set of TMDB genre ids.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Vibe {
    #[default]
    Any,
    Fun,
    Intense,
    Thoughtful,
    Romantic,
}

impl Vibe {
    pub fn genre_ids(self) -> &'static [i64] {
        match self {
            Vibe::Any => &[],
            // Comedy, Animation, Family
            Vibe::Fun => &[35, 16, 10751],
            // Action, Thriller, Horror
            Vibe::Intense => &[28, 53, 27],
            // Drama, Documentary, History
            Vibe::Thoughtful => &[18, 99, 36],
            // Romance, Drama
            Vibe::Romantic => &[10749, 18],
        }
    }
}

/// One participant's filter preferences, as submitted from the filter screen.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct FilterState {
    #[serde(default)]
    pub genre_ids: Vec<i64>,
    #[validate(custom = "validate_duration_range")]
    pub duration_range: [u32; 2],
    #[serde(default)]
    pub vibe: Vibe,
    #[serde(default)]
    #[validate(range(min = 0.0, max = 10.0, message = "minRating must be between 0 and 10"))]
    pub min_rating: f64,
    #[serde(default)]
    pub provider_ids: Vec<i64>,
}

fn validate_duration_range(range: &[u32; 2]) -> Result<(), ValidationError> {
    let [min, max] = *range;
    if max > DURATION_MAX || min > max {
        let mut err = ValidationError::new("duration_range");
        err.message = Some(format!("durationRange must satisfy 0 <= min <= max <= {DURATION_MAX}").into());
        return Err(err);
    }
    Ok(())
}

/// Flat discover query produced by merging every ready participant's filters.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct MergedQuery {
    /// Comma-joined genre ids.
    pub genres: String,
    /// Pipe-joined watch provider ids.
    pub providers: String,
    pub runtime_gte: Option<u32>,
    pub runtime_lte: Option<u32>,
    pub vote_gte: Option<f64>,
}

impl MergedQuery {
    pub fn is_empty(&self) -> bool {
        self.genres.is_empty()
            && self.providers.is_empty()
            && self.runtime_gte.is_none()
            && self.runtime_lte.is_none()
            && self.vote_gte.is_none()
    }
}

/// Merges participant filters into one query.
///
/// Genres and providers are unions (vibes contribute their genre set). The
/// runtime window is the widest one covering every participant, and the rating
/// floor is the loosest one. Bounds sitting at the domain edge are dropped.
pub fn merge(filters: &[FilterState]) -> MergedQuery {
    if filters.is_empty() {
        return MergedQuery::default();
    }

    let mut genres = BTreeSet::new();
    let mut providers = BTreeSet::new();
    let mut duration_min = DURATION_MAX;
    let mut duration_max = DURATION_MIN;
    let mut min_rating = RATING_MAX;

    for f in filters {
        genres.extend(f.genre_ids.iter().copied());
        genres.extend(f.vibe.genre_ids().iter().copied());
        providers.extend(f.provider_ids.iter().copied());
        duration_min = duration_min.min(f.duration_range[0]);
        duration_max = duration_max.max(f.duration_range[1]);
        min_rating = min_rating.min(f.min_rating);
    }

    MergedQuery {
        genres: join(&genres, ","),
        providers: join(&providers, "|"),
        runtime_gte: (duration_min > DURATION_MIN).then_some(duration_min),
        runtime_lte: (duration_max < DURATION_MAX).then_some(duration_max),
        vote_gte: (min_rating > 0.0).then_some(min_rating),
    }
}

fn join(ids: &BTreeSet<i64>, sep: &str) -> String {
    ids.iter()
        .map(|id| id.to_string())
        .collect::<Vec<_>>()
        .join(sep)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn filter(genres: &[i64], range: [u32; 2], rating: f64) -> FilterState {
        FilterState {
            genre_ids: genres.to_vec(),
            duration_range: range,
            vibe: Vibe::Any,
            min_rating: rating,
            provider_ids: vec![],
        }
    }

    #[test]
    fn merges_union_of_genres_and_widest_bounds() {
        let merged = merge(&[
            filter(&[1], [0, 90], 5.0),
            filter(&[2], [30, 240], 2.0),
        ]);

        assert_eq!(merged.genres, "1,2");
        assert_eq!(merged.runtime_gte, None);
        assert_eq!(merged.runtime_lte, None);
        assert_eq!(merged.vote_gte, Some(2.0));
    }

    #[test]
    fn interior_runtime_bounds_are_emitted() {
        let merged = merge(&[
            filter(&[], [60, 120], 0.0),
            filter(&[], [45, 100], 0.0),
        ]);

        assert_eq!(merged.runtime_gte, Some(45));
        assert_eq!(merged.runtime_lte, Some(120));
        assert_eq!(merged.vote_gte, None);
    }

    #[test]
    fn vibes_expand_into_genres() {
        let mut a = filter(&[878], [0, 240], 0.0);
        a.vibe = Vibe::Romantic;
        let mut b = filter(&[], [0, 240], 0.0);
        b.vibe = Vibe::Thoughtful;

        let merged = merge(&[a, b]);

        // 18 comes from both vibes but appears once
        assert_eq!(merged.genres, "18,36,99,878,10749");
    }

    #[test]
    fn providers_are_pipe_joined() {
        let mut a = filter(&[], [0, 240], 0.0);
        a.provider_ids = vec![337, 8];
        let mut b = filter(&[], [0, 240], 0.0);
        b.provider_ids = vec![8, 119];

        assert_eq!(merge(&[a, b]).providers, "8|119|337");
    }

    #[test]
    fn no_filters_means_no_query() {
        let merged = merge(&[]);
        assert!(merged.is_empty());
        assert_eq!(merged, MergedQuery::default());
    }

    #[test]
    fn any_vibe_contributes_nothing() {
        let merged = merge(&[filter(&[], [0, 240], 0.0)]);
        assert!(merged.is_empty());
    }

    #[test]
    fn deserializes_client_payload() {
        let json = r#"{
            "genreIds": [28],
            "durationRange": [0, 150],
            "vibe": "intense",
            "minRating": 6.5,
            "providerIds": [8]
        }"#;
        let state: FilterState = serde_json::from_str(json).unwrap();

        assert_eq!(state.vibe, Vibe::Intense);
        assert_eq!(state.duration_range, [0, 150]);
        assert!(state.validate().is_ok());
    }

    #[test]
    fn rejects_inverted_or_oversized_duration() {
        assert!(filter(&[], [120, 60], 0.0).validate().is_err());
        assert!(filter(&[], [0, 300], 0.0).validate().is_err());
    }

    #[test]
    fn rejects_rating_out_of_range() {
        assert!(filter(&[], [0, 240], 11.0).validate().is_err());
        assert!(filter(&[], [0, 240], -1.0).validate().is_err());
    }
}
