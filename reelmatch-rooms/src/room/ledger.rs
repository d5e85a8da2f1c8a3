use std::collections::HashMap;

use uuid::Uuid;

use crate::models::NewSwipe;
use crate::store::{Store, StoreError};

/// Records a swipe, replacing any earlier verdict on the same movie by the same user.
pub async fn record_swipe(store: &dyn Store, swipe: NewSwipe) -> Result<(), StoreError> {
    let direction = swipe.direction;
    store.upsert_swipe(swipe).await?;
    metrics::counter!("room_swipes_total", "direction" => direction.as_str()).increment(1);
    Ok(())
}

/// Movies right-swiped by at least `participant_count` users, in deck order.
pub fn matches_from_counts(
    movie_ids: &[i64],
    right_counts: &HashMap<i64, i64>,
    participant_count: usize,
) -> Vec<i64> {
    if participant_count < 2 {
        return Vec::new();
    }
    let threshold = participant_count as i64;

    movie_ids
        .iter()
        .copied()
        .filter(|id| right_counts.get(id).is_some_and(|&n| n >= threshold))
        .collect()
}

/// Recomputes matches from the stored swipes. Reads only.
pub async fn compute_matches(
    store: &dyn Store,
    room_id: Uuid,
    movie_ids: &[i64],
    participant_count: usize,
) -> Result<Vec<i64>, StoreError> {
    if participant_count < 2 || movie_ids.is_empty() {
        return Ok(Vec::new());
    }
    let counts = store.right_swipe_counts(room_id).await?;
    Ok(matches_from_counts(movie_ids, &counts, participant_count))
}
