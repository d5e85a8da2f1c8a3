//! Room state machine: waiting -> swiping -> results.
//!
//! Trigger checks run on whatever snapshot the caller read; the final write is
//! a status compare-and-swap, so concurrent callers that all see the trigger
//! still produce exactly one transition.

use std::collections::HashMap;

use reelmatch_shared::errors::AppError;

use crate::catalog::{CatalogError, CatalogProvider};
use crate::models::{Participant, Room, RoomStatus};
use crate::room::{deck, filters};
use crate::store::{Store, StoreError};

#[derive(Debug, thiserror::Error)]
pub enum LifecycleError {
    #[error(transparent)]
    Store(#[from] StoreError),

    /// The deck could not be built; the room stays waiting.
    #[error(transparent)]
    Catalog(#[from] CatalogError),
}

impl From<LifecycleError> for AppError {
    fn from(err: LifecycleError) -> Self {
        match err {
            LifecycleError::Store(e) => e.into(),
            LifecycleError::Catalog(e) => e.into(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transition {
    /// This call wrote the new status.
    Performed,
    /// The room is already past this edge, by this call's read or a lost race.
    AlreadyAdvanced,
    NotReady,
}

impl Transition {
    pub fn advanced(self) -> bool {
        !matches!(self, Transition::NotReady)
    }
}

/// Everyone expected has joined and at least that many have submitted filters.
pub fn ready_to_swipe(participants: &[Participant], expected_count: i32) -> bool {
    let expected = expected_count.max(0) as usize;
    let ready = participants.iter().filter(|p| p.filters_ready).count();
    participants.len() >= expected && ready >= expected
}

/// Every participant has swiped at least `deck_len` deck movies.
pub fn deck_exhausted(
    participants: &[Participant],
    swipe_counts: &HashMap<String, i64>,
    deck_len: usize,
    expected_count: i32,
) -> bool {
    if participants.len() < expected_count.max(0) as usize {
        return false;
    }
    participants
        .iter()
        .all(|p| swipe_counts.get(&p.user_id).copied().unwrap_or(0) >= deck_len as i64)
}

/// waiting -> swiping. Merges the ready participants' filters, builds the deck
/// and swaps the status only if the room is still waiting. A catalog failure
/// leaves the room untouched so a later submit or poll retries.
pub async fn try_start_swiping(
    store: &dyn Store,
    catalog: &dyn CatalogProvider,
    room: &Room,
    participants: &[Participant],
) -> Result<Transition, LifecycleError> {
    if room.status != RoomStatus::Waiting {
        return Ok(Transition::AlreadyAdvanced);
    }
    if !ready_to_swipe(participants, room.expected_count) {
        return Ok(Transition::NotReady);
    }

    let submitted: Vec<filters::FilterState> = participants
        .iter()
        .filter(|p| p.filters_ready)
        .filter_map(|p| p.filter_data.clone())
        .collect();
    let query = filters::merge(&submitted);
    let movie_ids = match deck::build(catalog, &query, room.movie_count.max(0) as usize).await {
        Ok(movie_ids) => movie_ids,
        Err(e) => {
            tracing::warn!(room_id = %room.id, error = %e, "deck build failed, room stays waiting");
            return Err(e.into());
        }
    };

    if store.start_swiping(room.id, &movie_ids).await? {
        metrics::counter!("room_transitions_total", "to" => RoomStatus::Swiping.as_str()).increment(1);
        tracing::info!(room_id = %room.id, deck = movie_ids.len(), "room transitioned to swiping");
        Ok(Transition::Performed)
    } else {
        tracing::debug!(room_id = %room.id, "swiping transition lost the race");
        Ok(Transition::AlreadyAdvanced)
    }
}

/// swiping -> results once every participant has gone through the whole deck.
pub async fn try_finish_swiping(
    store: &dyn Store,
    room: &Room,
    participants: &[Participant],
) -> Result<Transition, StoreError> {
    match room.status {
        RoomStatus::Waiting => return Ok(Transition::NotReady),
        RoomStatus::Results => return Ok(Transition::AlreadyAdvanced),
        RoomStatus::Swiping => {}
    }
    if participants.len() < room.expected_count.max(0) as usize {
        return Ok(Transition::NotReady);
    }

    let counts = store.swipe_counts(room.id, &room.movie_ids).await?;
    if !deck_exhausted(participants, &counts, room.movie_ids.len(), room.expected_count) {
        return Ok(Transition::NotReady);
    }

    if store.finish_swiping(room.id).await? {
        metrics::counter!("room_transitions_total", "to" => RoomStatus::Results.as_str()).increment(1);
        tracing::info!(room_id = %room.id, "room transitioned to results");
        Ok(Transition::Performed)
    } else {
        tracing::debug!(room_id = %room.id, "results transition lost the race");
        Ok(Transition::AlreadyAdvanced)
    }
}
