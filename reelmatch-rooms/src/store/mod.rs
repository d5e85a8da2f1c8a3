//! Durable room state. Every method is a single atomic operation; callers
//! never hold anything across calls, so multi-step flows must tolerate the
//! data moving underneath them.

mod memory;
mod pg;

pub use memory::MemoryStore;
pub use pg::PgStore;

use std::collections::HashMap;

use async_trait::async_trait;
use reelmatch_shared::errors::{AppError, BackendFailure};
use uuid::Uuid;

use crate::models::{NewRoom, NewSwipe, Participant, Room};
use crate::room::filters::FilterState;

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("store unavailable: {0}")]
    Unavailable(String),

    #[error("conflict: {0}")]
    Conflict(String),

    #[error("store query failed: {0}")]
    Query(String),
}

impl From<StoreError> for AppError {
    fn from(err: StoreError) -> Self {
        match &err {
            // an unreachable store with an unrecognised message is still "down"
            StoreError::Unavailable(raw) if BackendFailure::classify(raw) == BackendFailure::Other => {
                AppError::backend(BackendFailure::Down, &err)
            }
            _ => AppError::unavailable(&err),
        }
    }
}

#[async_trait]
pub trait Store: Send + Sync {
    /// Fails with `Conflict` when the code is already taken.
    async fn insert_room(&self, new_room: NewRoom) -> Result<Room, StoreError>;

    async fn find_room(&self, room_id: Uuid) -> Result<Option<Room>, StoreError>;

    /// `code` must already be upper-cased.
    async fn find_room_by_code(&self, code: &str) -> Result<Option<Room>, StoreError>;

    /// Inserts or renames the participant keyed by `(room_id, user_id)`.
    async fn upsert_participant(
        &self,
        room_id: Uuid,
        user_id: &str,
        nickname: &str,
    ) -> Result<Participant, StoreError>;

    /// Stores the filters and marks the participant ready. `false` when no such participant.
    async fn submit_filters(
        &self,
        room_id: Uuid,
        user_id: &str,
        filters: &FilterState,
    ) -> Result<bool, StoreError>;

    /// Participants in join order.
    async fn list_participants(&self, room_id: Uuid) -> Result<Vec<Participant>, StoreError>;

    /// waiting -> swiping with the deck, only if the room is still waiting.
    /// Returns whether this call made the change.
    async fn start_swiping(&self, room_id: Uuid, movie_ids: &[i64]) -> Result<bool, StoreError>;

    /// swiping -> results, only if the room is still swiping.
    /// Returns whether this call made the change.
    async fn finish_swiping(&self, room_id: Uuid) -> Result<bool, StoreError>;

    /// Inserts or overwrites the swipe keyed by `(room_id, user_id, movie_id)`.
    async fn upsert_swipe(&self, swipe: NewSwipe) -> Result<(), StoreError>;

    /// Swipes per user, counting only movies in `movie_ids`.
    async fn swipe_counts(
        &self,
        room_id: Uuid,
        movie_ids: &[i64],
    ) -> Result<HashMap<String, i64>, StoreError>;

    /// Right swipes per movie.
    async fn right_swipe_counts(&self, room_id: Uuid) -> Result<HashMap<i64, i64>, StoreError>;

    async fn ping(&self) -> Result<(), StoreError>;
}
