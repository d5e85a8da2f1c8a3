use std::ops::RangeInclusive;
use std::sync::Arc;

use serde::Serialize;
use uuid::Uuid;
use validator::Validate;

use reelmatch_shared::errors::{AppError, AppResult, ErrorCode};

use crate::catalog::CatalogProvider;
use crate::models::{NewRoom, NewSwipe, Participant, Room, RoomStatus, SwipeDirection};
use crate::room::filters::FilterState;
use crate::room::lifecycle::{self, Transition};
use crate::room::{code, ledger};
use crate::store::{Store, StoreError};

pub const EXPECTED_COUNT: RangeInclusive<i32> = 2..=10;
pub const MOVIE_COUNT: RangeInclusive<i32> = 10..=30;
pub const MAX_NICKNAME_LEN: usize = 40;
/// Fresh codes tried before giving up on a run of collisions.
pub const MAX_CODE_ATTEMPTS: usize = 5;
const PLACEHOLDER_TITLE: &str = "Untitled";

/// Result of a filter submission, with the lobby counters the client shows.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SubmitOutcome {
    /// The room has left `waiting`, by this call or an earlier one.
    pub ready: bool,
    /// This call performed the transition.
    pub transitioned: bool,
    pub ready_count: usize,
    pub expected_count: i32,
    pub total_joined: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MatchedMovie {
    pub movie_id: i64,
    pub title: String,
    pub poster_path: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct PollSnapshot {
    pub participants: Vec<Participant>,
    pub room: Room,
    /// `None` until the room reaches results.
    pub matches: Option<Vec<MatchedMovie>>,
}

/// Entry point for every room operation. Holds no room state of its own; all
/// of it lives in the store.
#[derive(Clone)]
pub struct RoomCoordinator {
    store: Arc<dyn Store>,
    catalog: Arc<dyn CatalogProvider>,
}

impl RoomCoordinator {
    pub fn new(store: Arc<dyn Store>, catalog: Arc<dyn CatalogProvider>) -> Self {
        Self { store, catalog }
    }

    pub async fn create_room(&self, expected_count: i32, movie_count: i32) -> AppResult<Room> {
        self.create_room_with(expected_count, movie_count, code::generate).await
    }

    async fn create_room_with(
        &self,
        expected_count: i32,
        movie_count: i32,
        mut next_code: impl FnMut() -> String,
    ) -> AppResult<Room> {
        if !EXPECTED_COUNT.contains(&expected_count) {
            return Err(AppError::validation(format!(
                "expectedCount must be between {} and {}",
                EXPECTED_COUNT.start(),
                EXPECTED_COUNT.end()
            )));
        }
        if !MOVIE_COUNT.contains(&movie_count) {
            return Err(AppError::validation(format!(
                "movieCount must be between {} and {}",
                MOVIE_COUNT.start(),
                MOVIE_COUNT.end()
            )));
        }

        for attempt in 1..=MAX_CODE_ATTEMPTS {
            let new_room = NewRoom {
                code: next_code(),
                expected_count,
                movie_count,
            };
            match self.store.insert_room(new_room).await {
                Ok(room) => {
                    tracing::info!(room_id = %room.id, code = %room.code, expected_count, movie_count, "room created");
                    return Ok(room);
                }
                Err(StoreError::Conflict(e)) => {
                    tracing::debug!(attempt, error = %e, "room code collision, retrying");
                }
                Err(e) => return Err(e.into()),
            }
        }

        tracing::error!(attempts = MAX_CODE_ATTEMPTS, "no free room code");
        Err(AppError::new(
            ErrorCode::ServiceUnavailable,
            "could not allocate a room code, try again",
        ))
    }

    /// Case-insensitive lookup. A malformed code is an error; an unknown one is `None`.
    pub async fn find_room(&self, raw_code: &str) -> AppResult<Option<Room>> {
        let code = code::normalize(raw_code).ok_or_else(|| {
            AppError::new(
                ErrorCode::InvalidRoomCode,
                "room code must be 6 characters from A-Z and 2-9, without I or O",
            )
        })?;
        Ok(self.store.find_room_by_code(&code).await?)
    }

    /// Joins or rejoins. Calling again with the same user only updates the nickname.
    pub async fn join_room(&self, room_id: Uuid, user_id: &str, nickname: &str) -> AppResult<Participant> {
        let user_id = require_user(user_id)?;
        let nickname = nickname.trim();
        if nickname.is_empty() || nickname.chars().count() > MAX_NICKNAME_LEN {
            return Err(AppError::validation(format!(
                "nickname must be between 1 and {MAX_NICKNAME_LEN} characters"
            )));
        }

        self.room(room_id).await?;
        let participant = self.store.upsert_participant(room_id, user_id, nickname).await?;

        tracing::debug!(room_id = %room_id, user_id = %user_id, "participant joined");
        Ok(participant)
    }

    /// Stores the participant's filters, then tries to start swiping.
    pub async fn submit_filters(
        &self,
        room_id: Uuid,
        user_id: &str,
        filters: &FilterState,
    ) -> AppResult<SubmitOutcome> {
        let user_id = require_user(user_id)?;
        filters.validate()?;

        let room = self.room(room_id).await?;
        if !self.store.submit_filters(room_id, user_id, filters).await? {
            return Err(AppError::new(
                ErrorCode::ParticipantNotFound,
                "join the room before submitting filters",
            ));
        }

        let participants = self.store.list_participants(room_id).await?;
        let transition =
            lifecycle::try_start_swiping(self.store.as_ref(), self.catalog.as_ref(), &room, &participants)
                .await?;

        Ok(SubmitOutcome {
            ready: transition.advanced(),
            transitioned: transition == Transition::Performed,
            ready_count: participants.iter().filter(|p| p.filters_ready).count(),
            expected_count: room.expected_count,
            total_joined: participants.len(),
        })
    }

    /// Records a swipe. Matches are only reported by `poll`.
    pub async fn swipe(
        &self,
        room_id: Uuid,
        user_id: &str,
        movie_id: i64,
        direction: SwipeDirection,
    ) -> AppResult<()> {
        let user_id = require_user(user_id)?;
        if movie_id <= 0 {
            return Err(AppError::validation("movieId must be positive"));
        }

        self.room(room_id).await?;
        ledger::record_swipe(
            self.store.as_ref(),
            NewSwipe {
                room_id,
                user_id: user_id.to_string(),
                movie_id,
                direction,
            },
        )
        .await?;
        Ok(())
    }

    /// Current room state. Advances the room when its trigger holds and
    /// recomputes matches once it is in results.
    pub async fn poll(&self, room_id: Uuid) -> AppResult<PollSnapshot> {
        let mut room = self.room(room_id).await?;
        let mut participants = self.store.list_participants(room_id).await?;

        let moved = match room.status {
            RoomStatus::Waiting => {
                lifecycle::try_start_swiping(self.store.as_ref(), self.catalog.as_ref(), &room, &participants)
                    .await?
                    .advanced()
            }
            RoomStatus::Swiping => {
                lifecycle::try_finish_swiping(self.store.as_ref(), &room, &participants)
                    .await?
                    .advanced()
            }
            RoomStatus::Results => false,
        };
        if moved {
            room = self.room(room_id).await?;
            participants = self.store.list_participants(room_id).await?;
        }

        let matches = if room.status == RoomStatus::Results {
            let threshold = participants.len().max(room.expected_count.max(0) as usize);
            let ids =
                ledger::compute_matches(self.store.as_ref(), room_id, &room.movie_ids, threshold).await?;
            Some(self.describe_matches(&ids).await)
        } else {
            None
        };

        Ok(PollSnapshot {
            participants,
            room,
            matches,
        })
    }

    async fn room(&self, room_id: Uuid) -> AppResult<Room> {
        self.store
            .find_room(room_id)
            .await?
            .ok_or_else(|| AppError::new(ErrorCode::RoomNotFound, "room not found"))
    }

    async fn describe_matches(&self, movie_ids: &[i64]) -> Vec<MatchedMovie> {
        let lookups = movie_ids.iter().map(|&movie_id| async move {
            match self.catalog.movie_detail(movie_id).await {
                Ok(detail) => MatchedMovie {
                    movie_id,
                    title: detail.title,
                    poster_path: detail.poster_path,
                },
                Err(e) => {
                    tracing::warn!(movie_id, error = %e, "match detail lookup failed, using placeholder");
                    MatchedMovie {
                        movie_id,
                        title: PLACEHOLDER_TITLE.to_string(),
                        poster_path: None,
                    }
                }
            }
        });
        futures::future::join_all(lookups).await
    }
}

fn require_user(user_id: &str) -> AppResult<&str> {
    let user_id = user_id.trim();
    if user_id.is_empty() {
        return Err(AppError::validation("userId is required"));
    }
    Ok(user_id)
}
