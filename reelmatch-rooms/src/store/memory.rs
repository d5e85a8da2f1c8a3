use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard};

use async_trait::async_trait;
use chrono::Utc;
use uuid::Uuid;

use super::{Store, StoreError};
use crate::models::{NewRoom, NewSwipe, Participant, Room, RoomStatus, Swipe, SwipeDirection};
use crate::room::filters::FilterState;

#[derive(Default)]
struct Tables {
    rooms: Vec<Room>,
    participants: Vec<Participant>,
    swipes: Vec<Swipe>,
}

/// In-process store for local runs and tests. One mutex guards all tables,
/// which makes every method atomic just like a single SQL statement.
#[derive(Default)]
pub struct MemoryStore {
    tables: Mutex<Tables>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn tables(&self) -> Result<MutexGuard<'_, Tables>, StoreError> {
        self.tables
            .lock()
            .map_err(|_| StoreError::Unavailable("memory store lock poisoned".into()))
    }
}

#[async_trait]
impl Store for MemoryStore {
    async fn insert_room(&self, new_room: NewRoom) -> Result<Room, StoreError> {
        let mut tables = self.tables()?;
        if tables.rooms.iter().any(|r| r.code == new_room.code) {
            return Err(StoreError::Conflict(format!("room code {} already exists", new_room.code)));
        }

        let room = Room {
            id: Uuid::now_v7(),
            code: new_room.code,
            status: RoomStatus::Waiting,
            expected_count: new_room.expected_count,
            movie_count: new_room.movie_count,
            movie_ids: Vec::new(),
            created_at: Utc::now(),
        };
        tables.rooms.push(room.clone());
        Ok(room)
    }

    async fn find_room(&self, room_id: Uuid) -> Result<Option<Room>, StoreError> {
        let tables = self.tables()?;
        Ok(tables.rooms.iter().find(|r| r.id == room_id).cloned())
    }

    async fn find_room_by_code(&self, code: &str) -> Result<Option<Room>, StoreError> {
        let tables = self.tables()?;
        Ok(tables.rooms.iter().find(|r| r.code == code).cloned())
    }

    async fn upsert_participant(
        &self,
        room_id: Uuid,
        user_id: &str,
        nickname: &str,
    ) -> Result<Participant, StoreError> {
        let mut tables = self.tables()?;
        if !tables.rooms.iter().any(|r| r.id == room_id) {
            return Err(StoreError::Query(format!("room {room_id} violates foreign key")));
        }

        if let Some(existing) = tables
            .participants
            .iter_mut()
            .find(|p| p.room_id == room_id && p.user_id == user_id)
        {
            existing.nickname = nickname.to_string();
            return Ok(existing.clone());
        }

        let participant = Participant {
            id: Uuid::now_v7(),
            room_id,
            user_id: user_id.to_string(),
            nickname: nickname.to_string(),
            filter_data: None,
            filters_ready: false,
            joined_at: Utc::now(),
        };
        tables.participants.push(participant.clone());
        Ok(participant)
    }

    async fn submit_filters(
        &self,
        room_id: Uuid,
        user_id: &str,
        filters: &FilterState,
    ) -> Result<bool, StoreError> {
        let mut tables = self.tables()?;
        match tables
            .participants
            .iter_mut()
            .find(|p| p.room_id == room_id && p.user_id == user_id)
        {
            Some(participant) => {
                participant.filter_data = Some(filters.clone());
                participant.filters_ready = true;
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn list_participants(&self, room_id: Uuid) -> Result<Vec<Participant>, StoreError> {
        let tables = self.tables()?;
        Ok(tables
            .participants
            .iter()
            .filter(|p| p.room_id == room_id)
            .cloned()
            .collect())
    }

    async fn start_swiping(&self, room_id: Uuid, movie_ids: &[i64]) -> Result<bool, StoreError> {
        let mut tables = self.tables()?;
        match tables
            .rooms
            .iter_mut()
            .find(|r| r.id == room_id && r.status == RoomStatus::Waiting)
        {
            Some(room) => {
                room.status = RoomStatus::Swiping;
                room.movie_ids = movie_ids.to_vec();
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn finish_swiping(&self, room_id: Uuid) -> Result<bool, StoreError> {
        let mut tables = self.tables()?;
        match tables
            .rooms
            .iter_mut()
            .find(|r| r.id == room_id && r.status == RoomStatus::Swiping)
        {
            Some(room) => {
                room.status = RoomStatus::Results;
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn upsert_swipe(&self, swipe: NewSwipe) -> Result<(), StoreError> {
        let mut tables = self.tables()?;
        if let Some(existing) = tables.swipes.iter_mut().find(|s| {
            s.room_id == swipe.room_id && s.user_id == swipe.user_id && s.movie_id == swipe.movie_id
        }) {
            existing.direction = swipe.direction;
            existing.created_at = Utc::now();
            return Ok(());
        }

        tables.swipes.push(Swipe {
            room_id: swipe.room_id,
            user_id: swipe.user_id,
            movie_id: swipe.movie_id,
            direction: swipe.direction,
            created_at: Utc::now(),
        });
        Ok(())
    }

    async fn swipe_counts(
        &self,
        room_id: Uuid,
        movie_ids: &[i64],
    ) -> Result<HashMap<String, i64>, StoreError> {
        let tables = self.tables()?;
        let mut counts = HashMap::new();
        for swipe in tables
            .swipes
            .iter()
            .filter(|s| s.room_id == room_id && movie_ids.contains(&s.movie_id))
        {
            *counts.entry(swipe.user_id.clone()).or_insert(0) += 1;
        }
        Ok(counts)
    }

    async fn right_swipe_counts(&self, room_id: Uuid) -> Result<HashMap<i64, i64>, StoreError> {
        let tables = self.tables()?;
        let mut counts = HashMap::new();
        for swipe in tables
            .swipes
            .iter()
            .filter(|s| s.room_id == room_id && s.direction == SwipeDirection::Right)
        {
            *counts.entry(swipe.movie_id).or_insert(0) += 1;
        }
        Ok(counts)
    }

    async fn ping(&self) -> Result<(), StoreError> {
        self.tables().map(|_| ())
    }
}
