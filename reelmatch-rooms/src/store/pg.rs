use std::collections::HashMap;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use diesel::dsl::count_star;
use diesel::pg::PgConnection;
use diesel::prelude::*;
use diesel::result::{DatabaseErrorKind, Error as DieselError};
use reelmatch_shared::clients::db::DbPool;
use uuid::Uuid;

use super::{Store, StoreError};
use crate::models::{NewRoom, NewSwipe, Participant, Room, RoomStatus, SwipeDirection};
use crate::room::filters::FilterState;
use crate::schema::{room_participants, rooms, swipes};

// --- Rows ---

#[derive(Debug, Queryable, Selectable)]
#[diesel(table_name = rooms)]
#[diesel(check_for_backend(diesel::pg::Pg))]
struct RoomRow {
    id: Uuid,
    code: String,
    status: String,
    expected_count: i32,
    movie_count: i32,
    movie_ids: Vec<i64>,
    created_at: DateTime<Utc>,
}

impl TryFrom<RoomRow> for Room {
    type Error = StoreError;

    fn try_from(row: RoomRow) -> Result<Self, Self::Error> {
        Ok(Room {
            id: row.id,
            code: row.code,
            status: row.status.parse().map_err(StoreError::Query)?,
            expected_count: row.expected_count,
            movie_count: row.movie_count,
            movie_ids: row.movie_ids,
            created_at: row.created_at,
        })
    }
}

#[derive(Debug, Insertable)]
#[diesel(table_name = rooms)]
struct NewRoomRow<'a> {
    code: &'a str,
    status: &'a str,
    expected_count: i32,
    movie_count: i32,
}

#[derive(Debug, Queryable, Selectable)]
#[diesel(table_name = room_participants)]
#[diesel(check_for_backend(diesel::pg::Pg))]
struct ParticipantRow {
    id: Uuid,
    room_id: Uuid,
    user_id: String,
    nickname: String,
    filter_data: Option<serde_json::Value>,
    filters_ready: bool,
    joined_at: DateTime<Utc>,
}

impl TryFrom<ParticipantRow> for Participant {
    type Error = StoreError;

    fn try_from(row: ParticipantRow) -> Result<Self, Self::Error> {
        let filter_data = row
            .filter_data
            .map(serde_json::from_value::<FilterState>)
            .transpose()
            .map_err(|e| StoreError::Query(format!("corrupt filter_data for {}: {e}", row.id)))?;

        Ok(Participant {
            id: row.id,
            room_id: row.room_id,
            user_id: row.user_id,
            nickname: row.nickname,
            filter_data,
            filters_ready: row.filters_ready,
            joined_at: row.joined_at,
        })
    }
}

#[derive(Debug, Insertable)]
#[diesel(table_name = room_participants)]
struct NewParticipantRow<'a> {
    room_id: Uuid,
    user_id: &'a str,
    nickname: &'a str,
}

#[derive(Debug, Insertable)]
#[diesel(table_name = swipes)]
struct NewSwipeRow<'a> {
    room_id: Uuid,
    user_id: &'a str,
    movie_id: i64,
    direction: &'a str,
}

impl From<DieselError> for StoreError {
    fn from(err: DieselError) -> Self {
        match err {
            DieselError::DatabaseError(DatabaseErrorKind::UniqueViolation, info) => {
                StoreError::Conflict(info.message().to_string())
            }
            DieselError::DatabaseError(DatabaseErrorKind::ClosedConnection, info) => {
                StoreError::Unavailable(info.message().to_string())
            }
            other => StoreError::Query(other.to_string()),
        }
    }
}

// --- Store ---

/// PostgreSQL store. Diesel is synchronous, so each call runs on the blocking pool.
#[derive(Clone)]
pub struct PgStore {
    pool: DbPool,
}

impl PgStore {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    async fn run<T, F>(&self, f: F) -> Result<T, StoreError>
    where
        F: FnOnce(&mut PgConnection) -> Result<T, StoreError> + Send + 'static,
        T: Send + 'static,
    {
        let pool = self.pool.clone();
        tokio::task::spawn_blocking(move || {
            let mut conn = pool
                .get()
                .map_err(|e| StoreError::Unavailable(format!("database connection error: {e}")))?;
            f(&mut conn)
        })
        .await
        .map_err(|e| StoreError::Query(format!("database task failed: {e}")))?
    }
}

#[async_trait]
impl Store for PgStore {
    async fn insert_room(&self, new_room: NewRoom) -> Result<Room, StoreError> {
        self.run(move |conn| {
            let row = diesel::insert_into(rooms::table)
                .values(&NewRoomRow {
                    code: &new_room.code,
                    status: RoomStatus::Waiting.as_str(),
                    expected_count: new_room.expected_count,
                    movie_count: new_room.movie_count,
                })
                .returning(RoomRow::as_returning())
                .get_result::<RoomRow>(conn)?;
            Room::try_from(row)
        })
        .await
    }

    async fn find_room(&self, room_id: Uuid) -> Result<Option<Room>, StoreError> {
        self.run(move |conn| {
            rooms::table
                .find(room_id)
                .select(RoomRow::as_select())
                .first::<RoomRow>(conn)
                .optional()?
                .map(Room::try_from)
                .transpose()
        })
        .await
    }

    async fn find_room_by_code(&self, code: &str) -> Result<Option<Room>, StoreError> {
        let code = code.to_string();
        self.run(move |conn| {
            rooms::table
                .filter(rooms::code.eq(&code))
                .select(RoomRow::as_select())
                .first::<RoomRow>(conn)
                .optional()?
                .map(Room::try_from)
                .transpose()
        })
        .await
    }

    async fn upsert_participant(
        &self,
        room_id: Uuid,
        user_id: &str,
        nickname: &str,
    ) -> Result<Participant, StoreError> {
        let user_id = user_id.to_string();
        let nickname = nickname.to_string();
        self.run(move |conn| {
            let row = diesel::insert_into(room_participants::table)
                .values(&NewParticipantRow {
                    room_id,
                    user_id: &user_id,
                    nickname: &nickname,
                })
                .on_conflict((room_participants::room_id, room_participants::user_id))
                .do_update()
                .set(room_participants::nickname.eq(&nickname))
                .returning(ParticipantRow::as_returning())
                .get_result::<ParticipantRow>(conn)?;
            Participant::try_from(row)
        })
        .await
    }

    async fn submit_filters(
        &self,
        room_id: Uuid,
        user_id: &str,
        filters: &FilterState,
    ) -> Result<bool, StoreError> {
        let user_id = user_id.to_string();
        let filter_data = serde_json::to_value(filters)
            .map_err(|e| StoreError::Query(format!("filter encoding failed: {e}")))?;
        self.run(move |conn| {
            let updated = diesel::update(
                room_participants::table
                    .filter(room_participants::room_id.eq(room_id))
                    .filter(room_participants::user_id.eq(&user_id)),
            )
            .set((
                room_participants::filter_data.eq(Some(filter_data)),
                room_participants::filters_ready.eq(true),
            ))
            .execute(conn)?;
            Ok(updated > 0)
        })
        .await
    }

    async fn list_participants(&self, room_id: Uuid) -> Result<Vec<Participant>, StoreError> {
        self.run(move |conn| {
            room_participants::table
                .filter(room_participants::room_id.eq(room_id))
                .order((room_participants::joined_at.asc(), room_participants::id.asc()))
                .select(ParticipantRow::as_select())
                .load::<ParticipantRow>(conn)?
                .into_iter()
                .map(Participant::try_from)
                .collect()
        })
        .await
    }

    async fn start_swiping(&self, room_id: Uuid, movie_ids: &[i64]) -> Result<bool, StoreError> {
        let movie_ids = movie_ids.to_vec();
        self.run(move |conn| {
            let updated = diesel::update(
                rooms::table
                    .filter(rooms::id.eq(room_id))
                    .filter(rooms::status.eq(RoomStatus::Waiting.as_str())),
            )
            .set((
                rooms::status.eq(RoomStatus::Swiping.as_str()),
                rooms::movie_ids.eq(&movie_ids),
            ))
            .execute(conn)?;
            Ok(updated == 1)
        })
        .await
    }

    async fn finish_swiping(&self, room_id: Uuid) -> Result<bool, StoreError> {
        self.run(move |conn| {
            let updated = diesel::update(
                rooms::table
                    .filter(rooms::id.eq(room_id))
                    .filter(rooms::status.eq(RoomStatus::Swiping.as_str())),
            )
            .set(rooms::status.eq(RoomStatus::Results.as_str()))
            .execute(conn)?;
            Ok(updated == 1)
        })
        .await
    }

    async fn upsert_swipe(&self, swipe: NewSwipe) -> Result<(), StoreError> {
        self.run(move |conn| {
            diesel::insert_into(swipes::table)
                .values(&NewSwipeRow {
                    room_id: swipe.room_id,
                    user_id: &swipe.user_id,
                    movie_id: swipe.movie_id,
                    direction: swipe.direction.as_str(),
                })
                .on_conflict((swipes::room_id, swipes::user_id, swipes::movie_id))
                .do_update()
                .set((
                    swipes::direction.eq(swipe.direction.as_str()),
                    swipes::created_at.eq(Utc::now()),
                ))
                .execute(conn)?;
            Ok(())
        })
        .await
    }

    async fn swipe_counts(
        &self,
        room_id: Uuid,
        movie_ids: &[i64],
    ) -> Result<HashMap<String, i64>, StoreError> {
        let movie_ids = movie_ids.to_vec();
        self.run(move |conn| {
            let counts = swipes::table
                .filter(swipes::room_id.eq(room_id))
                .filter(swipes::movie_id.eq_any(movie_ids))
                .group_by(swipes::user_id)
                .select((swipes::user_id, count_star()))
                .load::<(String, i64)>(conn)?;
            Ok(counts.into_iter().collect())
        })
        .await
    }

    async fn right_swipe_counts(&self, room_id: Uuid) -> Result<HashMap<i64, i64>, StoreError> {
        self.run(move |conn| {
            let counts = swipes::table
                .filter(swipes::room_id.eq(room_id))
                .filter(swipes::direction.eq(SwipeDirection::Right.as_str()))
                .group_by(swipes::movie_id)
                .select((swipes::movie_id, count_star()))
                .load::<(i64, i64)>(conn)?;
            Ok(counts.into_iter().collect())
        })
        .await
    }

    async fn ping(&self) -> Result<(), StoreError> {
        self.run(|conn| {
            diesel::sql_query("SELECT 1").execute(conn)?;
            Ok(())
        })
        .await
    }
}
