use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::room::filters::FilterState;

// --- RoomStatus ---

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RoomStatus {
    Waiting,
    Swiping,
    Results,
}

impl RoomStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            RoomStatus::Waiting => "waiting",
            RoomStatus::Swiping => "swiping",
            RoomStatus::Results => "results",
        }
    }
}

impl std::fmt::Display for RoomStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for RoomStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "waiting" => Ok(RoomStatus::Waiting),
            "swiping" => Ok(RoomStatus::Swiping),
            "results" => Ok(RoomStatus::Results),
            _ => Err(format!("unknown room status: {s}")),
        }
    }
}

// --- SwipeDirection ---

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SwipeDirection {
    Left,
    Right,
}

impl SwipeDirection {
    pub fn as_str(&self) -> &'static str {
        match self {
            SwipeDirection::Left => "left",
            SwipeDirection::Right => "right",
        }
    }
}

impl std::fmt::Display for SwipeDirection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for SwipeDirection {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "left" => Ok(SwipeDirection::Left),
            "right" => Ok(SwipeDirection::Right),
            _ => Err(format!("unknown swipe direction: {s}")),
        }
    }
}

// --- Room ---

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Room {
    pub id: Uuid,
    pub code: String,
    pub status: RoomStatus,
    pub expected_count: i32,
    pub movie_count: i32,
    /// Empty until the room starts swiping, then fixed.
    pub movie_ids: Vec<i64>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct NewRoom {
    pub code: String,
    pub expected_count: i32,
    pub movie_count: i32,
}

// --- Participant ---

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Participant {
    pub id: Uuid,
    pub room_id: Uuid,
    pub user_id: String,
    pub nickname: String,
    pub filter_data: Option<FilterState>,
    pub filters_ready: bool,
    pub joined_at: DateTime<Utc>,
}

// --- Swipe ---

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Swipe {
    pub room_id: Uuid,
    pub user_id: String,
    pub movie_id: i64,
    pub direction: SwipeDirection,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct NewSwipe {
    pub room_id: Uuid,
    pub user_id: String,
    pub movie_id: i64,
    pub direction: SwipeDirection,
}
