use std::sync::Arc;

use axum::extract::{Query, State};
use axum::Json;
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

use reelmatch_shared::errors::{AppError, AppResult};
use reelmatch_shared::middleware::ValidatedJson;

use crate::models::{Participant, Room, SwipeDirection};
use crate::room::filters::FilterState;
use crate::room::{PollSnapshot, SubmitOutcome};
use crate::AppState;

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CreateRoomRequest {
    #[validate(range(min = 2, max = 10, message = "expectedCount must be between 2 and 10"))]
    pub expected_count: i32,
    #[validate(range(min = 10, max = 30, message = "movieCount must be between 10 and 30"))]
    pub movie_count: i32,
}

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct JoinRoomRequest {
    pub room_id: Uuid,
    #[validate(length(min = 1, max = 100, message = "userId is required"))]
    pub user_id: String,
    #[validate(length(min = 1, max = 40, message = "nickname must be between 1 and 40 characters"))]
    pub nickname: String,
}

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct SubmitFiltersRequest {
    pub room_id: Uuid,
    #[validate(length(min = 1, max = 100, message = "userId is required"))]
    pub user_id: String,
    #[validate]
    pub filter_data: FilterState,
}

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct SwipeRequest {
    pub room_id: Uuid,
    #[validate(length(min = 1, max = 100, message = "userId is required"))]
    pub user_id: String,
    #[validate(range(min = 1, message = "movieId must be positive"))]
    pub movie_id: i64,
    pub direction: SwipeDirection,
}

#[derive(Debug, Deserialize)]
pub struct FindRoomQuery {
    pub code: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct PollQuery {
    pub room_id: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct RoomResponse {
    pub room: Option<Room>,
}

#[derive(Debug, Serialize)]
pub struct ParticipantResponse {
    pub participant: Participant,
}

#[derive(Debug, Serialize)]
pub struct SwipeResponse {}

pub async fn create_room(
    State(state): State<Arc<AppState>>,
    ValidatedJson(req): ValidatedJson<CreateRoomRequest>,
) -> AppResult<Json<RoomResponse>> {
    let room = state.rooms.create_room(req.expected_count, req.movie_count).await?;
    Ok(Json(RoomResponse { room: Some(room) }))
}

pub async fn find_room(
    State(state): State<Arc<AppState>>,
    Query(query): Query<FindRoomQuery>,
) -> AppResult<Json<RoomResponse>> {
    let code = query
        .code
        .filter(|c| !c.trim().is_empty())
        .ok_or_else(|| AppError::validation("code is required"))?;
    let room = state.rooms.find_room(&code).await?;
    Ok(Json(RoomResponse { room }))
}

pub async fn join_room(
    State(state): State<Arc<AppState>>,
    ValidatedJson(req): ValidatedJson<JoinRoomRequest>,
) -> AppResult<Json<ParticipantResponse>> {
    let participant = state
        .rooms
        .join_room(req.room_id, &req.user_id, &req.nickname)
        .await?;
    Ok(Json(ParticipantResponse { participant }))
}

pub async fn submit_filters(
    State(state): State<Arc<AppState>>,
    ValidatedJson(req): ValidatedJson<SubmitFiltersRequest>,
) -> AppResult<Json<SubmitOutcome>> {
    let outcome = state
        .rooms
        .submit_filters(req.room_id, &req.user_id, &req.filter_data)
        .await?;
    Ok(Json(outcome))
}

pub async fn swipe(
    State(state): State<Arc<AppState>>,
    ValidatedJson(req): ValidatedJson<SwipeRequest>,
) -> AppResult<Json<SwipeResponse>> {
    state
        .rooms
        .swipe(req.room_id, &req.user_id, req.movie_id, req.direction)
        .await?;
    Ok(Json(SwipeResponse {}))
}

pub async fn poll(
    State(state): State<Arc<AppState>>,
    Query(query): Query<PollQuery>,
) -> AppResult<Json<PollSnapshot>> {
    let room_id = query
        .room_id
        .ok_or_else(|| AppError::validation("room_id is required"))?;
    let room_id = Uuid::parse_str(room_id.trim())
        .map_err(|_| AppError::validation("room_id must be a UUID"))?;

    let snapshot = state.rooms.poll(room_id).await?;
    Ok(Json(snapshot))
}

#[cfg(test)]
mod tests {
    use axum::http::StatusCode;
    use serde_json::{json, Value};

    use crate::testing::{app, send, MockCatalog};

    fn open_filters() -> Value {
        json!({ "genreIds": [], "durationRange": [0, 240], "vibe": "any", "minRating": 0, "providerIds": [] })
    }

    #[tokio::test]
    async fn full_room_flow_over_http() {
        let app = app(MockCatalog::with_pages(vec![vec![1, 2]]).with_title(2, "Bacurau"));

        let (status, body) =
            send(&app, "POST", "/rooms", Some(json!({ "expectedCount": 2, "movieCount": 10 }))).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["room"]["status"], "waiting");
        assert_eq!(body["room"]["movie_ids"], json!([]));
        let room_id = body["room"]["id"].as_str().unwrap().to_string();
        let code = body["room"]["code"].as_str().unwrap().to_lowercase();

        let (status, body) = send(&app, "GET", &format!("/rooms?code={code}"), None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["room"]["id"], room_id.as_str());

        for user in ["u1", "u2"] {
            let (status, body) = send(
                &app,
                "POST",
                "/rooms/join",
                Some(json!({ "roomId": room_id, "userId": user, "nickname": user })),
            )
            .await;
            assert_eq!(status, StatusCode::OK);
            assert_eq!(body["participant"]["user_id"], user);
            assert_eq!(body["participant"]["filters_ready"], false);
        }

        let (_, body) = send(
            &app,
            "POST",
            "/rooms/filters",
            Some(json!({ "roomId": room_id, "userId": "u1", "filterData": open_filters() })),
        )
        .await;
        assert_eq!(
            body,
            json!({ "ready": false, "transitioned": false, "readyCount": 1, "expectedCount": 2, "totalJoined": 2 })
        );

        let (_, body) = send(
            &app,
            "POST",
            "/rooms/filters",
            Some(json!({ "roomId": room_id, "userId": "u2", "filterData": open_filters() })),
        )
        .await;
        assert_eq!(body["ready"], true);

        for (user, movie, direction) in [("u1", 1, "left"), ("u2", 1, "right"), ("u1", 2, "right"), ("u2", 2, "right")] {
            let (status, body) = send(
                &app,
                "POST",
                "/rooms/swipe",
                Some(json!({ "roomId": room_id, "userId": user, "movieId": movie, "direction": direction })),
            )
            .await;
            assert_eq!(status, StatusCode::OK);
            assert_eq!(body, json!({}));
        }

        let (status, body) = send(&app, "GET", &format!("/rooms/poll?room_id={room_id}"), None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["room"]["status"], "results");
        assert_eq!(body["room"]["movie_ids"], json!([1, 2]));
        assert_eq!(body["participants"].as_array().unwrap().len(), 2);
        assert_eq!(
            body["matches"],
            json!([{ "movieId": 2, "title": "Bacurau", "posterPath": "/poster-2.jpg" }])
        );
    }

    #[tokio::test]
    async fn catalog_outage_on_last_submission_is_service_unavailable() {
        let app = app(MockCatalog::with_pages(vec![vec![1, 2]]).failing_from_page(1));
        let (_, body) =
            send(&app, "POST", "/rooms", Some(json!({ "expectedCount": 2, "movieCount": 10 }))).await;
        let room_id = body["room"]["id"].as_str().unwrap().to_string();

        for user in ["u1", "u2"] {
            send(&app, "POST", "/rooms/join", Some(json!({ "roomId": room_id, "userId": user, "nickname": user }))).await;
        }
        send(&app, "POST", "/rooms/filters", Some(json!({ "roomId": room_id, "userId": "u1", "filterData": open_filters() }))).await;

        let (status, body) = send(
            &app,
            "POST",
            "/rooms/filters",
            Some(json!({ "roomId": room_id, "userId": "u2", "filterData": open_filters() })),
        )
        .await;
        assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
        assert_eq!(body["error"]["code"], "E0007");

        let (status, _) = send(&app, "GET", &format!("/rooms/poll?room_id={room_id}"), None).await;
        assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    }

    #[tokio::test]
    async fn poll_before_results_has_null_matches() {
        let app = app(MockCatalog::default());
        let (_, body) =
            send(&app, "POST", "/rooms", Some(json!({ "expectedCount": 3, "movieCount": 15 }))).await;
        let room_id = body["room"]["id"].as_str().unwrap().to_string();

        let (status, body) = send(&app, "GET", &format!("/rooms/poll?room_id={room_id}"), None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["matches"], Value::Null);
        assert_eq!(body["room"]["expected_count"], 3);
        assert_eq!(body["room"]["movie_count"], 15);
    }

    #[tokio::test]
    async fn out_of_range_counts_are_rejected() {
        let app = app(MockCatalog::default());
        let (status, body) =
            send(&app, "POST", "/rooms", Some(json!({ "expectedCount": 12, "movieCount": 10 }))).await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["success"], false);
        assert_eq!(body["error"]["code"], "E0002");
    }

    #[tokio::test]
    async fn missing_fields_are_rejected() {
        let app = app(MockCatalog::default());

        let (status, _) = send(&app, "POST", "/rooms/join", Some(json!({ "userId": "u1" }))).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);

        let (status, _) = send(&app, "GET", "/rooms/poll", None).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);

        let (status, _) = send(&app, "GET", "/rooms", None).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn invalid_swipe_direction_is_rejected() {
        let app = app(MockCatalog::default());
        let (status, _) = send(
            &app,
            "POST",
            "/rooms/swipe",
            Some(json!({
                "roomId": "018f3e3c-0000-7000-8000-000000000000",
                "userId": "u1",
                "movieId": 5,
                "direction": "up"
            })),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn unknown_code_is_null_and_unknown_room_is_not_found() {
        let app = app(MockCatalog::default());

        let (status, body) = send(&app, "GET", "/rooms?code=ZZZZZZ", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, json!({ "room": null }));

        let (status, body) = send(
            &app,
            "GET",
            "/rooms/poll?room_id=018f3e3c-0000-7000-8000-000000000000",
            None,
        )
        .await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["error"]["code"], "E3001");
    }
}
