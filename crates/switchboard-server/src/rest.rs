//! Room management REST surface under `/v1/rtc/room`.
//!
//! Participants registered here carry no connection, so relay skips them.
//! Bodies are parsed by hand so every rejection renders as `{"error": ..}`.

use axum::Json;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use bytes::Bytes;
use metrics::counter;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tracing::info;
use uuid::Uuid;

use crate::error::ApiError;
use crate::metrics as names;
use crate::server::AppState;

/// Body of `POST /v1/rtc/room`. Both the body and the field are optional.
#[derive(Debug, Default, Deserialize)]
pub struct CreateRoomRequest {
    /// Requested room identifier; generated when absent or empty.
    #[serde(default)]
    pub room_id: Option<String>,
}

/// Response to room creation.
#[derive(Debug, Serialize, Deserialize)]
pub struct RoomCreated {
    /// Room identifier.
    pub id: String,
    /// Participant count.
    pub users: usize,
}

/// Response to room lookup.
#[derive(Debug, Serialize, Deserialize)]
pub struct RoomView {
    /// Room identifier.
    pub id: String,
    /// Participant identifiers, sorted.
    pub users: Vec<String>,
}

/// Body of the join and leave endpoints.
#[derive(Debug, Deserialize)]
pub struct MembershipRequest {
    /// Participant to add or remove.
    pub user_id: String,
}

/// Confirmation body for join and leave.
#[derive(Debug, Serialize, Deserialize)]
pub struct MessageResponse {
    /// Human-readable confirmation.
    pub message: String,
}

/// POST `/v1/rtc/room`
pub async fn create_room(
    State(state): State<AppState>,
    body: Bytes,
) -> Result<(StatusCode, Json<RoomCreated>), ApiError> {
    let req: CreateRoomRequest = if body.iter().all(u8::is_ascii_whitespace) {
        CreateRoomRequest::default()
    } else {
        parse_body(&body)?
    };
    let room_id = req
        .room_id
        .filter(|id| !id.is_empty())
        .unwrap_or_else(|| Uuid::new_v4().to_string());

    let room = state.registry.create_room(room_id)?;
    counter!(names::ROOMS_CREATED_TOTAL).increment(1);
    info!(room_id = room.id(), "room created");

    Ok((
        StatusCode::CREATED,
        Json(RoomCreated {
            id: room.id().to_owned(),
            users: room.participant_count(),
        }),
    ))
}

/// GET `/v1/rtc/room/{room_id}`
pub async fn get_room(
    State(state): State<AppState>,
    Path(room_id): Path<String>,
) -> Result<Json<RoomView>, ApiError> {
    let room = state.registry.get_room(&room_id)?;
    Ok(Json(RoomView {
        id: room.id().to_owned(),
        users: room.participant_ids(),
    }))
}

/// POST `/v1/rtc/room/{room_id}/join`
pub async fn join_room(
    State(state): State<AppState>,
    Path(room_id): Path<String>,
    body: Bytes,
) -> Result<Json<MessageResponse>, ApiError> {
    let user_id = membership_user(&body)?;
    let _ = state.registry.register_participant(&room_id, user_id.clone())?;
    info!(%room_id, participant_id = %user_id, "participant registered");
    Ok(Json(MessageResponse {
        message: format!("User {user_id} joined room {room_id}"),
    }))
}

/// POST `/v1/rtc/room/{room_id}/leave`
pub async fn leave_room(
    State(state): State<AppState>,
    Path(room_id): Path<String>,
    body: Bytes,
) -> Result<Json<MessageResponse>, ApiError> {
    let user_id = membership_user(&body)?;
    state.registry.leave_room(&room_id, &user_id)?;
    info!(%room_id, participant_id = %user_id, "participant removed");
    Ok(Json(MessageResponse {
        message: format!("User {user_id} left room {room_id}"),
    }))
}

fn membership_user(body: &[u8]) -> Result<String, ApiError> {
    let req: MembershipRequest = parse_body(body)?;
    if req.user_id.is_empty() {
        return Err(ApiError::BadRequest("user_id is required".into()));
    }
    Ok(req.user_id)
}

pub(crate) fn parse_body<T: DeserializeOwned>(body: &[u8]) -> Result<T, ApiError> {
    serde_json::from_slice(body).map_err(|e| ApiError::BadRequest(format!("invalid request body: {e}")))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn membership_requires_user_id() {
        assert!(matches!(
            membership_user(br#"{"user_id": ""}"#),
            Err(ApiError::BadRequest(_))
        ));
        assert!(matches!(membership_user(b"{}"), Err(ApiError::BadRequest(_))));
        assert!(matches!(membership_user(b""), Err(ApiError::BadRequest(_))));
        assert_eq!(membership_user(br#"{"user_id": "u1"}"#).unwrap(), "u1");
    }

    #[test]
    fn create_request_fields_optional() {
        let req: CreateRoomRequest = parse_body(b"{}").unwrap();
        assert!(req.room_id.is_none());
        let req: CreateRoomRequest = parse_body(br#"{"room_id": "lobby"}"#).unwrap();
        assert_eq!(req.room_id.as_deref(), Some("lobby"));
    }

    #[test]
    fn parse_body_reports_serde_error() {
        let err = parse_body::<CreateRoomRequest>(b"not json").unwrap_err();
        assert!(err.to_string().starts_with("invalid request body:"));
    }
}
