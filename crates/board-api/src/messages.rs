use axum::{
    Json,
    extract::{
        Path, State,
        rejection::{JsonRejection, PathRejection},
    },
    http::StatusCode,
    response::IntoResponse,
};
use tracing::{debug, error, warn};

use board_db::{Database, StoreError};
use board_types::api::{CreateMessageRequest, Envelope, UpdateMessageRequest};
use board_types::events::BoardEvent;
use board_types::models::{Message, NewMessage};

use crate::error::ApiError;
use crate::state::AppState;

/// Run a store call on the blocking pool.
async fn with_db<F, T>(state: &AppState, f: F) -> Result<T, ApiError>
where
    F: FnOnce(&Database) -> Result<T, StoreError> + Send + 'static,
    T: Send + 'static,
{
    let db = state.db.clone();
    tokio::task::spawn_blocking(move || f(&db))
        .await
        .map_err(|e| {
            error!("spawn_blocking join error: {}", e);
            ApiError::Internal(e.to_string())
        })?
        .map_err(ApiError::from)
}

fn non_blank(body: &str) -> Result<(), ApiError> {
    if body.trim().is_empty() {
        return Err(ApiError::BadRequest("body is missing".into()));
    }
    Ok(())
}

pub async fn ping() -> &'static str {
    "pong"
}

pub async fn list_messages(
    State(state): State<AppState>,
) -> Result<Json<Envelope<Vec<Message>>>, ApiError> {
    let messages = with_db(&state, |db| db.list_messages()).await?;
    Ok(Json(Envelope::ok(messages)))
}

pub async fn get_message(
    State(state): State<AppState>,
    id: Result<Path<i64>, PathRejection>,
) -> Result<Json<Envelope<Message>>, ApiError> {
    let Path(id) = id?;
    let message = with_db(&state, move |db| db.get_message(id)).await?;
    Ok(Json(Envelope::ok(message)))
}

/// Store the message, then hand it to the bots. A stalled pipeline delays the
/// response by at most `publish_timeout`; the message is created either way.
pub async fn create_message(
    State(state): State<AppState>,
    payload: Result<Json<CreateMessageRequest>, JsonRejection>,
) -> Result<impl IntoResponse, ApiError> {
    let Json(req) = payload?;
    non_blank(&req.body)?;

    let new = NewMessage::new(req.body.as_str(), req.username_or_anonymous());
    let inserted = with_db(&state, move |db| db.insert_message(&new)).await?;
    debug!(id = inserted.id, username = %inserted.username, "Message created");

    if let Err(e) = state
        .broadcaster
        .publish(BoardEvent::from_user(inserted.clone()), state.publish_timeout)
        .await
    {
        warn!(id = inserted.id, "Message not handed to bots: {}", e);
    }

    Ok((StatusCode::CREATED, Json(Envelope::ok(inserted))))
}

pub async fn update_message(
    State(state): State<AppState>,
    id: Result<Path<i64>, PathRejection>,
    payload: Result<Json<UpdateMessageRequest>, JsonRejection>,
) -> Result<Json<Envelope<Message>>, ApiError> {
    let Path(id) = id?;
    let Json(req) = payload?;
    non_blank(&req.body)?;

    let updated = with_db(&state, move |db| {
        db.update_message(id, &req.body, req.username())
    })
    .await?;
    Ok(Json(Envelope::ok(updated)))
}

pub async fn delete_message(
    State(state): State<AppState>,
    id: Result<Path<i64>, PathRejection>,
) -> Result<Json<Envelope<()>>, ApiError> {
    let Path(id) = id?;
    with_db(&state, move |db| db.delete_message(id)).await?;
    debug!(id, "Message deleted");
    Ok(Json(Envelope::empty()))
}
