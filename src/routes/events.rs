use axum::{
    Json, Router,
    body::Body,
    extract::State,
    http::{Request, StatusCode},
    middleware::{self, Next},
    response::Response,
    routing::post,
};
use axum_valid::Valid;
use tracing::error;

use crate::{
    dto::events::{ChannelMessageEvent, DirectMessageEvent, MessageDeletedEvent},
    error::AppError,
    services::event_service::{self, ChatEvent},
    state::SharedState,
};

const RELAY_TOKEN_HEADER: &str = "x-relay-token";

/// Webhooks through which the chat relay forwards platform events.
pub fn router(state: SharedState) -> Router<SharedState> {
    Router::new()
        .route("/events/direct-message", post(direct_message))
        .route("/events/channel-message", post(channel_message))
        .route("/events/message-deleted", post(message_deleted))
        .route_layer(middleware::from_fn_with_state(state, require_relay_token))
}

/// A participant sent the bot a direct message.
pub async fn direct_message(
    State(state): State<SharedState>,
    Valid(Json(payload)): Valid<Json<DirectMessageEvent>>,
) -> Result<StatusCode, AppError> {
    dispatch(state, ChatEvent::DirectMessage(payload.into())).await
}

/// A message was posted in a community channel.
pub async fn channel_message(
    State(state): State<SharedState>,
    Valid(Json(payload)): Valid<Json<ChannelMessageEvent>>,
) -> Result<StatusCode, AppError> {
    dispatch(state, ChatEvent::ChannelMessage(payload.into())).await
}

/// A channel message was deleted.
pub async fn message_deleted(
    State(state): State<SharedState>,
    Valid(Json(payload)): Valid<Json<MessageDeletedEvent>>,
) -> Result<StatusCode, AppError> {
    dispatch(state, ChatEvent::MessageDeleted(payload.into())).await
}

/// Handle `event` on its own task so a relay disconnect cannot cancel it halfway.
async fn dispatch(state: SharedState, event: ChatEvent) -> Result<StatusCode, AppError> {
    let task = tokio::spawn(async move { event_service::handle(&state, event).await });
    match task.await {
        Ok(result) => {
            result?;
            Ok(StatusCode::ACCEPTED)
        }
        Err(err) => {
            error!(error = %err, "event task failed");
            Err(AppError::Internal("event handling aborted".into()))
        }
    }
}

async fn require_relay_token(
    State(state): State<SharedState>,
    req: Request<Body>,
    next: Next,
) -> Result<Response, AppError> {
    let provided = req
        .headers()
        .get(RELAY_TOKEN_HEADER)
        .and_then(|value| value.to_str().ok())
        .ok_or_else(|| {
            AppError::Unauthorized("missing relay token header `X-Relay-Token`".into())
        })?;

    if provided != state.relay_token() {
        return Err(AppError::Unauthorized("invalid relay token".into()));
    }
    Ok(next.run(req).await)
}
