//! Moderator commands driving the round lifecycle.
//!
//! Accepted transitions are persisted before any acknowledgement is posted.
//! Refused commands leave the round untouched and answer with the reason in the
//! moderation channel.

use tracing::{info, warn};

use crate::{
    error::ServiceError,
    i18n::Text,
    services::{aggregation_service, status_service},
    state::{
        SharedState,
        command::ModCommand,
        state_machine::{Rejection, RoundEvent},
    },
};

async fn post_moderation(state: &SharedState, text: Text) -> Result<(), ServiceError> {
    let channel = state.channels().moderation.clone();
    state
        .chat()
        .send_channel_message(channel, state.text(text))
        .await?;
    Ok(())
}

async fn post_challenge(state: &SharedState, text: Text) -> Result<(), ServiceError> {
    let channel = state.channels().challenge.clone();
    state
        .chat()
        .send_channel_message(channel, state.text(text))
        .await?;
    Ok(())
}

/// Execute a parsed moderator command.
pub async fn handle_command(state: &SharedState, command: ModCommand) -> Result<(), ServiceError> {
    let outcome = match command {
        ModCommand::Help => post_moderation(state, Text::Help).await,
        ModCommand::Start { parts } => start(state, parts).await,
        ModCommand::Stop => stop(state).await,
        ModCommand::Current => current(state).await,
        ModCommand::Reset => reset(state, RoundEvent::Reset).await,
        ModCommand::ForceReset => reset(state, RoundEvent::ForceReset).await,
        ModCommand::Publish => publish(state).await,
    };

    match outcome {
        Err(ServiceError::Rejected(reason)) => {
            info!(?command, %reason, "moderator command rejected");
            post_moderation(state, reason.text()).await
        }
        other => other,
    }
}

async fn start(state: &SharedState, parts: Option<u32>) -> Result<(), ServiceError> {
    let ((), round) = state
        .run_transition(RoundEvent::Start { parts }, |_plan| async {
            Ok::<_, ServiceError>(())
        })
        .await?;
    info!(round_id = ?round.round_id, parts = round.part_count, "round started");
    status_service::refresh(state).await;

    post_moderation(
        state,
        Text::StartedMod {
            parts: round.part_count,
        },
    )
    .await?;
    post_challenge(state, Text::Started).await
}

async fn stop(state: &SharedState) -> Result<(), ServiceError> {
    let (stopped, _) = state
        .run_transition(RoundEvent::Stop, |plan| async move {
            Ok::<_, ServiceError>(plan.to)
        })
        .await?;
    info!(round_id = ?stopped.round_id, "round stopped");
    status_service::refresh(state).await;

    post_challenge(state, Text::Stopped).await?;
    post_moderation(state, Text::StoppedMod).await?;
    aggregation_service::review(state, &stopped, true).await
}

async fn current(state: &SharedState) -> Result<(), ServiceError> {
    let round = state.round().await;
    if round.open_round().is_none() {
        return Err(ServiceError::Rejected(Rejection::NoActiveChallenge));
    }
    aggregation_service::review(state, &round, false).await
}

async fn reset(state: &SharedState, event: RoundEvent) -> Result<(), ServiceError> {
    let (previous, _) = state
        .run_transition(event, |plan| async move { Ok::<_, ServiceError>(plan.from) })
        .await?;
    info!(round_id = ?previous.round_id, ?event, "round reset");
    status_service::refresh(state).await;

    post_moderation(state, Text::Reset).await
}

async fn publish(state: &SharedState) -> Result<(), ServiceError> {
    let result = state
        .run_transition(RoundEvent::Publish, |plan| async move {
            aggregation_service::publish(state, &plan.from).await?;
            Ok::<_, ServiceError>(plan.from)
        })
        .await;

    let (published, _) = match result {
        Ok(value) => value,
        Err(err @ ServiceError::Rejected(_)) => return Err(err),
        Err(err) => {
            warn!(error = %err, "publication failed; round stays stopped");
            return Err(err);
        }
    };
    info!(round_id = ?published.round_id, "round published");
    status_service::refresh(state).await;

    post_moderation(state, Text::Published).await
}
