//! Entry point for inbound chat events.
//!
//! Events are handled one at a time: the event gate is held from dispatch until
//! every write and reply of the event is done.

use tracing::{debug, warn};

use crate::{
    dao::models::MessageRef,
    error::ServiceError,
    services::{aggregation_service, moderation_service, submission_service},
    state::{SharedState, command::ModCommand},
};

/// A direct message sent to the bot.
#[derive(Debug, Clone)]
pub struct DirectMessage {
    pub author_id: String,
    pub author_is_bot: bool,
    pub content: String,
    pub attachment_count: u32,
}

/// A message posted in a community channel.
#[derive(Debug, Clone)]
pub struct ChannelMessage {
    pub channel_id: String,
    pub author_id: String,
    pub author_is_bot: bool,
    pub content: String,
}

/// A channel message was deleted.
#[derive(Debug, Clone)]
pub struct MessageDeleted {
    pub channel_id: String,
    pub message_ref: MessageRef,
}

/// Inbound events understood by the bot.
#[derive(Debug, Clone)]
pub enum ChatEvent {
    DirectMessage(DirectMessage),
    ChannelMessage(ChannelMessage),
    MessageDeleted(MessageDeleted),
}

/// Handle one event to completion. Errors are logged before being returned.
pub async fn handle(state: &SharedState, event: ChatEvent) -> Result<(), ServiceError> {
    let _guard = state.lock_events().await;

    let result = match event {
        ChatEvent::DirectMessage(message) => {
            submission_service::handle_direct_message(state, message).await
        }
        ChatEvent::ChannelMessage(message) => handle_channel_message(state, message).await,
        ChatEvent::MessageDeleted(deleted) => {
            aggregation_service::handle_deletion(state, &deleted.channel_id, deleted.message_ref)
                .await
        }
    };

    if let Err(err) = &result {
        warn!(error = %err, "event handling failed");
    }
    result
}

async fn handle_channel_message(
    state: &SharedState,
    message: ChannelMessage,
) -> Result<(), ServiceError> {
    if message.author_is_bot || message.channel_id != state.channels().moderation {
        return Ok(());
    }

    let Some(command) = ModCommand::parse(&message.content) else {
        return Ok(());
    };
    debug!(author_id = %message.author_id, ?command, "moderator command");
    moderation_service::handle_command(state, command).await
}
