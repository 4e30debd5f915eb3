//! Payloads pushed by the chat relay.

use serde::Deserialize;
use validator::Validate;

use crate::{
    dto::validation::validate_identifier,
    services::event_service::{ChannelMessage, DirectMessage, MessageDeleted},
};

/// A direct message received by the bot.
#[derive(Debug, Deserialize, Validate)]
pub struct DirectMessageEvent {
    #[validate(custom(function = "validate_identifier"))]
    pub message_id: String,
    #[validate(custom(function = "validate_identifier"))]
    pub author_id: String,
    #[serde(default)]
    pub author_is_bot: bool,
    #[serde(default)]
    pub content: String,
    #[serde(default)]
    pub attachment_count: u32,
}

impl From<DirectMessageEvent> for DirectMessage {
    fn from(event: DirectMessageEvent) -> Self {
        Self {
            author_id: event.author_id,
            author_is_bot: event.author_is_bot,
            content: event.content,
            attachment_count: event.attachment_count,
        }
    }
}

/// A message posted in one of the community channels.
#[derive(Debug, Deserialize, Validate)]
pub struct ChannelMessageEvent {
    #[validate(custom(function = "validate_identifier"))]
    pub message_id: String,
    #[validate(custom(function = "validate_identifier"))]
    pub channel_id: String,
    #[validate(custom(function = "validate_identifier"))]
    pub author_id: String,
    #[serde(default)]
    pub author_is_bot: bool,
    #[serde(default)]
    pub content: String,
}

impl From<ChannelMessageEvent> for ChannelMessage {
    fn from(event: ChannelMessageEvent) -> Self {
        Self {
            channel_id: event.channel_id,
            author_id: event.author_id,
            author_is_bot: event.author_is_bot,
            content: event.content,
        }
    }
}

/// A channel message was deleted; `message_id` is the reference returned when it was posted.
#[derive(Debug, Deserialize, Validate)]
pub struct MessageDeletedEvent {
    #[validate(custom(function = "validate_identifier"))]
    pub message_id: String,
    #[validate(custom(function = "validate_identifier"))]
    pub channel_id: String,
}

impl From<MessageDeletedEvent> for MessageDeleted {
    fn from(event: MessageDeletedEvent) -> Self {
        Self {
            channel_id: event.channel_id,
            message_ref: event.message_id,
        }
    }
}
