//! Outbound side of the chat platform: posting messages, replying to members,
//! updating the bot presence and resolving community members.

pub mod relay;

use futures::future::BoxFuture;
use thiserror::Error;

use crate::dao::models::MessageRef;

pub use relay::{RelayChatGateway, RelayConfig};

/// Result alias for chat gateway calls.
pub type ChatResult<T> = Result<T, ChatError>;

/// Failures raised while talking to the chat platform.
#[derive(Debug, Error)]
pub enum ChatError {
    /// The platform could not be reached.
    #[error("failed to reach chat relay at `{path}`")]
    Transport {
        path: String,
        #[source]
        source: reqwest::Error,
    },
    /// The platform answered with an unexpected status.
    #[error("chat relay returned status {status} for `{path}`")]
    Status {
        path: String,
        status: reqwest::StatusCode,
    },
    /// The platform answer could not be decoded.
    #[error("failed to decode chat relay response for `{path}`")]
    Decode {
        path: String,
        #[source]
        source: reqwest::Error,
    },
    /// The gateway is not able to deliver messages at all.
    #[error("chat gateway unavailable: {0}")]
    Unavailable(String),
}

/// A verified member of the community.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Member {
    /// Chat identifier of the member.
    pub id: String,
    /// Name shown in the community, possibly a per-community nickname.
    pub display_name: String,
}

/// Abstraction over the chat platform used by the services.
pub trait ChatGateway: Send + Sync {
    /// Post `content` to a channel and return the reference of the created message.
    fn send_channel_message(
        &self,
        channel_id: String,
        content: String,
    ) -> BoxFuture<'static, ChatResult<MessageRef>>;
    /// Send a direct message to a user and return the reference of the created message.
    fn send_direct_message(
        &self,
        user_id: String,
        content: String,
    ) -> BoxFuture<'static, ChatResult<MessageRef>>;
    /// Replace the status text shown on the bot profile.
    fn set_presence(&self, text: String) -> BoxFuture<'static, ChatResult<()>>;
    /// Look up a user among the community members.
    fn find_member(&self, user_id: String) -> BoxFuture<'static, ChatResult<Option<Member>>>;
}
