//! Test doubles shared by the service tests.

use std::sync::{
    Arc, Mutex,
    atomic::{AtomicBool, AtomicU64, Ordering},
};

use dashmap::DashMap;
use futures::future::BoxFuture;

use crate::{
    chat::{ChatError, ChatGateway, ChatResult, Member},
    config::ChannelConfig,
    dao::{challenge_store::MemoryChallengeStore, models::MessageRef},
    error::ServiceError,
    i18n::Catalog,
    services::event_service::{self, ChannelMessage, ChatEvent, DirectMessage, MessageDeleted},
    state::{AppState, SharedState, state_machine::RoundState},
};

pub const MOD_CHANNEL: &str = "mod-channel";
pub const CHALLENGE_CHANNEL: &str = "challenge-channel";
pub const MODERATOR: &str = "moderator";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Target {
    Channel(String),
    User(String),
}

#[derive(Debug, Clone)]
pub struct SentMessage {
    pub target: Target,
    pub content: String,
    pub message_ref: MessageRef,
}

/// Chat gateway keeping every outbound call in memory.
#[derive(Default)]
pub struct RecordingChat {
    sent: Mutex<Vec<SentMessage>>,
    presence: Mutex<Vec<String>>,
    members: DashMap<String, Member>,
    failing: AtomicBool,
    counter: AtomicU64,
}

impl RecordingChat {
    pub fn add_member(&self, id: &str, display_name: &str) {
        self.members.insert(
            id.to_owned(),
            Member {
                id: id.to_owned(),
                display_name: display_name.to_owned(),
            },
        );
    }

    pub fn set_failing(&self, value: bool) {
        self.failing.store(value, Ordering::SeqCst);
    }

    pub fn sent(&self) -> Vec<SentMessage> {
        self.sent.lock().unwrap().clone()
    }

    pub fn presence(&self) -> Vec<String> {
        self.presence.lock().unwrap().clone()
    }

    pub fn clear(&self) {
        self.sent.lock().unwrap().clear();
        self.presence.lock().unwrap().clear();
    }

    fn record(&self, target: Target, content: String) -> ChatResult<MessageRef> {
        if self.failing.load(Ordering::SeqCst) {
            return Err(ChatError::Unavailable("recording chat switched off".into()));
        }
        let message_ref = format!("msg-{}", self.counter.fetch_add(1, Ordering::SeqCst));
        self.sent.lock().unwrap().push(SentMessage {
            target,
            content,
            message_ref: message_ref.clone(),
        });
        Ok(message_ref)
    }
}

/// Wrapper so the recorder can be shared between the state and the test body.
struct SharedChat(Arc<RecordingChat>);

impl ChatGateway for SharedChat {
    fn send_channel_message(
        &self,
        channel_id: String,
        content: String,
    ) -> BoxFuture<'static, ChatResult<MessageRef>> {
        let result = self.0.record(Target::Channel(channel_id), content);
        Box::pin(async move { result })
    }

    fn send_direct_message(
        &self,
        user_id: String,
        content: String,
    ) -> BoxFuture<'static, ChatResult<MessageRef>> {
        let result = self.0.record(Target::User(user_id), content);
        Box::pin(async move { result })
    }

    fn set_presence(&self, text: String) -> BoxFuture<'static, ChatResult<()>> {
        let result = if self.0.failing.load(Ordering::SeqCst) {
            Err(ChatError::Unavailable("recording chat switched off".into()))
        } else {
            self.0.presence.lock().unwrap().push(text);
            Ok(())
        };
        Box::pin(async move { result })
    }

    fn find_member(&self, user_id: String) -> BoxFuture<'static, ChatResult<Option<Member>>> {
        let member = self.0.members.get(&user_id).map(|m| m.value().clone());
        Box::pin(async move { Ok(member) })
    }
}

/// A fully wired application state over in-memory collaborators.
pub struct Harness {
    pub state: SharedState,
    pub store: MemoryChallengeStore,
    pub chat: Arc<RecordingChat>,
}

impl Harness {
    pub fn new() -> Self {
        Self::with_store(MemoryChallengeStore::new(), RoundState::default())
    }

    /// Wire the state over an existing store, resuming from `round`.
    pub fn with_store(store: MemoryChallengeStore, round: RoundState) -> Self {
        let chat = Arc::new(RecordingChat::default());
        chat.add_member("alice", "Alice");
        chat.add_member("bob", "Bob");
        chat.add_member("carol", "Carol");

        let state = AppState::new(
            Arc::new(store.clone()),
            Arc::new(SharedChat(chat.clone())),
            Arc::new(Catalog::builtin()),
            ChannelConfig {
                moderation: MOD_CHANNEL.into(),
                challenge: CHALLENGE_CHANNEL.into(),
            },
            "relay-secret".into(),
            round,
        );

        Self { state, store, chat }
    }

    pub async fn moderator(&self, content: &str) -> Result<(), ServiceError> {
        self.channel_message(MOD_CHANNEL, MODERATOR, content).await
    }

    pub async fn channel_message(
        &self,
        channel_id: &str,
        author_id: &str,
        content: &str,
    ) -> Result<(), ServiceError> {
        event_service::handle(
            &self.state,
            ChatEvent::ChannelMessage(ChannelMessage {
                channel_id: channel_id.into(),
                author_id: author_id.into(),
                author_is_bot: false,
                content: content.into(),
            }),
        )
        .await
    }

    pub async fn dm(&self, author_id: &str, content: &str) -> Result<(), ServiceError> {
        event_service::handle(
            &self.state,
            ChatEvent::DirectMessage(DirectMessage {
                author_id: author_id.into(),
                author_is_bot: false,
                content: content.into(),
                attachment_count: 0,
            }),
        )
        .await
    }

    pub async fn delete(&self, channel_id: &str, message_ref: &str) -> Result<(), ServiceError> {
        event_service::handle(
            &self.state,
            ChatEvent::MessageDeleted(MessageDeleted {
                channel_id: channel_id.into(),
                message_ref: message_ref.into(),
            }),
        )
        .await
    }

    /// Messages posted in `channel_id`, oldest first.
    pub fn channel_messages(&self, channel_id: &str) -> Vec<SentMessage> {
        self.chat
            .sent()
            .into_iter()
            .filter(|m| m.target == Target::Channel(channel_id.into()))
            .collect()
    }

    /// Contents of the direct messages sent to `user_id`, oldest first.
    pub fn replies(&self, user_id: &str) -> Vec<String> {
        self.chat
            .sent()
            .into_iter()
            .filter(|m| m.target == Target::User(user_id.into()))
            .map(|m| m.content)
            .collect()
    }

    pub fn text(&self, text: crate::i18n::Text) -> String {
        self.state.text(text)
    }
}
