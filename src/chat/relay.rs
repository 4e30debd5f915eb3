use std::{sync::Arc, time::Duration};

use futures::future::BoxFuture;
use reqwest::{Client, Method, StatusCode};
use serde::{Deserialize, Serialize};
use tracing::debug;

use super::{ChatError, ChatGateway, ChatResult, Member};
use crate::dao::models::MessageRef;

const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

/// Connection settings for the HTTP chat relay.
#[derive(Debug, Clone)]
pub struct RelayConfig {
    pub base_url: String,
    pub token: String,
}

/// [`ChatGateway`] backed by an HTTP bridge to the chat platform.
#[derive(Clone)]
pub struct RelayChatGateway {
    client: Client,
    base_url: Arc<str>,
    token: Arc<str>,
}

#[derive(Debug, Serialize)]
struct MessageBody<'a> {
    content: &'a str,
}

#[derive(Debug, Serialize)]
struct PresenceBody<'a> {
    text: &'a str,
}

#[derive(Debug, Deserialize)]
struct CreatedMessage {
    id: String,
}

#[derive(Debug, Deserialize)]
struct MemberBody {
    id: String,
    display_name: String,
}

impl RelayChatGateway {
    pub fn new(config: RelayConfig) -> ChatResult<Self> {
        let client = Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .map_err(|source| ChatError::Transport {
                path: config.base_url.clone(),
                source,
            })?;

        Ok(Self {
            client,
            base_url: Arc::from(config.base_url.trim_end_matches('/')),
            token: Arc::from(config.token),
        })
    }

    fn request(&self, method: Method, path: &str) -> reqwest::RequestBuilder {
        let url = format!("{}/{}", self.base_url, path);
        self.client.request(method, url).bearer_auth(self.token.as_ref())
    }

    async fn post_message(&self, path: String, content: String) -> ChatResult<MessageRef> {
        let response = self
            .request(Method::POST, &path)
            .json(&MessageBody { content: &content })
            .send()
            .await
            .map_err(|source| ChatError::Transport {
                path: path.clone(),
                source,
            })?;

        if !response.status().is_success() {
            return Err(ChatError::Status {
                path,
                status: response.status(),
            });
        }

        let created = response
            .json::<CreatedMessage>()
            .await
            .map_err(|source| ChatError::Decode {
                path: path.clone(),
                source,
            })?;
        debug!(path = %path, message_ref = %created.id, "message delivered");
        Ok(created.id)
    }

    async fn put_presence(&self, text: String) -> ChatResult<()> {
        let path = "presence".to_owned();
        let response = self
            .request(Method::PUT, &path)
            .json(&PresenceBody { text: &text })
            .send()
            .await
            .map_err(|source| ChatError::Transport {
                path: path.clone(),
                source,
            })?;

        if response.status().is_success() {
            Ok(())
        } else {
            Err(ChatError::Status {
                path,
                status: response.status(),
            })
        }
    }

    async fn get_member(&self, user_id: String) -> ChatResult<Option<Member>> {
        let path = format!("members/{user_id}");
        let response = self
            .request(Method::GET, &path)
            .send()
            .await
            .map_err(|source| ChatError::Transport {
                path: path.clone(),
                source,
            })?;

        match response.status() {
            StatusCode::NOT_FOUND => Ok(None),
            status if status.is_success() => {
                let body = response
                    .json::<MemberBody>()
                    .await
                    .map_err(|source| ChatError::Decode { path, source })?;
                Ok(Some(Member {
                    id: body.id,
                    display_name: body.display_name,
                }))
            }
            other => Err(ChatError::Status {
                path,
                status: other,
            }),
        }
    }
}

impl ChatGateway for RelayChatGateway {
    fn send_channel_message(
        &self,
        channel_id: String,
        content: String,
    ) -> BoxFuture<'static, ChatResult<MessageRef>> {
        let relay = self.clone();
        Box::pin(async move {
            relay
                .post_message(format!("channels/{channel_id}/messages"), content)
                .await
        })
    }

    fn send_direct_message(
        &self,
        user_id: String,
        content: String,
    ) -> BoxFuture<'static, ChatResult<MessageRef>> {
        let relay = self.clone();
        Box::pin(async move {
            relay
                .post_message(format!("users/{user_id}/messages"), content)
                .await
        })
    }

    fn set_presence(&self, text: String) -> BoxFuture<'static, ChatResult<()>> {
        let relay = self.clone();
        Box::pin(async move { relay.put_presence(text).await })
    }

    fn find_member(&self, user_id: String) -> BoxFuture<'static, ChatResult<Option<Member>>> {
        let relay = self.clone();
        Box::pin(async move { relay.get_member(user_id).await })
    }
}
