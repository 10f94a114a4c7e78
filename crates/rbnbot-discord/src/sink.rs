use std::sync::Arc;

use async_trait::async_trait;
use serenity::builder::CreateMessage;
use serenity::http::Http;
use serenity::model::id::{ChannelId, MessageId};

use rbnbot_core::config::DiscordConfig;
use rbnbot_core::{MessageHandle, RichMessage};
use rbnbot_relay::{MessageSink, SinkError};

use crate::embed::rich_embed;
use crate::error::DiscordError;

/// Publishes relay output into one Discord channel over the REST API.
///
/// Holds its own `Arc<Http>`, which needs no gateway connection, so the relay
/// keeps publishing while the command handler reconnects.
pub struct DiscordSink {
    http: Arc<Http>,
    channel_id: ChannelId,
}

impl DiscordSink {
    pub fn new(http: Arc<Http>, channel_id: ChannelId) -> Self {
        Self { http, channel_id }
    }

    pub fn from_config(config: &DiscordConfig) -> Result<Self, DiscordError> {
        if config.bot_token.trim().is_empty() {
            return Err(DiscordError::NoToken);
        }
        if config.channel_id == 0 {
            return Err(DiscordError::NoChannel);
        }
        let http = Arc::new(Http::new(&config.bot_token));
        Ok(Self::new(http, ChannelId::new(config.channel_id)))
    }

    pub fn channel_id(&self) -> ChannelId {
        self.channel_id
    }

    fn handle(&self, message_id: MessageId) -> MessageHandle {
        MessageHandle {
            channel_id: self.channel_id.get(),
            message_id: message_id.get(),
        }
    }
}

#[async_trait]
impl MessageSink for DiscordSink {
    async fn send_rich(&self, message: &RichMessage) -> Result<MessageHandle, SinkError> {
        let msg = CreateMessage::new().embed(rich_embed(message));
        let sent = self
            .channel_id
            .send_message(&self.http, msg)
            .await
            .map_err(|e| SinkError::Send(e.to_string()))?;
        Ok(self.handle(sent.id))
    }

    async fn send_text(&self, body: &str) -> Result<MessageHandle, SinkError> {
        let sent = self
            .channel_id
            .say(&self.http, body)
            .await
            .map_err(|e| SinkError::Send(e.to_string()))?;
        Ok(self.handle(sent.id))
    }

    async fn delete(&self, handle: &MessageHandle) -> Result<(), SinkError> {
        if handle.channel_id == 0 || handle.message_id == 0 {
            return Err(SinkError::Delete(format!("invalid handle {handle}")));
        }
        ChannelId::new(handle.channel_id)
            .delete_message(&self.http, MessageId::new(handle.message_id))
            .await
            .map_err(|e| SinkError::Delete(e.to_string()))
    }
}
