use std::sync::Arc;
use std::time::Duration;

use serenity::async_trait;
use serenity::builder::GetMessages;
use serenity::http::Http;
use serenity::model::channel::Message;
use serenity::model::gateway::Ready;
use serenity::model::id::ChannelId;
use serenity::prelude::{Context, EventHandler};
use tracing::{debug, info, warn};

use rbnbot_relay::SpotAggregator;

use crate::commands::{
    parse_command, purge_notice, ChatCommand, HELP_EXAMPLE, HELP_USAGE, PURGE_LIMIT, REPLY_ERROR,
    REPLY_OK,
};

/// Pause between deletions during a purge, to stay clear of rate limits.
const PURGE_DELAY: Duration = Duration::from_secs(1);

/// Serenity event handler answering `!help`, `!sked` and `!!deleteall`.
///
/// Valid schedules go straight into the relay's current window and appear in
/// the next published batch.
pub struct CommandHandler {
    pub aggregator: Arc<SpotAggregator>,
    /// Guild messages are only read from this channel; direct messages
    /// are always read.
    pub channel_id: ChannelId,
    pub purge_enabled: bool,
}

#[async_trait]
impl EventHandler for CommandHandler {
    async fn ready(&self, _ctx: Context, ready: Ready) {
        info!(name = %ready.user.name, id = %ready.user.id, "Discord bot connected");
    }

    async fn message(&self, ctx: Context, msg: Message) {
        if msg.author.bot {
            return;
        }
        if msg.guild_id.is_some() && msg.channel_id != self.channel_id {
            return;
        }
        let Some(command) = parse_command(&msg.content) else {
            return;
        };

        let replies: &[&str] = match &command {
            ChatCommand::Help => &[HELP_USAGE, HELP_EXAMPLE],
            ChatCommand::Sked(sked) => {
                self.aggregator.accept_sked(sked);
                info!(
                    author = %msg.author.name,
                    call = %sked.call,
                    freq = %sked.frequency_khz,
                    "schedule announced"
                );
                &[REPLY_OK]
            }
            ChatCommand::InvalidSked => {
                debug!(author = %msg.author.name, content = %msg.content, "malformed !sked");
                &[REPLY_ERROR]
            }
            ChatCommand::Purge => {
                if self.purge_enabled && msg.channel_id == self.channel_id {
                    info!(author = %msg.author.name, "channel purge requested");
                    purge_channel(&ctx.http, self.channel_id).await;
                } else {
                    debug!(author = %msg.author.name, "purge ignored");
                }
                return;
            }
        };

        for reply in replies {
            if let Err(e) = msg.channel_id.say(&ctx.http, *reply).await {
                warn!(error = %e, "failed to send command reply");
            }
        }
    }
}

/// Delete up to [`PURGE_LIMIT`] recent messages, oldest first, behind a
/// maintenance notice that is removed at the end.
///
/// Messages the relay still tracks will fail to delete at eviction time;
/// the registry logs and drops them.
async fn purge_channel(http: &Arc<Http>, channel_id: ChannelId) {
    let history = match channel_id
        .messages(http, GetMessages::new().limit(PURGE_LIMIT))
        .await
    {
        Ok(history) => history,
        Err(e) => {
            warn!(error = %e, "failed to fetch channel history");
            return;
        }
    };

    let notice = match channel_id.say(http, purge_notice(history.len())).await {
        Ok(notice) => Some(notice.id),
        Err(e) => {
            warn!(error = %e, "failed to post purge notice");
            None
        }
    };

    let mut deleted = 0usize;
    // History comes newest first.
    for message in history.iter().rev() {
        match channel_id.delete_message(http, message.id).await {
            Ok(()) => deleted += 1,
            Err(e) => debug!(message = %message.id, error = %e, "purge delete failed"),
        }
        tokio::time::sleep(PURGE_DELAY).await;
    }

    if let Some(id) = notice {
        if let Err(e) = channel_id.delete_message(http, id).await {
            warn!(error = %e, "failed to delete purge notice");
        }
    }
    info!(deleted, total = history.len(), "channel purge finished");
}
