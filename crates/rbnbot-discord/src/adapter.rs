use std::sync::Arc;
use std::time::Duration;

use serenity::model::gateway::GatewayIntents;
use serenity::model::id::ChannelId;
use serenity::Client;
use tokio::sync::watch;
use tracing::{error, info, warn};

use rbnbot_core::config::DiscordConfig;
use rbnbot_relay::SpotAggregator;

use crate::error::DiscordError;
use crate::handler::CommandHandler;

const RETRY_CONNECT: Duration = Duration::from_secs(30);
const RETRY_GATEWAY: Duration = Duration::from_secs(5);

/// Gateway side of the bot: receives chat commands.
///
/// Publishing does not depend on this; the relay's sink talks REST only.
pub struct DiscordAdapter {
    config: DiscordConfig,
    aggregator: Arc<SpotAggregator>,
}

impl DiscordAdapter {
    pub fn new(config: &DiscordConfig, aggregator: Arc<SpotAggregator>) -> Self {
        Self {
            config: config.clone(),
            aggregator,
        }
    }

    /// Connect and keep reconnecting whenever the gateway drops, until
    /// `shutdown` broadcasts `true`.
    pub async fn run(self, mut shutdown: watch::Receiver<bool>) {
        let intents = GatewayIntents::GUILD_MESSAGES
            | GatewayIntents::DIRECT_MESSAGES
            | GatewayIntents::MESSAGE_CONTENT;

        loop {
            let mut client = loop {
                match self.build_client(intents).await {
                    Ok(c) => break c,
                    Err(e) => {
                        error!("Discord: connect failed ({e}), retrying in 30s");
                        if sleep_or_shutdown(RETRY_CONNECT, &mut shutdown).await {
                            return;
                        }
                    }
                }
            };

            info!("Discord: gateway connecting");
            let shard_manager = Arc::clone(&client.shard_manager);

            tokio::select! {
                result = client.start() => match result {
                    Ok(()) => info!("Discord: gateway stopped cleanly, reconnecting in 5s"),
                    Err(e) => warn!("Discord: gateway error ({e}), reconnecting in 5s"),
                },
                _ = wait_shutdown(&mut shutdown) => {
                    shard_manager.shutdown_all().await;
                    info!("Discord: gateway closed");
                    return;
                }
            }

            if sleep_or_shutdown(RETRY_GATEWAY, &mut shutdown).await {
                return;
            }
        }
    }

    async fn build_client(&self, intents: GatewayIntents) -> Result<Client, DiscordError> {
        if self.config.bot_token.trim().is_empty() {
            return Err(DiscordError::NoToken);
        }
        if self.config.channel_id == 0 {
            return Err(DiscordError::NoChannel);
        }
        let handler = CommandHandler {
            aggregator: Arc::clone(&self.aggregator),
            channel_id: ChannelId::new(self.config.channel_id),
            purge_enabled: self.config.purge_enabled,
        };

        Ok(Client::builder(&self.config.bot_token, intents)
            .event_handler(handler)
            .await?)
    }
}

/// Resolves once shutdown is signalled or the sender is dropped.
async fn wait_shutdown(shutdown: &mut watch::Receiver<bool>) {
    while !*shutdown.borrow() {
        if shutdown.changed().await.is_err() {
            return;
        }
    }
}

/// Returns `true` if shutdown arrived before the delay elapsed.
async fn sleep_or_shutdown(delay: Duration, shutdown: &mut watch::Receiver<bool>) -> bool {
    tokio::select! {
        _ = tokio::time::sleep(delay) => false,
        _ = wait_shutdown(shutdown) => true,
    }
}
