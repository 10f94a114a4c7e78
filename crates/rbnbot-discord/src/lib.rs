//! Discord transport for rbnbot.
//!
//! [`DiscordSink`] publishes spot batches and the legend over REST;
//! [`DiscordAdapter`] holds the gateway connection for `!help` and `!sked`.

pub mod adapter;
pub mod commands;
pub mod embed;
pub mod error;
pub mod handler;
pub mod sink;

pub use adapter::DiscordAdapter;
pub use commands::{parse_command, ChatCommand};
pub use error::DiscordError;
pub use sink::DiscordSink;
