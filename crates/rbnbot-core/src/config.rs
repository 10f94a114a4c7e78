use std::collections::BTreeMap;
use std::time::Duration;

use figment::{
    providers::{Env, Format, Toml},
    Figment,
};
use serde::{Deserialize, Serialize};

use crate::error::{RbnbotError, Result};
use crate::types::Continent;

pub const DEFAULT_SOURCE_EXECUTABLE: &str = "./rbn_cw";
pub const DEFAULT_MAX_WPM: u32 = 20;
pub const DEFAULT_QUEUE_CAPACITY: usize = 4096;
pub const DEFAULT_MESSAGE_TTL_SECS: u64 = 3 * 60;
pub const DEFAULT_INGEST_INTERVAL_MS: u64 = 1000;
pub const DEFAULT_INGEST_BATCH_LIMIT: usize = 256;
pub const DEFAULT_PUBLISH_INTERVAL_SECS: u64 = 10;
pub const DEFAULT_EVICT_INTERVAL_SECS: u64 = 5;
pub const DEFAULT_LEGEND_INTERVAL_SECS: u64 = 120;
/// Discord caps an embed field value at 1024 characters.
pub const DEFAULT_MAX_BATCH_CHARS: usize = 1024;
/// Discord's `Colour::PURPLE`.
pub const DEFAULT_ACCENT_COLOR: u32 = 0x9B59B6;
pub const DEFAULT_LINK_TEMPLATE: &str = "http://websdr.ewi.utwente.nl:8901/?tune={freq}cw";
/// Ideographic space: wide enough to line up columns in Discord's proportional font.
pub const DEFAULT_SEPARATOR: &str = "\u{3000}";
pub const DEFAULT_LEGEND: &str = "\n*Legend*: de EU🔵, NA🔴, SA⭕, AS🟢, AF🟣, AN🟤, OC🟡\n📣 **Available for a QSO?** Send *!help* to the BOT to announce yourself.\n";

/// Top-level config (rbnbot.toml + RBNBOT_* env overrides).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RbnbotConfig {
    pub source: SourceConfig,
    #[serde(default)]
    pub relay: RelayConfig,
    pub discord: DiscordConfig,
    /// Call-sign prefix overrides for the continent lookup, e.g. `"IV3" = "EU"`.
    #[serde(default)]
    pub continents: BTreeMap<String, Continent>,
}

/// The external spot feed process.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SourceConfig {
    #[serde(default = "default_executable")]
    pub executable: String,
    /// Call sign used to log on to the spot network (argv[1]).
    pub callsign: String,
    /// Spots faster than this are filtered out by the feed (argv[2]).
    #[serde(default = "default_max_wpm")]
    pub max_wpm: u32,
    /// Lines queued beyond this are dropped until the ingest tick catches up.
    #[serde(default = "default_queue_capacity")]
    pub queue_capacity: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RelayConfig {
    #[serde(default = "default_message_ttl_secs")]
    pub message_ttl_secs: u64,
    #[serde(default = "default_ingest_interval_ms")]
    pub ingest_interval_ms: u64,
    /// Upper bound on lines drained from the feed per ingest tick.
    #[serde(default = "default_ingest_batch_limit")]
    pub ingest_batch_limit: usize,
    #[serde(default = "default_publish_interval_secs")]
    pub publish_interval_secs: u64,
    #[serde(default = "default_evict_interval_secs")]
    pub evict_interval_secs: u64,
    #[serde(default = "default_legend_interval_secs")]
    pub legend_interval_secs: u64,
    /// Batches whose rendered text reaches this many characters are dropped whole.
    #[serde(default = "default_max_batch_chars")]
    pub max_batch_chars: usize,
    #[serde(default = "default_accent_color")]
    pub accent_color: u32,
    /// Frequency link; `{freq}` is replaced by the spot frequency in kHz.
    #[serde(default = "default_link_template")]
    pub link_template: String,
    /// Placed between the link, the call sign and the rate.
    #[serde(default = "default_separator")]
    pub separator: String,
    #[serde(default = "default_legend")]
    pub legend: String,
}

impl Default for RelayConfig {
    fn default() -> Self {
        Self {
            message_ttl_secs: DEFAULT_MESSAGE_TTL_SECS,
            ingest_interval_ms: DEFAULT_INGEST_INTERVAL_MS,
            ingest_batch_limit: DEFAULT_INGEST_BATCH_LIMIT,
            publish_interval_secs: DEFAULT_PUBLISH_INTERVAL_SECS,
            evict_interval_secs: DEFAULT_EVICT_INTERVAL_SECS,
            legend_interval_secs: DEFAULT_LEGEND_INTERVAL_SECS,
            max_batch_chars: DEFAULT_MAX_BATCH_CHARS,
            accent_color: DEFAULT_ACCENT_COLOR,
            link_template: default_link_template(),
            separator: default_separator(),
            legend: default_legend(),
        }
    }
}

impl RelayConfig {
    pub fn message_ttl(&self) -> Duration {
        Duration::from_secs(self.message_ttl_secs)
    }

    pub fn ingest_interval(&self) -> Duration {
        Duration::from_millis(self.ingest_interval_ms)
    }

    pub fn publish_interval(&self) -> Duration {
        Duration::from_secs(self.publish_interval_secs)
    }

    pub fn evict_interval(&self) -> Duration {
        Duration::from_secs(self.evict_interval_secs)
    }

    pub fn legend_interval(&self) -> Duration {
        Duration::from_secs(self.legend_interval_secs)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DiscordConfig {
    pub bot_token: String,
    /// Channel that receives spot batches and the legend.
    pub channel_id: u64,
    /// When true, `!help` and `!sked` are answered in the spot channel.
    /// Defaults to true.
    #[serde(default = "bool_true")]
    pub commands_enabled: bool,
    /// When true, `!!deleteall` in the spot channel deletes its recent
    /// history. Anyone who can post there can trigger it, so it is off by
    /// default.
    #[serde(default)]
    pub purge_enabled: bool,
}

fn bool_true() -> bool {
    true
}

fn default_executable() -> String {
    DEFAULT_SOURCE_EXECUTABLE.to_string()
}
fn default_max_wpm() -> u32 {
    DEFAULT_MAX_WPM
}
fn default_queue_capacity() -> usize {
    DEFAULT_QUEUE_CAPACITY
}
fn default_message_ttl_secs() -> u64 {
    DEFAULT_MESSAGE_TTL_SECS
}
fn default_ingest_interval_ms() -> u64 {
    DEFAULT_INGEST_INTERVAL_MS
}
fn default_ingest_batch_limit() -> usize {
    DEFAULT_INGEST_BATCH_LIMIT
}
fn default_publish_interval_secs() -> u64 {
    DEFAULT_PUBLISH_INTERVAL_SECS
}
fn default_evict_interval_secs() -> u64 {
    DEFAULT_EVICT_INTERVAL_SECS
}
fn default_legend_interval_secs() -> u64 {
    DEFAULT_LEGEND_INTERVAL_SECS
}
fn default_max_batch_chars() -> usize {
    DEFAULT_MAX_BATCH_CHARS
}
fn default_accent_color() -> u32 {
    DEFAULT_ACCENT_COLOR
}
fn default_link_template() -> String {
    DEFAULT_LINK_TEMPLATE.to_string()
}
fn default_separator() -> String {
    DEFAULT_SEPARATOR.to_string()
}
fn default_legend() -> String {
    DEFAULT_LEGEND.to_string()
}

impl RbnbotConfig {
    /// Load config from a TOML file with RBNBOT_* env var overrides.
    ///
    /// Checks in order:
    ///   1. Explicit path argument
    ///   2. ~/.rbnbot/rbnbot.toml
    ///
    /// Nested keys use a double underscore: `RBNBOT_DISCORD__BOT_TOKEN`.
    pub fn load(config_path: Option<&str>) -> Result<Self> {
        let path = config_path
            .map(String::from)
            .unwrap_or_else(default_config_path);
        tracing::debug!(path = %path, "loading config");

        Self::from_figment(
            Figment::new()
                .merge(Toml::file(&path))
                .merge(Env::prefixed("RBNBOT_").split("__")),
        )
    }

    /// Extract and validate a config from an already assembled figment.
    pub fn from_figment(figment: Figment) -> Result<Self> {
        let config: RbnbotConfig = figment
            .extract()
            .map_err(|e| RbnbotError::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Reject values the relay cannot run with.
    pub fn validate(&self) -> Result<()> {
        if self.source.callsign.trim().is_empty() {
            return Err(RbnbotError::Config("source.callsign is empty".into()));
        }
        if self.source.queue_capacity == 0 {
            return Err(RbnbotError::Config("source.queue_capacity must be > 0".into()));
        }
        if self.discord.bot_token.trim().is_empty() {
            return Err(RbnbotError::Config("discord.bot_token is empty".into()));
        }
        if self.discord.channel_id == 0 {
            return Err(RbnbotError::Config("discord.channel_id must be set".into()));
        }

        let relay = &self.relay;
        let periods = [
            ("relay.message_ttl_secs", relay.message_ttl_secs),
            ("relay.ingest_interval_ms", relay.ingest_interval_ms),
            ("relay.publish_interval_secs", relay.publish_interval_secs),
            ("relay.evict_interval_secs", relay.evict_interval_secs),
            ("relay.legend_interval_secs", relay.legend_interval_secs),
        ];
        for (name, value) in periods {
            if value == 0 {
                return Err(RbnbotError::Config(format!("{name} must be > 0")));
            }
        }
        if relay.ingest_batch_limit == 0 || relay.max_batch_chars == 0 {
            return Err(RbnbotError::Config(
                "relay.ingest_batch_limit and relay.max_batch_chars must be > 0".into(),
            ));
        }
        if !relay.link_template.contains("{freq}") {
            return Err(RbnbotError::Config(
                "relay.link_template must contain {freq}".into(),
            ));
        }
        Ok(())
    }
}

fn default_config_path() -> String {
    let home = std::env::var("HOME").unwrap_or_else(|_| ".".to_string());
    format!("{}/.rbnbot/rbnbot.toml", home)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(toml: &str) -> Result<RbnbotConfig> {
        RbnbotConfig::from_figment(Figment::from(Toml::string(toml)))
    }

    const MINIMAL: &str = r#"
        [source]
        callsign = "IV3IFZ"

        [discord]
        bot_token = "token"
        channel_id = 1234
    "#;

    #[test]
    fn minimal_config_fills_defaults() {
        let cfg = parse(MINIMAL).unwrap();
        assert_eq!(cfg.source.executable, DEFAULT_SOURCE_EXECUTABLE);
        assert_eq!(cfg.source.max_wpm, 20);
        assert_eq!(cfg.relay.message_ttl(), Duration::from_secs(180));
        assert_eq!(cfg.relay.publish_interval(), Duration::from_secs(10));
        assert_eq!(cfg.relay.evict_interval(), Duration::from_secs(5));
        assert_eq!(cfg.relay.legend_interval(), Duration::from_secs(120));
        assert_eq!(cfg.relay.max_batch_chars, 1024);
        assert_eq!(cfg.relay.separator, "\u{3000}");
        assert!(cfg.discord.commands_enabled);
        assert!(!cfg.discord.purge_enabled);
        assert!(cfg.continents.is_empty());
    }

    #[test]
    fn continent_overrides_parse_uppercase_codes() {
        let toml = format!("{MINIMAL}\n[continents]\nIV3 = \"EU\"\nKH6 = \"OC\"\n");
        let cfg = parse(&toml).unwrap();
        assert_eq!(cfg.continents.get("IV3"), Some(&Continent::Eu));
        assert_eq!(cfg.continents.get("KH6"), Some(&Continent::Oc));
    }

    #[test]
    fn zero_period_is_rejected() {
        let toml = format!("{MINIMAL}\n[relay]\nevict_interval_secs = 0\n");
        let err = parse(&toml).unwrap_err();
        assert!(err.to_string().contains("relay.evict_interval_secs"));
    }

    #[test]
    fn link_template_without_placeholder_is_rejected() {
        let toml = format!("{MINIMAL}\n[relay]\nlink_template = \"http://example.org\"\n");
        assert!(parse(&toml).is_err());
    }

    #[test]
    fn missing_token_is_rejected() {
        let toml = r#"
            [source]
            callsign = "IV3IFZ"

            [discord]
            bot_token = ""
            channel_id = 1
        "#;
        assert!(parse(toml).is_err());
    }
}
