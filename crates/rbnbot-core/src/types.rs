use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Glyph used when a spotter's continent cannot be resolved.
pub const UNKNOWN_ICON: &str = "◯";

/// A single CW spot decoded from one line of the source process.
///
/// `spotted` is the dedup key inside an aggregation window. Frequency and rate
/// are kept as the text the source printed so rendering never reformats them.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SpotEvent {
    /// Skimmer that heard the station (e.g. `HA6PX`).
    pub spotter: String,
    /// Station that was heard (e.g. `HB9IIH`).
    pub spotted: String,
    /// Frequency in kHz (e.g. `3534.0`).
    pub frequency_khz: String,
    /// Keying speed in words per minute (e.g. `26`).
    pub wpm: String,
    /// Continent glyph of the spotter.
    pub icon: &'static str,
}

impl SpotEvent {
    pub fn with_icon(mut self, icon: &'static str) -> Self {
        self.icon = icon;
        self
    }
}

/// Opaque reference to a message previously sent to the sink.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct MessageHandle {
    pub channel_id: u64,
    pub message_id: u64,
}

impl fmt::Display for MessageHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.channel_id, self.message_id)
    }
}

/// A message this bot published and will delete once it outlives its TTL.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PublishedMessage {
    pub handle: MessageHandle,
    pub published_at: DateTime<Utc>,
}

impl PublishedMessage {
    pub fn new(handle: MessageHandle, published_at: DateTime<Utc>) -> Self {
        Self {
            handle,
            published_at,
        }
    }
}

/// A single rich display unit: a title, an accent colour and one inline field.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RichMessage {
    pub title: String,
    pub color: u32,
    pub field_name: String,
    pub field_value: String,
}

/// Continent a call-sign prefix belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Continent {
    Eu,
    Na,
    Sa,
    Af,
    An,
    As,
    Oc,
}

impl Continent {
    /// Display glyph used in spot fragments and the legend.
    pub fn icon(self) -> &'static str {
        match self {
            Continent::Eu => "🔵",
            Continent::Na => "🔴",
            Continent::Sa => "⭕",
            Continent::Af => "🟣",
            Continent::An => "🟤",
            Continent::As => "🟢",
            Continent::Oc => "🟡",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn handle_display_is_channel_slash_message() {
        let h = MessageHandle {
            channel_id: 10,
            message_id: 42,
        };
        assert_eq!(h.to_string(), "10/42");
    }

    #[test]
    fn with_icon_replaces_placeholder() {
        let ev = SpotEvent {
            spotter: "HA6PX".into(),
            spotted: "HB9IIH".into(),
            frequency_khz: "3534.0".into(),
            wpm: "26".into(),
            icon: UNKNOWN_ICON,
        }
        .with_icon(Continent::Eu.icon());
        assert_eq!(ev.icon, "🔵");
    }
}
