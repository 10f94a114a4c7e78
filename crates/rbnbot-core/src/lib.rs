//! `rbnbot-core`: configuration, errors and data types shared by every rbnbot crate.

pub mod config;
pub mod error;
pub mod types;

pub use config::RbnbotConfig;
pub use error::{RbnbotError, Result};
pub use types::{
    Continent, MessageHandle, PublishedMessage, RichMessage, SpotEvent, UNKNOWN_ICON,
};
