//! `rbnbot-feed`: supervision and line decoding for the external spot feed.
//!
//! The feed binary logs on to the Reverse Beacon Network, filters CW spots by
//! speed and prints them one per line. [`SourceSupervisor`] keeps it alive and
//! queues its output; [`parse_line`] turns each line into a `SpotEvent`.

pub mod error;
pub mod parser;
pub mod supervisor;

pub use error::{FeedError, ParseError, Result};
pub use parser::parse_line;
pub use supervisor::{SourceCommand, SourceState, SourceSupervisor};
