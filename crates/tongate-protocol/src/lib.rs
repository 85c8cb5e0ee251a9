//! Shared wire types for the Tongate API.
//!
//! Everything here is serialized as camelCase JSON, matching what the web
//! frontend and the Telegram bot expect.

pub mod messages;
pub mod types;

pub use messages::*;
pub use types::*;
