//! Domain entities - Normalized messages and durable channel state

pub mod channel;
pub mod identity;
pub mod message;

pub use channel::{Channel, Channels, HISTORY_LIMIT};
pub use identity::Identity;
pub use message::Message;
