//! Messenger adapter: normalizes a chat platform's messages into a
//! platform-agnostic model, keeps per-channel history and membership on
//! disk, and re-emits inbound messages to subscribers.

pub mod application;
pub mod domain;
pub mod infrastructure;

pub use application::errors::{ConfigError, MessengerError, StorageError};
pub use application::messaging::{MessageEmitter, MessengerEvent};
pub use domain::entities::{Channel, Identity, Message};
pub use domain::traits::{MessengerClient, Store};
pub use infrastructure::adapters::TelegramClient;
pub use infrastructure::config::Config;
