//! Platform adapters

pub mod telegram;

pub use telegram::TelegramClient;
