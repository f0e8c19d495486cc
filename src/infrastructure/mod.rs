//! Infrastructure layer - External concerns
//! 
//! This layer contains:
//! - Config: Configuration loading
//! - Storage: Durable channel state
//! - Adapters: Platform integrations (Telegram)

pub mod config;
pub mod storage;
pub mod adapters;
