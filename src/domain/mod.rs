//! Domain layer - Platform-agnostic messenger model
//!
//! This layer contains:
//! - Entities: Core objects (Message, Channel, Identity)
//! - Traits: Abstractions for infrastructure (MessengerClient, Store)

pub mod entities;
pub mod traits;
