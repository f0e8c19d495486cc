//! Application layer - Cross-cutting pieces shared by adapters
//!
//! This layer contains:
//! - Errors: Error taxonomy
//! - Messaging: Event distribution to subscribers

pub mod errors;
pub mod messaging;
