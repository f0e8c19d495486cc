//! Domain traits - Abstractions for infrastructure implementations

pub mod messenger_client;
pub mod store;

pub use messenger_client::MessengerClient;
pub use store::Store;
