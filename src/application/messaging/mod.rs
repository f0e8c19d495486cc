//! Message handling - Event distribution to adapter subscribers

pub mod emitter;

pub use emitter::{MessageEmitter, MessengerEvent};
