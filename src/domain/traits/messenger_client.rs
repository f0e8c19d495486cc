use async_trait::async_trait;

use crate::application::errors::MessengerError;
use crate::application::messaging::MessageEmitter;
use crate::domain::entities::Message;

/// MessengerClient trait - uniform contract over a chat platform.
///
/// Capabilities a platform lacks (presence, deleting history, querying
/// whether a peer is typing) are successful no-ops or fixed defaults, not
/// errors.
#[async_trait]
pub trait MessengerClient: Send + Sync {
    /// Establish the session and restore durable channel state
    async fn connect(&mut self) -> Result<(), MessengerError>;

    /// Send a text message to a channel
    async fn send_message(&self, text: &str, channel_id: &str) -> Result<(), MessengerError>;

    /// Update the presence status
    async fn set_status(&self) -> Result<(), MessengerError>;

    /// Delete previously sent messages
    async fn delete_messages(&self) -> Result<(), MessengerError>;

    /// Start consuming inbound messages and return the emitter they are re-published on
    async fn listen_messages(&self) -> Result<MessageEmitter, MessengerError>;

    /// Up to `max_history` most recent messages of a channel, oldest first
    async fn get_history(&self, channel_id: &str, max_history: usize) -> Result<Vec<Message>, MessengerError>;

    /// Hint that we are typing in a channel. Fire-and-forget.
    ///
    /// Spawns onto the current Tokio runtime and panics when called outside one.
    fn set_is_typing(&self, channel_id: &str);

    /// Whether a peer is currently typing
    async fn is_typing(&self) -> bool;
}
