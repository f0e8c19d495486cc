//! Message emitter - Re-publishes normalized messages to subscribers

use tokio::sync::broadcast;

use crate::domain::entities::Message;

/// Default number of events buffered per subscriber before it starts lagging
const DEFAULT_CAPACITY: usize = 256;

/// Events published by a messenger adapter
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MessengerEvent {
    Message(Message),
}

impl MessengerEvent {
    pub fn name(&self) -> &'static str {
        match self {
            MessengerEvent::Message(_) => "message",
        }
    }
}

/// Fan-out of adapter events. Clones share the same channel.
#[derive(Debug, Clone)]
pub struct MessageEmitter {
    sender: broadcast::Sender<MessengerEvent>,
}

impl MessageEmitter {
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_CAPACITY)
    }

    pub fn with_capacity(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self { sender }
    }

    /// Subscribe to events emitted from now on
    pub fn subscribe(&self) -> broadcast::Receiver<MessengerEvent> {
        self.sender.subscribe()
    }

    /// Emit a `message` event. Returns the number of subscribers reached.
    pub fn emit_message(&self, message: Message) -> usize {
        // No subscribers is not an error; the event is simply dropped.
        self.sender.send(MessengerEvent::Message(message)).unwrap_or(0)
    }
}

impl Default for MessageEmitter {
    fn default() -> Self {
        Self::new()
    }
}
