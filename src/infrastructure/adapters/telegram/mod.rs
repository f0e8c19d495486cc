//! Telegram adapter

pub mod parser;
pub mod transport;
pub mod types;

use async_trait::async_trait;
use std::collections::BTreeSet;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::{Mutex, OnceCell};

pub use parser::MessageParser;
pub use transport::{HttpTransport, TelegramTransport};
pub use types::{ChatAction, NativeEvent};

use crate::application::errors::{ConfigError, MessengerError};
use crate::application::messaging::MessageEmitter;
use crate::domain::entities::{Channel, Channels, Identity, Message};
use crate::domain::traits::{MessengerClient, Store};
use crate::infrastructure::config::{Config, MessengerConfig};
use crate::infrastructure::storage::JsonStore;

/// Platform name used to partition durable state
pub const PLATFORM: &str = "telegram";

/// Adapter settings injected at construction
#[derive(Debug, Clone, Default)]
pub struct ClientSettings {
    pub confinement_channels: Vec<String>,
}

impl ClientSettings {
    pub fn from_config(config: &MessengerConfig) -> Self {
        Self {
            confinement_channels: config.confinement_channels.clone(),
        }
    }

    /// Check if a group channel is outside the confinement list
    fn is_confined_out(&self, channel_id: &str) -> bool {
        if self.confinement_channels.is_empty() {
            false // No confinement configured, react everywhere
        } else {
            !self.confinement_channels.iter().any(|c| c == channel_id)
        }
    }
}

/// Telegram messenger client.
///
/// Clones share the session, the identity, the channel state and the
/// emitter, so a clone taken before `connect` sees the identity once any
/// instance has connected. Inbound
/// events are handled one at a time by the listener task: normalize, merge
/// into channel state, persist, then emit.
#[derive(Clone)]
pub struct TelegramClient {
    transport: Arc<dyn TelegramTransport>,
    store: Arc<dyn Store>,
    settings: Arc<ClientSettings>,
    parser: Arc<OnceCell<MessageParser>>,
    channels: Arc<Mutex<Channels>>,
    emitter: MessageEmitter,
    listening: Arc<AtomicBool>,
}

impl TelegramClient {
    pub fn new(transport: Arc<dyn TelegramTransport>, store: Arc<dyn Store>, settings: ClientSettings) -> Self {
        Self {
            transport,
            store,
            settings: Arc::new(settings),
            parser: Arc::new(OnceCell::new()),
            channels: Arc::new(Mutex::new(Channels::new())),
            emitter: MessageEmitter::new(),
            listening: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Build an HTTP-backed client with a JSON store from configuration
    pub fn from_config(config: &Config) -> Result<Self, ConfigError> {
        let token = config.telegram_token()?;
        let transport = HttpTransport::new(token, config.telegram.api_base.clone(), config.telegram.poll_timeout);
        let store = JsonStore::new(config.messenger.memory_path.clone(), PLATFORM);

        Ok(Self::new(
            Arc::new(transport),
            Arc::new(store),
            ClientSettings::from_config(&config.messenger),
        ))
    }

    /// Our own identity, known once connected
    pub fn identity(&self) -> Option<&Identity> {
        self.parser.get().map(MessageParser::identity)
    }

    /// The emitter messages are published on. Subscribe here before
    /// `listen_messages` to be sure not to miss the first events.
    pub fn emitter(&self) -> &MessageEmitter {
        &self.emitter
    }

    fn parser(&self) -> Result<&MessageParser, MessengerError> {
        self.parser.get().ok_or(MessengerError::NotConnected)
    }

    /// Snapshot of a channel's state
    pub async fn channel(&self, channel_id: &str) -> Option<Channel> {
        self.channels.lock().await.get(channel_id).cloned()
    }

    /// Live member handles of a channel merged with the ones already known
    pub async fn get_usernames(&self, channel_id: &str) -> Result<BTreeSet<String>, MessengerError> {
        let chat = self.transport.get_chat(channel_id).await?;

        let mut merged = Channel::new(channel_id, true);
        if let Some(known) = self.channels.lock().await.get(channel_id) {
            merged.merge_usernames(&known.usernames);
        }
        merged.merge_usernames(&chat.active_usernames);
        Ok(merged.usernames)
    }

    /// Reload durable state for our identity, replacing what is in memory
    pub async fn load(&self) -> Result<(), MessengerError> {
        let identity = self.parser()?.identity();
        let channels = self.store.load(&identity.username).await;
        tracing::info!("Loaded {} channels for {}", channels.len(), identity);
        *self.channels.lock().await = channels;
        Ok(())
    }

    /// Persist the full channel map for our identity
    pub async fn save(&self) -> Result<(), MessengerError> {
        let identity = self.parser()?.identity();
        let mut channels = self.channels.lock().await;
        self.store.save(&identity.username, &mut channels).await?;
        Ok(())
    }

    /// Handle one inbound native message.
    ///
    /// Returns the emitted message, or `None` when the channel is filtered out.
    pub async fn handle_message(&self, message: types::Message) -> Result<Option<Message>, MessengerError> {
        let parser = self.parser()?;
        let channel_id = message.chat.id.to_string();
        let is_dm = MessageParser::is_dm(&message);

        if !is_dm && self.settings.is_confined_out(&channel_id) {
            tracing::debug!("Ignoring message from non-confinement channel {}", channel_id);
            return Ok(None);
        }

        let parsed = parser.parse(&message);
        let usernames = self.get_usernames(&channel_id).await?;

        {
            let mut channels = self.channels.lock().await;
            let channel = channels
                .entry(channel_id.clone())
                .or_insert_with(|| Channel::new(&channel_id, is_dm));
            channel.is_dm = is_dm;
            channel.merge_usernames(&usernames);
            channel.merge_usernames(&parsed.username);
            channel.push_message(parsed.clone());

            self.store.save(&parser.identity().username, &mut channels).await?;
        }

        tracing::debug!("[{}] {:?}: {}", channel_id, parsed.username, parsed.content);
        self.emitter.emit_message(parsed.clone());
        Ok(Some(parsed))
    }

    /// Handle one native event; only plain messages are consumed
    pub async fn handle_event(&self, event: NativeEvent) {
        match event {
            NativeEvent::Message(message) => {
                let chat_id = message.chat.id;
                if let Err(e) = self.handle_message(message).await {
                    tracing::error!("Failed to handle message from {}: {}", chat_id, e);
                }
            }
            other => tracing::debug!("Ignoring {} event", other.kind()),
        }
    }
}

#[async_trait]
impl MessengerClient for TelegramClient {
    async fn connect(&mut self) -> Result<(), MessengerError> {
        self.transport.connect().await?;

        let me = self.transport.get_me().await?;
        let username = me.username
            .filter(|u| !u.is_empty())
            .ok_or_else(|| MessengerError::Auth("bot account has no username".to_string()))?;

        let identity = Identity::new(me.id.to_string(), username);

        // One identity per adapter; reconnecting as someone else is refused
        if let Err(e) = self.parser.set(MessageParser::new(identity.clone())) {
            let current = self.parser()?.identity();
            if *current != identity {
                tracing::warn!("Refusing to switch identity from {} to {}: {}", current, identity, e);
                return Err(MessengerError::Auth(format!("already connected as {}", current)));
            }
        }
        self.load().await
    }

    async fn send_message(&self, text: &str, channel_id: &str) -> Result<(), MessengerError> {
        self.transport.send_message(channel_id, text).await?;
        Ok(())
    }

    async fn set_status(&self) -> Result<(), MessengerError> {
        // Telegram has no presence status
        Ok(())
    }

    async fn delete_messages(&self) -> Result<(), MessengerError> {
        // Telegram does not let bots wipe chat history
        Ok(())
    }

    async fn listen_messages(&self) -> Result<MessageEmitter, MessengerError> {
        self.parser()?;
        if self.listening.swap(true, Ordering::SeqCst) {
            return Err(MessengerError::AlreadyListening);
        }

        let mut events = match self.transport.subscribe().await {
            Ok(events) => events,
            Err(e) => {
                self.listening.store(false, Ordering::SeqCst);
                return Err(e);
            }
        };

        let client = self.clone();
        tokio::spawn(async move {
            while let Some(event) = events.recv().await {
                client.handle_event(event).await;
            }
            tracing::info!("Telegram event stream closed");
        });

        Ok(self.emitter.clone())
    }

    async fn get_history(&self, channel_id: &str, max_history: usize) -> Result<Vec<Message>, MessengerError> {
        let channels = self.channels.lock().await;
        Ok(channels
            .get(channel_id)
            .map(|c| c.recent(max_history).to_vec())
            .unwrap_or_default())
    }

    fn set_is_typing(&self, channel_id: &str) {
        let transport = self.transport.clone();
        let channel_id = channel_id.to_string();
        tokio::spawn(async move {
            if let Err(e) = transport.send_chat_action(&channel_id, ChatAction::Typing).await {
                tracing::warn!("Typing hint to {} failed: {}", channel_id, e);
            }
        });
    }

    async fn is_typing(&self) -> bool {
        // Telegram does not expose whether a peer is typing
        false
    }
}
