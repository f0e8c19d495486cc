//! Telegram transport - session, raw Bot API calls and update polling

use async_trait::async_trait;
use reqwest::Client;
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Mutex;
use std::time::Duration;
use tokio::sync::mpsc;

use super::types::{ApiResponse, Chat, ChatAction, Message, NativeEvent, Update, User};
use crate::application::errors::MessengerError;

/// Buffered inbound events before polling applies backpressure
const EVENT_BUFFER: usize = 128;

/// Pause after a failed poll before trying again
const RETRY_DELAY: Duration = Duration::from_secs(3);

/// The platform session the adapter sits on
#[async_trait]
pub trait TelegramTransport: Send + Sync {
    /// Open the session in continuous-listening mode
    async fn connect(&self) -> Result<(), MessengerError>;

    /// The authenticated bot account
    async fn get_me(&self) -> Result<User, MessengerError>;

    async fn send_message(&self, chat_id: &str, text: &str) -> Result<Message, MessengerError>;

    /// Take the inbound event stream. Can only be taken once.
    async fn subscribe(&self) -> Result<mpsc::Receiver<NativeEvent>, MessengerError>;

    async fn get_chat(&self, chat_id: &str) -> Result<Chat, MessengerError>;

    async fn send_chat_action(&self, chat_id: &str, action: ChatAction) -> Result<(), MessengerError>;
}

/// Thin Bot API client
#[derive(Clone)]
struct ApiClient {
    client: Client,
    token: String,
    api_base: String,
}

impl ApiClient {
    /// Get the API URL for a method
    fn api_url(&self, method: &str) -> String {
        format!("{}/bot{}/{}", self.api_base.trim_end_matches('/'), self.token, method)
    }

    async fn call<P, R>(&self, method: &str, params: &P) -> Result<R, MessengerError>
    where
        P: Serialize + ?Sized + Sync,
        R: DeserializeOwned,
    {
        let response = self.client
            .post(self.api_url(method))
            .json(params)
            .send()
            .await
            .map_err(|e| MessengerError::Network(e.to_string()))?;

        let status = response.status();
        let data: ApiResponse<R> = response
            .json()
            .await
            .map_err(|e| MessengerError::Parse(format!("{} ({}): {}", method, status, e)))?;

        match data {
            ApiResponse { ok: true, result: Some(result), .. } => Ok(result),
            ApiResponse { error_code: Some(401), description, .. } => {
                Err(MessengerError::Auth(description.unwrap_or_else(|| "unauthorized".to_string())))
            }
            ApiResponse { description, .. } => Err(MessengerError::Api(format!(
                "{} failed: {}",
                method,
                description.unwrap_or_else(|| status.to_string())
            ))),
        }
    }

    async fn get_updates(&self, offset: i64, timeout: u64) -> Result<Vec<Update>, MessengerError> {
        #[derive(Serialize)]
        struct GetUpdatesRequest<'a> {
            offset: i64,
            timeout: u64,
            allowed_updates: &'a [&'a str],
        }

        let request = GetUpdatesRequest {
            offset,
            timeout,
            allowed_updates: &["message", "edited_message", "callback_query"],
        };
        self.call("getUpdates", &request).await
    }
}

/// Get the next update offset
pub fn next_offset(updates: &[Update], current: i64) -> i64 {
    updates.iter()
        .map(|u| u.update_id + 1)
        .max()
        .unwrap_or(current)
        .max(current)
}

/// HTTP transport over the Telegram Bot API with long polling
pub struct HttpTransport {
    api: ApiClient,
    poll_timeout: u64,
    events_tx: mpsc::Sender<NativeEvent>,
    events_rx: Mutex<Option<mpsc::Receiver<NativeEvent>>>,
    polling: AtomicBool,
}

impl HttpTransport {
    pub fn new(token: impl Into<String>, api_base: impl Into<String>, poll_timeout: u64) -> Self {
        let (events_tx, events_rx) = mpsc::channel(EVENT_BUFFER);
        Self {
            api: ApiClient {
                client: Client::new(),
                token: token.into(),
                api_base: api_base.into(),
            },
            poll_timeout,
            events_tx,
            events_rx: Mutex::new(Some(events_rx)),
            polling: AtomicBool::new(false),
        }
    }

    async fn poll(api: ApiClient, timeout: u64, events: mpsc::Sender<NativeEvent>) {
        let mut offset = 0;
        loop {
            let updates = match api.get_updates(offset, timeout).await {
                Ok(updates) => updates,
                Err(e) => {
                    tracing::warn!("Polling failed, retrying in {:?}: {}", RETRY_DELAY, e);
                    tokio::time::sleep(RETRY_DELAY).await;
                    continue;
                }
            };

            offset = next_offset(&updates, offset);
            for update in updates {
                let Some(event) = update.into_event() else {
                    continue;
                };
                if events.send(event).await.is_err() {
                    tracing::info!("Event receiver dropped, stopping Telegram polling");
                    return;
                }
            }
        }
    }
}

#[async_trait]
impl TelegramTransport for HttpTransport {
    async fn connect(&self) -> Result<(), MessengerError> {
        if self.polling.swap(true, Ordering::SeqCst) {
            return Ok(());
        }

        // Fail fast on a bad token before spawning the poller
        if let Err(e) = self.get_me().await {
            self.polling.store(false, Ordering::SeqCst);
            return Err(e);
        }

        let token = &self.api.token;
        tracing::info!("Starting Telegram polling (token: {}...)", &token[..8.min(token.len())]);
        tokio::spawn(Self::poll(self.api.clone(), self.poll_timeout, self.events_tx.clone()));
        Ok(())
    }

    async fn get_me(&self) -> Result<User, MessengerError> {
        self.api.call("getMe", &serde_json::json!({})).await
    }

    async fn send_message(&self, chat_id: &str, text: &str) -> Result<Message, MessengerError> {
        #[derive(Serialize)]
        struct SendMessageRequest<'a> {
            chat_id: &'a str,
            text: &'a str,
        }

        tracing::debug!("Sending to {}: {}", chat_id, text);
        self.api.call("sendMessage", &SendMessageRequest { chat_id, text }).await
    }

    async fn subscribe(&self) -> Result<mpsc::Receiver<NativeEvent>, MessengerError> {
        self.events_rx
            .lock()
            .map_err(|_| MessengerError::Internal("event receiver lock poisoned".to_string()))?
            .take()
            .ok_or(MessengerError::AlreadyListening)
    }

    async fn get_chat(&self, chat_id: &str) -> Result<Chat, MessengerError> {
        self.api.call("getChat", &serde_json::json!({ "chat_id": chat_id })).await
    }

    async fn send_chat_action(&self, chat_id: &str, action: ChatAction) -> Result<(), MessengerError> {
        #[derive(Serialize)]
        struct SendChatActionRequest<'a> {
            chat_id: &'a str,
            action: &'a str,
        }

        let request = SendChatActionRequest { chat_id, action: action.as_str() };
        let _: bool = self.api.call("sendChatAction", &request).await?;
        Ok(())
    }
}
