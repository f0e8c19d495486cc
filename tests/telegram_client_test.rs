//! TelegramClient integration tests against an in-process transport
//! Run with: cargo test --test telegram_client_test

use async_trait::async_trait;
use std::collections::HashMap;
use std::path::Path;
use std::sync::{Arc, Mutex, Once};
use std::time::Duration;
use tokio::sync::broadcast::error::TryRecvError;
use tokio::sync::{broadcast, mpsc};

use messenger_client::domain::entities::HISTORY_LIMIT;
use messenger_client::infrastructure::adapters::telegram::types::{self, Chat, MessageEntity, User};
use messenger_client::infrastructure::adapters::telegram::{
    ChatAction, ClientSettings, NativeEvent, TelegramTransport, PLATFORM,
};
use messenger_client::infrastructure::storage::JsonStore;
use messenger_client::{Message, MessengerClient, MessengerError, MessengerEvent, Store, TelegramClient};

static INIT: Once = Once::new();

fn ensure_init() {
    INIT.call_once(|| {
        let _ = tracing_subscriber::fmt()
            .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
            .with_test_writer()
            .try_init();
    });
}

const BOT_ID: i64 = 999;
const BOT_USERNAME: &str = "carik_bot";

/// Transport double recording outbound calls and replaying scripted inbound events
struct MockTransport {
    me: User,
    members: Mutex<HashMap<String, Vec<String>>>,
    sent: Mutex<Vec<(String, String)>>,
    actions: Mutex<Vec<(String, ChatAction)>>,
    events: Mutex<Option<mpsc::Receiver<NativeEvent>>>,
    fail_connect: bool,
    fail_send: bool,
    fail_get_chat: bool,
}

impl MockTransport {
    fn new() -> (Self, mpsc::Sender<NativeEvent>) {
        let (tx, rx) = mpsc::channel(16);
        let transport = Self {
            me: user(BOT_ID, Some(BOT_USERNAME)),
            members: Mutex::new(HashMap::new()),
            sent: Mutex::new(Vec::new()),
            actions: Mutex::new(Vec::new()),
            events: Mutex::new(Some(rx)),
            fail_connect: false,
            fail_send: false,
            fail_get_chat: false,
        };
        (transport, tx)
    }

    fn with_members(self, chat_id: &str, members: &[&str]) -> Self {
        self.members
            .lock()
            .unwrap()
            .insert(chat_id.to_string(), members.iter().map(|m| m.to_string()).collect());
        self
    }
}

#[async_trait]
impl TelegramTransport for MockTransport {
    async fn connect(&self) -> Result<(), MessengerError> {
        if self.fail_connect {
            return Err(MessengerError::Auth("Unauthorized".to_string()));
        }
        Ok(())
    }

    async fn get_me(&self) -> Result<User, MessengerError> {
        Ok(self.me.clone())
    }

    async fn send_message(&self, chat_id: &str, text: &str) -> Result<types::Message, MessengerError> {
        if self.fail_send {
            return Err(MessengerError::Network("connection reset".to_string()));
        }
        self.sent.lock().unwrap().push((chat_id.to_string(), text.to_string()));
        Ok(native(chat_id.parse().unwrap_or_default(), Some(BOT_USERNAME), text))
    }

    async fn subscribe(&self) -> Result<mpsc::Receiver<NativeEvent>, MessengerError> {
        self.events.lock().unwrap().take().ok_or(MessengerError::AlreadyListening)
    }

    async fn get_chat(&self, chat_id: &str) -> Result<Chat, MessengerError> {
        if self.fail_get_chat {
            return Err(MessengerError::Network("getChat down".to_string()));
        }
        let active_usernames = self.members.lock().unwrap().get(chat_id).cloned().unwrap_or_default();
        Ok(Chat {
            id: chat_id.parse().unwrap_or_default(),
            active_usernames,
            ..Chat::default()
        })
    }

    async fn send_chat_action(&self, chat_id: &str, action: ChatAction) -> Result<(), MessengerError> {
        self.actions.lock().unwrap().push((chat_id.to_string(), action));
        Ok(())
    }
}

fn user(id: i64, username: Option<&str>) -> User {
    User {
        id,
        is_bot: id == BOT_ID,
        first_name: Some("Test".to_string()),
        username: username.map(str::to_string),
    }
}

fn native(chat_id: i64, from: Option<&str>, text: &str) -> types::Message {
    types::Message {
        message_id: 1,
        from: Some(user(1, from)),
        chat: Chat { id: chat_id, ..Chat::default() },
        date: 1_700_000_000,
        text: Some(text.to_string()),
        reply_to_message: None,
        entities: Vec::new(),
        group_chat_created: false,
    }
}

fn group(chat_id: i64, from: Option<&str>, text: &str) -> types::Message {
    let mut message = native(chat_id, from, text);
    message.group_chat_created = true;
    message
}

fn client_for(transport: Arc<MockTransport>, dir: &Path, settings: ClientSettings) -> TelegramClient {
    TelegramClient::new(transport, Arc::new(JsonStore::new(dir, PLATFORM)), settings)
}

async fn connected(dir: &Path, settings: ClientSettings) -> (TelegramClient, Arc<MockTransport>, mpsc::Sender<NativeEvent>) {
    ensure_init();
    let (transport, tx) = MockTransport::new();
    let transport = Arc::new(transport.with_members("-100", &["alice", "", "bob"]));
    let mut client = client_for(transport.clone(), dir, settings);
    client.connect().await.expect("connect");
    (client, transport, tx)
}

async fn next_message(rx: &mut broadcast::Receiver<MessengerEvent>) -> Message {
    let event = tokio::time::timeout(Duration::from_secs(5), rx.recv())
        .await
        .expect("timed out waiting for message")
        .expect("emitter closed");
    let MessengerEvent::Message(message) = event;
    message
}

#[tokio::test]
async fn test_connect_without_prior_state() {
    let dir = tempfile::tempdir().unwrap();
    let (client, _, _) = connected(dir.path(), ClientSettings::default()).await;

    assert_eq!(client.identity().unwrap().username, BOT_USERNAME);
    assert_eq!(client.identity().unwrap().id, BOT_ID.to_string());
    assert!(client.get_history("chan1", 5).await.unwrap().is_empty());
    assert!(!dir.path().join("carik_bot_telegram.json").exists());
}

#[tokio::test]
async fn test_connect_failure_propagates() {
    let dir = tempfile::tempdir().unwrap();
    let (mut transport, _tx) = MockTransport::new();
    transport.fail_connect = true;
    let mut client = client_for(Arc::new(transport), dir.path(), ClientSettings::default());

    assert!(matches!(client.connect().await, Err(MessengerError::Auth(_))));
    assert!(client.identity().is_none());
}

#[tokio::test]
async fn test_corrupt_state_is_ignored() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(dir.path().join("carik_bot_telegram.json"), "[1, 2").unwrap();

    let (client, _, _) = connected(dir.path(), ClientSettings::default()).await;
    assert!(client.channel("5").await.is_none());
}

#[tokio::test]
async fn test_requires_connect() {
    let dir = tempfile::tempdir().unwrap();
    let (transport, _tx) = MockTransport::new();
    let client = client_for(Arc::new(transport), dir.path(), ClientSettings::default());

    let result = client.handle_message(native(5, Some("alice"), "hi")).await;
    assert!(matches!(result, Err(MessengerError::NotConnected)));
    assert!(matches!(client.listen_messages().await, Err(MessengerError::NotConnected)));
}

#[tokio::test]
async fn test_dm_is_normalized_persisted_and_emitted() {
    let dir = tempfile::tempdir().unwrap();
    let (client, _, tx) = connected(dir.path(), ClientSettings::default()).await;

    let mut rx = client.emitter().subscribe();
    client.listen_messages().await.unwrap();
    tx.send(NativeEvent::Message(native(5, Some("alice"), "hi"))).await.unwrap();

    let msg = next_message(&mut rx).await;
    assert_eq!(msg.channel_id, "5");
    assert_eq!(msg.content, "hi");
    assert!(msg.is_dm);
    assert!(!msg.is_replied);
    assert!(!msg.is_mentioned);

    // Persisted before the event went out
    let stored = JsonStore::new(dir.path(), PLATFORM).load(BOT_USERNAME).await;
    assert_eq!(stored["5"].messages, vec![msg]);
    assert!(stored["5"].is_dm);
    assert!(stored["5"].usernames.contains("alice"));
}

#[tokio::test]
async fn test_listen_twice_is_rejected() {
    let dir = tempfile::tempdir().unwrap();
    let (client, _, _tx) = connected(dir.path(), ClientSettings::default()).await;

    let emitter = client.listen_messages().await.unwrap();
    assert!(matches!(client.listen_messages().await, Err(MessengerError::AlreadyListening)));
    drop(emitter);
}

#[tokio::test]
async fn test_non_message_events_are_ignored() {
    let dir = tempfile::tempdir().unwrap();
    let (client, _, tx) = connected(dir.path(), ClientSettings::default()).await;

    let mut rx = client.emitter().subscribe();
    client.listen_messages().await.unwrap();
    tx.send(NativeEvent::EditedMessage(native(5, Some("alice"), "edited")))
        .await
        .unwrap();
    tx.send(NativeEvent::Message(native(5, Some("alice"), "fresh"))).await.unwrap();

    assert_eq!(next_message(&mut rx).await.content, "fresh");
    assert_eq!(client.get_history("5", 10).await.unwrap().len(), 1);
}

#[tokio::test]
async fn test_confinement_filters_groups_only() {
    let dir = tempfile::tempdir().unwrap();
    let settings = ClientSettings { confinement_channels: vec!["-100".to_string()] };
    let (client, _, tx) = connected(dir.path(), settings).await;

    let mut rx = client.emitter().subscribe();
    client.listen_messages().await.unwrap();
    tx.send(NativeEvent::Message(group(-200, Some("mallory"), "outside"))).await.unwrap();
    tx.send(NativeEvent::Message(native(7, Some("dave"), "direct"))).await.unwrap();
    tx.send(NativeEvent::Message(group(-100, Some("carol"), "inside"))).await.unwrap();

    let first = next_message(&mut rx).await;
    assert_eq!(first.content, "direct");
    assert!(first.is_dm);

    let second = next_message(&mut rx).await;
    assert_eq!(second.content, "inside");
    assert!(!second.is_dm);

    assert!(client.channel("-200").await.is_none());
    let stored = JsonStore::new(dir.path(), PLATFORM).load(BOT_USERNAME).await;
    assert!(!stored.contains_key("-200"));
    assert_eq!(stored.len(), 2);
}

#[tokio::test]
async fn test_reply_and_mention_through_listener() {
    let dir = tempfile::tempdir().unwrap();
    let (client, _, tx) = connected(dir.path(), ClientSettings::default()).await;

    let mut rx = client.emitter().subscribe();
    client.listen_messages().await.unwrap();

    let mut reply = group(-100, Some("alice"), "thanks @carik_bot");
    let mut original = native(-100, Some(BOT_USERNAME), "the answer is 42");
    original.from = Some(user(BOT_ID, Some(BOT_USERNAME)));
    reply.reply_to_message = Some(Box::new(original));
    reply.entities.push(MessageEntity {
        kind: "mention".to_string(),
        offset: 7,
        length: 10,
        user: None,
    });
    tx.send(NativeEvent::Message(reply)).await.unwrap();

    let msg = next_message(&mut rx).await;
    assert!(msg.is_replied);
    assert_eq!(msg.reply_author, BOT_USERNAME);
    assert_eq!(msg.reply_message, "the answer is 42");
    assert!(msg.is_mentioned);
}

#[tokio::test]
async fn test_usernames_merge_live_members_and_senders() {
    let dir = tempfile::tempdir().unwrap();
    let (client, _, _) = connected(dir.path(), ClientSettings::default()).await;

    client.handle_message(group(-100, Some("carol"), "one")).await.unwrap();
    client.handle_message(group(-100, None, "two")).await.unwrap();
    client.handle_message(group(-100, Some("alice"), "three")).await.unwrap();

    let channel = client.channel("-100").await.unwrap();
    let names: Vec<&str> = channel.usernames.iter().map(String::as_str).collect();
    assert_eq!(names, vec!["alice", "bob", "carol"]);

    let usernames = client.get_usernames("-100").await.unwrap();
    assert_eq!(usernames, channel.usernames);
}

#[tokio::test]
async fn test_history_is_capped_and_newest_last() {
    let dir = tempfile::tempdir().unwrap();
    let (client, _, _) = connected(dir.path(), ClientSettings::default()).await;
    let store = JsonStore::new(dir.path(), PLATFORM);

    for i in 0..50 {
        client.handle_message(native(5, Some("alice"), &i.to_string())).await.unwrap();
    }
    assert_eq!(store.load(BOT_USERNAME).await["5"].messages.len(), 50);

    for i in 50..(HISTORY_LIMIT + 30) {
        client.handle_message(native(5, Some("alice"), &i.to_string())).await.unwrap();
    }
    let stored = store.load(BOT_USERNAME).await;
    assert_eq!(stored["5"].messages.len(), HISTORY_LIMIT);
    assert_eq!(stored["5"].messages.first().unwrap().content, "30");

    let history = client.get_history("5", 3).await.unwrap();
    let contents: Vec<&str> = history.iter().map(|m| m.content.as_str()).collect();
    assert_eq!(contents, vec!["127", "128", "129"]);
}

#[tokio::test]
async fn test_state_survives_restart() {
    let dir = tempfile::tempdir().unwrap();
    let (client, _, _) = connected(dir.path(), ClientSettings::default()).await;

    client.handle_message(group(-100, Some("carol"), "hello group")).await.unwrap();
    client.handle_message(native(5, Some("alice"), "hello dm")).await.unwrap();
    let before_group = client.channel("-100").await.unwrap();
    let before_dm = client.channel("5").await.unwrap();
    drop(client);

    let (restarted, _, _) = connected(dir.path(), ClientSettings::default()).await;
    assert_eq!(restarted.channel("-100").await.unwrap(), before_group);
    assert_eq!(restarted.channel("5").await.unwrap(), before_dm);
    assert_eq!(restarted.get_history("5", 10).await.unwrap()[0].content, "hello dm");
}

#[tokio::test]
async fn test_send_message_and_failure() {
    let dir = tempfile::tempdir().unwrap();
    let (client, transport, _) = connected(dir.path(), ClientSettings::default()).await;

    client.send_message("hello", "5").await.unwrap();
    assert_eq!(*transport.sent.lock().unwrap(), vec![("5".to_string(), "hello".to_string())]);

    let (mut failing, _tx) = MockTransport::new();
    failing.fail_send = true;
    let client = client_for(Arc::new(failing), dir.path(), ClientSettings::default());
    assert!(matches!(client.send_message("hello", "5").await, Err(MessengerError::Network(_))));
}

#[tokio::test]
async fn test_capability_gaps() {
    let dir = tempfile::tempdir().unwrap();
    let (client, transport, _) = connected(dir.path(), ClientSettings::default()).await;

    client.set_status().await.unwrap();
    client.delete_messages().await.unwrap();
    assert!(!client.is_typing().await);

    client.set_is_typing("5");
    for _ in 0..50 {
        if !transport.actions.lock().unwrap().is_empty() {
            break;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    assert_eq!(*transport.actions.lock().unwrap(), vec![("5".to_string(), ChatAction::Typing)]);
    assert!(!client.is_typing().await);
}

#[tokio::test]
async fn test_get_chat_failure_propagates() {
    ensure_init();
    let dir = tempfile::tempdir().unwrap();
    let (mut transport, _tx) = MockTransport::new();
    transport.fail_get_chat = true;
    let mut client = client_for(Arc::new(transport), dir.path(), ClientSettings::default());
    client.connect().await.unwrap();

    let mut rx = client.emitter().subscribe();
    let result = client.handle_message(group(-100, Some("alice"), "hello")).await;

    assert!(matches!(result, Err(MessengerError::Network(_))));
    assert!(client.channel("-100").await.is_none());
    assert!(matches!(rx.try_recv(), Err(TryRecvError::Empty)));
}

#[tokio::test]
async fn test_storage_failure_propagates() {
    ensure_init();
    let dir = tempfile::tempdir().unwrap();
    // A regular file where the state directory should be
    let blocked = dir.path().join("memory");
    std::fs::write(&blocked, "not a directory").unwrap();

    let (transport, _tx) = MockTransport::new();
    let mut client = client_for(Arc::new(transport), &blocked, ClientSettings::default());
    client.connect().await.unwrap();

    let mut rx = client.emitter().subscribe();
    let result = client.handle_message(native(5, Some("alice"), "hi")).await;

    assert!(matches!(result, Err(MessengerError::Storage(_))));
    // State is mutated before the write, and the event is only emitted after it succeeds
    assert_eq!(client.get_history("5", 10).await.unwrap().len(), 1);
    assert!(matches!(rx.try_recv(), Err(TryRecvError::Empty)));
}

#[tokio::test]
async fn test_clone_before_connect_shares_identity() {
    ensure_init();
    let dir = tempfile::tempdir().unwrap();
    let (transport, _tx) = MockTransport::new();
    let mut client = client_for(Arc::new(transport), dir.path(), ClientSettings::default());
    let early = client.clone();
    assert!(early.identity().is_none());

    client.connect().await.unwrap();

    assert_eq!(early.identity().unwrap().username, BOT_USERNAME);
    let emitted = early.handle_message(native(5, Some("alice"), "hi")).await.unwrap();
    assert!(emitted.is_some());
    assert_eq!(client.get_history("5", 10).await.unwrap().len(), 1);
}

#[tokio::test]
async fn test_reconnect_keeps_identity() {
    let dir = tempfile::tempdir().unwrap();
    let (mut client, _, _) = connected(dir.path(), ClientSettings::default()).await;
    client.handle_message(native(5, Some("alice"), "hi")).await.unwrap();

    client.connect().await.unwrap();
    assert_eq!(client.identity().unwrap().username, BOT_USERNAME);
    assert_eq!(client.get_history("5", 10).await.unwrap().len(), 1);
}
