//! Telegram Bot API types, limited to the fields the adapter reads

use serde::{Deserialize, Serialize};

/// Telegram update type
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Update {
    pub update_id: i64,
    pub message: Option<Message>,
    pub edited_message: Option<Message>,
    pub callback_query: Option<CallbackQuery>,
}

impl Update {
    /// The native event carried by this update, if it is one we know
    pub fn into_event(self) -> Option<NativeEvent> {
        if let Some(message) = self.message {
            Some(NativeEvent::Message(message))
        } else if let Some(message) = self.edited_message {
            Some(NativeEvent::EditedMessage(message))
        } else {
            self.callback_query.map(NativeEvent::CallbackQuery)
        }
    }
}

/// Inbound events a transport can deliver
#[derive(Debug, Clone)]
pub enum NativeEvent {
    Message(Message),
    EditedMessage(Message),
    CallbackQuery(CallbackQuery),
}

impl NativeEvent {
    pub fn kind(&self) -> &'static str {
        match self {
            NativeEvent::Message(_) => "message",
            NativeEvent::EditedMessage(_) => "edited_message",
            NativeEvent::CallbackQuery(_) => "callback_query",
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Message {
    pub message_id: i64,
    pub from: Option<User>,
    pub chat: Chat,
    /// Unix time in seconds
    #[serde(default)]
    pub date: i64,
    pub text: Option<String>,
    pub reply_to_message: Option<Box<Message>>,
    #[serde(default)]
    pub entities: Vec<MessageEntity>,
    #[serde(default)]
    pub group_chat_created: bool,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct User {
    pub id: i64,
    #[serde(default)]
    pub is_bot: bool,
    pub first_name: Option<String>,
    pub username: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct Chat {
    pub id: i64,
    #[serde(rename = "type")]
    pub kind: Option<String>,
    pub title: Option<String>,
    pub username: Option<String>,
    #[serde(default)]
    pub active_usernames: Vec<String>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct MessageEntity {
    #[serde(rename = "type")]
    pub kind: String,
    /// Offset in UTF-16 code units
    pub offset: usize,
    /// Length in UTF-16 code units
    pub length: usize,
    pub user: Option<User>,
}

impl MessageEntity {
    pub fn is_mention(&self) -> bool {
        self.kind == "mention" || self.kind == "text_mention"
    }

    /// The slice of `text` this entity covers
    pub fn text_in(&self, text: &str) -> Option<String> {
        let units: Vec<u16> = text.encode_utf16().collect();
        let end = self.offset.checked_add(self.length)?;
        let slice = units.get(self.offset..end)?;
        String::from_utf16(slice).ok()
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct CallbackQuery {
    pub id: String,
    pub from: User,
    pub message: Option<Message>,
    pub data: Option<String>,
}

/// Chat actions understood by `sendChatAction`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChatAction {
    Typing,
}

impl ChatAction {
    pub fn as_str(&self) -> &'static str {
        match self {
            ChatAction::Typing => "typing",
        }
    }
}

/// Envelope every Bot API method replies with
#[derive(Debug, Deserialize)]
pub struct ApiResponse<T> {
    pub ok: bool,
    pub result: Option<T>,
    pub description: Option<String>,
    pub error_code: Option<i64>,
}
