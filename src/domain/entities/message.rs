use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A platform-agnostic inbound message.
///
/// Field names on the wire match the durable state file, so history written
/// by earlier runs keeps loading.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Message {
    pub channel_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,
    #[serde(default)]
    pub content: String,
    pub date: DateTime<Utc>,
    #[serde(rename = "isDM")]
    pub is_dm: bool,
    #[serde(default)]
    pub is_replied: bool,
    #[serde(default)]
    pub reply_author: String,
    #[serde(default, rename = "replyMesage")]
    pub reply_message: String,
    #[serde(default)]
    pub is_mentioned: bool,
}

impl Message {
    pub fn new(channel_id: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            channel_id: channel_id.into(),
            username: None,
            content: content.into(),
            date: Utc::now(),
            is_dm: true,
            is_replied: false,
            reply_author: String::new(),
            reply_message: String::new(),
            is_mentioned: false,
        }
    }

    pub fn with_username(mut self, username: Option<String>) -> Self {
        self.username = username;
        self
    }

    pub fn with_date(mut self, date: DateTime<Utc>) -> Self {
        self.date = date;
        self
    }

    pub fn with_dm(mut self, is_dm: bool) -> Self {
        self.is_dm = is_dm;
        self
    }

    /// Marks the message as a reply to one of our own messages.
    pub fn with_reply(mut self, author: impl Into<String>, message: impl Into<String>) -> Self {
        self.is_replied = true;
        self.reply_author = author.into();
        self.reply_message = message.into();
        self
    }

    pub fn with_mention(mut self, is_mentioned: bool) -> Self {
        self.is_mentioned = is_mentioned;
        self
    }
}
