use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, HashMap};

use super::Message;

/// Maximum number of messages kept per channel on durable storage
pub const HISTORY_LIMIT: usize = 100;

/// All known channels, keyed by channel id
pub type Channels = HashMap<String, Channel>;

/// Durable per-channel state: membership and recent history
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Channel {
    pub channel_id: String,
    #[serde(rename = "isDM")]
    pub is_dm: bool,
    #[serde(default)]
    pub usernames: BTreeSet<String>,
    #[serde(default)]
    pub messages: Vec<Message>,
}

impl Channel {
    pub fn new(channel_id: impl Into<String>, is_dm: bool) -> Self {
        Self {
            channel_id: channel_id.into(),
            is_dm,
            usernames: BTreeSet::new(),
            messages: Vec::new(),
        }
    }

    /// Merge handles into the membership set, skipping empty ones.
    pub fn merge_usernames<I, S>(&mut self, usernames: I)
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        for username in usernames {
            let username = username.as_ref().trim();
            if !username.is_empty() {
                self.usernames.insert(username.to_string());
            }
        }
    }

    /// Append a message to the history, most recent last.
    pub fn push_message(&mut self, message: Message) {
        self.messages.push(message);
    }

    /// Drop everything but the `limit` most recent messages.
    pub fn trim_history(&mut self, limit: usize) {
        if self.messages.len() > limit {
            let excess = self.messages.len() - limit;
            self.messages.drain(..excess);
        }
    }

    /// The `max` most recent messages, oldest first.
    pub fn recent(&self, max: usize) -> &[Message] {
        let start = self.messages.len().saturating_sub(max);
        &self.messages[start..]
    }
}
