//! Message parser - Normalizes native Telegram messages into domain messages

use chrono::{DateTime, Utc};

use super::types;
use crate::domain::entities::{Identity, Message};

/// Parses native messages relative to our own identity
#[derive(Debug, Clone)]
pub struct MessageParser {
    identity: Identity,
}

impl MessageParser {
    pub fn new(identity: Identity) -> Self {
        Self { identity }
    }

    pub fn identity(&self) -> &Identity {
        &self.identity
    }

    /// Only an explicit group-creation marker counts as a group at parse time.
    /// Groups that existed before we joined are classified as DMs.
    pub fn is_dm(message: &types::Message) -> bool {
        !message.group_chat_created
    }

    fn is_me(&self, user: &types::User) -> bool {
        user.id.to_string() == self.identity.id
    }

    /// The replied-to message, if it is one of ours
    fn replied_to_me<'a>(&self, message: &'a types::Message) -> Option<&'a types::Message> {
        message
            .reply_to_message
            .as_deref()
            .filter(|reply| reply.from.as_ref().is_some_and(|from| self.is_me(from)))
    }

    pub fn is_replied(&self, message: &types::Message) -> bool {
        self.replied_to_me(message).is_some()
    }

    pub fn is_mentioned(&self, message: &types::Message) -> bool {
        let text = message.text.as_deref().unwrap_or_default();
        message.entities.iter()
            .filter(|entity| entity.is_mention())
            .any(|entity| match &entity.user {
                Some(user) => self.is_me(user),
                None => entity.kind == "mention"
                    && entity.text_in(text).is_some_and(|handle| self.identity.is_handle(&handle)),
            })
    }

    /// Convert a native message into a domain message
    pub fn parse(&self, message: &types::Message) -> Message {
        let date = DateTime::<Utc>::from_timestamp(message.date, 0).unwrap_or_else(Utc::now);

        let parsed = Message::new(message.chat.id.to_string(), message.text.clone().unwrap_or_default())
            .with_username(message.from.as_ref().and_then(|u| u.username.clone()))
            .with_date(date)
            .with_dm(Self::is_dm(message))
            .with_mention(self.is_mentioned(message));

        match self.replied_to_me(message) {
            Some(reply) => parsed.with_reply(
                reply.from.as_ref().and_then(|u| u.username.clone()).unwrap_or_default(),
                reply.text.clone().unwrap_or_default(),
            ),
            None => parsed,
        }
    }
}
