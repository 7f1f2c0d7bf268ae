//! Transcript messages and the append-only conversation

use std::fmt;

/// Unique, monotonically increasing message identity
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct MessageId(pub u64);

impl fmt::Display for MessageId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Sender {
    User,
    Bot,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Message {
    id: MessageId,
    text: String,
    sender: Sender,
}

impl Message {
    pub fn id(&self) -> MessageId {
        self.id
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn sender(&self) -> Sender {
        self.sender
    }

    pub fn is_bot(&self) -> bool {
        self.sender == Sender::Bot
    }
}

/// Ordered session transcript. Insertion order is display order and
/// messages cannot be edited or removed once pushed.
#[derive(Debug, Default)]
pub struct Conversation {
    messages: Vec<Message>,
    next_id: u64,
}

impl Conversation {
    pub fn new() -> Self {
        Self {
            messages: Vec::new(),
            next_id: 1,
        }
    }

    /// Start a conversation with a bot greeting already in place
    pub fn with_greeting(greeting: Option<&str>) -> Self {
        let mut conversation = Self::new();
        if let Some(text) = greeting.filter(|text| !text.trim().is_empty()) {
            conversation.push(Sender::Bot, text);
        }
        conversation
    }

    pub fn push(&mut self, sender: Sender, text: impl Into<String>) -> MessageId {
        let id = MessageId(self.next_id.max(1));
        self.next_id = id.0 + 1;
        self.messages.push(Message {
            id,
            text: text.into(),
            sender,
        });
        id
    }

    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    pub fn last(&self) -> Option<&Message> {
        self.messages.last()
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ids_are_unique_and_increasing() {
        let mut conversation = Conversation::new();
        let a = conversation.push(Sender::User, "one");
        let b = conversation.push(Sender::Bot, "two");
        let c = conversation.push(Sender::User, "three");

        assert!(a < b && b < c);
        let texts: Vec<&str> = conversation.messages().iter().map(Message::text).collect();
        assert_eq!(texts, vec!["one", "two", "three"]);
    }

    #[test]
    fn default_conversation_still_starts_at_one() {
        let mut conversation = Conversation::default();
        assert_eq!(conversation.push(Sender::User, "hi"), MessageId(1));
    }

    #[test]
    fn blank_greeting_is_skipped() {
        assert!(Conversation::with_greeting(Some("   ")).is_empty());
        assert!(Conversation::with_greeting(None).is_empty());

        let conversation = Conversation::with_greeting(Some("Hello!"));
        assert_eq!(conversation.len(), 1);
        assert!(conversation.messages()[0].is_bot());
    }
}
