//! Chat
//!
//! Message composition and display for the community chat room. Composing
//! requires a signed-in session; rendering styles links in the viewer's own
//! messages differently from everyone else's.

use chrono::{DateTime, Utc};
use serde::Serialize;
use thiserror::Error;

use crate::content::{render, scan, DisplayUnit, LinkVariant};
use crate::store::{ChatMessage, ChatStore, MessageId, NewChatMessage, StoreError, UserId};

/// Longest accepted message, in characters
pub const MAX_MESSAGE_CHARS: usize = 2000;

/// Authentication context of the caller
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Session {
    user_id: Option<UserId>,
}

impl Session {
    pub fn anonymous() -> Self {
        Self { user_id: None }
    }

    pub fn authenticated(user_id: UserId) -> Self {
        Self {
            user_id: Some(user_id),
        }
    }

    pub fn user_id(&self) -> Option<&UserId> {
        self.user_id.as_ref()
    }
}

/// Chat errors
#[derive(Error, Debug)]
pub enum ChatError {
    #[error("Sending a message requires a signed-in user")]
    NotAuthenticated,

    #[error("Message is empty")]
    EmptyMessage,

    #[error("Message exceeds 2000 characters")]
    TooLong,

    #[error("Store error: {0}")]
    Store(#[from] StoreError),
}

/// A message prepared for display to a particular viewer
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RenderedMessage {
    pub id: MessageId,
    pub sender_id: UserId,
    pub created_at: DateTime<Utc>,
    /// Whether the viewer sent this message
    pub own: bool,
    pub units: Vec<DisplayUnit>,
}

/// Validate and build a message for the session's user
pub fn compose(session: &Session, content: &str) -> Result<NewChatMessage, ChatError> {
    let sender_id = session.user_id().ok_or(ChatError::NotAuthenticated)?;

    let content = content.trim();
    if content.is_empty() {
        return Err(ChatError::EmptyMessage);
    }
    if content.chars().count() > MAX_MESSAGE_CHARS {
        return Err(ChatError::TooLong);
    }

    Ok(NewChatMessage {
        sender_id: sender_id.clone(),
        content: content.to_string(),
    })
}

/// Compose a message and store it
pub async fn send_message(
    store: &dyn ChatStore,
    session: &Session,
    content: &str,
) -> Result<ChatMessage, ChatError> {
    let message = compose(session, content)?;
    let stored = store.insert_message(message).await?;
    tracing::debug!(id = %stored.id, sender = %stored.sender_id, "Chat message stored");
    Ok(stored)
}

/// Render message content with the link style for own or others' messages
pub fn render_content(content: &str, own: bool) -> Vec<DisplayUnit> {
    let variant = if own {
        LinkVariant::OwnMessage
    } else {
        LinkVariant::Default
    };
    render(&scan(content), variant)
}

pub fn render_message(message: &ChatMessage, viewer: Option<&UserId>) -> RenderedMessage {
    let own = viewer == Some(&message.sender_id);
    RenderedMessage {
        id: message.id.clone(),
        sender_id: message.sender_id.clone(),
        created_at: message.created_at,
        own,
        units: render_content(&message.content, own),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryStore;

    fn message(sender: &str, content: &str) -> ChatMessage {
        ChatMessage {
            id: MessageId::new("1"),
            sender_id: UserId::new(sender),
            content: content.to_string(),
            created_at: Utc::now(),
        }
    }

    #[test]
    fn test_compose_requires_user() {
        let result = compose(&Session::anonymous(), "hello");
        assert!(matches!(result, Err(ChatError::NotAuthenticated)));
    }

    #[test]
    fn test_compose_trims_and_rejects_empty() {
        let session = Session::authenticated(UserId::new("alice"));

        let message = compose(&session, "  hi there \n").unwrap();
        assert_eq!(message.content, "hi there");
        assert_eq!(message.sender_id, UserId::new("alice"));

        assert!(matches!(compose(&session, "   "), Err(ChatError::EmptyMessage)));
        assert!(matches!(
            compose(&session, &"x".repeat(MAX_MESSAGE_CHARS + 1)),
            Err(ChatError::TooLong)
        ));
    }

    #[test]
    fn test_render_own_message_style() {
        let msg = message("alice", "slides at www.deck.io");
        let alice = UserId::new("alice");
        let bob = UserId::new("bob");

        let own = render_message(&msg, Some(&alice));
        let other = render_message(&msg, Some(&bob));
        let anonymous = render_message(&msg, None);

        assert!(own.own);
        assert!(!other.own);
        assert!(!anonymous.own);
        assert_eq!(own.units.len(), other.units.len());
        assert_eq!(
            own.units[1],
            render(&scan("www.deck.io"), LinkVariant::OwnMessage)[0]
        );
        assert_eq!(other.units, anonymous.units);
    }

    #[test]
    fn test_render_does_not_interpret_images() {
        let units = render_content("![alt](pic.png)", false);
        assert_eq!(
            units,
            vec![DisplayUnit::Plain {
                text: "![alt](pic.png)".to_string()
            }]
        );
    }

    #[tokio::test]
    async fn test_send_message_stores() {
        let store = MemoryStore::new();
        let session = Session::authenticated(UserId::new("alice"));

        let stored = send_message(&store, &session, " gm ").await.unwrap();
        assert_eq!(stored.content, "gm");
        assert_eq!(store.list_messages(10).await.unwrap(), vec![stored]);
    }

    #[tokio::test]
    async fn test_send_message_anonymous_writes_nothing() {
        let store = MemoryStore::new();

        let result = send_message(&store, &Session::anonymous(), "hi").await;
        assert!(matches!(result, Err(ChatError::NotAuthenticated)));
        assert!(store.list_messages(10).await.unwrap().is_empty());
    }
}
