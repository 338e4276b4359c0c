//! Loading and replaying a session's message history.

use crate::backend::ChatBackend;
use crate::error::ChatError;
use crate::render::{MessageBody, Placeholder, Renderer};
use crate::types::{Message, Role, SessionId};

/// Fetches a session's history and replays it into a renderer.
#[derive(Debug, Default, Clone, Copy)]
pub struct HistoryLoader;

impl HistoryLoader {
    /// Creates a loader.
    pub fn new() -> Self {
        Self
    }

    /// Fetch the ordered messages of a persisted session.
    pub async fn load<B: ChatBackend + ?Sized>(
        &self,
        backend: &B,
        id: &SessionId,
    ) -> Result<Vec<Message>, ChatError> {
        backend.history(id).await.map_err(ChatError::History)
    }

    /// Render `messages` in the order given.
    ///
    /// An empty history renders a single placeholder inviting the user to
    /// start the conversation.  Returns the number of entries mounted.
    pub fn replay(&self, renderer: &mut dyn Renderer, messages: &[Message]) -> usize {
        if messages.is_empty() {
            renderer.append_message(
                Role::Assistant,
                MessageBody::Placeholder(Placeholder::EmptySession),
            );
            return 1;
        }
        for message in messages {
            let body = match message.role {
                Role::User => MessageBody::Text(message.content.clone()),
                Role::Assistant => MessageBody::formatted(&message.content),
            };
            renderer.append_message(message.role, body);
        }
        messages.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::render::BufferRenderer;

    #[test]
    fn empty_history_renders_one_placeholder() {
        let mut renderer = BufferRenderer::new();
        let mounted = HistoryLoader::new().replay(&mut renderer, &[]);
        assert_eq!(mounted, 1);
        assert_eq!(renderer.entries().len(), 1);
        assert_eq!(
            renderer.entries()[0].body(),
            &MessageBody::Placeholder(Placeholder::EmptySession)
        );
    }

    #[test]
    fn replay_preserves_order_and_duplicates() {
        let messages = vec![
            Message::user("same"),
            Message::user("same"),
            Message::assistant("**bold** reply"),
        ];
        let mut renderer = BufferRenderer::new();
        HistoryLoader::new().replay(&mut renderer, &messages);
        let entries = renderer.entries();
        assert_eq!(entries.len(), 3);
        assert_eq!(entries[0].body(), &MessageBody::Text("same".to_string()));
        assert_eq!(entries[1].body(), &MessageBody::Text("same".to_string()));
        match entries[2].body() {
            MessageBody::Markup { html, .. } => assert!(html.contains("<strong>bold</strong>")),
            other => panic!("expected markup, got {other:?}"),
        }
    }
}
