//! The session controller: turns user actions into registry, history and
//! stream operations.
//!
//! The controller is the only owner of the active session identity.  `None`
//! means the user is in a draft session that the backend has not yet
//! assigned an id to; it becomes `Some` either by selecting a listed session
//! or, once, when the first send on a draft is answered with identity
//! headers.

use crate::backend::ChatBackend;
use crate::chat::history::HistoryLoader;
use crate::chat::registry::SessionRegistry;
use crate::chat::stream::StreamConsumer;
use crate::error::{ChatError, Error};
use crate::observability::{SESSIONS_DELETED, SESSIONS_PROMOTED};
use crate::render::{Dialog, MessageBody, Placeholder, Renderer};
use crate::types::{Message, Role, Session, SessionId, SessionIdentity};

/// Notification shown when a delete fails.
pub const DELETE_FAILED_NOTICE: &str = "Could not delete the chat. Please try again.";

/// Result of [`SessionController::send_message`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SendOutcome {
    /// The prompt was blank; nothing happened.
    Ignored,
    /// The reply streamed to completion.
    Completed(Message),
}

/// Result of [`SessionController::delete_session`].
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum DeleteOutcome {
    /// The session was deleted.
    Deleted,
    /// The user declined the confirmation; nothing was sent.
    Cancelled,
}

/// Orchestrates a chat UI on top of a backend, a renderer and a dialog.
pub struct SessionController<B: ChatBackend, R: Renderer> {
    backend: B,
    renderer: R,
    dialog: Box<dyn Dialog>,
    registry: SessionRegistry,
    history: HistoryLoader,
    consumer: StreamConsumer,
    active: Option<SessionId>,
    messages: Vec<Message>,
}

impl<B: ChatBackend, R: Renderer> SessionController<B, R> {
    /// Creates a controller in the draft state with an empty log.
    pub fn new(backend: B, renderer: R, dialog: impl Dialog + 'static) -> Self {
        Self {
            backend,
            renderer,
            dialog: Box::new(dialog),
            registry: SessionRegistry::new(),
            history: HistoryLoader::new(),
            consumer: StreamConsumer::new(),
            active: None,
            messages: Vec::new(),
        }
    }

    /// Load the session list and open the first session, or a new one if
    /// there is none.
    ///
    /// A failed list load still ends in a usable new session; the error is
    /// returned for reporting.
    pub async fn start(&mut self) -> Result<(), ChatError> {
        let listed = self.refresh_sessions().await;
        match self.registry.first().map(|session| session.id.clone()) {
            Some(id) => self.select_session(&id).await,
            None => {
                self.new_session();
                listed
            }
        }
    }

    /// Reload the session list from the backend.
    ///
    /// If the active session is no longer listed (deleted elsewhere), the
    /// controller moves to a new draft session.
    pub async fn refresh_sessions(&mut self) -> Result<(), ChatError> {
        self.registry.list(&self.backend).await?;
        if let Some(id) = &self.active {
            if !self.registry.select(id) {
                self.new_session();
            }
        }
        Ok(())
    }

    /// Leave the current session and start a draft.
    pub fn new_session(&mut self) {
        self.active = None;
        self.messages.clear();
        self.renderer.clear();
        self.renderer.append_message(
            Role::Assistant,
            MessageBody::Placeholder(Placeholder::Greeting),
        );
        self.registry.deselect_all();
    }

    /// Make a listed session active and show its history.
    ///
    /// A failed history load shows a single error placeholder and is
    /// returned as [`ChatError::History`]; the session stays selected.
    pub async fn select_session(&mut self, id: &SessionId) -> Result<(), ChatError> {
        if !self.registry.select(id) {
            // restore the previous marker; nothing else changes
            if let Some(active) = &self.active {
                self.registry.select(active);
            }
            return Err(ChatError::History(Error::not_found(
                "session is not listed",
                Some(id.to_string()),
            )));
        }
        self.active = Some(id.clone());
        self.messages.clear();
        self.renderer.clear();
        self.renderer.append_message(
            Role::Assistant,
            MessageBody::Placeholder(Placeholder::LoadingHistory),
        );

        match self.history.load(&self.backend, id).await {
            Ok(messages) => {
                self.renderer.clear();
                self.history.replay(&mut self.renderer, &messages);
                self.messages = messages;
                Ok(())
            }
            Err(err) => {
                self.renderer.clear();
                self.renderer.append_message(
                    Role::Assistant,
                    MessageBody::Placeholder(Placeholder::HistoryUnavailable),
                );
                Err(err)
            }
        }
    }

    /// Send a prompt on the active session and stream the reply.
    ///
    /// On a draft session the first reply carrying identity headers promotes
    /// the draft: it is listed first, selected, and becomes the active
    /// session before any reply text is shown.
    pub async fn send_message(&mut self, prompt: &str) -> Result<SendOutcome, ChatError> {
        let chat_id = self.active.clone();
        let begun = self
            .consumer
            .begin(&self.backend, &mut self.renderer, prompt, chat_id.as_ref())
            .await;
        let mut reply = match begun {
            Ok(None) => return Ok(SendOutcome::Ignored),
            Ok(Some(reply)) => {
                self.messages.push(Message::user(prompt.trim()));
                reply
            }
            Err(ChatError::Busy) => return Err(ChatError::Busy),
            Err(err) => {
                self.messages.push(Message::user(prompt.trim()));
                return Err(err);
            }
        };

        if let Some(identity) = reply.take_identity() {
            self.promote(identity);
        }

        let message = reply.finish(&mut self.renderer).await?;
        self.messages.push(message.clone());
        Ok(SendOutcome::Completed(message))
    }

    /// Delete a session after the user confirms.
    ///
    /// Deleting the active session starts a new one; deleting any other
    /// leaves the log untouched.  A failed delete keeps the entry and
    /// notifies the user.
    pub async fn delete_session(&mut self, id: &SessionId) -> Result<DeleteOutcome, ChatError> {
        let title = self
            .registry
            .get(id)
            .map(|session| session.display_title().to_string())
            .unwrap_or_else(|| id.to_string());
        let question =
            format!("Are you sure you want to delete the chat \"{title}\"?\nThis cannot be undone.");
        if !self.dialog.confirm(&question) {
            return Ok(DeleteOutcome::Cancelled);
        }

        if let Err(err) = self.backend.delete_session(id).await {
            self.dialog.alert(DELETE_FAILED_NOTICE);
            return Err(ChatError::Delete(err));
        }
        SESSIONS_DELETED.click();
        self.registry.remove(id);
        if self.active.as_ref() == Some(id) {
            self.new_session();
        }
        Ok(DeleteOutcome::Deleted)
    }

    /// The active session id; `None` while in a draft.
    pub fn active_session(&self) -> Option<&SessionId> {
        self.active.as_ref()
    }

    /// True while the active session is a draft.
    pub fn is_draft(&self) -> bool {
        self.active.is_none()
    }

    /// The session list.
    pub fn registry(&self) -> &SessionRegistry {
        &self.registry
    }

    /// Committed messages of the active session, in order.
    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    /// The renderer.
    pub fn renderer(&self) -> &R {
        &self.renderer
    }

    /// The renderer, mutably.
    pub fn renderer_mut(&mut self) -> &mut R {
        &mut self.renderer
    }

    /// The backend.
    pub fn backend(&self) -> &B {
        &self.backend
    }

    fn promote(&mut self, identity: SessionIdentity) {
        if self.active.is_some() {
            return;
        }
        let id = identity.id.clone();
        self.registry.add(Session::from(identity), true);
        self.registry.select(&id);
        self.active = Some(id);
        SESSIONS_PROMOTED.click();
    }
}
