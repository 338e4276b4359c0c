//! The seam between the chat components and the backend service.
//!
//! Everything the registry, history loader and stream consumer know about the
//! backend goes through [`ChatBackend`].  [`ChatClient`](crate::ChatClient)
//! implements it over HTTP; tests implement it in memory.

use std::fmt;
use std::pin::Pin;

use bytes::Bytes;
use futures::Stream;

use crate::error::Result;
use crate::types::{ChatRequest, Message, Session, SessionId, SessionIdentity};

/// Raw response body of a send, delivered in arbitrary chunks.
pub type ByteStream = Pin<Box<dyn Stream<Item = Result<Bytes>> + Send>>;

/// The successful start of a send: identity metadata plus the unread body.
pub struct ChatResponse {
    /// Identity assigned to a draft session, if the backend promoted one.
    pub identity: Option<SessionIdentity>,
    /// The streamed reply.
    pub body: ByteStream,
}

impl ChatResponse {
    /// Create a response from its parts.
    pub fn new(identity: Option<SessionIdentity>, body: ByteStream) -> Self {
        Self { identity, body }
    }
}

impl fmt::Debug for ChatResponse {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ChatResponse")
            .field("identity", &self.identity)
            .finish_non_exhaustive()
    }
}

/// Operations the chat backend offers.
///
/// Each call is a single attempt; implementations never retry.
#[async_trait::async_trait]
pub trait ChatBackend: Send + Sync {
    /// List known sessions, most recently used first.
    async fn list_sessions(&self) -> Result<Vec<Session>>;

    /// Fetch the ordered history of a session.
    async fn history(&self, id: &SessionId) -> Result<Vec<Message>>;

    /// Send a prompt and return once the reply has started.
    ///
    /// A non-success status is an error; the body has not been read yet when
    /// this returns `Ok`.
    async fn send(&self, request: ChatRequest) -> Result<ChatResponse>;

    /// Delete a session.
    async fn delete_session(&self, id: &SessionId) -> Result<()>;
}
