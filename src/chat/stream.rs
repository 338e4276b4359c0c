//! Sending a prompt and consuming the streamed reply.
//!
//! A send moves through a fixed sequence of states:
//!
//! 1. **Sending**: the user message and an empty reply placeholder are shown
//!    before the request goes out.
//! 2. **Streaming**: the reply body is decoded incrementally; the accumulated
//!    text is shown verbatim after every chunk.
//! 3. **Finalized**: the full text is formatted and replaces the placeholder.
//! 4. **Failed**: at any point, the placeholder is replaced by an error
//!    message and whatever text had arrived is discarded.
//!
//! [`StreamConsumer::begin`] covers the first step and returns a
//! [`ReplyStream`] once the reply has started; the caller applies any session
//! identity the response carried and then drives the rest with
//! [`ReplyStream::finish`].

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Instant;

use futures::StreamExt;

use crate::backend::ChatBackend;
use crate::error::ChatError;
use crate::observability::{
    SENDS_REJECTED_BUSY, STREAM_CHUNKS, STREAM_DURATION, STREAM_ERRORS, STREAM_TTFB,
};
use crate::render::{MessageBody, MessageHandle, Renderer};
use crate::text_stream::{TextStream, decode_text};
use crate::types::{ChatRequest, Message, Role, SessionId, SessionIdentity};

/// The assistant reply currently being received.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct StreamingMessage {
    partial_text: String,
    committed: bool,
}

impl StreamingMessage {
    /// Creates an empty accumulator.
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a decoded chunk.
    pub fn push(&mut self, chunk: &str) {
        debug_assert!(!self.committed);
        self.partial_text.push_str(chunk);
    }

    /// Text received so far.
    pub fn partial_text(&self) -> &str {
        &self.partial_text
    }

    /// True once the reply has been finalized.
    pub fn is_committed(&self) -> bool {
        self.committed
    }

    /// Finalize and take the accumulated text.
    pub fn commit(&mut self) -> String {
        self.committed = true;
        std::mem::take(&mut self.partial_text)
    }
}

/// Issues sends and hands back their reply streams.
///
/// Only one reply may stream at a time; a send attempted while a
/// [`ReplyStream`] is alive fails with [`ChatError::Busy`].
#[derive(Debug, Default)]
pub struct StreamConsumer {
    in_flight: Arc<AtomicBool>,
}

impl StreamConsumer {
    /// Creates a consumer with nothing in flight.
    pub fn new() -> Self {
        Self::default()
    }

    /// True while a reply stream is alive.
    pub fn is_busy(&self) -> bool {
        self.in_flight.load(Ordering::Acquire)
    }

    /// Start sending `prompt` on `chat_id` (`None` for a draft session).
    ///
    /// Blank prompts are ignored: nothing is rendered or sent and `Ok(None)`
    /// is returned.  Otherwise the user message and an empty reply
    /// placeholder are rendered before the request is issued.  A failed
    /// request replaces the placeholder with an error and returns
    /// [`ChatError::Send`].
    pub async fn begin<B: ChatBackend + ?Sized>(
        &self,
        backend: &B,
        renderer: &mut dyn Renderer,
        prompt: &str,
        chat_id: Option<&SessionId>,
    ) -> Result<Option<ReplyStream>, ChatError> {
        let prompt = prompt.trim();
        if prompt.is_empty() {
            return Ok(None);
        }
        let Some(in_flight) = InFlight::acquire(&self.in_flight) else {
            SENDS_REJECTED_BUSY.click();
            return Err(ChatError::Busy);
        };

        renderer.append_message(Role::User, MessageBody::Text(prompt.to_string()));
        let handle = renderer.append_message(Role::Assistant, MessageBody::Text(String::new()));

        let started = Instant::now();
        let request = ChatRequest::new(prompt, chat_id.cloned());
        let response = match backend.send(request).await {
            Ok(response) => response,
            Err(err) => {
                renderer.update_message(handle, MessageBody::send_failure(&err));
                return Err(ChatError::Send(err));
            }
        };

        // identity only means something for a draft
        let identity = if chat_id.is_none() {
            response.identity
        } else {
            None
        };
        Ok(Some(ReplyStream {
            handle,
            streaming: StreamingMessage::new(),
            identity,
            body: decode_text(response.body),
            started,
            _in_flight: in_flight,
        }))
    }
}

/// A reply that has started streaming.
pub struct ReplyStream {
    handle: MessageHandle,
    streaming: StreamingMessage,
    identity: Option<SessionIdentity>,
    body: TextStream,
    started: Instant,
    _in_flight: InFlight,
}

impl ReplyStream {
    /// Log entry showing this reply.
    pub fn handle(&self) -> MessageHandle {
        self.handle
    }

    /// Identity assigned to the draft session this reply belongs to.
    pub fn identity(&self) -> Option<&SessionIdentity> {
        self.identity.as_ref()
    }

    /// Take the assigned identity, leaving none behind.
    pub fn take_identity(&mut self) -> Option<SessionIdentity> {
        self.identity.take()
    }

    /// Consume the reply to completion.
    ///
    /// Each chunk grows the rendered text; at the end the text is formatted
    /// and returned as the committed assistant message.  A body error
    /// replaces everything shown so far with an error message.
    pub async fn finish(mut self, renderer: &mut dyn Renderer) -> Result<Message, ChatError> {
        let mut first_chunk = true;
        while let Some(chunk) = self.body.next().await {
            match chunk {
                Ok(text) => {
                    if first_chunk {
                        STREAM_TTFB.add(self.started.elapsed().as_secs_f64());
                        first_chunk = false;
                    }
                    STREAM_CHUNKS.click();
                    self.streaming.push(&text);
                    renderer.update_message(
                        self.handle,
                        MessageBody::Text(self.streaming.partial_text().to_string()),
                    );
                }
                Err(err) => {
                    STREAM_ERRORS.click();
                    renderer.update_message(self.handle, MessageBody::send_failure(&err));
                    return Err(ChatError::Send(err));
                }
            }
        }
        let text = self.streaming.commit();
        renderer.update_message(self.handle, MessageBody::formatted(&text));
        STREAM_DURATION.add(self.started.elapsed().as_secs_f64());
        Ok(Message::assistant(text))
    }
}

/// Marks a reply as in flight until dropped.
struct InFlight(Arc<AtomicBool>);

impl InFlight {
    fn acquire(flag: &Arc<AtomicBool>) -> Option<Self> {
        flag.compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .ok()
            .map(|_| Self(Arc::clone(flag)))
    }
}

impl Drop for InFlight {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::{ByteStream, ChatResponse};
    use crate::error::{Error, Result};
    use crate::render::BufferRenderer;
    use crate::types::Session;
    use bytes::Bytes;
    use futures::stream;

    /// Backend whose send never completes.
    struct StalledBackend;

    #[async_trait::async_trait]
    impl ChatBackend for StalledBackend {
        async fn list_sessions(&self) -> Result<Vec<Session>> {
            Ok(Vec::new())
        }

        async fn history(&self, _: &SessionId) -> Result<Vec<Message>> {
            Ok(Vec::new())
        }

        async fn send(&self, _: ChatRequest) -> Result<ChatResponse> {
            futures::future::pending().await
        }

        async fn delete_session(&self, _: &SessionId) -> Result<()> {
            Ok(())
        }
    }

    /// Backend replying with fixed chunks.
    struct CannedBackend {
        chunks: Vec<&'static str>,
        identity: Option<SessionIdentity>,
    }

    #[async_trait::async_trait]
    impl ChatBackend for CannedBackend {
        async fn list_sessions(&self) -> Result<Vec<Session>> {
            Ok(Vec::new())
        }

        async fn history(&self, _: &SessionId) -> Result<Vec<Message>> {
            Ok(Vec::new())
        }

        async fn send(&self, _: ChatRequest) -> Result<ChatResponse> {
            let chunks: Vec<Result<Bytes>> = self
                .chunks
                .iter()
                .map(|chunk| Ok(Bytes::from(chunk.to_string())))
                .collect();
            let body: ByteStream = Box::pin(stream::iter(chunks));
            Ok(ChatResponse::new(self.identity.clone(), body))
        }

        async fn delete_session(&self, _: &SessionId) -> Result<()> {
            Err(Error::api(500, "unused"))
        }
    }

    #[test]
    fn optimistic_entries_precede_the_network() {
        let consumer = StreamConsumer::new();
        let mut renderer = BufferRenderer::new();
        {
            let mut send = tokio_test::task::spawn(consumer.begin(
                &StalledBackend,
                &mut renderer,
                "  hello  ",
                None,
            ));
            assert!(send.poll().is_pending());
        }
        let entries = renderer.entries();
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].role, Role::User);
        assert_eq!(entries[0].body(), &MessageBody::Text("hello".to_string()));
        assert_eq!(entries[1].role, Role::Assistant);
        assert_eq!(entries[1].body(), &MessageBody::Text(String::new()));
        assert!(!consumer.is_busy());
    }

    #[tokio::test]
    async fn blank_prompt_is_ignored() {
        let consumer = StreamConsumer::new();
        let mut renderer = BufferRenderer::new();
        let reply = consumer
            .begin(&StalledBackend, &mut renderer, " \n\t ", None)
            .await
            .unwrap();
        assert!(reply.is_none());
        assert!(renderer.entries().is_empty());
    }

    #[tokio::test]
    async fn second_send_while_streaming_is_busy() {
        let backend = CannedBackend {
            chunks: vec!["one"],
            identity: None,
        };
        let consumer = StreamConsumer::new();
        let mut renderer = BufferRenderer::new();
        let reply = consumer
            .begin(&backend, &mut renderer, "first", None)
            .await
            .unwrap()
            .unwrap();
        assert!(consumer.is_busy());
        let err = consumer
            .begin(&backend, &mut renderer, "second", None)
            .await
            .err()
            .unwrap();
        assert!(err.is_busy());
        assert_eq!(renderer.entries().len(), 2);

        reply.finish(&mut renderer).await.unwrap();
        assert!(!consumer.is_busy());
    }

    #[tokio::test]
    async fn identity_is_ignored_for_persisted_sessions() {
        let backend = CannedBackend {
            chunks: vec!["hi"],
            identity: SessionIdentity::from_headers(Some("new"), Some("title")),
        };
        let consumer = StreamConsumer::new();
        let mut renderer = BufferRenderer::new();
        let existing = SessionId::new("old");
        let reply = consumer
            .begin(&backend, &mut renderer, "again", Some(&existing))
            .await
            .unwrap()
            .unwrap();
        assert!(reply.identity().is_none());
    }

    #[tokio::test]
    async fn empty_reply_finalizes_to_placeholder() {
        let backend = CannedBackend {
            chunks: vec![],
            identity: None,
        };
        let consumer = StreamConsumer::new();
        let mut renderer = BufferRenderer::new();
        let reply = consumer
            .begin(&backend, &mut renderer, "say nothing", None)
            .await
            .unwrap()
            .unwrap();
        let message = reply.finish(&mut renderer).await.unwrap();
        assert_eq!(message, Message::assistant(""));
        match renderer.entries()[1].body() {
            MessageBody::Markup { html, .. } => assert_eq!(html, "<p>(empty response)</p>\n"),
            other => panic!("expected markup, got {other:?}"),
        }
    }

    #[test]
    fn streaming_message_commits_once() {
        let mut streaming = StreamingMessage::new();
        streaming.push("Hel");
        streaming.push("lo");
        assert_eq!(streaming.partial_text(), "Hello");
        assert!(!streaming.is_committed());
        assert_eq!(streaming.commit(), "Hello");
        assert!(streaming.is_committed());
    }
}
