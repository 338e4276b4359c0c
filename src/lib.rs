// Public modules
pub mod backend;
pub mod chat;
pub mod client;
pub mod client_logger;
pub mod error;
pub mod observability;
pub mod render;
pub mod text_stream;
pub mod types;

// Re-exports
pub use backend::{ByteStream, ChatBackend, ChatResponse};
pub use client::ChatClient;
pub use client_logger::ClientLogger;
pub use error::{ChatError, Error, Result};
pub use observability::register_biometrics;
pub use render::{
    BufferRenderer, Dialog, MessageBody, MessageHandle, PlainTextRenderer, Placeholder, Renderer,
    render_text,
};
pub use text_stream::{TextStream, Utf8Decoder, decode_text};
pub use types::*;
