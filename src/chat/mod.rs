//! Chat session management.
//!
//! This module implements the client side of a streaming chat UI:
//!
//! - [`registry`]: the list of known sessions and which one is selected
//! - [`history`]: loading and replaying a session's messages
//! - [`stream`]: sending a prompt and rendering the streamed reply
//! - [`controller`]: orchestration of the above for user actions
//! - [`config`]: CLI argument parsing and configuration
//! - [`commands`]: slash command parsing for the terminal front end

mod commands;
mod config;
pub mod controller;
pub mod history;
pub mod registry;
pub mod stream;

pub use crate::render::{BufferRenderer, Dialog, PlainTextRenderer, Renderer};
pub use commands::{ChatCommand, SessionRef, help_text, parse_command};
pub use config::{BASE_URL_ENV, ChatArgs, ChatConfig, DEFAULT_BASE_URL};
pub use controller::{DELETE_FAILED_NOTICE, DeleteOutcome, SendOutcome, SessionController};
pub use history::HistoryLoader;
pub use registry::{SessionEntry, SessionRegistry};
pub use stream::{ReplyStream, StreamConsumer, StreamingMessage};
