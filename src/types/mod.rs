// Public modules
pub mod chat_request;
pub mod message;
pub mod session;

// Re-exports
pub use chat_request::{ChatRequest, ErrorDetail};
pub use message::{Message, Role};
pub use session::{Session, SessionId, SessionIdentity, UNTITLED_SESSION};
