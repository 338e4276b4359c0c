//! Logging trait for backend operations.
//!
//! This module provides the [`ClientLogger`] trait that allows users to capture
//! and log all interactions passing through the [`ChatClient`](crate::ChatClient).

use crate::types::SessionIdentity;

/// A trait for logging backend operations.
///
/// Implement this trait to record every request the client issues together
/// with what came back, including each chunk of a streamed reply.
///
/// # Example
///
/// ```rust,ignore
/// use chatterbox::{ClientLogger, SessionIdentity};
/// use std::io::Write;
/// use std::sync::Mutex;
///
/// struct FileLogger {
///     file: Mutex<std::fs::File>,
/// }
///
/// impl ClientLogger for FileLogger {
///     fn log_request(&self, method: &str, url: &str) {
///         let mut file = self.file.lock().unwrap();
///         writeln!(file, "-> {method} {url}").unwrap();
///     }
///
///     fn log_status(&self, method: &str, url: &str, status: u16) {
///         let mut file = self.file.lock().unwrap();
///         writeln!(file, "<- {status} {method} {url}").unwrap();
///     }
/// }
/// ```
pub trait ClientLogger: Send + Sync {
    /// Log a request about to be sent.
    fn log_request(&self, method: &str, url: &str);

    /// Log the status line of a response.
    fn log_status(&self, method: &str, url: &str, status: u16);

    /// Log an identity the backend assigned to a draft session.
    fn log_identity(&self, identity: &SessionIdentity) {
        _ = identity;
    }

    /// Log one chunk of a streamed reply, as received.
    fn log_stream_chunk(&self, chunk: &[u8]) {
        _ = chunk;
    }

    /// Log the end of a streamed reply and the number of bytes it carried.
    fn log_stream_end(&self, total_bytes: u64) {
        _ = total_bytes;
    }
}
