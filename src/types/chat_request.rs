use serde::{Deserialize, Serialize};

use crate::types::SessionId;

/// Body of the send-message request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatRequest {
    /// The trimmed user prompt.
    pub prompt: String,

    /// Session to continue, or `None` to have the backend open a new one.
    #[serde(rename = "chatId")]
    pub chat_id: Option<SessionId>,
}

impl ChatRequest {
    /// Create a new request.
    pub fn new(prompt: impl Into<String>, chat_id: Option<SessionId>) -> Self {
        Self {
            prompt: prompt.into(),
            chat_id,
        }
    }
}

/// Error body the backend sends with non-success responses.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorDetail {
    /// Human-readable reason.
    #[serde(default)]
    pub detail: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn draft_request_sends_null_chat_id() {
        let json = serde_json::to_value(ChatRequest::new("hello", None)).unwrap();
        assert_eq!(json, serde_json::json!({"prompt": "hello", "chatId": null}));
    }

    #[test]
    fn existing_session_request_sends_id() {
        let request = ChatRequest::new("again", Some(SessionId::new("abc")));
        let json = serde_json::to_value(request).unwrap();
        assert_eq!(json, serde_json::json!({"prompt": "again", "chatId": "abc"}));
    }

    #[test]
    fn error_detail_tolerates_missing_field() {
        let detail: ErrorDetail = serde_json::from_str("{}").unwrap();
        assert!(detail.detail.is_none());
        let detail: ErrorDetail = serde_json::from_str(r#"{"detail":"rate limited"}"#).unwrap();
        assert_eq!(detail.detail.as_deref(), Some("rate limited"));
    }
}
