use serde::{Deserialize, Serialize};

/// Who wrote a message.
///
/// The backend stores `"human"` for user turns; any other role it reports is
/// treated as the assistant.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum Role {
    /// User role.
    User,

    /// Assistant role.
    Assistant,
}

impl Role {
    /// Map a backend role string onto a display role.
    pub fn from_backend(role: &str) -> Self {
        if role == "human" {
            Role::User
        } else {
            Role::Assistant
        }
    }

    /// The role string the backend uses.
    pub fn as_backend(&self) -> &'static str {
        match self {
            Role::User => "human",
            Role::Assistant => "ai",
        }
    }
}

impl From<String> for Role {
    fn from(role: String) -> Self {
        Role::from_backend(&role)
    }
}

impl From<Role> for String {
    fn from(role: Role) -> Self {
        role.as_backend().to_string()
    }
}

/// A committed message in a session's history.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    /// The role of the author.
    pub role: Role,

    /// The message text.
    #[serde(default)]
    pub content: String,
}

impl Message {
    /// Create a new message.
    pub fn new(role: Role, content: impl Into<String>) -> Self {
        Self {
            role,
            content: content.into(),
        }
    }

    /// Create a user message.
    pub fn user(content: impl Into<String>) -> Self {
        Self::new(Role::User, content)
    }

    /// Create an assistant message.
    pub fn assistant(content: impl Into<String>) -> Self {
        Self::new(Role::Assistant, content)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn history_roles_map_human_to_user() {
        let json = serde_json::json!([
            {"role": "human", "content": "hi"},
            {"role": "ai", "content": "hello"},
            {"role": "system", "content": "odd"}
        ]);
        let messages: Vec<Message> = serde_json::from_value(json).unwrap();
        assert_eq!(
            messages,
            vec![
                Message::user("hi"),
                Message::assistant("hello"),
                Message::assistant("odd"),
            ]
        );
    }

    #[test]
    fn roles_serialize_with_backend_names() {
        let json = serde_json::to_value(Message::user("hi")).unwrap();
        assert_eq!(json, serde_json::json!({"role": "human", "content": "hi"}));
    }
}
