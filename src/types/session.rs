use std::fmt;

use serde::{Deserialize, Serialize};

/// Title shown for sessions the backend stored without one.
pub const UNTITLED_SESSION: &str = "Untitled chat";

/// Opaque identifier the backend assigns to a session.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SessionId(String);

impl SessionId {
    /// Wrap a backend-assigned identifier.
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// The identifier as the backend spelled it.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for SessionId {
    fn from(id: &str) -> Self {
        Self::new(id)
    }
}

impl From<String> for SessionId {
    fn from(id: String) -> Self {
        Self(id)
    }
}

/// A session known to the backend, as returned by the list call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Session {
    /// Backend-assigned identifier.
    pub id: SessionId,

    /// Title derived by the backend from the first prompt.
    #[serde(default)]
    pub title: String,

    /// Creation time exactly as the backend reported it.
    #[serde(rename = "createdAt", default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<String>,
}

impl Session {
    /// Create a session entry from an id and title.
    pub fn new(id: impl Into<SessionId>, title: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            title: title.into(),
            created_at: None,
        }
    }

    /// The title to show, falling back to a fixed label for untitled sessions.
    pub fn display_title(&self) -> &str {
        if self.title.trim().is_empty() {
            UNTITLED_SESSION
        } else {
            &self.title
        }
    }
}

impl From<SessionIdentity> for Session {
    fn from(identity: SessionIdentity) -> Self {
        Self::new(identity.id, identity.title)
    }
}

/// Identity the backend hands out when it promotes a draft session.
///
/// Delivered through the `X-Chat-Id` and `X-Chat-Title` response headers of
/// the first send on a draft.  Only a response carrying both yields one.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionIdentity {
    /// Newly assigned identifier.
    pub id: SessionId,
    /// Title chosen by the backend.
    pub title: String,
}

impl SessionIdentity {
    /// Build an identity from the two header values, if both are present and non-empty.
    pub fn from_headers(id: Option<&str>, title: Option<&str>) -> Option<Self> {
        let id = id.map(str::trim).filter(|s| !s.is_empty())?;
        let title = title.map(str::trim).filter(|s| !s.is_empty())?;
        Some(Self {
            id: SessionId::new(id),
            title: title.to_string(),
        })
    }
}
