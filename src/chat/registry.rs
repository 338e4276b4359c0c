//! The list of known chat sessions.

use crate::backend::ChatBackend;
use crate::error::ChatError;
use crate::types::{Session, SessionId};

/// One entry of the session list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionEntry {
    /// The session.
    pub session: Session,
    /// Whether this entry is the selected one.
    pub active: bool,
}

/// In-memory list of sessions, refreshed from the backend.
///
/// The backend list call is authoritative: [`list`](SessionRegistry::list)
/// replaces whatever was shown before.  At most one entry is active.
#[derive(Debug, Default)]
pub struct SessionRegistry {
    entries: Vec<SessionEntry>,
}

impl SessionRegistry {
    /// Creates an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Fetch the session list and replace the displayed list with it.
    ///
    /// On failure the displayed list is left empty.
    pub async fn list<B: ChatBackend + ?Sized>(
        &mut self,
        backend: &B,
    ) -> Result<&[SessionEntry], ChatError> {
        match backend.list_sessions().await {
            Ok(sessions) => {
                self.entries = sessions
                    .into_iter()
                    .map(|session| SessionEntry {
                        session,
                        active: false,
                    })
                    .collect();
                Ok(&self.entries)
            }
            Err(err) => {
                self.entries.clear();
                Err(ChatError::List(err))
            }
        }
    }

    /// Insert a session, at the front or the back of the list.
    ///
    /// An entry already present with the same id is replaced.
    pub fn add(&mut self, session: Session, at_front: bool) {
        self.remove(&session.id);
        let entry = SessionEntry {
            session,
            active: false,
        };
        if at_front {
            self.entries.insert(0, entry);
        } else {
            self.entries.push(entry);
        }
    }

    /// Remove a session.  Returns the removed session, if it was present.
    pub fn remove(&mut self, id: &SessionId) -> Option<Session> {
        let position = self.position(id)?;
        Some(self.entries.remove(position).session)
    }

    /// Mark `id` as the only active entry.
    ///
    /// Every entry is deactivated first; returns false when `id` is not listed,
    /// leaving nothing active.
    pub fn select(&mut self, id: &SessionId) -> bool {
        self.deselect_all();
        match self.entries.iter_mut().find(|entry| &entry.session.id == id) {
            Some(entry) => {
                entry.active = true;
                true
            }
            None => false,
        }
    }

    /// Deactivate every entry.
    pub fn deselect_all(&mut self) {
        for entry in &mut self.entries {
            entry.active = false;
        }
    }

    /// The active session, if any.
    pub fn selected(&self) -> Option<&Session> {
        self.entries
            .iter()
            .find(|entry| entry.active)
            .map(|entry| &entry.session)
    }

    /// Look up a listed session.
    pub fn get(&self, id: &SessionId) -> Option<&Session> {
        self.position(id).map(|i| &self.entries[i].session)
    }

    /// The first listed session.
    pub fn first(&self) -> Option<&Session> {
        self.entries.first().map(|entry| &entry.session)
    }

    /// The session at `index` in display order.
    pub fn nth(&self, index: usize) -> Option<&Session> {
        self.entries.get(index).map(|entry| &entry.session)
    }

    /// All entries in display order.
    pub fn entries(&self) -> &[SessionEntry] {
        &self.entries
    }

    /// Number of listed sessions.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// True when no sessions are listed.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    fn position(&self, id: &SessionId) -> Option<usize> {
        self.entries.iter().position(|entry| &entry.session.id == id)
    }
}
