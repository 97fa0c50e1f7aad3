//! # Chat Session Management
//!
//! Manages the lifecycle of conversation sessions. Each session owns one
//! append-only ordered message log that both the text chat and the live voice
//! bridge write into. Restarting a session clears the log; the learner profile
//! lives elsewhere and is never touched by session operations.

use crate::chat::message::ChatMessage;
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::sync::{Arc, RwLock};
use uuid::Uuid;

/// One conversation session with an ordered message log.
///
/// ## Thread Safety:
/// The log sits behind an RwLock so the HTTP handlers and the live voice
/// actor can append concurrently without clobbering each other.
pub struct ChatSession {
    /// Unique identifier for this session
    pub session_id: String,

    /// Append-only ordered message log
    messages: Arc<RwLock<Vec<ChatMessage>>>,

    /// When the session was created
    pub created_at: DateTime<Utc>,
}

impl ChatSession {
    pub fn new(session_id: String) -> Self {
        Self {
            session_id,
            messages: Arc::new(RwLock::new(Vec::new())),
            created_at: Utc::now(),
        }
    }

    /// Append a message to the log.
    ///
    /// Message ids must be unique within the session; a duplicate id is
    /// rejected rather than silently double-logged.
    pub fn append(&self, message: ChatMessage) -> Result<(), String> {
        let mut messages = self.messages.write().unwrap();

        if messages.iter().any(|m| m.id == message.id) {
            return Err(format!(
                "Duplicate message id '{}' in session '{}'",
                message.id, self.session_id
            ));
        }

        messages.push(message);
        Ok(())
    }

    /// Snapshot of the ordered log.
    pub fn history(&self) -> Vec<ChatMessage> {
        self.messages.read().unwrap().clone()
    }

    pub fn len(&self) -> usize {
        self.messages.read().unwrap().len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.read().unwrap().is_empty()
    }

    /// Clear the message log for a fresh session run.
    pub fn restart(&self) {
        self.messages.write().unwrap().clear();
    }
}

/// Manages the set of active conversation sessions.
pub struct ChatSessionManager {
    /// Active sessions mapped by session id
    sessions: Arc<RwLock<HashMap<String, Arc<ChatSession>>>>,

    /// Maximum number of concurrent sessions allowed
    max_sessions: usize,
}

impl ChatSessionManager {
    pub fn new(max_sessions: usize) -> Self {
        Self {
            sessions: Arc::new(RwLock::new(HashMap::new())),
            max_sessions,
        }
    }

    /// Create a new session, generating an id unless one is supplied.
    pub fn create_session(&self, session_id: Option<String>) -> Result<Arc<ChatSession>, String> {
        let mut sessions = self.sessions.write().unwrap();

        if sessions.len() >= self.max_sessions {
            return Err(format!(
                "Maximum concurrent sessions ({}) reached",
                self.max_sessions
            ));
        }

        let session_id = session_id.unwrap_or_else(|| Uuid::new_v4().to_string());
        if sessions.contains_key(&session_id) {
            return Err(format!("Session id '{}' already exists", session_id));
        }

        let session = Arc::new(ChatSession::new(session_id.clone()));
        sessions.insert(session_id, session.clone());
        Ok(session)
    }

    pub fn get_session(&self, session_id: &str) -> Option<Arc<ChatSession>> {
        self.sessions.read().unwrap().get(session_id).cloned()
    }

    pub fn remove_session(&self, session_id: &str) -> bool {
        self.sessions.write().unwrap().remove(session_id).is_some()
    }

    pub fn active_session_count(&self) -> usize {
        self.sessions.read().unwrap().len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_append_preserves_order() {
        let session = ChatSession::new("s1".to_string());
        session.append(ChatMessage::user("one")).unwrap();
        session.append(ChatMessage::model("two", None)).unwrap();
        session.append(ChatMessage::user("three")).unwrap();

        let history = session.history();
        let texts: Vec<&str> = history.iter().map(|m| m.text.as_str()).collect();
        assert_eq!(texts, vec!["one", "two", "three"]);
    }

    #[test]
    fn test_duplicate_id_rejected() {
        let session = ChatSession::new("s1".to_string());
        let msg = ChatMessage::user("hello");
        let dup = msg.clone();
        session.append(msg).unwrap();
        assert!(session.append(dup).is_err());
        assert_eq!(session.len(), 1);
    }

    #[test]
    fn test_restart_clears_log() {
        let session = ChatSession::new("s1".to_string());
        session.append(ChatMessage::user("hello")).unwrap();
        assert!(!session.is_empty());

        session.restart();
        assert!(session.is_empty());

        // The session stays usable after a restart.
        session.append(ChatMessage::user("again")).unwrap();
        assert_eq!(session.len(), 1);
    }

    #[test]
    fn test_manager_create_and_get() {
        let manager = ChatSessionManager::new(4);
        let session = manager.create_session(None).unwrap();
        assert!(manager.get_session(&session.session_id).is_some());
        assert_eq!(manager.active_session_count(), 1);

        assert!(manager.remove_session(&session.session_id));
        assert!(manager.get_session(&session.session_id).is_none());
    }

    #[test]
    fn test_manager_session_cap_and_duplicates() {
        let manager = ChatSessionManager::new(1);
        let first = manager.create_session(Some("s1".to_string())).unwrap();
        assert_eq!(first.session_id, "s1");
        assert!(manager.create_session(None).is_err());

        manager.remove_session("s1");
        manager.create_session(Some("s2".to_string())).unwrap();
        assert!(manager.create_session(Some("s2".to_string())).is_err());
    }
}
