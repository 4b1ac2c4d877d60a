//! Session snapshot and coaching chat types.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::events::SessionEvent;
use crate::ids::{ChatMessageId, SessionId};

/// Repository the session ran against.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GitInfo {
    /// Repository URL or name.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub repo: Option<String>,
    /// Checked-out branch.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub branch: Option<String>,
}

/// Session header recorded before the first event.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionMeta {
    /// Session start time as recorded (free-form).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<String>,
    /// Repository information.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub git: Option<GitInfo>,
    /// Free-text instructions the agent was started with.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub instructions: Option<String>,
}

/// A recorded session: header plus ordered event log.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionSnapshot {
    /// Session ID.
    pub session_id: SessionId,
    /// Header, when recorded.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub meta: Option<SessionMeta>,
    /// Ordered event log.
    #[serde(default)]
    pub events: Vec<SessionEvent>,
}

impl SessionSnapshot {
    /// Snapshot with no header.
    #[must_use]
    pub fn new(session_id: impl Into<SessionId>, events: Vec<SessionEvent>) -> Self {
        Self {
            session_id: session_id.into(),
            meta: None,
            events,
        }
    }
}

/// Speaker of a coaching chat message.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChatRole {
    /// System instructions.
    System,
    /// The human reviewer.
    User,
    /// The coaching model.
    Assistant,
}

impl ChatRole {
    /// Lowercase wire name.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::System => "system",
            Self::User => "user",
            Self::Assistant => "assistant",
        }
    }
}

impl std::fmt::Display for ChatRole {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One message of the coaching chat about a session.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatMessage {
    /// Message ID.
    #[serde(default)]
    pub id: ChatMessageId,
    /// Speaker.
    pub role: ChatRole,
    /// Message text.
    pub content: String,
    /// Creation time.
    #[serde(default = "Utc::now")]
    pub created_at: DateTime<Utc>,
}

impl ChatMessage {
    /// New message stamped now.
    #[must_use]
    pub fn new(role: ChatRole, content: impl Into<String>) -> Self {
        Self {
            id: ChatMessageId::new(),
            role,
            content: content.into(),
            created_at: Utc::now(),
        }
    }
}
