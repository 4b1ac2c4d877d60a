//! Recorded session events.
//!
//! A session log is an ordered list of [`SessionEvent`]s. The payload is the
//! closed sum type [`EventKind`], tagged by `"type"` on the wire. Each variant
//! knows how to flatten itself to plain text for keyword scanning
//! ([`EventKind::flatten_text`]) and how to render a one-line summary for
//! prompt context ([`EventKind::summary_line`]).
//!
//! Recorder event types outside the closed set deserialize as
//! [`EventKind::Other`] with the raw payload kept, so one unfamiliar entry
//! never rejects a whole session.

use chrono::{DateTime, Utc};
use serde::de::{self, Deserializer};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::text::truncate;

/// Default character limit for text inside a summary line.
pub const SUMMARY_LINE_MAX_CHARS: usize = 320;

// ─────────────────────────────────────────────────────────────────────────────
// Message content
// ─────────────────────────────────────────────────────────────────────────────

/// One part of a multi-part message body.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct ContentPart {
    /// Text of the part. Non-text parts (images, files) carry none.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
}

/// Message body: either a plain string or a list of parts.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum MessageContent {
    /// Plain text.
    Text(String),
    /// Multi-part content.
    Parts(Vec<ContentPart>),
}

impl MessageContent {
    /// Text parts joined with newlines.
    #[must_use]
    pub fn to_text(&self) -> String {
        match self {
            Self::Text(text) => text.clone(),
            Self::Parts(parts) => parts
                .iter()
                .filter_map(|p| p.text.as_deref())
                .filter(|t| !t.is_empty())
                .collect::<Vec<_>>()
                .join("\n"),
        }
    }
}

impl Default for MessageContent {
    fn default() -> Self {
        Self::Text(String::new())
    }
}

impl From<&str> for MessageContent {
    fn from(text: &str) -> Self {
        Self::Text(text.to_owned())
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Event kinds
// ─────────────────────────────────────────────────────────────────────────────

/// Payload of a session event.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all_fields = "camelCase")]
pub enum EventKind {
    /// A chat message from the user, the model or the system.
    Message {
        /// Speaker role.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        role: Option<String>,
        /// Message body.
        #[serde(default)]
        content: MessageContent,
    },
    /// A shell command run by the agent.
    LocalShellCall {
        /// Command line.
        command: String,
        /// Captured standard output.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        stdout: Option<String>,
        /// Captured standard error.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        stderr: Option<String>,
        /// Process exit code.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        exit_code: Option<i32>,
        /// Working directory.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        cwd: Option<String>,
    },
    /// A function/tool call with JSON arguments.
    FunctionCall {
        /// Function name.
        name: String,
        /// Arguments as sent by the model.
        #[serde(default)]
        args: Value,
        /// Function result.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        output: Option<Value>,
        /// Wall-clock duration.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        duration_ms: Option<u64>,
    },
    /// A reasoning / thinking step.
    Reasoning {
        /// Reasoning text.
        #[serde(default)]
        content: MessageContent,
    },
    /// A hosted web search.
    WebSearchCall {
        /// Tool name, when reported.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        name: Option<String>,
        /// Query arguments.
        #[serde(default)]
        args: Value,
        /// Search result payload.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        output: Option<Value>,
    },
    /// A custom (non-function) tool call.
    CustomToolCall {
        /// Tool name.
        name: String,
        /// Tool input.
        #[serde(default)]
        args: Value,
        /// Tool result.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        output: Option<Value>,
    },
    /// A file written or patched by the agent.
    FileChange {
        /// Path of the changed file.
        path: String,
        /// Unified diff, when recorded.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        diff: Option<String>,
    },
    /// Anything the recorder could not classify.
    Other {
        /// Raw payload.
        #[serde(default)]
        data: Value,
    },
}

impl EventKind {
    /// Every wire tag with a dedicated variant.
    pub const TYPE_NAMES: &'static [&'static str] = &[
        "Message",
        "LocalShellCall",
        "FunctionCall",
        "Reasoning",
        "WebSearchCall",
        "CustomToolCall",
        "FileChange",
        "Other",
    ];

    /// Wire name of the variant.
    #[must_use]
    pub fn type_name(&self) -> &'static str {
        match self {
            Self::Message { .. } => "Message",
            Self::LocalShellCall { .. } => "LocalShellCall",
            Self::FunctionCall { .. } => "FunctionCall",
            Self::Reasoning { .. } => "Reasoning",
            Self::WebSearchCall { .. } => "WebSearchCall",
            Self::CustomToolCall { .. } => "CustomToolCall",
            Self::FileChange { .. } => "FileChange",
            Self::Other { .. } => "Other",
        }
    }

    /// Plain-text rendering used for keyword scanning (not lowercased).
    #[must_use]
    pub fn flatten_text(&self) -> String {
        match self {
            Self::Message { content, .. } | Self::Reasoning { content } => content.to_text(),
            Self::LocalShellCall {
                command,
                stdout,
                stderr,
                ..
            } => join_non_empty([Some(command.as_str()), stdout.as_deref(), stderr.as_deref()]),
            Self::FunctionCall { name, args, .. } | Self::CustomToolCall { name, args, .. } => {
                join_non_empty([Some(name.as_str()), Some(value_text(args).as_str())])
            }
            Self::WebSearchCall { name, args, .. } => {
                join_non_empty([name.as_deref(), Some(value_text(args).as_str())])
            }
            Self::FileChange { path, diff } => join_non_empty([Some(path.as_str()), diff.as_deref()]),
            Self::Other { data } => value_text(data),
        }
    }

    /// One-line summary for prompt context, e.g. `- [shell] cargo test`.
    #[must_use]
    pub fn summary_line(&self, max_chars: usize) -> String {
        match self {
            Self::Message { role, content } => format!(
                "- [{}] {}",
                role.as_deref().unwrap_or("message"),
                truncate(&content.to_text(), max_chars)
            ),
            Self::LocalShellCall { command, .. } => format!("- [shell] {command}"),
            Self::FunctionCall {
                name, duration_ms, ..
            } => {
                let duration = duration_ms.map_or_else(|| "n/a".to_owned(), |ms| ms.to_string());
                format!("- [fn:{name}] duration {duration}ms")
            }
            Self::Reasoning { content } => {
                format!("- [reasoning] {}", truncate(&content.to_text(), max_chars))
            }
            other => format!("- [{}] event captured", other.type_name()),
        }
    }

    /// Speaker role (messages) or tool name (calls), when present.
    #[must_use]
    pub fn actor(&self) -> Option<&str> {
        match self {
            Self::Message { role, .. } | Self::WebSearchCall { name: role, .. } => role.as_deref(),
            Self::FunctionCall { name, .. } | Self::CustomToolCall { name, .. } => Some(name),
            _ => None,
        }
    }
}

fn join_non_empty<'a>(parts: impl IntoIterator<Item = Option<&'a str>>) -> String {
    parts
        .into_iter()
        .flatten()
        .filter(|p| !p.is_empty())
        .collect::<Vec<_>>()
        .join("\n")
}

fn value_text(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// SessionEvent
// ─────────────────────────────────────────────────────────────────────────────

/// One entry of a recorded session log.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct SessionEvent {
    /// Recorder sequence number, kept as recorded. Evidence, event ranges and
    /// `#N` references count positions in the log instead.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub index: Option<usize>,
    /// Recorder-assigned ID.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    /// When the event happened.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub at: Option<DateTime<Utc>>,
    /// Event payload.
    #[serde(flatten)]
    pub kind: EventKind,
}

impl SessionEvent {
    /// Wrap a payload with no index, ID or timestamp.
    #[must_use]
    pub fn new(kind: EventKind) -> Self {
        Self {
            index: None,
            id: None,
            at: None,
            kind,
        }
    }

    /// Shorthand for a message event.
    #[must_use]
    pub fn message(role: &str, content: &str) -> Self {
        Self::new(EventKind::Message {
            role: Some(role.to_owned()),
            content: content.into(),
        })
    }

    /// Shorthand for a shell call event.
    #[must_use]
    pub fn shell(command: &str) -> Self {
        Self::new(EventKind::LocalShellCall {
            command: command.to_owned(),
            stdout: None,
            stderr: None,
            exit_code: None,
            cwd: None,
        })
    }

    /// Set the timestamp.
    #[must_use]
    pub fn at(mut self, at: DateTime<Utc>) -> Self {
        self.at = Some(at);
        self
    }

    /// Set the recorder ID.
    #[must_use]
    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = Some(id.into());
        self
    }
}

impl<'de> Deserialize<'de> for SessionEvent {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        #[derive(Deserialize)]
        struct Envelope {
            #[serde(default)]
            index: Option<usize>,
            #[serde(default)]
            id: Option<String>,
            #[serde(default)]
            at: Option<DateTime<Utc>>,
            #[serde(flatten)]
            payload: Map<String, Value>,
        }

        let Envelope {
            index,
            id,
            at,
            payload,
        } = Envelope::deserialize(deserializer)?;
        let known = payload
            .get("type")
            .and_then(Value::as_str)
            .is_some_and(|tag| EventKind::TYPE_NAMES.contains(&tag));
        let kind = if known {
            EventKind::deserialize(Value::Object(payload)).map_err(de::Error::custom)?
        } else {
            EventKind::Other {
                data: Value::Object(payload),
            }
        };
        Ok(Self {
            index,
            id,
            at,
            kind,
        })
    }
}
