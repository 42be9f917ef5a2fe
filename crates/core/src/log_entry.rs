use serde::{Deserialize, Serialize};

use crate::run::RunId;

/// Severity of a console record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogKind {
    Log,
    Warn,
    Error,
}

impl LogKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            LogKind::Log => "log",
            LogKind::Warn => "warn",
            LogKind::Error => "error",
        }
    }
}

/// One intercepted console call or uncaught sandbox error.
///
/// Produced only by the relay bridge; never persisted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LogEntry {
    #[serde(rename = "type")]
    pub kind: LogKind,
    pub message: Vec<String>,
    /// Wall-clock time captured on the host when the record arrived.
    pub timestamp: String,
    /// Run the record was produced under.
    pub run: RunId,
}

impl LogEntry {
    pub fn new(kind: LogKind, message: Vec<String>, timestamp: impl Into<String>, run: RunId) -> Self {
        Self {
            kind,
            message,
            timestamp: timestamp.into(),
            run,
        }
    }

    /// Message parts joined with single spaces, as a console prints them.
    pub fn text(&self) -> String {
        self.message.join(" ")
    }

    /// Whether two entries collapse into one console row.
    pub fn groups_with(&self, other: &LogEntry) -> bool {
        self.kind == other.kind && self.timestamp == other.timestamp && self.message == other.message
    }
}
