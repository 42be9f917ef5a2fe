//! Playground Relay Protocol: v1 Frozen Wire Format
//!
//! This crate defines the messages that cross the sandbox boundary and the
//! small JSON API the preview host page talks to.
//!
//! # Sandbox → host
//!
//! The console shim inside the sandboxed document posts
//! `{ "source": RELAY_SOURCE, "type": "log"|"warn"|"error", "message": [..], "run": N, "seq": N }`
//! to its parent window. Anything without the exact source tag is noise from
//! unrelated message traffic and is ignored. `run` is the run the document
//! was composed for and `seq` counts calls within that document, so the host
//! can attribute and order messages no matter how they travel. The host page
//! wraps each tagged message in a [`RelayEnvelope`].
//!
//! # Size limits
//!
//! The shim clips every argument to [`MAX_ARGUMENT_LEN`] characters and the
//! whole call to [`MAX_ARGUMENTS_LEN`]. On the host, a payload up to
//! [`MAX_PAYLOAD_SIZE`] is accepted and its arguments cut down to
//! [`MAX_MESSAGE_SIZE`] bytes. Every cut ends in [`TRUNCATED_MARKER`].
//!
//! # Protocol Version
//!
//! This is **protocol v1**. Changes require a bump of `PROTOCOL_VERSION`
//! and new golden vectors in `crates/protocol/golden/`.
//!
//! # Usage
//!
//! ```ignore
//! use playground_protocol::{decode_relay, RelayMessage, MessageKind};
//!
//! let msg = decode_relay(r#"{"source":"playground-console","type":"log","message":["hi"]}"#)?;
//! assert_eq!(msg.kind, MessageKind::Log);
//! ```

use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Current protocol version. Increment for breaking changes.
pub const PROTOCOL_VERSION: u32 = 1;

/// Constant tag identifying messages posted by the console shim.
pub const RELAY_SOURCE: &str = "playground-console";

/// Substituted for a console argument that cannot be serialized
/// (circular structures, throwing getters, ...).
pub const UNSERIALIZABLE_PLACEHOLDER: &str = "[Unserializable Object]";

/// Combined size of the arguments kept for one message, in bytes.
pub const MAX_MESSAGE_SIZE: usize = 64 * 1024;

/// Largest raw payload the host parses at all, in bytes.
pub const MAX_PAYLOAD_SIZE: usize = 1024 * 1024;

/// Shim-side clip for one serialized argument, in UTF-16 code units.
pub const MAX_ARGUMENT_LEN: usize = 8 * 1024;

/// Shim-side budget for all arguments of one call, in UTF-16 code units.
pub const MAX_ARGUMENTS_LEN: usize = 16 * 1024;

/// Appended wherever text was cut to fit a limit.
pub const TRUNCATED_MARKER: &str = " [truncated]";

// =============================================================================
// Sandbox → Host
// =============================================================================

/// Console channel a message was emitted on. `console.info` maps to `log`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MessageKind {
    Log,
    Warn,
    Error,
}

/// One console call relayed out of the sandbox.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RelayMessage {
    pub source: String,
    #[serde(rename = "type")]
    pub kind: MessageKind,
    pub message: Vec<String>,
    /// Run the posting document was composed for.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub run: Option<u64>,
    /// Position of the call within its document, starting at 1.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub seq: Option<u64>,
}

impl RelayMessage {
    /// Build a correctly tagged message.
    pub fn new(kind: MessageKind, message: Vec<String>) -> Self {
        Self {
            source: RELAY_SOURCE.to_string(),
            kind,
            message,
            run: None,
            seq: None,
        }
    }

    /// Build a message from typed console arguments.
    pub fn from_args(kind: MessageKind, args: &[ConsoleArg]) -> Self {
        Self::new(kind, render_args(args))
    }

    /// Stamp the run and call position, as the shim does.
    pub fn sequenced(mut self, run: u64, seq: u64) -> Self {
        self.run = Some(run);
        self.seq = Some(seq);
        self
    }

    /// Combined byte length of the arguments.
    pub fn text_len(&self) -> usize {
        self.message.iter().map(String::len).sum()
    }

    /// Cut the arguments down to `limit` bytes in total.
    ///
    /// The argument that crosses the limit is shortened at a character
    /// boundary and ends in [`TRUNCATED_MARKER`]; arguments after it are
    /// dropped. A message within the limit is returned unchanged.
    pub fn truncated(mut self, limit: usize) -> Self {
        if self.text_len() <= limit {
            return self;
        }
        let mut budget = limit;
        let mut kept = Vec::with_capacity(self.message.len());
        for part in self.message {
            if part.len() <= budget {
                budget -= part.len();
                kept.push(part);
                continue;
            }
            let mut cut = budget;
            while !part.is_char_boundary(cut) {
                cut -= 1;
            }
            let mut clipped = part[..cut].to_string();
            clipped.push_str(TRUNCATED_MARKER);
            kept.push(clipped);
            break;
        }
        self.message = kept;
        self
    }
}

/// A console argument, serialized for display.
///
/// Mirrors what the shim does on the sandbox side: primitives are
/// stringified directly, structured values are JSON-encoded, and a value that
/// cannot be encoded becomes [`UNSERIALIZABLE_PLACEHOLDER`].
#[derive(Debug, Clone, PartialEq)]
pub enum ConsoleArg {
    Text(String),
    Structured(Value),
    Unserializable,
}

impl ConsoleArg {
    /// Classify a JSON value the way the shim would print it.
    pub fn from_value(value: Value) -> Self {
        match value {
            Value::String(s) => ConsoleArg::Text(s),
            Value::Null => ConsoleArg::Text("null".to_string()),
            Value::Bool(b) => ConsoleArg::Text(b.to_string()),
            Value::Number(n) => ConsoleArg::Text(n.to_string()),
            structured @ (Value::Array(_) | Value::Object(_)) => ConsoleArg::Structured(structured),
        }
    }

    pub fn render(&self) -> String {
        match self {
            ConsoleArg::Text(s) => s.clone(),
            ConsoleArg::Structured(v) => {
                serde_json::to_string(v).unwrap_or_else(|_| UNSERIALIZABLE_PLACEHOLDER.to_string())
            }
            ConsoleArg::Unserializable => UNSERIALIZABLE_PLACEHOLDER.to_string(),
        }
    }
}

/// Render every argument to its display string, preserving order.
pub fn render_args(args: &[ConsoleArg]) -> Vec<String> {
    args.iter().map(ConsoleArg::render).collect()
}

/// Why an incoming payload was not accepted as a relay message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RelayRejection {
    /// Raw payload exceeds `MAX_PAYLOAD_SIZE`.
    TooLarge { size: usize },
    /// Not valid JSON.
    Malformed(String),
    /// Missing or different `source` tag. Expected for unrelated traffic.
    ForeignSource(Option<String>),
    /// Tagged, but `type` or `message` has the wrong shape.
    InvalidShape(String),
}

impl RelayRejection {
    /// Foreign traffic is dropped silently; everything else is worth a debug line.
    pub fn is_noise(&self) -> bool {
        matches!(self, RelayRejection::ForeignSource(_))
    }
}

impl fmt::Display for RelayRejection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::TooLarge { size } => {
                write!(f, "relay payload too large ({size} bytes, limit {MAX_PAYLOAD_SIZE})")
            }
            Self::Malformed(msg) => write!(f, "malformed relay payload: {msg}"),
            Self::ForeignSource(Some(source)) => write!(f, "ignored message from source '{source}'"),
            Self::ForeignSource(None) => write!(f, "ignored untagged message"),
            Self::InvalidShape(msg) => write!(f, "invalid relay message: {msg}"),
        }
    }
}

impl std::error::Error for RelayRejection {}

/// Parse and validate a raw relay payload.
pub fn decode_relay(raw: &str) -> Result<RelayMessage, RelayRejection> {
    if raw.len() > MAX_PAYLOAD_SIZE {
        return Err(RelayRejection::TooLarge { size: raw.len() });
    }
    let value: Value = serde_json::from_str(raw).map_err(|e| RelayRejection::Malformed(e.to_string()))?;
    validate_relay(value)
}

/// Validate an already-parsed payload. The tag check runs first so that
/// foreign messages never produce shape errors. Oversized arguments are
/// truncated to [`MAX_MESSAGE_SIZE`], never rejected.
pub fn validate_relay(value: Value) -> Result<RelayMessage, RelayRejection> {
    let source = match value.get("source") {
        Some(Value::String(s)) => Some(s.as_str()),
        _ => None,
    };
    if source != Some(RELAY_SOURCE) {
        return Err(RelayRejection::ForeignSource(source.map(str::to_string)));
    }
    let message: RelayMessage =
        serde_json::from_value(value).map_err(|e| RelayRejection::InvalidShape(e.to_string()))?;
    Ok(message.truncated(MAX_MESSAGE_SIZE))
}

// =============================================================================
// Host page ↔ preview server
// =============================================================================

/// A sandbox message forwarded by the host page. `run` is the run the page
/// had rendered when the message arrived; the payload's own `run` wins
/// when present.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RelayEnvelope {
    pub run: u64,
    pub payload: Value,
}

/// Latest sandbox document (`GET /state`). Run 0 means nothing rendered yet.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PreviewState {
    pub run: u64,
    pub document: String,
}

/// One grouped console row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConsoleRow {
    #[serde(rename = "type")]
    pub kind: MessageKind,
    pub message: Vec<String>,
    pub timestamp: String,
    pub count: usize,
}

/// Preset button state.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PresetView {
    pub name: String,
    pub added: bool,
}

/// Position of the visible console window.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConsoleView {
    /// e.g. `"101-300 of 500"`; absent when every group fits
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub info: Option<String>,
    pub can_page_up: bool,
    pub can_page_down: bool,
    /// Following new output
    pub pinned: bool,
}

/// Console and control state (`GET /console`).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConsoleSnapshot {
    pub run: u64,
    pub auto_run: bool,
    pub rows: Vec<ConsoleRow>,
    #[serde(default)]
    pub view: ConsoleView,
    pub errors: usize,
    pub warnings: usize,
    #[serde(default)]
    pub libraries: Vec<String>,
    #[serde(default)]
    pub presets: Vec<PresetView>,
}

/// Commands issued by the host page (`POST /command`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "command", rename_all = "snake_case")]
pub enum HostCommand {
    Run,
    Clear,
    SetAutoRun { enabled: bool },
    Save { name: String },
    Load { name: String },
    Delete { name: String },
    ApplyTemplate { name: String },
    AddLibrary { url: String },
    AddPreset { name: String },
    RemoveLibrary { index: usize },
    /// A key combination pressed in the host page, e.g. `"ctrl+enter"`.
    Key { combo: String },
    /// The page closed its save or open dialog.
    CloseDialog,
    ConsolePageUp,
    ConsolePageDown,
    ConsoleToStart,
    ConsoleToEnd,
}

/// Reply to a `HostCommand`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommandReply {
    pub ok: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    /// Dialog the page should open (`"save"` or `"open"`).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub dialog: Option<String>,
}

impl CommandReply {
    pub fn ok() -> Self {
        Self {
            ok: true,
            error: None,
            dialog: None,
        }
    }

    pub fn error(msg: impl Into<String>) -> Self {
        Self {
            ok: false,
            error: Some(msg.into()),
            dialog: None,
        }
    }

    pub fn open_dialog(dialog: impl Into<String>) -> Self {
        Self {
            ok: true,
            error: None,
            dialog: Some(dialog.into()),
        }
    }
}

/// Known project names (`GET /projects`).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProjectList {
    pub projects: Vec<String>,
    pub templates: Vec<String>,
}
