//! `playground-engine` - everything between the source buffers and the
//! sandboxed preview.
//!
//! - [`scheduler`]: debounce/autosave timers and run commits
//! - [`document`]: composes the sandbox document and the export artifact
//! - [`engine`]: idempotent execution against a [`Sandbox`]
//! - [`relay`]: host side of the console relay
//! - [`console`]: grouped console panel state
//! - [`playground`]: the host controller wiring them together

pub mod console;
pub mod document;
pub mod engine;
pub mod playground;
pub mod relay;
pub mod scheduler;
pub mod shim;

pub use console::{ConsoleGroup, ConsolePanel};
pub use document::{compose_export_document, compose_sandbox_document, EXPORT_FILE_NAME};
pub use engine::{content_digest, ExecuteOutcome, ExecutionEngine, Sandbox, SandboxError};
pub use playground::{Dialog, Playground, TickReport};
pub use relay::{relay_channel, relay_channel_with_clock, Clock, FixedClock, RelayReceiver, RelaySender, SystemClock};
pub use scheduler::{RunScheduler, SchedulerAction};
pub use shim::console_shim;
