//! `playground-core` - data model for the live HTML/CSS/JS playground.
//!
//! Pure types with no IO: the three source buffers and their committed
//! snapshots, named projects, built-in templates, the external library list,
//! console log entries and run bookkeeping.

pub mod library;
pub mod log_entry;
pub mod project;
pub mod run;
pub mod source;
pub mod template;

pub use library::{ExternalLibrary, ExternalLibraryList, LibraryError, LibraryKind, LibraryPreset, PRESETS};
pub use log_entry::{LogEntry, LogKind};
pub use project::{validate_project_name, Project, ProjectError, ProjectRecord};
pub use run::{RunCommit, RunId, RunState};
pub use source::{SourceBuffers, SourceKind, SourceTriple};
pub use template::{Template, TEMPLATES};
