// Sandbox execution: idempotence guard, compose, full document replace

use std::fmt;

use sha2::{Digest, Sha256};

use playground_core::{ExternalLibrary, RunCommit, RunId, RunState, SourceTriple};

use crate::document::compose_sandbox_document;

/// The isolated execution context.
///
/// `replace_document` must discard the previous document entirely (no
/// incremental patching); whatever the old document had scheduled is
/// abandoned with it.
pub trait Sandbox {
    fn replace_document(&mut self, run: RunId, document: String) -> Result<(), SandboxError>;
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SandboxError {
    /// The sandbox host is gone (preview server stopped, page closed).
    Unavailable(String),
}

impl fmt::Display for SandboxError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SandboxError::Unavailable(msg) => write!(f, "sandbox unavailable: {}", msg),
        }
    }
}

impl std::error::Error for SandboxError {}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExecuteOutcome {
    /// The sandbox now runs this commit.
    Rebuilt { run: RunId },
    /// Content identical to the running document; nothing replaced.
    Skipped { run: RunId },
}

/// Identity of executable content: `sha256:<hex>` over the three sources
/// and the library URLs.
///
/// Each part is length-prefixed, so moving text from one buffer to another
/// still changes the digest.
pub fn content_digest(triple: &SourceTriple, libraries: &[ExternalLibrary]) -> String {
    let mut hasher = Sha256::new();
    for part in [&triple.markup, &triple.style, &triple.script] {
        hasher.update((part.len() as u64).to_le_bytes());
        hasher.update(part.as_bytes());
    }
    for library in libraries {
        hasher.update((library.url.len() as u64).to_le_bytes());
        hasher.update(library.url.as_bytes());
    }
    format!("sha256:{:x}", hasher.finalize())
}

#[derive(Debug, Default)]
pub struct ExecutionEngine {
    state: RunState,
    last_digest: Option<String>,
}

impl ExecutionEngine {
    pub fn new() -> Self {
        Self::default()
    }

    /// What the sandbox is currently running.
    pub fn state(&self) -> &RunState {
        &self.state
    }

    pub fn last_digest(&self) -> Option<&str> {
        self.last_digest.as_deref()
    }

    /// Whether executing `commit` would be skipped by the guard.
    pub fn is_current(&self, commit: &RunCommit) -> bool {
        !commit.forced && self.last_digest.as_deref() == Some(content_digest(&commit.triple, &commit.libraries).as_str())
    }

    /// Execute a commit. On error the previous state is kept, so the next
    /// commit of the same content is not mistaken for a no-op.
    pub fn execute(&mut self, commit: &RunCommit, sandbox: &mut dyn Sandbox) -> Result<ExecuteOutcome, SandboxError> {
        let digest = content_digest(&commit.triple, &commit.libraries);
        if !commit.forced && self.last_digest.as_deref() == Some(digest.as_str()) {
            log::debug!("Run {} skipped: content unchanged since {}", commit.run, self.state.run);
            return Ok(ExecuteOutcome::Skipped { run: self.state.run });
        }

        let document = compose_sandbox_document(commit.run, &commit.triple, &commit.libraries);
        sandbox.replace_document(commit.run, document)?;

        self.state = RunState::from_commit(commit);
        self.last_digest = Some(digest);
        Ok(ExecuteOutcome::Rebuilt { run: commit.run })
    }
}
