use std::fmt;

use serde::{Deserialize, Serialize};

use crate::library::ExternalLibrary;
use crate::source::SourceTriple;

/// Monotonic run sequence id. A new id invalidates every log entry of the
/// previous run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RunId(pub u64);

impl RunId {
    pub fn next(self) -> RunId {
        RunId(self.0 + 1)
    }
}

impl fmt::Display for RunId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Immutable snapshot handed from the scheduler to the execution engine.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunCommit {
    pub run: RunId,
    pub triple: SourceTriple,
    pub libraries: Vec<ExternalLibrary>,
    /// Explicit user request; bypasses the engine's idempotence guard.
    pub forced: bool,
}

/// What is currently executing.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunState {
    pub committed: SourceTriple,
    pub libraries: Vec<ExternalLibrary>,
    pub run: RunId,
}

impl RunState {
    pub fn from_commit(commit: &RunCommit) -> Self {
        Self {
            committed: commit.triple.clone(),
            libraries: commit.libraries.clone(),
            run: commit.run,
        }
    }
}
