//! CLI Exit Code Registry
//!
//! This is the single source of truth for all CLI exit codes.
//! Exit codes are part of the shell contract; scripts rely on them.
//!
//! # Exit Code Ranges
//!
//! | Range   | Domain           | Description                              |
//! |---------|------------------|------------------------------------------|
//! | 0       | Universal        | Success                                  |
//! | 1       | Universal        | General error (unspecified)              |
//! | 2       | Universal        | CLI usage error (bad args, missing file) |
//! | 3-9     | workspace        | Source directory read/write              |
//! | 10-19   | project          | Project store                            |
//! | 20-29   | preview          | Preview host                             |
//!
//! # Adding New Exit Codes
//!
//! 1. Add the constant in the appropriate range
//! 2. Document what triggers it
//! 3. Update the table above
//! 4. Wire it into the relevant command's error handling

use playground_core::{LibraryError, ProjectError};

use crate::workspace::WorkspaceError;

// =============================================================================
// Universal (0-2)
// =============================================================================

/// Success - command completed without errors.
pub const EXIT_SUCCESS: u8 = 0;

/// General error - output could not be written (closed stdout, full disk).
/// Avoid using this; prefer a specific error code.
pub const EXIT_ERROR: u8 = 1;

/// Usage error - bad arguments, unknown template or preset, invalid URL.
pub const EXIT_USAGE: u8 = 2;

// =============================================================================
// Workspace (3-9)
// =============================================================================

/// Reading or writing a source file failed.
pub const EXIT_WORKSPACE_IO: u8 = 3;

/// Target directory already holds sources (use --force).
pub const EXIT_WORKSPACE_EXISTS: u8 = 4;

/// Directory has none of index.html, style.css, script.js.
pub const EXIT_WORKSPACE_EMPTY: u8 = 5;

// =============================================================================
// Project (10-19)
// =============================================================================

/// Project name is empty or whitespace.
pub const EXIT_PROJECT_BLANK_NAME: u8 = 10;

/// No project stored under that name.
pub const EXIT_PROJECT_NOT_FOUND: u8 = 11;

/// Local storage could not be written.
pub const EXIT_PROJECT_STORAGE: u8 = 12;

// =============================================================================
// Preview (20-29)
// =============================================================================

/// Could not bind the preview address.
pub const EXIT_PREVIEW_BIND: u8 = 20;

pub fn project_exit_code(err: &ProjectError) -> u8 {
    match err {
        ProjectError::BlankName => EXIT_PROJECT_BLANK_NAME,
        ProjectError::NotFound(_) => EXIT_PROJECT_NOT_FOUND,
        ProjectError::Storage(_) => EXIT_PROJECT_STORAGE,
    }
}

pub fn workspace_exit_code(err: &WorkspaceError) -> u8 {
    match err {
        WorkspaceError::Io { .. } => EXIT_WORKSPACE_IO,
        WorkspaceError::AlreadyExists(_) => EXIT_WORKSPACE_EXISTS,
        WorkspaceError::Empty(_) => EXIT_WORKSPACE_EMPTY,
    }
}

pub fn library_exit_code(_err: &LibraryError) -> u8 {
    EXIT_USAGE
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    #[test]
    fn test_codes_are_distinct_per_domain() {
        let codes = [
            project_exit_code(&ProjectError::BlankName),
            project_exit_code(&ProjectError::NotFound("x".into())),
            project_exit_code(&ProjectError::Storage("disk".into())),
            workspace_exit_code(&WorkspaceError::AlreadyExists(PathBuf::from("d"))),
            workspace_exit_code(&WorkspaceError::Empty(PathBuf::from("d"))),
            EXIT_PREVIEW_BIND,
        ];
        let mut sorted = codes.to_vec();
        sorted.sort_unstable();
        sorted.dedup();
        assert_eq!(sorted.len(), codes.len());
        assert!(codes.iter().all(|c| *c > EXIT_USAGE));
    }
}
