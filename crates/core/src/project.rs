use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::source::SourceTriple;

/// A named, saved triple.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Project {
    pub name: String,
    pub triple: SourceTriple,
    pub saved_at: Option<DateTime<Utc>>,
}

/// Stored form of a project: `{html, css, js, savedAt}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProjectRecord {
    #[serde(flatten)]
    pub triple: SourceTriple,
    #[serde(rename = "savedAt", default, skip_serializing_if = "Option::is_none")]
    pub saved_at: Option<DateTime<Utc>>,
}

impl ProjectRecord {
    pub fn new(triple: SourceTriple, saved_at: DateTime<Utc>) -> Self {
        Self {
            triple,
            saved_at: Some(saved_at),
        }
    }

    pub fn into_project(self, name: impl Into<String>) -> Project {
        Project {
            name: name.into(),
            triple: self.triple,
            saved_at: self.saved_at,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProjectError {
    /// Empty or whitespace-only project name.
    BlankName,
    /// No project stored under that name.
    NotFound(String),
    /// Underlying storage failed.
    Storage(String),
}

impl fmt::Display for ProjectError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::BlankName => write!(f, "project name must not be blank"),
            Self::NotFound(name) => write!(f, "no project named '{name}'"),
            Self::Storage(msg) => write!(f, "storage error: {msg}"),
        }
    }
}

impl std::error::Error for ProjectError {}

/// Trim a user-supplied name, rejecting blank input.
pub fn validate_project_name(name: &str) -> Result<&str, ProjectError> {
    let trimmed = name.trim();
    if trimmed.is_empty() {
        Err(ProjectError::BlankName)
    } else {
        Ok(trimmed)
    }
}
