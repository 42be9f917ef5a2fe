//! External script/stylesheet resources injected into the sandbox document.
//!
//! The list is insertion-ordered. Preset adds refuse a preset that is
//! already present; freeform adds accept duplicates. URLs are trusted as
//! given (no integrity checking), they only have to be absolute http(s).

use std::fmt;

use serde::{Deserialize, Serialize};
use url::Url;

/// How a library is attached to the document.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LibraryKind {
    /// `<script src="...">`
    Script,
    /// `<link rel="stylesheet" href="...">`
    Stylesheet,
}

impl LibraryKind {
    /// A path ending in `.css` is a stylesheet, everything else is a script.
    pub fn detect(url: &Url) -> Self {
        if url.path().to_ascii_lowercase().ends_with(".css") {
            LibraryKind::Stylesheet
        } else {
            LibraryKind::Script
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExternalLibrary {
    pub url: String,
    pub kind: LibraryKind,
}

impl ExternalLibrary {
    /// Validate and classify a URL.
    pub fn parse(raw: &str) -> Result<Self, LibraryError> {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return Err(LibraryError::Empty);
        }
        let url = Url::parse(trimmed).map_err(|e| LibraryError::InvalidUrl {
            url: trimmed.to_string(),
            reason: e.to_string(),
        })?;
        match url.scheme() {
            "http" | "https" => {}
            other => {
                return Err(LibraryError::UnsupportedScheme {
                    url: trimmed.to_string(),
                    scheme: other.to_string(),
                })
            }
        }
        Ok(Self {
            kind: LibraryKind::detect(&url),
            url: trimmed.to_string(),
        })
    }
}

/// A one-click library offered by the UI.
#[derive(Debug, Clone, Copy)]
pub struct LibraryPreset {
    pub name: &'static str,
    pub url: &'static str,
}

pub const PRESETS: &[LibraryPreset] = &[
    LibraryPreset {
        name: "jQuery",
        url: "https://code.jquery.com/jquery-3.7.1.min.js",
    },
    LibraryPreset {
        name: "Lodash",
        url: "https://cdn.jsdelivr.net/npm/lodash@4.17.21/lodash.min.js",
    },
    LibraryPreset {
        name: "Bootstrap CSS",
        url: "https://cdn.jsdelivr.net/npm/bootstrap@5.3.3/dist/css/bootstrap.min.css",
    },
    LibraryPreset {
        name: "Animate.css",
        url: "https://cdnjs.cloudflare.com/ajax/libs/animate.css/4.1.1/animate.min.css",
    },
    LibraryPreset {
        name: "Chart.js",
        url: "https://cdn.jsdelivr.net/npm/chart.js@4.4.1/dist/chart.umd.min.js",
    },
    LibraryPreset {
        name: "Tailwind",
        url: "https://cdn.tailwindcss.com",
    },
];

impl LibraryPreset {
    /// Case-insensitive lookup by display name.
    pub fn find(name: &str) -> Option<&'static LibraryPreset> {
        PRESETS.iter().find(|p| p.name.eq_ignore_ascii_case(name.trim()))
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LibraryError {
    /// Blank input.
    Empty,
    /// Not an absolute URL.
    InvalidUrl { url: String, reason: String },
    /// Anything other than http/https.
    UnsupportedScheme { url: String, scheme: String },
    /// Preset already in the list.
    DuplicatePreset(String),
    /// No preset with that name.
    UnknownPreset(String),
    /// Remove index past the end of the list.
    OutOfRange { index: usize, len: usize },
}

impl fmt::Display for LibraryError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Empty => write!(f, "library URL is empty"),
            Self::InvalidUrl { url, reason } => write!(f, "invalid library URL '{url}': {reason}"),
            Self::UnsupportedScheme { url, scheme } => {
                write!(f, "library URL '{url}' uses unsupported scheme '{scheme}'")
            }
            Self::DuplicatePreset(name) => write!(f, "preset '{name}' is already added"),
            Self::UnknownPreset(name) => write!(f, "unknown preset '{name}'"),
            Self::OutOfRange { index, len } => {
                write!(f, "no library at index {index} (list has {len})")
            }
        }
    }
}

impl std::error::Error for LibraryError {}

/// Ordered set of libraries for the current session.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExternalLibraryList {
    items: Vec<ExternalLibrary>,
}

impl ExternalLibraryList {
    pub fn new() -> Self {
        Self::default()
    }

    /// Freeform add. Duplicates are allowed.
    pub fn add(&mut self, raw: &str) -> Result<&ExternalLibrary, LibraryError> {
        let library = ExternalLibrary::parse(raw)?;
        self.items.push(library);
        Ok(&self.items[self.items.len() - 1])
    }

    /// Add a preset by name, refusing one that is already present.
    pub fn add_preset(&mut self, name: &str) -> Result<&ExternalLibrary, LibraryError> {
        let preset = LibraryPreset::find(name)
            .ok_or_else(|| LibraryError::UnknownPreset(name.trim().to_string()))?;
        if self.contains(preset.url) {
            return Err(LibraryError::DuplicatePreset(preset.name.to_string()));
        }
        self.add(preset.url)
    }

    /// Whether the preset button for `name` should be disabled.
    pub fn preset_added(&self, name: &str) -> bool {
        LibraryPreset::find(name).is_some_and(|p| self.contains(p.url))
    }

    pub fn remove(&mut self, index: usize) -> Result<ExternalLibrary, LibraryError> {
        if index >= self.items.len() {
            return Err(LibraryError::OutOfRange {
                index,
                len: self.items.len(),
            });
        }
        Ok(self.items.remove(index))
    }

    pub fn contains(&self, url: &str) -> bool {
        let url = url.trim();
        self.items.iter().any(|l| l.url == url)
    }

    pub fn iter(&self) -> std::slice::Iter<'_, ExternalLibrary> {
        self.items.iter()
    }

    pub fn as_slice(&self) -> &[ExternalLibrary] {
        &self.items
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kind_detection() {
        let css = ExternalLibrary::parse("https://cdn.example.com/a/theme.min.CSS?v=2").unwrap();
        assert_eq!(css.kind, LibraryKind::Stylesheet);
        let js = ExternalLibrary::parse("https://cdn.tailwindcss.com").unwrap();
        assert_eq!(js.kind, LibraryKind::Script);
    }

    #[test]
    fn test_rejects_relative_and_blank() {
        assert_eq!(ExternalLibrary::parse("   "), Err(LibraryError::Empty));
        assert!(matches!(
            ExternalLibrary::parse("lib/jquery.js"),
            Err(LibraryError::InvalidUrl { .. })
        ));
        assert!(matches!(
            ExternalLibrary::parse("ftp://example.com/x.js"),
            Err(LibraryError::UnsupportedScheme { .. })
        ));
    }

    #[test]
    fn test_freeform_allows_duplicates() {
        let mut list = ExternalLibraryList::new();
        list.add("https://example.com/a.js").unwrap();
        list.add("https://example.com/a.js").unwrap();
        assert_eq!(list.len(), 2);
    }

    #[test]
    fn test_preset_duplicate_rejected() {
        let mut list = ExternalLibraryList::new();
        assert!(!list.preset_added("jquery"));
        list.add_preset("jQuery").unwrap();
        assert!(list.preset_added("jquery"));
        assert_eq!(
            list.add_preset("JQUERY"),
            Err(LibraryError::DuplicatePreset("jQuery".to_string()))
        );
        assert_eq!(list.len(), 1);
    }

    #[test]
    fn test_insertion_order_and_remove() {
        let mut list = ExternalLibraryList::new();
        list.add("https://example.com/one.css").unwrap();
        list.add("https://example.com/two.js").unwrap();
        list.add("https://example.com/three.js").unwrap();
        let removed = list.remove(1).unwrap();
        assert_eq!(removed.url, "https://example.com/two.js");
        let urls: Vec<_> = list.iter().map(|l| l.url.as_str()).collect();
        assert_eq!(urls, vec!["https://example.com/one.css", "https://example.com/three.js"]);
        assert!(matches!(list.remove(5), Err(LibraryError::OutOfRange { index: 5, len: 2 })));
    }
}
