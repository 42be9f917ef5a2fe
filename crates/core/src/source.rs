//! Source buffers and the immutable triple committed for a run.

use serde::{Deserialize, Serialize};

/// Which of the three buffers an edit targets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SourceKind {
    Markup,
    Style,
    Script,
}

impl SourceKind {
    pub const ALL: [SourceKind; 3] = [SourceKind::Markup, SourceKind::Style, SourceKind::Script];

    /// File name used when the triple is mirrored to a directory.
    pub fn file_name(&self) -> &'static str {
        match self {
            SourceKind::Markup => "index.html",
            SourceKind::Style => "style.css",
            SourceKind::Script => "script.js",
        }
    }
}

/// One coherent, runnable unit of user code.
///
/// Field names on the wire are `html`, `css` and `js`. Missing fields
/// deserialize as empty buffers so a partially written record still loads.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceTriple {
    #[serde(rename = "html", default)]
    pub markup: String,
    #[serde(rename = "css", default)]
    pub style: String,
    #[serde(rename = "js", default)]
    pub script: String,
}

impl SourceTriple {
    pub fn new(markup: impl Into<String>, style: impl Into<String>, script: impl Into<String>) -> Self {
        Self {
            markup: markup.into(),
            style: style.into(),
            script: script.into(),
        }
    }

    pub fn get(&self, kind: SourceKind) -> &str {
        match kind {
            SourceKind::Markup => &self.markup,
            SourceKind::Style => &self.style,
            SourceKind::Script => &self.script,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.markup.is_empty() && self.style.is_empty() && self.script.is_empty()
    }
}

/// The three live, user-mutated buffers.
///
/// Every change bumps `revision` so observers can tell an edit happened
/// without diffing the text.
#[derive(Debug, Clone, Default)]
pub struct SourceBuffers {
    markup: String,
    style: String,
    script: String,
    revision: u64,
}

impl SourceBuffers {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_triple(triple: SourceTriple) -> Self {
        Self {
            markup: triple.markup,
            style: triple.style,
            script: triple.script,
            revision: 0,
        }
    }

    pub fn get(&self, kind: SourceKind) -> &str {
        match kind {
            SourceKind::Markup => &self.markup,
            SourceKind::Style => &self.style,
            SourceKind::Script => &self.script,
        }
    }

    /// Replace one buffer. Returns false when the text is unchanged.
    pub fn set(&mut self, kind: SourceKind, text: impl Into<String>) -> bool {
        let text = text.into();
        let slot = match kind {
            SourceKind::Markup => &mut self.markup,
            SourceKind::Style => &mut self.style,
            SourceKind::Script => &mut self.script,
        };
        if *slot == text {
            return false;
        }
        *slot = text;
        self.revision += 1;
        true
    }

    /// Overwrite all three buffers at once (project load, template, restore).
    pub fn apply(&mut self, triple: &SourceTriple) {
        self.markup = triple.markup.clone();
        self.style = triple.style.clone();
        self.script = triple.script.clone();
        self.revision += 1;
    }

    /// Read-only copy of the current contents.
    pub fn snapshot(&self) -> SourceTriple {
        SourceTriple {
            markup: self.markup.clone(),
            style: self.style.clone(),
            script: self.script.clone(),
        }
    }

    pub fn revision(&self) -> u64 {
        self.revision
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_set_reports_change() {
        let mut buffers = SourceBuffers::new();
        assert!(buffers.set(SourceKind::Script, "let a = 1;"));
        assert!(!buffers.set(SourceKind::Script, "let a = 1;"));
        assert_eq!(buffers.revision(), 1);
        assert_eq!(buffers.get(SourceKind::Script), "let a = 1;");
    }

    #[test]
    fn test_snapshot_is_detached() {
        let mut buffers = SourceBuffers::new();
        buffers.set(SourceKind::Markup, "<p>one</p>");
        let snap = buffers.snapshot();
        buffers.set(SourceKind::Markup, "<p>two</p>");
        assert_eq!(snap.markup, "<p>one</p>");
    }

    #[test]
    fn test_triple_wire_names() {
        let triple = SourceTriple::new("<b>x</b>", "b{}", "1");
        let json = serde_json::to_value(&triple).unwrap();
        assert_eq!(json["html"], "<b>x</b>");
        assert_eq!(json["css"], "b{}");
        assert_eq!(json["js"], "1");
    }

    #[test]
    fn test_triple_missing_fields_default_empty() {
        let triple: SourceTriple = serde_json::from_str(r#"{"html":"<i>hi</i>"}"#).unwrap();
        assert_eq!(triple.markup, "<i>hi</i>");
        assert!(triple.style.is_empty());
        assert!(triple.script.is_empty());
    }
}
