// Reserved host shortcuts: run, save dialog, open dialog

use serde::{Deserialize, Serialize};
use std::fmt;

/// A single key chord such as `Ctrl+Enter`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct KeyCombo {
    pub ctrl: bool,
    pub alt: bool,
    pub shift: bool,
    pub meta: bool,
    /// Lowercased key name as reported by `KeyboardEvent.key`.
    pub key: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum KeyComboError {
    Empty,
    MissingKey(String),
    MultipleKeys(String),
}

impl fmt::Display for KeyComboError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Empty => write!(f, "empty key combination"),
            Self::MissingKey(raw) => write!(f, "'{raw}' has modifiers but no key"),
            Self::MultipleKeys(raw) => write!(f, "'{raw}' names more than one key"),
        }
    }
}

impl std::error::Error for KeyComboError {}

impl KeyCombo {
    /// Parse `"ctrl+shift+s"`, `"Cmd+Enter"`, ... (case-insensitive).
    pub fn parse(raw: &str) -> Result<Self, KeyComboError> {
        if raw.trim().is_empty() {
            return Err(KeyComboError::Empty);
        }
        let mut combo = KeyCombo {
            ctrl: false,
            alt: false,
            shift: false,
            meta: false,
            key: String::new(),
        };
        for token in raw.split('+').map(|t| t.trim().to_ascii_lowercase()) {
            match token.as_str() {
                "ctrl" | "control" => combo.ctrl = true,
                "alt" | "option" => combo.alt = true,
                "shift" => combo.shift = true,
                "meta" | "cmd" | "command" | "super" => combo.meta = true,
                "" => return Err(KeyComboError::MissingKey(raw.to_string())),
                key => {
                    if !combo.key.is_empty() {
                        return Err(KeyComboError::MultipleKeys(raw.to_string()));
                    }
                    combo.key = normalize_key(key);
                }
            }
        }
        if combo.key.is_empty() {
            return Err(KeyComboError::MissingKey(raw.to_string()));
        }
        Ok(combo)
    }
}

fn normalize_key(key: &str) -> String {
    match key {
        "return" => "enter".to_string(),
        "esc" => "escape".to_string(),
        other => other.to_string(),
    }
}

impl fmt::Display for KeyCombo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut parts: Vec<String> = Vec::new();
        if self.ctrl {
            parts.push("Ctrl".into());
        }
        if self.alt {
            parts.push("Alt".into());
        }
        if self.shift {
            parts.push("Shift".into());
        }
        if self.meta {
            parts.push("Meta".into());
        }
        let mut chars = self.key.chars();
        let key = match chars.next() {
            Some(first) => first.to_uppercase().chain(chars).collect(),
            None => String::new(),
        };
        parts.push(key);
        write!(f, "{}", parts.join("+"))
    }
}

/// What a reserved shortcut asks the host to do.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HostShortcut {
    /// Commit and execute now.
    Run,
    /// Open the save-project dialog.
    Save,
    /// Open the load-project dialog.
    Open,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Keybindings {
    pub run: KeyCombo,
    pub save: KeyCombo,
    pub open: KeyCombo,
}

impl Default for Keybindings {
    fn default() -> Self {
        let combo = |ctrl: bool, key: &str| KeyCombo {
            ctrl,
            alt: false,
            shift: false,
            meta: false,
            key: key.to_string(),
        };
        Self {
            run: combo(true, "enter"),
            save: combo(true, "s"),
            open: combo(true, "o"),
        }
    }
}

impl Keybindings {
    pub fn resolve(&self, combo: &KeyCombo) -> Option<HostShortcut> {
        if *combo == self.run {
            Some(HostShortcut::Run)
        } else if *combo == self.save {
            Some(HostShortcut::Save)
        } else if *combo == self.open {
            Some(HostShortcut::Open)
        } else {
            None
        }
    }
}
