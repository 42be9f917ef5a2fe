// Configuration and local persistence

pub mod keybindings;
pub mod projects;
pub mod settings;
pub mod storage;

pub use keybindings::{HostShortcut, KeyCombo, KeyComboError, Keybindings};
pub use projects::{ProjectStore, LAST_PROJECT_KEY, PROJECT_KEY_PREFIX};
pub use settings::Settings;
pub use storage::{FileStore, KeyValueStore, MemoryStore, StoreError};

use std::path::PathBuf;

/// `<config_dir>/playground`, falling back to the working directory.
pub fn config_dir() -> PathBuf {
    dirs::config_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("playground")
}

/// `<data_dir>/playground`, falling back to the working directory.
pub fn data_dir() -> PathBuf {
    dirs::data_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("playground")
}
