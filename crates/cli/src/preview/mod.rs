//! Live preview host.
//!
//! The browser page at `/` holds the sandboxed iframe. The controller loop
//! publishes each rebuilt document into [`SharedPreview`]; the page polls
//! `/state`, swaps the iframe's `srcdoc` when the run changes, and posts
//! tagged console messages back to `/relay`.

pub mod bridge;
pub mod host_page;
pub mod server;

use std::sync::{Arc, Mutex, PoisonError};

use playground_core::RunId;
use playground_engine::{Sandbox, SandboxError};
use playground_protocol::PreviewState;

pub use bridge::{PreviewBridgeHandle, PreviewRequest};
pub use host_page::render_host_page;
pub use server::{PreviewServer, PreviewServerConfig};

/// Latest sandbox document, shared with the server thread.
#[derive(Clone, Default)]
pub struct SharedPreview {
    inner: Arc<Mutex<PreviewState>>,
}

impl SharedPreview {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn snapshot(&self) -> PreviewState {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner).clone()
    }
}

/// Sandbox whose "execution" is handing the document to the browser page.
pub struct PreviewSandbox {
    shared: SharedPreview,
}

impl PreviewSandbox {
    pub fn new(shared: SharedPreview) -> Self {
        Self { shared }
    }
}

impl Sandbox for PreviewSandbox {
    fn replace_document(&mut self, run: RunId, document: String) -> Result<(), SandboxError> {
        let mut state = self
            .shared
            .inner
            .lock()
            .map_err(|_| SandboxError::Unavailable("preview state lock poisoned".to_string()))?;
        *state = PreviewState { run: run.0, document };
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sandbox_publishes_whole_document() {
        let shared = SharedPreview::new();
        let mut sandbox = PreviewSandbox::new(shared.clone());
        assert_eq!(shared.snapshot().run, 0);

        sandbox.replace_document(RunId(1), "<p>one</p>".into()).unwrap();
        sandbox.replace_document(RunId(2), "<p>two</p>".into()).unwrap();
        assert_eq!(
            shared.snapshot(),
            PreviewState {
                run: 2,
                document: "<p>two</p>".into()
            }
        );
    }
}
