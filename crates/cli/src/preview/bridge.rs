//! Bridge between the preview server thread and the controller loop.
//!
//! The HTTP listener runs on its own thread and never touches the
//! playground directly. Requests that need controller state are sent as
//! `PreviewRequest`s over an mpsc channel; the controller loop answers each
//! through a oneshot reply channel between ticks.

use std::fmt;
use std::sync::mpsc;

use playground_protocol::{CommandReply, ConsoleSnapshot, HostCommand, ProjectList};

/// A simple oneshot channel for single-use responses.
/// Uses std::sync::mpsc under the hood.
pub mod oneshot {
    use std::sync::mpsc;

    pub struct Sender<T>(mpsc::SyncSender<T>);
    pub struct Receiver<T>(mpsc::Receiver<T>);

    impl<T> Sender<T> {
        pub fn send(self, value: T) -> Result<(), T> {
            self.0.send(value).map_err(|e| e.0)
        }
    }

    impl<T> Receiver<T> {
        pub fn blocking_recv(self) -> Result<T, RecvError> {
            self.0.recv().map_err(|_| RecvError)
        }
    }

    #[derive(Debug, Clone, Copy)]
    pub struct RecvError;

    pub fn channel<T>() -> (Sender<T>, Receiver<T>) {
        // Buffer of 1 for oneshot semantics
        let (tx, rx) = mpsc::sync_channel(1);
        (Sender(tx), Receiver(rx))
    }
}

/// Requests from the preview server to the controller loop.
pub enum PreviewRequest {
    Console {
        reply: oneshot::Sender<ConsoleSnapshot>,
    },
    Command {
        command: HostCommand,
        reply: oneshot::Sender<CommandReply>,
    },
    Projects {
        reply: oneshot::Sender<ProjectList>,
    },
    Export {
        reply: oneshot::Sender<String>,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BridgeError {
    /// Controller loop has exited.
    ChannelClosed,
}

impl fmt::Display for BridgeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BridgeError::ChannelClosed => write!(f, "playground controller is not running"),
        }
    }
}

impl std::error::Error for BridgeError {}

/// Handle held by the preview server.
#[derive(Clone)]
pub struct PreviewBridgeHandle {
    tx: mpsc::Sender<PreviewRequest>,
}

impl PreviewBridgeHandle {
    pub fn new(tx: mpsc::Sender<PreviewRequest>) -> Self {
        Self { tx }
    }

    fn request<T>(&self, build: impl FnOnce(oneshot::Sender<T>) -> PreviewRequest) -> Result<T, BridgeError> {
        let (reply_tx, reply_rx) = oneshot::channel();
        self.tx.send(build(reply_tx)).map_err(|_| BridgeError::ChannelClosed)?;
        reply_rx.blocking_recv().map_err(|_| BridgeError::ChannelClosed)
    }

    pub fn console(&self) -> Result<ConsoleSnapshot, BridgeError> {
        self.request(|reply| PreviewRequest::Console { reply })
    }

    pub fn command(&self, command: HostCommand) -> Result<CommandReply, BridgeError> {
        self.request(|reply| PreviewRequest::Command { command, reply })
    }

    pub fn projects(&self) -> Result<ProjectList, BridgeError> {
        self.request(|reply| PreviewRequest::Projects { reply })
    }

    pub fn export(&self) -> Result<String, BridgeError> {
        self.request(|reply| PreviewRequest::Export { reply })
    }
}
