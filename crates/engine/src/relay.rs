//! Host side of the console relay.
//!
//! Fire-and-forget: the sender never blocks and never learns whether a
//! message was shown. Each accepted message becomes one [`LogEntry`]
//! stamped with the host wall clock at arrival. Messages produced by a
//! document older than the current run are dropped when drained, and the
//! rest come out in the order the document emitted them.

use std::sync::mpsc::{self, Receiver, Sender, TryRecvError};
use std::sync::Arc;

use playground_core::{LogEntry, LogKind, RunId};
use playground_protocol::{validate_relay, MessageKind, RelayEnvelope, RelayMessage, RelayRejection, MAX_PAYLOAD_SIZE};

/// Source of console timestamps.
pub trait Clock: Send + Sync {
    fn timestamp(&self) -> String;
}

/// Local wall-clock time, `HH:MM:SS`.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn timestamp(&self) -> String {
        chrono::Local::now().format("%H:%M:%S").to_string()
    }
}

/// Always returns the same timestamp. For tests and replay.
#[derive(Debug, Clone)]
pub struct FixedClock(pub String);

impl Clock for FixedClock {
    fn timestamp(&self) -> String {
        self.0.clone()
    }
}

#[derive(Debug)]
struct Delivery {
    /// None for notices raised by the host itself; they belong to
    /// whichever run is current when drained.
    run: Option<RunId>,
    seq: Option<u64>,
    entry: LogEntry,
}

fn log_kind(kind: MessageKind) -> LogKind {
    match kind {
        MessageKind::Log => LogKind::Log,
        MessageKind::Warn => LogKind::Warn,
        MessageKind::Error => LogKind::Error,
    }
}

/// Create a relay using the local wall clock.
pub fn relay_channel() -> (RelaySender, RelayReceiver) {
    relay_channel_with_clock(Arc::new(SystemClock))
}

pub fn relay_channel_with_clock(clock: Arc<dyn Clock>) -> (RelaySender, RelayReceiver) {
    let (tx, rx) = mpsc::channel();
    (
        RelaySender { tx, clock },
        RelayReceiver {
            rx,
            current_run: RunId::default(),
        },
    )
}

/// Cloneable producer end, handed to whatever receives sandbox messages.
#[derive(Clone)]
pub struct RelaySender {
    tx: Sender<Delivery>,
    clock: Arc<dyn Clock>,
}

impl RelaySender {
    /// Queue a validated message. The message's own run, when it carries
    /// one, overrides `run`. Returns false once the receiver is gone.
    pub fn send(&self, run: RunId, message: RelayMessage) -> bool {
        let run = message.run.map(RunId).unwrap_or(run);
        let entry = LogEntry::new(log_kind(message.kind), message.message, self.clock.timestamp(), run);
        self.tx
            .send(Delivery {
                run: Some(run),
                seq: message.seq,
                entry,
            })
            .is_ok()
    }

    /// Validate an envelope forwarded by the host page and queue it.
    pub fn forward(&self, envelope: RelayEnvelope) -> Result<(), RelayRejection> {
        let message = validate_relay(envelope.payload)?;
        if !self.send(RunId(envelope.run), message) {
            log::debug!("Relay receiver closed; dropping message");
        }
        Ok(())
    }

    /// A payload of `size` bytes was too large to parse. Queues one error
    /// entry for the current run in its place.
    pub fn report_oversized(&self, size: usize) -> bool {
        let text = format!(
            "Console message dropped: {} bytes exceeds the {} byte relay limit",
            size, MAX_PAYLOAD_SIZE
        );
        let entry = LogEntry::new(LogKind::Error, vec![text], self.clock.timestamp(), RunId::default());
        self.tx
            .send(Delivery {
                run: None,
                seq: None,
                entry,
            })
            .is_ok()
    }
}

/// Consumer end, owned by the host controller.
pub struct RelayReceiver {
    rx: Receiver<Delivery>,
    current_run: RunId,
}

impl RelayReceiver {
    pub fn current_run(&self) -> RunId {
        self.current_run
    }

    /// Only messages tagged with `run` are accepted from now on.
    pub fn begin_run(&mut self, run: RunId) {
        self.current_run = run;
    }

    /// Everything queued so far for the current run.
    ///
    /// Sequenced messages are put back in emission order; unsequenced ones
    /// keep their arrival position ahead of them.
    pub fn drain(&mut self) -> Vec<LogEntry> {
        let mut deliveries = Vec::new();
        loop {
            match self.rx.try_recv() {
                Ok(mut delivery) => match delivery.run {
                    Some(run) if run != self.current_run => {
                        log::debug!("Dropping stale console message from run {} (current {})", run, self.current_run);
                    }
                    Some(_) => deliveries.push(delivery),
                    None => {
                        delivery.entry.run = self.current_run;
                        deliveries.push(delivery);
                    }
                },
                Err(TryRecvError::Empty) | Err(TryRecvError::Disconnected) => break,
            }
        }
        deliveries.sort_by_key(|d| d.seq);
        deliveries.into_iter().map(|d| d.entry).collect()
    }
}
