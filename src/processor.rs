//! Processor actor - the serialization boundary
//!
//! Owns the [`Engine`] and the [`MidiSink`] behind a command channel, so all
//! event processing and all sink access happen on one task. Transport readers
//! for different connections can feed events concurrently without any chance
//! of interleaving a device's read-modify-write or the output writes.

use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tracing::{debug, warn};

use crate::engine::{DeviceSnapshot, Engine};
use crate::midi::MidiSink;
use crate::protocol::{DeviceId, GloveEvent};

/// Commands accepted by the processor actor.
pub enum ProcessorCommand {
    /// Apply one parsed event.
    Event(GloveEvent),
    /// Inspect a device's state (used by tests and diagnostics).
    Snapshot {
        device: DeviceId,
        reply: oneshot::Sender<Option<DeviceSnapshot>>,
    },
    /// Release all sounding notes and stop.
    Shutdown,
}

/// Cloneable handle for talking to the actor.
#[derive(Clone)]
pub struct ProcessorHandle {
    tx: mpsc::UnboundedSender<ProcessorCommand>,
}

impl ProcessorHandle {
    /// Queue an event. Send failures mean the actor is gone; the event is
    /// dropped, consistent with shutdown semantics.
    pub fn event(&self, event: GloveEvent) {
        let _ = self.tx.send(ProcessorCommand::Event(event));
    }

    pub async fn snapshot(&self, device: DeviceId) -> Option<DeviceSnapshot> {
        let (reply, rx) = oneshot::channel();
        if self
            .tx
            .send(ProcessorCommand::Snapshot { device, reply })
            .is_err()
        {
            return None;
        }
        rx.await.ok().flatten()
    }

    pub fn shutdown(&self) {
        let _ = self.tx.send(ProcessorCommand::Shutdown);
    }
}

/// Actor task owning engine and sink.
pub struct ProcessorActor {
    engine: Engine,
    sink: Box<dyn MidiSink>,
    rx: mpsc::UnboundedReceiver<ProcessorCommand>,
}

impl ProcessorActor {
    /// Spawn the actor; returns its handle and join handle.
    pub fn spawn(engine: Engine, sink: Box<dyn MidiSink>) -> (ProcessorHandle, JoinHandle<()>) {
        let (tx, rx) = mpsc::unbounded_channel();
        let actor = Self { engine, sink, rx };
        let join = tokio::spawn(actor.run());
        (ProcessorHandle { tx }, join)
    }

    async fn run(mut self) {
        while let Some(command) = self.rx.recv().await {
            match command {
                ProcessorCommand::Event(event) => {
                    debug!("event: {:?}", event);
                    for action in self.engine.handle(event) {
                        if let Err(e) = self.sink.send(action) {
                            warn!("dropping action {}: {:#}", action, e);
                        }
                    }
                }
                ProcessorCommand::Snapshot { device, reply } => {
                    let _ = reply.send(self.engine.snapshot(device));
                }
                ProcessorCommand::Shutdown => break,
            }
        }

        // Stop cleanly: nothing may keep sounding after the bridge exits.
        for action in self.engine.all_notes_off() {
            if let Err(e) = self.sink.send(action) {
                warn!("failed to release note at shutdown: {:#}", e);
            }
        }
    }
}
