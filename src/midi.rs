//! MIDI output actions and the midir-backed sink
//!
//! The engine emits [`MidiAction`]s; a [`MidiSink`] turns them into bytes on
//! a real output port. Pitch, velocity, and controller values are already
//! clamped to 0..=127 by the engine before they reach the sink.

use std::fmt;

use anyhow::{anyhow, Result};
use midir::{MidiIO, MidiOutput, MidiOutputConnection};
use tracing::{info, trace};

/// Controller id used for Volume messages while the volume hold is active.
pub const EXPRESSION_CC: u8 = 11;

/// One output action decided by the engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MidiAction {
    NoteOn { note: u8, velocity: u8 },
    NoteOff { note: u8 },
    ControlChange { controller: u8, value: u8 },
}

impl MidiAction {
    /// Encode to a 3-byte channel message.
    pub fn encode(self, channel: u8) -> [u8; 3] {
        match self {
            MidiAction::NoteOn { note, velocity } => {
                [0x90 | (channel & 0x0F), note & 0x7F, velocity & 0x7F]
            }
            MidiAction::NoteOff { note } => [0x80 | (channel & 0x0F), note & 0x7F, 0],
            MidiAction::ControlChange { controller, value } => {
                [0xB0 | (channel & 0x0F), controller & 0x7F, value & 0x7F]
            }
        }
    }
}

impl fmt::Display for MidiAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match *self {
            MidiAction::NoteOn { note, velocity } => write!(f, "NoteOn n:{} v:{}", note, velocity),
            MidiAction::NoteOff { note } => write!(f, "NoteOff n:{}", note),
            MidiAction::ControlChange { controller, value } => {
                write!(f, "CC cc:{} v:{}", controller, value)
            }
        }
    }
}

/// Destination for engine output. Implementations need not be thread-safe;
/// the processor actor is the only caller.
pub trait MidiSink: Send {
    fn send(&mut self, action: MidiAction) -> Result<()>;
}

/// Sink writing to a real MIDI output port via midir.
pub struct MidirSink {
    conn: MidiOutputConnection,
    channel: u8,
}

impl MidirSink {
    /// Open the first output port whose name contains `port_hint`
    /// (case-insensitive).
    pub fn open(port_hint: &str, channel: u8) -> Result<Self> {
        let midi_out = MidiOutput::new("glove-bridge")?;

        let port = find_port_by_substring(&midi_out, port_hint).ok_or_else(|| {
            let names = port_names(&midi_out);
            anyhow!(
                "MIDI output port matching '{}' not found. Available: {:?}",
                port_hint,
                names
            )
        })?;

        let name = midi_out.port_name(&port).unwrap_or_default();
        let conn = midi_out
            .connect(&port, "glove-bridge-out")
            .map_err(|e| anyhow!("failed to connect to MIDI port '{}': {}", name, e))?;

        info!("MIDI out connected: '{}' (channel {})", name, channel + 1);
        Ok(Self { conn, channel })
    }
}

impl MidiSink for MidirSink {
    fn send(&mut self, action: MidiAction) -> Result<()> {
        let bytes = action.encode(self.channel);
        trace!("-> {} [{}]", action, format_hex(&bytes));
        self.conn
            .send(&bytes)
            .map_err(|e| anyhow!("MIDI send failed: {}", e))
    }
}

/// Find a port by case-insensitive name substring.
pub fn find_port_by_substring<T: MidiIO>(io: &T, needle: &str) -> Option<T::Port> {
    let needle = needle.to_lowercase();
    io.ports().into_iter().find(|port| {
        io.port_name(port)
            .map(|name| name.to_lowercase().contains(&needle))
            .unwrap_or(false)
    })
}

/// Names of all available MIDI output ports.
pub fn list_output_ports() -> Result<Vec<String>> {
    let midi_out = MidiOutput::new("glove-bridge-list")?;
    Ok(port_names(&midi_out))
}

fn port_names<T: MidiIO>(io: &T) -> Vec<String> {
    io.ports()
        .iter()
        .filter_map(|p| io.port_name(p).ok())
        .collect()
}

/// Format MIDI bytes as hex for trace logging.
pub fn format_hex(data: &[u8]) -> String {
    data.iter()
        .map(|b| format!("{:02X}", b))
        .collect::<Vec<_>>()
        .join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_encode_note_on() {
        let action = MidiAction::NoteOn { note: 60, velocity: 100 };
        assert_eq!(action.encode(0), [0x90, 60, 100]);
        assert_eq!(action.encode(2), [0x92, 60, 100]);
    }

    #[test]
    fn test_encode_note_off() {
        let action = MidiAction::NoteOff { note: 64 };
        assert_eq!(action.encode(0), [0x80, 64, 0]);
    }

    #[test]
    fn test_encode_control_change() {
        let action = MidiAction::ControlChange { controller: EXPRESSION_CC, value: 96 };
        assert_eq!(action.encode(0), [0xB0, 11, 96]);
    }

    #[test]
    fn test_encode_masks_out_of_range() {
        let action = MidiAction::NoteOn { note: 200, velocity: 255 };
        let [status, note, velocity] = action.encode(0);
        assert_eq!(status, 0x90);
        assert!(note <= 127 && velocity <= 127);
    }

    #[test]
    fn test_format_hex() {
        assert_eq!(format_hex(&[0x90, 60, 100]), "90 3C 64");
    }
}
