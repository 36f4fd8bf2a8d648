//! Per-device state machine
//!
//! Consumes typed [`GloveEvent`]s and decides which MIDI actions to emit.
//! Each device owns at most one sounding voice at a time, held either by the
//! note-hold path (`current_note`) or by sustain (`sustained_note`), never
//! both. A note-off is always emitted before a tracked slot is overwritten
//! or cleared, so the machine cannot leave stuck notes behind.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::midi::{MidiAction, EXPRESSION_CC};
use crate::protocol::{DeviceId, GloveEvent};

/// Tunables for the state machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
pub struct EngineConfig {
    /// Minimum value delta before a controller change is re-emitted.
    #[serde(default = "default_deadband")]
    pub deadband: u8,
    /// Lower bound of the accumulated octave offset, in semitones.
    #[serde(default = "default_octave_min")]
    pub octave_min: i32,
    /// Upper bound of the accumulated octave offset, in semitones.
    #[serde(default = "default_octave_max")]
    pub octave_max: i32,
    /// Velocity used for notes triggered before any Volume message arrives.
    #[serde(default = "default_volume")]
    pub default_volume: u8,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            deadband: default_deadband(),
            octave_min: default_octave_min(),
            octave_max: default_octave_max(),
            default_volume: default_volume(),
        }
    }
}

fn default_deadband() -> u8 {
    2
}
fn default_octave_min() -> i32 {
    -24
}
fn default_octave_max() -> i32 {
    36
}
fn default_volume() -> u8 {
    96
}

/// Mutable state of one controller. Created lazily on the first event that
/// references its device id; lives for the rest of the process.
#[derive(Debug)]
struct DeviceState {
    note_hold: bool,
    volume_hold: bool,
    sustain_on: bool,
    octave_offset: i32,
    last_volume: u8,
    current_note: Option<u8>,
    sustained_note: Option<u8>,
    /// Last value actually sent per controller id, for deadband filtering.
    last_sent: HashMap<u8, u8>,
}

impl DeviceState {
    fn new(default_volume: u8) -> Self {
        Self {
            note_hold: false,
            volume_hold: false,
            sustain_on: false,
            octave_offset: 0,
            last_volume: default_volume,
            current_note: None,
            sustained_note: None,
            last_sent: HashMap::new(),
        }
    }

    /// Deadband filter: pass if nothing was sent yet for this controller, or
    /// the candidate moved at least `threshold` away from what was sent.
    /// Records the candidate on pass.
    fn passes_deadband(&mut self, controller: u8, value: u8, threshold: u8) -> bool {
        match self.last_sent.get(&controller) {
            Some(&last) if last.abs_diff(value) < threshold => false,
            _ => {
                self.last_sent.insert(controller, value);
                true
            }
        }
    }
}

/// Read-only view of a device's state, for logging and tests.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DeviceSnapshot {
    pub note_hold: bool,
    pub volume_hold: bool,
    pub sustain_on: bool,
    pub octave_offset: i32,
    pub last_volume: u8,
    pub current_note: Option<u8>,
    pub sustained_note: Option<u8>,
}

/// The event processor: owns all device states and all transition logic.
pub struct Engine {
    config: EngineConfig,
    devices: HashMap<DeviceId, DeviceState>,
}

impl Engine {
    pub fn new(config: EngineConfig) -> Self {
        Self {
            config,
            devices: HashMap::new(),
        }
    }

    /// Apply one event and return the actions to emit, in order.
    pub fn handle(&mut self, event: GloveEvent) -> Vec<MidiAction> {
        let config = self.config;
        let state = self
            .devices
            .entry(event.device())
            .or_insert_with(|| DeviceState::new(config.default_volume));

        let mut out = Vec::new();
        match event {
            GloveEvent::NoteHold { held, .. } => {
                let was_held = state.note_hold;
                state.note_hold = held;
                // Release ends the current note unless sustain owns the voice.
                if was_held && !held && !state.sustain_on {
                    if let Some(note) = state.current_note.take() {
                        out.push(MidiAction::NoteOff { note });
                    }
                }
            }

            GloveEvent::VolumeHold { held, .. } => {
                state.volume_hold = held;
            }

            GloveEvent::Sustain { on, .. } => {
                state.sustain_on = on;
                if on {
                    // Promote the held note: same voice, now owned by sustain.
                    if let Some(note) = state.current_note.take() {
                        if let Some(old) = state.sustained_note.replace(note) {
                            if old != note {
                                out.push(MidiAction::NoteOff { note: old });
                            }
                        }
                    }
                } else if let Some(note) = state.sustained_note.take() {
                    out.push(MidiAction::NoteOff { note });
                }
            }

            GloveEvent::Panic { .. } => {
                state.sustain_on = false;
                if let Some(note) = state.sustained_note.take() {
                    out.push(MidiAction::NoteOff { note });
                }
            }

            GloveEvent::OctaveStep { octaves, .. } => {
                state.octave_offset = (state.octave_offset + 12 * octaves as i32)
                    .clamp(config.octave_min, config.octave_max);
            }

            GloveEvent::Pitch { pitch, .. } => {
                if state.note_hold {
                    let note = (pitch as i32 + state.octave_offset).clamp(0, 127) as u8;
                    let velocity = state.last_volume.max(1);

                    if state.sustain_on {
                        if state.sustained_note != Some(note) {
                            if let Some(old) = state.sustained_note.take() {
                                out.push(MidiAction::NoteOff { note: old });
                            }
                            // The hold slot is drained whenever sustain turns on.
                            debug_assert!(state.current_note.is_none());
                            out.push(MidiAction::NoteOn { note, velocity });
                            state.sustained_note = Some(note);
                        }
                    } else if state.current_note != Some(note) {
                        if let Some(old) = state.current_note.take() {
                            out.push(MidiAction::NoteOff { note: old });
                        }
                        out.push(MidiAction::NoteOn { note, velocity });
                        state.current_note = Some(note);
                    }
                }
            }

            GloveEvent::Volume { value, .. } => {
                state.last_volume = value;
                if state.volume_hold && state.passes_deadband(EXPRESSION_CC, value, config.deadband)
                {
                    out.push(MidiAction::ControlChange {
                        controller: EXPRESSION_CC,
                        value,
                    });
                }
            }

            GloveEvent::Effect { param, value, .. } => {
                // Fire-and-forget: nothing is retained while the hold is off.
                let controller = param.controller();
                if state.volume_hold && state.passes_deadband(controller, value, config.deadband) {
                    out.push(MidiAction::ControlChange { controller, value });
                }
            }
        }
        out
    }

    /// Note-offs for every voice still sounding, clearing the tracked slots.
    /// Used at shutdown so nothing outlives the process.
    pub fn all_notes_off(&mut self) -> Vec<MidiAction> {
        let mut out = Vec::new();
        for state in self.devices.values_mut() {
            if let Some(note) = state.current_note.take() {
                out.push(MidiAction::NoteOff { note });
            }
            if let Some(note) = state.sustained_note.take() {
                out.push(MidiAction::NoteOff { note });
            }
        }
        out
    }

    /// Snapshot of one device's state, if it has been seen.
    pub fn snapshot(&self, device: DeviceId) -> Option<DeviceSnapshot> {
        self.devices.get(&device).map(|s| DeviceSnapshot {
            note_hold: s.note_hold,
            volume_hold: s.volume_hold,
            sustain_on: s.sustain_on,
            octave_offset: s.octave_offset,
            last_volume: s.last_volume,
            current_note: s.current_note,
            sustained_note: s.sustained_note,
        })
    }
}
