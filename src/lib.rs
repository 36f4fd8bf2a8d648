//! Glove Bridge - wearable gesture controllers to MIDI
//!
//! Reads the ASCII line protocol emitted by the gesture controller boards
//! (one serial stream per device), runs each device through a note-hold /
//! sustain / octave / volume-hold state machine, and emits MIDI note and
//! controller messages to a synthesizer port.
//!
//! Data flow: [`transport`] reads raw lines, [`protocol`] parses them into
//! typed events, the [`processor`] actor serializes them through the
//! [`engine`] state machine, and the resulting [`midi`] actions go out
//! through the configured sink.

pub mod config;
pub mod engine;
pub mod midi;
pub mod note;
pub mod processor;
pub mod protocol;
pub mod transport;
