//! Glove wire protocol parser
//!
//! Parses the comma-delimited ASCII line protocol emitted by the gesture
//! controllers into typed events. Matching is strict: exact field counts,
//! no whitespace tolerance, bounded decimals. A line either matches exactly
//! one message shape or is rejected whole.
//!
//! ```text
//! B,<dev>,NH,<0|1>        Note Hold (momentary)
//! B,<dev>,VH,<0|1>        Volume/FX Hold (momentary)
//! B,<dev>,SUS,<0|1>       Sustain (absolute state)
//! B,<dev>,OCT,<+/-N>      Octave step, N is 1-2 digits
//! B,<dev>,PANIC,1         Force sustain off
//! P,<dev>,<note>          Pitch (note name like C4/F#5/Db3, or 0..127)
//! V,<dev>,<0-127>         Volume, also velocity for future notes
//! E,<dev>,<PARAM>,<0-127> FX macro, PARAM in {CUT,RESO,REV,DEL,MOD,PAN}
//! ```

use thiserror::Error;

use crate::note;

/// Identifier of one physical controller (1-3 decimal digits on the wire).
pub type DeviceId = u16;

/// Enumerated FX macro parameters with their fixed controller ids.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EffectParam {
    Cutoff,
    Resonance,
    Reverb,
    Delay,
    Modulation,
    Pan,
}

impl EffectParam {
    /// Parse a wire token (exact, uppercase) into a parameter.
    pub fn from_token(token: &str) -> Option<Self> {
        match token {
            "CUT" => Some(EffectParam::Cutoff),
            "RESO" => Some(EffectParam::Resonance),
            "REV" => Some(EffectParam::Reverb),
            "DEL" => Some(EffectParam::Delay),
            "MOD" => Some(EffectParam::Modulation),
            "PAN" => Some(EffectParam::Pan),
            _ => None,
        }
    }

    /// Fixed MIDI controller id for this parameter.
    pub fn controller(self) -> u8 {
        match self {
            EffectParam::Cutoff => 74,
            EffectParam::Resonance => 71,
            EffectParam::Reverb => 91,
            EffectParam::Delay => 94,
            EffectParam::Modulation => 1,
            EffectParam::Pan => 10,
        }
    }
}

/// One validated protocol message.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GloveEvent {
    NoteHold { device: DeviceId, held: bool },
    VolumeHold { device: DeviceId, held: bool },
    Sustain { device: DeviceId, on: bool },
    OctaveStep { device: DeviceId, octaves: i8 },
    Panic { device: DeviceId },
    Pitch { device: DeviceId, pitch: u8 },
    Volume { device: DeviceId, value: u8 },
    Effect { device: DeviceId, param: EffectParam, value: u8 },
}

impl GloveEvent {
    /// Device the event addresses.
    pub fn device(&self) -> DeviceId {
        match *self {
            GloveEvent::NoteHold { device, .. }
            | GloveEvent::VolumeHold { device, .. }
            | GloveEvent::Sustain { device, .. }
            | GloveEvent::OctaveStep { device, .. }
            | GloveEvent::Panic { device }
            | GloveEvent::Pitch { device, .. }
            | GloveEvent::Volume { device, .. }
            | GloveEvent::Effect { device, .. } => device,
        }
    }
}

/// Why a line was rejected. Rejected lines are dropped by callers; they
/// never mutate device state.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ParseError {
    #[error("empty line")]
    Empty,
    #[error("line does not match any message shape")]
    UnknownShape,
    #[error("invalid device id '{0}'")]
    InvalidDevice(String),
    #[error("invalid state flag '{0}' (expected 0 or 1)")]
    InvalidFlag(String),
    #[error("invalid octave delta '{0}'")]
    InvalidDelta(String),
    #[error("value '{0}' is not a decimal in 0..=127")]
    InvalidValue(String),
    #[error("unknown effect parameter '{0}'")]
    UnknownParam(String),
    #[error("invalid note token '{0}'")]
    InvalidNote(String),
}

/// Parse one line (without its trailing newline) into a typed event.
pub fn parse_line(line: &str) -> Result<GloveEvent, ParseError> {
    let line = line.strip_suffix('\r').unwrap_or(line);
    if line.is_empty() {
        return Err(ParseError::Empty);
    }

    let fields: Vec<&str> = line.split(',').collect();
    match fields.as_slice() {
        ["B", dev, "NH", state] => Ok(GloveEvent::NoteHold {
            device: parse_device(dev)?,
            held: parse_flag(state)?,
        }),
        ["B", dev, "VH", state] => Ok(GloveEvent::VolumeHold {
            device: parse_device(dev)?,
            held: parse_flag(state)?,
        }),
        ["B", dev, "SUS", state] => Ok(GloveEvent::Sustain {
            device: parse_device(dev)?,
            on: parse_flag(state)?,
        }),
        ["B", dev, "OCT", delta] => Ok(GloveEvent::OctaveStep {
            device: parse_device(dev)?,
            octaves: parse_delta(delta)?,
        }),
        ["B", dev, "PANIC", "1"] => Ok(GloveEvent::Panic {
            device: parse_device(dev)?,
        }),
        ["P", dev, token] => Ok(GloveEvent::Pitch {
            device: parse_device(dev)?,
            pitch: parse_pitch(token)?,
        }),
        ["V", dev, value] => Ok(GloveEvent::Volume {
            device: parse_device(dev)?,
            value: parse_value(value)?,
        }),
        ["E", dev, param, value] => Ok(GloveEvent::Effect {
            device: parse_device(dev)?,
            param: EffectParam::from_token(param)
                .ok_or_else(|| ParseError::UnknownParam((*param).to_string()))?,
            value: parse_value(value)?,
        }),
        _ => Err(ParseError::UnknownShape),
    }
}

/// Device id: 1-3 decimal digits.
fn parse_device(s: &str) -> Result<DeviceId, ParseError> {
    if (1..=3).contains(&s.len()) && s.bytes().all(|b| b.is_ascii_digit()) {
        s.parse()
            .map_err(|_| ParseError::InvalidDevice(s.to_string()))
    } else {
        Err(ParseError::InvalidDevice(s.to_string()))
    }
}

/// Binary state flag: exactly "0" or "1".
fn parse_flag(s: &str) -> Result<bool, ParseError> {
    match s {
        "0" => Ok(false),
        "1" => Ok(true),
        _ => Err(ParseError::InvalidFlag(s.to_string())),
    }
}

/// Octave delta: optional sign, then 1-2 digits.
fn parse_delta(s: &str) -> Result<i8, ParseError> {
    let digits = s.strip_prefix(['+', '-']).unwrap_or(s);
    if (1..=2).contains(&digits.len()) && digits.bytes().all(|b| b.is_ascii_digit()) {
        s.parse()
            .map_err(|_| ParseError::InvalidDelta(s.to_string()))
    } else {
        Err(ParseError::InvalidDelta(s.to_string()))
    }
}

/// Bounded value: decimal 0..=127 written without sign or padding
/// (two digits max unless in 100..=127).
fn parse_value(s: &str) -> Result<u8, ParseError> {
    let reject = || ParseError::InvalidValue(s.to_string());
    if s.is_empty() || s.len() > 3 || !s.bytes().all(|b| b.is_ascii_digit()) {
        return Err(reject());
    }
    let value: u16 = s.parse().map_err(|_| reject())?;
    if value > 127 || (s.len() == 3 && value < 100) {
        return Err(reject());
    }
    Ok(value as u8)
}

/// Pitch token: a note name (letter first), or an unsigned bounded numeric
/// pitch. Signed integers are not part of the wire grammar.
fn parse_pitch(token: &str) -> Result<u8, ParseError> {
    let reject = || ParseError::InvalidNote(token.to_string());
    match token.bytes().next() {
        Some(b) if b.is_ascii_digit() => parse_value(token).map_err(|_| reject()),
        Some(b) if (b'A'..=b'G').contains(&b.to_ascii_uppercase()) => {
            note::resolve(token).ok_or_else(reject)
        }
        _ => Err(reject()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_button_messages() {
        assert_eq!(
            parse_line("B,1,NH,1").unwrap(),
            GloveEvent::NoteHold { device: 1, held: true }
        );
        assert_eq!(
            parse_line("B,1,NH,0").unwrap(),
            GloveEvent::NoteHold { device: 1, held: false }
        );
        assert_eq!(
            parse_line("B,2,VH,1").unwrap(),
            GloveEvent::VolumeHold { device: 2, held: true }
        );
        assert_eq!(
            parse_line("B,1,SUS,1").unwrap(),
            GloveEvent::Sustain { device: 1, on: true }
        );
        assert_eq!(
            parse_line("B,1,OCT,+1").unwrap(),
            GloveEvent::OctaveStep { device: 1, octaves: 1 }
        );
        assert_eq!(
            parse_line("B,1,OCT,-1").unwrap(),
            GloveEvent::OctaveStep { device: 1, octaves: -1 }
        );
        assert_eq!(
            parse_line("B,1,OCT,12").unwrap(),
            GloveEvent::OctaveStep { device: 1, octaves: 12 }
        );
        assert_eq!(
            parse_line("B,1,PANIC,1").unwrap(),
            GloveEvent::Panic { device: 1 }
        );
    }

    #[test]
    fn test_value_messages() {
        assert_eq!(
            parse_line("P,1,C5").unwrap(),
            GloveEvent::Pitch { device: 1, pitch: 72 }
        );
        assert_eq!(
            parse_line("P,1,73").unwrap(),
            GloveEvent::Pitch { device: 1, pitch: 73 }
        );
        assert_eq!(
            parse_line("V,2,96").unwrap(),
            GloveEvent::Volume { device: 2, value: 96 }
        );
        assert_eq!(
            parse_line("E,2,CUT,74").unwrap(),
            GloveEvent::Effect {
                device: 2,
                param: EffectParam::Cutoff,
                value: 74
            }
        );
        assert_eq!(
            parse_line("E,2,PAN,64").unwrap(),
            GloveEvent::Effect {
                device: 2,
                param: EffectParam::Pan,
                value: 64
            }
        );
    }

    #[test]
    fn test_device_id_bounds() {
        assert_eq!(parse_line("V,999,10").unwrap().device(), 999);
        assert!(matches!(
            parse_line("V,1234,10"),
            Err(ParseError::InvalidDevice(_))
        ));
        assert!(matches!(
            parse_line("V,-1,10"),
            Err(ParseError::InvalidDevice(_))
        ));
    }

    #[test]
    fn test_rejects_malformed_lines() {
        for line in [
            "",
            "X,1,2",
            "B,1,SUS",
            "B,1,NH,2",
            "B,1,NH,1,extra",
            "B,1,PANIC,0",
            "B,1,OCT,+100",
            "B,1,OCT,",
            "P,1,H4",
            "P,1,999",
            "P,1,-5",
            "P,1,+60",
            "V,1,128",
            "V,1,007",
            "V,1, 96",
            "E,1,FOO,10",
            "E,1,REV,200",
            "E,1,REV",
        ] {
            assert!(parse_line(line).is_err(), "should reject: {:?}", line);
        }
    }

    #[test]
    fn test_no_leading_zero_padding() {
        // Matches the strict wire grammar: 3-digit values must be 100..=127.
        assert!(parse_line("V,1,007").is_err());
        assert_eq!(
            parse_line("V,1,00").unwrap(),
            GloveEvent::Volume { device: 1, value: 0 }
        );
        assert_eq!(
            parse_line("V,1,127").unwrap(),
            GloveEvent::Volume { device: 1, value: 127 }
        );
    }

    #[test]
    fn test_signed_numeric_pitch_rejected() {
        // Bare integer pitches are unsigned on the wire; the resolver's
        // clamping numeric branch must not be reachable through the grammar.
        assert!(matches!(
            parse_line("P,1,-5"),
            Err(ParseError::InvalidNote(_))
        ));
        assert!(matches!(
            parse_line("P,1,+60"),
            Err(ParseError::InvalidNote(_))
        ));
    }

    #[test]
    fn test_crlf_tolerated() {
        assert_eq!(
            parse_line("B,1,NH,1\r").unwrap(),
            GloveEvent::NoteHold { device: 1, held: true }
        );
    }

    #[test]
    fn test_effect_param_controllers() {
        assert_eq!(EffectParam::Cutoff.controller(), 74);
        assert_eq!(EffectParam::Resonance.controller(), 71);
        assert_eq!(EffectParam::Pan.controller(), 10);
        assert_eq!(EffectParam::Reverb.controller(), 91);
        assert_eq!(EffectParam::Delay.controller(), 94);
        assert_eq!(EffectParam::Modulation.controller(), 1);
    }
}
