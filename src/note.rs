//! Note name resolution
//!
//! Maps pitch tokens to MIDI note numbers: either a note name (letter A-G,
//! optional `#`/`b` accidental, signed octave) or a bare integer. C-1 is
//! pitch 0, C4 is 60. Results always clamp to 0..=127.

/// Resolve a pitch token to a clamped MIDI note number.
///
/// Returns `None` for tokens that are neither a note name nor an integer.
/// Callers are expected to have validated the token shape already (the wire
/// grammar does); there is no fallback default.
pub fn resolve(token: &str) -> Option<u8> {
    let mut chars = token.chars();
    let first = chars.next()?;

    if first.is_ascii_digit() || first == '-' || first == '+' {
        let n: i32 = token.parse().ok()?;
        return Some(n.clamp(0, 127) as u8);
    }

    let class: i32 = match first.to_ascii_uppercase() {
        'C' => 0,
        'D' => 2,
        'E' => 4,
        'F' => 5,
        'G' => 7,
        'A' => 9,
        'B' => 11,
        _ => return None,
    };

    let rest = chars.as_str();
    let (accidental, octave_str) = match rest.as_bytes().first() {
        Some(b'#') => (1, &rest[1..]),
        Some(b'b') => (-1, &rest[1..]),
        _ => (0, rest),
    };

    let digits = octave_str.strip_prefix('-').unwrap_or(octave_str);
    if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    let octave: i32 = octave_str.parse().ok()?;

    let pitch = 12 * (octave + 1) + class + accidental;
    Some(pitch.clamp(0, 127) as u8)
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_reference_pitches() {
        assert_eq!(resolve("C4"), Some(60));
        assert_eq!(resolve("C-1"), Some(0));
        assert_eq!(resolve("C#4"), Some(61));
        assert_eq!(resolve("Db4"), Some(61));
        assert_eq!(resolve("A4"), Some(69));
        assert_eq!(resolve("G9"), Some(127));
    }

    #[test]
    fn test_case_insensitive_letters() {
        assert_eq!(resolve("a4"), Some(69));
        assert_eq!(resolve("f#5"), Some(78));
    }

    #[test]
    fn test_name_clamping() {
        // B9 = 131 before clamping
        assert_eq!(resolve("B9"), Some(127));
        // Cb-1 = -1 before clamping
        assert_eq!(resolve("Cb-1"), Some(0));
    }

    #[test]
    fn test_numeric_tokens() {
        assert_eq!(resolve("60"), Some(60));
        assert_eq!(resolve("0"), Some(0));
        assert_eq!(resolve("200"), Some(127));
        assert_eq!(resolve("-5"), Some(0));
    }

    #[test]
    fn test_rejects_garbage() {
        for token in ["", "H4", "C", "C#", "Cb", "4C", "C#x", "C4.5", "Cbb4"] {
            assert_eq!(resolve(token), None, "should reject: {:?}", token);
        }
    }

    proptest! {
        #[test]
        fn numeric_tokens_always_clamp(n in -1000i32..1000) {
            let pitch = resolve(&n.to_string()).unwrap();
            prop_assert!(pitch <= 127);
            if (0..=127).contains(&n) {
                prop_assert_eq!(pitch as i32, n);
            }
        }
    }
}
