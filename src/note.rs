//! Note-name handling for the `note`/`n` modifiers.

use lazy_static::lazy_static;
use std::collections::HashMap;

/// MIDI note number type
pub type MidiNote = u8;

lazy_static! {
    /// Note names to MIDI mapping, with sharp (`s`/`#`) and flat (`f`/`b`)
    /// spellings for every octave from -1 to 9.
    static ref NOTE_TO_MIDI: HashMap<String, MidiNote> = {
        let mut m = HashMap::new();
        let names: [(&str, i32); 21] = [
            ("c", 0),
            ("cs", 1), ("c#", 1), ("df", 1), ("db", 1),
            ("d", 2),
            ("ds", 3), ("d#", 3), ("ef", 3), ("eb", 3),
            ("e", 4),
            ("f", 5),
            ("fs", 6), ("f#", 6), ("gf", 6), ("gb", 6),
            ("g", 7),
            ("gs", 8), ("g#", 8), ("af", 8),
            ("a", 9),
        ];
        let more: [(&str, i32); 5] = [
            ("ab", 8),
            ("as", 10), ("a#", 10), ("bf", 10),
            ("b", 11),
        ];
        for octave in -1..=9 {
            let base = (octave + 1) * 12;
            for (name, pc) in names.iter().chain(more.iter()) {
                let midi = base + pc;
                if (0..=127).contains(&midi) {
                    m.insert(format!("{}{}", name, octave), midi as MidiNote);
                }
            }
        }
        m
    };
}

/// Parse a note name like `c3`, `as4` or `bf2` into a MIDI number. Names
/// without an octave sit in octave 5.
pub fn note_name_to_midi(name: &str) -> Option<f64> {
    let lower = name.to_lowercase();
    if let Some(&midi) = NOTE_TO_MIDI.get(&lower) {
        return Some(midi as f64);
    }
    // Bare pitch class, e.g. "c" or "fs"
    if lower.chars().next().map(|c| c.is_ascii_alphabetic()) == Some(true)
        && !lower.ends_with(|c: char| c.is_ascii_digit())
    {
        if let Some(&midi) = NOTE_TO_MIDI.get(&format!("{}5", lower)) {
            return Some(midi as f64);
        }
    }
    None
}

/// Interpret a token as a note value: a plain number passes through, a note
/// name goes through the table.
pub fn parse_note(token: &str) -> Option<f64> {
    if let Ok(n) = token.parse::<f64>() {
        return Some(n);
    }
    note_name_to_midi(token)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_note_names() {
        assert_eq!(note_name_to_midi("c-1"), Some(0.0));
        assert_eq!(note_name_to_midi("c3"), Some(48.0));
        assert_eq!(note_name_to_midi("a4"), Some(69.0));
        assert_eq!(note_name_to_midi("cs3"), Some(49.0));
        assert_eq!(note_name_to_midi("df3"), Some(49.0));
        assert_eq!(note_name_to_midi("bf2"), Some(46.0));
    }

    #[test]
    fn test_bare_pitch_class_defaults_to_octave_five() {
        assert_eq!(note_name_to_midi("c"), Some(72.0));
        assert_eq!(note_name_to_midi("fs"), Some(78.0));
    }

    #[test]
    fn test_parse_note_accepts_numbers() {
        assert_eq!(parse_note("12"), Some(12.0));
        assert_eq!(parse_note("e3"), Some(52.0));
        assert_eq!(parse_note("zzz"), None);
    }
}
