//! Voice data: the per-event record of musical parameters.
//!
//! Every field is optional; combinators never mutate a record in place but
//! produce fresh ones, and `merge` lets a later layer shadow an earlier one
//! field by field.

use crate::pattern::Fraction;
use crate::pattern_structure::Truthy;
use serde::{Deserialize, Serialize};

/// A dynamically typed value carried in the generic `value` slot.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum VoiceValue {
    Num(f64),
    Str(String),
    Bool(bool),
    Seq(Vec<VoiceValue>),
    Rational(Fraction),
}

impl VoiceValue {
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            VoiceValue::Num(n) => Some(*n),
            VoiceValue::Str(s) => s.parse().ok(),
            VoiceValue::Bool(b) => Some(if *b { 1.0 } else { 0.0 }),
            VoiceValue::Rational(r) => Some(r.to_float()),
            VoiceValue::Seq(_) => None,
        }
    }

    pub fn as_string(&self) -> String {
        match self {
            VoiceValue::Num(n) => {
                if n.fract() == 0.0 && n.abs() < 1e15 {
                    format!("{}", *n as i64)
                } else {
                    format!("{}", n)
                }
            }
            VoiceValue::Str(s) => s.clone(),
            VoiceValue::Bool(b) => b.to_string(),
            VoiceValue::Rational(r) => format!("{}", r),
            VoiceValue::Seq(items) => items
                .iter()
                .map(|v| v.as_string())
                .collect::<Vec<_>>()
                .join(" "),
        }
    }
}

impl Truthy for VoiceValue {
    fn is_truthy(&self) -> bool {
        match self {
            VoiceValue::Num(n) => *n != 0.0,
            VoiceValue::Str(s) => s.is_truthy(),
            VoiceValue::Bool(b) => *b,
            VoiceValue::Rational(r) => *r != Fraction::ZERO,
            VoiceValue::Seq(items) => !items.is_empty(),
        }
    }
}

impl From<f64> for VoiceValue {
    fn from(n: f64) -> Self {
        VoiceValue::Num(n)
    }
}

impl From<bool> for VoiceValue {
    fn from(b: bool) -> Self {
        VoiceValue::Bool(b)
    }
}

impl From<&str> for VoiceValue {
    fn from(s: &str) -> Self {
        VoiceValue::Str(s.to_string())
    }
}

impl From<Fraction> for VoiceValue {
    fn from(r: Fraction) -> Self {
        VoiceValue::Rational(r)
    }
}

/// The record of optional musical parameters attached to every event.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct VoiceData {
    // Pitch
    pub note: Option<f64>,
    pub freq: Option<f64>,
    pub octave: Option<f64>,
    pub detune: Option<f64>,
    pub scale: Option<String>,
    pub chord: Option<String>,

    // Sample selection
    pub sound: Option<String>,
    pub bank: Option<String>,
    pub sound_index: Option<i64>,
    pub channel: Option<i64>,
    pub unit: Option<String>,

    // Level and placement
    pub gain: Option<f64>,
    pub amp: Option<f64>,
    pub velocity: Option<f64>,
    pub pan: Option<f64>,
    pub legato: Option<f64>,
    pub sustain: Option<f64>,

    // Amplitude envelope
    pub attack: Option<f64>,
    pub decay: Option<f64>,
    pub env_sustain: Option<f64>,
    pub release: Option<f64>,
    pub hold: Option<f64>,

    // Low-pass filter
    pub cutoff: Option<f64>,
    pub resonance: Option<f64>,
    pub lpattack: Option<f64>,
    pub lpdecay: Option<f64>,
    pub lpsustain: Option<f64>,
    pub lprelease: Option<f64>,
    pub lpenv: Option<f64>,

    // High-pass filter
    pub hcutoff: Option<f64>,
    pub hresonance: Option<f64>,
    pub hpattack: Option<f64>,
    pub hpdecay: Option<f64>,
    pub hpsustain: Option<f64>,
    pub hprelease: Option<f64>,
    pub hpenv: Option<f64>,

    // Band-pass filter
    pub bandf: Option<f64>,
    pub bandq: Option<f64>,
    pub bpattack: Option<f64>,
    pub bpdecay: Option<f64>,
    pub bpsustain: Option<f64>,
    pub bprelease: Option<f64>,
    pub bpenv: Option<f64>,

    // Notch filter
    pub notchf: Option<f64>,
    pub notchq: Option<f64>,
    pub npattack: Option<f64>,
    pub npdecay: Option<f64>,
    pub npsustain: Option<f64>,
    pub nprelease: Option<f64>,
    pub npenv: Option<f64>,

    // Formant selector, e.g. "tenor:a" or just "a"
    pub vowel: Option<String>,

    // Delay send
    pub delay: Option<f64>,
    pub delaytime: Option<f64>,
    pub delayfeedback: Option<f64>,

    // Reverb send
    pub room: Option<f64>,
    pub size: Option<f64>,
    pub dry: Option<f64>,
    pub orbit: Option<i64>,

    // Sample manipulation
    pub speed: Option<f64>,
    pub begin: Option<f64>,
    pub end: Option<f64>,
    pub accelerate: Option<f64>,
    pub coarse: Option<i64>,
    pub crush: Option<f64>,
    pub shape: Option<f64>,
    pub squiz: Option<f64>,
    pub cut: Option<i64>,
    pub loop_count: Option<f64>,
    pub nudge: Option<f64>,

    // Generic value slot used by selectors and bare atoms
    pub value: Option<VoiceValue>,
}

macro_rules! merge_fields {
    ($a:expr, $b:expr, { $($field:ident),* $(,)? }) => {
        VoiceData {
            $($field: $b.$field.clone().or_else(|| $a.$field.clone()),)*
        }
    };
}

impl VoiceData {
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }

    /// Right-biased merge: fields of `other` shadow fields of `self`.
    pub fn merge(&self, other: &VoiceData) -> VoiceData {
        merge_fields!(self, other, {
            note, freq, octave, detune, scale, chord,
            sound, bank, sound_index, channel, unit,
            gain, amp, velocity, pan, legato, sustain,
            attack, decay, env_sustain, release, hold,
            cutoff, resonance, lpattack, lpdecay, lpsustain, lprelease, lpenv,
            hcutoff, hresonance, hpattack, hpdecay, hpsustain, hprelease, hpenv,
            bandf, bandq, bpattack, bpdecay, bpsustain, bprelease, bpenv,
            notchf, notchq, npattack, npdecay, npsustain, nprelease, npenv,
            vowel,
            delay, delaytime, delayfeedback,
            room, size, dry, orbit,
            speed, begin, end, accelerate, coarse, crush, shape, squiz, cut,
            loop_count, nudge,
            value,
        })
    }

    pub fn with_sound(mut self, sound: &str) -> Self {
        self.sound = Some(sound.to_string());
        self
    }

    pub fn with_sound_index(mut self, index: i64) -> Self {
        self.sound_index = Some(index);
        self
    }

    pub fn with_note(mut self, note: f64) -> Self {
        self.note = Some(note);
        self
    }

    pub fn with_value(mut self, value: VoiceValue) -> Self {
        self.value = Some(value);
        self
    }
}

impl Truthy for VoiceData {
    /// A voice is falsy only when its generic value says so; an event with
    /// no value slot still gates as a hit.
    fn is_truthy(&self) -> bool {
        self.value.as_ref().map(|v| v.is_truthy()).unwrap_or(true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_merge_right_bias() {
        let a = VoiceData::empty().with_sound("bd").with_note(3.0);
        let b = VoiceData::empty().with_note(7.0);
        let merged = a.merge(&b);
        assert_eq!(merged.note, Some(7.0));
        assert_eq!(merged.sound.as_deref(), Some("bd"));
    }

    #[test]
    fn test_merge_empty_is_identity() {
        let v = VoiceData::empty()
            .with_sound("sn")
            .with_value(VoiceValue::Num(2.0));
        assert_eq!(VoiceData::empty().merge(&v), v);
        assert_eq!(v.merge(&VoiceData::empty()), v);
    }

    #[test]
    fn test_value_truthiness() {
        assert!(VoiceValue::Num(1.0).is_truthy());
        assert!(!VoiceValue::Num(0.0).is_truthy());
        assert!(!VoiceValue::Bool(false).is_truthy());
        assert!(!VoiceValue::Str("~".into()).is_truthy());
        assert!(!VoiceValue::Str("f".into()).is_truthy());
        assert!(VoiceValue::Str("bd".into()).is_truthy());
        assert!(VoiceData::empty().is_truthy());
        assert!(!VoiceData::empty()
            .with_value(VoiceValue::Bool(false))
            .is_truthy());
    }

    #[test]
    fn test_value_coercions() {
        assert_eq!(VoiceValue::Str("3.5".into()).as_f64(), Some(3.5));
        assert_eq!(VoiceValue::Bool(true).as_f64(), Some(1.0));
        assert_eq!(VoiceValue::Num(2.0).as_string(), "2");
        assert_eq!(VoiceValue::Rational(Fraction::new(1, 2)).as_string(), "1/2");
    }
}
