//! DSL binding layer: heterogeneous operator arguments and their uniform
//! coercion into patterns.
//!
//! Every operator delegate receives `Vec<DslArg>`. An argument may already
//! be a pattern, a mini-notation string, a bare number or boolean, a nested
//! list (sub-sequence or weighted `[duration, pattern]` pairs), a key→value
//! map, or a pattern transform. Whatever cannot be coerced is dropped with
//! a single diagnostic; construction never fails.

use crate::mini_notation::{parse_mini_notation_with, AtomFactory};
use crate::note::parse_note;
use crate::pattern::{Fraction, Pattern};
use crate::pattern_ops::Transform;
use crate::voice::{VoiceData, VoiceValue};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::warn;

/// A source-location hint for diagnostics, threaded through parsing and
/// coercion into each event's context trail.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceLoc {
    pub label: String,
    pub offset: usize,
}

impl SourceLoc {
    pub fn new(label: &str) -> Self {
        Self {
            label: label.to_string(),
            offset: 0,
        }
    }

    pub fn render(&self) -> String {
        format!("{}+{}", self.label, self.offset)
    }
}

/// Writes a coerced scalar into the voice field an operator controls.
pub type FieldWriter = fn(&mut VoiceData, &VoiceValue);

/// Default writer for bare atoms: numbers land in the generic value slot;
/// names set the sound (with `:index` split off) and keep the token as
/// value so selectors and truthiness still see it.
pub fn write_atom(data: &mut VoiceData, value: &VoiceValue) {
    match value {
        VoiceValue::Str(s) => {
            data.value = Some(value.clone());
            if let Some((name, idx)) = s.split_once(':') {
                data.sound = Some(name.to_string());
                data.sound_index = idx.parse().ok();
            } else {
                data.sound = Some(s.clone());
            }
        }
        other => data.value = Some(other.clone()),
    }
}

pub fn write_value(data: &mut VoiceData, value: &VoiceValue) {
    data.value = Some(value.clone());
}

pub fn write_sound(data: &mut VoiceData, value: &VoiceValue) {
    let s = value.as_string();
    if let Some((name, idx)) = s.split_once(':') {
        data.sound = Some(name.to_string());
        data.sound_index = idx.parse().ok();
    } else {
        data.sound = Some(s);
    }
}

pub fn write_note(data: &mut VoiceData, value: &VoiceValue) {
    data.note = match value {
        VoiceValue::Str(s) => parse_note(s),
        other => other.as_f64(),
    };
    if data.note.is_none() {
        warn!(target: "tactus::dsl", token = value.as_string().as_str(), "unparseable note name");
    }
}

/// A heterogeneous operator argument value.
#[derive(Clone)]
pub enum DslValue {
    Pattern(Pattern<VoiceData>),
    Str(String),
    Num(f64),
    Bool(bool),
    List(Vec<DslValue>),
    Map(Vec<(String, DslValue)>),
    Transform(Transform<VoiceData>),
}

impl std::fmt::Debug for DslValue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DslValue::Pattern(_) => write!(f, "Pattern(..)"),
            DslValue::Str(s) => write!(f, "Str({:?})", s),
            DslValue::Num(n) => write!(f, "Num({})", n),
            DslValue::Bool(b) => write!(f, "Bool({})", b),
            DslValue::List(items) => f.debug_tuple("List").field(items).finish(),
            DslValue::Map(entries) => f.debug_tuple("Map").field(entries).finish(),
            DslValue::Transform(_) => write!(f, "Transform(..)"),
        }
    }
}

/// An argument plus the place it came from.
#[derive(Debug, Clone)]
pub struct DslArg {
    pub value: DslValue,
    pub location: Option<SourceLoc>,
}

impl DslArg {
    pub fn new(value: DslValue) -> Self {
        Self {
            value,
            location: None,
        }
    }

    pub fn located(value: DslValue, location: SourceLoc) -> Self {
        Self {
            value,
            location: Some(location),
        }
    }
}

impl From<&str> for DslArg {
    fn from(s: &str) -> Self {
        DslArg::new(DslValue::Str(s.to_string()))
    }
}

impl From<f64> for DslArg {
    fn from(n: f64) -> Self {
        DslArg::new(DslValue::Num(n))
    }
}

impl From<i64> for DslArg {
    fn from(n: i64) -> Self {
        DslArg::new(DslValue::Num(n as f64))
    }
}

impl From<bool> for DslArg {
    fn from(b: bool) -> Self {
        DslArg::new(DslValue::Bool(b))
    }
}

impl From<Pattern<VoiceData>> for DslArg {
    fn from(p: Pattern<VoiceData>) -> Self {
        DslArg::new(DslValue::Pattern(p))
    }
}

/// Build a mini-notation atom factory around a field writer.
pub fn atom_factory(writer: FieldWriter) -> AtomFactory<VoiceData> {
    Arc::new(move |token: &str, loc: Option<&SourceLoc>| {
        let value = match token.parse::<f64>() {
            Ok(n) => VoiceValue::Num(n),
            Err(_) => VoiceValue::Str(token.to_string()),
        };
        let mut data = VoiceData::empty();
        writer(&mut data, &value);
        let pattern = Pattern::pure(data);
        match loc {
            Some(loc) => pattern.with_location(loc.render()),
            None => pattern,
        }
    })
}

/// Coerce one argument into a pattern through the operator's field writer.
/// Returns `None` (after one diagnostic) for arguments with no pattern
/// meaning.
pub fn coerce_pattern(arg: &DslArg, writer: FieldWriter) -> Option<Pattern<VoiceData>> {
    match &arg.value {
        DslValue::Pattern(p) => Some(p.clone()),
        DslValue::Str(s) => Some(parse_mini_notation_with(
            s,
            arg.location.clone(),
            atom_factory(writer),
        )),
        DslValue::Num(n) => {
            let mut data = VoiceData::empty();
            writer(&mut data, &VoiceValue::Num(*n));
            Some(Pattern::pure(data))
        }
        DslValue::Bool(b) => {
            let mut data = VoiceData::empty();
            writer(&mut data, &VoiceValue::Bool(*b));
            Some(Pattern::pure(data))
        }
        DslValue::List(items) => {
            if let Some(pairs) = weighted_entries(items, writer) {
                return Some(Pattern::timecat(pairs));
            }
            let children: Vec<Pattern<VoiceData>> = items
                .iter()
                .filter_map(|item| coerce_pattern(&DslArg::new(item.clone()), writer))
                .collect();
            if children.is_empty() {
                None
            } else {
                Some(Pattern::sequence(children))
            }
        }
        DslValue::Map(_) | DslValue::Transform(_) => {
            warn!(
                target: "tactus::dsl",
                location = arg.location.as_ref().map(|l| l.render()).unwrap_or_default().as_str(),
                "argument has no pattern meaning; dropped"
            );
            None
        }
    }
}

/// Recognise a list of weighted `[duration, pattern]` pairs. Only lists
/// whose every element leads with a number and follows with something
/// convertible qualify.
pub fn weighted_entries(
    items: &[DslValue],
    writer: FieldWriter,
) -> Option<Vec<(Fraction, Pattern<VoiceData>)>> {
    let mut pairs = Vec::with_capacity(items.len());
    for item in items {
        let DslValue::List(pair) = item else {
            return None;
        };
        if pair.len() != 2 {
            return None;
        }
        let DslValue::Num(duration) = &pair[0] else {
            return None;
        };
        let pattern = coerce_pattern(&DslArg::new(pair[1].clone()), writer)?;
        pairs.push((Fraction::from_float(*duration), pattern));
    }
    if pairs.is_empty() {
        None
    } else {
        Some(pairs)
    }
}

/// Coerce a run of arguments into one weighted sequence; unconvertible
/// arguments contribute nothing.
pub fn args_to_sequence(args: &[DslArg], writer: FieldWriter) -> Pattern<VoiceData> {
    let children: Vec<Pattern<VoiceData>> = args
        .iter()
        .filter_map(|arg| coerce_pattern(arg, writer))
        .collect();
    match children.len() {
        0 => Pattern::silence(),
        1 => children.into_iter().next().unwrap(),
        _ => Pattern::sequence(children),
    }
}

/// Read a numeric control from an argument: either a static number or a
/// pattern sampled for its numeric value.
pub fn coerce_control(arg: &DslArg) -> Option<Pattern<f64>> {
    match &arg.value {
        DslValue::Num(n) => {
            let n = *n;
            Some(Pattern::pure(n))
        }
        DslValue::Bool(b) => Some(Pattern::pure(if *b { 1.0 } else { 0.0 })),
        _ => {
            let pat = coerce_pattern(arg, write_value)?;
            Some(pat.fmap(|data| crate::pattern_pick::pick_index(data).unwrap_or(0.0)))
        }
    }
}

/// A static number when the argument is one, otherwise `None`; lets
/// operators keep the exact static path and fall back to the control-driven
/// path only for real pattern arguments.
pub fn static_number(arg: &DslArg) -> Option<f64> {
    match &arg.value {
        DslValue::Num(n) => Some(*n),
        DslValue::Bool(b) => Some(if *b { 1.0 } else { 0.0 }),
        DslValue::Str(s) => s.trim().parse().ok(),
        _ => None,
    }
}

/// How a pick-style operator reads its arguments: a leading list/map is the
/// lookup and the next argument the selector; otherwise everything but the
/// last argument forms the lookup.
pub enum LookupSpec {
    List(Vec<DslValue>),
    Map(Vec<(String, DslValue)>),
}

pub fn split_lookup_args(mut args: Vec<DslArg>) -> Option<(LookupSpec, DslArg)> {
    if args.len() < 2 {
        warn!(target: "tactus::dsl", "selection needs a lookup and a selector");
        return None;
    }
    match &args[0].value {
        DslValue::List(items) => {
            let items = items.clone();
            let selector = args.swap_remove(1);
            Some((LookupSpec::List(items), selector))
        }
        DslValue::Map(entries) => {
            let entries = entries.clone();
            let selector = args.swap_remove(1);
            Some((LookupSpec::Map(entries), selector))
        }
        _ => {
            let selector = args.pop().expect("len checked above");
            Some((
                LookupSpec::List(args.into_iter().map(|a| a.value).collect()),
                selector,
            ))
        }
    }
}
