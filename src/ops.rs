//! User-facing operator facade.
//!
//! Every operator exists three ways: as a top-level function here, as a
//! pattern method, and as a string method (which parses the string first).
//! All three share one delegate, registered under the operator's name in
//! the process-wide symbol registry for external script interpreters.

use crate::dsl::{
    args_to_sequence, coerce_control, coerce_pattern, split_lookup_args, static_number,
    weighted_entries, write_atom, write_note, write_sound, write_value, DslArg, DslValue,
    FieldWriter, LookupSpec,
};
use crate::pattern::{Fraction, Pattern};
use crate::pattern_ops::{guard_transform, Transform};
use crate::pattern_pick::PickJoin;
use crate::registry;
use crate::voice::{VoiceData, VoiceValue};
use std::collections::HashMap;
use std::sync::Arc;
use tracing::warn;

// ============= Argument helpers =============

fn arg_source(args: &[DslArg]) -> Pattern<VoiceData> {
    args.first()
        .and_then(|a| coerce_pattern(a, write_atom))
        .unwrap_or_else(Pattern::silence)
}

fn arg_number(args: &[DslArg], index: usize, default: f64) -> f64 {
    args.get(index).and_then(static_number).unwrap_or(default)
}

fn arg_fraction(args: &[DslArg], index: usize, default: Fraction) -> Fraction {
    args.get(index)
        .and_then(static_number)
        .map(Fraction::from_float)
        .unwrap_or(default)
}

fn arg_int(args: &[DslArg], index: usize, default: i64) -> i64 {
    args.get(index)
        .and_then(static_number)
        .map(|n| n.floor() as i64)
        .unwrap_or(default)
}

fn arg_transform(args: &[DslArg], index: usize) -> Option<Transform<VoiceData>> {
    match args.get(index).map(|a| &a.value) {
        Some(DslValue::Transform(f)) => Some(f.clone()),
        _ => {
            warn!(target: "tactus::ops", index, "expected a transform argument");
            None
        }
    }
}

/// Static path when the argument is a plain number, control-driven path
/// (through an inner join) when it is a pattern. The two agree whenever the
/// control is an atom.
fn with_numeric_control(
    source: Pattern<VoiceData>,
    arg: Option<&DslArg>,
    default: f64,
    f: impl Fn(Pattern<VoiceData>, f64) -> Pattern<VoiceData> + Send + Sync + 'static,
) -> Pattern<VoiceData> {
    let Some(arg) = arg else {
        return f(source, default);
    };
    if let Some(n) = static_number(arg) {
        return f(source, n);
    }
    match coerce_control(arg) {
        Some(ctrl) => {
            let f = Arc::new(f);
            ctrl.fmap(move |k| f(source.clone(), *k)).inner_join()
        }
        None => f(source, default),
    }
}

// ============= Sequencing operators =============

pub fn seq(args: Vec<DslArg>) -> Pattern<VoiceData> {
    args_to_sequence(&args, write_atom)
}

pub fn stack(args: Vec<DslArg>) -> Pattern<VoiceData> {
    Pattern::stack(
        args.iter()
            .filter_map(|a| coerce_pattern(a, write_atom))
            .collect(),
    )
}

pub fn cat(args: Vec<DslArg>) -> Pattern<VoiceData> {
    Pattern::slowcat(
        args.iter()
            .filter_map(|a| coerce_pattern(a, write_atom))
            .collect(),
    )
}

pub fn fastcat(args: Vec<DslArg>) -> Pattern<VoiceData> {
    Pattern::fastcat(
        args.iter()
            .filter_map(|a| coerce_pattern(a, write_atom))
            .collect(),
    )
}

fn pair_entries(args: &[DslArg]) -> Vec<(Fraction, Pattern<VoiceData>)> {
    // Either one list of [duration, pattern] pairs, or the pairs spread
    // across the argument list
    let values: Vec<DslValue> = match args {
        [DslArg {
            value: DslValue::List(items),
            ..
        }] if weighted_entries(items, write_atom).is_some() => items.clone(),
        _ => args.iter().map(|a| a.value.clone()).collect(),
    };
    weighted_entries(&values, write_atom).unwrap_or_else(|| {
        warn!(target: "tactus::ops", "expected [duration, pattern] pairs");
        Vec::new()
    })
}

pub fn arrange(args: Vec<DslArg>) -> Pattern<VoiceData> {
    Pattern::arrange(pair_entries(&args))
}

pub fn stepcat(args: Vec<DslArg>) -> Pattern<VoiceData> {
    Pattern::timecat(pair_entries(&args))
}

pub fn silence(_args: Vec<DslArg>) -> Pattern<VoiceData> {
    Pattern::silence()
}

// ============= Time operators =============

pub fn fast(args: Vec<DslArg>) -> Pattern<VoiceData> {
    with_numeric_control(arg_source(&args), args.get(1), 2.0, |p, k| {
        p.fast(Fraction::from_float(k))
    })
}

pub fn slow(args: Vec<DslArg>) -> Pattern<VoiceData> {
    with_numeric_control(arg_source(&args), args.get(1), 2.0, |p, k| {
        p.slow(Fraction::from_float(k))
    })
}

pub fn early(args: Vec<DslArg>) -> Pattern<VoiceData> {
    with_numeric_control(arg_source(&args), args.get(1), 0.0, |p, k| {
        p.early(Fraction::from_float(k))
    })
}

pub fn late(args: Vec<DslArg>) -> Pattern<VoiceData> {
    with_numeric_control(arg_source(&args), args.get(1), 0.0, |p, k| {
        p.late(Fraction::from_float(k))
    })
}

pub fn rev(args: Vec<DslArg>) -> Pattern<VoiceData> {
    arg_source(&args).rev()
}

pub fn palindrome(args: Vec<DslArg>) -> Pattern<VoiceData> {
    arg_source(&args).palindrome()
}

pub fn iter(args: Vec<DslArg>) -> Pattern<VoiceData> {
    arg_source(&args).iter(arg_int(&args, 1, 4))
}

pub fn iter_back(args: Vec<DslArg>) -> Pattern<VoiceData> {
    arg_source(&args).iter_back(arg_int(&args, 1, 4))
}

pub fn ply(args: Vec<DslArg>) -> Pattern<VoiceData> {
    arg_source(&args).ply(arg_int(&args, 1, 2))
}

pub fn repeat_cycles(args: Vec<DslArg>) -> Pattern<VoiceData> {
    arg_source(&args).repeat_cycles(arg_int(&args, 1, 2))
}

// ============= Conditional / layering operators =============

pub fn every(args: Vec<DslArg>) -> Pattern<VoiceData> {
    let source = arg_source(&args);
    let n = arg_int(&args, 1, 2);
    match arg_transform(&args, 2) {
        Some(f) => source.every(n, f),
        None => source,
    }
}

pub fn off(args: Vec<DslArg>) -> Pattern<VoiceData> {
    let source = arg_source(&args);
    let delta = arg_fraction(&args, 1, Fraction::new(1, 4));
    match arg_transform(&args, 2) {
        Some(f) => source.off(delta, f),
        None => source,
    }
}

pub fn superimpose(args: Vec<DslArg>) -> Pattern<VoiceData> {
    let source = arg_source(&args);
    match arg_transform(&args, 1) {
        Some(f) => source.superimpose(f),
        None => source,
    }
}

pub fn layer(args: Vec<DslArg>) -> Pattern<VoiceData> {
    let source = arg_source(&args);
    let fs: Vec<Transform<VoiceData>> = args
        .iter()
        .skip(1)
        .filter_map(|a| match &a.value {
            DslValue::Transform(f) => Some(f.clone()),
            _ => None,
        })
        .collect();
    if fs.is_empty() {
        source
    } else {
        source.layer(fs)
    }
}

pub fn jux(args: Vec<DslArg>) -> Pattern<VoiceData> {
    let source = arg_source(&args);
    match arg_transform(&args, 1) {
        Some(f) => source.jux(f),
        None => source,
    }
}

pub fn within(args: Vec<DslArg>) -> Pattern<VoiceData> {
    let source = arg_source(&args);
    let begin = arg_fraction(&args, 1, Fraction::ZERO);
    let end = arg_fraction(&args, 2, Fraction::new(1, 2));
    match arg_transform(&args, 3) {
        Some(f) => source.within(begin, end, f),
        None => source,
    }
}

pub fn chunk(args: Vec<DslArg>) -> Pattern<VoiceData> {
    let source = arg_source(&args);
    let n = arg_int(&args, 1, 4);
    match arg_transform(&args, 2) {
        Some(f) => source.chunk(n, f),
        None => source,
    }
}

pub fn chunk_back(args: Vec<DslArg>) -> Pattern<VoiceData> {
    let source = arg_source(&args);
    let n = arg_int(&args, 1, 4);
    match arg_transform(&args, 2) {
        Some(f) => source.chunk_back(n, f),
        None => source,
    }
}

pub fn degrade(args: Vec<DslArg>) -> Pattern<VoiceData> {
    arg_source(&args).degrade()
}

pub fn degrade_by(args: Vec<DslArg>) -> Pattern<VoiceData> {
    let p = arg_number(&args, 1, 0.5);
    arg_source(&args).degrade_by(p)
}

pub fn sometimes(args: Vec<DslArg>) -> Pattern<VoiceData> {
    let source = arg_source(&args);
    match arg_transform(&args, 1) {
        Some(f) => source.sometimes(f),
        None => source,
    }
}

pub fn sometimes_by(args: Vec<DslArg>) -> Pattern<VoiceData> {
    let source = arg_source(&args);
    let p = arg_number(&args, 1, 0.5);
    match arg_transform(&args, 2) {
        Some(f) => source.sometimes_by(p, f),
        None => source,
    }
}

// ============= Structure operators =============

fn gate_arg(args: &[DslArg], index: usize) -> Pattern<VoiceData> {
    args.get(index)
        .and_then(|a| coerce_pattern(a, write_atom))
        .unwrap_or_else(Pattern::silence)
}

pub fn struct_op(args: Vec<DslArg>) -> Pattern<VoiceData> {
    let gate = gate_arg(&args, 1);
    arg_source(&args).struct_with(gate)
}

pub fn struct_all(args: Vec<DslArg>) -> Pattern<VoiceData> {
    let gate = gate_arg(&args, 1);
    arg_source(&args).struct_all(gate)
}

pub fn mask(args: Vec<DslArg>) -> Pattern<VoiceData> {
    let gate = gate_arg(&args, 1);
    arg_source(&args).mask(gate)
}

pub fn mask_all(args: Vec<DslArg>) -> Pattern<VoiceData> {
    let gate = gate_arg(&args, 1);
    arg_source(&args).mask_all(gate)
}

pub fn invert(args: Vec<DslArg>) -> Pattern<VoiceData> {
    arg_source(&args).invert_values()
}

// ============= Windowing operators =============

pub fn zoom(args: Vec<DslArg>) -> Pattern<VoiceData> {
    let source = arg_source(&args);
    let both_static = args
        .get(1)
        .map(|a| static_number(a).is_some())
        .unwrap_or(true)
        && args
            .get(2)
            .map(|a| static_number(a).is_some())
            .unwrap_or(true);
    if both_static {
        let begin = arg_fraction(&args, 1, Fraction::ZERO);
        let end = arg_fraction(&args, 2, Fraction::ONE);
        source.zoom(begin, end)
    } else {
        let begin = args
            .get(1)
            .and_then(coerce_control)
            .unwrap_or_else(|| Pattern::pure(0.0));
        let end = args
            .get(2)
            .and_then(coerce_control)
            .unwrap_or_else(|| Pattern::pure(1.0));
        source.zoom_with(begin, end)
    }
}

pub fn bite(args: Vec<DslArg>) -> Pattern<VoiceData> {
    let source = arg_source(&args);
    let n = arg_int(&args, 1, 4);
    let indices = args
        .get(2)
        .and_then(|a| coerce_pattern(a, write_value))
        .map(|p| p.fmap(|d| crate::pattern_pick::pick_index(d).unwrap_or(0.0)))
        .unwrap_or_else(Pattern::silence);
    source.bite(n, indices)
}

pub fn segment(args: Vec<DslArg>) -> Pattern<VoiceData> {
    arg_source(&args).segment(arg_int(&args, 1, 4))
}

pub fn linger(args: Vec<DslArg>) -> Pattern<VoiceData> {
    arg_source(&args).linger(arg_fraction(&args, 1, Fraction::new(1, 4)))
}

pub fn ribbon(args: Vec<DslArg>) -> Pattern<VoiceData> {
    let source = arg_source(&args);
    let offset = arg_fraction(&args, 1, Fraction::ZERO);
    let cycles = arg_fraction(&args, 2, Fraction::ONE);
    source.ribbon(offset, cycles)
}

// ============= Euclidean operators =============

fn euclid_args_static(args: &[DslArg]) -> bool {
    args.iter().skip(1).all(|a| static_number(a).is_some())
}

pub fn euclid(args: Vec<DslArg>) -> Pattern<VoiceData> {
    let source = arg_source(&args);
    if args.len() <= 1 {
        return source;
    }
    if euclid_args_static(&args) {
        source.euclid(arg_int(&args, 1, 3), arg_int(&args, 2, 8))
    } else {
        let pulses = args
            .get(1)
            .and_then(coerce_control)
            .unwrap_or_else(|| Pattern::pure(3.0));
        let steps = args
            .get(2)
            .and_then(coerce_control)
            .unwrap_or_else(|| Pattern::pure(8.0));
        source.euclid_with(pulses, steps, Pattern::pure(0.0))
    }
}

pub fn euclid_rot(args: Vec<DslArg>) -> Pattern<VoiceData> {
    let source = arg_source(&args);
    if euclid_args_static(&args) {
        source.euclid_rot(
            arg_int(&args, 1, 3),
            arg_int(&args, 2, 8),
            arg_int(&args, 3, 0),
        )
    } else {
        let pulses = args
            .get(1)
            .and_then(coerce_control)
            .unwrap_or_else(|| Pattern::pure(3.0));
        let steps = args
            .get(2)
            .and_then(coerce_control)
            .unwrap_or_else(|| Pattern::pure(8.0));
        let rotation = args
            .get(3)
            .and_then(coerce_control)
            .unwrap_or_else(|| Pattern::pure(0.0));
        source.euclid_with(pulses, steps, rotation)
    }
}

pub fn euclid_legato(args: Vec<DslArg>) -> Pattern<VoiceData> {
    let source = arg_source(&args);
    if euclid_args_static(&args) {
        return source.euclid_legato(arg_int(&args, 1, 3), arg_int(&args, 2, 8));
    }
    let pulses = args
        .get(1)
        .and_then(coerce_control)
        .unwrap_or_else(|| Pattern::pure(3.0));
    let steps = args
        .get(2)
        .and_then(coerce_control)
        .unwrap_or_else(|| Pattern::pure(8.0));
    pulses
        .fmap(move |p| {
            let p = p.floor() as i64;
            let source = source.clone();
            steps
                .clone()
                .fmap(move |s| source.clone().euclid_legato(p, s.floor() as i64))
                .inner_join()
        })
        .step_join()
}

pub fn euclidish(args: Vec<DslArg>) -> Pattern<VoiceData> {
    let source = arg_source(&args);
    let pulses = arg_int(&args, 1, 3);
    let steps = arg_int(&args, 2, 8);
    let groove = arg_number(&args, 3, 0.0);
    source.euclidish(pulses, steps, groove)
}

// ============= Selection operators =============

fn reify_list(items: &[DslValue]) -> Vec<Pattern<VoiceData>> {
    items
        .iter()
        .filter_map(|v| coerce_pattern(&DslArg::new(v.clone()), write_atom))
        .collect()
}

fn pick_common(args: Vec<DslArg>, wrap: bool, join: PickJoin) -> Pattern<VoiceData> {
    let Some((lookup, selector)) = split_lookup_args(args) else {
        return Pattern::silence();
    };
    let Some(selector) = coerce_pattern(&selector, write_value) else {
        return Pattern::silence();
    };
    match lookup {
        LookupSpec::List(items) => selector.pick_from(reify_list(&items), wrap, join),
        LookupSpec::Map(entries) => {
            let mut map = HashMap::new();
            for (key, value) in entries {
                if let Some(p) = coerce_pattern(&DslArg::new(value), write_atom) {
                    map.insert(key, p);
                }
            }
            selector.pick_map(map, join)
        }
    }
}

pub fn pick(args: Vec<DslArg>) -> Pattern<VoiceData> {
    pick_common(args, false, PickJoin::Inner)
}

pub fn pickmod(args: Vec<DslArg>) -> Pattern<VoiceData> {
    pick_common(args, true, PickJoin::Inner)
}

pub fn pick_out(args: Vec<DslArg>) -> Pattern<VoiceData> {
    pick_common(args, false, PickJoin::Outer)
}

pub fn pickmod_out(args: Vec<DslArg>) -> Pattern<VoiceData> {
    pick_common(args, true, PickJoin::Outer)
}

pub fn pick_squeeze(args: Vec<DslArg>) -> Pattern<VoiceData> {
    pick_common(args, false, PickJoin::Squeeze)
}

pub fn pickmod_squeeze(args: Vec<DslArg>) -> Pattern<VoiceData> {
    pick_common(args, true, PickJoin::Squeeze)
}

pub fn pick_restart(args: Vec<DslArg>) -> Pattern<VoiceData> {
    pick_common(args, false, PickJoin::Restart)
}

pub fn pickmod_restart(args: Vec<DslArg>) -> Pattern<VoiceData> {
    pick_common(args, true, PickJoin::Restart)
}

pub fn pick_reset(args: Vec<DslArg>) -> Pattern<VoiceData> {
    pick_common(args, false, PickJoin::Reset)
}

pub fn pickmod_reset(args: Vec<DslArg>) -> Pattern<VoiceData> {
    pick_common(args, true, PickJoin::Reset)
}

fn pickf_common(args: Vec<DslArg>, wrap: bool) -> Pattern<VoiceData> {
    // The transform list may sit anywhere; the selector follows it and the
    // base pattern is whatever argument is left
    let list_at = args.iter().position(|a| {
        matches!(&a.value, DslValue::List(items)
            if !items.is_empty() && items.iter().all(|i| matches!(i, DslValue::Transform(_))))
    });
    let Some(list_at) = list_at else {
        warn!(target: "tactus::pick", "pickF needs a list of transforms");
        return Pattern::silence();
    };
    let DslValue::List(items) = args[list_at].value.clone() else {
        unreachable!("position matched a list");
    };
    let transforms: Vec<Transform<VoiceData>> = items
        .into_iter()
        .map(|i| match i {
            DslValue::Transform(f) => f,
            _ => unreachable!("list checked to hold transforms"),
        })
        .collect();
    let selector = args
        .get(list_at + 1)
        .and_then(|a| coerce_pattern(a, write_value))
        .unwrap_or_else(Pattern::silence);
    let base = args
        .iter()
        .enumerate()
        .find(|(i, _)| *i != list_at && *i != list_at + 1)
        .and_then(|(_, a)| coerce_pattern(a, write_atom))
        .unwrap_or_else(Pattern::silence);
    selector.pick_transforms(base, transforms, wrap)
}

pub fn pick_f(args: Vec<DslArg>) -> Pattern<VoiceData> {
    pickf_common(args, false)
}

pub fn pickmod_f(args: Vec<DslArg>) -> Pattern<VoiceData> {
    pickf_common(args, true)
}

// ============= Control-field operators =============

macro_rules! num_writer {
    ($writer:ident, $field:ident) => {
        pub fn $writer(data: &mut VoiceData, value: &VoiceValue) {
            data.$field = value.as_f64();
        }
    };
}

macro_rules! int_writer {
    ($writer:ident, $field:ident) => {
        pub fn $writer(data: &mut VoiceData, value: &VoiceValue) {
            data.$field = value.as_f64().map(|n| n.floor() as i64);
        }
    };
}

macro_rules! str_writer {
    ($writer:ident, $field:ident) => {
        pub fn $writer(data: &mut VoiceData, value: &VoiceValue) {
            data.$field = Some(value.as_string());
        }
    };
}

num_writer!(w_gain, gain);
num_writer!(w_amp, amp);
num_writer!(w_velocity, velocity);
num_writer!(w_pan, pan);
num_writer!(w_legato, legato);
num_writer!(w_sustain, sustain);
num_writer!(w_attack, attack);
num_writer!(w_decay, decay);
num_writer!(w_env_sustain, env_sustain);
num_writer!(w_release, release);
num_writer!(w_hold, hold);
num_writer!(w_freq, freq);
num_writer!(w_octave, octave);
num_writer!(w_detune, detune);
num_writer!(w_cutoff, cutoff);
num_writer!(w_resonance, resonance);
num_writer!(w_lpattack, lpattack);
num_writer!(w_lpdecay, lpdecay);
num_writer!(w_lpsustain, lpsustain);
num_writer!(w_lprelease, lprelease);
num_writer!(w_lpenv, lpenv);
num_writer!(w_hcutoff, hcutoff);
num_writer!(w_hresonance, hresonance);
num_writer!(w_hpattack, hpattack);
num_writer!(w_hpdecay, hpdecay);
num_writer!(w_hpsustain, hpsustain);
num_writer!(w_hprelease, hprelease);
num_writer!(w_hpenv, hpenv);
num_writer!(w_bandf, bandf);
num_writer!(w_bandq, bandq);
num_writer!(w_bpattack, bpattack);
num_writer!(w_bpdecay, bpdecay);
num_writer!(w_bpsustain, bpsustain);
num_writer!(w_bprelease, bprelease);
num_writer!(w_bpenv, bpenv);
num_writer!(w_notchf, notchf);
num_writer!(w_notchq, notchq);
num_writer!(w_npattack, npattack);
num_writer!(w_npdecay, npdecay);
num_writer!(w_npsustain, npsustain);
num_writer!(w_nprelease, nprelease);
num_writer!(w_npenv, npenv);
num_writer!(w_delay, delay);
num_writer!(w_delaytime, delaytime);
num_writer!(w_delayfeedback, delayfeedback);
num_writer!(w_room, room);
num_writer!(w_size, size);
num_writer!(w_dry, dry);
num_writer!(w_speed, speed);
num_writer!(w_begin, begin);
num_writer!(w_end, end);
num_writer!(w_accelerate, accelerate);
num_writer!(w_crush, crush);
num_writer!(w_shape, shape);
num_writer!(w_squiz, squiz);
num_writer!(w_loop_count, loop_count);
num_writer!(w_nudge, nudge);
int_writer!(w_sound_index, sound_index);
int_writer!(w_channel, channel);
int_writer!(w_orbit, orbit);
int_writer!(w_coarse, coarse);
int_writer!(w_cut, cut);
str_writer!(w_vowel, vowel);
str_writer!(w_bank, bank);
str_writer!(w_unit, unit);
str_writer!(w_scale, scale);
str_writer!(w_chord, chord);

// ============= Pattern methods (the `#`-style control merge) =============

impl Pattern<VoiceData> {
    /// Merge a control pattern into this one, keeping this pattern's
    /// structure: each event samples the control at its own onset and lets
    /// the control's fields shadow its own.
    pub fn with_control(self, ctrl: Pattern<VoiceData>) -> Self {
        let (steps, weight, cycle_len) = self.meta();
        Pattern::new(move |state| {
            self.query(state)
                .into_iter()
                .map(|hap| {
                    let onset = hap.whole_or_part().begin;
                    let window = hap.whole_or_part();
                    let sample = ctrl
                        .query(&state.set_span(window))
                        .into_iter()
                        .find(|c| c.part.contains(onset) || c.part.begin == onset);
                    match sample {
                        Some(c) => hap.with_value(|v| v.merge(&c.value)),
                        None => hap,
                    }
                })
                .collect()
        })
        .with_meta(steps, weight, cycle_len)
    }

    /// Stereo juxtaposition: the plain pattern on the left channel, the
    /// transformed copy on the right.
    pub fn jux(self, f: Transform<VoiceData>) -> Self {
        let left = self.clone().fmap(|d| {
            let mut d = d.clone();
            d.pan = Some(0.0);
            d
        });
        let right = guard_transform(&f, self, "jux").fmap(|d| {
            let mut d = d.clone();
            d.pan = Some(1.0);
            d
        });
        left.overlay(right)
    }

    /// Flip each event's boolean face: truthy values become `false`, falsy
    /// become `true`.
    pub fn invert_values(self) -> Self {
        use crate::pattern_structure::Truthy;
        self.fmap(|d| {
            let mut d = d.clone();
            let flipped = !d.is_truthy();
            d.value = Some(VoiceValue::Bool(flipped));
            d
        })
    }
}

macro_rules! control_method {
    ($method:ident, $writer:path) => {
        impl Pattern<VoiceData> {
            pub fn $method(self, arg: impl Into<DslArg>) -> Pattern<VoiceData> {
                match coerce_pattern(&arg.into(), $writer) {
                    Some(ctrl) => self.with_control(ctrl),
                    None => self,
                }
            }
        }
    };
}

control_method!(sound, write_sound);
control_method!(note, write_note);
control_method!(n, w_sound_index);
control_method!(gain, w_gain);
control_method!(pan, w_pan);
control_method!(legato, w_legato);
control_method!(speed, w_speed);
control_method!(cutoff, w_cutoff);
control_method!(resonance, w_resonance);
control_method!(hcutoff, w_hcutoff);
control_method!(bandf, w_bandf);
control_method!(notchf, w_notchf);
control_method!(vowel, w_vowel);
control_method!(room, w_room);
control_method!(delay, w_delay);
control_method!(crush, w_crush);
control_method!(shape, w_shape);
control_method!(attack, w_attack);
control_method!(release, w_release);
control_method!(value, write_value);

// ============= String methods =============

/// Mini-notation sugar on string slices: `"bd sn".pat()` and friends.
pub trait StringPattern {
    fn pat(&self) -> Pattern<VoiceData>;

    fn note_pattern(&self) -> Pattern<VoiceData>;

    fn fast_by(&self, k: f64) -> Pattern<VoiceData> {
        self.pat().fast(Fraction::from_float(k))
    }

    fn slow_by(&self, k: f64) -> Pattern<VoiceData> {
        self.pat().slow(Fraction::from_float(k))
    }

    fn euclid_by(&self, pulses: i64, steps: i64) -> Pattern<VoiceData> {
        self.pat().euclid(pulses, steps)
    }

    fn rev_pattern(&self) -> Pattern<VoiceData> {
        self.pat().rev()
    }
}

impl StringPattern for str {
    fn pat(&self) -> Pattern<VoiceData> {
        seq(vec![DslArg::from(self)])
    }

    fn note_pattern(&self) -> Pattern<VoiceData> {
        args_to_sequence(&[DslArg::from(self)], write_note)
    }
}

// ============= Registry installation =============

fn register_fn(name: &str, f: fn(Vec<DslArg>) -> Pattern<VoiceData>) {
    registry::register(name, Arc::new(f));
}

fn register_control(name: &str, writer: FieldWriter) {
    registry::register(
        name,
        Arc::new(move |args: Vec<DslArg>| args_to_sequence(&args, writer)),
    );
}

/// Install every built-in operator. Safe to call more than once.
pub fn install_default_ops() {
    // Sequencing
    register_fn("seq", seq);
    register_fn("sequence", seq);
    register_fn("stack", stack);
    register_fn("cat", cat);
    register_fn("slowcat", cat);
    register_fn("fastcat", fastcat);
    register_fn("arrange", arrange);
    register_fn("stepcat", stepcat);
    register_fn("timecat", stepcat);
    register_fn("silence", silence);

    // Time
    register_fn("fast", fast);
    register_fn("density", fast);
    register_fn("slow", slow);
    register_fn("sparsity", slow);
    register_fn("early", early);
    register_fn("late", late);
    register_fn("rev", rev);
    register_fn("palindrome", palindrome);
    register_fn("iter", iter);
    register_fn("iterBack", iter_back);
    register_fn("ply", ply);
    register_fn("repeatCycles", repeat_cycles);

    // Conditionals and layering
    register_fn("every", every);
    register_fn("off", off);
    register_fn("superimpose", superimpose);
    register_fn("layer", layer);
    register_fn("jux", jux);
    register_fn("within", within);
    register_fn("chunk", chunk);
    register_fn("chunkBack", chunk_back);
    register_fn("degrade", degrade);
    register_fn("degradeBy", degrade_by);
    register_fn("sometimes", sometimes);
    register_fn("sometimesBy", sometimes_by);

    // Structure
    register_fn("struct", struct_op);
    register_fn("structAll", struct_all);
    register_fn("mask", mask);
    register_fn("maskAll", mask_all);
    register_fn("invert", invert);

    // Windowing
    register_fn("zoom", zoom);
    register_fn("bite", bite);
    register_fn("segment", segment);
    register_fn("linger", linger);
    register_fn("ribbon", ribbon);

    // Euclid
    register_fn("euclid", euclid);
    register_fn("euclidRot", euclid_rot);
    register_fn("euclidLegato", euclid_legato);
    register_fn("euclidish", euclidish);

    // Selection
    register_fn("pick", pick);
    register_fn("pickmod", pickmod);
    register_fn("pickOut", pick_out);
    register_fn("pickmodOut", pickmod_out);
    register_fn("pickSqueeze", pick_squeeze);
    register_fn("inhabit", pick_squeeze);
    register_fn("squeeze", pick_squeeze);
    register_fn("pickmodSqueeze", pickmod_squeeze);
    register_fn("inhabitmod", pickmod_squeeze);
    register_fn("pickRestart", pick_restart);
    register_fn("pickmodRestart", pickmod_restart);
    register_fn("pickReset", pick_reset);
    register_fn("pickmodReset", pickmod_reset);
    register_fn("pickF", pick_f);
    register_fn("pickmodF", pickmod_f);

    // Controls
    register_control("s", write_sound);
    register_control("sound", write_sound);
    register_control("note", write_note);
    register_control("n", w_sound_index);
    register_control("value", write_value);
    register_control("gain", w_gain);
    register_control("amp", w_amp);
    register_control("velocity", w_velocity);
    register_control("pan", w_pan);
    register_control("legato", w_legato);
    register_control("sustain", w_sustain);
    register_control("attack", w_attack);
    register_control("decay", w_decay);
    register_control("envSustain", w_env_sustain);
    register_control("release", w_release);
    register_control("hold", w_hold);
    register_control("freq", w_freq);
    register_control("octave", w_octave);
    register_control("detune", w_detune);
    register_control("cutoff", w_cutoff);
    register_control("lpf", w_cutoff);
    register_control("resonance", w_resonance);
    register_control("lpattack", w_lpattack);
    register_control("lpdecay", w_lpdecay);
    register_control("lpsustain", w_lpsustain);
    register_control("lprelease", w_lprelease);
    register_control("lpenv", w_lpenv);
    register_control("hcutoff", w_hcutoff);
    register_control("hpf", w_hcutoff);
    register_control("hresonance", w_hresonance);
    register_control("hpattack", w_hpattack);
    register_control("hpdecay", w_hpdecay);
    register_control("hpsustain", w_hpsustain);
    register_control("hprelease", w_hprelease);
    register_control("hpenv", w_hpenv);
    register_control("bandf", w_bandf);
    register_control("bpf", w_bandf);
    register_control("bandq", w_bandq);
    register_control("bpattack", w_bpattack);
    register_control("bpdecay", w_bpdecay);
    register_control("bpsustain", w_bpsustain);
    register_control("bprelease", w_bprelease);
    register_control("bpenv", w_bpenv);
    register_control("notchf", w_notchf);
    register_control("notchq", w_notchq);
    register_control("npattack", w_npattack);
    register_control("npdecay", w_npdecay);
    register_control("npsustain", w_npsustain);
    register_control("nprelease", w_nprelease);
    register_control("npenv", w_npenv);
    register_control("vowel", w_vowel);
    register_control("bank", w_bank);
    register_control("unit", w_unit);
    register_control("scale", w_scale);
    register_control("chord", w_chord);
    register_control("delay", w_delay);
    register_control("delaytime", w_delaytime);
    register_control("delayfeedback", w_delayfeedback);
    register_control("room", w_room);
    register_control("size", w_size);
    register_control("dry", w_dry);
    register_control("orbit", w_orbit);
    register_control("speed", w_speed);
    register_control("begin", w_begin);
    register_control("end", w_end);
    register_control("accelerate", w_accelerate);
    register_control("coarse", w_coarse);
    register_control("crush", w_crush);
    register_control("shape", w_shape);
    register_control("squiz", w_squiz);
    register_control("cut", w_cut);
    register_control("loop", w_loop_count);
    register_control("nudge", w_nudge);
    register_control("channel", w_channel);
}
