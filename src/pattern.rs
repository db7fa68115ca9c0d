//! Core pattern types: rational time, time spans, events, and the query engine
//!
//! A pattern is a function from a half-open time span to the events that
//! intersect it. Everything else in the crate is built by composing these
//! query functions. All time arithmetic is exact rational arithmetic;
//! floating point appears only at the DSL boundary and in event weights.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Exact rational time value `p/q` with `q > 0`, always reduced.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Fraction {
    pub numerator: i64,
    pub denominator: i64,
}

fn gcd(a: i64, b: i64) -> i64 {
    if b == 0 {
        a
    } else {
        gcd(b, a % b)
    }
}

fn gcd_wide(a: i128, b: i128) -> i128 {
    if b == 0 {
        a
    } else {
        gcd_wide(b, a % b)
    }
}

/// Reduce a wide intermediate back into an i64 fraction. Overflow here means
/// the time arithmetic itself is out of range, which is an engine bug.
fn reduce_wide(n: i128, d: i128) -> Fraction {
    assert!(d != 0, "fraction with zero denominator");
    let g = gcd_wide(n.abs(), d.abs()).max(1);
    let sign = if d < 0 { -1 } else { 1 };
    let n = sign * n / g;
    let d = d.abs() / g;
    Fraction {
        numerator: i64::try_from(n).expect("rational numerator out of range"),
        denominator: i64::try_from(d).expect("rational denominator out of range"),
    }
}

impl Fraction {
    pub const ZERO: Fraction = Fraction {
        numerator: 0,
        denominator: 1,
    };
    pub const ONE: Fraction = Fraction {
        numerator: 1,
        denominator: 1,
    };

    pub fn new(n: i64, d: i64) -> Self {
        assert!(d != 0, "fraction with zero denominator");
        let g = gcd(n.abs(), d.abs()).max(1);
        Self {
            numerator: n / g * d.signum(),
            denominator: d.abs() / g,
        }
    }

    pub fn from_int(n: i64) -> Self {
        Self {
            numerator: n,
            denominator: 1,
        }
    }

    /// Approximate a float as a rational. Only used at the DSL boundary;
    /// query arithmetic never goes through floats.
    pub fn from_float(f: f64) -> Self {
        let denominator: i64 = 1_000_000;
        let numerator = (f * denominator as f64).round() as i64;
        Self::new(numerator, denominator)
    }

    pub fn to_float(&self) -> f64 {
        self.numerator as f64 / self.denominator as f64
    }

    /// Largest integer not greater than the value, as a fraction.
    pub fn floor(&self) -> Self {
        Self::from_int(self.to_int())
    }

    pub fn ceil(&self) -> Self {
        if self.denominator == 1 {
            *self
        } else {
            Self::from_int(self.to_int() + 1)
        }
    }

    /// Integer floor of the value.
    pub fn to_int(&self) -> i64 {
        self.numerator.div_euclid(self.denominator)
    }

    pub fn is_integer(&self) -> bool {
        self.denominator == 1
    }

    /// Start of the cycle this time falls in (the "sam").
    pub fn sam(&self) -> Self {
        self.floor()
    }

    pub fn next_sam(&self) -> Self {
        self.floor() + Self::ONE
    }

    /// Position within the current cycle, in `[0, 1)`.
    pub fn cycle_pos(&self) -> Self {
        *self - self.floor()
    }

    /// Remainder taking the sign of the divisor: `r = self - m * floor(self/m)`.
    pub fn modulo(&self, m: Fraction) -> Self {
        assert!(m != Fraction::ZERO, "modulo by zero");
        *self - m * (*self / m).floor()
    }

    pub fn min(self, other: Self) -> Self {
        if self <= other {
            self
        } else {
            other
        }
    }

    pub fn max(self, other: Self) -> Self {
        if self >= other {
            self
        } else {
            other
        }
    }

    pub fn abs(self) -> Self {
        Self {
            numerator: self.numerator.abs(),
            denominator: self.denominator,
        }
    }

    pub fn recip(self) -> Self {
        assert!(self != Fraction::ZERO, "reciprocal of zero");
        Self::new(self.denominator, self.numerator)
    }

    /// Least common multiple of two positive fractions:
    /// `lcm(a/b, c/d) = lcm(a, c) / gcd(b, d)`.
    pub fn lcm(a: Fraction, b: Fraction) -> Fraction {
        if a == Fraction::ZERO || b == Fraction::ZERO {
            return Fraction::ZERO;
        }
        let num_gcd = gcd(a.numerator.abs(), b.numerator.abs()).max(1);
        let num_lcm = (a.numerator.abs() / num_gcd) * b.numerator.abs();
        Fraction::new(num_lcm, gcd(a.denominator, b.denominator).max(1))
    }
}

impl std::ops::Add for Fraction {
    type Output = Self;

    fn add(self, other: Self) -> Self {
        reduce_wide(
            self.numerator as i128 * other.denominator as i128
                + other.numerator as i128 * self.denominator as i128,
            self.denominator as i128 * other.denominator as i128,
        )
    }
}

impl std::ops::Sub for Fraction {
    type Output = Self;

    fn sub(self, other: Self) -> Self {
        reduce_wide(
            self.numerator as i128 * other.denominator as i128
                - other.numerator as i128 * self.denominator as i128,
            self.denominator as i128 * other.denominator as i128,
        )
    }
}

impl std::ops::Mul for Fraction {
    type Output = Self;

    fn mul(self, other: Self) -> Self {
        reduce_wide(
            self.numerator as i128 * other.numerator as i128,
            self.denominator as i128 * other.denominator as i128,
        )
    }
}

impl std::ops::Div for Fraction {
    type Output = Self;

    fn div(self, other: Self) -> Self {
        assert!(other != Fraction::ZERO, "division by zero fraction");
        reduce_wide(
            self.numerator as i128 * other.denominator as i128,
            self.denominator as i128 * other.numerator as i128,
        )
    }
}

impl std::ops::Neg for Fraction {
    type Output = Self;

    fn neg(self) -> Self {
        Self {
            numerator: -self.numerator,
            denominator: self.denominator,
        }
    }
}

impl std::cmp::PartialOrd for Fraction {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

impl std::cmp::Ord for Fraction {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        let lhs = self.numerator as i128 * other.denominator as i128;
        let rhs = other.numerator as i128 * self.denominator as i128;
        lhs.cmp(&rhs)
    }
}

impl std::fmt::Display for Fraction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.denominator == 1 {
            write!(f, "{}", self.numerator)
        } else {
            write!(f, "{}/{}", self.numerator, self.denominator)
        }
    }
}

/// Half-open time interval `[begin, end)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct TimeSpan {
    pub begin: Fraction,
    pub end: Fraction,
}

impl TimeSpan {
    pub fn new(begin: Fraction, end: Fraction) -> Self {
        debug_assert!(begin <= end, "time span with begin > end");
        Self { begin, end }
    }

    pub fn duration(&self) -> Fraction {
        self.end - self.begin
    }

    pub fn midpoint(&self) -> Fraction {
        (self.begin + self.end) / Fraction::from_int(2)
    }

    /// Intersection, or `None` when the spans do not overlap. A zero-width
    /// result survives only when one of the inputs was itself zero-width.
    pub fn intersect(&self, other: &TimeSpan) -> Option<TimeSpan> {
        let begin = self.begin.max(other.begin);
        let end = self.end.min(other.end);
        if begin > end {
            return None;
        }
        if begin == end && self.begin != self.end && other.begin != other.end {
            return None;
        }
        Some(TimeSpan::new(begin, end))
    }

    /// Clamping intersection; collapses to a zero-width span on no overlap.
    pub fn sect(&self, other: &TimeSpan) -> TimeSpan {
        let begin = self.begin.max(other.begin);
        let end = self.end.min(other.end);
        TimeSpan::new(begin, end.max(begin))
    }

    pub fn shift(&self, delta: Fraction) -> TimeSpan {
        TimeSpan::new(self.begin + delta, self.end + delta)
    }

    pub fn scale(&self, factor: Fraction) -> TimeSpan {
        TimeSpan::new(self.begin * factor, self.end * factor)
    }

    pub fn contains(&self, t: Fraction) -> bool {
        self.begin <= t && t < self.end
    }

    /// Split the span at every integer cycle boundary it crosses.
    pub fn span_cycles(&self) -> Vec<TimeSpan> {
        if self.begin == self.end {
            return vec![*self];
        }
        let mut spans = Vec::new();
        let mut begin = self.begin;
        while begin < self.end {
            let end = begin.next_sam().min(self.end);
            spans.push(TimeSpan::new(begin, end));
            begin = end;
        }
        spans
    }

    /// Apply `f` to the within-cycle position of both endpoints, preserving
    /// the cycle index of `begin`. Callers split at cycle boundaries first.
    pub fn with_cycle(&self, f: impl Fn(Fraction) -> Fraction) -> TimeSpan {
        let sam = self.begin.sam();
        TimeSpan::new(sam + f(self.begin - sam), sam + f(self.end - sam))
    }

    pub fn with_time(&self, f: impl Fn(Fraction) -> Fraction) -> TimeSpan {
        TimeSpan::new(f(self.begin), f(self.end))
    }
}

/// Hap (short for "happening"): an event with a value.
///
/// `whole` is the span of the logical note; `part` is the portion visible in
/// the current query. `whole = None` marks an analog/continuous sample.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Hap<T> {
    pub whole: Option<TimeSpan>,
    pub part: TimeSpan,
    pub value: T,
    pub context: HashMap<String, String>,
}

impl<T: Clone> Hap<T> {
    pub fn new(whole: Option<TimeSpan>, part: TimeSpan, value: T) -> Self {
        Self {
            whole,
            part,
            value,
            context: HashMap::new(),
        }
    }

    /// Whether this part carries the onset of its note.
    pub fn has_onset(&self) -> bool {
        matches!(self.whole, Some(w) if w.begin == self.part.begin)
    }

    pub fn whole_or_part(&self) -> TimeSpan {
        self.whole.unwrap_or(self.part)
    }

    pub fn with_value<U>(&self, f: impl FnOnce(&T) -> U) -> Hap<U> {
        Hap {
            whole: self.whole,
            part: self.part,
            value: f(&self.value),
            context: self.context.clone(),
        }
    }

    pub fn with_part(&self, part: TimeSpan) -> Self {
        Hap {
            whole: self.whole,
            part,
            value: self.value.clone(),
            context: self.context.clone(),
        }
    }

    /// Map both spans through the same time transform.
    pub fn with_span(&self, f: impl Fn(TimeSpan) -> TimeSpan) -> Self {
        Hap {
            whole: self.whole.map(&f),
            part: f(self.part),
            value: self.value.clone(),
            context: self.context.clone(),
        }
    }

    pub fn shift(&self, delta: Fraction) -> Self {
        self.with_span(|s| s.shift(delta))
    }

    /// Append a source location to the diagnostic trail.
    pub fn push_location(&mut self, loc: &str) {
        let trail = self
            .context
            .entry("source_locations".to_string())
            .or_default();
        if !trail.is_empty() {
            trail.push(';');
        }
        trail.push_str(loc);
    }
}

/// State carried through a query: the span being asked for, the ambient
/// control values, and an optional cooperative cancellation token.
#[derive(Debug, Clone)]
pub struct State {
    pub span: TimeSpan,
    pub controls: HashMap<String, f64>,
    cancel: Option<Arc<AtomicBool>>,
}

impl State {
    pub fn new(span: TimeSpan) -> Self {
        Self {
            span,
            controls: HashMap::new(),
            cancel: None,
        }
    }

    pub fn with_controls(mut self, controls: HashMap<String, f64>) -> Self {
        self.controls = controls;
        self
    }

    pub fn with_cancel(mut self, token: Arc<AtomicBool>) -> Self {
        self.cancel = Some(token);
        self
    }

    pub fn set_span(&self, span: TimeSpan) -> Self {
        let mut s = self.clone();
        s.span = span;
        s
    }

    pub fn with_span(&self, f: impl Fn(TimeSpan) -> TimeSpan) -> Self {
        self.set_span(f(self.span))
    }

    /// False once the cancellation token has tripped. Combinators that
    /// iterate over cycles check this between cycles and return the partial
    /// result accumulated so far; cancellation is never an error.
    pub fn is_live(&self) -> bool {
        self.cancel
            .as_ref()
            .map(|c| !c.load(Ordering::Relaxed))
            .unwrap_or(true)
    }
}

/// Core pattern type: a query function plus sequencing metadata.
pub struct Pattern<T: Clone + Send + Sync> {
    query: Arc<dyn Fn(&State) -> Vec<Hap<T>> + Send + Sync>,
    steps: Option<Fraction>,
    weight: Fraction,
    cycle_len: Fraction,
}

impl<T: Clone + Send + Sync> Clone for Pattern<T> {
    fn clone(&self) -> Self {
        Self {
            query: self.query.clone(),
            steps: self.steps,
            weight: self.weight,
            cycle_len: self.cycle_len,
        }
    }
}

impl<T: Clone + Send + Sync> std::fmt::Debug for Pattern<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Pattern")
            .field("query", &"<closure>")
            .field("steps", &self.steps)
            .field("weight", &self.weight)
            .field("cycle_len", &self.cycle_len)
            .finish()
    }
}

/// Stable sort by part begin; ties keep insertion order.
pub fn sort_haps<T>(haps: &mut Vec<Hap<T>>) {
    haps.sort_by(|a, b| a.part.begin.cmp(&b.part.begin));
}

impl<T: Clone + Send + Sync + 'static> Pattern<T> {
    pub fn new(query: impl Fn(&State) -> Vec<Hap<T>> + Send + Sync + 'static) -> Self {
        Self {
            query: Arc::new(query),
            steps: None,
            weight: Fraction::ONE,
            cycle_len: Fraction::ONE,
        }
    }

    /// Query the pattern for events in a time span.
    pub fn query(&self, state: &State) -> Vec<Hap<T>> {
        (self.query)(state)
    }

    /// Query over `[begin, end)` with a fresh state.
    pub fn query_span(&self, begin: Fraction, end: Fraction) -> Vec<Hap<T>> {
        self.query(&State::new(TimeSpan::new(begin, end)))
    }

    // ============= Metadata =============

    /// Logical step count per cycle, when known.
    pub fn num_steps(&self) -> Option<Fraction> {
        self.steps
    }

    /// Share of time this pattern claims inside a weighted sequence.
    pub fn weight(&self) -> f64 {
        self.weight.to_float()
    }

    /// Exact weight used by the sequence allocator.
    pub fn weight_fraction(&self) -> Fraction {
        self.weight
    }

    /// Length of one repeat of the pattern, in cycles.
    pub fn cycle_len(&self) -> Fraction {
        self.cycle_len
    }

    pub fn set_steps(mut self, steps: Option<Fraction>) -> Self {
        self.steps = steps;
        self
    }

    pub fn with_weight(mut self, weight: Fraction) -> Self {
        self.weight = weight;
        self
    }

    pub fn with_cycle_len(mut self, len: Fraction) -> Self {
        self.cycle_len = len;
        self
    }

    /// Copy metadata onto a freshly built node.
    pub(crate) fn with_meta(
        mut self,
        steps: Option<Fraction>,
        weight: Fraction,
        cycle_len: Fraction,
    ) -> Self {
        self.steps = steps;
        self.weight = weight;
        self.cycle_len = cycle_len;
        self
    }

    pub(crate) fn meta(&self) -> (Option<Fraction>, Fraction, Fraction) {
        (self.steps, self.weight, self.cycle_len)
    }

    // ============= Leaves =============

    /// One event per cycle, the value repeated forever.
    pub fn pure(value: T) -> Self {
        Pattern::new(move |state| {
            let mut haps = Vec::new();
            if state.span.begin == state.span.end {
                // Zero-width queries still see the enclosing cycle
                let sam = state.span.begin.sam();
                let whole = TimeSpan::new(sam, sam + Fraction::ONE);
                haps.push(Hap::new(Some(whole), state.span, value.clone()));
                return haps;
            }
            let mut cycle = state.span.begin.sam();
            while cycle < state.span.end {
                if !state.is_live() {
                    break;
                }
                let whole = TimeSpan::new(cycle, cycle + Fraction::ONE);
                if let Some(part) = whole.intersect(&state.span) {
                    haps.push(Hap::new(Some(whole), part, value.clone()));
                }
                cycle = cycle + Fraction::ONE;
            }
            haps
        })
        .set_steps(Some(Fraction::ONE))
    }

    /// Continuous value: a single analog hap covering the query span.
    pub fn steady(value: T) -> Self {
        Pattern::new(move |state| vec![Hap::new(None, state.span, value.clone())])
    }

    /// No events, ever.
    pub fn silence() -> Self {
        Pattern::new(|_| Vec::new())
    }

    /// No events, but holds one unit of weight inside a sequence.
    pub fn empty() -> Self {
        Pattern::silence().set_steps(Some(Fraction::ONE))
    }

    /// Sequence padding: emits nothing and claims `steps` of weight.
    pub fn gap(steps: Fraction) -> Self {
        Pattern::silence().set_steps(Some(steps)).with_weight(steps)
    }

    // ============= Core time maps =============

    /// Transform the query span before asking the inner pattern.
    pub fn with_query_span(
        self,
        f: impl Fn(TimeSpan) -> TimeSpan + Send + Sync + 'static,
    ) -> Self {
        let (steps, weight, cycle_len) = self.meta();
        Pattern::new(move |state| self.query(&state.with_span(&f)))
            .with_meta(steps, weight, cycle_len)
    }

    pub fn with_query_time(
        self,
        f: impl Fn(Fraction) -> Fraction + Send + Sync + 'static,
    ) -> Self {
        self.with_query_span(move |span| span.with_time(&f))
    }

    /// Transform the spans of every resulting hap.
    pub fn with_hap_span(self, f: impl Fn(TimeSpan) -> TimeSpan + Send + Sync + 'static) -> Self {
        let (steps, weight, cycle_len) = self.meta();
        Pattern::new(move |state| {
            self.query(state)
                .into_iter()
                .map(|hap| hap.with_span(&f))
                .collect()
        })
        .with_meta(steps, weight, cycle_len)
    }

    pub fn with_hap_time(self, f: impl Fn(Fraction) -> Fraction + Send + Sync + 'static) -> Self {
        self.with_hap_span(move |span| span.with_time(&f))
    }

    /// Split the incoming query at cycle boundaries so the inner query only
    /// ever sees spans within a single cycle.
    pub fn split_queries(self) -> Self {
        let (steps, weight, cycle_len) = self.meta();
        Pattern::new(move |state| {
            let mut haps = Vec::new();
            for span in state.span.span_cycles() {
                if !state.is_live() {
                    break;
                }
                haps.extend(self.query(&state.set_span(span)));
            }
            haps
        })
        .with_meta(steps, weight, cycle_len)
    }

    // ============= Core value maps =============

    /// Transform the values in a pattern.
    pub fn fmap<U: Clone + Send + Sync + 'static>(
        self,
        f: impl Fn(&T) -> U + Send + Sync + 'static,
    ) -> Pattern<U> {
        let (steps, weight, cycle_len) = self.meta();
        Pattern::new(move |state| {
            self.query(state)
                .into_iter()
                .map(|hap| hap.with_value(&f))
                .collect()
        })
        .with_meta(steps, weight, cycle_len)
    }

    /// Keep only haps the predicate accepts.
    pub fn filter_haps(self, f: impl Fn(&Hap<T>) -> bool + Send + Sync + 'static) -> Self {
        let (steps, weight, cycle_len) = self.meta();
        Pattern::new(move |state| self.query(state).into_iter().filter(|h| f(h)).collect())
            .with_meta(steps, weight, cycle_len)
    }

    pub fn filter_values(self, f: impl Fn(&T) -> bool + Send + Sync + 'static) -> Self {
        self.filter_haps(move |hap| f(&hap.value))
    }

    /// Keep only haps that carry their onset.
    pub fn filter_onsets(self) -> Self {
        self.filter_haps(|hap| hap.has_onset())
    }

    /// Tag every produced hap with a source location.
    pub fn with_location(self, loc: String) -> Self {
        let (steps, weight, cycle_len) = self.meta();
        Pattern::new(move |state| {
            self.query(state)
                .into_iter()
                .map(|mut hap| {
                    hap.push_location(&loc);
                    hap
                })
                .collect()
        })
        .with_meta(steps, weight, cycle_len)
    }
}
