//! Algebraic pattern combinators: sequencing, stacking, time transforms,
//! conditional application, and the deterministic randomness family.

use crate::pattern::{sort_haps, Fraction, Hap, Pattern, TimeSpan};
use rand::{rngs::StdRng, Rng, SeedableRng};
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tracing::warn;

/// A user-supplied pattern transform.
pub type Transform<T> = Arc<dyn Fn(Pattern<T>) -> Pattern<T> + Send + Sync>;

/// Run a user transform under a panic guard. A panicking callback costs its
/// layer, never the query: the failure is logged once and the layer becomes
/// silence.
pub(crate) fn guard_transform<T: Clone + Send + Sync + 'static>(
    f: &Transform<T>,
    input: Pattern<T>,
    label: &'static str,
) -> Pattern<T> {
    match catch_unwind(AssertUnwindSafe(|| f(input))) {
        Ok(pat) => {
            let logged = Arc::new(AtomicBool::new(false));
            let (steps, weight, cycle_len) = pat.meta();
            Pattern::new(move |state| {
                match catch_unwind(AssertUnwindSafe(|| pat.query(state))) {
                    Ok(haps) => haps,
                    Err(_) => {
                        if !logged.swap(true, Ordering::Relaxed) {
                            warn!(
                                target: "tactus::callback",
                                op = label,
                                "user transform panicked during query; dropping layer"
                            );
                        }
                        Vec::new()
                    }
                }
            })
            .with_meta(steps, weight, cycle_len)
        }
        Err(_) => {
            warn!(
                target: "tactus::callback",
                op = label,
                "user transform panicked while building; dropping layer"
            );
            Pattern::silence()
        }
    }
}

/// Deterministic per-event seed derived from an exact rational time.
fn time_seed(t: Fraction) -> u64 {
    (t.numerator as u64)
        .wrapping_mul(2654435761)
        .wrapping_add((t.denominator as u64).wrapping_mul(40503))
}

impl<T: Clone + Send + Sync + 'static> Pattern<T> {
    // ============= Sequencing =============

    /// Weighted concatenation within each cycle. Child `i` occupies a
    /// sub-span proportional to its weight; its own cycle `c` content is
    /// compressed into the slot of output cycle `c`.
    pub fn timecat(children: Vec<(Fraction, Pattern<T>)>) -> Pattern<T> {
        let children: Vec<_> = children
            .into_iter()
            .filter(|(w, _)| *w > Fraction::ZERO)
            .collect();
        if children.is_empty() {
            return Pattern::silence();
        }
        let total = children
            .iter()
            .fold(Fraction::ZERO, |acc, (w, _)| acc + *w);
        let steps = children
            .iter()
            .map(|(_, c)| c.num_steps())
            .collect::<Option<Vec<_>>>()
            .map(|ss| ss.into_iter().fold(Fraction::ZERO, |a, s| a + s))
            .or(Some(Fraction::from_int(children.len() as i64)));

        Pattern::new(move |state| {
            let mut haps = Vec::new();
            for span in state.span.span_cycles() {
                if !state.is_live() {
                    break;
                }
                let cycle = span.begin.sam();
                let mut acc = Fraction::ZERO;
                for (w, child) in &children {
                    let slot = TimeSpan::new(cycle + acc / total, cycle + (acc + *w) / total);
                    acc = acc + *w;
                    let q = match span.intersect(&slot) {
                        Some(q) if q.begin < q.end => q,
                        _ => continue,
                    };
                    let len = slot.duration();
                    let slot_begin = slot.begin;
                    let inner = TimeSpan::new(
                        cycle + (q.begin - slot_begin) / len,
                        cycle + (q.end - slot_begin) / len,
                    );
                    for hap in child.query(&state.set_span(inner)) {
                        haps.push(hap.with_span(|s| {
                            s.with_time(|t| slot_begin + (t - cycle) * len)
                        }));
                    }
                }
            }
            sort_haps(&mut haps);
            haps
        })
        .set_steps(steps)
    }

    /// Concatenate patterns within one cycle, each child's share set by its
    /// own weight.
    pub fn sequence(children: Vec<Pattern<T>>) -> Pattern<T> {
        let weighted = children
            .iter()
            .map(|c| (c.weight_fraction(), c.clone()))
            .collect();
        Pattern::timecat(weighted)
    }

    /// Concatenate patterns within one cycle, equal shares.
    pub fn fastcat(children: Vec<Pattern<T>>) -> Pattern<T> {
        let weighted = children.into_iter().map(|c| (Fraction::ONE, c)).collect();
        Pattern::timecat(weighted)
    }

    /// One pattern per cycle, round-robin. The chosen pattern is queried at
    /// the unshifted absolute span, so a multi-cycle child keeps its own
    /// absolute phase rather than restarting per slot. This is a deliberate
    /// deviation from classical per-pattern cycle-reset concatenation, and
    /// one of the two documented exceptions to cycle-periodicity.
    pub fn slowcat(patterns: Vec<Pattern<T>>) -> Pattern<T> {
        if patterns.is_empty() {
            return Pattern::silence();
        }
        let n = patterns.len() as i64;
        let steps = patterns
            .iter()
            .map(|p| p.num_steps())
            .collect::<Option<Vec<_>>>()
            .map(|ss| ss.into_iter().fold(Fraction::ONE, Fraction::lcm));
        Pattern::new(move |state| {
            let idx = state.span.begin.to_int().rem_euclid(n) as usize;
            patterns[idx].query(state)
        })
        .split_queries()
        .set_steps(steps)
    }

    /// Play all patterns simultaneously.
    pub fn stack(patterns: Vec<Pattern<T>>) -> Pattern<T> {
        if patterns.is_empty() {
            return Pattern::silence();
        }
        let weight = patterns
            .iter()
            .map(|p| p.weight_fraction())
            .fold(Fraction::ZERO, Fraction::max);
        let steps = patterns
            .iter()
            .map(|p| p.num_steps())
            .collect::<Option<Vec<_>>>()
            .map(|ss| ss.into_iter().fold(Fraction::ONE, Fraction::lcm));
        let cycle_len = patterns
            .iter()
            .map(|p| p.cycle_len())
            .fold(Fraction::ONE, Fraction::max);
        Pattern::new(move |state| {
            let mut haps = Vec::new();
            for p in &patterns {
                haps.extend(p.query(state));
            }
            sort_haps(&mut haps);
            haps
        })
        .with_meta(steps, weight, cycle_len)
    }

    /// Timeline of segments: each plays at its natural speed for its
    /// duration in cycles, and the whole arrangement loops with period
    /// `T = Σ durations`. Entries with non-positive duration are dropped.
    pub fn arrange(segments: Vec<(Fraction, Pattern<T>)>) -> Pattern<T> {
        let segments: Vec<_> = segments
            .into_iter()
            .filter(|(d, _)| *d > Fraction::ZERO)
            .collect();
        if segments.is_empty() {
            return Pattern::silence();
        }
        let total = segments
            .iter()
            .fold(Fraction::ZERO, |acc, (d, _)| acc + *d);
        let weighted = segments
            .into_iter()
            .map(|(d, p)| (d, p.fast(d)))
            .collect();
        Pattern::timecat(weighted)
            .slow(total)
            .with_cycle_len(total)
    }

    /// Overlay this pattern with another.
    pub fn overlay(self, other: Pattern<T>) -> Pattern<T> {
        Pattern::stack(vec![self, other])
    }

    /// Append another pattern after this one within the cycle.
    pub fn append(self, other: Pattern<T>) -> Pattern<T> {
        Pattern::fastcat(vec![self, other])
    }

    // ============= Time transforms =============

    /// Speed up by an exact factor. Step count scales up, cycle length down.
    pub fn fast(self, factor: Fraction) -> Self {
        if factor <= Fraction::ZERO {
            warn!(target: "tactus::ops", %factor, "fast with non-positive factor; yielding silence");
            return Pattern::silence();
        }
        let (steps, weight, cycle_len) = self.meta();
        self.with_query_time(move |t| t * factor)
            .with_hap_time(move |t| t / factor)
            .with_meta(steps.map(|s| s * factor), weight, cycle_len / factor)
    }

    /// Slow down by an exact factor.
    pub fn slow(self, factor: Fraction) -> Self {
        if factor <= Fraction::ZERO {
            warn!(target: "tactus::ops", %factor, "slow with non-positive factor; yielding silence");
            return Pattern::silence();
        }
        self.fast(factor.recip())
    }

    /// Shift the pattern earlier in time by `delta` cycles.
    pub fn early(self, delta: Fraction) -> Self {
        let (steps, weight, cycle_len) = self.meta();
        self.with_query_time(move |t| t + delta)
            .with_hap_time(move |t| t - delta)
            .with_meta(steps, weight, cycle_len)
    }

    /// Shift the pattern later in time by `delta` cycles.
    pub fn late(self, delta: Fraction) -> Self {
        self.early(-delta)
    }

    /// Superimpose a transformed copy shifted later by `delta`.
    pub fn off(self, delta: Fraction, f: Transform<T>) -> Self {
        let shifted = self.clone().late(delta);
        self.overlay(guard_transform(&f, shifted, "off"))
    }

    /// Mirror each cycle.
    pub fn rev(self) -> Self {
        let (steps, weight, cycle_len) = self.meta();
        Pattern::new(move |state| {
            let mut haps = Vec::new();
            for span in state.span.span_cycles() {
                if !state.is_live() {
                    break;
                }
                let cycle = span.begin.sam();
                let pivot = cycle + cycle + Fraction::ONE;
                let q = TimeSpan::new(pivot - span.end, pivot - span.begin);
                for hap in self.query(&state.set_span(q)) {
                    haps.push(hap.with_span(|s| TimeSpan::new(pivot - s.end, pivot - s.begin)));
                }
            }
            sort_haps(&mut haps);
            haps
        })
        .with_meta(steps, weight, cycle_len)
    }

    /// Rotate the pattern earlier by `1/n` more on each successive cycle.
    pub fn iter(self, n: i64) -> Self {
        self.iter_by(n, false)
    }

    /// Rotate later instead of earlier.
    pub fn iter_back(self, n: i64) -> Self {
        self.iter_by(n, true)
    }

    fn iter_by(self, n: i64, back: bool) -> Self {
        if n <= 0 {
            return self;
        }
        let (steps, weight, cycle_len) = self.meta();
        Pattern::new(move |state| {
            let k = state.span.begin.to_int().rem_euclid(n);
            let mut shift = Fraction::new(k, n);
            if back {
                shift = -shift;
            }
            self.clone().early(shift).query(state)
        })
        .split_queries()
        .with_meta(steps, weight, cycle_len)
    }

    // ============= Conditional application =============

    /// Apply `f` on cycles where the predicate holds.
    pub fn when_cycle(
        self,
        pred: impl Fn(i64) -> bool + Send + Sync + 'static,
        f: Transform<T>,
    ) -> Self {
        let transformed = guard_transform(&f, self.clone(), "when_cycle");
        let (steps, weight, cycle_len) = self.meta();
        Pattern::new(move |state| {
            if pred(state.span.begin.to_int()) {
                transformed.query(state)
            } else {
                self.query(state)
            }
        })
        .split_queries()
        .with_meta(steps, weight, cycle_len)
    }

    /// Apply `f` every `n` cycles (on cycles divisible by `n`).
    pub fn every(self, n: i64, f: Transform<T>) -> Self {
        if n <= 0 {
            return self;
        }
        self.when_cycle(move |c| c.rem_euclid(n) == 0, f)
    }

    // ============= Layering =============

    /// Stack the pattern with a transformed copy of itself.
    pub fn superimpose(self, f: Transform<T>) -> Self {
        let transformed = guard_transform(&f, self.clone(), "superimpose");
        self.overlay(transformed)
    }

    /// Stack the results of several transforms of the pattern.
    pub fn layer(self, fs: Vec<Transform<T>>) -> Self {
        let layers = fs
            .iter()
            .map(|f| guard_transform(f, self.clone(), "layer"))
            .collect();
        Pattern::stack(layers)
    }

    /// Forward cycle, then mirrored cycle, alternating.
    pub fn palindrome(self) -> Self {
        let reversed = self.clone().rev();
        Pattern::slowcat(vec![self, reversed])
    }

    /// Subdivide every event into `n` equal repeats.
    pub fn ply(self, n: i64) -> Self {
        if n <= 0 {
            return Pattern::silence();
        }
        let (steps, weight, cycle_len) = self.meta();
        Pattern::new(move |state| {
            let mut out = Vec::new();
            for hap in self.query(state) {
                let w = hap.whole_or_part();
                let step = w.duration() / Fraction::from_int(n);
                if step == Fraction::ZERO {
                    out.push(hap);
                    continue;
                }
                for i in 0..n {
                    let b = w.begin + step * Fraction::from_int(i);
                    let sub = TimeSpan::new(b, b + step);
                    if let Some(part) = sub.intersect(&hap.part) {
                        let mut copy = hap.with_part(part);
                        copy.whole = Some(sub);
                        out.push(copy);
                    }
                }
            }
            sort_haps(&mut out);
            out
        })
        .with_meta(
            steps.map(|s| s * Fraction::from_int(n)),
            weight,
            cycle_len,
        )
    }

    // ============= Deterministic randomness =============

    /// Drop events with the given probability. Seeded from each event's
    /// onset time, so overlapping queries agree on what survives.
    pub fn degrade_by(self, probability: f64) -> Self {
        let (steps, weight, cycle_len) = self.meta();
        Pattern::new(move |state| {
            self.query(state)
                .into_iter()
                .filter(|hap| {
                    let mut rng = StdRng::seed_from_u64(time_seed(hap.whole_or_part().begin));
                    rng.gen::<f64>() >= probability
                })
                .collect()
        })
        .with_meta(steps, weight, cycle_len)
    }

    /// Drop half the events.
    pub fn degrade(self) -> Self {
        self.degrade_by(0.5)
    }

    /// Keep only the events `degrade_by` would drop.
    pub fn undegrade_by(self, probability: f64) -> Self {
        let (steps, weight, cycle_len) = self.meta();
        Pattern::new(move |state| {
            self.query(state)
                .into_iter()
                .filter(|hap| {
                    let mut rng = StdRng::seed_from_u64(time_seed(hap.whole_or_part().begin));
                    rng.gen::<f64>() < probability
                })
                .collect()
        })
        .with_meta(steps, weight, cycle_len)
    }

    /// Apply `f` on a per-cycle coin flip with the given probability.
    pub fn sometimes_by(self, probability: f64, f: Transform<T>) -> Self {
        let transformed = guard_transform(&f, self.clone(), "sometimes_by");
        let (steps, weight, cycle_len) = self.meta();
        Pattern::new(move |state| {
            let cycle = state.span.begin.to_int();
            let mut rng = StdRng::seed_from_u64(cycle as u64);
            if rng.gen::<f64>() < probability {
                transformed.query(state)
            } else {
                self.query(state)
            }
        })
        .split_queries()
        .with_meta(steps, weight, cycle_len)
    }

    pub fn sometimes(self, f: Transform<T>) -> Self {
        self.sometimes_by(0.5, f)
    }

    pub fn often(self, f: Transform<T>) -> Self {
        self.sometimes_by(0.75, f)
    }

    pub fn rarely(self, f: Transform<T>) -> Self {
        self.sometimes_by(0.1, f)
    }

    pub fn almost_always(self, f: Transform<T>) -> Self {
        self.sometimes_by(0.9, f)
    }

    pub fn almost_never(self, f: Transform<T>) -> Self {
        self.sometimes_by(0.1, f)
    }

    pub fn always(self, f: Transform<T>) -> Self {
        guard_transform(&f, self, "always")
    }
}

// ============= Numeric value maps =============

impl Pattern<f64> {
    pub fn add(self, amount: f64) -> Pattern<f64> {
        self.fmap(move |v| v + amount)
    }

    pub fn sub(self, amount: f64) -> Pattern<f64> {
        self.fmap(move |v| v - amount)
    }

    pub fn mul(self, amount: f64) -> Pattern<f64> {
        self.fmap(move |v| v * amount)
    }

    pub fn div(self, amount: f64) -> Pattern<f64> {
        self.fmap(move |v| v / amount)
    }

    /// Rescale values from `[0, 1]` into `[lo, hi]`.
    pub fn range(self, lo: f64, hi: f64) -> Pattern<f64> {
        self.fmap(move |v| lo + v * (hi - lo))
    }
}
