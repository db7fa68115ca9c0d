//! Structural pattern operations: struct/mask gating, windowing, slicing,
//! and cycle-level reshaping.

use crate::pattern::{sort_haps, Fraction, Pattern, TimeSpan};
use crate::pattern_ops::{guard_transform, Transform};
use tracing::warn;

/// How `structure` combines the gating pattern with the source.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StructureMode {
    /// Keep the source's events, clipped to the gate (mask).
    In,
    /// Take the gate's structure, sampling values from the source (struct).
    Out,
}

/// Values that can gate a structure operation.
pub trait Truthy {
    fn is_truthy(&self) -> bool;
}

impl Truthy for bool {
    fn is_truthy(&self) -> bool {
        *self
    }
}

impl Truthy for f64 {
    fn is_truthy(&self) -> bool {
        *self != 0.0
    }
}

impl Truthy for String {
    fn is_truthy(&self) -> bool {
        !matches!(self.as_str(), "" | "~" | "0" | "f" | "false")
    }
}

impl<T: Clone + Send + Sync + 'static> Pattern<T> {
    /// Reshape the source by another pattern's events. With `Out` the gate
    /// events carry the structure and the source supplies values; with `In`
    /// the source events survive wherever a gate event covers them. When
    /// `filter_truthy` is set, falsy gate events drop their window entirely.
    pub fn structure<U>(
        self,
        gate: Pattern<U>,
        mode: StructureMode,
        filter_truthy: bool,
    ) -> Pattern<T>
    where
        U: Clone + Send + Sync + Truthy + 'static,
    {
        let meta = match mode {
            StructureMode::Out => (gate.num_steps(), self.weight_fraction(), self.cycle_len()),
            StructureMode::In => self.meta(),
        };
        Pattern::new(move |state| {
            let mut haps = Vec::new();
            for oe in gate.query(state) {
                if filter_truthy && !oe.value.is_truthy() {
                    continue;
                }
                for se in self.query(&state.set_span(oe.part)) {
                    if let Some(part) = se.part.intersect(&oe.part) {
                        let mut hap = se.with_part(part);
                        if mode == StructureMode::Out {
                            hap.whole = oe.whole;
                        }
                        haps.push(hap);
                    }
                }
            }
            sort_haps(&mut haps);
            haps
        })
        .with_meta(meta.0, meta.1, meta.2)
    }

    /// Take rhythm from truthy gate events, values from the source.
    pub fn struct_with<U: Clone + Send + Sync + Truthy + 'static>(
        self,
        gate: Pattern<U>,
    ) -> Pattern<T> {
        self.structure(gate, StructureMode::Out, true)
    }

    /// Like `struct_with`, but falsy gate events also produce structure.
    pub fn struct_all<U: Clone + Send + Sync + Truthy + 'static>(
        self,
        gate: Pattern<U>,
    ) -> Pattern<T> {
        self.structure(gate, StructureMode::Out, false)
    }

    /// Keep source events where a truthy gate event covers them.
    pub fn mask<U: Clone + Send + Sync + Truthy + 'static>(self, gate: Pattern<U>) -> Pattern<T> {
        self.structure(gate, StructureMode::In, true)
    }

    /// Clip source events to the gate regardless of truthiness.
    pub fn mask_all<U: Clone + Send + Sync + Truthy + 'static>(
        self,
        gate: Pattern<U>,
    ) -> Pattern<T> {
        self.structure(gate, StructureMode::In, false)
    }

    /// Apply `f` to the part of the pattern a boolean gate lets through,
    /// leaving the rest untouched.
    pub fn when_gate(self, gate: Pattern<bool>, f: Transform<T>) -> Pattern<T> {
        let gated = self.clone().mask(gate.clone());
        let rest = self.mask(gate.invert_gate());
        guard_transform(&f, gated, "when_gate").overlay(rest)
    }

    // ============= Windowing =============

    /// Play only the `[begin, end)` portion of each cycle, stretched to fill
    /// the whole cycle.
    pub fn zoom(self, begin: Fraction, end: Fraction) -> Self {
        if end <= begin {
            warn!(target: "tactus::ops", %begin, %end, "zoom with empty window; yielding silence");
            return Pattern::silence();
        }
        let width = end - begin;
        let (steps, weight, cycle_len) = self.meta();
        Pattern::new(move |state| {
            let mut haps = Vec::new();
            for span in state.span.span_cycles() {
                if !state.is_live() {
                    break;
                }
                let cycle = span.begin.sam();
                let q = TimeSpan::new(
                    cycle + begin + (span.begin - cycle) * width,
                    cycle + begin + (span.end - cycle) * width,
                );
                for hap in self.query(&state.set_span(q)) {
                    haps.push(hap.with_span(|s| {
                        s.with_time(|t| cycle + (t - cycle - begin) / width)
                    }));
                }
            }
            sort_haps(&mut haps);
            haps
        })
        .with_meta(steps.map(|s| s * width), weight, cycle_len)
    }

    /// Zoom with pattern-valued window edges; the window pair is combined
    /// through inner joins so the selector structure wins.
    pub fn zoom_with(self, begin: Pattern<f64>, end: Pattern<f64>) -> Self {
        let src = self;
        begin
            .fmap(move |b| {
                let b = Fraction::from_float(*b);
                let src = src.clone();
                end.clone()
                    .fmap(move |e| src.clone().zoom(b, Fraction::from_float(*e)))
                    .inner_join()
            })
            .inner_join()
    }

    /// Slice each cycle into `n` pieces and let an index pattern choose
    /// which slice plays, squeezed into the index event.
    pub fn bite(self, n: i64, indices: Pattern<f64>) -> Pattern<T> {
        if n <= 0 {
            warn!(target: "tactus::ops", n, "bite with no slices; yielding silence");
            return Pattern::silence();
        }
        let src = self;
        indices
            .fmap(move |v| {
                let k = (v.floor() as i64).rem_euclid(n);
                src.clone()
                    .zoom(Fraction::new(k, n), Fraction::new(k + 1, n))
            })
            .squeeze_join()
    }

    /// Sample the pattern into `n` discrete events per cycle.
    pub fn segment(self, n: i64) -> Self {
        if n <= 0 {
            warn!(target: "tactus::ops", n, "segment with no steps; yielding silence");
            return Pattern::silence();
        }
        let gate = Pattern::pure(true).fast(Fraction::from_int(n));
        self.struct_with(gate).set_steps(Some(Fraction::from_int(n)))
    }

    /// Loop the first fraction `t` of every cycle (the last, for negative
    /// `t`). `t = 0` is silence.
    pub fn linger(self, t: Fraction) -> Self {
        if t == Fraction::ZERO {
            return Pattern::silence();
        }
        if t > Fraction::ZERO {
            self.zoom(Fraction::ZERO, t).fast(t.recip())
        } else {
            self.zoom(Fraction::ONE + t, Fraction::ONE).fast((-t).recip())
        }
    }

    /// Apply `f` only to events whose part begins inside the cycle-local
    /// window `[begin, end)`; everything else plays unchanged.
    pub fn within(self, begin: Fraction, end: Fraction, f: Transform<T>) -> Self {
        let inside = self.clone().filter_haps(move |h| {
            let p = h.part.begin.cycle_pos();
            begin <= p && p < end
        });
        let outside = self.filter_haps(move |h| {
            let p = h.part.begin.cycle_pos();
            !(begin <= p && p < end)
        });
        guard_transform(&f, inside, "within").overlay(outside)
    }

    /// Apply `f` to one of `n` cycle chunks, moving to the next chunk each
    /// cycle. A 1-hot gate of length `n` is rotated by `iter` and selects
    /// where the transform lands; on the slow path the source is repeated so
    /// one traversal covers every chunk over `n` cycles.
    pub fn chunk_with(
        self,
        n: i64,
        f: Transform<T>,
        back: bool,
        fast: bool,
        early_offset: Fraction,
    ) -> Self {
        if n <= 0 {
            return self;
        }
        let mut bits: Vec<Pattern<bool>> = Vec::with_capacity(n as usize);
        bits.push(Pattern::pure(true));
        for _ in 1..n {
            bits.push(Pattern::pure(false));
        }
        if back {
            bits.reverse();
        }
        // Forward traversal needs the 1-hot bit to land one slot later each
        // cycle, which is the backwards rotation of the gate itself
        let mut gate = Pattern::fastcat(bits);
        gate = if back { gate.iter(n) } else { gate.iter_back(n) };
        if early_offset != Fraction::ZERO {
            gate = gate.early(early_offset);
        }
        let src = if fast { self } else { self.repeat_cycles(n) };
        src.when_gate(gate, f)
    }

    pub fn chunk(self, n: i64, f: Transform<T>) -> Self {
        self.chunk_with(n, f, false, false, Fraction::ZERO)
    }

    pub fn chunk_back(self, n: i64, f: Transform<T>) -> Self {
        self.chunk_with(n, f, true, false, Fraction::ZERO)
    }

    /// Play each cycle of the source `n` times before moving on.
    pub fn repeat_cycles(self, n: i64) -> Self {
        if n <= 1 {
            return self;
        }
        let (steps, weight, cycle_len) = self.meta();
        Pattern::new(move |state| {
            let c = state.span.begin.to_int();
            let shift = Fraction::from_int(c - c.div_euclid(n));
            self.clone().late(shift).query(state)
        })
        .split_queries()
        .with_meta(steps, weight, cycle_len * Fraction::from_int(n))
    }

    /// Loop a `cycles`-long slice of the source starting at absolute time
    /// `offset`. Built from a whole-note trigger slowed to the slice length,
    /// restart-bound to the shifted source; like `slowcat`, not
    /// cycle-periodic in the source's own timeline.
    pub fn ribbon(self, offset: Fraction, cycles: Fraction) -> Self {
        if cycles <= Fraction::ZERO {
            warn!(target: "tactus::ops", %cycles, "ribbon with no length; yielding silence");
            return Pattern::silence();
        }
        let inner = self.early(offset);
        Pattern::pure(inner).slow(cycles).restart_join()
    }

    /// Align patterns of different declared lengths by padding the shorter
    /// ones with eventless weight, then stack them.
    pub fn stack_pad(patterns: Vec<Pattern<T>>) -> Pattern<T> {
        if patterns.is_empty() {
            return Pattern::silence();
        }
        let longest = patterns
            .iter()
            .map(|p| p.cycle_len())
            .fold(Fraction::ONE, Fraction::max);
        let padded = patterns
            .into_iter()
            .map(|p| {
                let len = p.cycle_len();
                if len < longest {
                    Pattern::arrange(vec![(len, p), (longest - len, Pattern::empty())])
                } else {
                    p
                }
            })
            .collect();
        Pattern::stack(padded)
    }

    /// Declare a step count for the pattern, letting sequence allocators
    /// treat it as `steps` steps wide.
    pub fn reinterpret_steps(self, steps: Fraction) -> Self {
        self.set_steps(Some(steps)).with_weight(steps)
    }
}

impl Pattern<bool> {
    /// Flip a boolean gate.
    pub fn invert_gate(self) -> Self {
        self.fmap(|b| !b)
    }
}
