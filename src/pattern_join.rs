//! Join primitives: flattening a pattern of patterns into a pattern.
//!
//! The variants differ in where the event structure comes from and how the
//! inner pattern's timeline is aligned with the outer event that selected it.

use crate::pattern::{sort_haps, Fraction, Hap, Pattern, TimeSpan};

impl<T: Clone + Send + Sync + 'static> Pattern<T> {
    /// Map the pattern's cycle `[0, 1)` affinely onto `span`. Used by the
    /// squeeze join and by `bite`.
    pub fn compress_span(self, span: TimeSpan) -> Self {
        let len = span.duration();
        if len == Fraction::ZERO {
            return Pattern::silence();
        }
        let begin = span.begin;
        self.with_query_time(move |t| (t - begin) / len)
            .with_hap_time(move |t| begin + t * len)
    }
}

impl<T: Clone + Send + Sync + 'static> Pattern<Pattern<T>> {
    /// Structure from the inner pattern, gated by the outer: each selected
    /// pattern keeps its own rhythm, clipped to the selecting event.
    pub fn inner_join(self) -> Pattern<T> {
        let (steps, weight, cycle_len) = self.meta();
        Pattern::new(move |state| {
            let mut haps = Vec::new();
            for outer in self.query(state) {
                let inner = outer.value.clone();
                for hap in inner.query(&state.set_span(outer.part)) {
                    if let Some(part) = hap.part.intersect(&outer.part) {
                        let mut hap = hap.with_part(part);
                        for (k, v) in &outer.context {
                            hap.context.entry(k.clone()).or_insert_with(|| v.clone());
                        }
                        haps.push(hap);
                    }
                }
            }
            sort_haps(&mut haps);
            haps
        })
        .with_meta(steps, weight, cycle_len)
    }

    /// Structure from the outer pattern: every emitted event takes the
    /// selecting event's whole, so onset placement follows the selector.
    pub fn outer_join(self) -> Pattern<T> {
        let (steps, weight, cycle_len) = self.meta();
        Pattern::new(move |state| {
            let mut haps = Vec::new();
            for outer in self.query(state) {
                let inner = outer.value.clone();
                for hap in inner.query(&state.set_span(outer.part)) {
                    if let Some(part) = hap.part.intersect(&outer.part) {
                        let mut hap = hap.with_part(part);
                        hap.whole = outer.whole;
                        for (k, v) in &outer.context {
                            hap.context.entry(k.clone()).or_insert_with(|| v.clone());
                        }
                        haps.push(hap);
                    }
                }
            }
            sort_haps(&mut haps);
            haps
        })
        .with_meta(steps, weight, cycle_len)
    }

    /// Compress each selected pattern so its cycle 0 exactly fills the
    /// selecting event, then clip to the visible part.
    pub fn squeeze_join(self) -> Pattern<T> {
        let (steps, weight, cycle_len) = self.meta();
        Pattern::new(move |state| {
            let mut haps = Vec::new();
            for outer in self.query(state) {
                let focus = outer.whole_or_part();
                if focus.duration() == Fraction::ZERO {
                    continue;
                }
                let inner = outer.value.clone().compress_span(focus);
                for hap in inner.query(&state.set_span(outer.part)) {
                    if let Some(part) = hap.part.intersect(&outer.part) {
                        let mut hap = hap.with_part(part);
                        for (k, v) in &outer.context {
                            hap.context.entry(k.clone()).or_insert_with(|| v.clone());
                        }
                        haps.push(hap);
                    }
                }
            }
            sort_haps(&mut haps);
            haps
        })
        .with_meta(steps, weight, cycle_len)
    }

    /// Each outer event acts as a trigger that re-queries its inner pattern
    /// from cycle 0: the inner timeline starts at the trigger time.
    pub fn restart_join(self) -> Pattern<T> {
        self.trigger_join(true)
    }

    /// Like `restart_join`, but the inner pattern only resets its phase: its
    /// next cycle boundary is aligned to the trigger and absolute cycles are
    /// kept.
    pub fn reset_join(self) -> Pattern<T> {
        self.trigger_join(false)
    }

    fn trigger_join(self, restart: bool) -> Pattern<T> {
        let (steps, weight, cycle_len) = self.meta();
        Pattern::new(move |state| {
            let mut haps = Vec::new();
            for outer in self.query(state) {
                let trigger = outer.whole_or_part().begin;
                let shift = if restart { trigger } else { trigger.cycle_pos() };
                let inner = outer.value.clone().late(shift);
                for hap in inner.query(&state.set_span(outer.part)) {
                    if let Some(part) = hap.part.intersect(&outer.part) {
                        let mut hap = hap.with_part(part);
                        for (k, v) in &outer.context {
                            hap.context.entry(k.clone()).or_insert_with(|| v.clone());
                        }
                        haps.push(hap);
                    }
                }
            }
            sort_haps(&mut haps);
            haps
        })
        .with_meta(steps, weight, cycle_len)
    }

    /// Structure-aware join: the selecting event's span is walked along the
    /// inner pattern's step grid and queried one step at a time, so inner
    /// patterns whose answer depends on query granularity line up with their
    /// own steps.
    pub fn step_join(self) -> Pattern<T> {
        let (steps, weight, cycle_len) = self.meta();
        Pattern::new(move |state| {
            let mut haps = Vec::new();
            for outer in self.query(state) {
                let inner = outer.value.clone();
                let n = inner
                    .num_steps()
                    .filter(|s| *s > Fraction::ZERO)
                    .unwrap_or(Fraction::ONE);
                let step = n.recip();
                let mut t = (outer.part.begin / step).floor() * step;
                while t < outer.part.end {
                    if !state.is_live() {
                        break;
                    }
                    let sub = TimeSpan::new(t.max(outer.part.begin), (t + step).min(outer.part.end));
                    t = t + step;
                    if sub.begin >= sub.end {
                        continue;
                    }
                    for hap in inner.query(&state.set_span(sub)) {
                        if let Some(part) = hap.part.intersect(&sub) {
                            haps.push(hap.with_part(part));
                        }
                    }
                }
            }
            sort_haps(&mut haps);
            haps
        })
        .with_meta(steps, weight, cycle_len)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pattern::Fraction;

    fn frac(n: i64, d: i64) -> Fraction {
        Fraction::new(n, d)
    }

    fn seq3() -> Pattern<&'static str> {
        Pattern::fastcat(vec![
            Pattern::pure("x"),
            Pattern::pure("y"),
            Pattern::pure("z"),
        ])
    }

    #[test]
    fn test_inner_join_keeps_inner_structure() {
        // Selector chooses the same inner pattern over the whole cycle
        let outer = Pattern::pure(seq3());
        let haps = outer.inner_join().query_span(Fraction::ZERO, Fraction::ONE);
        assert_eq!(haps.len(), 3);
        assert_eq!(haps[0].whole.unwrap().end, frac(1, 3));
        assert_eq!(haps[1].value, "y");
    }

    #[test]
    fn test_inner_join_gates_by_outer_part() {
        // The selector only covers half the cycle, so only the inner events
        // in that half survive, clipped
        let outer = Pattern::fastcat(vec![Pattern::pure(seq3()), Pattern::pure(Pattern::silence())]);
        let haps = outer.inner_join().query_span(Fraction::ZERO, Fraction::ONE);
        assert_eq!(haps.len(), 2);
        assert_eq!(haps[0].part, TimeSpan::new(frac(0, 1), frac(1, 3)));
        assert_eq!(haps[1].part, TimeSpan::new(frac(1, 3), frac(1, 2)));
        // Clipped part keeps the inner whole
        assert_eq!(haps[1].whole.unwrap(), TimeSpan::new(frac(1, 3), frac(2, 3)));
    }

    #[test]
    fn test_outer_join_takes_outer_whole() {
        let outer = Pattern::fastcat(vec![Pattern::pure(seq3()), Pattern::pure(seq3())]);
        let haps = outer.outer_join().query_span(Fraction::ZERO, Fraction::ONE);
        for hap in &haps {
            let w = hap.whole.unwrap();
            assert!(
                w == TimeSpan::new(frac(0, 1), frac(1, 2))
                    || w == TimeSpan::new(frac(1, 2), frac(1, 1))
            );
        }
    }

    #[test]
    fn test_squeeze_join_fits_inner_cycle() {
        // One selecting event per half cycle; the inner 3-step cycle is
        // compressed into each half
        let outer = Pattern::fastcat(vec![Pattern::pure(seq3()), Pattern::pure(seq3())]);
        let haps = outer.squeeze_join().query_span(Fraction::ZERO, Fraction::ONE);
        assert_eq!(haps.len(), 6);
        assert_eq!(haps[0].part, TimeSpan::new(frac(0, 1), frac(1, 6)));
        assert_eq!(haps[3].part, TimeSpan::new(frac(1, 2), frac(2, 3)));
        assert_eq!(haps[3].value, "x");
    }

    #[test]
    fn test_restart_join_resets_to_cycle_zero() {
        // The inner pattern alternates per cycle; a restart trigger at cycle
        // 1 must still see the cycle-0 face
        let alt = Pattern::slowcat(vec![Pattern::pure("first"), Pattern::pure("second")]);
        let outer = Pattern::pure(alt);
        let haps = outer.restart_join().query_span(Fraction::ONE, frac(2, 1));
        assert_eq!(haps.len(), 1);
        assert_eq!(haps[0].value, "first");
    }

    #[test]
    fn test_reset_join_keeps_absolute_cycle() {
        let alt = Pattern::slowcat(vec![Pattern::pure("first"), Pattern::pure("second")]);
        let outer = Pattern::pure(alt);
        let haps = outer.reset_join().query_span(Fraction::ONE, frac(2, 1));
        assert_eq!(haps.len(), 1);
        assert_eq!(haps[0].value, "second");
    }

    #[test]
    fn test_step_join_walks_step_grid() {
        let outer = Pattern::pure(seq3());
        let haps = outer.step_join().query_span(Fraction::ZERO, Fraction::ONE);
        assert_eq!(haps.len(), 3);
        assert_eq!(haps[2].part, TimeSpan::new(frac(2, 3), frac(1, 1)));
    }
}
