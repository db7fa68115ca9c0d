//! Euclidean rhythm family: Bjorklund distribution, rotation, legato holds,
//! and the groove morph between strict Bjorklund and even spacing.

use crate::pattern::{Fraction, Hap, Pattern, TimeSpan};
use tracing::warn;

/// Bjorklund's maximally-even distribution of `pulses` onsets among `steps`
/// slots, computed by repeatedly folding the shorter bucket list into the
/// longer until at most one remainder bucket is left.
pub fn bjorklund(pulses: usize, steps: usize) -> Vec<bool> {
    if steps == 0 {
        return Vec::new();
    }
    if pulses == 0 {
        return vec![false; steps];
    }
    if pulses >= steps {
        return vec![true; steps];
    }
    let mut front: Vec<Vec<bool>> = vec![vec![true]; pulses];
    let mut back: Vec<Vec<bool>> = vec![vec![false]; steps - pulses];
    while back.len() > 1 {
        let pairs = front.len().min(back.len());
        let mut merged = Vec::with_capacity(pairs);
        for i in 0..pairs {
            let mut bucket = front[i].clone();
            bucket.extend_from_slice(&back[i]);
            merged.push(bucket);
        }
        let front_rest = front.split_off(pairs.min(front.len()));
        let back_rest = back.split_off(pairs.min(back.len()));
        front = merged;
        back = if !front_rest.is_empty() {
            front_rest
        } else {
            back_rest
        };
    }
    let mut bits = Vec::with_capacity(steps);
    for bucket in front.into_iter().chain(back.into_iter()) {
        bits.extend(bucket);
    }
    bits
}

/// Rotate a bit string left by `rotation` (negative rotates right).
fn rotate_bits(mut bits: Vec<bool>, rotation: i64) -> Vec<bool> {
    if bits.is_empty() {
        return bits;
    }
    let len = bits.len() as i64;
    let r = rotation.rem_euclid(len) as usize;
    bits.rotate_left(r);
    bits
}

/// A boolean mask pattern with one slot per step.
pub fn euclid_mask(pulses: i64, steps: i64, rotation: i64) -> Pattern<bool> {
    if pulses < 0 || steps <= 0 {
        warn!(target: "tactus::euclid", pulses, steps, "degenerate euclidean mask; yielding silence");
        return Pattern::silence();
    }
    let bits = rotate_bits(bjorklund(pulses as usize, steps as usize), rotation);
    Pattern::fastcat(bits.into_iter().map(Pattern::pure).collect())
        .set_steps(Some(Fraction::from_int(steps)))
}

/// Like `euclid_mask`, but every hit holds until the next hit: the mask has
/// no gaps, so structured events ring for the whole inter-onset interval.
pub fn euclid_legato_mask(pulses: i64, steps: i64, rotation: i64) -> Pattern<bool> {
    if pulses <= 0 || steps <= 0 {
        warn!(target: "tactus::euclid", pulses, steps, "degenerate euclidean mask; yielding silence");
        return Pattern::silence();
    }
    let bits = rotate_bits(bjorklund(pulses as usize, steps as usize), rotation);
    let hits: Vec<i64> = bits
        .iter()
        .enumerate()
        .filter(|(_, b)| **b)
        .map(|(i, _)| i as i64)
        .collect();
    let steps_frac = Fraction::from_int(steps);
    mask_from_spans(
        hits.iter()
            .enumerate()
            .map(|(j, &hit)| {
                let next = if j + 1 < hits.len() {
                    hits[j + 1]
                } else {
                    steps + hits[0]
                };
                (
                    Fraction::from_int(hit) / steps_frac,
                    Fraction::from_int(next) / steps_frac,
                )
            })
            .collect(),
        Some(steps_frac),
    )
}

/// Morph hit positions between strict Bjorklund placement (`groove = 0`) and
/// perfectly even spacing (`groove = 1`).
pub fn euclidish_mask(pulses: i64, steps: i64, groove: f64) -> Pattern<bool> {
    if pulses <= 0 || steps <= 0 {
        warn!(target: "tactus::euclid", pulses, steps, "degenerate euclidean mask; yielding silence");
        return Pattern::silence();
    }
    let bits = bjorklund(pulses as usize, steps as usize);
    let hits: Vec<i64> = bits
        .iter()
        .enumerate()
        .filter(|(_, b)| **b)
        .map(|(i, _)| i as i64)
        .collect();
    let g = Fraction::from_float(groove.clamp(0.0, 1.0));
    let steps_frac = Fraction::from_int(steps);
    let positions: Vec<Fraction> = hits
        .iter()
        .enumerate()
        .map(|(j, &hit)| {
            let strict = Fraction::from_int(hit) / steps_frac;
            let even = Fraction::new(j as i64, pulses);
            strict + (even - strict) * g
        })
        .collect();
    let spans = positions
        .iter()
        .enumerate()
        .map(|(j, &begin)| {
            let end = if j + 1 < positions.len() {
                positions[j + 1]
            } else {
                Fraction::ONE + positions[0]
            };
            (begin, end)
        })
        .collect();
    mask_from_spans(spans, Some(steps_frac))
}

/// Build a boolean pattern from explicit cycle-local hit spans. Spans may
/// run past the cycle end; the overhang wraps as a clipped continuation.
fn mask_from_spans(spans: Vec<(Fraction, Fraction)>, steps: Option<Fraction>) -> Pattern<bool> {
    Pattern::new(move |state| {
        let mut haps = Vec::new();
        for span in state.span.span_cycles() {
            if !state.is_live() {
                break;
            }
            let cycle = span.begin.sam();
            for &(b, e) in &spans {
                // The whole may start in the previous cycle when it wraps
                for offset in [-1i64, 0] {
                    let shift = cycle + Fraction::from_int(offset);
                    let whole = TimeSpan::new(shift + b, shift + e);
                    if let Some(part) = whole.intersect(&span) {
                        haps.push(Hap::new(Some(whole), part, true));
                    }
                }
            }
        }
        crate::pattern::sort_haps(&mut haps);
        haps
    })
    .split_queries()
    .set_steps(steps)
}

impl<T: Clone + Send + Sync + 'static> Pattern<T> {
    /// Distribute this pattern's values over a Euclidean rhythm.
    pub fn euclid(self, pulses: i64, steps: i64) -> Pattern<T> {
        self.struct_with(euclid_mask(pulses, steps, 0))
    }

    /// Euclidean rhythm with rotation.
    pub fn euclid_rot(self, pulses: i64, steps: i64, rotation: i64) -> Pattern<T> {
        self.struct_with(euclid_mask(pulses, steps, rotation))
    }

    /// Euclidean rhythm where each hit sustains until the next.
    pub fn euclid_legato(self, pulses: i64, steps: i64) -> Pattern<T> {
        self.struct_with(euclid_legato_mask(pulses, steps, 0))
    }

    /// Euclidean rhythm morphed toward even spacing by `groove`.
    pub fn euclidish(self, pulses: i64, steps: i64, groove: f64) -> Pattern<T> {
        self.struct_with(euclidish_mask(pulses, steps, groove))
    }

    /// Control-driven Euclid: all three arguments are patterns. The mask is
    /// rebuilt per selector value and joined step-wise, so the step count
    /// driving allocation is read from the mask cycle by cycle. Agrees with
    /// the static path whenever the controls are plain atoms.
    pub fn euclid_with(
        self,
        pulses: Pattern<f64>,
        steps: Pattern<f64>,
        rotation: Pattern<f64>,
    ) -> Pattern<T> {
        let src = self;
        pulses
            .fmap(move |p| {
                let p = p.floor() as i64;
                let src = src.clone();
                let rotation = rotation.clone();
                steps
                    .clone()
                    .fmap(move |s| {
                        let s = s.floor() as i64;
                        let src = src.clone();
                        rotation
                            .clone()
                            .fmap(move |r| {
                                src.clone()
                                    .struct_with(euclid_mask(p, s, r.floor() as i64))
                                    .set_steps(Some(Fraction::from_int(s.max(1))))
                            })
                            .inner_join()
                    })
                    .inner_join()
            })
            .step_join()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pattern::Fraction;

    fn frac(n: i64, d: i64) -> Fraction {
        Fraction::new(n, d)
    }

    #[test]
    fn test_bjorklund_canonical_patterns() {
        let b = |p, s| {
            bjorklund(p, s)
                .iter()
                .map(|&x| if x { 'x' } else { '.' })
                .collect::<String>()
        };
        assert_eq!(b(3, 8), "x..x..x.");
        assert_eq!(b(5, 8), "x.xx.xx.");
        assert_eq!(b(2, 5), "x.x..");
        assert_eq!(b(4, 4), "xxxx");
        assert_eq!(b(0, 4), "....");
        assert_eq!(b(7, 16), "x..x.x.x..x.x.x.");
    }

    #[test]
    fn test_euclid_three_eight_onsets() {
        let p = Pattern::pure("bd").euclid(3, 8);
        let haps = p.query_span(Fraction::ZERO, Fraction::ONE);
        let onsets: Vec<Fraction> = haps.iter().map(|h| h.part.begin).collect();
        assert_eq!(onsets, vec![frac(0, 1), frac(3, 8), frac(6, 8)]);
        assert!(haps.iter().all(|h| h.value == "bd"));
    }

    #[test]
    fn test_euclid_rotation_shifts_hits() {
        let p = Pattern::pure("bd").euclid_rot(3, 8, 1);
        let haps = p.query_span(Fraction::ZERO, Fraction::ONE);
        // x..x..x. rotated left once is ..x..x.x
        let onsets: Vec<Fraction> = haps.iter().map(|h| h.part.begin).collect();
        assert_eq!(onsets, vec![frac(2, 8), frac(5, 8), frac(7, 8)]);
    }

    #[test]
    fn test_euclid_legato_fills_gaps() {
        let p = Pattern::pure("bd").euclid_legato(3, 8);
        let haps = p.query_span(Fraction::ZERO, Fraction::ONE);
        assert_eq!(haps.len(), 4);
        // Holds cover [0,3/8) and [3/8,6/8); the last wraps, so one whole
        // covers [6/8, 9/8) and its overhang shows clipped at [0, 1/8)
        assert_eq!(haps[0].whole.unwrap(), TimeSpan::new(frac(0, 1), frac(3, 8)));
        assert!(haps[0].has_onset());
        assert_eq!(haps[1].part, TimeSpan::new(frac(0, 1), frac(1, 8)));
        assert!(!haps[1].has_onset());
        assert_eq!(haps[2].whole.unwrap(), TimeSpan::new(frac(3, 8), frac(6, 8)));
        assert_eq!(
            haps[3].whole.unwrap(),
            TimeSpan::new(frac(6, 8), frac(9, 8))
        );
    }

    #[test]
    fn test_euclidish_endpoints() {
        // groove 0 is strict bjorklund
        let strict = Pattern::pure(1).euclidish(3, 8, 0.0);
        let onsets: Vec<Fraction> = strict
            .query_span(Fraction::ZERO, Fraction::ONE)
            .iter()
            .filter(|h| h.has_onset())
            .map(|h| h.part.begin)
            .collect();
        assert_eq!(onsets, vec![frac(0, 1), frac(3, 8), frac(6, 8)]);
        // groove 1 is perfectly even
        let even = Pattern::pure(1).euclidish(3, 8, 1.0);
        let onsets: Vec<Fraction> = even
            .query_span(Fraction::ZERO, Fraction::ONE)
            .iter()
            .filter(|h| h.has_onset())
            .map(|h| h.part.begin)
            .collect();
        assert_eq!(onsets, vec![frac(0, 1), frac(1, 3), frac(2, 3)]);
    }

    #[test]
    fn test_euclid_with_atoms_matches_static() {
        let control = Pattern::pure("bd").euclid_with(
            Pattern::pure(3.0),
            Pattern::pure(8.0),
            Pattern::pure(0.0),
        );
        let fixed = Pattern::pure("bd").euclid(3, 8);
        let a = control.query_span(Fraction::ZERO, Fraction::ONE);
        let b = fixed.query_span(Fraction::ZERO, Fraction::ONE);
        assert_eq!(a.len(), b.len());
        for (x, y) in a.iter().zip(b.iter()) {
            assert_eq!(x.part, y.part);
            assert_eq!(x.whole, y.whole);
        }
    }

    #[test]
    fn test_euclid_with_alternating_steps() {
        let control = Pattern::pure("bd").euclid_with(
            Pattern::slowcat(vec![Pattern::pure(3.0), Pattern::pure(4.0)]),
            Pattern::pure(8.0),
            Pattern::pure(0.0),
        );
        assert_eq!(
            control
                .query_span(Fraction::ZERO, Fraction::ONE)
                .iter()
                .filter(|h| h.has_onset())
                .count(),
            3
        );
        assert_eq!(
            control
                .query_span(Fraction::ONE, frac(2, 1))
                .iter()
                .filter(|h| h.has_onset())
                .count(),
            4
        );
    }
}
