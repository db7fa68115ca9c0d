//! Algebraic laws of the pattern core: purity, periodicity, transform
//! inverses, and the sequencing/stacking contracts.

use tactus::ops::StringPattern;
use tactus::pattern::{Fraction, Hap, Pattern, TimeSpan};
use tactus::voice::VoiceData;

fn frac(n: i64, d: i64) -> Fraction {
    Fraction::new(n, d)
}

/// Comparable fingerprint of an event.
fn key(hap: &Hap<VoiceData>) -> (Fraction, Fraction, Option<TimeSpan>, String) {
    (
        hap.part.begin,
        hap.part.end,
        hap.whole,
        hap.value.sound.clone().unwrap_or_default(),
    )
}

fn fingerprints(haps: &[Hap<VoiceData>]) -> Vec<(Fraction, Fraction, Option<TimeSpan>, String)> {
    haps.iter().map(key).collect()
}

#[test]
fn queries_are_pure() {
    let p = "bd [sn sn] <hh cp> bd(3,8)".pat();
    let a = p.query_span(frac(1, 3), frac(7, 2));
    let b = p.query_span(frac(1, 3), frac(7, 2));
    assert_eq!(fingerprints(&a), fingerprints(&b));
}

#[test]
fn plain_patterns_are_cycle_periodic() {
    let patterns = vec![
        "bd sn hh cp".pat(),
        "bd(3,8)".pat(),
        "bd*3 [sn cp]".pat(),
        "bd sn".pat().fast(frac(2, 1)),
        "bd sn hh".pat().rev(),
        "bd sn".pat().early(frac(1, 8)),
    ];
    for p in patterns {
        let base = p.query_span(frac(1, 4), frac(3, 4));
        let shifted = p.query_span(frac(5, 4), frac(7, 4));
        let expected: Vec<_> = base
            .iter()
            .map(|h| key(&h.shift(Fraction::ONE)))
            .collect();
        assert_eq!(fingerprints(&shifted), expected);
    }
}

#[test]
fn slowcat_is_documented_periodicity_exception() {
    // The chosen child is queried at the absolute span, so a two-cycle
    // query does not repeat the one-cycle answer
    let p = Pattern::slowcat(vec!["a".pat(), "b".pat()]);
    let c0 = p.query_span(Fraction::ZERO, Fraction::ONE);
    let c1 = p.query_span(Fraction::ONE, frac(2, 1));
    assert_eq!(c0[0].value.sound.as_deref(), Some("a"));
    assert_eq!(c1[0].value.sound.as_deref(), Some("b"));
}

#[test]
fn fast_slow_are_inverse() {
    let p = "bd sn hh".pat();
    for k in [2, 3, 7] {
        let q = p.clone().fast(frac(k, 1)).slow(frac(k, 1));
        assert_eq!(
            fingerprints(&p.query_span(Fraction::ZERO, frac(2, 1))),
            fingerprints(&q.query_span(Fraction::ZERO, frac(2, 1)))
        );
    }
}

#[test]
fn early_late_are_inverse() {
    let p = "bd sn hh cp".pat();
    for delta in [frac(1, 4), frac(1, 3), frac(5, 8)] {
        let q = p.clone().early(delta).late(delta);
        assert_eq!(
            fingerprints(&p.query_span(Fraction::ZERO, Fraction::ONE)),
            fingerprints(&q.query_span(Fraction::ZERO, Fraction::ONE))
        );
    }
}

#[test]
fn stack_commutes_up_to_ordering() {
    let p = "bd sn".pat();
    let q = "hh hh hh".pat();
    let a = Pattern::stack(vec![p.clone(), q.clone()]);
    let b = Pattern::stack(vec![q, p]);
    let mut fa = fingerprints(&a.query_span(Fraction::ZERO, Fraction::ONE));
    let mut fb = fingerprints(&b.query_span(Fraction::ZERO, Fraction::ONE));
    fa.sort();
    fb.sort();
    assert_eq!(fa, fb);
}

#[test]
fn stack_emits_all_children_sorted() {
    // Two against three: five events, ordered by part begin
    let p = Pattern::stack(vec!["bd sd".pat(), "hh hh hh".pat()]);
    let haps = p.query_span(Fraction::ZERO, Fraction::ONE);
    assert_eq!(haps.len(), 5);
    let begins: Vec<Fraction> = haps.iter().map(|h| h.part.begin).collect();
    assert_eq!(
        begins,
        vec![frac(0, 1), frac(0, 1), frac(1, 3), frac(1, 2), frac(2, 3)]
    );
    let mut sorted = begins.clone();
    sorted.sort();
    assert_eq!(begins, sorted);
}

#[test]
fn sequence_is_the_disjoint_union_of_compressed_children() {
    let p = "bd sn".pat();
    let q = "hh hh hh".pat();
    let seq = Pattern::fastcat(vec![p.clone(), q.clone()]);
    let haps = seq.query_span(Fraction::ZERO, Fraction::ONE);

    let compress = |haps: Vec<Hap<VoiceData>>, offset: Fraction| {
        haps.into_iter()
            .map(|h| h.with_span(|s| TimeSpan::new(
                s.begin / frac(2, 1) + offset,
                s.end / frac(2, 1) + offset,
            )))
            .collect::<Vec<_>>()
    };
    let mut expected = compress(p.query_span(Fraction::ZERO, Fraction::ONE), Fraction::ZERO);
    expected.extend(compress(
        q.query_span(Fraction::ZERO, Fraction::ONE),
        frac(1, 2),
    ));
    let mut fa = fingerprints(&haps);
    let mut fb = fingerprints(&expected);
    fa.sort();
    fb.sort();
    assert_eq!(fa, fb);
}

#[test]
fn basic_sequence_scenario() {
    let p = "bd sd hh cp".pat();
    let haps = p.query_span(Fraction::ZERO, Fraction::ONE);
    assert_eq!(haps.len(), 4);
    for (i, hap) in haps.iter().enumerate() {
        assert_eq!(hap.part.begin, frac(i as i64, 4));
        assert_eq!(hap.part.duration(), frac(1, 4));
        assert!(hap.has_onset());
    }
    let sounds: Vec<&str> = haps.iter().filter_map(|h| h.value.sound.as_deref()).collect();
    assert_eq!(sounds, vec!["bd", "sd", "hh", "cp"]);
}

#[test]
fn events_clip_part_but_keep_whole() {
    let p = "bd sn".pat();
    let haps = p.query_span(frac(1, 4), frac(3, 4));
    assert_eq!(haps.len(), 2);
    assert_eq!(haps[0].part, TimeSpan::new(frac(1, 4), frac(1, 2)));
    assert_eq!(haps[0].whole, Some(TimeSpan::new(frac(0, 1), frac(1, 2))));
    assert!(!haps[0].has_onset());
    assert_eq!(haps[1].part, TimeSpan::new(frac(1, 2), frac(3, 4)));
    assert!(haps[1].has_onset());
}

#[test]
fn weights_allocate_time_proportionally() {
    let p = Pattern::timecat(vec![
        (frac(3, 1), "bd".pat()),
        (frac(1, 1), "sn".pat()),
    ]);
    let haps = p.query_span(Fraction::ZERO, Fraction::ONE);
    assert_eq!(haps[0].part, TimeSpan::new(frac(0, 1), frac(3, 4)));
    assert_eq!(haps[1].part, TimeSpan::new(frac(3, 4), frac(1, 1)));
}

#[test]
fn gap_occupies_time_without_events() {
    let p = Pattern::sequence(vec![
        "bd".pat(),
        Pattern::gap(frac(3, 1)),
    ]);
    let haps = p.query_span(Fraction::ZERO, Fraction::ONE);
    assert_eq!(haps.len(), 1);
    assert_eq!(haps[0].part, TimeSpan::new(frac(0, 1), frac(1, 4)));
}

#[test]
fn negative_cycles_behave() {
    let p = "bd sn".pat();
    let haps = p.query_span(frac(-1, 1), Fraction::ZERO);
    assert_eq!(haps.len(), 2);
    assert_eq!(haps[0].part.begin, frac(-1, 1));
    assert_eq!(haps[1].part.begin, frac(-1, 2));
}
