//! Windowing and slicing: zoom, bite, segment, linger, within, chunk,
//! ribbon, and the arrangement timeline.

use std::sync::Arc;
use tactus::dsl::{DslArg, DslValue};
use tactus::ops::{self, StringPattern};
use tactus::pattern::{Fraction, Pattern, TimeSpan};

fn frac(n: i64, d: i64) -> Fraction {
    Fraction::new(n, d)
}

fn sounds(p: &Pattern<tactus::VoiceData>, begin: Fraction, end: Fraction) -> Vec<String> {
    p.query_span(begin, end)
        .into_iter()
        .filter_map(|h| h.value.sound)
        .collect()
}

#[test]
fn zoom_scenario_middle_half() {
    let p = "bd hh sd cp".pat().zoom(frac(1, 4), frac(3, 4));
    let haps = p.query_span(Fraction::ZERO, Fraction::ONE);
    assert_eq!(haps.len(), 2);
    assert_eq!(haps[0].value.sound.as_deref(), Some("hh"));
    assert_eq!(haps[0].part, TimeSpan::new(frac(0, 1), frac(1, 2)));
    assert_eq!(haps[1].value.sound.as_deref(), Some("sd"));
    assert_eq!(haps[1].part, TimeSpan::new(frac(1, 2), frac(1, 1)));
}

#[test]
fn zoom_identity_and_composition() {
    let p = "bd hh sd cp".pat();
    // zoom(0, 1) is the identity
    let z = p.clone().zoom(Fraction::ZERO, Fraction::ONE);
    assert_eq!(
        sounds(&p, Fraction::ZERO, Fraction::ONE),
        sounds(&z, Fraction::ZERO, Fraction::ONE)
    );
    // and composing with the identity window changes nothing further
    let once = p.clone().zoom(frac(1, 4), frac(3, 4));
    let twice = p.zoom(frac(1, 4), frac(3, 4)).zoom(Fraction::ZERO, Fraction::ONE);
    let a = once.query_span(Fraction::ZERO, Fraction::ONE);
    let b = twice.query_span(Fraction::ZERO, Fraction::ONE);
    assert_eq!(a.len(), b.len());
    for (x, y) in a.iter().zip(b.iter()) {
        assert_eq!(x.part, y.part);
        assert_eq!(x.value.sound, y.value.sound);
    }
}

#[test]
fn bite_reverse_scenario() {
    let p = ops::bite(vec![
        DslArg::from("0 1 2 3"),
        DslArg::from(4.0),
        DslArg::from("3 2 1 0"),
    ]);
    let haps = p.query_span(Fraction::ZERO, Fraction::ONE);
    let values: Vec<f64> = haps
        .iter()
        .filter_map(|h| h.value.value.as_ref().and_then(|v| v.as_f64()))
        .collect();
    assert_eq!(values, vec![3.0, 2.0, 1.0, 0.0]);
    let begins: Vec<Fraction> = haps.iter().map(|h| h.part.begin).collect();
    assert_eq!(begins, vec![frac(0, 1), frac(1, 4), frac(1, 2), frac(3, 4)]);
}

#[test]
fn bite_index_wraps_modulo_slices() {
    let p = "a b".pat().bite(2, Pattern::pure(5.0));
    // 5 mod 2 = 1: the whole cycle plays slice 1
    assert_eq!(sounds(&p, Fraction::ZERO, Fraction::ONE), vec!["b"]);
}

#[test]
fn segment_samples_continuous_patterns() {
    let p = Pattern::steady(tactus::VoiceData::empty().with_sound("x")).segment(3);
    let haps = p.query_span(Fraction::ZERO, Fraction::ONE);
    assert_eq!(haps.len(), 3);
    assert!(haps.iter().all(|h| h.whole.is_some()));
    assert_eq!(haps[1].whole.unwrap(), TimeSpan::new(frac(1, 3), frac(2, 3)));
}

#[test]
fn linger_repeats_head_fraction() {
    let p = "a b c d".pat().linger(frac(1, 4));
    assert_eq!(
        sounds(&p, Fraction::ZERO, Fraction::ONE),
        vec!["a", "a", "a", "a"]
    );
    let tail = "a b c d".pat().linger(frac(-1, 4));
    assert_eq!(
        sounds(&tail, Fraction::ZERO, Fraction::ONE),
        vec!["d", "d", "d", "d"]
    );
    assert!("a b".pat()
        .linger(Fraction::ZERO)
        .query_span(Fraction::ZERO, Fraction::ONE)
        .is_empty());
}

#[test]
fn within_only_touches_the_window() {
    let p = "a b c d".pat().within(
        Fraction::ZERO,
        frac(1, 2),
        Arc::new(|p| p.gain("0")),
    );
    let haps = p.query_span(Fraction::ZERO, Fraction::ONE);
    let quiet: Vec<&str> = haps
        .iter()
        .filter(|h| h.value.gain == Some(0.0))
        .filter_map(|h| h.value.sound.as_deref())
        .collect();
    assert_eq!(quiet, vec!["a", "b"]);
    let untouched: Vec<&str> = haps
        .iter()
        .filter(|h| h.value.gain.is_none())
        .filter_map(|h| h.value.sound.as_deref())
        .collect();
    assert_eq!(untouched, vec!["c", "d"]);
}

#[test]
fn chunk_walks_the_transform() {
    let p = "a b c d".pat().chunk_with(
        4,
        Arc::new(|p| p.gain("0")),
        false,
        true,
        Fraction::ZERO,
    );
    for cycle in 0..4 {
        let haps = p.query_span(Fraction::from_int(cycle), Fraction::from_int(cycle + 1));
        let quiet: Vec<Fraction> = haps
            .iter()
            .filter(|h| h.value.gain == Some(0.0))
            .map(|h| h.part.begin.cycle_pos())
            .collect();
        assert_eq!(quiet, vec![frac(cycle, 4)]);
    }
}

#[test]
fn repeat_cycles_stretches_traversal() {
    let p = "<a b>".pat().repeat_cycles(2);
    let vals: Vec<String> = (0..4)
        .flat_map(|c| sounds(&p, Fraction::from_int(c), Fraction::from_int(c + 1)))
        .collect();
    assert_eq!(vals, vec!["a", "a", "b", "b"]);
}

#[test]
fn ribbon_loops_an_absolute_slice() {
    let p = "<a b c>".pat().ribbon(Fraction::ONE, Fraction::ONE);
    for cycle in 0..5 {
        assert_eq!(
            sounds(&p, Fraction::from_int(cycle), Fraction::from_int(cycle + 1)),
            vec!["b"]
        );
    }
}

#[test]
fn ribbon_two_cycle_slice() {
    let p = "<a b c d>".pat().ribbon(Fraction::ONE, frac(2, 1));
    assert_eq!(sounds(&p, Fraction::ZERO, Fraction::ONE), vec!["b"]);
    assert_eq!(sounds(&p, Fraction::ONE, frac(2, 1)), vec!["c"]);
    assert_eq!(sounds(&p, frac(2, 1), frac(3, 1)), vec!["b"]);
    assert_eq!(sounds(&p, frac(3, 1), frac(4, 1)), vec!["c"]);
}

#[test]
fn arrange_scenario_loops_with_period() {
    let p = ops::arrange(vec![
        DslArg::new(DslValue::List(vec![
            DslValue::Num(2.0),
            DslValue::Str("a".into()),
        ])),
        DslArg::new(DslValue::List(vec![
            DslValue::Num(1.0),
            DslValue::Str("b".into()),
        ])),
    ]);
    assert_eq!(
        sounds(&p, Fraction::ZERO, frac(3, 1)),
        vec!["a", "a", "b"]
    );
    assert_eq!(
        sounds(&p, frac(3, 1), frac(6, 1)),
        vec!["a", "a", "b"]
    );
    let haps = p.query_span(frac(3, 1), frac(6, 1));
    assert_eq!(haps[0].part.begin, frac(3, 1));
    assert_eq!(haps[2].part, TimeSpan::new(frac(5, 1), frac(6, 1)));
}

#[test]
fn stepcat_compresses_weighted_pairs_into_one_cycle() {
    let p = ops::stepcat(vec![
        DslArg::new(DslValue::List(vec![
            DslValue::Num(3.0),
            DslValue::Str("a".into()),
        ])),
        DslArg::new(DslValue::List(vec![
            DslValue::Num(1.0),
            DslValue::Str("b".into()),
        ])),
    ]);
    let haps = p.query_span(Fraction::ZERO, Fraction::ONE);
    assert_eq!(haps[0].part, TimeSpan::new(frac(0, 1), frac(3, 4)));
    assert_eq!(haps[1].part, TimeSpan::new(frac(3, 4), frac(1, 1)));
}
