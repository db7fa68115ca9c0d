//! The DSL binding layer and the operator registry: coercion shapes,
//! fail-quiet behavior, and the three operator bindings.

use std::sync::Arc;
use tactus::dsl::{DslArg, DslValue, SourceLoc};
use tactus::ops::{self, StringPattern};
use tactus::pattern::{Fraction, Pattern};
use tactus::registry;

fn frac(n: i64, d: i64) -> Fraction {
    Fraction::new(n, d)
}

#[test]
fn registry_invocation_matches_top_level_function() {
    let via_registry = registry::invoke("seq", vec![DslArg::from("bd sn")]);
    let via_function = ops::seq(vec![DslArg::from("bd sn")]);
    let a = via_registry.query_span(Fraction::ZERO, Fraction::ONE);
    let b = via_function.query_span(Fraction::ZERO, Fraction::ONE);
    assert_eq!(a.len(), b.len());
    for (x, y) in a.iter().zip(b.iter()) {
        assert_eq!(x.part, y.part);
        assert_eq!(x.value.sound, y.value.sound);
    }
}

#[test]
fn string_method_equals_parse_then_method() {
    let sugar = "bd sn".fast_by(2.0);
    let explicit = "bd sn".pat().fast(Fraction::from_int(2));
    let a = sugar.query_span(Fraction::ZERO, Fraction::ONE);
    let b = explicit.query_span(Fraction::ZERO, Fraction::ONE);
    assert_eq!(a.len(), b.len());
    for (x, y) in a.iter().zip(b.iter()) {
        assert_eq!(x.part, y.part);
    }
}

#[test]
fn numbers_and_bools_coerce_through_the_modifier() {
    let p = registry::invoke("gain", vec![DslArg::from(0.25)]);
    let haps = p.query_span(Fraction::ZERO, Fraction::ONE);
    assert_eq!(haps[0].value.gain, Some(0.25));

    let p = registry::invoke("value", vec![DslArg::from(true)]);
    let haps = p.query_span(Fraction::ZERO, Fraction::ONE);
    assert_eq!(
        haps[0].value.value,
        Some(tactus::VoiceValue::Bool(true))
    );
}

#[test]
fn nested_lists_become_subsequences() {
    let p = ops::seq(vec![
        DslArg::from("bd"),
        DslArg::new(DslValue::List(vec![
            DslValue::Str("sn".into()),
            DslValue::Str("cp".into()),
        ])),
    ]);
    let haps = p.query_span(Fraction::ZERO, Fraction::ONE);
    assert_eq!(haps.len(), 3);
    assert_eq!(haps[0].part.duration(), frac(1, 2));
    assert_eq!(haps[1].part.duration(), frac(1, 4));
}

#[test]
fn unconvertible_arguments_are_dropped_quietly() {
    let p = ops::seq(vec![
        DslArg::from("bd"),
        DslArg::new(DslValue::Transform(Arc::new(|p| p))),
        DslArg::from("sn"),
    ]);
    // The transform contributes nothing; the rest still sequences
    assert_eq!(p.query_span(Fraction::ZERO, Fraction::ONE).len(), 2);
}

#[test]
fn coercion_failure_yields_silence_not_panic() {
    let p = registry::invoke("pick", vec![DslArg::from("0")]);
    assert!(p.query_span(Fraction::ZERO, Fraction::ONE).is_empty());
}

#[test]
fn panicking_callback_drops_only_its_layer() {
    let p = ops::superimpose(vec![
        DslArg::from("bd sn"),
        DslArg::new(DslValue::Transform(Arc::new(|_p| -> Pattern<tactus::VoiceData> {
            panic!("user callback exploded")
        }))),
    ]);
    let haps = p.query_span(Fraction::ZERO, Fraction::ONE);
    assert_eq!(haps.len(), 2);
}

#[test]
fn source_locations_flow_into_event_context() {
    let arg = DslArg::located(
        DslValue::Str("bd sn".into()),
        SourceLoc::new("live:1"),
    );
    let p = ops::seq(vec![arg]);
    let haps = p.query_span(Fraction::ZERO, Fraction::ONE);
    let trail = haps[0].context.get("source_locations").unwrap();
    assert!(trail.starts_with("live:1"));
    // The second atom sits deeper in the string
    let trail2 = haps[1].context.get("source_locations").unwrap();
    assert_ne!(trail, trail2);
}

#[test]
fn registry_lists_operator_names() {
    let names = registry::names();
    for expected in [
        "seq", "stack", "arrange", "fast", "slow", "early", "late", "rev",
        "euclid", "euclidRot", "euclidLegato", "euclidish", "zoom", "bite",
        "segment", "linger", "ribbon", "within", "chunk", "struct", "mask",
        "pick", "pickmod", "pickOut", "pickmodOut", "pickSqueeze",
        "pickRestart", "pickReset", "pickF", "note", "sound", "gain",
    ] {
        assert!(names.iter().any(|n| n == expected), "missing {expected}");
    }
}

#[test]
fn concurrent_queries_share_patterns() {
    let p = "bd sn hh".pat().euclid(3, 8);
    let mut handles = Vec::new();
    for i in 0..4 {
        let p = p.clone();
        handles.push(std::thread::spawn(move || {
            p.query_span(Fraction::from_int(i), Fraction::from_int(i + 1))
                .len()
        }));
    }
    let counts: Vec<usize> = handles.into_iter().map(|h| h.join().unwrap()).collect();
    assert!(counts.iter().all(|&c| c == counts[0]));
}
