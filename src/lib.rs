//! # Tactus - a lazy, algebraic pattern language for live coding
//!
//! Tactus is the pattern core of a live coding system in the TidalCycles
//! tradition. A pattern is not a stored event list but a function from a
//! half-open rational time span to the discrete events intersecting it;
//! combinators compose these query functions without ever materialising a
//! timeline.
//!
//! ## Core ideas
//!
//! - **Exact time**: all query arithmetic is rational (`Fraction`); floats
//!   only appear at the DSL boundary and in the audio projection.
//! - **Cycles**: the unit interval `[n, n+1)` is the natural period. Most
//!   combinators are cycle-periodic; `slowcat` and `ribbon` are the
//!   documented exceptions.
//! - **Events**: a `Hap` pairs the logical note span (`whole`) with the
//!   portion visible in the current query (`part`), plus a `VoiceData`
//!   record of optional musical parameters.
//!
//! ## Quick start
//!
//! ```rust
//! use tactus::ops::StringPattern;
//! use tactus::pattern::Fraction;
//!
//! // Four sounds, one cycle, via mini-notation
//! let pattern = "bd sn hh cp".pat();
//! let events = pattern.query_span(Fraction::ZERO, Fraction::ONE);
//! assert_eq!(events.len(), 4);
//!
//! // Euclidean rhythms and controls compose on the pattern
//! let kicks = "bd".pat().euclid(3, 8).gain("0.9");
//! assert_eq!(kicks.query_span(Fraction::ZERO, Fraction::ONE).len(), 3);
//! ```
//!
//! ## Mini-notation
//!
//! - **`bd sn hh`** - sequence within one cycle
//! - **`bd*4`** / **`bd/2`** - replicate / slow
//! - **`bd ~ sn ~`** - rests
//! - **`<bd sn cp>`** - alternate per cycle
//! - **`[bd, sn]`** - stack
//! - **`bd(3,8)`** - inline Euclidean rhythm
//! - **`bd:3`** - sound index, **`bd@3`** - weighted duration,
//!   **`bd!3`** - repeat
//!
//! Operators are also published by name in a process-wide registry
//! (`registry::invoke("euclid", ...)`) for external script interpreters.

pub mod dsl;
pub mod mini_notation;
pub mod note;
pub mod ops;
pub mod pattern;
pub mod pattern_euclid;
pub mod pattern_join;
pub mod pattern_ops;
pub mod pattern_pick;
pub mod pattern_structure;
pub mod pattern_view;
pub mod registry;
pub mod voice;
pub mod voice_output;

pub use dsl::{DslArg, DslValue, SourceLoc};
pub use mini_notation::{parse_mini_notation, parse_mini_notation_with};
pub use pattern::{Fraction, Hap, Pattern, State, TimeSpan};
pub use pattern_pick::PickJoin;
pub use voice::{VoiceData, VoiceValue};
pub use voice_output::{voice_output, VoiceOutput};
