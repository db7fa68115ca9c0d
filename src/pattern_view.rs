//! Pattern introspection helpers for tests and tooling.

use crate::pattern::{Fraction, Hap, Pattern, State, TimeSpan};
use std::fmt::Debug;

impl<T: Clone + Send + Sync + 'static> Pattern<T> {
    /// Events of the first cycle.
    pub fn first_cycle(&self) -> Vec<Hap<T>> {
        self.query_span(Fraction::ZERO, Fraction::ONE)
    }

    /// Query an arbitrary arc given as floats; test-bed convenience only.
    pub fn query_arc(&self, begin: f64, end: f64) -> Vec<Hap<T>> {
        self.query(&State::new(TimeSpan::new(
            Fraction::from_float(begin),
            Fraction::from_float(end),
        )))
    }
}

impl<T: Clone + Send + Sync + Debug + 'static> Pattern<T> {
    /// Describe the first cycle, one line per event.
    pub fn show(&self) -> String {
        let haps = self.first_cycle();
        let mut out = format!("{} event(s) in first cycle:\n", haps.len());
        for hap in &haps {
            out.push_str(&format!(
                "  [{} - {}): {:?}\n",
                hap.part.begin, hap.part.end, hap.value
            ));
        }
        out
    }

    /// ASCII strip of the first cycle.
    pub fn draw_line(&self) -> String {
        self.draw_line_sz(40)
    }

    pub fn draw_line_sz(&self, width: usize) -> String {
        let haps = self.first_cycle();
        let mut line = vec!['.'; width];
        let w = Fraction::from_int(width as i64);
        for hap in haps {
            let begin = (hap.part.begin * w).to_int().clamp(0, width as i64) as usize;
            let end = (hap.part.end * w).ceil().to_int().clamp(0, width as i64) as usize;
            for slot in line.iter_mut().take(end).skip(begin) {
                *slot = '#';
            }
        }
        line.iter().collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_first_cycle() {
        let p = Pattern::fastcat(vec![Pattern::pure(1), Pattern::pure(2)]);
        assert_eq!(p.first_cycle().len(), 2);
    }

    #[test]
    fn test_draw_line_marks_events() {
        let p = Pattern::fastcat(vec![
            Pattern::pure("a"),
            Pattern::silence(),
            Pattern::pure("b"),
            Pattern::silence(),
        ]);
        let line = p.draw_line_sz(8);
        assert_eq!(line, "##..##..");
    }
}
