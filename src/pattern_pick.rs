//! Selection family: pick patterns out of a list or map with a selector
//! pattern, combining the lookup with one of the join primitives.

use crate::pattern::Pattern;
use crate::pattern_ops::{guard_transform, Transform};
use crate::voice::VoiceData;
use std::collections::HashMap;
use tracing::warn;

/// Which join flattens the selected patterns.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PickJoin {
    /// Selected pattern keeps its own rhythm, gated by the selector.
    Inner,
    /// Onset placement follows the selector.
    Outer,
    /// The selected pattern's cycle is squeezed into the selector event.
    Squeeze,
    /// Each selector event restarts the selected pattern from cycle 0.
    Restart,
    /// Each selector event realigns the selected pattern to a cycle start.
    Reset,
}

/// Numeric selector: `value`, else `note`, else `sound_index`.
pub fn pick_index(data: &VoiceData) -> Option<f64> {
    data.value
        .as_ref()
        .and_then(|v| v.as_f64())
        .or(data.note)
        .or(data.sound_index.map(|i| i as f64))
}

/// String selector for map lookups; missing data keys to the empty string.
pub fn pick_key(data: &VoiceData) -> String {
    if let Some(value) = &data.value {
        return value.as_string();
    }
    if let Some(note) = data.note {
        return if note.fract() == 0.0 {
            format!("{}", note as i64)
        } else {
            format!("{}", note)
        };
    }
    if let Some(index) = data.sound_index {
        return format!("{}", index);
    }
    String::new()
}

fn resolve_index(idx: i64, len: i64, wrap: bool) -> usize {
    if wrap {
        idx.rem_euclid(len) as usize
    } else {
        idx.clamp(0, len - 1) as usize
    }
}

fn join_selected(selected: Pattern<Option<Pattern<VoiceData>>>, join: PickJoin) -> Pattern<VoiceData> {
    let flat = selected
        .filter_values(|o| o.is_some())
        .fmap(|o| o.clone().unwrap_or_else(Pattern::silence));
    match join {
        PickJoin::Inner => flat.inner_join(),
        PickJoin::Outer => flat.outer_join(),
        PickJoin::Squeeze => flat.squeeze_join(),
        PickJoin::Restart => flat.restart_join(),
        PickJoin::Reset => flat.reset_join(),
    }
}

impl Pattern<VoiceData> {
    /// Use this pattern as a selector over an ordered lookup. Indices clamp
    /// to the list bounds, or wrap when `wrap` is set; events whose data
    /// carries no usable index select nothing.
    pub fn pick_from(
        self,
        lookup: Vec<Pattern<VoiceData>>,
        wrap: bool,
        join: PickJoin,
    ) -> Pattern<VoiceData> {
        if lookup.is_empty() {
            warn!(target: "tactus::pick", "pick with an empty lookup; yielding silence");
            return Pattern::silence();
        }
        let len = lookup.len() as i64;
        let selected = self.fmap(move |data| {
            let idx = pick_index(data)?.floor() as i64;
            Some(lookup[resolve_index(idx, len, wrap)].clone())
        });
        join_selected(selected, join)
    }

    /// Use this pattern as a selector over a key→pattern map. A key miss
    /// selects nothing for that event and the query proceeds.
    pub fn pick_map(
        self,
        lookup: HashMap<String, Pattern<VoiceData>>,
        join: PickJoin,
    ) -> Pattern<VoiceData> {
        if lookup.is_empty() {
            warn!(target: "tactus::pick", "pick with an empty lookup; yielding silence");
            return Pattern::silence();
        }
        let selected = self.fmap(move |data| {
            let key = pick_key(data);
            let found = lookup.get(&key).cloned();
            if found.is_none() {
                warn!(target: "tactus::pick", key = key.as_str(), "pick key miss");
            }
            found
        });
        join_selected(selected, join)
    }

    /// Use this pattern as a selector over a list of pattern transforms,
    /// each applied to `base`.
    pub fn pick_transforms(
        self,
        base: Pattern<VoiceData>,
        transforms: Vec<Transform<VoiceData>>,
        wrap: bool,
    ) -> Pattern<VoiceData> {
        if transforms.is_empty() {
            warn!(target: "tactus::pick", "pick with no transforms; yielding silence");
            return Pattern::silence();
        }
        let transformed: Vec<Pattern<VoiceData>> = transforms
            .iter()
            .map(|f| guard_transform(f, base.clone(), "pick_transforms"))
            .collect();
        self.pick_from(transformed, wrap, PickJoin::Inner)
    }
}
