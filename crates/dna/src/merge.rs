//! Field-by-field merge of a provider payload over a complete baseline.
//!
//! Providers hand back loosely-shaped JSON. Nothing in it is trusted: a field
//! that is missing or has the wrong shape keeps the baseline value, a step
//! array that is present replaces the baseline array (after element-wise
//! coercion and truncation to [`MAX_PATTERN_LEN`]), and metadata strings are
//! copied only when they are strings.

use log::debug;
use serde_json::{Map, Value};

use crate::model::{MasterDna, SectionDna, MAX_PATTERN_LEN};

/// Merge `payload` over `baseline`, returning a brand-new complete DNA
pub fn merge_over_baseline(baseline: &MasterDna, payload: &Value) -> MasterDna {
    let mut merged = baseline.clone();

    let Some(obj) = payload.as_object() else {
        debug!("Provider payload is not an object, keeping baseline");
        return merged;
    };

    let mut overridden = 0;
    overridden += merge_text(&mut merged.genre, obj.get("genre"));
    overridden += merge_text(&mut merged.color, obj.get("color"));
    overridden += merge_text(&mut merged.mood, obj.get("mood"));
    overridden += merge_text(&mut merged.scale, obj.get("scale"));
    overridden += merge_text(&mut merged.intention, obj.get("intention"));

    if let Some(section) = obj.get("A").and_then(Value::as_object) {
        overridden += merge_section(&mut merged.a, section);
    }
    if let Some(section) = obj.get("B").and_then(Value::as_object) {
        overridden += merge_section(&mut merged.b, section);
    }

    debug!("Merged provider payload over baseline ({} fields overridden)", overridden);
    merged
}

fn merge_text(target: &mut String, value: Option<&Value>) -> usize {
    match value.and_then(Value::as_str) {
        Some(text) => {
            *target = text.to_string();
            1
        }
        None => 0,
    }
}

fn merge_section(target: &mut SectionDna, obj: &Map<String, Value>) -> usize {
    let mut overridden = 0;

    if let Some(drums) = obj.get("drums").and_then(Value::as_object) {
        overridden += replace(&mut target.drums.kick, drums.get("kick").and_then(flags));
        overridden += replace(&mut target.drums.snare, drums.get("snare").and_then(flags));
        overridden += replace(&mut target.drums.hihat, drums.get("hihat").and_then(flags));
        match drums.get("glitch") {
            Some(Value::Null) => {
                target.drums.glitch = None;
                overridden += 1;
            }
            Some(value) => {
                if let Some(lane) = flags(value) {
                    target.drums.glitch = Some(lane);
                    overridden += 1;
                }
            }
            None => {}
        }
    }

    overridden += replace(&mut target.bass_line, obj.get("bassLine").and_then(notes));
    overridden += replace(&mut target.lead_melody, obj.get("leadMelody").and_then(notes));
    overridden += replace(&mut target.chord_progression, obj.get("chordProgression").and_then(chords));
    overridden += replace(&mut target.arp_pattern, obj.get("arpPattern").and_then(flags));
    overridden += replace(&mut target.prob_map, obj.get("probMap").and_then(probabilities));

    overridden
}

fn replace<T>(target: &mut T, value: Option<T>) -> usize {
    match value {
        Some(value) => {
            *target = value;
            1
        }
        None => 0,
    }
}

fn step_values(value: &Value) -> Option<impl Iterator<Item = &Value>> {
    value.as_array().map(|items| items.iter().take(MAX_PATTERN_LEN))
}

fn flags(value: &Value) -> Option<Vec<bool>> {
    step_values(value).map(|items| items.map(flag).collect())
}

fn flag(value: &Value) -> bool {
    match value {
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().map_or(false, |n| n != 0.0),
        Value::String(s) => matches!(s.trim(), "x" | "X" | "1" | "true"),
        _ => false,
    }
}

fn notes(value: &Value) -> Option<Vec<Option<u8>>> {
    step_values(value).map(|items| items.map(note).collect())
}

/// A MIDI note, or `None` for anything that is a rest or unusable
fn note(value: &Value) -> Option<u8> {
    let number = match value {
        Value::Number(n) => n.as_f64()?,
        Value::String(s) => s.trim().parse::<f64>().ok()?,
        _ => return None,
    };
    if !number.is_finite() {
        return None;
    }
    let rounded = number.round();
    (0.0..=127.0).contains(&rounded).then_some(rounded as u8)
}

fn chords(value: &Value) -> Option<Vec<Vec<u8>>> {
    let items = value.as_array()?;

    // A flat list of numbers is read as a single chord
    if items.iter().all(|item| !item.is_array()) {
        let chord: Vec<u8> = items.iter().filter_map(note).collect();
        return (!chord.is_empty()).then(|| vec![chord]);
    }

    let progression: Vec<Vec<u8>> = items
        .iter()
        .filter_map(Value::as_array)
        .map(|chord| chord.iter().filter_map(note).collect::<Vec<u8>>())
        .filter(|chord| !chord.is_empty())
        .take(MAX_PATTERN_LEN)
        .collect();

    (!progression.is_empty()).then_some(progression)
}

// Unusable entries stay NaN so the scheduler's configured fallback applies
fn probabilities(value: &Value) -> Option<Vec<f32>> {
    step_values(value).map(|items| {
        items
            .map(|item| match item.as_f64() {
                Some(p) if p.is_finite() => p.clamp(0.0, 1.0) as f32,
                _ => f32::NAN,
            })
            .collect()
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_genre_only_payload() {
        let baseline = MasterDna::baseline();
        let merged = merge_over_baseline(&baseline, &json!({ "genre": "X" }));

        let mut expected = baseline.clone();
        expected.genre = "X".to_string();
        assert_eq!(merged, expected);
    }

    #[test]
    fn test_non_object_payload_keeps_baseline() {
        let baseline = MasterDna::baseline();
        assert_eq!(merge_over_baseline(&baseline, &json!("nonsense")), baseline);
        assert_eq!(merge_over_baseline(&baseline, &json!([1, 2, 3])), baseline);
        assert_eq!(merge_over_baseline(&baseline, &Value::Null), baseline);
    }

    #[test]
    fn test_wrong_field_types_keep_baseline() {
        let baseline = MasterDna::baseline();
        let payload = json!({
            "genre": 42,
            "A": { "bassLine": "not an array", "drums": { "kick": 7 } },
            "B": "also wrong"
        });
        assert_eq!(merge_over_baseline(&baseline, &payload), baseline);
    }

    #[test]
    fn test_partial_section_keeps_other_fields() {
        let baseline = MasterDna::baseline();
        let payload = json!({
            "A": { "drums": { "kick": [1, 0, 1, 0] } }
        });
        let merged = merge_over_baseline(&baseline, &payload);

        assert_eq!(merged.a.drums.kick, vec![true, false, true, false]);
        assert_eq!(merged.a.drums.snare, baseline.a.drums.snare);
        assert_eq!(merged.a.bass_line, baseline.a.bass_line);
        assert_eq!(merged.b, baseline.b);
    }

    #[test]
    fn test_rests_are_explicit() {
        let baseline = MasterDna::baseline();
        let payload = json!({
            "A": { "leadMelody": [60, null, "rest", "-", 0, 64.4, 200, -3, "67"] }
        });
        let merged = merge_over_baseline(&baseline, &payload);
        assert_eq!(
            merged.a.lead_melody,
            vec![Some(60), None, None, None, Some(0), Some(64), None, None, Some(67)]
        );
    }

    #[test]
    fn test_long_arrays_are_truncated() {
        let baseline = MasterDna::baseline();
        let long: Vec<bool> = vec![true; MAX_PATTERN_LEN * 4];
        let payload = json!({ "B": { "arpPattern": long } });
        let merged = merge_over_baseline(&baseline, &payload);
        assert_eq!(merged.b.arp_pattern.len(), MAX_PATTERN_LEN);
    }

    #[test]
    fn test_probabilities_are_sanitized() {
        let baseline = MasterDna::baseline();
        let payload = json!({ "A": { "probMap": [0.5, 3.0, -1.0, "high", null] } });
        let merged = merge_over_baseline(&baseline, &payload);
        assert_eq!(&merged.a.prob_map[..3], &[0.5, 1.0, 0.0]);
        assert!(merged.a.prob_map[3].is_nan());
        assert!(merged.a.prob_map[4].is_nan());
    }

    #[test]
    fn test_unusable_probability_uses_callers_fallback() {
        let baseline = MasterDna::baseline();
        let payload = json!({ "A": { "probMap": [0.5, "high", {}] } });
        let merged = merge_over_baseline(&baseline, &payload);

        assert_eq!(merged.a.probability(0, 0.3), 0.5);
        assert_eq!(merged.a.probability(1, 0.3), 0.3);
        assert_eq!(merged.a.probability(2, 0.6), 0.6);
        // past the end of the map behaves the same way
        assert_eq!(merged.a.probability(7, 0.3), 0.3);
    }

    #[test]
    fn test_chord_shapes() {
        let baseline = MasterDna::baseline();

        let flat = merge_over_baseline(&baseline, &json!({ "A": { "chordProgression": [60, 64, 67] } }));
        assert_eq!(flat.a.chord_progression, vec![vec![60, 64, 67]]);

        let nested = merge_over_baseline(
            &baseline,
            &json!({ "A": { "chordProgression": [[], ["x"], [62, 65, 69]] } }),
        );
        assert_eq!(nested.a.chord_progression, vec![vec![62, 65, 69]]);

        let empty = merge_over_baseline(&baseline, &json!({ "A": { "chordProgression": [] } }));
        assert_eq!(empty.a.chord_progression, baseline.a.chord_progression);
    }

    #[test]
    fn test_glitch_lane_can_be_added_and_removed() {
        let baseline = MasterDna::baseline();
        let payload = json!({
            "A": { "drums": { "glitch": ["x", ".", true, false] } },
            "B": { "drums": { "glitch": null } }
        });
        let merged = merge_over_baseline(&baseline, &payload);
        assert_eq!(merged.a.drums.glitch, Some(vec![true, false, true, false]));
        assert_eq!(merged.b.drums.glitch, None);
    }
}
