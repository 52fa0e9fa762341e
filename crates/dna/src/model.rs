use serde::{Deserialize, Serialize};

use common::Section;

/// Default probability gate for steps without a usable `probMap` entry
pub const DEFAULT_PROBABILITY: f32 = 0.85;

/// Longest step array accepted from outside; anything past this is dropped
pub const MAX_PATTERN_LEN: usize = 64;

/// Percussion lanes of a section
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Drums {
    pub kick: Vec<bool>,
    pub snare: Vec<bool>,
    pub hihat: Vec<bool>,
    /// Optional lane; `None` never fires
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub glitch: Option<Vec<bool>>,
}

/// One musical section. Step arrays may be shorter than the grid; every
/// accessor treats a missing index as "no event".
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SectionDna {
    pub drums: Drums,
    /// MIDI notes, `None` is a rest
    pub bass_line: Vec<Option<u8>>,
    /// MIDI notes, `None` is a rest
    pub lead_melody: Vec<Option<u8>>,
    /// Only the first chord is voiced; the rest are carried along
    pub chord_progression: Vec<Vec<u8>>,
    pub arp_pattern: Vec<bool>,
    pub prob_map: Vec<f32>,
}

fn flag_at(lane: &[bool], idx: usize) -> bool {
    lane.get(idx).copied().unwrap_or(false)
}

impl SectionDna {
    pub fn kick(&self, idx: usize) -> bool {
        flag_at(&self.drums.kick, idx)
    }

    pub fn snare(&self, idx: usize) -> bool {
        flag_at(&self.drums.snare, idx)
    }

    pub fn hihat(&self, idx: usize) -> bool {
        flag_at(&self.drums.hihat, idx)
    }

    pub fn glitch(&self, idx: usize) -> bool {
        self.drums
            .glitch
            .as_deref()
            .map(|lane| flag_at(lane, idx))
            .unwrap_or(false)
    }

    pub fn bass_note(&self, idx: usize) -> Option<u8> {
        self.bass_line.get(idx).copied().flatten()
    }

    pub fn lead_note(&self, idx: usize) -> Option<u8> {
        self.lead_melody.get(idx).copied().flatten()
    }

    pub fn arp(&self, idx: usize) -> bool {
        flag_at(&self.arp_pattern, idx)
    }

    /// Probability gate for a step, `fallback` when the map has no usable entry
    pub fn probability(&self, idx: usize, fallback: f32) -> f32 {
        match self.prob_map.get(idx) {
            Some(p) if p.is_finite() => p.clamp(0.0, 1.0),
            _ => fallback,
        }
    }

    /// The chord voiced by the pad and arpeggio
    pub fn chord(&self) -> &[u8] {
        self.chord_progression
            .first()
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    /// Longest step array in the section
    pub fn pattern_len(&self) -> usize {
        [
            self.drums.kick.len(),
            self.drums.snare.len(),
            self.drums.hihat.len(),
            self.drums.glitch.as_ref().map_or(0, Vec::len),
            self.bass_line.len(),
            self.lead_melody.len(),
            self.arp_pattern.len(),
            self.prob_map.len(),
        ]
        .into_iter()
        .max()
        .unwrap_or(0)
    }
}

/// Two alternating sections plus cosmetic metadata for the display layer
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MasterDna {
    #[serde(rename = "A")]
    pub a: SectionDna,
    #[serde(rename = "B")]
    pub b: SectionDna,
    pub genre: String,
    pub color: String,
    pub mood: String,
    pub scale: String,
    pub intention: String,
}

impl MasterDna {
    pub fn section(&self, section: Section) -> &SectionDna {
        match section {
            Section::A => &self.a,
            Section::B => &self.b,
        }
    }

    /// Short label shown as the status once this DNA is live
    pub fn label(&self) -> &str {
        if self.genre.trim().is_empty() {
            "UNTITLED"
        } else {
            &self.genre
        }
    }

    /// Complete, known-good DNA used at startup and as the merge base
    pub fn baseline() -> Self {
        Self {
            a: SectionDna {
                drums: Drums {
                    kick: lane("x...x...x...x..."),
                    snare: lane("....x.......x..."),
                    hihat: lane("..x...x...x...xx"),
                    glitch: None,
                },
                bass_line: notes(&[33, 0, 33, 0, 36, 0, 33, 0, 31, 0, 31, 0, 28, 0, 31, 0]),
                lead_melody: notes(&[69, 0, 0, 72, 0, 0, 76, 0, 74, 0, 0, 72, 0, 0, 0, 0]),
                chord_progression: vec![
                    vec![57, 60, 64],
                    vec![53, 57, 60],
                    vec![55, 59, 62],
                    vec![52, 55, 59],
                ],
                arp_pattern: lane("x.x.x.x.x.x.x.x."),
                prob_map: vec![
                    1.0, 0.7, 0.9, 0.7, 1.0, 0.7, 0.9, 0.6, 1.0, 0.7, 0.9, 0.7, 1.0, 0.6, 0.8,
                    0.5,
                ],
            },
            b: SectionDna {
                drums: Drums {
                    kick: lane("x..x..x...x..x.."),
                    snare: lane("....x.......x..x"),
                    hihat: lane("xxx.xxx.xxx.xxx."),
                    glitch: Some(lane(".......x.....x..")),
                },
                bass_line: notes(&[29, 0, 29, 41, 0, 29, 0, 0, 31, 0, 31, 43, 0, 31, 0, 0]),
                lead_melody: notes(&[72, 0, 74, 0, 76, 0, 0, 0, 79, 0, 77, 0, 76, 0, 74, 0]),
                chord_progression: vec![vec![53, 57, 60, 64], vec![55, 59, 62, 65]],
                arp_pattern: lane("xxx.xxx.xxx.xxx."),
                prob_map: vec![
                    1.0, 0.8, 0.8, 0.6, 1.0, 0.8, 0.8, 0.6, 1.0, 0.8, 0.8, 0.6, 1.0, 0.8, 0.7,
                    0.9,
                ],
            },
            genre: "DEEP PULSE".to_string(),
            color: "#3FA7D6".to_string(),
            mood: "hypnotic".to_string(),
            scale: "A minor".to_string(),
            intention: "steady four-on-the-floor pulse under a slow minor drift".to_string(),
        }
    }
}

impl Default for MasterDna {
    fn default() -> Self {
        Self::baseline()
    }
}

// "x" marks a hit
fn lane(pattern: &str) -> Vec<bool> {
    pattern.chars().map(|c| c == 'x').collect()
}

// 0 marks a rest in the baseline tables only
fn notes(values: &[u8]) -> Vec<Option<u8>> {
    values.iter().map(|&n| (n != 0).then_some(n)).collect()
}
