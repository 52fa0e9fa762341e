// Local stand-in provider that composes DNA from scale tables

use std::sync::{Mutex, PoisonError};
use std::thread;
use std::time::Duration;

use dna::MAX_PATTERN_LEN;
use log::debug;
use serde_json::{json, Value};

use crate::provider::{DnaProvider, GenerationRequest, ProviderError};

const SCALES: &[(&str, [u8; 7])] = &[
    ("minor", [0, 2, 3, 5, 7, 8, 10]),
    ("dorian", [0, 2, 3, 5, 7, 9, 10]),
    ("phrygian", [0, 1, 3, 5, 7, 8, 10]),
    ("mixolydian", [0, 2, 4, 5, 7, 9, 10]),
];

const NOTE_NAMES: [&str; 12] = ["C", "C#", "D", "D#", "E", "F", "F#", "G", "G#", "A", "A#", "B"];

const GENRES: &[&str] = &[
    "GLASS TECHNO",
    "DUST GARAGE",
    "NEON DRIFT",
    "IRON DUB",
    "SOFT ACID",
    "NIGHT BUS",
];

const MOODS: &[&str] = &["restless", "hypnotic", "weightless", "brooding", "bright"];

const COLORS: &[&str] = &["#FF5E5B", "#3FA7D6", "#59CD90", "#FAC05E", "#EE6352", "#A78BFA"];

/// Chord roots as scale degrees, one chord per bar
const PROGRESSION: [usize; 4] = [0, 5, 3, 4];

/// Composes plausible DNA locally, optionally pretending to be slow
pub struct ProceduralProvider {
    rng: Mutex<fastrand::Rng>,
    latency: Duration,
}

impl ProceduralProvider {
    pub fn new() -> Self {
        Self {
            rng: Mutex::new(fastrand::Rng::new()),
            latency: Duration::ZERO,
        }
    }

    pub fn with_seed(seed: u64) -> Self {
        Self {
            rng: Mutex::new(fastrand::Rng::with_seed(seed)),
            latency: Duration::ZERO,
        }
    }

    /// Sleep this long before answering
    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = latency;
        self
    }
}

impl Default for ProceduralProvider {
    fn default() -> Self {
        Self::new()
    }
}

impl DnaProvider for ProceduralProvider {
    fn generate(&self, request: &GenerationRequest) -> Result<Value, ProviderError> {
        if !self.latency.is_zero() {
            thread::sleep(self.latency);
        }

        let mut rng = self.rng.lock().unwrap_or_else(PoisonError::into_inner);
        let (scale_name, scale) = SCALES[rng.usize(..SCALES.len())];
        // A1..G#2 keeps bass notes low and leads in a singable range
        let root = 33 + rng.u8(..12);
        let genre = GENRES[rng.usize(..GENRES.len())];

        let a = compose_section(&mut rng, request, root, &scale, false);
        let b = compose_section(&mut rng, request, root, &scale, true);
        debug!("Composed '{}' in {} {}", genre, NOTE_NAMES[(root % 12) as usize], scale_name);

        Ok(json!({
            "genre": genre,
            "color": COLORS[rng.usize(..COLORS.len())],
            "mood": MOODS[rng.usize(..MOODS.len())],
            "scale": format!("{} {}", NOTE_NAMES[(root % 12) as usize], scale_name),
            "intention": format!("{} BPM {} study", request.bpm, scale_name),
            "A": a,
            "B": b,
        }))
    }
}

/// MIDI note of a scale degree above `root`, degrees past 7 climb octaves
fn degree(root: u8, scale: &[u8; 7], degree: usize) -> u8 {
    root + 12 * (degree / 7) as u8 + scale[degree % 7]
}

fn compose_section(
    rng: &mut fastrand::Rng,
    request: &GenerationRequest,
    root: u8,
    scale: &[u8; 7],
    busy: bool,
) -> Value {
    let len = request.pattern_length.clamp(1, MAX_PATTERN_LEN);
    let density = if busy { 0.75 } else { 0.5 };

    let kick: Vec<bool> = (0..len).map(|i| i % 4 == 0 || rng.f32() < 0.08).collect();
    let snare: Vec<bool> = (0..len).map(|i| i % 8 == 4 || rng.f32() < 0.04).collect();
    let hihat: Vec<bool> = (0..len).map(|_| rng.f32() < density).collect();
    let glitch: Vec<bool> = (0..len).map(|_| busy && rng.f32() < 0.12).collect();

    let bass: Vec<Option<u8>> = (0..len)
        .map(|i| {
            let chord_root = PROGRESSION[(i / 4) % PROGRESSION.len()];
            (i % 2 == 0 || rng.f32() < 0.2).then(|| degree(root, scale, chord_root))
        })
        .collect();

    let mut lead: Vec<Option<u8>> = (0..len)
        .map(|_| (rng.f32() < 0.35).then(|| degree(root + 24, scale, rng.usize(..10))))
        .collect();
    let wanted = request.min_melody_notes.min(len);
    while lead.iter().flatten().count() < wanted {
        let slot = rng.usize(..len);
        if lead[slot].is_none() {
            lead[slot] = Some(degree(root + 24, scale, rng.usize(..10)));
        }
    }

    let chords: Vec<Vec<u8>> = PROGRESSION
        .iter()
        .map(|&d| {
            [d, d + 2, d + 4]
                .iter()
                .map(|&step| degree(root + 12, scale, step))
                .collect()
        })
        .collect();

    let arp: Vec<bool> = (0..len).map(|_| rng.f32() < density).collect();
    let prob: Vec<f32> = (0..len)
        .map(|i| {
            if i % 4 == 0 {
                1.0
            } else {
                (50.0 + rng.f32() * 45.0).round() / 100.0
            }
        })
        .collect();

    json!({
        "drums": { "kick": kick, "snare": snare, "hihat": hihat, "glitch": glitch },
        "bassLine": bass,
        "leadMelody": lead,
        "chordProgression": chords,
        "arpPattern": arp,
        "probMap": prob,
    })
}
