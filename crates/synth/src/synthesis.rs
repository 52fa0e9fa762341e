// Synthesis layer: turns a note or a drum hit into one voice on the graph

use log::debug;

use crate::graph::AudioGraph;
use crate::voice::{Envelope, EnvelopeShape, Generator, Percussion, Sweep, Voice, Waveform};

/// Low-pass cutoff for pad voices
pub const PAD_CUTOFF_HZ: f32 = 900.0;

/// Low-pass cutoff for every other tonal voice
pub const BRIGHT_CUTOFF_HZ: f32 = 4000.0;

/// Equal-tempered frequency of a MIDI note, A4 (69) = 440 Hz
pub fn midi_to_freq(note: u8) -> f64 {
    440.0 * 2f64.powf((note as f64 - 69.0) / 12.0)
}

/// A tonal voice request
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Tone {
    pub frequency: f64,
    pub onset: f64,
    pub duration: f64,
    pub peak_gain: f32,
    pub waveform: Waveform,
    pub shape: EnvelopeShape,
}

/// Oscillator through a one-pole low-pass into the master bus
pub fn play_tone<G: AudioGraph + ?Sized>(graph: &G, tone: Tone) {
    if !tone.frequency.is_finite() || tone.frequency <= 0.0 || tone.duration <= 0.0 {
        debug!("Skipping degenerate tone {:?}", tone);
        return;
    }

    let cutoff = match tone.shape {
        EnvelopeShape::Pad => PAD_CUTOFF_HZ,
        EnvelopeShape::Pluck | EnvelopeShape::Lead => BRIGHT_CUTOFF_HZ,
    };

    graph.connect(Voice {
        generator: Generator::Oscillator {
            waveform: tone.waveform,
            frequency: tone.frequency,
            sweep: None,
        },
        envelope: Envelope::Shaped(tone.shape),
        onset: tone.onset,
        duration: tone.duration,
        peak_gain: tone.peak_gain,
        cutoff: Some(cutoff),
        percussion: None,
    });
}

/// One drum hit starting at `onset`
pub fn play_percussion<G: AudioGraph + ?Sized>(graph: &G, kind: Percussion, onset: f64, peak_gain: f32) {
    let (generator, duration) = match kind {
        Percussion::Kick => (
            Generator::Oscillator {
                waveform: Waveform::Sine,
                frequency: 120.0,
                sweep: Some(Sweep { to: 45.0, over: 0.15 }),
            },
            0.3,
        ),
        Percussion::Snare => (Generator::Noise, 0.1),
        Percussion::Hat => (
            Generator::Oscillator {
                waveform: Waveform::Square,
                frequency: 9000.0,
                sweep: None,
            },
            0.05,
        ),
        Percussion::Glitch => (
            Generator::Oscillator {
                waveform: Waveform::Square,
                frequency: 1500.0 + fastrand::f64() * 7500.0,
                sweep: None,
            },
            0.1,
        ),
    };

    graph.connect(Voice {
        generator,
        envelope: Envelope::Decay,
        onset,
        duration,
        peak_gain,
        cutoff: None,
        percussion: Some(kind),
    });
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::CaptureGraph;

    #[test]
    fn test_midi_to_freq() {
        assert_eq!(midi_to_freq(69), 440.0);
        assert!((midi_to_freq(57) - 220.0).abs() < 1e-9);
        assert!((midi_to_freq(81) - 880.0).abs() < 1e-9);
        assert!((midi_to_freq(60) - 261.6256).abs() < 1e-3);
    }

    #[test]
    fn test_play_tone_picks_cutoff_by_shape() {
        let graph = CaptureGraph::new();
        let tone = Tone {
            frequency: 220.0,
            onset: 1.0,
            duration: 0.5,
            peak_gain: 0.2,
            waveform: Waveform::Triangle,
            shape: EnvelopeShape::Pad,
        };
        play_tone(&graph, tone);
        play_tone(&graph, Tone { shape: EnvelopeShape::Pluck, ..tone });

        let voices = graph.voices();
        assert_eq!(voices.len(), 2);
        assert_eq!(voices[0].cutoff, Some(PAD_CUTOFF_HZ));
        assert_eq!(voices[1].cutoff, Some(BRIGHT_CUTOFF_HZ));
        assert_eq!(voices[1].onset, 1.0);
        assert!(voices.iter().all(|v| v.percussion.is_none()));
    }

    #[test]
    fn test_degenerate_tone_is_dropped() {
        let graph = CaptureGraph::new();
        let tone = Tone {
            frequency: 0.0,
            onset: 0.0,
            duration: 0.5,
            peak_gain: 0.2,
            waveform: Waveform::Sine,
            shape: EnvelopeShape::Lead,
        };
        play_tone(&graph, tone);
        play_tone(&graph, Tone { frequency: 440.0, duration: 0.0, ..tone });
        assert!(graph.voices().is_empty());
    }

    #[test]
    fn test_percussion_voices() {
        let graph = CaptureGraph::new();
        play_percussion(&graph, Percussion::Kick, 0.5, 0.9);
        play_percussion(&graph, Percussion::Snare, 0.5, 0.4);
        play_percussion(&graph, Percussion::Hat, 0.5, 0.05);
        play_percussion(&graph, Percussion::Glitch, 0.5, 0.05);

        let voices = graph.voices();
        assert_eq!(voices[0].duration, 0.3);
        assert_eq!(voices[0].frequency_at(0.0), 120.0);
        assert_eq!(voices[1].generator, Generator::Noise);
        assert_eq!(voices[1].duration, 0.1);
        assert_eq!(voices[2].frequency_at(0.0), 9000.0);
        assert_eq!(voices[2].duration, 0.05);

        let glitch = voices[3].frequency_at(0.0);
        assert!((1500.0..=9000.0).contains(&glitch));
        assert!(voices.iter().all(|v| v.envelope == Envelope::Decay));
    }
}
