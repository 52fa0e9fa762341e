//! Test suite for the synth crate functionality

#[cfg(test)]
mod tests {
    use crate::{
        midi_to_freq, play_percussion, play_tone, AudioGraph, BusSettings, EnvelopeShape, OfflineBus,
        Percussion, Tone, Waveform,
    };

    fn rms(samples: &[f32]) -> f32 {
        (samples.iter().map(|s| s * s).sum::<f32>() / samples.len().max(1) as f32).sqrt()
    }

    /// One bar of a minimal groove rendered offline
    fn render_groove(settings: BusSettings) -> Vec<f32> {
        let bus = OfflineBus::new(settings);
        let step = 60.0 / 120.0 / 4.0;
        for i in 0..16 {
            let onset = i as f64 * step;
            if i % 4 == 0 {
                play_percussion(&bus, Percussion::Kick, onset, 0.9);
            }
            play_percussion(&bus, Percussion::Hat, onset, 0.05);
            play_tone(
                &bus,
                Tone {
                    frequency: midi_to_freq(36 + (i % 3) as u8),
                    onset,
                    duration: step * 0.9,
                    peak_gain: 0.3,
                    waveform: Waveform::Sawtooth,
                    shape: EnvelopeShape::Pluck,
                },
            );
        }
        bus.render(settings.sample_rate as usize * 2)
    }

    #[test]
    fn test_groove_is_audible_and_bounded() {
        let samples = render_groove(BusSettings::default());
        assert!(rms(&samples) > 0.01);
        assert!(samples.iter().all(|s| s.abs() <= 1.0));
    }

    #[test]
    fn test_master_gain_scales_output() {
        let loud = render_groove(BusSettings::default());
        let quiet = render_groove(BusSettings {
            master_gain: 0.2,
            ..BusSettings::default()
        });
        assert!(rms(&quiet) < rms(&loud));
    }

    #[test]
    fn test_voices_play_out_after_scheduling_stops() {
        let bus = OfflineBus::new(BusSettings {
            delay_mix: 0.0,
            ..BusSettings::default()
        });
        play_tone(
            &bus,
            Tone {
                frequency: 220.0,
                onset: 0.0,
                duration: 1.0,
                peak_gain: 0.4,
                waveform: Waveform::Triangle,
                shape: EnvelopeShape::Pad,
            },
        );

        // the pad is still sounding half a second in, with nothing else scheduled
        bus.render(22_050);
        let tail = bus.render(4410);
        assert!(rms(&tail) > 0.0);

        // and is silent once it has run its course
        bus.render(22_050);
        let after = bus.render(4410);
        assert_eq!(rms(&after), 0.0);
        assert!(bus.current_time() > 1.0);
    }
}
