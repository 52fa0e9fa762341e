// Voice model: one self-terminating generator node on the master bus

use std::f64::consts::TAU;

/// Level an envelope decays to before the voice stops
pub const SILENCE: f32 = 0.001;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Waveform {
    Sine,
    Square,
    Sawtooth,
    Triangle,
}

impl Waveform {
    /// Sample at a normalized phase in [0, 1)
    pub fn sample(self, phase: f64) -> f32 {
        let value = match self {
            Waveform::Sine => (TAU * phase).sin(),
            Waveform::Square => {
                if phase < 0.5 {
                    1.0
                } else {
                    -1.0
                }
            }
            Waveform::Sawtooth => 2.0 * phase - 1.0,
            Waveform::Triangle => 1.0 - 4.0 * (phase - 0.5).abs(),
        };
        value as f32
    }
}

/// Envelope shapes for tonal voices
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EnvelopeShape {
    /// 5ms linear attack, exponential decay
    Pluck,
    /// Linear attack over 40% of the duration, linear decay
    Pad,
    /// 50ms linear attack, exponential decay
    Lead,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Envelope {
    Shaped(EnvelopeShape),
    /// Instant attack, exponential decay (percussion)
    Decay,
}

impl Envelope {
    /// Gain `elapsed` seconds after onset for a voice lasting `duration`
    pub fn gain_at(self, elapsed: f64, duration: f64, peak: f32) -> f32 {
        if elapsed < 0.0 || elapsed >= duration || peak <= 0.0 {
            return 0.0;
        }
        match self {
            Envelope::Shaped(EnvelopeShape::Pluck) => attack_then_decay(elapsed, duration, 0.005, peak),
            Envelope::Shaped(EnvelopeShape::Lead) => attack_then_decay(elapsed, duration, 0.05, peak),
            Envelope::Shaped(EnvelopeShape::Pad) => {
                let attack = duration * 0.4;
                if elapsed < attack {
                    peak * (elapsed / attack) as f32
                } else {
                    let progress = ((elapsed - attack) / (duration - attack)) as f32;
                    peak + (SILENCE.min(peak) - peak) * progress
                }
            }
            Envelope::Decay => exponential_decay(elapsed, duration, peak),
        }
    }
}

fn attack_then_decay(elapsed: f64, duration: f64, attack: f64, peak: f32) -> f32 {
    // very short notes keep at least half their length for the decay
    let attack = attack.min(duration * 0.5);
    if elapsed < attack {
        peak * (elapsed / attack) as f32
    } else {
        exponential_decay(elapsed - attack, duration - attack, peak)
    }
}

fn exponential_decay(elapsed: f64, length: f64, peak: f32) -> f32 {
    if length <= 0.0 {
        return 0.0;
    }
    let floor = SILENCE.min(peak);
    let progress = (elapsed / length).clamp(0.0, 1.0) as f32;
    peak * (floor / peak).powf(progress)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Percussion {
    Kick,
    Snare,
    Hat,
    Glitch,
}

/// Exponential frequency glide
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Sweep {
    pub to: f64,
    pub over: f64,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Generator {
    Oscillator {
        waveform: Waveform,
        frequency: f64,
        sweep: Option<Sweep>,
    },
    Noise,
}

/// A scheduled voice. It sounds from `onset` to `onset + duration` on the
/// graph clock and is dropped by the bus afterwards.
#[derive(Debug, Clone, PartialEq)]
pub struct Voice {
    pub generator: Generator,
    pub envelope: Envelope,
    pub onset: f64,
    pub duration: f64,
    pub peak_gain: f32,
    /// One-pole low-pass cutoff, `None` bypasses the filter
    pub cutoff: Option<f32>,
    pub percussion: Option<Percussion>,
}

impl Voice {
    pub fn end_time(&self) -> f64 {
        self.onset + self.duration
    }

    pub fn is_finished(&self, now: f64) -> bool {
        now >= self.end_time()
    }

    pub fn frequency_at(&self, elapsed: f64) -> f64 {
        match self.generator {
            Generator::Oscillator { frequency, sweep: Some(sweep), .. } if sweep.over > 0.0 => {
                let progress = (elapsed / sweep.over).clamp(0.0, 1.0);
                frequency * (sweep.to / frequency).powf(progress)
            }
            Generator::Oscillator { frequency, .. } => frequency,
            Generator::Noise => 0.0,
        }
    }

    pub fn gain_at(&self, now: f64) -> f32 {
        self.envelope.gain_at(now - self.onset, self.duration, self.peak_gain)
    }
}

/// Render state of a live voice on the bus
pub(crate) struct VoiceState {
    pub(crate) voice: Voice,
    phase: f64,
    filtered: f32,
    alpha: Option<f32>,
    noise: fastrand::Rng,
}

impl VoiceState {
    pub(crate) fn new(voice: Voice, sample_rate: f64, seed: u64) -> Self {
        let alpha = voice
            .cutoff
            .map(|fc| 1.0 - (-(TAU * fc as f64) / sample_rate).exp())
            .map(|a| a as f32);
        Self {
            voice,
            phase: 0.0,
            filtered: 0.0,
            alpha,
            noise: fastrand::Rng::with_seed(seed),
        }
    }

    pub(crate) fn next_sample(&mut self, now: f64, sample_rate: f64) -> f32 {
        let elapsed = now - self.voice.onset;
        if elapsed < 0.0 {
            return 0.0;
        }

        let raw = match self.voice.generator {
            Generator::Oscillator { waveform, .. } => {
                let value = waveform.sample(self.phase);
                let frequency = self.voice.frequency_at(elapsed);
                self.phase = (self.phase + frequency / sample_rate).fract();
                value
            }
            Generator::Noise => self.noise.f32() * 2.0 - 1.0,
        };

        let shaped = match self.alpha {
            Some(alpha) => {
                self.filtered += alpha * (raw - self.filtered);
                self.filtered
            }
            None => raw,
        };

        shaped * self.voice.gain_at(now)
    }
}
