// Master bus: voice mixing, feedback delay and level metering

use std::sync::atomic::{AtomicU32, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use crossbeam_channel::{bounded, Receiver, Sender, TrySendError};
use log::{debug, warn};

use crate::graph::AudioGraph;
use crate::voice::{Voice, VoiceState};

/// Frames rendered between two drains of the voice queue
pub const BLOCK_FRAMES: usize = 64;

/// Voices waiting for the audio thread
const VOICE_QUEUE: usize = 1024;

/// One-pole smoothing of the mean square used by the level tap
const LEVEL_SMOOTHING: f32 = 0.995;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BusSettings {
    pub sample_rate: u32,
    pub master_gain: f32,
    /// Delay time in seconds
    pub delay_time: f32,
    pub delay_feedback: f32,
    pub delay_mix: f32,
    /// Live voice cap; new voices beyond it are dropped
    pub max_voices: usize,
}

impl Default for BusSettings {
    fn default() -> Self {
        Self {
            sample_rate: 44_100,
            master_gain: 0.8,
            delay_time: 0.375,
            delay_feedback: 0.3,
            delay_mix: 0.25,
            max_voices: 96,
        }
    }
}

/// Mono feedback delay on a ring buffer
struct FeedbackDelay {
    buffer: Vec<f32>,
    write_pos: usize,
    feedback: f32,
    mix: f32,
}

impl FeedbackDelay {
    fn new(settings: &BusSettings) -> Self {
        let length = ((settings.delay_time.max(0.0) * settings.sample_rate as f32) as usize).max(1);
        Self {
            buffer: vec![0.0; length],
            write_pos: 0,
            feedback: settings.delay_feedback.clamp(0.0, 0.95),
            mix: settings.delay_mix.clamp(0.0, 1.0),
        }
    }

    /// Returns the wet signal for this frame
    fn process(&mut self, input: f32) -> f32 {
        let delayed = self.buffer[self.write_pos];
        self.buffer[self.write_pos] = input + delayed * self.feedback;
        self.write_pos = (self.write_pos + 1) % self.buffer.len();
        delayed * self.mix
    }
}

/// Sample-accurate renderer shared by the device bus and offline renders
pub struct BusRenderer {
    settings: BusSettings,
    voices: Vec<VoiceState>,
    delay: FeedbackDelay,
    mean_square: f32,
    frame: u64,
    next_seed: u64,
}

impl BusRenderer {
    pub fn new(settings: BusSettings) -> Self {
        Self {
            delay: FeedbackDelay::new(&settings),
            settings,
            voices: Vec::new(),
            mean_square: 0.0,
            frame: 0,
            next_seed: 1,
        }
    }

    pub fn settings(&self) -> &BusSettings {
        &self.settings
    }

    /// Bus clock in seconds
    pub fn time(&self) -> f64 {
        self.frame as f64 / self.settings.sample_rate as f64
    }

    pub fn frames_rendered(&self) -> u64 {
        self.frame
    }

    /// Add a voice; returns false when the voice cap is reached
    pub fn add_voice(&mut self, voice: Voice) -> bool {
        if self.voices.len() >= self.settings.max_voices {
            warn!(
                "Voice cap of {} reached, dropping voice at {:.3}",
                self.settings.max_voices, voice.onset
            );
            return false;
        }
        let seed = self.next_seed;
        self.next_seed = self.next_seed.wrapping_add(1);
        self.voices
            .push(VoiceState::new(voice, self.settings.sample_rate as f64, seed));
        true
    }

    pub fn active_voices(&self) -> usize {
        self.voices.len()
    }

    fn render_frame(&mut self) -> f32 {
        let now = self.time();
        let sample_rate = self.settings.sample_rate as f64;

        let mut dry = 0.0;
        for voice in &mut self.voices {
            dry += voice.next_sample(now, sample_rate);
        }
        let dry = dry * self.settings.master_gain;
        let out = (dry + self.delay.process(dry)).tanh();

        self.mean_square = self.mean_square * LEVEL_SMOOTHING + out * out * (1.0 - LEVEL_SMOOTHING);
        self.frame += 1;
        out
    }

    /// Fill `out` and retire finished voices
    pub fn render_block(&mut self, out: &mut [f32]) {
        for sample in out.iter_mut() {
            *sample = self.render_frame();
        }
        let now = self.time();
        self.voices.retain(|state| !state.voice.is_finished(now));
    }

    /// Smoothed RMS level of the bus output
    pub fn level(&self) -> f32 {
        self.mean_square.sqrt().min(1.0)
    }
}

/// State the audio thread publishes back to the engine
struct BusShared {
    voice_tx: Sender<Voice>,
    frames: AtomicU64,
    level_bits: AtomicU32,
    sample_rate: u32,
}

/// Engine-side handle of the device bus
#[derive(Clone)]
pub struct MasterBus {
    shared: Arc<BusShared>,
}

impl MasterBus {
    /// Create the bus handle and the source the output sink pulls from
    pub fn new(settings: BusSettings) -> (Self, BusSource) {
        let (voice_tx, voice_rx) = bounded(VOICE_QUEUE);
        let shared = Arc::new(BusShared {
            voice_tx,
            frames: AtomicU64::new(0),
            level_bits: AtomicU32::new(0.0f32.to_bits()),
            sample_rate: settings.sample_rate,
        });

        let source = BusSource {
            shared: Arc::clone(&shared),
            voice_rx,
            renderer: BusRenderer::new(settings),
            block: vec![0.0; BLOCK_FRAMES],
            pos: BLOCK_FRAMES,
        };

        (Self { shared }, source)
    }
}

impl AudioGraph for MasterBus {
    fn current_time(&self) -> f64 {
        self.shared.frames.load(Ordering::Acquire) as f64 / self.shared.sample_rate as f64
    }

    fn connect(&self, voice: Voice) {
        match self.shared.voice_tx.try_send(voice) {
            Ok(()) => {}
            Err(TrySendError::Full(voice)) => {
                warn!("Voice queue full, dropping voice at {:.3}", voice.onset)
            }
            Err(TrySendError::Disconnected(_)) => {
                debug!("Bus source is gone, voice discarded")
            }
        }
    }

    fn output_level(&self) -> f32 {
        f32::from_bits(self.shared.level_bits.load(Ordering::Relaxed))
    }
}

/// Endless mono source rendering the bus on the rodio audio thread
pub struct BusSource {
    shared: Arc<BusShared>,
    voice_rx: Receiver<Voice>,
    renderer: BusRenderer,
    block: Vec<f32>,
    pos: usize,
}

impl BusSource {
    fn refill(&mut self) {
        for voice in self.voice_rx.try_iter() {
            self.renderer.add_voice(voice);
        }
        self.renderer.render_block(&mut self.block);
        self.pos = 0;

        self.shared
            .frames
            .store(self.renderer.frames_rendered(), Ordering::Release);
        self.shared
            .level_bits
            .store(self.renderer.level().to_bits(), Ordering::Relaxed);
    }
}

impl Iterator for BusSource {
    type Item = f32;

    fn next(&mut self) -> Option<Self::Item> {
        if self.pos >= self.block.len() {
            self.refill();
        }
        let sample = self.block[self.pos];
        self.pos += 1;
        Some(sample)
    }
}

impl rodio::Source for BusSource {
    fn current_frame_len(&self) -> Option<usize> {
        None
    }

    fn channels(&self) -> u16 {
        1
    }

    fn sample_rate(&self) -> u32 {
        self.renderer.settings().sample_rate
    }

    fn total_duration(&self) -> Option<Duration> {
        None
    }
}
