// Look-ahead step scheduler
// Reads the active DNA on every step and writes voices ahead of the audio clock

use std::collections::VecDeque;
use std::sync::Arc;
use std::time::Duration;

use common::{step_duration, Section, Tempo};
use dna::{DnaCell, SectionDna, DEFAULT_PROBABILITY, MAX_PATTERN_LEN};
use log::{debug, trace, warn};
use synth::{
    midi_to_freq, play_percussion, play_tone, AudioGraph, EnvelopeShape, Percussion, SharedGraph,
    Tone, Waveform,
};

use crate::notify::StepNotification;

const KICK_GAIN: f32 = 0.9;
const SNARE_GAIN: f32 = 0.45;
const HAT_GAIN: f32 = 0.06;
const GLITCH_GAIN: f32 = 0.05;
const BASS_GAIN: f32 = 0.35;
const LEAD_GAIN: f32 = 0.18;
const ARP_GAIN: f32 = 0.1;
const PAD_GAIN: f32 = 0.08;

/// Steps per phrase; the pad is voiced at the start of each one
pub const PHRASE_STEPS: u64 = 8;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SchedulerConfig {
    /// Wall-clock interval between two `advance` calls
    pub tick_interval: Duration,
    /// Seconds beyond the clock that get scheduled
    pub look_ahead: f64,
    /// Gap between (re)start and the first step
    pub start_offset: f64,
    pub pattern_length: usize,
    pub default_probability: f32,
    /// Lag after which the cursor jumps forward instead of catching up
    pub max_lag: f64,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            tick_interval: Duration::from_millis(40),
            look_ahead: 0.2,
            start_offset: 0.1,
            pattern_length: 16,
            default_probability: DEFAULT_PROBABILITY,
            max_lag: 1.0,
        }
    }
}

pub struct StepScheduler {
    graph: SharedGraph,
    dna: DnaCell,
    tempo: Tempo,
    config: SchedulerConfig,
    /// Global step counter, never wraps while playing
    step: u64,
    /// Onset of the next unscheduled step on the graph clock
    next_time: f64,
    rng: fastrand::Rng,
    pending: VecDeque<StepNotification>,
    /// Step slots jumped over by stall resyncs since the last reset
    skipped: u64,
}

impl StepScheduler {
    pub fn new(graph: SharedGraph, dna: DnaCell, tempo: Tempo, mut config: SchedulerConfig) -> Self {
        config.pattern_length = config.pattern_length.clamp(1, MAX_PATTERN_LEN);
        Self {
            graph,
            dna,
            tempo,
            config,
            step: 0,
            next_time: 0.0,
            rng: fastrand::Rng::new(),
            pending: VecDeque::new(),
            skipped: 0,
        }
    }

    /// Use a fixed seed for the probability gate and arpeggio choices
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.rng = fastrand::Rng::with_seed(seed);
        self
    }

    pub fn set_graph(&mut self, graph: SharedGraph) {
        self.graph = graph;
    }

    pub fn config(&self) -> &SchedulerConfig {
        &self.config
    }

    /// Current time on the graph clock
    pub fn clock(&self) -> f64 {
        self.graph.current_time()
    }

    pub fn step(&self) -> u64 {
        self.step
    }

    pub fn next_time(&self) -> f64 {
        self.next_time
    }

    /// Step slots dropped by stall resyncs since the last reset
    pub fn skipped_steps(&self) -> u64 {
        self.skipped
    }

    /// Fresh start: step 0, first onset shortly after `now`
    pub fn reset(&mut self, now: f64) {
        self.step = 0;
        self.next_time = now + self.config.start_offset;
        self.pending.clear();
        self.skipped = 0;
        debug!("Scheduler reset, first step at {:.3}", self.next_time);
    }

    /// Schedule every step that starts before `now + look_ahead`.
    /// Returns how many steps were scheduled.
    pub fn advance(&mut self, now: f64) -> usize {
        let lag = now - self.next_time;
        if lag > self.config.max_lag {
            warn!("Scheduler {:.2}s behind the audio clock - resynchronizing", lag);
            let resumed = now + self.config.start_offset;
            let dropped = ((resumed - self.next_time) / step_duration(self.tempo.get())).round() as u64;
            self.skipped += dropped;
            debug!(
                "Stall dropped {} steps without notifications, resuming at step {}",
                dropped, self.step
            );
            self.next_time = resumed;
        }

        let horizon = now + self.config.look_ahead;
        let mut scheduled = 0;
        while self.next_time < horizon {
            self.schedule_step();
            scheduled += 1;
        }
        scheduled
    }

    /// Notifications whose onset has been reached, oldest first
    pub fn take_due(&mut self, now: f64) -> Vec<StepNotification> {
        let mut due = Vec::new();
        while let Some(front) = self.pending.front() {
            if front.onset > now {
                break;
            }
            if let Some(notification) = self.pending.pop_front() {
                due.push(notification);
            }
        }
        due
    }

    /// Onset of the oldest undelivered notification
    pub fn next_due(&self) -> Option<f64> {
        self.pending.front().map(|n| n.onset)
    }

    fn schedule_step(&mut self) {
        let step_dur = step_duration(self.tempo.get());
        let onset = self.next_time;
        let global_step = self.step;
        let section = Section::for_step(global_step);
        let step_idx = (global_step % self.config.pattern_length as u64) as usize;

        let dna = self.dna.load();
        let pattern = dna.section(section);
        let graph = Arc::clone(&self.graph);

        let probability = pattern.probability(step_idx, self.config.default_probability);
        if self.rng.f32() < probability {
            play_step(graph.as_ref(), pattern, step_idx, onset, step_dur, &mut self.rng);
        } else {
            trace!("Step {} gated out (p={:.2})", global_step, probability);
        }

        if global_step % PHRASE_STEPS == 0 {
            play_pad(graph.as_ref(), pattern.chord(), onset, step_dur * PHRASE_STEPS as f64);
        }

        self.pending.push_back(StepNotification {
            step_idx,
            section,
            global_step,
            onset,
        });
        self.next_time += step_dur;
        self.step += 1;
    }
}

fn play_step(
    graph: &dyn AudioGraph,
    pattern: &SectionDna,
    idx: usize,
    onset: f64,
    step_dur: f64,
    rng: &mut fastrand::Rng,
) {
    if pattern.kick(idx) {
        play_percussion(graph, Percussion::Kick, onset, KICK_GAIN);
    }
    if pattern.snare(idx) {
        play_percussion(graph, Percussion::Snare, onset, SNARE_GAIN);
    }
    if pattern.hihat(idx) {
        play_percussion(graph, Percussion::Hat, onset, HAT_GAIN);
    }
    if pattern.glitch(idx) {
        play_percussion(graph, Percussion::Glitch, onset, GLITCH_GAIN);
    }

    if let Some(note) = pattern.bass_note(idx) {
        play_tone(
            graph,
            Tone {
                frequency: midi_to_freq(note),
                onset,
                duration: step_dur * 1.5,
                peak_gain: BASS_GAIN,
                waveform: Waveform::Sawtooth,
                shape: EnvelopeShape::Pluck,
            },
        );
    }

    if let Some(note) = pattern.lead_note(idx) {
        play_tone(
            graph,
            Tone {
                frequency: midi_to_freq(note),
                onset,
                duration: step_dur * 3.0,
                peak_gain: LEAD_GAIN,
                waveform: Waveform::Square,
                shape: EnvelopeShape::Lead,
            },
        );
    }

    let chord = pattern.chord();
    if pattern.arp(idx) && !chord.is_empty() {
        let note = chord[rng.usize(..chord.len())].saturating_add(12);
        play_tone(
            graph,
            Tone {
                frequency: midi_to_freq(note),
                onset,
                duration: step_dur * 0.5,
                peak_gain: ARP_GAIN,
                waveform: Waveform::Triangle,
                shape: EnvelopeShape::Pluck,
            },
        );
    }
}

fn play_pad(graph: &dyn AudioGraph, chord: &[u8], onset: f64, duration: f64) {
    for &note in chord {
        play_tone(
            graph,
            Tone {
                frequency: midi_to_freq(note),
                onset,
                duration,
                peak_gain: PAD_GAIN,
                waveform: Waveform::Sawtooth,
                shape: EnvelopeShape::Pad,
            },
        );
    }
}
