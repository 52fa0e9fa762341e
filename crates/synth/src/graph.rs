// Audio graph boundary and the headless graphs

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Instant;

use log::trace;

use crate::voice::Voice;

/// The real-time output the engine writes voices into.
///
/// The graph owns its clock; callers only read it and schedule voices
/// against it. Voices terminate on their own, nothing ever disconnects them.
pub trait AudioGraph: Send + Sync {
    /// Seconds elapsed on the graph clock
    fn current_time(&self) -> f64;

    /// Attach a voice to the master bus
    fn connect(&self, voice: Voice);

    /// Smoothed RMS output level in [0, 1]
    fn output_level(&self) -> f32;
}

pub type SharedGraph = Arc<dyn AudioGraph>;

/// Stand-in used when no output device is available.
///
/// The clock follows wall time so scheduling keeps running; voices are
/// discarded, which means nothing piles up for a later device.
#[derive(Debug)]
pub struct DetachedGraph {
    started: Instant,
}

impl DetachedGraph {
    pub fn new() -> Self {
        Self {
            started: Instant::now(),
        }
    }
}

impl Default for DetachedGraph {
    fn default() -> Self {
        Self::new()
    }
}

impl AudioGraph for DetachedGraph {
    fn current_time(&self) -> f64 {
        self.started.elapsed().as_secs_f64()
    }

    fn connect(&self, voice: Voice) {
        trace!("Detached graph dropping voice at {:.3}", voice.onset);
    }

    fn output_level(&self) -> f32 {
        0.0
    }
}

/// Graph with a manually driven clock that records every voice
#[derive(Debug, Default)]
pub struct CaptureGraph {
    clock: AtomicU64,
    voices: Mutex<Vec<Voice>>,
}

impl CaptureGraph {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_time(&self, seconds: f64) {
        self.clock.store(seconds.to_bits(), Ordering::SeqCst);
    }

    pub fn advance(&self, seconds: f64) {
        self.set_time(self.current_time() + seconds);
    }

    /// Copy of every voice connected so far
    pub fn voices(&self) -> Vec<Voice> {
        self.voices.lock().unwrap_or_else(PoisonError::into_inner).clone()
    }

    /// Drain the recorded voices
    pub fn take_voices(&self) -> Vec<Voice> {
        std::mem::take(&mut *self.voices.lock().unwrap_or_else(PoisonError::into_inner))
    }
}

impl AudioGraph for CaptureGraph {
    fn current_time(&self) -> f64 {
        f64::from_bits(self.clock.load(Ordering::SeqCst))
    }

    fn connect(&self, voice: Voice) {
        self.voices
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(voice);
    }

    fn output_level(&self) -> f32 {
        0.0
    }
}
