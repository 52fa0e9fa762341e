// Shared playback state cells

use std::fmt;
use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::sync::Arc;

/// Steps in one section block before the other section takes over
pub const SECTION_STEPS: u64 = 32;

/// Lowest accepted tempo
pub const MIN_BPM: u32 = 40;
/// Highest accepted tempo
pub const MAX_BPM: u32 = 240;
/// Tempo used when nothing else is configured
pub const DEFAULT_BPM: u32 = 120;

/// One of the two alternating sections of a piece
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Section {
    A,
    B,
}

impl Section {
    /// Section active at the given global step: `floor(step / 32) mod 2`
    pub fn for_step(global_step: u64) -> Self {
        if (global_step / SECTION_STEPS) % 2 == 0 {
            Section::A
        } else {
            Section::B
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Section::A => "A",
            Section::B => "B",
        }
    }
}

impl fmt::Display for Section {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Clamp a tempo into the valid range
pub fn clamp_bpm(bpm: u32) -> u32 {
    bpm.clamp(MIN_BPM, MAX_BPM)
}

/// Tempo in beats per minute, written by the playback controller and read by
/// everything else.
#[derive(Debug, Clone)]
pub struct Tempo(Arc<AtomicU32>);

impl Tempo {
    pub fn new(bpm: u32) -> Self {
        Self(Arc::new(AtomicU32::new(clamp_bpm(bpm))))
    }

    pub fn get(&self) -> u32 {
        self.0.load(Ordering::Acquire)
    }

    /// Store a new tempo, returning the clamped value that was stored
    pub fn set(&self, bpm: u32) -> u32 {
        let bpm = clamp_bpm(bpm);
        self.0.store(bpm, Ordering::Release);
        bpm
    }

    /// Duration of one sixteenth-note step in seconds at the current tempo
    pub fn step_duration(&self) -> f64 {
        step_duration(self.get())
    }
}

impl Default for Tempo {
    fn default() -> Self {
        Self::new(DEFAULT_BPM)
    }
}

/// Sixteenth-note grid: `60 / bpm / 4`
pub fn step_duration(bpm: u32) -> f64 {
    60.0 / bpm.max(1) as f64 / 4.0
}

/// The single "playback is active" flag shared by the controller, the
/// scheduler driver and the generation cadence.
#[derive(Debug, Clone, Default)]
pub struct ActiveFlag(Arc<AtomicBool>);

impl ActiveFlag {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_active(&self) -> bool {
        self.0.load(Ordering::Acquire)
    }

    /// Set the flag, returning the previous value
    pub fn set(&self, active: bool) -> bool {
        self.0.swap(active, Ordering::AcqRel)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_section_is_pure_function_of_step() {
        for step in 0..1024u64 {
            let expected = if (step / 32) % 2 == 0 { Section::A } else { Section::B };
            assert_eq!(Section::for_step(step), expected, "step {}", step);
        }
        assert_eq!(Section::for_step(31), Section::A);
        assert_eq!(Section::for_step(32), Section::B);
        assert_eq!(Section::for_step(64), Section::A);
    }

    #[test]
    fn test_tempo_is_clamped() {
        let tempo = Tempo::new(10);
        assert_eq!(tempo.get(), MIN_BPM);
        assert_eq!(tempo.set(500), MAX_BPM);
        assert_eq!(tempo.set(105), 105);
        assert_eq!(tempo.get(), 105);
    }

    #[test]
    fn test_step_duration() {
        assert!((step_duration(120) - 0.125).abs() < 1e-12);
        assert!((step_duration(60) - 0.25).abs() < 1e-12);
    }

    #[test]
    fn test_active_flag_shared_between_clones() {
        let flag = ActiveFlag::new();
        let other = flag.clone();
        assert!(!other.is_active());
        assert!(!flag.set(true));
        assert!(other.is_active());
    }
}
