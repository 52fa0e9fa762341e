// synth module
pub mod bus;
pub mod connector;
pub mod graph;
pub mod offline;
pub mod output;
pub mod synthesis;
pub mod voice;

#[cfg(test)]
mod tests;

use thiserror::Error;

// Re-export important types
pub use crate::bus::{BusRenderer, BusSettings, BusSource, MasterBus};
pub use crate::connector::SynthConnector;
pub use crate::graph::{AudioGraph, CaptureGraph, DetachedGraph, SharedGraph};
pub use crate::offline::{OfflineBus, WavSink};
pub use crate::output::DeviceOutput;
pub use crate::synthesis::{midi_to_freq, play_percussion, play_tone, Tone};
pub use crate::voice::{Envelope, EnvelopeShape, Generator, Percussion, Voice, Waveform};

/// Error types for the synthesis layer
#[derive(Debug, Error)]
pub enum SynthError {
    #[error("Failed to initialize audio output: {0}")]
    InitializationError(String),

    #[error("Failed to write render: {0}")]
    Render(#[from] hound::Error),
}
