// Shared types for the Helix engine crates
mod events;
mod state;

pub use events::{EngineEvent, EventBus, SharedEventBus};
pub use state::{
    clamp_bpm, step_duration, ActiveFlag, Section, Tempo, DEFAULT_BPM, MAX_BPM, MIN_BPM,
    SECTION_STEPS,
};
