use std::fmt;
use std::sync::Arc;

use arc_swap::ArcSwap;

/// What the generation side is doing, as shown to the listener
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GenerationStatus {
    Idle,
    /// A provider call is in flight
    Generating,
    /// Freshly generated DNA is playing
    Live { label: String },
    /// A cached DNA was selected for replay
    Recalling { label: String },
    /// The last provider call failed; the previous DNA keeps playing
    Retrying { reason: String },
}

impl fmt::Display for GenerationStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            GenerationStatus::Idle => write!(f, "IDLE"),
            GenerationStatus::Generating => write!(f, "SYNTHESIZING"),
            GenerationStatus::Live { label } => write!(f, "{}", label),
            GenerationStatus::Recalling { label } => write!(f, "RECALLING: {}", label),
            GenerationStatus::Retrying { .. } => write!(f, "RETRYING"),
        }
    }
}

#[derive(Debug, Clone)]
pub struct StatusCell {
    inner: Arc<ArcSwap<GenerationStatus>>,
}

impl StatusCell {
    pub fn new() -> Self {
        Self {
            inner: Arc::new(ArcSwap::from_pointee(GenerationStatus::Idle)),
        }
    }

    pub fn get(&self) -> GenerationStatus {
        self.inner.load().as_ref().clone()
    }

    pub fn set(&self, status: GenerationStatus) {
        self.inner.store(Arc::new(status));
    }
}

impl Default for StatusCell {
    fn default() -> Self {
        Self::new()
    }
}
