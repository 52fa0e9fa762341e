// Engine event system for Helix
// Components publish lifecycle and timing events here; observers subscribe.

use std::sync::{Arc, Mutex, PoisonError};

use crate::Section;

/// Event type for the engine
#[derive(Debug, Clone, PartialEq)]
pub enum EngineEvent {
    /// A step reached its audio onset (index within the section, section, global step)
    StepBoundary {
        step_idx: usize,
        section: Section,
        global_step: u64,
    },

    /// Tempo has been changed
    TempoChanged(u32),

    /// Playback state changed (is_active)
    PlaybackStateChanged(bool),

    /// New DNA became the active DNA (label, recalled from cache)
    DnaPublished { label: String, recalled: bool },

    /// A generation request failed; the active DNA was left untouched
    GenerationFailed(String),

    /// The short status string changed
    StatusChanged(String),
}

type Listener = Box<dyn Fn(&EngineEvent) + Send + Sync>;

/// Fans engine events out to every subscribed listener, in subscription order
pub struct EventBus {
    listeners: Arc<Mutex<Vec<Listener>>>,
}

impl EventBus {
    pub fn new() -> Self {
        Self {
            listeners: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// Subscribe to events, returns the listener id
    pub fn subscribe<F>(&self, listener: F) -> usize
    where
        F: Fn(&EngineEvent) + Send + Sync + 'static,
    {
        let mut listeners = self.listeners.lock().unwrap_or_else(PoisonError::into_inner);
        let id = listeners.len();
        listeners.push(Box::new(listener));
        id
    }

    /// Call every listener with `event` on the emitting thread
    pub fn emit(&self, event: EngineEvent) {
        let listeners = self.listeners.lock().unwrap_or_else(PoisonError::into_inner);
        for listener in listeners.iter() {
            listener(&event);
        }
    }

    pub fn listener_count(&self) -> usize {
        self.listeners.lock().unwrap_or_else(PoisonError::into_inner).len()
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new()
    }
}

/// Bus handle shared by the controller, driver and generation threads
pub type SharedEventBus = Arc<EventBus>;

impl Clone for EventBus {
    fn clone(&self) -> Self {
        Self {
            listeners: Arc::clone(&self.listeners),
        }
    }
}
