// Generation controller
// Decides between asking the provider for new DNA and replaying cached DNA

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::thread::{self, JoinHandle};
use std::time::Duration;

use common::{ActiveFlag, EngineEvent, SharedEventBus};
use dna::{merge_over_baseline, DnaCell, MasterDna};
use log::{debug, info, warn};

use crate::cache::GenerationCache;
use crate::provider::{DnaProvider, GenerationRequest, ProviderError};
use crate::status::{GenerationStatus, StatusCell};

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GenerationConfig {
    /// Interval between two cadence ticks
    pub cadence: Duration,
    pub cache_capacity: usize,
    /// Delay before a recalled DNA becomes active
    pub transition_delay: Duration,
    pub pattern_length: usize,
    pub min_melody_notes: usize,
}

impl Default for GenerationConfig {
    fn default() -> Self {
        Self {
            cadence: Duration::from_secs(18),
            cache_capacity: 3,
            transition_delay: Duration::from_millis(500),
            pattern_length: 16,
            min_melody_notes: 6,
        }
    }
}

/// Background work started by a request
pub struct PendingGeneration {
    handle: JoinHandle<()>,
}

impl PendingGeneration {
    /// Block until the work has published (or discarded) its result
    pub fn wait(self) {
        let _ = self.handle.join();
    }

    pub fn is_finished(&self) -> bool {
        self.handle.is_finished()
    }
}

/// Result of one `request_dna` call
pub enum RequestOutcome {
    /// A provider call was started
    Generating(PendingGeneration),
    /// Cached sample `index` will be published after the transition delay
    Recalling {
        index: usize,
        pending: PendingGeneration,
    },
    /// A provider call is already in flight
    Busy,
    /// Playback is not active
    Inactive,
}

impl RequestOutcome {
    /// Wait for any background work the request started
    pub fn wait(self) {
        match self {
            RequestOutcome::Generating(pending) | RequestOutcome::Recalling { pending, .. } => {
                pending.wait()
            }
            RequestOutcome::Busy | RequestOutcome::Inactive => {}
        }
    }

    pub fn describe(&self) -> String {
        match self {
            RequestOutcome::Generating(_) => "generating".to_string(),
            RequestOutcome::Recalling { index, .. } => format!("recalling #{}", index),
            RequestOutcome::Busy => "busy".to_string(),
            RequestOutcome::Inactive => "inactive".to_string(),
        }
    }
}

struct Shared {
    provider: Arc<dyn DnaProvider>,
    dna: DnaCell,
    active: ActiveFlag,
    cache: Mutex<GenerationCache>,
    /// Bumped on every playback start; results from older sessions are dropped
    session: AtomicU64,
    /// Session of the provider call in flight, 0 when idle
    in_flight: AtomicU64,
    status: StatusCell,
    event_bus: SharedEventBus,
    config: GenerationConfig,
}

/// Sole writer of the active DNA
#[derive(Clone)]
pub struct GenerationController {
    shared: Arc<Shared>,
}

impl GenerationController {
    pub fn new(
        provider: Arc<dyn DnaProvider>,
        dna: DnaCell,
        active: ActiveFlag,
        event_bus: SharedEventBus,
        config: GenerationConfig,
    ) -> Self {
        Self {
            shared: Arc::new(Shared {
                provider,
                dna,
                active,
                cache: Mutex::new(GenerationCache::new(config.cache_capacity)),
                session: AtomicU64::new(1),
                in_flight: AtomicU64::new(0),
                status: StatusCell::new(),
                event_bus,
                config,
            }),
        }
    }

    /// Start a new playback session. Work begun in earlier sessions is
    /// discarded when it lands and no longer counts as in flight.
    pub fn begin_session(&self) -> u64 {
        let session = self.shared.session.fetch_add(1, Ordering::SeqCst) + 1;
        if self.shared.in_flight.swap(0, Ordering::SeqCst) != 0 {
            debug!("Provider call from the previous session abandoned");
        }
        debug!("Generation session {} begins", session);
        session
    }

    /// Ask for the next DNA at `bpm`. Never blocks on the provider.
    pub fn request_dna(&self, bpm: u32) -> RequestOutcome {
        let shared = &self.shared;
        if !shared.active.is_active() {
            debug!("Generation request ignored, playback inactive");
            return RequestOutcome::Inactive;
        }
        let session = shared.session.load(Ordering::SeqCst);

        let recalled = {
            let mut cache = shared.lock_cache();
            if cache.sync_tempo(bpm) {
                info!("Tempo is now {} BPM, generation cache cleared", bpm);
            }
            if cache.is_full() {
                cache.rotate()
            } else {
                None
            }
        };

        if let Some((index, dna)) = recalled {
            let label = dna.label().to_string();
            info!("Recalling cached DNA #{} '{}'", index, label);
            let pending = self.spawn_recall(session, dna);
            return RequestOutcome::Recalling { index, pending };
        }

        if shared
            .in_flight
            .compare_exchange(0, session, Ordering::SeqCst, Ordering::SeqCst)
            .is_err()
        {
            debug!("Provider call still in flight, skipping this tick");
            return RequestOutcome::Busy;
        }

        shared.set_status(GenerationStatus::Generating);
        let request = GenerationRequest {
            bpm,
            pattern_length: shared.config.pattern_length,
            min_melody_notes: shared.config.min_melody_notes,
        };
        info!("Requesting new DNA at {} BPM", bpm);

        let worker = Arc::clone(&self.shared);
        let handle = thread::spawn(move || {
            let result = worker.provider.generate(&request).and_then(|payload| {
                if payload.is_object() {
                    Ok(payload)
                } else {
                    Err(ProviderError::Malformed("payload is not a JSON object".to_string()))
                }
            });
            worker.complete(session, request, result);
            // a newer session may already own the slot
            let _ = worker
                .in_flight
                .compare_exchange(session, 0, Ordering::SeqCst, Ordering::SeqCst);
        });

        RequestOutcome::Generating(PendingGeneration { handle })
    }

    fn spawn_recall(&self, session: u64, dna: Arc<MasterDna>) -> PendingGeneration {
        let worker = Arc::clone(&self.shared);
        let handle = thread::spawn(move || {
            thread::sleep(worker.config.transition_delay);
            if !worker.is_current(session) {
                debug!("Playback stopped during transition, recall dropped");
                return;
            }
            let label = dna.label().to_string();
            worker.set_status(GenerationStatus::Recalling {
                label: label.clone(),
            });
            worker.dna.publish(dna);
            worker.event_bus.emit(EngineEvent::DnaPublished {
                label,
                recalled: true,
            });
        });
        PendingGeneration { handle }
    }

    pub fn status(&self) -> GenerationStatus {
        self.shared.status.get()
    }

    pub fn is_generating(&self) -> bool {
        self.shared.in_flight.load(Ordering::SeqCst) != 0
    }

    /// Number of cached samples for the current tempo
    pub fn cached(&self) -> usize {
        self.shared.lock_cache().len()
    }

    pub fn config(&self) -> &GenerationConfig {
        &self.shared.config
    }

    pub fn dna(&self) -> &DnaCell {
        &self.shared.dna
    }
}

impl Shared {
    fn lock_cache(&self) -> MutexGuard<'_, GenerationCache> {
        self.cache.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn set_status(&self, status: GenerationStatus) {
        let text = status.to_string();
        self.status.set(status);
        self.event_bus.emit(EngineEvent::StatusChanged(text));
    }

    /// Playback is active and still in the session that started the work
    fn is_current(&self, session: u64) -> bool {
        self.active.is_active() && self.session.load(Ordering::SeqCst) == session
    }

    fn complete(
        &self,
        session: u64,
        request: GenerationRequest,
        result: Result<serde_json::Value, ProviderError>,
    ) {
        if !self.is_current(session) {
            info!("Generation finished after stop, result discarded");
            return;
        }

        match result {
            Ok(payload) => {
                let dna = Arc::new(merge_over_baseline(&MasterDna::baseline(), &payload));
                let label = dna.label().to_string();

                match self.lock_cache().insert(request.bpm, Arc::clone(&dna)) {
                    Some(index) => debug!("Cached '{}' as #{}", label, index),
                    None => debug!("Tempo moved on from {} BPM, '{}' not cached", request.bpm, label),
                }

                self.dna.publish(dna);
                info!("DNA '{}' is live", label);
                self.set_status(GenerationStatus::Live {
                    label: label.clone(),
                });
                self.event_bus.emit(EngineEvent::DnaPublished {
                    label,
                    recalled: false,
                });
            }
            Err(e) => {
                warn!("Generation failed, keeping current DNA: {}", e);
                self.set_status(GenerationStatus::Retrying {
                    reason: e.to_string(),
                });
                self.event_bus.emit(EngineEvent::GenerationFailed(e.to_string()));
            }
        }
    }
}
