// Playback controller for Helix
// Ties the scheduler driver, the generation controller and the audio graph
// to one active flag.

pub mod config;
pub mod render;


use std::path::Path;
use std::sync::Arc;

use common::{ActiveFlag, EngineEvent, EventBus, Section, SharedEventBus, Tempo};
use dna::{DnaCell, DnaError, MasterDna};
use generation::{Cadence, DnaProvider, GenerationController, GenerationStatus};
use log::{debug, info};
use sequencer::{SchedulerDriver, StepNotification, StepScheduler};
use synth::{DetachedGraph, SharedGraph, SynthConnector, SynthError};
use thiserror::Error;

pub use crate::config::{config_path, load_config, save_config, ConfigError, EngineConfig};
pub use crate::render::{render_session, RenderSummary};

#[derive(Debug, Error)]
pub enum PlaybackError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Synth(#[from] SynthError),

    #[error(transparent)]
    Dna(#[from] DnaError),
}

/// The control surface: start, stop, tempo, and everything observers poll
pub struct PlaybackController {
    connector: SynthConnector,
    driver: SchedulerDriver,
    generation: GenerationController,
    cadence: Option<Cadence>,
    dna: DnaCell,
    tempo: Tempo,
    active: ActiveFlag,
    event_bus: SharedEventBus,
}

impl PlaybackController {
    /// Controller that opens the default output device on the first `start`
    pub fn new(config: &EngineConfig, provider: Arc<dyn DnaProvider>) -> Self {
        Self::build(config, provider, SynthConnector::new(config.bus_settings()))
    }

    /// Controller that writes into `graph` and never touches a device
    pub fn with_graph(
        config: &EngineConfig,
        provider: Arc<dyn DnaProvider>,
        graph: SharedGraph,
    ) -> Self {
        Self::build(config, provider, SynthConnector::with_graph(graph))
    }

    fn build(
        config: &EngineConfig,
        provider: Arc<dyn DnaProvider>,
        connector: SynthConnector,
    ) -> Self {
        let dna = DnaCell::default();
        let tempo = Tempo::new(config.bpm());
        let active = ActiveFlag::new();
        let event_bus: SharedEventBus = Arc::new(EventBus::new());

        // the driver gets its real graph on every start
        let mut scheduler = StepScheduler::new(
            Arc::new(DetachedGraph::new()),
            dna.clone(),
            tempo.clone(),
            config.scheduler_config(),
        );
        if let Some(seed) = config.scheduler.seed {
            scheduler = scheduler.with_seed(seed);
        }
        let driver = SchedulerDriver::spawn(scheduler, Arc::clone(&event_bus));

        let generation = GenerationController::new(
            provider,
            dna.clone(),
            active.clone(),
            Arc::clone(&event_bus),
            config.generation_config(),
        );

        info!("Playback controller ready at {} BPM", tempo.get());

        Self {
            connector,
            driver,
            generation,
            cadence: None,
            dna,
            tempo,
            active,
            event_bus,
        }
    }

    /// Replace the startup DNA before playback begins
    pub fn with_dna(self, dna: MasterDna) -> Self {
        self.dna.publish(Arc::new(dna));
        self
    }

    /// Begin playback. Returns false if playback was already active.
    pub fn start(&mut self) -> bool {
        if self.active.set(true) {
            debug!("Start ignored, playback already active");
            return false;
        }

        let graph = self.connector.ensure();
        self.driver.start(graph);

        if let Some(mut cadence) = self.cadence.take() {
            cadence.stop();
        }
        self.cadence = Some(Cadence::spawn(
            self.generation.clone(),
            self.tempo.clone(),
            self.active.clone(),
            self.generation.config().cadence,
        ));

        info!("Playback started at {} BPM", self.tempo.get());
        self.event_bus.emit(EngineEvent::PlaybackStateChanged(true));

        // anything still out from before the last stop is now stale
        self.generation.begin_session();
        let outcome = self.generation.request_dna(self.tempo.get());
        debug!("Initial generation request: {}", outcome.describe());
        true
    }

    /// Halt playback. Sounds already scheduled play out; in-flight
    /// generations are discarded when they land.
    pub fn stop(&mut self) -> bool {
        if !self.active.set(false) {
            return false;
        }

        self.driver.stop();
        if let Some(mut cadence) = self.cadence.take() {
            cadence.stop();
        }

        info!("Playback stopped");
        self.event_bus.emit(EngineEvent::PlaybackStateChanged(false));
        true
    }

    pub fn toggle(&mut self) -> bool {
        if self.is_active() {
            self.stop();
        } else {
            self.start();
        }
        self.is_active()
    }

    /// Set the tempo, clamped to 40-240 BPM; takes effect on the next step
    pub fn set_tempo(&self, bpm: u32) -> u32 {
        let bpm = self.tempo.set(bpm);
        info!("Tempo set to {} BPM", bpm);
        self.event_bus.emit(EngineEvent::TempoChanged(bpm));
        bpm
    }

    pub fn is_active(&self) -> bool {
        self.active.is_active()
    }

    pub fn tempo(&self) -> u32 {
        self.tempo.get()
    }

    /// Index within the section of the last step that sounded
    pub fn current_step(&self) -> usize {
        self.driver.position().step_idx()
    }

    pub fn current_section(&self) -> Section {
        self.driver.position().section()
    }

    pub fn current_position(&self) -> Option<StepNotification> {
        self.driver.position().current()
    }

    pub fn active_dna(&self) -> Arc<MasterDna> {
        self.dna.load()
    }

    pub fn status(&self) -> GenerationStatus {
        self.generation.status()
    }

    /// Peak output level of the master bus, 0.0 before any audio exists
    pub fn audio_level(&self) -> f32 {
        self.connector.output_level()
    }

    pub fn has_audio_device(&self) -> bool {
        self.connector.has_device()
    }

    pub fn cached_generations(&self) -> usize {
        self.generation.cached()
    }

    pub fn subscribe<F>(&self, listener: F) -> usize
    where
        F: Fn(&EngineEvent) + Send + Sync + 'static,
    {
        self.event_bus.subscribe(listener)
    }

    /// Load a DNA preset from JSON and make it the active DNA
    pub fn load_preset<P: AsRef<Path>>(&self, path: P) -> Result<(), PlaybackError> {
        let dna = dna::load_preset(path)?;
        let label = dna.label().to_string();
        self.dna.publish(Arc::new(dna));
        info!("Preset '{}' is now active", label);
        self.event_bus.emit(EngineEvent::DnaPublished {
            label,
            recalled: false,
        });
        Ok(())
    }

    /// Write the active DNA to a JSON preset
    pub fn export_dna<P: AsRef<Path>>(&self, path: P) -> Result<(), PlaybackError> {
        dna::save_preset(path, &self.dna.load())?;
        Ok(())
    }
}

impl Drop for PlaybackController {
    fn drop(&mut self) {
        self.stop();
    }
}
