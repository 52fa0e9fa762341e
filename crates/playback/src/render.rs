// Offline session render: the scheduler driven against an offline bus

use std::path::Path;
use std::sync::Arc;

use common::Tempo;
use dna::{DnaCell, MasterDna};
use log::info;
use sequencer::StepScheduler;
use synth::{AudioGraph, OfflineBus, WavSink};

use crate::config::EngineConfig;
use crate::PlaybackError;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RenderSummary {
    pub samples: u64,
    pub sample_rate: u32,
    pub steps: u64,
}

impl RenderSummary {
    pub fn seconds(&self) -> f64 {
        self.samples as f64 / self.sample_rate as f64
    }
}

/// Render `seconds` of `dna` at the configured tempo into a mono WAV.
/// The scheduler runs against the offline bus clock in tick-sized chunks,
/// so a seeded config renders the same file every time.
pub fn render_session<P: AsRef<Path>>(
    config: &EngineConfig,
    dna: MasterDna,
    seconds: f64,
    path: P,
) -> Result<RenderSummary, PlaybackError> {
    let path = path.as_ref();
    let settings = config.render_bus_settings();
    let bus = Arc::new(OfflineBus::new(settings));
    let scheduler_config = config.scheduler_config();

    let mut scheduler = StepScheduler::new(
        bus.clone(),
        DnaCell::new(dna),
        Tempo::new(config.bpm()),
        scheduler_config,
    );
    if let Some(seed) = config.scheduler.seed {
        scheduler = scheduler.with_seed(seed);
    }
    scheduler.reset(bus.current_time());

    let sample_rate = settings.sample_rate;
    let total_frames = (seconds.max(0.0) * sample_rate as f64) as usize;
    let tick_frames =
        ((scheduler_config.tick_interval.as_secs_f64() * sample_rate as f64) as usize).max(1);

    info!(
        "Rendering {:.1}s at {} BPM to {}",
        seconds,
        config.bpm(),
        path.display()
    );

    let mut sink = WavSink::create(path, sample_rate)?;
    let mut rendered = 0;
    while rendered < total_frames {
        scheduler.advance(bus.current_time());
        let frames = tick_frames.min(total_frames - rendered);
        sink.write(&bus.render(frames))?;
        rendered += frames;
    }
    let samples = sink.finalize()?;

    Ok(RenderSummary {
        samples,
        sample_rate,
        steps: scheduler.step(),
    })
}
