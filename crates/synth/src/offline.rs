// Offline rendering: the bus renderer driven faster than real time into a WAV

use std::fs::File;
use std::io::BufWriter;
use std::path::Path;
use std::sync::{Mutex, PoisonError};

use hound::{SampleFormat, WavSpec, WavWriter};
use log::info;

use crate::bus::{BusRenderer, BusSettings, BLOCK_FRAMES};
use crate::graph::AudioGraph;
use crate::voice::Voice;
use crate::SynthError;

/// Audio graph whose clock only moves when `render` is called
pub struct OfflineBus {
    renderer: Mutex<BusRenderer>,
}

impl OfflineBus {
    pub fn new(settings: BusSettings) -> Self {
        Self {
            renderer: Mutex::new(BusRenderer::new(settings)),
        }
    }

    pub fn sample_rate(&self) -> u32 {
        self.lock().settings().sample_rate
    }

    /// Render `frames` more frames, returned as mono samples
    pub fn render(&self, frames: usize) -> Vec<f32> {
        let mut out = vec![0.0; frames];
        let mut renderer = self.lock();
        for block in out.chunks_mut(BLOCK_FRAMES) {
            renderer.render_block(block);
        }
        out
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, BusRenderer> {
        self.renderer.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl AudioGraph for OfflineBus {
    fn current_time(&self) -> f64 {
        self.lock().time()
    }

    fn connect(&self, voice: Voice) {
        self.lock().add_voice(voice);
    }

    fn output_level(&self) -> f32 {
        self.lock().level()
    }
}

/// 16-bit mono WAV writer
pub struct WavSink {
    writer: WavWriter<BufWriter<File>>,
    samples: u64,
}

impl WavSink {
    pub fn create<P: AsRef<Path>>(path: P, sample_rate: u32) -> Result<Self, SynthError> {
        let spec = WavSpec {
            channels: 1,
            sample_rate,
            bits_per_sample: 16,
            sample_format: SampleFormat::Int,
        };
        let writer = WavWriter::create(path.as_ref(), spec)?;
        Ok(Self { writer, samples: 0 })
    }

    pub fn write(&mut self, samples: &[f32]) -> Result<(), SynthError> {
        for &sample in samples {
            let value = (sample.clamp(-1.0, 1.0) * i16::MAX as f32) as i16;
            self.writer.write_sample(value)?;
        }
        self.samples += samples.len() as u64;
        Ok(())
    }

    /// Flush the header; returns the number of samples written
    pub fn finalize(self) -> Result<u64, SynthError> {
        self.writer.finalize()?;
        info!("Finished WAV with {} samples", self.samples);
        Ok(self.samples)
    }
}
