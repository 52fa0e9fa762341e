// Engine configuration, read from helix.toml

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use common::{clamp_bpm, DEFAULT_BPM};
use dna::DEFAULT_PROBABILITY;
use generation::GenerationConfig;
use log::info;
use sequencer::SchedulerConfig;
use serde::{Deserialize, Serialize};
use synth::BusSettings;
use thiserror::Error;

pub const CONFIG_FILE: &str = "helix.toml";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to access config {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid config: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Failed to serialize config: {0}")]
    Serialize(#[from] toml::ser::Error),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    pub bpm: u32,
    pub scheduler: SchedulerSection,
    pub generation: GenerationSection,
    pub audio: AudioSection,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SchedulerSection {
    pub tick_interval_ms: u64,
    pub look_ahead_ms: u64,
    pub start_offset_ms: u64,
    pub pattern_length: usize,
    pub default_probability: f32,
    pub max_lag_ms: u64,
    /// Fixed seed for the probability gates; unset draws from entropy
    #[serde(skip_serializing_if = "Option::is_none")]
    pub seed: Option<u64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GenerationSection {
    pub cadence_secs: u64,
    pub cache_capacity: usize,
    pub transition_delay_ms: u64,
    pub min_melody_notes: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AudioSection {
    pub master_gain: f32,
    pub delay_time: f32,
    pub delay_feedback: f32,
    pub delay_mix: f32,
    pub render_sample_rate: u32,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            bpm: DEFAULT_BPM,
            scheduler: SchedulerSection::default(),
            generation: GenerationSection::default(),
            audio: AudioSection::default(),
        }
    }
}

impl Default for SchedulerSection {
    fn default() -> Self {
        Self {
            tick_interval_ms: 40,
            look_ahead_ms: 200,
            start_offset_ms: 100,
            pattern_length: 16,
            default_probability: DEFAULT_PROBABILITY,
            max_lag_ms: 1000,
            seed: None,
        }
    }
}

impl Default for GenerationSection {
    fn default() -> Self {
        Self {
            cadence_secs: 18,
            cache_capacity: 3,
            transition_delay_ms: 500,
            min_melody_notes: 6,
        }
    }
}

impl Default for AudioSection {
    fn default() -> Self {
        let bus = BusSettings::default();
        Self {
            master_gain: bus.master_gain,
            delay_time: bus.delay_time,
            delay_feedback: bus.delay_feedback,
            delay_mix: bus.delay_mix,
            render_sample_rate: bus.sample_rate,
        }
    }
}

impl EngineConfig {
    pub fn bpm(&self) -> u32 {
        clamp_bpm(self.bpm)
    }

    pub fn scheduler_config(&self) -> SchedulerConfig {
        let s = &self.scheduler;
        SchedulerConfig {
            tick_interval: Duration::from_millis(s.tick_interval_ms.max(1)),
            look_ahead: s.look_ahead_ms as f64 / 1000.0,
            start_offset: s.start_offset_ms as f64 / 1000.0,
            pattern_length: s.pattern_length,
            default_probability: s.default_probability.clamp(0.0, 1.0),
            max_lag: s.max_lag_ms as f64 / 1000.0,
        }
    }

    pub fn generation_config(&self) -> GenerationConfig {
        let g = &self.generation;
        GenerationConfig {
            cadence: Duration::from_secs(g.cadence_secs.max(1)),
            cache_capacity: g.cache_capacity,
            transition_delay: Duration::from_millis(g.transition_delay_ms),
            pattern_length: self.scheduler.pattern_length,
            min_melody_notes: g.min_melody_notes,
        }
    }

    /// Bus for the output device
    pub fn bus_settings(&self) -> BusSettings {
        BusSettings {
            master_gain: self.audio.master_gain,
            delay_time: self.audio.delay_time,
            delay_feedback: self.audio.delay_feedback,
            delay_mix: self.audio.delay_mix,
            ..BusSettings::default()
        }
    }

    /// Bus for offline renders
    pub fn render_bus_settings(&self) -> BusSettings {
        BusSettings {
            sample_rate: self.audio.render_sample_rate.max(8_000),
            ..self.bus_settings()
        }
    }
}

/// Where the config lives: `./helix.toml` while developing, otherwise the
/// user config directory
pub fn config_path() -> PathBuf {
    let dev_path = PathBuf::from(CONFIG_FILE);
    if dev_path.exists() {
        return dev_path;
    }

    let base = dirs::config_dir().unwrap_or_else(|| PathBuf::from("."));
    base.join("helix").join(CONFIG_FILE)
}

/// Load the config; a missing file yields the defaults
pub fn load_config<P: AsRef<Path>>(path: P) -> Result<EngineConfig, ConfigError> {
    let path = path.as_ref();
    if !path.exists() {
        info!("No config at {}, using defaults", path.display());
        return Ok(EngineConfig::default());
    }

    let text = fs::read_to_string(path).map_err(|source| ConfigError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    let config: EngineConfig = toml::from_str(&text)?;
    info!("Loaded config from {}", path.display());
    Ok(config)
}

pub fn save_config<P: AsRef<Path>>(path: P, config: &EngineConfig) -> Result<(), ConfigError> {
    let path = path.as_ref();
    let text = toml::to_string_pretty(config)?;
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent).map_err(|source| ConfigError::Io {
            path: parent.to_path_buf(),
            source,
        })?;
    }
    fs::write(path, text).map_err(|source| ConfigError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    info!("Wrote config to {}", path.display());
    Ok(())
}
