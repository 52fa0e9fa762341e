use std::fs;
use std::path::{Path, PathBuf};

use log::info;
use thiserror::Error;

use crate::merge::merge_over_baseline;
use crate::model::MasterDna;

/// Errors raised while reading or writing DNA presets
#[derive(Debug, Error)]
pub enum DnaError {
    #[error("Failed to access preset {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Preset is not valid JSON: {0}")]
    Json(#[from] serde_json::Error),
}

/// Load a DNA preset. The file may be partial; it is merged over the baseline.
pub fn load_preset<P: AsRef<Path>>(path: P) -> Result<MasterDna, DnaError> {
    let path = path.as_ref();
    let text = fs::read_to_string(path).map_err(|source| DnaError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    let payload: serde_json::Value = serde_json::from_str(&text)?;
    let dna = merge_over_baseline(&MasterDna::baseline(), &payload);
    info!("Loaded DNA preset '{}' from {}", dna.label(), path.display());
    Ok(dna)
}

/// Export a DNA as pretty JSON in the provider's shape
pub fn save_preset<P: AsRef<Path>>(path: P, dna: &MasterDna) -> Result<(), DnaError> {
    let path = path.as_ref();
    let text = serde_json::to_string_pretty(dna)?;
    fs::write(path, text).map_err(|source| DnaError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    info!("Saved DNA '{}' to {}", dna.label(), path.display());
    Ok(())
}
