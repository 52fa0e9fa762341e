// generation module

pub mod cache;
pub mod cadence;
pub mod controller;
pub mod procedural;
pub mod provider;
pub mod status;


pub use crate::cache::GenerationCache;
pub use crate::cadence::Cadence;
pub use crate::controller::{GenerationConfig, GenerationController, PendingGeneration, RequestOutcome};
pub use crate::procedural::ProceduralProvider;
pub use crate::provider::{DnaProvider, GenerationRequest, ProviderError};
pub use crate::status::{GenerationStatus, StatusCell};
