pub mod cell;
pub mod loader;
pub mod merge;
pub mod model;

pub use cell::DnaCell;
pub use common::Section;
pub use loader::{load_preset, save_preset, DnaError};
pub use merge::merge_over_baseline;
pub use model::{Drums, MasterDna, SectionDna, DEFAULT_PROBABILITY, MAX_PATTERN_LEN};
