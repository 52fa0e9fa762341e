use std::sync::Arc;

use arc_swap::ArcSwap;

use crate::model::MasterDna;

/// The shared "active DNA" reference.
///
/// Values are never mutated in place: a publish swaps in a complete new
/// `MasterDna`, so a reader always sees either the old or the new value.
#[derive(Debug, Clone)]
pub struct DnaCell {
    inner: Arc<ArcSwap<MasterDna>>,
}

impl DnaCell {
    pub fn new(dna: MasterDna) -> Self {
        Self::from_arc(Arc::new(dna))
    }

    pub fn from_arc(dna: Arc<MasterDna>) -> Self {
        Self {
            inner: Arc::new(ArcSwap::new(dna)),
        }
    }

    /// Snapshot of the current DNA
    pub fn load(&self) -> Arc<MasterDna> {
        self.inner.load_full()
    }

    /// Atomically replace the current DNA
    pub fn publish(&self, dna: Arc<MasterDna>) {
        self.inner.store(dna);
    }

    pub fn label(&self) -> String {
        self.inner.load().label().to_string()
    }
}

impl Default for DnaCell {
    fn default() -> Self {
        Self::new(MasterDna::baseline())
    }
}
