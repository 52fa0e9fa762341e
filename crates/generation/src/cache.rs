use std::sync::Arc;

use dna::MasterDna;

/// Generated DNA kept for replay, valid for a single tempo
#[derive(Debug)]
pub struct GenerationCache {
    bpm: Option<u32>,
    samples: Vec<Arc<MasterDna>>,
    index: usize,
    capacity: usize,
}

impl GenerationCache {
    pub fn new(capacity: usize) -> Self {
        Self {
            bpm: None,
            samples: Vec::new(),
            index: 0,
            capacity: capacity.max(1),
        }
    }

    /// Re-key the cache to `bpm`, dropping every sample if the tempo moved.
    /// Returns true when samples were discarded.
    pub fn sync_tempo(&mut self, bpm: u32) -> bool {
        if self.bpm == Some(bpm) {
            return false;
        }
        let had_samples = !self.samples.is_empty();
        self.bpm = Some(bpm);
        self.samples.clear();
        self.index = 0;
        had_samples
    }

    pub fn is_full(&self) -> bool {
        self.samples.len() >= self.capacity
    }

    /// Step the replay index to the next sample
    pub fn rotate(&mut self) -> Option<(usize, Arc<MasterDna>)> {
        if self.samples.is_empty() {
            return None;
        }
        self.index = (self.index + 1) % self.samples.len();
        Some((self.index, Arc::clone(&self.samples[self.index])))
    }

    /// Store a sample generated at `bpm` and point the index at it.
    /// Samples for another tempo, or beyond capacity, are not kept.
    pub fn insert(&mut self, bpm: u32, dna: Arc<MasterDna>) -> Option<usize> {
        if self.bpm != Some(bpm) || self.is_full() {
            return None;
        }
        self.samples.push(dna);
        self.index = self.samples.len() - 1;
        Some(self.index)
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    pub fn index(&self) -> usize {
        self.index
    }

    pub fn bpm(&self) -> Option<u32> {
        self.bpm
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }
}
