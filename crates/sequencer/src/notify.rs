// Step notifications and the shared playhead observers poll

use std::sync::Arc;

use arc_swap::ArcSwapOption;
use common::Section;

/// A scheduled step, delivered once the audio clock reaches `onset`
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StepNotification {
    /// Position within the section pattern
    pub step_idx: usize,
    pub section: Section,
    pub global_step: u64,
    pub onset: f64,
}

/// Last step that actually sounded
#[derive(Debug, Clone, Default)]
pub struct StepPosition {
    inner: Arc<ArcSwapOption<StepNotification>>,
}

impl StepPosition {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn publish(&self, notification: StepNotification) {
        self.inner.store(Some(Arc::new(notification)));
    }

    pub fn clear(&self) {
        self.inner.store(None);
    }

    pub fn current(&self) -> Option<StepNotification> {
        self.inner.load_full().map(|n| *n)
    }

    /// Step index within the section, 0 before the first step sounded
    pub fn step_idx(&self) -> usize {
        self.current().map_or(0, |n| n.step_idx)
    }

    pub fn section(&self) -> Section {
        self.current().map_or(Section::A, |n| n.section)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_position_defaults() {
        let position = StepPosition::new();
        assert!(position.current().is_none());
        assert_eq!(position.step_idx(), 0);
        assert_eq!(position.section(), Section::A);
    }

    #[test]
    fn test_position_is_shared_between_clones() {
        let position = StepPosition::new();
        let observer = position.clone();
        position.publish(StepNotification {
            step_idx: 3,
            section: Section::B,
            global_step: 35,
            onset: 4.2,
        });
        assert_eq!(observer.step_idx(), 3);
        assert_eq!(observer.section(), Section::B);

        position.clear();
        assert!(observer.current().is_none());
    }
}
