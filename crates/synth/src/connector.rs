// Synth connector
// Lazily opens the audio device the first time playback needs it

use std::sync::Arc;

use log::{info, warn};

use crate::bus::BusSettings;
use crate::graph::{AudioGraph, DetachedGraph, SharedGraph};
use crate::output::DeviceOutput;

enum Output {
    /// Nothing requested yet
    Unopened,
    Device {
        device: DeviceOutput,
        graph: SharedGraph,
    },
    /// Device open failed; retried on the next `ensure`
    Detached(SharedGraph),
    /// Graph supplied by the caller (headless runs, tests)
    Provided(SharedGraph),
}

/// Hands out the audio graph the scheduler writes into.
///
/// The device is opened at most once per connector and only when playback
/// starts, never at construction.
pub struct SynthConnector {
    settings: BusSettings,
    output: Output,
}

impl SynthConnector {
    pub fn new(settings: BusSettings) -> Self {
        Self {
            settings,
            output: Output::Unopened,
        }
    }

    /// Connector that always returns `graph` and never touches a device
    pub fn with_graph(graph: SharedGraph) -> Self {
        Self {
            settings: BusSettings::default(),
            output: Output::Provided(graph),
        }
    }

    /// Return the graph, opening the device on first use and resuming it
    /// if it was suspended
    pub fn ensure(&mut self) -> SharedGraph {
        match &self.output {
            Output::Device { device, graph } => {
                device.resume();
                return Arc::clone(graph);
            }
            Output::Provided(graph) => return Arc::clone(graph),
            Output::Unopened | Output::Detached(_) => {}
        }

        match DeviceOutput::open(self.settings) {
            Ok(device) => {
                let graph: SharedGraph = Arc::new(device.bus().clone());
                info!("Audio graph attached to output device");
                self.output = Output::Device {
                    device,
                    graph: Arc::clone(&graph),
                };
                graph
            }
            Err(e) => {
                warn!("{} - continuing without audio output", e);
                if let Output::Detached(graph) = &self.output {
                    return Arc::clone(graph);
                }
                let graph: SharedGraph = Arc::new(DetachedGraph::new());
                self.output = Output::Detached(Arc::clone(&graph));
                graph
            }
        }
    }

    /// The current graph, if one was ever handed out
    pub fn graph(&self) -> Option<SharedGraph> {
        match &self.output {
            Output::Unopened => None,
            Output::Device { graph, .. } | Output::Detached(graph) | Output::Provided(graph) => {
                Some(Arc::clone(graph))
            }
        }
    }

    pub fn has_device(&self) -> bool {
        matches!(self.output, Output::Device { .. })
    }

    pub fn output_level(&self) -> f32 {
        match &self.output {
            Output::Unopened => 0.0,
            Output::Device { graph, .. } | Output::Detached(graph) | Output::Provided(graph) => {
                graph.output_level()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::CaptureGraph;

    #[test]
    fn test_connector_is_lazy() {
        // Creating the connector must not touch the audio device
        let connector = SynthConnector::new(BusSettings::default());
        assert!(connector.graph().is_none());
        assert!(!connector.has_device());
        assert_eq!(connector.output_level(), 0.0);
    }

    #[test]
    fn test_ensure_is_idempotent() {
        // Works with or without an audio device: either way the same graph
        // comes back from repeated calls
        let mut connector = SynthConnector::new(BusSettings::default());
        let first = connector.ensure();
        let second = connector.ensure();
        assert!(Arc::ptr_eq(&first, &second));
        assert!(connector.graph().is_some());
    }

    #[test]
    fn test_provided_graph() {
        let capture = Arc::new(CaptureGraph::new());
        capture.set_time(3.0);
        let mut connector = SynthConnector::with_graph(capture.clone());
        let graph = connector.ensure();
        assert_eq!(graph.current_time(), 3.0);
        assert!(!connector.has_device());
    }
}
