// Periodic generation requests while playback is active

use std::thread::{self, JoinHandle};
use std::time::Duration;

use common::{ActiveFlag, Tempo};
use crossbeam_channel::{bounded, RecvTimeoutError, Sender};
use log::debug;

use crate::controller::GenerationController;

/// Calls `request_dna` every `interval` until stopped or playback goes
/// inactive
pub struct Cadence {
    stop_sender: Option<Sender<()>>,
    thread_handle: Option<JoinHandle<()>>,
}

impl Cadence {
    pub fn spawn(
        controller: GenerationController,
        tempo: Tempo,
        active: ActiveFlag,
        interval: Duration,
    ) -> Self {
        let (stop_sender, stop_receiver) = bounded::<()>(1);

        let thread_handle = thread::spawn(move || loop {
            match stop_receiver.recv_timeout(interval) {
                Err(RecvTimeoutError::Timeout) => {
                    if !active.is_active() {
                        debug!("Cadence ending, playback inactive");
                        break;
                    }
                    let outcome = controller.request_dna(tempo.get());
                    debug!("Cadence tick: {}", outcome.describe());
                }
                // stop requested or handle dropped
                Ok(()) | Err(RecvTimeoutError::Disconnected) => {
                    debug!("Cadence stopped");
                    break;
                }
            }
        });

        Self {
            stop_sender: Some(stop_sender),
            thread_handle: Some(thread_handle),
        }
    }

    /// Stop the cadence and wait for its thread
    pub fn stop(&mut self) {
        if let Some(sender) = self.stop_sender.take() {
            let _ = sender.send(());
        }
        if let Some(handle) = self.thread_handle.take() {
            let _ = handle.join();
        }
    }

    pub fn is_running(&self) -> bool {
        self.thread_handle
            .as_ref()
            .map_or(false, |handle| !handle.is_finished())
    }
}

impl Drop for Cadence {
    fn drop(&mut self) {
        self.stop();
    }
}
