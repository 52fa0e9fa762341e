// sequencer module

pub mod notify;
pub mod scheduler;

#[cfg(test)]
mod tests;

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

use common::{EngineEvent, SharedEventBus};
use crossbeam_channel::{bounded, Receiver, RecvTimeoutError, Sender};
use log::{debug, info};
use synth::SharedGraph;

pub use crate::notify::{StepNotification, StepPosition};
pub use crate::scheduler::{SchedulerConfig, StepScheduler, PHRASE_STEPS};

/// Commands that can be sent to the driver thread
enum DriverCommand {
    Start(SharedGraph),
    Stop,
    Quit,
}

/// Owns a `StepScheduler` on its own thread and re-arms it every tick
/// while playback is active
pub struct SchedulerDriver {
    cmd_sender: Sender<DriverCommand>,
    thread_handle: Option<JoinHandle<()>>,
    running: Arc<AtomicBool>,
    position: StepPosition,
}

impl SchedulerDriver {
    /// Spawn the driver thread; it idles until `start`
    pub fn spawn(scheduler: StepScheduler, event_bus: SharedEventBus) -> Self {
        let (cmd_sender, cmd_receiver) = bounded::<DriverCommand>(32);
        let running = Arc::new(AtomicBool::new(false));
        let position = StepPosition::new();

        let running_clone = Arc::clone(&running);
        let position_clone = position.clone();

        let thread_handle = thread::spawn(move || {
            run_driver(scheduler, cmd_receiver, running_clone, position_clone, event_bus);
        });

        Self {
            cmd_sender,
            thread_handle: Some(thread_handle),
            running,
            position,
        }
    }

    /// Reset the cursor against `graph` and begin scheduling
    pub fn start(&self, graph: SharedGraph) {
        let _ = self.cmd_sender.send(DriverCommand::Start(graph));
    }

    /// Stop re-arming; sounds already scheduled play out
    pub fn stop(&self) {
        let _ = self.cmd_sender.send(DriverCommand::Stop);
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }

    pub fn position(&self) -> &StepPosition {
        &self.position
    }
}

impl Drop for SchedulerDriver {
    fn drop(&mut self) {
        // Send quit command to worker thread
        let _ = self.cmd_sender.send(DriverCommand::Quit);

        // Wait for worker thread to finish
        if let Some(handle) = self.thread_handle.take() {
            let _ = handle.join();
        }
    }
}

fn run_driver(
    mut scheduler: StepScheduler,
    cmd_receiver: Receiver<DriverCommand>,
    running: Arc<AtomicBool>,
    position: StepPosition,
    event_bus: SharedEventBus,
) {
    let tick = scheduler.config().tick_interval;

    loop {
        let command = if running.load(Ordering::SeqCst) {
            // wake for the next tick or the next due step, whichever is first
            let wait = scheduler
                .next_due()
                .map(|due| Duration::from_secs_f64((due - scheduler.clock()).max(0.0)))
                .map_or(tick, |until_due| until_due.min(tick));
            match cmd_receiver.recv_timeout(wait) {
                Ok(cmd) => Some(cmd),
                Err(RecvTimeoutError::Timeout) => None,
                Err(RecvTimeoutError::Disconnected) => break,
            }
        } else {
            match cmd_receiver.recv() {
                Ok(cmd) => Some(cmd),
                Err(_) => break,
            }
        };

        match command {
            Some(DriverCommand::Start(graph)) => {
                scheduler.set_graph(graph);
                let now = scheduler.clock();
                scheduler.reset(now);
                position.clear();
                running.store(true, Ordering::SeqCst);
                info!("Scheduler driver started at clock {:.3}", now);
            }
            Some(DriverCommand::Stop) => {
                running.store(false, Ordering::SeqCst);
                info!("Scheduler driver stopped at step {}", scheduler.step());
                continue;
            }
            Some(DriverCommand::Quit) => {
                debug!("Scheduler driver shutting down");
                break;
            }
            None => {}
        }

        if running.load(Ordering::SeqCst) {
            let now = scheduler.clock();
            let scheduled = scheduler.advance(now);
            if scheduled > 0 {
                debug!("Scheduled {} step(s), next at {:.3}", scheduled, scheduler.next_time());
            }

            for notification in scheduler.take_due(now) {
                position.publish(notification);
                event_bus.emit(EngineEvent::StepBoundary {
                    step_idx: notification.step_idx,
                    section: notification.section,
                    global_step: notification.global_step,
                });
            }
        }
    }

    running.store(false, Ordering::SeqCst);
}
