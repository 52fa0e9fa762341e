// Device output: rodio stream and sink feeding the master bus

use log::{debug, info};
use rodio::{OutputStream, Sink};

use crate::bus::{BusSettings, MasterBus};
use crate::SynthError;

/// Owns the device stream. Not `Send`: keep it on the thread that opened it
/// and share the `MasterBus` handle instead.
pub struct DeviceOutput {
    _stream: OutputStream,
    sink: Sink,
    bus: MasterBus,
}

impl DeviceOutput {
    /// Open the default output device and start pulling the bus
    pub fn open(settings: BusSettings) -> Result<Self, SynthError> {
        let (stream, stream_handle) = OutputStream::try_default()
            .map_err(|e| SynthError::InitializationError(e.to_string()))?;

        let sink = Sink::try_new(&stream_handle).map_err(|e| {
            SynthError::InitializationError(format!("Failed to create sink: {}", e))
        })?;

        let (bus, source) = MasterBus::new(settings);
        sink.append(source);
        sink.play();

        info!(
            "Audio output opened at {} Hz (gain {:.2}, delay {:.3}s)",
            settings.sample_rate, settings.master_gain, settings.delay_time
        );

        Ok(Self {
            _stream: stream,
            sink,
            bus,
        })
    }

    pub fn bus(&self) -> &MasterBus {
        &self.bus
    }

    /// Un-pause a suspended sink
    pub fn resume(&self) {
        if self.sink.is_paused() {
            debug!("Output sink was suspended - resuming");
            self.sink.play();
        }
    }

    pub fn is_suspended(&self) -> bool {
        self.sink.is_paused()
    }
}
