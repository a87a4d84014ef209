//! The LevelMeter runs the capture → estimate loop on its own OS thread.
//!
//! Uses std::thread (NOT tokio tasks) because ALSA reads block for the whole
//! buffer duration.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;
use tokio::sync::mpsc;

use anyhow::Result;

use super::source::AudioSource;
use crate::level::{LevelError, LevelEstimator, LevelReading};

/// Handle to the metering thread.
///
/// One iteration is: capture one buffer → estimate → `reading_tx` → sleep
/// `interval`. The running flag is checked between iterations only.
pub struct LevelMeter {
    running: Arc<AtomicBool>,
    handle: Option<JoinHandle<()>>,
}

impl LevelMeter {
    /// Start metering.
    ///
    /// * `open`       - Opens the audio source on the metering thread
    /// * `estimator`  - Offset and threshold applied to every buffer
    /// * `interval`   - Pause between iterations
    /// * `reading_tx` - Receives one reading per successful iteration
    pub fn start<F, S>(
        open: F,
        estimator: LevelEstimator,
        interval: Duration,
        reading_tx: mpsc::Sender<LevelReading>,
    ) -> Result<Self>
    where
        F: FnOnce() -> Result<S> + Send + 'static,
        S: AudioSource,
    {
        let running = Arc::new(AtomicBool::new(true));

        log::info!(
            "LevelMeter starting, offset: {} dB, threshold: {} dB, interval: {:?}",
            estimator.offset_db(),
            estimator.threshold_db(),
            interval,
        );

        let handle = {
            let running = running.clone();
            thread::Builder::new()
                .name("level-meter".into())
                .spawn(move || {
                    let result = open().and_then(|mut source| {
                        meter_thread(&mut source, &estimator, interval, reading_tx, &running)
                    });
                    if let Err(e) = result {
                        log::error!("Level meter error: {:#}", e);
                    }
                })?
        };

        Ok(Self {
            running,
            handle: Some(handle),
        })
    }

    /// Signal the thread to stop and wait for the current iteration to finish.
    ///
    /// The receiver must be dropped or drained first, otherwise a pending
    /// send can block the join.
    pub fn stop(&mut self) {
        self.running.store(false, Ordering::SeqCst);
        if let Some(h) = self.handle.take() {
            let _ = h.join();
        }
    }
}

impl Drop for LevelMeter {
    fn drop(&mut self) {
        self.stop();
    }
}

fn meter_thread<S: AudioSource>(
    source: &mut S,
    estimator: &LevelEstimator,
    interval: Duration,
    reading_tx: mpsc::Sender<LevelReading>,
    running: &AtomicBool,
) -> Result<()> {
    log::info!("Metering started: rate={}", source.sample_rate());

    while running.load(Ordering::Relaxed) {
        let samples = source.capture()?;

        match estimator.estimate(&samples) {
            Ok(reading) => {
                log::debug!("{} samples -> {:.2} dB", samples.len(), reading.decibels);
                if reading_tx.blocking_send(reading).is_err() {
                    log::warn!("Failed to send reading, receiver dropped");
                    return Ok(());
                }
            }
            Err(e @ LevelError::EmptyBuffer) => {
                log::warn!("Skipping iteration: {}", e);
            }
        }

        if !interval.is_zero() && running.load(Ordering::Relaxed) {
            thread::sleep(interval);
        }
    }

    log::info!("Metering stopped");
    Ok(())
}
