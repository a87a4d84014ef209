//! audio - Microphone capture and level metering
//!
//! Uses ALSA for mono capture. No preprocessing is applied; each buffer is
//! handed to the level estimator as captured.

mod alsa_device;
mod meter;
mod source;

pub use meter::LevelMeter;
pub use source::AlsaSource;

/// Audio capture configuration.
#[derive(Debug, Clone)]
pub struct AudioConfig {
    /// ALSA capture device name (e.g. "default", "plughw:0,0")
    pub capture_device: String,
    /// Desired ALSA sample rate (may be negotiated by hardware)
    pub sample_rate: u32,
    /// Length of one captured buffer in ms
    pub duration_ms: u64,
}
