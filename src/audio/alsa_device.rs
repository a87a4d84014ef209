//! ALSA PCM device wrapper for mono capture.

use alsa::pcm::{Access, Format, HwParams, PCM};
use alsa::{Direction, ValueOr};
use anyhow::{Context, Result};

/// Parameters negotiated with the ALSA hardware.
#[derive(Debug, Clone)]
pub struct AlsaParams {
    /// Actual sample rate after negotiation
    pub sample_rate: u32,
    /// Period size in frames
    pub period_size: usize,
}

/// Open a PCM device for single-channel capture.
pub fn open_capture(device: &str, sample_rate: u32) -> Result<(PCM, AlsaParams)> {
    let pcm = PCM::new(device, Direction::Capture, false)
        .with_context(|| format!("Failed to open PCM device '{}' for Capture", device))?;

    // Configure hardware parameters
    {
        let hwp =
            HwParams::any(&pcm).with_context(|| "Failed to initialize HwParams")?;
        hwp.set_access(Access::RWInterleaved)?;
        hwp.set_format(Format::S16LE)?;
        hwp.set_channels(1)
            .with_context(|| format!("Device '{}' cannot capture mono", device))?;
        hwp.set_rate_near(sample_rate, ValueOr::Nearest)?;
        pcm.hw_params(&hwp)?;
    }

    // Read back actual negotiated parameters
    let (actual_rate, actual_channels, period_size) = {
        let hwp = pcm.hw_params_current()?;
        let rate = hwp.get_rate()?;
        let ch = hwp.get_channels()?;
        let ps = hwp.get_period_size()? as usize;
        (rate, ch, ps)
    };
    check_mono(device, actual_channels)?;

    let params = AlsaParams {
        sample_rate: actual_rate,
        period_size,
    };

    log::info!(
        "ALSA Capture: device={}, rate={}, channels={}, period_size={}",
        device,
        actual_rate,
        actual_channels,
        period_size,
    );

    Ok((pcm, params))
}

/// Only single-channel capture is supported.
fn check_mono(device: &str, channels: u32) -> Result<()> {
    if channels != 1 {
        anyhow::bail!(
            "Device '{}' negotiated {} channels, only mono capture is supported",
            device,
            channels
        );
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_check_mono() {
        assert!(check_mono("default", 1).is_ok());
        let err = check_mono("hw:1,0", 2).unwrap_err();
        assert!(err.to_string().contains("negotiated 2 channels"));
    }
}
