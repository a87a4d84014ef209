//! Blocking sources of fixed-length mono buffers.

use alsa::pcm::{IO, PCM};
use anyhow::{Context, Result};

use super::alsa_device::{self, AlsaParams};
use super::AudioConfig;

/// Something that yields one complete buffer per call, blocking until the
/// buffer is full.
pub trait AudioSource {
    fn capture(&mut self) -> Result<Vec<f64>>;
    fn sample_rate(&self) -> u32;
}

/// Number of frames in a buffer of `duration_ms` at `sample_rate`.
pub fn buffer_frames(duration_ms: u64, sample_rate: u32) -> usize {
    (duration_ms * sample_rate as u64 / 1000) as usize
}

/// Normalise a signed 16-bit sample into [-1.0, 1.0).
pub fn sample_to_f64(sample: i16) -> f64 {
    sample as f64 / 32768.0
}

/// One period at a time from a capture device, with a way to recover after
/// a failed read (XRUN, EIO).
pub trait PeriodReader {
    fn read(&mut self, buf: &mut [i16]) -> Result<usize>;
    fn recover(&mut self) -> Result<()>;
}

struct AlsaReader<'a> {
    pcm: &'a PCM,
    io: IO<'a, i16>,
}

impl PeriodReader for AlsaReader<'_> {
    fn read(&mut self, buf: &mut [i16]) -> Result<usize> {
        Ok(self.io.readi(buf)?)
    }

    fn recover(&mut self) -> Result<()> {
        self.pcm.prepare().context("Failed to recover PCM capture")
    }
}

/// Read periods until `frames` samples are collected.
///
/// A failed read gets one `recover()`; a second failure in a row is returned.
pub fn fill_buffer<R: PeriodReader>(
    reader: &mut R,
    frames: usize,
    period_size: usize,
) -> Result<Vec<f64>> {
    let mut read_buf = vec![0i16; period_size.max(1)];
    let mut samples = Vec::with_capacity(frames);
    let mut recovered = false;

    while samples.len() < frames {
        match reader.read(&mut read_buf) {
            Ok(n) => {
                recovered = false;
                let take = n.min(frames - samples.len());
                samples.extend(read_buf[..take].iter().copied().map(sample_to_f64));
            }
            Err(e) if recovered => {
                return Err(e.context("ALSA capture failed again after recovery"));
            }
            Err(e) => {
                log::warn!("ALSA capture error: {}, recovering...", e);
                reader.recover()?;
                recovered = true;
            }
        }
    }

    Ok(samples)
}

/// Microphone capture through ALSA.
pub struct AlsaSource {
    pcm: PCM,
    params: AlsaParams,
    frames: usize,
}

impl AlsaSource {
    pub fn open(config: &AudioConfig) -> Result<Self> {
        let (pcm, params) = alsa_device::open_capture(&config.capture_device, config.sample_rate)?;
        let frames = buffer_frames(config.duration_ms, params.sample_rate);
        if frames == 0 {
            anyhow::bail!(
                "Buffer of {}ms at {}Hz holds no frames",
                config.duration_ms,
                params.sample_rate
            );
        }
        Ok(Self {
            pcm,
            params,
            frames,
        })
    }
}

impl AudioSource for AlsaSource {
    fn capture(&mut self) -> Result<Vec<f64>> {
        // Discard whatever queued up while we were idle so the buffer starts now
        self.pcm.drop().context("Failed to reset PCM capture")?;
        self.pcm.prepare().context("Failed to prepare PCM capture")?;

        let mut reader = AlsaReader {
            pcm: &self.pcm,
            io: self.pcm.io_i16()?,
        };
        fill_buffer(&mut reader, self.frames, self.params.period_size)
    }

    fn sample_rate(&self) -> u32 {
        self.params.sample_rate
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::VecDeque;

    /// Replays a script of read outcomes; `Err` entries fail that read.
    struct ScriptedReader {
        reads: VecDeque<Result<Vec<i16>, &'static str>>,
        recoveries: usize,
    }

    impl ScriptedReader {
        fn new(reads: Vec<Result<Vec<i16>, &'static str>>) -> Self {
            Self {
                reads: reads.into(),
                recoveries: 0,
            }
        }
    }

    impl PeriodReader for ScriptedReader {
        fn read(&mut self, buf: &mut [i16]) -> Result<usize> {
            // An exhausted script keeps failing, like a dead USB mic
            match self.reads.pop_front().unwrap_or(Err("EIO")) {
                Ok(period) => {
                    buf[..period.len()].copy_from_slice(&period);
                    Ok(period.len())
                }
                Err(e) => Err(anyhow::anyhow!(e)),
            }
        }

        fn recover(&mut self) -> Result<()> {
            self.recoveries += 1;
            Ok(())
        }
    }

    #[test]
    fn test_fill_buffer_truncates_last_period() {
        let mut reader = ScriptedReader::new(vec![Ok(vec![16384; 4]), Ok(vec![0; 4])]);
        let samples = fill_buffer(&mut reader, 6, 4).unwrap();
        assert_eq!(samples, vec![0.5, 0.5, 0.5, 0.5, 0.0, 0.0]);
    }

    #[test]
    fn test_single_failure_is_recovered() {
        let mut reader = ScriptedReader::new(vec![Ok(vec![0; 4]), Err("XRUN"), Ok(vec![0; 4])]);
        let samples = fill_buffer(&mut reader, 8, 4).unwrap();
        assert_eq!(samples.len(), 8);
        assert_eq!(reader.recoveries, 1);
    }

    #[test]
    fn test_repeated_failure_gives_up_after_one_recovery() {
        let mut reader = ScriptedReader::new(vec![Ok(vec![0; 4])]);
        let err = fill_buffer(&mut reader, 8, 4).unwrap_err();
        assert_eq!(reader.recoveries, 1);
        assert!(format!("{:#}", err).contains("EIO"));
    }

    #[test]
    fn test_failures_separated_by_good_reads_each_recover() {
        let mut reader = ScriptedReader::new(vec![
            Err("XRUN"),
            Ok(vec![0; 4]),
            Err("XRUN"),
            Ok(vec![0; 4]),
        ]);
        assert!(fill_buffer(&mut reader, 8, 4).is_ok());
        assert_eq!(reader.recoveries, 2);
    }

    #[test]
    fn test_buffer_frames() {
        assert_eq!(buffer_frames(1000, 44100), 44100);
        assert_eq!(buffer_frames(500, 48000), 24000);
        assert_eq!(buffer_frames(1, 999), 0);
    }

    #[test]
    fn test_sample_normalisation_range() {
        assert_eq!(sample_to_f64(0), 0.0);
        assert_eq!(sample_to_f64(i16::MIN), -1.0);
        assert!(sample_to_f64(i16::MAX) < 1.0);
        assert_eq!(sample_to_f64(16384), 0.5);
    }
}
