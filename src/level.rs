//! Level estimation: one captured buffer in, one decibel reading out.
//!
//! The decibel value is relative (`20·log10` of the RMS amplitude), not a
//! calibrated sound pressure level. A fixed offset may be added to move the
//! scale into a friendlier range, and the result is compared against a fixed
//! threshold.

use thiserror::Error;

/// Floor added to the RMS before taking the logarithm, so silence maps to
/// roughly -120 dB instead of negative infinity.
pub const EPSILON: f64 = 1e-6;

#[derive(Debug, Error, PartialEq)]
pub enum LevelError {
    #[error("Audio buffer is empty")]
    EmptyBuffer,
}

/// Binary classification of a reading against the threshold.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NoiseStatus {
    Normal,
    High,
}

impl NoiseStatus {
    /// Text carried in the published payload.
    pub fn label(self) -> &'static str {
        match self {
            NoiseStatus::Normal => "NORMAL NOISE",
            NoiseStatus::High => "HIGH NOISE",
        }
    }

    /// Text shown on the console line.
    pub fn indicator(self) -> &'static str {
        match self {
            NoiseStatus::Normal => "✅ RED LIGHT OFF",
            NoiseStatus::High => "🚨 RED LIGHT ON",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LevelReading {
    pub decibels: f64,
    pub status: NoiseStatus,
}

/// Root-mean-square amplitude of `samples`. Returns `None` for an empty slice.
pub fn rms(samples: &[f64]) -> Option<f64> {
    if samples.is_empty() {
        return None;
    }
    let sum: f64 = samples.iter().map(|s| s * s).sum();
    Some((sum / samples.len() as f64).sqrt())
}

/// Uncalibrated decibel value of an RMS amplitude.
pub fn decibels(rms: f64) -> f64 {
    20.0 * (rms + EPSILON).log10()
}

/// Maps audio buffers to [`LevelReading`]s using a fixed offset and threshold.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LevelEstimator {
    offset_db: f64,
    threshold_db: f64,
}

impl LevelEstimator {
    /// * `offset_db`    - Added to every computed value (0.0 for raw readings)
    /// * `threshold_db` - Readings strictly above this are [`NoiseStatus::High`]
    pub fn new(offset_db: f64, threshold_db: f64) -> Self {
        Self {
            offset_db,
            threshold_db,
        }
    }

    pub fn offset_db(&self) -> f64 {
        self.offset_db
    }

    pub fn threshold_db(&self) -> f64 {
        self.threshold_db
    }

    pub fn estimate(&self, samples: &[f64]) -> Result<LevelReading, LevelError> {
        let rms = rms(samples).ok_or(LevelError::EmptyBuffer)?;
        let db = decibels(rms) + self.offset_db;
        Ok(LevelReading {
            decibels: db,
            status: self.classify(db),
        })
    }

    /// Equality with the threshold counts as normal.
    pub fn classify(&self, db: f64) -> NoiseStatus {
        if db > self.threshold_db {
            NoiseStatus::High
        } else {
            NoiseStatus::Normal
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn approx(a: f64, b: f64, tol: f64) -> bool {
        (a - b).abs() < tol
    }

    #[test]
    fn test_silence_hits_epsilon_floor() {
        let estimator = LevelEstimator::new(0.0, 0.0);
        let reading = estimator.estimate(&vec![0.0; 44100]).unwrap();
        assert!(approx(reading.decibels, -120.0, 1e-9));
        assert!(reading.decibels.is_finite());
        assert_eq!(reading.status, NoiseStatus::Normal);
    }

    #[test]
    fn test_constant_amplitude() {
        let estimator = LevelEstimator::new(0.0, 0.0);
        for a in [0.25, -0.25, 0.8, -1.0] {
            let reading = estimator.estimate(&vec![a; 1000]).unwrap();
            let expected = 20.0 * (f64::abs(a) + 1e-6).log10();
            assert!(approx(reading.decibels, expected, 1e-9), "a = {}", a);
        }
    }

    #[test]
    fn test_rms_of_alternating_signal() {
        let samples = [0.5, -0.5, 0.5, -0.5];
        assert!(approx(rms(&samples).unwrap(), 0.5, 1e-12));
        assert_eq!(rms(&[]), None);
    }

    #[test]
    fn test_offset_shifts_by_exactly_the_offset() {
        let samples: Vec<f64> = (0..512).map(|i| ((i as f64) * 0.1).sin() * 0.3).collect();
        let raw = LevelEstimator::new(0.0, 1000.0).estimate(&samples).unwrap();
        let shifted = LevelEstimator::new(60.0, 1000.0).estimate(&samples).unwrap();
        assert!(approx(shifted.decibels - raw.decibels, 60.0, 1e-9));
    }

    #[test]
    fn test_threshold_is_strict() {
        let estimator = LevelEstimator::new(0.0, -7.0);
        assert_eq!(estimator.classify(-7.0), NoiseStatus::Normal);
        assert_eq!(estimator.classify(-6.99), NoiseStatus::High);
        assert_eq!(estimator.classify(-7.01), NoiseStatus::Normal);
    }

    #[test]
    fn test_empty_buffer_is_rejected() {
        let estimator = LevelEstimator::new(60.0, 70.0);
        assert_eq!(estimator.estimate(&[]), Err(LevelError::EmptyBuffer));
    }

    #[test]
    fn test_raw_scale_loud_input() {
        let estimator = LevelEstimator::new(0.0, -7.0);
        let reading = estimator.estimate(&vec![0.5; 44100]).unwrap();
        assert!(approx(reading.decibels, -6.02, 0.005));
        assert_eq!(reading.status, NoiseStatus::High);
        assert_eq!(reading.status.label(), "HIGH NOISE");
    }

    #[test]
    fn test_offset_scale_quiet_input() {
        let estimator = LevelEstimator::new(60.0, 70.0);
        let reading = estimator.estimate(&vec![0.001; 44100]).unwrap();
        assert!(approx(reading.decibels, 0.01, 0.005));
        assert_eq!(reading.status, NoiseStatus::Normal);
        assert_eq!(reading.status.indicator(), "✅ RED LIGHT OFF");
    }
}
