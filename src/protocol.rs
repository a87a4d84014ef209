use serde::{Deserialize, Serialize};

use crate::level::LevelReading;

/// Message published for every reading, e.g. `{"db":-6.02,"status":"HIGH NOISE"}`.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct NoisePayload {
    pub db: f64,
    pub status: String,
}

impl NoisePayload {
    pub fn from_reading(reading: &LevelReading) -> Self {
        Self {
            db: round2(reading.decibels),
            status: reading.status.label().to_string(),
        }
    }

    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string(self)
    }
}

fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::level::{LevelEstimator, NoiseStatus};

    #[test]
    fn test_payload_for_loud_raw_reading() {
        let reading = LevelEstimator::new(0.0, -7.0)
            .estimate(&vec![0.5; 44100])
            .unwrap();
        let payload = NoisePayload::from_reading(&reading);
        assert_eq!(payload.to_json().unwrap(), r#"{"db":-6.02,"status":"HIGH NOISE"}"#);
    }

    #[test]
    fn test_payload_for_quiet_offset_reading() {
        let reading = LevelEstimator::new(60.0, 70.0)
            .estimate(&vec![0.001; 44100])
            .unwrap();
        let payload = NoisePayload::from_reading(&reading);
        assert_eq!(payload.db, 0.01);
        assert_eq!(payload.status, "NORMAL NOISE");
    }

    #[test]
    fn test_payload_field_names() {
        let reading = LevelReading {
            decibels: 71.456,
            status: NoiseStatus::High,
        };
        let json = NoisePayload::from_reading(&reading).to_json().unwrap();
        let parsed: NoisePayload = serde_json::from_str(&json).unwrap();
        assert_eq!(
            parsed,
            NoisePayload {
                db: 71.46,
                status: "HIGH NOISE".to_string(),
            }
        );
    }
}
