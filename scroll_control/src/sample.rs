//! Perception values: the latest hand sample, the user's sensitivity, and the
//! classifier's raw observation as it arrives over the wire.

use serde::Deserialize;
use thiserror::Error;

// ════════════════════════════════════════════════════════════════════════════
// PositionSample
// ════════════════════════════════════════════════════════════════════════════

/// The most recent hand observation that the rest of the loop acts on.
///
/// Overwritten on every successful classification; no history is kept.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct PositionSample {
    pub hand_present: bool,
    /// 0.0 (top of frame) – 100.0 (bottom of frame).
    pub vertical_position: f32,
}

impl PositionSample {
    pub const CENTER: f32 = 50.0;

    /// A sample with the position clamped into `[0, 100]`.
    pub fn new(hand_present: bool, vertical_position: f32) -> Self {
        PositionSample {
            hand_present,
            vertical_position: vertical_position.clamp(0.0, 100.0),
        }
    }

    /// The sample a classifier should be treated as having produced when it
    /// saw nothing.
    pub fn absent() -> Self {
        PositionSample { hand_present: false, vertical_position: Self::CENTER }
    }
}

impl Default for PositionSample {
    fn default() -> Self { Self::absent() }
}

impl From<Observation> for PositionSample {
    fn from(obs: Observation) -> Self {
        PositionSample::new(obs.hand_present, obs.vertical_position)
    }
}

// ════════════════════════════════════════════════════════════════════════════
// Sensitivity
// ════════════════════════════════════════════════════════════════════════════

/// Peak scroll speed in viewport units per frame, adjustable in `5..=30`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Sensitivity(u8);

impl Sensitivity {
    pub const MIN: u8 = 5;
    pub const MAX: u8 = 30;
    pub const DEFAULT: u8 = 15;

    /// Clamp `value` into the allowed range.
    pub fn new(value: i32) -> Self {
        Sensitivity(value.clamp(Self::MIN as i32, Self::MAX as i32) as u8)
    }

    /// `None` when `value` lies outside `5..=30`.
    pub fn try_new(value: i32) -> Option<Self> {
        if (Self::MIN as i32..=Self::MAX as i32).contains(&value) {
            Some(Sensitivity(value as u8))
        } else {
            None
        }
    }

    /// Move by `delta` steps, saturating at either end.
    pub fn step(self, delta: i32) -> Self {
        Self::new(self.0 as i32 + delta)
    }

    pub fn get(self) -> u8 { self.0 }

    pub fn as_f32(self) -> f32 { self.0 as f32 }
}

impl Default for Sensitivity {
    fn default() -> Self { Sensitivity(Self::DEFAULT) }
}

// ════════════════════════════════════════════════════════════════════════════
// Observation — the classifier response
// ════════════════════════════════════════════════════════════════════════════

/// What a gesture classifier reports for one frame.
///
/// `confidence` is carried through but not used by the velocity mapping.
#[derive(Clone, Copy, Debug, PartialEq, Deserialize)]
pub struct Observation {
    #[serde(rename = "handDetected")]
    pub hand_present: bool,
    #[serde(rename = "verticalPosition")]
    pub vertical_position: f32,
    #[serde(default)]
    pub confidence: Option<f32>,
}

/// Why a classifier payload was rejected.
#[derive(Debug, Error)]
pub enum ResponseError {
    #[error("malformed classifier payload: {0}")]
    Json(#[from] serde_json::Error),

    #[error("verticalPosition is not a finite number ({0})")]
    NonFinite(f32),
}

impl Observation {
    pub fn new(hand_present: bool, vertical_position: f32, confidence: f32) -> Self {
        Observation { hand_present, vertical_position, confidence: Some(confidence) }
    }

    /// `{ handDetected: false, verticalPosition: 50, confidence: 0 }`
    pub fn absent() -> Self {
        Observation::new(false, PositionSample::CENTER, 0.0)
    }

    /// Confidence in `[0, 1]`; missing means zero.
    pub fn confidence(&self) -> f32 {
        self.confidence.unwrap_or(0.0).clamp(0.0, 1.0)
    }

    /// Decode a JSON payload strictly.
    ///
    /// An empty payload means the model had nothing to say and decodes to
    /// [`Observation::absent`].  Anything else must be an object with a
    /// boolean `handDetected` and a numeric `verticalPosition`; types are
    /// never coerced.  Range is not checked here, the sampler clamps.
    pub fn from_json(text: &str) -> Result<Self, ResponseError> {
        let text = text.trim();
        if text.is_empty() {
            return Ok(Observation::absent());
        }
        let mut obs: Observation = serde_json::from_str(text)?;
        if !obs.vertical_position.is_finite() {
            return Err(ResponseError::NonFinite(obs.vertical_position));
        }
        obs.confidence = Some(obs.confidence());
        Ok(obs)
    }
}

// ════════════════════════════════════════════════════════════════════════════
// Tests
// ════════════════════════════════════════════════════════════════════════════

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sample_defaults_to_centered_absent() {
        let s = PositionSample::default();
        assert!(!s.hand_present);
        assert_eq!(s.vertical_position, 50.0);
    }

    #[test]
    fn sample_clamps_position() {
        assert_eq!(PositionSample::new(true, -12.0).vertical_position, 0.0);
        assert_eq!(PositionSample::new(true, 140.0).vertical_position, 100.0);
        assert_eq!(PositionSample::new(true, 42.5).vertical_position, 42.5);
    }

    #[test]
    fn sensitivity_clamps_and_steps() {
        assert_eq!(Sensitivity::new(1).get(), 5);
        assert_eq!(Sensitivity::new(99).get(), 30);
        assert_eq!(Sensitivity::default().get(), 15);
        assert_eq!(Sensitivity::new(29).step(3).get(), 30);
        assert_eq!(Sensitivity::new(6).step(-4).get(), 5);
        assert_eq!(Sensitivity::new(15).step(1).get(), 16);
    }

    #[test]
    fn sensitivity_try_new_rejects_out_of_range() {
        assert!(Sensitivity::try_new(4).is_none());
        assert!(Sensitivity::try_new(31).is_none());
        assert_eq!(Sensitivity::try_new(5).map(Sensitivity::get), Some(5));
        assert_eq!(Sensitivity::try_new(30).map(Sensitivity::get), Some(30));
    }

    #[test]
    fn observation_decodes_wire_names() {
        let obs = Observation::from_json(
            r#"{"handDetected": true, "verticalPosition": 72.5, "confidence": 0.8}"#,
        ).unwrap();
        assert!(obs.hand_present);
        assert_eq!(obs.vertical_position, 72.5);
        assert_eq!(obs.confidence(), 0.8);
    }

    #[test]
    fn observation_confidence_is_optional() {
        let obs = Observation::from_json(r#"{"handDetected": false, "verticalPosition": 50}"#).unwrap();
        assert_eq!(obs.confidence(), 0.0);
    }

    #[test]
    fn observation_empty_payload_is_absent() {
        assert_eq!(Observation::from_json("").unwrap(), Observation::absent());
        assert_eq!(Observation::from_json("  \n").unwrap(), Observation::absent());
    }

    #[test]
    fn observation_rejects_missing_fields() {
        assert!(Observation::from_json(r#"{"handDetected": true}"#).is_err());
        assert!(Observation::from_json(r#"{"verticalPosition": 10}"#).is_err());
    }

    #[test]
    fn observation_rejects_wrong_types() {
        assert!(Observation::from_json(r#"{"handDetected": "yes", "verticalPosition": 10}"#).is_err());
        assert!(Observation::from_json(r#"{"handDetected": true, "verticalPosition": "10"}"#).is_err());
        assert!(Observation::from_json("not json").is_err());
    }

    #[test]
    fn observation_rejects_overflowing_position() {
        let err = Observation::from_json(r#"{"handDetected": true, "verticalPosition": 1e300}"#);
        assert!(matches!(err, Err(ResponseError::NonFinite(_))));
    }

    #[test]
    fn observation_keeps_out_of_range_position_for_caller_to_clamp() {
        let obs = Observation::from_json(r#"{"handDetected": true, "verticalPosition": 130}"#).unwrap();
        assert_eq!(obs.vertical_position, 130.0);
        assert_eq!(PositionSample::from(obs).vertical_position, 100.0);
    }

    #[test]
    fn observation_confidence_clamped() {
        let obs = Observation::from_json(
            r#"{"handDetected": true, "verticalPosition": 20, "confidence": 4.0}"#,
        ).unwrap();
        assert_eq!(obs.confidence(), 1.0);
    }
}
