use super::{normalize, Direction, DirectionStrategy};
use crate::{gaze::GazeEstimator, landmarks::LandmarkSet, Result};

/// Direction from reprojected gaze rays, optionally snapped to `{-1, 0, 1}²`
#[derive(Debug, Clone, Default)]
pub struct ReprojectionStrategy {
    estimator: GazeEstimator,
    quantize_threshold: Option<f64>,
}

impl ReprojectionStrategy {
    /// Continuous output
    #[must_use]
    pub const fn new(estimator: GazeEstimator) -> Self {
        Self {
            estimator,
            quantize_threshold: None,
        }
    }

    /// Output quantized with a dead zone of `threshold`
    ///
    /// # Panics
    ///
    /// Panics if threshold is not in the range (0, 1]
    #[must_use]
    pub fn quantized(estimator: GazeEstimator, threshold: f64) -> Self {
        assert!(threshold > 0.0 && threshold <= 1.0, "Threshold must be in (0, 1]");
        Self {
            estimator,
            quantize_threshold: Some(threshold),
        }
    }

    /// Dead-zone threshold, if quantizing
    #[must_use]
    pub const fn quantize_threshold(&self) -> Option<f64> {
        self.quantize_threshold
    }
}

impl DirectionStrategy for ReprojectionStrategy {
    fn estimate(&self, landmarks: &LandmarkSet, width: i32, height: i32) -> Result<Direction> {
        let eyes = self.estimator.estimate_eyes(landmarks, width, height)?;
        let (left, right) = eyes.normalized_vectors();
        let direction = normalize(left, right);
        Ok(match self.quantize_threshold {
            Some(threshold) => direction.quantize(threshold),
            None => direction,
        })
    }

    fn name(&self) -> &str {
        if self.quantize_threshold.is_some() {
            "quantized"
        } else {
            "reprojection"
        }
    }
}
