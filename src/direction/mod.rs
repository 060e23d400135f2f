//! Look-direction estimation for the rendered pupils.
//!
//! A direction is a 2D vector roughly in `[-1, 1]²` in display orientation:
//! positive `x` moves the pupils right, positive `y` moves them down. The
//! camera sees the observer mirrored, so image-space gaze is negated on `x`.

/// Head-pose compensated gaze reprojection
pub mod reprojection;

/// Iris centroid averaging with blink gating
pub mod iris;

/// Following the face position in the frame
pub mod face_position;

use crate::{
    constants::{DEFAULT_BLINK_THRESHOLD, DEFAULT_QUANTIZE_THRESHOLD},
    gaze::GazeEstimator,
    landmarks::LandmarkSet,
    Error, Result,
};
use nalgebra::Vector2;
use serde::{Deserialize, Serialize};

/// Pupil look direction
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Direction {
    /// Horizontal component, positive to the right
    pub x: f64,
    /// Vertical component, positive downward
    pub y: f64,
}

impl Direction {
    /// Looking straight ahead
    pub const CENTER: Self = Self { x: 0.0, y: 0.0 };

    /// Create a direction
    #[must_use]
    pub const fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    /// Snap each component to `{-1, 0, 1}` with a dead zone of `threshold`
    #[must_use]
    pub fn quantize(self, threshold: f64) -> Self {
        let snap = |c: f64| {
            if c.abs() < threshold {
                0.0
            } else {
                c.signum()
            }
        };
        Self::new(snap(self.x), snap(self.y))
    }

    /// Whether both components are zero
    #[must_use]
    pub fn is_center(&self) -> bool {
        self.x == 0.0 && self.y == 0.0
    }

    /// Direction toward a normalized frame position, mirrored horizontally
    #[must_use]
    pub fn toward_frame_position(x: f64, y: f64) -> Self {
        Self::new(-(x - 0.5) * 2.0, (y - 0.5) * 2.0)
    }
}

impl From<Vector2<f64>> for Direction {
    fn from(v: Vector2<f64>) -> Self {
        Self::new(v.x, v.y)
    }
}

/// Combine per-eye gaze vectors into one direction.
///
/// Both eyes must be present; otherwise the pupils look straight ahead. The
/// average is mirrored on `x` so the rendered eyes look back at the observer.
#[must_use]
pub fn normalize(left: Option<Vector2<f64>>, right: Option<Vector2<f64>>) -> Direction {
    match (left, right) {
        (Some(l), Some(r)) => Direction::new(-(l.x + r.x) / 2.0, (l.y + r.y) / 2.0),
        _ => Direction::CENTER,
    }
}

/// Trait for all direction strategies
pub trait DirectionStrategy: Send + Sync {
    /// Estimate the look direction for one frame
    ///
    /// # Errors
    ///
    /// Returns a frame-level error when the landmarks cannot be interpreted
    fn estimate(&self, landmarks: &LandmarkSet, width: i32, height: i32) -> Result<Direction>;

    /// Get strategy name
    fn name(&self) -> &str;
}

/// Thresholds a strategy spec falls back to when it carries no parameter
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StrategyThresholds {
    /// Dead-zone threshold for the quantized strategy
    pub quantize: f64,
    /// Normalized eyelid gap below which the iris strategy sees a closed eye
    pub blink: f64,
}

impl Default for StrategyThresholds {
    fn default() -> Self {
        Self {
            quantize: DEFAULT_QUANTIZE_THRESHOLD,
            blink: DEFAULT_BLINK_THRESHOLD,
        }
    }
}

fn parse_param(spec: &str, value: Option<&str>, default: f64) -> Result<f64> {
    let Some(raw) = value else {
        return Ok(default);
    };
    raw.trim()
        .parse()
        .map_err(|_| Error::ConfigError(format!("Invalid parameter '{raw}' in strategy '{spec}'")))
}

fn no_params(spec: &str, param: Option<&str>) -> Result<()> {
    match param {
        Some(_) => Err(Error::ConfigError(format!("Strategy '{spec}' takes no parameters"))),
        None => Ok(()),
    }
}

/// Create a direction strategy from a spec like `quantized:0.1`.
///
/// Known names are `reprojection`, `quantized[:threshold]`,
/// `iris[:blink_threshold]` and `face`. Reprojection strategies run on the
/// default estimator.
///
/// # Errors
///
/// Returns `Error::ConfigError` for an unknown name or an invalid parameter
pub fn create_strategy(spec: &str) -> Result<Box<dyn DirectionStrategy>> {
    create_strategy_with(spec, GazeEstimator::default(), StrategyThresholds::default())
}

/// Create a direction strategy from a spec, running reprojection on `estimator`.
///
/// A parameter in the spec overrides the matching entry of `thresholds`.
///
/// # Errors
///
/// Returns `Error::ConfigError` for an unknown name or a threshold out of range
pub fn create_strategy_with(
    spec: &str,
    estimator: GazeEstimator,
    thresholds: StrategyThresholds,
) -> Result<Box<dyn DirectionStrategy>> {
    let mut parts = spec.splitn(2, ':');
    let name = parts.next().unwrap_or_default().trim().to_lowercase();
    let param = parts.next();

    match name.as_str() {
        "reprojection" | "continuous" => {
            no_params(spec, param)?;
            Ok(Box::new(reprojection::ReprojectionStrategy::new(estimator)))
        }
        "quantized" | "quantised" => {
            let threshold = parse_param(spec, param, thresholds.quantize)?;
            if !(threshold > 0.0 && threshold <= 1.0) {
                return Err(Error::ConfigError(format!(
                    "Quantize threshold must be in (0, 1] in strategy '{spec}', got {threshold}"
                )));
            }
            Ok(Box::new(reprojection::ReprojectionStrategy::quantized(estimator, threshold)))
        }
        "iris" => {
            let threshold = parse_param(spec, param, thresholds.blink)?;
            if !(threshold > 0.0) || !threshold.is_finite() {
                return Err(Error::ConfigError(format!(
                    "Blink threshold must be positive in strategy '{spec}', got {threshold}"
                )));
            }
            Ok(Box::new(iris::IrisStrategy::new(threshold)))
        }
        "face" | "face_position" => {
            no_params(spec, param)?;
            Ok(Box::new(face_position::FacePositionStrategy))
        }
        _ => Err(Error::ConfigError(format!("Unknown direction strategy: {spec}"))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_mirrors_and_averages() {
        let d = normalize(Some(Vector2::new(0.2, 0.1)), Some(Vector2::new(0.4, 0.3)));
        assert!((d.x + 0.3).abs() < 1e-12);
        assert!((d.y - 0.2).abs() < 1e-12);
    }

    #[test]
    fn test_normalize_missing_eye_is_center() {
        assert_eq!(normalize(None, Some(Vector2::new(0.5, 0.5))), Direction::CENTER);
        assert_eq!(normalize(Some(Vector2::new(0.5, 0.5)), None), Direction::CENTER);
        assert_eq!(normalize(None, None), Direction::CENTER);
    }

    #[test]
    fn test_quantize_dead_zone() {
        let d = Direction::new(0.05, -0.3).quantize(0.1);
        assert_eq!(d, Direction::new(0.0, -1.0));

        // Exactly at the threshold snaps outward
        assert_eq!(Direction::new(0.1, -0.1).quantize(0.1), Direction::new(1.0, -1.0));
        assert_eq!(Direction::new(-0.099, 2.5).quantize(0.1), Direction::new(0.0, 1.0));
    }

    #[test]
    fn test_quantize_idempotent() {
        for &(x, y) in &[(0.0, 0.0), (0.3, -0.7), (-0.05, 0.09), (1.5, -2.0)] {
            let once = Direction::new(x, y).quantize(0.1);
            assert_eq!(once.quantize(0.1), once);
        }
    }

    #[test]
    fn test_toward_frame_position() {
        assert_eq!(Direction::toward_frame_position(0.5, 0.5), Direction::CENTER);
        let d = Direction::toward_frame_position(0.75, 0.25);
        assert!((d.x + 0.5).abs() < 1e-12);
        assert!((d.y + 0.5).abs() < 1e-12);
    }

    #[test]
    fn test_create_strategy() {
        assert_eq!(create_strategy("reprojection").unwrap().name(), "reprojection");
        assert_eq!(create_strategy("quantized").unwrap().name(), "quantized");
        assert_eq!(create_strategy("quantized:0.2").unwrap().name(), "quantized");
        assert_eq!(create_strategy("IRIS").unwrap().name(), "iris");
        assert_eq!(create_strategy("iris:0.02").unwrap().name(), "iris");
        assert_eq!(create_strategy("face").unwrap().name(), "face");
    }

    #[test]
    fn test_create_strategy_errors() {
        for spec in [
            "unknown",
            "quantized:abc",
            "quantized:-0.1",
            "quantized:0",
            "quantized:1.5",
            "iris:nan",
            "iris:-1",
            "face:1",
            "reprojection:0.1",
        ] {
            match create_strategy(spec) {
                Err(Error::ConfigError(_)) => {}
                Err(e) => panic!("Expected ConfigError for {spec}, got {e:?}"),
                Ok(s) => panic!("Expected error for {spec}, got strategy {}", s.name()),
            }
        }
    }

    #[test]
    fn test_spec_parameter_overrides_thresholds() {
        let thresholds = StrategyThresholds {
            quantize: 0.9,
            blink: 0.5,
        };
        let strategy = create_strategy_with("quantized", GazeEstimator::default(), thresholds).unwrap();
        assert_eq!(strategy.name(), "quantized");

        let bad = StrategyThresholds {
            quantize: 0.0,
            ..thresholds
        };
        assert!(create_strategy_with("quantized", GazeEstimator::default(), bad).is_err());
        // An explicit parameter replaces the out-of-range fallback
        assert!(create_strategy_with("quantized:0.2", GazeEstimator::default(), bad).is_ok());
    }
}
