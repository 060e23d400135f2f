use super::{Direction, DirectionStrategy};
use crate::{
    constants::{DEFAULT_BLINK_THRESHOLD, LEFT_EYELID, LEFT_IRIS_RING, RIGHT_EYELID, RIGHT_IRIS_RING},
    landmarks::LandmarkSet,
    Error, Result,
};
use nalgebra::Vector2;

/// Direction from the average of both iris centers in the frame.
///
/// When either eye is closed the pupils look straight ahead.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct IrisStrategy {
    blink_threshold: f64,
}

impl Default for IrisStrategy {
    fn default() -> Self {
        Self::new(DEFAULT_BLINK_THRESHOLD)
    }
}

impl IrisStrategy {
    /// Create with the normalized eyelid gap below which an eye counts as closed
    #[must_use]
    pub const fn new(blink_threshold: f64) -> Self {
        Self { blink_threshold }
    }

    fn iris_center(landmarks: &LandmarkSet, ring: &[usize]) -> Result<Vector2<f64>> {
        let mut sum = Vector2::zeros();
        for &index in ring {
            let l = landmarks.get(index)?;
            sum += Vector2::new(l.x, l.y);
        }
        #[allow(clippy::cast_precision_loss)]
        let n = ring.len() as f64;
        Ok(sum / n)
    }

    fn eyelid_gap(landmarks: &LandmarkSet, (upper, lower): (usize, usize)) -> Result<f64> {
        Ok((landmarks.get(upper)?.y - landmarks.get(lower)?.y).abs())
    }

    /// Whether either eye is closed
    ///
    /// # Errors
    ///
    /// Returns `Error::MissingLandmark` if an eyelid landmark is absent
    pub fn is_blinking(&self, landmarks: &LandmarkSet) -> Result<bool> {
        let left = Self::eyelid_gap(landmarks, LEFT_EYELID)?;
        let right = Self::eyelid_gap(landmarks, RIGHT_EYELID)?;
        Ok(left < self.blink_threshold || right < self.blink_threshold)
    }
}

impl DirectionStrategy for IrisStrategy {
    fn estimate(&self, landmarks: &LandmarkSet, width: i32, height: i32) -> Result<Direction> {
        if width <= 0 || height <= 0 {
            return Err(Error::InvalidFrameDimensions { width, height });
        }
        if self.is_blinking(landmarks)? {
            log::debug!("Eyes closed, looking ahead");
            return Ok(Direction::CENTER);
        }

        let left = Self::iris_center(landmarks, &LEFT_IRIS_RING)?;
        let right = Self::iris_center(landmarks, &RIGHT_IRIS_RING)?;
        let gaze = (left + right) / 2.0;
        Ok(Direction::toward_frame_position(gaze.x, gaze.y))
    }

    fn name(&self) -> &str {
        "iris"
    }
}
