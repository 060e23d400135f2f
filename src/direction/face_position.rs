use super::{Direction, DirectionStrategy};
use crate::{constants::NOSE_TIP, landmarks::LandmarkSet, Error, Result};

/// Direction toward where the face sits in the frame, tracked by the nose tip
#[derive(Debug, Clone, Copy, Default)]
pub struct FacePositionStrategy;

impl DirectionStrategy for FacePositionStrategy {
    fn estimate(&self, landmarks: &LandmarkSet, width: i32, height: i32) -> Result<Direction> {
        if width <= 0 || height <= 0 {
            return Err(Error::InvalidFrameDimensions { width, height });
        }
        let nose = landmarks.get(NOSE_TIP)?;
        Ok(Direction::toward_frame_position(nose.x, nose.y))
    }

    fn name(&self) -> &str {
        "face"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::landmarks::Landmark;

    #[test]
    fn test_face_on_the_left_of_frame() {
        let mut points = vec![Landmark::new(0.0, 0.0, 0.0); 5];
        points[NOSE_TIP] = Landmark::new(0.25, 0.5, 0.0);
        let d = FacePositionStrategy.estimate(&LandmarkSet::new(points), 640, 480).unwrap();
        assert!((d.x - 0.5).abs() < 1e-12);
        assert!(d.y.abs() < 1e-12);
    }

    #[test]
    fn test_no_nose() {
        let set = LandmarkSet::new(vec![Landmark::new(0.5, 0.5, 0.0); 3]);
        assert!(matches!(
            FacePositionStrategy.estimate(&set, 640, 480),
            Err(Error::MissingLandmark(NOSE_TIP))
        ));
    }
}
