//! Pinhole camera model derived from the frame size.

use crate::{
    constants::{CAMERA_CENTER_FACTOR, EPSILON},
    Error, Result,
};
use nalgebra::{Matrix3, Point2, Point3, Vector3};

/// Camera intrinsics with focal length equal to frame width and no distortion
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CameraIntrinsics {
    /// Focal length along x, in pixels
    pub fx: f64,
    /// Focal length along y, in pixels
    pub fy: f64,
    /// Principal point x
    pub cx: f64,
    /// Principal point y
    pub cy: f64,
}

impl CameraIntrinsics {
    /// Build intrinsics for a `width` x `height` frame
    ///
    /// # Errors
    ///
    /// Returns `Error::InvalidFrameDimensions` if either dimension is not positive
    pub fn from_frame(width: i32, height: i32) -> Result<Self> {
        if width <= 0 || height <= 0 {
            return Err(Error::InvalidFrameDimensions { width, height });
        }

        let focal_length = f64::from(width);
        Ok(Self {
            fx: focal_length,
            fy: focal_length,
            cx: f64::from(width) / CAMERA_CENTER_FACTOR,
            cy: f64::from(height) / CAMERA_CENTER_FACTOR,
        })
    }

    /// The 3x3 intrinsic matrix
    #[must_use]
    pub fn matrix(&self) -> Matrix3<f64> {
        Matrix3::new(self.fx, 0.0, self.cx, 0.0, self.fy, self.cy, 0.0, 0.0, 1.0)
    }

    /// Project a camera-frame point to pixels.
    ///
    /// Returns `None` for points on or behind the image plane.
    #[must_use]
    pub fn project(&self, point: &Point3<f64>) -> Option<Point2<f64>> {
        if point.z <= EPSILON || !point.coords.iter().all(|v| v.is_finite()) {
            return None;
        }
        Some(Point2::new(
            self.fx.mul_add(point.x / point.z, self.cx),
            self.fy.mul_add(point.y / point.z, self.cy),
        ))
    }

    /// Normalized ray `K⁻¹ [u, v, 1]` through a pixel
    #[must_use]
    pub fn unproject(&self, pixel: &Point2<f64>) -> Vector3<f64> {
        Vector3::new((pixel.x - self.cx) / self.fx, (pixel.y - self.cy) / self.fy, 1.0)
    }
}
