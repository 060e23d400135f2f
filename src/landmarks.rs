//! Normalized facial landmark sets as produced by a face-mesh detector.
//!
//! Coordinates are normalized: `x` and `y` lie in `[0, 1]` relative to frame
//! width and height, and `z` is a relative depth scaled like `x`. A set is only
//! meaningful for the frame it came from.

use crate::{
    constants::{CHIN, LEFT_EYE_OUTER, LEFT_MOUTH, NOSE_TIP, NUM_FACE_POINTS, RIGHT_EYE_OUTER, RIGHT_MOUTH},
    Error, Result,
};
use nalgebra::{Point2, Point3};

/// Landmark indices of the face subset, matched 1:1 to the face model points
pub const FACE_SUBSET: [usize; NUM_FACE_POINTS] =
    [NOSE_TIP, CHIN, LEFT_EYE_OUTER, RIGHT_EYE_OUTER, LEFT_MOUTH, RIGHT_MOUTH];

/// A single normalized landmark
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Landmark {
    /// Horizontal position as a fraction of frame width
    pub x: f64,
    /// Vertical position as a fraction of frame height
    pub y: f64,
    /// Relative depth, scaled like `x`
    pub z: f64,
}

impl Landmark {
    /// Create a landmark from normalized coordinates
    #[must_use]
    pub const fn new(x: f64, y: f64, z: f64) -> Self {
        Self { x, y, z }
    }

    /// Pixel position in a `width` x `height` frame
    #[must_use]
    pub fn to_pixel(&self, width: i32, height: i32) -> Point2<f64> {
        Point2::new(self.x * f64::from(width), self.y * f64::from(height))
    }

    /// Detector depth converted to pixel units
    #[must_use]
    pub fn depth_pixels(&self, width: i32) -> f64 {
        self.z * f64::from(width)
    }
}

/// Ordered landmark set for one frame
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LandmarkSet {
    points: Vec<Landmark>,
}

impl LandmarkSet {
    /// Wrap detector output
    #[must_use]
    pub const fn new(points: Vec<Landmark>) -> Self {
        Self { points }
    }

    /// Number of landmarks in the set
    #[must_use]
    pub fn len(&self) -> usize {
        self.points.len()
    }

    /// Whether the set holds no landmarks
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    /// All landmarks in index order
    #[must_use]
    pub fn points(&self) -> &[Landmark] {
        &self.points
    }

    /// Look up a landmark by index
    ///
    /// # Errors
    ///
    /// Returns `Error::MissingLandmark` if the index is out of range
    pub fn get(&self, index: usize) -> Result<&Landmark> {
        self.points.get(index).ok_or(Error::MissingLandmark(index))
    }

    /// Pixel position of a landmark
    ///
    /// # Errors
    ///
    /// Returns `Error::MissingLandmark` if the index is out of range
    pub fn pixel(&self, index: usize, width: i32, height: i32) -> Result<Point2<f64>> {
        Ok(self.get(index)?.to_pixel(width, height))
    }

    /// Face subset in pixel coordinates, for the pose solve
    ///
    /// # Errors
    ///
    /// Returns `Error::MissingLandmark` for the first subset index not present
    pub fn face_points(&self, width: i32, height: i32) -> Result<[Point2<f64>; NUM_FACE_POINTS]> {
        let mut out = [Point2::origin(); NUM_FACE_POINTS];
        for (slot, &index) in out.iter_mut().zip(FACE_SUBSET.iter()) {
            *slot = self.pixel(index, width, height)?;
        }
        Ok(out)
    }

    /// Face subset in pixel coordinates with a depth channel, for the affine fit
    ///
    /// # Errors
    ///
    /// Returns `Error::MissingLandmark` for the first subset index not present
    pub fn face_points_with_depth<F>(&self, width: i32, height: i32, depth: F) -> Result<[Point3<f64>; NUM_FACE_POINTS]>
    where
        F: Fn(&Landmark) -> f64,
    {
        let mut out = [Point3::origin(); NUM_FACE_POINTS];
        for (slot, &index) in out.iter_mut().zip(FACE_SUBSET.iter()) {
            let landmark = self.get(index)?;
            let pixel = landmark.to_pixel(width, height);
            *slot = Point3::new(pixel.x, pixel.y, depth(landmark));
        }
        Ok(out)
    }
}

impl From<Vec<Landmark>> for LandmarkSet {
    fn from(points: Vec<Landmark>) -> Self {
        Self::new(points)
    }
}

impl FromIterator<Landmark> for LandmarkSet {
    fn from_iter<I: IntoIterator<Item = Landmark>>(iter: I) -> Self {
        Self::new(iter.into_iter().collect())
    }
}
