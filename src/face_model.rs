//! 3D face model matched to the landmark face subset.

use crate::{
    constants::{
        DEFAULT_LEFT_EYEBALL, DEFAULT_MODEL_POINTS, DEFAULT_RIGHT_EYEBALL, MODEL_POINTS_TOTAL_VALUES, NUM_FACE_POINTS,
    },
    Error, Result,
};
use nalgebra::Point3;
use std::fs;
use std::path::Path;
use std::sync::{Arc, OnceLock};

static CANONICAL: OnceLock<Arc<FaceModel>> = OnceLock::new();

/// Face model points and eyeball centers in millimeters.
///
/// The nose tip sits at the origin with `+y` up and `+z` out of the face. The
/// side carrying the right-eye landmarks (33 and 468) is `+x`.
#[derive(Debug, Clone, PartialEq)]
pub struct FaceModel {
    points: [Point3<f64>; NUM_FACE_POINTS],
    left_eyeball: Point3<f64>,
    right_eyeball: Point3<f64>,
}

impl FaceModel {
    /// Create a model from explicit points
    #[must_use]
    pub const fn new(
        points: [Point3<f64>; NUM_FACE_POINTS],
        left_eyeball: Point3<f64>,
        right_eyeball: Point3<f64>,
    ) -> Self {
        Self {
            points,
            left_eyeball,
            right_eyeball,
        }
    }

    /// The built-in model, initialized once and shared read-only
    #[must_use]
    pub fn canonical() -> Arc<Self> {
        Arc::clone(CANONICAL.get_or_init(|| {
            let p = |v: [f64; 3]| Point3::new(v[0], v[1], v[2]);
            Arc::new(Self::new(
                DEFAULT_MODEL_POINTS.map(p),
                p(DEFAULT_LEFT_EYEBALL),
                p(DEFAULT_RIGHT_EYEBALL),
            ))
        }))
    }

    /// Load a model from a text file of 24 values, one per line
    ///
    /// The six face points come first (x, y, z each), followed by the left and
    /// right eyeball centers.
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - The model file cannot be read
    /// - The model file does not hold exactly 24 numeric values
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        log::info!("Loading face model from: {}", path.as_ref().display());
        let content = fs::read_to_string(path)?;
        Self::parse(&content)
    }

    /// Parse model values from text, skipping lines that are not numbers
    ///
    /// # Errors
    ///
    /// Returns `Error::ConfigError` if the value count is wrong
    pub fn parse(content: &str) -> Result<Self> {
        let values: Vec<f64> = content
            .lines()
            .filter_map(|line| line.trim().parse::<f64>().ok())
            .collect();

        if values.len() != MODEL_POINTS_TOTAL_VALUES {
            return Err(Error::ConfigError(format!(
                "Expected {} face model values ({} points + 2 eyeballs, × 3), got {}",
                MODEL_POINTS_TOTAL_VALUES,
                NUM_FACE_POINTS,
                values.len()
            )));
        }

        let triples: Vec<Point3<f64>> = values.chunks_exact(3).map(|c| Point3::new(c[0], c[1], c[2])).collect();
        let mut points = [Point3::origin(); NUM_FACE_POINTS];
        points.copy_from_slice(&triples[..NUM_FACE_POINTS]);

        Ok(Self::new(points, triples[NUM_FACE_POINTS], triples[NUM_FACE_POINTS + 1]))
    }

    /// Face points in landmark subset order
    #[must_use]
    pub const fn points(&self) -> &[Point3<f64>; NUM_FACE_POINTS] {
        &self.points
    }

    /// Eyeball center behind pupil landmark 473
    #[must_use]
    pub const fn left_eyeball(&self) -> Point3<f64> {
        self.left_eyeball
    }

    /// Eyeball center behind pupil landmark 468
    #[must_use]
    pub const fn right_eyeball(&self) -> Point3<f64> {
        self.right_eyeball
    }
}

impl Default for FaceModel {
    fn default() -> Self {
        Self::canonical().as_ref().clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_canonical_model() {
        let model = FaceModel::canonical();
        assert_eq!(model.points()[0], Point3::origin());
        assert_eq!(model.points()[1], Point3::new(0.0, -63.6, -12.5));
        assert_eq!(model.right_eyeball(), Point3::new(29.05, 32.7, -39.5));
        assert_eq!(model.left_eyeball(), Point3::new(-29.05, 32.7, -39.5));

        // Same shared instance every time
        assert!(Arc::ptr_eq(&model, &FaceModel::canonical()));
    }

    #[test]
    fn test_parse_model() {
        let values: Vec<String> = (0..MODEL_POINTS_TOTAL_VALUES).map(|i| format!("{i}.0")).collect();
        let model = FaceModel::parse(&values.join("\n")).unwrap();
        assert_eq!(model.points()[0], Point3::new(0.0, 1.0, 2.0));
        assert_eq!(model.points()[5], Point3::new(15.0, 16.0, 17.0));
        assert_eq!(model.left_eyeball(), Point3::new(18.0, 19.0, 20.0));
        assert_eq!(model.right_eyeball(), Point3::new(21.0, 22.0, 23.0));
    }

    #[test]
    fn test_parse_model_invalid() {
        assert!(FaceModel::parse("").is_err());
        assert!(FaceModel::parse("1.0\n2.0\n3.0").is_err());

        // Non-numeric lines are skipped, leaving 23 values
        let mut values: Vec<String> = (0..23).map(|i| format!("{i}.0")).collect();
        values.push("abc".to_string());
        assert!(FaceModel::parse(&values.join("\n")).is_err());

        let too_many: Vec<String> = (0..25).map(|i| format!("{i}.0")).collect();
        assert!(FaceModel::parse(&too_many.join("\n")).is_err());
    }
}
