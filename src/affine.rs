//! Image-to-model affine reconstruction.
//!
//! Maps image-side points `(x, y, depth)` to face model coordinates with a 3x4
//! matrix fit by least squares. Badly tracked landmarks are rejected by a
//! consensus search over every 4-point subset before the final fit.

use crate::{
    constants::{DEFAULT_INLIER_THRESHOLD, MIN_AFFINE_POINTS, NUM_FACE_POINTS},
    face_model::FaceModel,
    landmarks::Landmark,
    utils::consensus::{exhaustive_consensus, ConsensusOptions, Estimator},
    Error, Result,
};
use nalgebra::{DMatrix, Matrix3x4, Point2, Point3, Vector4};
use serde::{Deserialize, Serialize};

/// Relative singular value cutoff for rank decisions
const RANK_TOLERANCE: f64 = 1e-9;

/// Minimum design rank: x, y and the constant term
const MIN_DESIGN_RANK: usize = 3;

/// Where the depth channel of the affine fit comes from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DepthSource {
    /// A fixed value for every point
    Placeholder,
    /// The detector's own relative depth, scaled to pixels
    Landmark,
}

/// Affine estimator settings
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AffineOptions {
    /// Model-space residual below which a correspondence is an inlier, in millimeters
    pub inlier_threshold: f64,
    /// Run the consensus search before fitting
    pub reject_outliers: bool,
    /// Depth channel source
    pub depth_source: DepthSource,
    /// Depth used by `DepthSource::Placeholder`
    pub placeholder_depth: f64,
}

impl Default for AffineOptions {
    fn default() -> Self {
        Self {
            inlier_threshold: DEFAULT_INLIER_THRESHOLD,
            reject_outliers: true,
            depth_source: DepthSource::Placeholder,
            placeholder_depth: 0.0,
        }
    }
}

impl AffineOptions {
    /// Depth channel value for a landmark in a frame `width` pixels wide
    #[must_use]
    pub fn depth_of(&self, landmark: &Landmark, width: i32) -> f64 {
        match self.depth_source {
            DepthSource::Placeholder => self.placeholder_depth,
            DepthSource::Landmark => landmark.depth_pixels(width),
        }
    }
}

/// Fitted image-to-model transform
#[derive(Debug, Clone, PartialEq)]
pub struct AffineTransform {
    matrix: Matrix3x4<f64>,
    inliers: Vec<usize>,
    rms: f64,
}

impl AffineTransform {
    /// Wrap an existing matrix with no fit statistics
    #[must_use]
    pub const fn from_matrix(matrix: Matrix3x4<f64>) -> Self {
        Self {
            matrix,
            inliers: Vec::new(),
            rms: 0.0,
        }
    }

    /// The 3x4 matrix acting on `(x, y, depth, 1)`
    #[must_use]
    pub const fn matrix(&self) -> &Matrix3x4<f64> {
        &self.matrix
    }

    /// Correspondences used in the final fit
    #[must_use]
    pub fn inliers(&self) -> &[usize] {
        &self.inliers
    }

    /// RMS model-space residual over the inliers, in millimeters
    #[must_use]
    pub const fn rms(&self) -> f64 {
        self.rms
    }

    /// Map an image-side point to model space
    #[must_use]
    pub fn apply(&self, point: &Point3<f64>) -> Point3<f64> {
        Point3::from(self.matrix * Vector4::new(point.x, point.y, point.z, 1.0))
    }

    /// Lift a pixel with the given depth channel value into model space
    #[must_use]
    pub fn lift(&self, pixel: &Point2<f64>, depth: f64) -> Point3<f64> {
        self.apply(&Point3::new(pixel.x, pixel.y, depth))
    }
}

#[derive(Debug, Clone, Copy)]
struct Correspondence {
    image: Point3<f64>,
    model: Point3<f64>,
}

struct AffineModelEstimator;

impl Estimator for AffineModelEstimator {
    type Datum = Correspondence;
    type Model = Matrix3x4<f64>;
    const MIN_SAMPLES: usize = MIN_AFFINE_POINTS;

    fn fit(data: &[Self::Datum], indices: &[usize]) -> Option<Self::Model> {
        solve_affine(data, indices)
    }

    fn residual(model: &Self::Model, datum: &Self::Datum) -> f64 {
        let p = datum.image;
        let mapped = model * Vector4::new(p.x, p.y, p.z, 1.0);
        (mapped - datum.model.coords).norm()
    }
}

/// Minimum-norm least-squares affine fit over `indices`
fn solve_affine(data: &[Correspondence], indices: &[usize]) -> Option<Matrix3x4<f64>> {
    let design = DMatrix::from_fn(indices.len(), 4, |r, c| {
        let p = data[indices[r]].image;
        [p.x, p.y, p.z, 1.0][c]
    });
    let targets = DMatrix::from_fn(indices.len(), 3, |r, c| data[indices[r]].model[c]);

    let svd = design.svd(true, true);
    let eps = svd.singular_values.max() * RANK_TOLERANCE;
    if svd.rank(eps) < MIN_DESIGN_RANK {
        return None;
    }
    let solution = svd.solve(&targets, eps).ok()?;
    let matrix = Matrix3x4::from_fn(|r, c| solution[(c, r)]);
    matrix.iter().all(|v| v.is_finite()).then_some(matrix)
}

fn rms_of(data: &[Correspondence], indices: &[usize], matrix: &Matrix3x4<f64>) -> f64 {
    if indices.is_empty() {
        return 0.0;
    }
    let ss: f64 = indices
        .iter()
        .map(|&i| AffineModelEstimator::residual(matrix, &data[i]).powi(2))
        .sum();
    #[allow(clippy::cast_precision_loss)]
    let n = indices.len() as f64;
    (ss / n).sqrt()
}

/// Least-squares image-to-model affine estimator
#[derive(Debug, Clone, Default)]
pub struct AffineEstimator {
    options: AffineOptions,
}

impl AffineEstimator {
    /// Create an estimator
    #[must_use]
    pub const fn new(options: AffineOptions) -> Self {
        Self { options }
    }

    /// Estimator settings
    #[must_use]
    pub const fn options(&self) -> &AffineOptions {
        &self.options
    }

    /// Fit the image-to-model transform for the face subset
    ///
    /// # Errors
    ///
    /// Returns `Error::DegenerateGeometry` if the image points are coincident
    /// or collinear, leaving the design matrix with rank below 3
    pub fn estimate(
        &self,
        image_points: &[Point3<f64>; NUM_FACE_POINTS],
        model: &FaceModel,
    ) -> Result<AffineTransform> {
        let data: Vec<Correspondence> = image_points
            .iter()
            .zip(model.points().iter())
            .map(|(&image, &point)| Correspondence { image, model: point })
            .collect();
        let all: Vec<usize> = (0..data.len()).collect();

        let full_fit = solve_affine(&data, &all)
            .ok_or_else(|| Error::DegenerateGeometry("collinear image points in affine fit".to_string()))?;

        if self.options.reject_outliers {
            let opts = ConsensusOptions {
                threshold: self.options.inlier_threshold,
                min_inliers: MIN_AFFINE_POINTS,
            };
            let consensus = exhaustive_consensus::<AffineModelEstimator>(&data, &opts);
            if let Some(matrix) = consensus.model {
                log::debug!(
                    "Affine consensus: inliers {:?} rms {:.3} over {} subsets",
                    consensus.inliers,
                    consensus.inlier_rms,
                    consensus.subsets
                );
                return Ok(AffineTransform {
                    matrix,
                    inliers: consensus.inliers,
                    rms: consensus.inlier_rms,
                });
            }
            log::debug!("Affine consensus below {MIN_AFFINE_POINTS} inliers, using all points");
        }

        let rms = rms_of(&data, &all, &full_fit);
        Ok(AffineTransform {
            matrix: full_fit,
            inliers: all,
            rms,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Image points produced by a known affine map, inverted
    fn synthetic_points(model: &FaceModel) -> [Point3<f64>; NUM_FACE_POINTS] {
        // image = (320 + 1.3 X, 240 - 1.3 Y), model Z recoverable from depth
        (*model.points()).map(|p| Point3::new(320.0 + 1.3 * p.x, 240.0 - 1.3 * p.y, 2.0 * p.z))
    }

    #[test]
    fn test_round_trip_exact() {
        let model = FaceModel::canonical();
        let image = synthetic_points(&model);

        let transform = AffineEstimator::default().estimate(&image, &model).unwrap();
        for (img, expected) in image.iter().zip(model.points().iter()) {
            let mapped = transform.apply(img);
            assert!((mapped - expected).norm() < 1e-6, "{mapped:?} vs {expected:?}");
        }
        assert_eq!(transform.inliers().len(), NUM_FACE_POINTS);
        assert!(transform.rms() < 1e-6);
    }

    #[test]
    fn test_constant_depth_is_not_degenerate() {
        let model = FaceModel::canonical();
        let image = synthetic_points(&model).map(|p| Point3::new(p.x, p.y, 0.0));

        let transform = AffineEstimator::default().estimate(&image, &model).unwrap();
        let nose = transform.lift(&Point2::new(image[0].x, image[0].y), 0.0);
        // x and y are still an exact affine function of the pixels
        assert!(nose.x.abs() < 3.0);
        assert!(nose.y.abs() < 3.0);
        assert!(transform.matrix().iter().all(|v| v.is_finite()));
    }

    #[test]
    fn test_rejects_corrupted_correspondence() {
        let model = FaceModel::canonical();
        let mut image = synthetic_points(&model);
        image[4].x += 40.0;
        image[4].y -= 25.0;

        let transform = AffineEstimator::default().estimate(&image, &model).unwrap();
        assert!(!transform.inliers().contains(&4), "inliers {:?}", transform.inliers());
        assert_eq!(transform.inliers().len(), 5);
        let chin = transform.apply(&image[1]);
        assert!((chin - model.points()[1]).norm() < 1e-6);
    }

    #[test]
    fn test_without_outlier_rejection_uses_all_points() {
        let model = FaceModel::canonical();
        let mut image = synthetic_points(&model);
        image[4].x += 40.0;

        let estimator = AffineEstimator::new(AffineOptions {
            reject_outliers: false,
            ..AffineOptions::default()
        });
        let transform = estimator.estimate(&image, &model).unwrap();
        assert_eq!(transform.inliers(), &[0, 1, 2, 3, 4, 5]);
        assert!(transform.rms() > 1.0);
    }

    #[test]
    fn test_collinear_points_degenerate() {
        let model = FaceModel::canonical();
        let image: [Point3<f64>; NUM_FACE_POINTS] =
            std::array::from_fn(|i| Point3::new(100.0 + 10.0 * i as f64, 50.0 + 5.0 * i as f64, 0.0));
        assert!(matches!(
            AffineEstimator::default().estimate(&image, &model),
            Err(Error::DegenerateGeometry(_))
        ));
    }

    #[test]
    fn test_depth_source() {
        let landmark = Landmark::new(0.5, 0.5, -0.05);
        let placeholder = AffineOptions {
            placeholder_depth: 7.0,
            ..AffineOptions::default()
        };
        assert_eq!(placeholder.depth_of(&landmark, 640), 7.0);

        let detector = AffineOptions {
            depth_source: DepthSource::Landmark,
            ..AffineOptions::default()
        };
        assert!((detector.depth_of(&landmark, 640) + 32.0).abs() < 1e-9);
    }
}
