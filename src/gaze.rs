//! Per-eye gaze ray reconstruction.
//!
//! Each pupil is lifted into face model space, pushed out along the ray from
//! its eyeball center and projected back into the image. A second projection
//! of the pupil at a fixed forward depth captures how much of that motion the
//! head pose alone explains, and is subtracted out.

use crate::{
    affine::{AffineEstimator, AffineOptions, AffineTransform},
    camera::CameraIntrinsics,
    constants::{DEFAULT_EXTRAPOLATION_FACTOR, DEFAULT_HEAD_REFERENCE_DEPTH, LEFT_PUPIL, RIGHT_PUPIL},
    face_model::FaceModel,
    landmarks::LandmarkSet,
    pose_estimation::{HeadPose, PoseEstimator, PoseOptions},
    Result,
};
use nalgebra::{Point2, Point3, Vector2};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Gaze projection settings
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GazeOptions {
    /// How far past the pupil the eyeball ray is extended
    pub extrapolation_factor: f64,
    /// Forward model coordinate used for the head compensation point
    pub head_reference_depth: f64,
}

impl Default for GazeOptions {
    fn default() -> Self {
        Self {
            extrapolation_factor: DEFAULT_EXTRAPOLATION_FACTOR,
            head_reference_depth: DEFAULT_HEAD_REFERENCE_DEPTH,
        }
    }
}

/// Gaze reconstruction for one eye
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EyeGaze {
    /// Pupil position in pixels
    pub pupil: Point2<f64>,
    /// Pupil lifted into model space
    pub pupil_model: Point3<f64>,
    /// Point far along the eyeball-to-pupil ray, in model space
    pub extrapolated: Point3<f64>,
    /// Image projection of the extrapolated point
    pub gaze_projection: Point2<f64>,
    /// Image projection of the head compensation point
    pub head_projection: Point2<f64>,
    /// Compensated gaze point in pixels
    pub gaze_point: Point2<f64>,
}

impl EyeGaze {
    /// Gaze vector in pixels
    #[must_use]
    pub fn vector(&self) -> Vector2<f64> {
        self.gaze_point - self.pupil
    }

    /// Gaze vector divided by the frame width
    #[must_use]
    pub fn normalized_vector(&self, width: i32) -> Vector2<f64> {
        self.vector() / f64::from(width)
    }
}

/// Both eyes for one frame, with the pose they were computed from
#[derive(Debug, Clone, PartialEq)]
pub struct EyeGazePair {
    /// Eye behind pupil landmark 473
    pub left: Option<EyeGaze>,
    /// Eye behind pupil landmark 468
    pub right: Option<EyeGaze>,
    /// Head pose of the frame
    pub pose: HeadPose,
    /// Frame width in pixels
    pub width: i32,
}

impl EyeGazePair {
    /// Width-normalized gaze vectors (left, right)
    #[must_use]
    pub fn normalized_vectors(&self) -> (Option<Vector2<f64>>, Option<Vector2<f64>>) {
        (
            self.left.map(|g| g.normalized_vector(self.width)),
            self.right.map(|g| g.normalized_vector(self.width)),
        )
    }
}

/// Projects one eye's gaze ray back into the image
#[derive(Debug, Clone, Default)]
pub struct GazeProjector {
    options: GazeOptions,
}

impl GazeProjector {
    /// Create a projector
    #[must_use]
    pub const fn new(options: GazeOptions) -> Self {
        Self { options }
    }

    /// Reconstruct the gaze point of one eye.
    ///
    /// Returns `None` when either reprojection lands behind the camera.
    #[must_use]
    pub fn project_eye(
        &self,
        pupil: &Point2<f64>,
        pupil_depth: f64,
        eyeball_center: &Point3<f64>,
        affine: &AffineTransform,
        pose: &HeadPose,
        intrinsics: &CameraIntrinsics,
    ) -> Option<EyeGaze> {
        let pupil_model = affine.lift(pupil, pupil_depth);
        let extrapolated = eyeball_center + (pupil_model - eyeball_center) * self.options.extrapolation_factor;

        let gaze_projection = pose.project(&extrapolated, intrinsics)?;
        let head_reference = Point3::new(pupil_model.x, pupil_model.y, self.options.head_reference_depth);
        let head_projection = pose.project(&head_reference, intrinsics)?;

        let gaze_point = pupil + (gaze_projection - pupil) - (head_projection - pupil);

        Some(EyeGaze {
            pupil: *pupil,
            pupil_model,
            extrapolated,
            gaze_projection,
            head_projection,
            gaze_point,
        })
    }
}

/// Runs camera, pose, affine and gaze projection for a landmark set
#[derive(Debug, Clone)]
pub struct GazeEstimator {
    model: Arc<FaceModel>,
    pose_estimator: PoseEstimator,
    affine_estimator: AffineEstimator,
    projector: GazeProjector,
}

impl Default for GazeEstimator {
    fn default() -> Self {
        Self::new(
            FaceModel::canonical(),
            PoseOptions::default(),
            AffineOptions::default(),
            GazeOptions::default(),
        )
    }
}

impl GazeEstimator {
    /// Create an estimator over a face model
    #[must_use]
    pub fn new(model: Arc<FaceModel>, pose: PoseOptions, affine: AffineOptions, gaze: GazeOptions) -> Self {
        Self {
            model,
            pose_estimator: PoseEstimator::new(pose),
            affine_estimator: AffineEstimator::new(affine),
            projector: GazeProjector::new(gaze),
        }
    }

    /// Face model in use
    #[must_use]
    pub fn model(&self) -> &FaceModel {
        &self.model
    }

    /// Reconstruct both eyes for one frame
    ///
    /// # Errors
    ///
    /// Returns the first failing stage's error:
    /// - `Error::InvalidFrameDimensions` for a non-positive frame size
    /// - `Error::MissingLandmark` when a face or pupil index is absent
    /// - `Error::DegenerateGeometry` when the pose or affine solve fails
    pub fn estimate_eyes(&self, landmarks: &LandmarkSet, width: i32, height: i32) -> Result<EyeGazePair> {
        let intrinsics = CameraIntrinsics::from_frame(width, height)?;

        let face = landmarks.face_points(width, height)?;
        let pose = self.pose_estimator.estimate_pose(&face, &self.model, &intrinsics)?;

        let options = self.affine_estimator.options();
        let face_with_depth = landmarks.face_points_with_depth(width, height, |l| options.depth_of(l, width))?;
        let affine = self.affine_estimator.estimate(&face_with_depth, &self.model)?;

        let eye = |index: usize, eyeball: Point3<f64>| -> Result<Option<EyeGaze>> {
            let landmark = landmarks.get(index)?;
            let pupil = landmark.to_pixel(width, height);
            let depth = options.depth_of(landmark, width);
            Ok(self
                .projector
                .project_eye(&pupil, depth, &eyeball, &affine, &pose, &intrinsics))
        };

        let left = eye(LEFT_PUPIL, self.model.left_eyeball())?;
        let right = eye(RIGHT_PUPIL, self.model.right_eyeball())?;
        if left.is_none() || right.is_none() {
            log::debug!("Gaze reprojection behind camera (left: {}, right: {})", left.is_some(), right.is_some());
        }

        Ok(EyeGazePair {
            left,
            right,
            pose,
            width,
        })
    }
}
