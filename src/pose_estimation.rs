use crate::{
    camera::CameraIntrinsics,
    constants::{DEFAULT_MAX_ITERATIONS, DEFAULT_MAX_REPROJECTION_ERROR, EPSILON, NUM_FACE_POINTS},
    face_model::FaceModel,
    Error, Result,
};
use nalgebra::{DMatrix, Matrix2, Matrix3, Matrix4, Point2, Point3, Rotation3, SMatrix, SVector, UnitQuaternion, Vector3, Vector6};
use serde::{Deserialize, Serialize};
use std::f64::consts::PI;

const NUM_RESIDUALS: usize = 2 * NUM_FACE_POINTS;

/// Smallest-to-largest spread ratio below which image points count as collinear
const COLLINEARITY_TOLERANCE: f64 = 1e-3;

/// Model-space distance between the two outer eye corners, in millimeters
const EYE_CORNER_SPAN: f64 = 86.6;

const INITIAL_DAMPING: f64 = 1e-3;
const MAX_DAMPING: f64 = 1e12;
const STEP_TOLERANCE: f64 = 1e-12;
const COST_TOLERANCE: f64 = 1e-20;

type Residuals = SVector<f64, NUM_RESIDUALS>;
type Jacobian = SMatrix<f64, NUM_RESIDUALS, 6>;

/// Pose solver settings
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PoseOptions {
    /// Levenberg-Marquardt iteration cap
    pub max_iterations: usize,
    /// Largest RMS reprojection error accepted, in pixels
    pub max_reprojection_error: f64,
}

impl Default for PoseOptions {
    fn default() -> Self {
        Self {
            max_iterations: DEFAULT_MAX_ITERATIONS,
            max_reprojection_error: DEFAULT_MAX_REPROJECTION_ERROR,
        }
    }
}

/// Head orientation in degrees relative to a face looking straight into the camera
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Orientation {
    /// Rotation about the camera x axis
    pub pitch: f64,
    /// Rotation about the camera y axis
    pub yaw: f64,
    /// Rotation about the camera z axis
    pub roll: f64,
}

/// Rigid transform from face model coordinates to camera coordinates
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct HeadPose {
    rotation_vector: Vector3<f64>,
    translation: Vector3<f64>,
    rotation: Rotation3<f64>,
    reprojection_error: f64,
}

impl HeadPose {
    /// Build a pose from a Rodrigues rotation vector and a translation
    #[must_use]
    pub fn new(rotation_vector: Vector3<f64>, translation: Vector3<f64>) -> Self {
        Self {
            rotation_vector,
            translation,
            rotation: Rotation3::new(rotation_vector),
            reprojection_error: 0.0,
        }
    }

    /// The pose of a face looking straight into the camera at `translation`.
    ///
    /// The model is y-up and z-out while the camera is y-down and z-forward,
    /// so facing the camera is a half turn about x.
    #[must_use]
    pub fn frontal(translation: Vector3<f64>) -> Self {
        Self::new(Vector3::new(PI, 0.0, 0.0), translation)
    }

    /// Rodrigues rotation vector
    #[must_use]
    pub const fn rotation_vector(&self) -> Vector3<f64> {
        self.rotation_vector
    }

    /// Translation vector
    #[must_use]
    pub const fn translation(&self) -> Vector3<f64> {
        self.translation
    }

    /// Rotation matrix
    #[must_use]
    pub fn rotation_matrix(&self) -> Matrix3<f64> {
        *self.rotation.matrix()
    }

    /// RMS reprojection residual of the solve, in pixels
    #[must_use]
    pub const fn reprojection_error(&self) -> f64 {
        self.reprojection_error
    }

    /// Map a model point into camera coordinates
    #[must_use]
    pub fn transform(&self, point: &Point3<f64>) -> Point3<f64> {
        self.rotation * point + self.translation
    }

    /// Project a model point into the image, `None` when it lands behind the camera
    #[must_use]
    pub fn project(&self, point: &Point3<f64>, intrinsics: &CameraIntrinsics) -> Option<Point2<f64>> {
        intrinsics.project(&self.transform(point))
    }

    /// Orientation relative to the frontal pose
    #[must_use]
    pub fn orientation(&self) -> Orientation {
        let frontal = Matrix3::from_diagonal(&Vector3::new(1.0, -1.0, -1.0));
        let angles = PoseEstimator::rotation_matrix_to_euler(&(self.rotation_matrix() * frontal));
        Orientation {
            pitch: angles[0],
            yaw: angles[1],
            roll: angles[2],
        }
    }

    fn to_params(self) -> Vector6<f64> {
        Vector6::new(
            self.rotation_vector.x,
            self.rotation_vector.y,
            self.rotation_vector.z,
            self.translation.x,
            self.translation.y,
            self.translation.z,
        )
    }

    fn from_params(params: &Vector6<f64>) -> Self {
        Self::new(params.fixed_rows::<3>(0).into_owned(), params.fixed_rows::<3>(3).into_owned())
    }
}

/// Head pose estimator using an iterative `PnP` solve
#[derive(Debug, Clone, Default)]
pub struct PoseEstimator {
    options: PoseOptions,
}

impl PoseEstimator {
    /// Create a new pose estimator
    #[must_use]
    pub fn new(options: PoseOptions) -> Self {
        log::info!(
            "Initializing PoseEstimator (max {} iterations, max reprojection error {:.1}px)",
            options.max_iterations,
            options.max_reprojection_error
        );
        Self { options }
    }

    /// Solver settings
    #[must_use]
    pub const fn options(&self) -> &PoseOptions {
        &self.options
    }

    /// Estimate head pose from the six face subset pixels
    ///
    /// Two seeds are refined by Levenberg-Marquardt: a linear DLT solve and the
    /// frontal pose placed from the nose tip and eye-corner span. The refined
    /// pose with the lower reprojection cost wins.
    ///
    /// # Errors
    ///
    /// Returns `Error::DegenerateGeometry` if:
    /// - The image points are non-finite, coincident or collinear
    /// - Neither seed converges to a pose in front of the camera
    /// - The RMS reprojection error exceeds the configured maximum
    pub fn estimate_pose(
        &self,
        image_points: &[Point2<f64>; NUM_FACE_POINTS],
        model: &FaceModel,
        intrinsics: &CameraIntrinsics,
    ) -> Result<HeadPose> {
        check_image_geometry(image_points)?;
        let model_points = model.points();

        let seeds = [
            dlt_seed(model_points, image_points, intrinsics),
            frontal_seed(image_points, intrinsics),
        ];

        let best = seeds
            .into_iter()
            .flatten()
            .filter_map(|seed| self.refine(seed.to_params(), model_points, image_points, intrinsics))
            .min_by(|a, b| a.1.total_cmp(&b.1))
            .ok_or_else(|| Error::DegenerateGeometry("pose solve did not converge".to_string()))?;

        let (params, cost) = best;
        #[allow(clippy::cast_precision_loss)]
        let rms = (cost / NUM_FACE_POINTS as f64).sqrt();

        if !params.iter().all(|v| v.is_finite()) || !rms.is_finite() {
            return Err(Error::DegenerateGeometry("pose solve produced non-finite values".to_string()));
        }

        let mut pose = HeadPose::from_params(&params);
        pose.reprojection_error = rms;

        if model_points.iter().any(|p| pose.transform(p).z <= EPSILON) {
            return Err(Error::DegenerateGeometry("face model lands behind the camera".to_string()));
        }
        if rms > self.options.max_reprojection_error {
            return Err(Error::DegenerateGeometry(format!(
                "reprojection error {:.2}px exceeds {:.2}px",
                rms, self.options.max_reprojection_error
            )));
        }

        log::debug!(
            "Pose: rvec={:?} tvec={:?} rms={:.4}px",
            pose.rotation_vector.as_slice(),
            pose.translation.as_slice(),
            rms
        );
        Ok(pose)
    }

    /// Convert rotation matrix to Euler angles in degrees (pitch, yaw, roll)
    #[must_use]
    pub fn rotation_matrix_to_euler(rotation_matrix: &Matrix3<f64>) -> Vector3<f64> {
        let r13 = rotation_matrix[(0, 2)];
        let r21 = rotation_matrix[(1, 0)];
        let r22 = rotation_matrix[(1, 1)];
        let r23 = rotation_matrix[(1, 2)];
        let r33 = rotation_matrix[(2, 2)];

        // Clamp guards asin against rounding just past ±1
        let pitch = (-r23).clamp(-1.0, 1.0).asin();
        let yaw = r13.atan2(r33);
        let roll = r21.atan2(r22);

        Vector3::new(pitch.to_degrees(), yaw.to_degrees(), roll.to_degrees())
    }

    fn refine(
        &self,
        seed: Vector6<f64>,
        model_points: &[Point3<f64>; NUM_FACE_POINTS],
        image_points: &[Point2<f64>; NUM_FACE_POINTS],
        intrinsics: &CameraIntrinsics,
    ) -> Option<(Vector6<f64>, f64)> {
        let mut params = seed;
        let mut residual = residuals(&params, model_points, image_points, intrinsics)?;
        let mut cost = residual.norm_squared();
        let mut damping = INITIAL_DAMPING;

        for _ in 0..self.options.max_iterations {
            if cost < COST_TOLERANCE {
                break;
            }
            let jac = jacobian(&params, model_points, image_points, intrinsics)?;
            let jtj = jac.transpose() * jac;
            let gradient = jac.transpose() * residual;

            let mut accepted = None;
            while damping < MAX_DAMPING {
                let mut damped = jtj;
                for i in 0..6 {
                    damped[(i, i)] += damping * jtj[(i, i)].max(EPSILON);
                }
                let Some(step) = damped.lu().solve(&-gradient) else {
                    damping *= 10.0;
                    continue;
                };
                let candidate = params + step;
                match residuals(&candidate, model_points, image_points, intrinsics) {
                    Some(r) if r.norm_squared() < cost => {
                        accepted = Some((candidate, r, step));
                        damping = (damping / 10.0).max(EPSILON);
                        break;
                    }
                    _ => damping *= 10.0,
                }
            }

            let Some((candidate, r, step)) = accepted else {
                break;
            };
            let converged = step.norm() < STEP_TOLERANCE * (params.norm() + STEP_TOLERANCE);
            params = candidate;
            cost = r.norm_squared();
            residual = r;
            if converged {
                break;
            }
        }

        Some((params, cost))
    }
}

/// Reject image points that cannot constrain a pose
fn check_image_geometry(points: &[Point2<f64>; NUM_FACE_POINTS]) -> Result<()> {
    if !points.iter().all(|p| p.x.is_finite() && p.y.is_finite()) {
        return Err(Error::DegenerateGeometry("non-finite image point".to_string()));
    }

    #[allow(clippy::cast_precision_loss)]
    let centroid = points.iter().map(|p| p.coords).sum::<nalgebra::Vector2<f64>>() / NUM_FACE_POINTS as f64;
    let scatter = points.iter().fold(Matrix2::zeros(), |acc, p| {
        let d = p.coords - centroid;
        acc + d * d.transpose()
    });
    let eigenvalues = scatter.symmetric_eigen().eigenvalues;
    let largest = eigenvalues.max();
    let smallest = eigenvalues.min().max(0.0);

    if largest <= EPSILON {
        return Err(Error::DegenerateGeometry("coincident image points".to_string()));
    }
    if smallest.sqrt() < COLLINEARITY_TOLERANCE * largest.sqrt() {
        return Err(Error::DegenerateGeometry("collinear image points".to_string()));
    }
    Ok(())
}

fn residuals(
    params: &Vector6<f64>,
    model_points: &[Point3<f64>; NUM_FACE_POINTS],
    image_points: &[Point2<f64>; NUM_FACE_POINTS],
    intrinsics: &CameraIntrinsics,
) -> Option<Residuals> {
    let pose = HeadPose::from_params(params);
    let mut out = Residuals::zeros();
    for (i, (model, observed)) in model_points.iter().zip(image_points.iter()).enumerate() {
        let projected = pose.project(model, intrinsics)?;
        out[2 * i] = projected.x - observed.x;
        out[2 * i + 1] = projected.y - observed.y;
    }
    Some(out)
}

/// Central-difference Jacobian of the reprojection residuals
fn jacobian(
    params: &Vector6<f64>,
    model_points: &[Point3<f64>; NUM_FACE_POINTS],
    image_points: &[Point2<f64>; NUM_FACE_POINTS],
    intrinsics: &CameraIntrinsics,
) -> Option<Jacobian> {
    let mut jac = Jacobian::zeros();
    for j in 0..6 {
        let h = 1e-6 * (1.0 + params[j].abs());
        let mut forward = *params;
        let mut backward = *params;
        forward[j] += h;
        backward[j] -= h;
        let rf = residuals(&forward, model_points, image_points, intrinsics)?;
        let rb = residuals(&backward, model_points, image_points, intrinsics)?;
        jac.set_column(j, &((rf - rb) / (2.0 * h)));
    }
    Some(jac)
}

/// Frontal pose scaled by the eye-corner span and centered on the nose tip
fn frontal_seed(image_points: &[Point2<f64>; NUM_FACE_POINTS], intrinsics: &CameraIntrinsics) -> Option<HeadPose> {
    let span = (image_points[2].x - image_points[3].x).abs();
    if span <= EPSILON {
        return None;
    }
    let depth = intrinsics.fx * EYE_CORNER_SPAN / span;
    let ray = intrinsics.unproject(&image_points[0]);
    Some(HeadPose::frontal(ray * depth))
}

/// Linear pose from a normalized DLT solve, rotation projected onto SO(3)
fn dlt_seed(
    model_points: &[Point3<f64>; NUM_FACE_POINTS],
    image_points: &[Point2<f64>; NUM_FACE_POINTS],
    intrinsics: &CameraIntrinsics,
) -> Option<HeadPose> {
    #[allow(clippy::cast_precision_loss)]
    let n = NUM_FACE_POINTS as f64;
    let centroid = model_points.iter().map(|p| p.coords).sum::<Vector3<f64>>() / n;
    let mean_dist = model_points.iter().map(|p| (p.coords - centroid).norm()).sum::<f64>() / n;
    if mean_dist <= EPSILON {
        return None;
    }
    let scale = 3.0_f64.sqrt() / mean_dist;
    let normalize = Matrix4::new(
        scale,
        0.0,
        0.0,
        -scale * centroid.x,
        0.0,
        scale,
        0.0,
        -scale * centroid.y,
        0.0,
        0.0,
        scale,
        -scale * centroid.z,
        0.0,
        0.0,
        0.0,
        1.0,
    );

    let mut a = DMatrix::<f64>::zeros(NUM_RESIDUALS, 12);
    for (i, (pw, pi)) in model_points.iter().zip(image_points.iter()).enumerate() {
        let x = (pw.x - centroid.x) * scale;
        let y = (pw.y - centroid.y) * scale;
        let z = (pw.z - centroid.z) * scale;
        let ray = intrinsics.unproject(pi);
        let (u, v) = (ray.x, ray.y);

        let r0 = 2 * i;
        let r1 = r0 + 1;
        for (col, value) in [x, y, z, 1.0].into_iter().enumerate() {
            a[(r0, col)] = value;
            a[(r1, col + 4)] = value;
            a[(r0, col + 8)] = -u * value;
            a[(r1, col + 8)] = -v * value;
        }
    }

    let svd = a.svd(false, true);
    let v_t = svd.v_t?;
    let null_row = svd.singular_values.imin();
    let p = nalgebra::Matrix3x4::from_fn(|r, c| v_t[(null_row, r * 4 + c)]) * normalize;

    let m = p.fixed_view::<3, 3>(0, 0).into_owned();
    let mut s = (m.row(0).norm() + m.row(1).norm() + m.row(2).norm()) / 3.0;
    if s <= EPSILON {
        return None;
    }
    if m.determinant() < 0.0 {
        s = -s;
    }

    let svd = (m / s).svd(true, true);
    let (u, v_t) = (svd.u?, svd.v_t?);
    let mut r = u * v_t;
    if r.determinant() < 0.0 {
        let mut flipped = u;
        flipped.column_mut(2).neg_mut();
        r = flipped * v_t;
    }

    let t = p.column(3).into_owned() / s;
    if t.z <= EPSILON {
        return None;
    }

    // Quaternion axis extraction stays well-conditioned near a half turn
    let rotation_vector = UnitQuaternion::from_rotation_matrix(&Rotation3::from_matrix_unchecked(r)).scaled_axis();
    Some(HeadPose::new(rotation_vector, t))
}
