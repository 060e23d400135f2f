//! Constants used throughout the application

/// Number of named face points used for the pose and affine solves
pub const NUM_FACE_POINTS: usize = 6;

/// Total number of face model file values (6 points + 2 eyeball centers, × 3)
pub const MODEL_POINTS_TOTAL_VALUES: usize = 24;

/// Smallest landmark set a full face mesh with irises produces
pub const MIN_MESH_LANDMARKS: usize = 478;

/// Landmark indices of the face subset, in model order
pub const NOSE_TIP: usize = 4;
pub const CHIN: usize = 152;
pub const LEFT_EYE_OUTER: usize = 263;
pub const RIGHT_EYE_OUTER: usize = 33;
pub const LEFT_MOUTH: usize = 287;
pub const RIGHT_MOUTH: usize = 57;

/// Pupil (iris center) landmark indices
pub const RIGHT_PUPIL: usize = 468;
pub const LEFT_PUPIL: usize = 473;

/// Iris ring landmark indices
pub const RIGHT_IRIS_RING: [usize; 4] = [469, 470, 471, 472];
pub const LEFT_IRIS_RING: [usize; 4] = [474, 475, 476, 477];

/// Eyelid landmark pairs (upper, lower)
pub const LEFT_EYELID: (usize, usize) = (386, 374);
pub const RIGHT_EYELID: (usize, usize) = (159, 145);

/// Camera matrix center factor
pub const CAMERA_CENTER_FACTOR: f64 = 2.0;

/// Canonical face model coordinates in millimeters, nose tip at the origin
pub const DEFAULT_MODEL_POINTS: [[f64; 3]; NUM_FACE_POINTS] = [
    [0.0, 0.0, 0.0],
    [0.0, -63.6, -12.5],
    [-43.3, 32.7, -26.0],
    [43.3, 32.7, -26.0],
    [-28.9, -28.9, -24.1],
    [28.9, -28.9, -24.1],
];

/// Eyeball centers in face model coordinates
pub const DEFAULT_LEFT_EYEBALL: [f64; 3] = [-29.05, 32.7, -39.5];
pub const DEFAULT_RIGHT_EYEBALL: [f64; 3] = [29.05, 32.7, -39.5];

/// Gaze ray extrapolation factor
pub const DEFAULT_EXTRAPOLATION_FACTOR: f64 = 10.0;

/// Forward coordinate substituted when projecting the head-pose compensation point
pub const DEFAULT_HEAD_REFERENCE_DEPTH: f64 = 40.0;

/// Default dead-zone threshold for quantized direction
pub const DEFAULT_QUANTIZE_THRESHOLD: f64 = 0.1;

/// Default normalized eyelid gap below which an eye counts as closed
pub const DEFAULT_BLINK_THRESHOLD: f64 = 0.01;

/// Default pupil socket centers on the display, in pixels
pub const DEFAULT_LEFT_SOCKET: (f64, f64) = (217.0, 240.0);
pub const DEFAULT_RIGHT_SOCKET: (f64, f64) = (592.0, 240.0);

/// Default maximum pupil excursion from the socket center, in pixels
pub const DEFAULT_MAX_OFFSET: f64 = 75.0;

/// Default low-pass smoothing factor
pub const DEFAULT_SMOOTHING_ALPHA: f64 = 0.2;

/// Default RMS reprojection error accepted from the pose solve, in pixels
pub const DEFAULT_MAX_REPROJECTION_ERROR: f64 = 20.0;

/// Default Levenberg-Marquardt iteration cap
pub const DEFAULT_MAX_ITERATIONS: usize = 100;

/// Default model-space residual for affine consensus inliers, in millimeters
pub const DEFAULT_INLIER_THRESHOLD: f64 = 3.0;

/// Minimum correspondences for an affine fit
pub const MIN_AFFINE_POINTS: usize = 4;

/// Numeric precision epsilon
pub const EPSILON: f64 = 1e-10;
