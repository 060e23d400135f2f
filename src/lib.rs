//! Gaze mirror library: drives a pair of rendered eyes from face landmarks.
//!
//! This library turns per-frame face mesh landmarks into a gaze direction and
//! animates two rendered pupils toward it:
//! - Head pose from six facial points via a `PnP` solve (`nalgebra`)
//! - An image-to-model affine fit that lifts pupil pixels into the face model
//! - Gaze ray projection with head motion compensation
//! - Several interchangeable direction strategies
//! - A low-pass pupil actuator and a tracking/manual mode arbiter
//!
//! The estimation pipeline consists of:
//! 1. Extracting the six face points from a 478-point mesh
//! 2. Head pose estimation against the 3D face model
//! 3. Pupil lifting and gaze projection for each eye
//! 4. Normalizing and optionally quantizing the averaged gaze
//! 5. Smoothing the rendered pupils toward the resulting target
//!
//! # Examples
//!
//! ## Estimating a direction
//!
//! ```no_run
//! use gaze_mirror::{
//!     direction::{reprojection::ReprojectionStrategy, DirectionStrategy},
//!     gaze::GazeEstimator,
//!     landmarks::LandmarkSet,
//! };
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let strategy = ReprojectionStrategy::quantized(GazeEstimator::default(), 0.1);
//!
//! // Landmarks normalized to [0, 1], as produced by a face mesh detector
//! # let landmarks = LandmarkSet::new(Vec::new());
//! let direction = strategy.estimate(&landmarks, 640, 480)?;
//! println!("Looking ({:.0}, {:.0})", direction.x, direction.y);
//! # Ok(())
//! # }
//! ```
//!
//! ## Animating the pupils
//!
//! ```no_run
//! use gaze_mirror::{
//!     actuator::PupilActuator,
//!     animator::EyeAnimator,
//!     arbiter::{ControlInput, ManualDirection},
//!     direction::iris::IrisStrategy,
//! };
//!
//! let mut animator = EyeAnimator::new(Box::new(IrisStrategy::default()), PupilActuator::default());
//!
//! // No face in this frame: the pupils drift back toward their sockets
//! let report = animator.process_frame(None, 640, 480);
//! println!("Pupils at {:?}", report.pixels);
//!
//! // Operator override takes precedence over tracking
//! animator.control(ControlInput::Manual(ManualDirection::Left));
//! let report = animator.process_frame(None, 640, 480);
//! assert_eq!(report.direction.map(|d| d.x), Some(-1.0));
//! ```

/// Error types and result handling
pub mod error;

/// Constants used throughout the application
pub mod constants;

/// Configuration management
pub mod config;

/// Face mesh landmarks and the six-point face subset
pub mod landmarks;

/// 3D face model with eyeball centers
pub mod face_model;

/// Pinhole camera intrinsics
pub mod camera;

/// Head pose estimation module using `PnP` algorithm
pub mod pose_estimation;

/// Image-to-model affine fit with outlier rejection
pub mod affine;

/// Gaze ray projection and head motion compensation
pub mod gaze;

/// Gaze direction value and estimation strategies
pub mod direction;

/// Smoothed rendered pupil positions
pub mod actuator;

/// Tracking and manual mode arbitration
pub mod arbiter;

/// Per-frame orchestration
pub mod animator;

/// JSON-lines landmark stream
pub mod source;

/// Main application module
pub mod app;

/// Numeric helpers
pub mod utils;

pub use error::{Error, Result};
